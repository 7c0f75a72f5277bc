//! Nier Uploader Service
//!
//! Periodic video upload service for the Nier factory floor analytics
//! platform. On a fixed interval it commands the camera capture component to
//! persist its most recent recording window to local disk, waits for the
//! write to settle, sweeps the segment directory, and uploads every finished
//! video file to S3, deleting local copies after a successful upload.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  save [from, to]   ┌──────────────┐
//! │ Interval     │───────────────────▶│ Capture      │
//! │ Scheduler    │                    │ Component    │
//! └──────────────┘                    └──────────────┘
//!        │ every tick                        │ writes
//!        ▼                                   ▼
//! ┌──────────────┐     scan          ┌──────────────┐
//! │ Upload Cycle │──────────────────▶│ Local        │
//! │ Controller   │◀──────────────────│ Segments     │
//! └──────────────┘   candidates      └──────────────┘
//!        │ put + remove
//!        ▼
//! ┌──────────────┐
//! │ S3 Bucket    │
//! └──────────────┘
//! ```
//!
//! Per-file failures are isolated within a cycle: a file that cannot be
//! uploaded stays on disk and is retried on the next tick, while its
//! siblings proceed. Only configuration and scheduler lifecycle errors
//! surface to the host.

pub mod config;
pub mod s3_uploader;
pub mod scanner;
pub mod scheduler;
pub mod service;
pub mod upload_cycle;
pub mod video_store;

pub use config::{Config, ConfigValidationError};
pub use s3_uploader::{ObjectStore, S3Uploader, UploadError};
pub use scanner::{scan_for_segments, CandidateFile, ScanError};
pub use scheduler::{SchedulerError, UploadScheduler};
pub use service::{ServiceError, UploaderService};
pub use upload_cycle::{CycleJob, CycleSettings, CycleStats, UploadCycle};
pub use video_store::{
    HttpVideoStore, SegmentWindow, VideoStore, VideoStoreError, SEGMENT_TIME_FORMAT,
};
