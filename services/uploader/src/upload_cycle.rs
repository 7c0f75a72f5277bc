//! The upload cycle: trigger a save, wait, scan, upload, clean up.
//!
//! One cycle runs per timer tick. Every step inside a cycle is best-effort:
//! a failed save command still lets the scan sweep whatever is already on
//! disk, a failed scan yields an empty batch, and one file's failure never
//! blocks its siblings. Nothing inside a cycle propagates to the scheduler.

use crate::config::UploadConfig;
use crate::s3_uploader::ObjectStore;
use crate::scanner::{self, CandidateFile};
use crate::video_store::{SegmentWindow, VideoStore};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Immutable per-job settings, snapshotted from a validated configuration.
#[derive(Debug, Clone)]
pub struct CycleSettings {
    /// Directory the capture component writes segments into
    pub local_path: PathBuf,
    /// Substring identifying video files
    pub video_marker: String,
    /// Length of the capture window, equal to the cycle period
    pub interval: Duration,
    /// Wait between the save command and the scan
    pub settle_delay: Duration,
}

impl CycleSettings {
    pub fn from_config(config: &UploadConfig) -> Self {
        Self {
            local_path: PathBuf::from(&config.local_path),
            video_marker: config.video_marker.clone(),
            interval: config.interval(),
            settle_delay: config.settle_delay(),
        }
    }
}

/// Outcome of one cycle. Consumed by logs and tests only; nothing is
/// persisted or accumulated across cycles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleStats {
    /// Whether the save command was sent and acknowledged
    pub triggered: bool,
    /// Files the scan selected
    pub candidates: usize,
    /// Files uploaded successfully
    pub uploaded: usize,
    /// Files whose upload failed
    pub upload_failures: usize,
    /// Uploaded files that could not be removed locally
    pub cleanup_failures: usize,
}

/// Jobs the interval scheduler can drive.
#[async_trait]
pub trait CycleJob: Send + Sync {
    /// Run one cycle to completion. Never fails from the caller's point of
    /// view; per-file problems are contained and reported in the stats.
    async fn run_cycle(&self) -> CycleStats;
}

/// Orchestrates trigger, settle delay, scan, per-file upload, and cleanup.
pub struct UploadCycle {
    video_store: Option<Arc<dyn VideoStore>>,
    object_store: Arc<dyn ObjectStore>,
    settings: CycleSettings,
}

impl UploadCycle {
    /// Create a cycle controller. Without a video store the save trigger is
    /// skipped and the cycle only sweeps files already on disk.
    pub fn new(
        video_store: Option<Arc<dyn VideoStore>>,
        object_store: Arc<dyn ObjectStore>,
        settings: CycleSettings,
    ) -> Self {
        Self {
            video_store,
            object_store,
            settings,
        }
    }

    /// Command the capture component to persist the most recent window.
    async fn trigger_save(&self, store: &Arc<dyn VideoStore>) -> bool {
        let window = SegmentWindow::ending_now(self.settings.interval);
        match store.save_segment(window, true).await {
            Ok(()) => {
                debug!("Save command acknowledged");
                true
            }
            Err(e) => {
                // Best-effort: sweep whatever is already on disk.
                warn!(error = %e, "Save command failed");
                false
            }
        }
    }

    /// Scan the segment directory, downgrading any failure to an empty batch.
    async fn scan(&self) -> Vec<CandidateFile> {
        let root = self.settings.local_path.clone();
        let marker = self.settings.video_marker.clone();

        let result =
            tokio::task::spawn_blocking(move || scanner::scan_for_segments(&root, &marker)).await;

        match result {
            Ok(Ok(candidates)) => candidates,
            Ok(Err(e)) => {
                warn!(error = %e, "Scan failed, skipping uploads this cycle");
                metrics::counter!("uploader.scan.errors").increment(1);
                Vec::new()
            }
            Err(e) => {
                warn!(error = %e, "Scan task failed");
                metrics::counter!("uploader.scan.errors").increment(1);
                Vec::new()
            }
        }
    }

    /// Upload one candidate and remove the local copy on success.
    async fn upload_and_remove(&self, candidate: &CandidateFile, stats: &mut CycleStats) {
        let started = Instant::now();

        match self
            .object_store
            .put_file(&candidate.path, &candidate.name)
            .await
        {
            Ok(()) => {
                metrics::histogram!("uploader.upload.duration_seconds")
                    .record(started.elapsed().as_secs_f64());
                metrics::counter!("uploader.files.uploaded").increment(1);
                stats.uploaded += 1;

                if let Err(e) = tokio::fs::remove_file(&candidate.path).await {
                    // The file stays and is re-uploaded next cycle.
                    warn!(
                        path = %candidate.path.display(),
                        error = %e,
                        "Failed to remove uploaded segment"
                    );
                    metrics::counter!("uploader.files.cleanup_failures").increment(1);
                    stats.cleanup_failures += 1;
                }
            }
            Err(e) => {
                warn!(
                    path = %candidate.path.display(),
                    error = %e,
                    "Failed to upload segment"
                );
                metrics::counter!("uploader.files.upload_failures").increment(1);
                stats.upload_failures += 1;
            }
        }
    }
}

#[async_trait]
impl CycleJob for UploadCycle {
    async fn run_cycle(&self) -> CycleStats {
        let mut stats = CycleStats::default();

        if let Some(store) = &self.video_store {
            stats.triggered = self.trigger_save(store).await;
        }

        // Give the capture component time to finish writing before scanning.
        // A segment that takes longer than this to flush is picked up by the
        // next cycle instead.
        tokio::time::sleep(self.settings.settle_delay).await;

        let candidates = self.scan().await;
        stats.candidates = candidates.len();

        for candidate in &candidates {
            self.upload_and_remove(candidate, &mut stats).await;
        }

        metrics::counter!("uploader.cycles.completed").increment(1);
        info!(
            candidates = stats.candidates,
            uploaded = stats.uploaded,
            upload_failures = stats.upload_failures,
            cleanup_failures = stats.cleanup_failures,
            "Upload cycle finished"
        );

        stats
    }
}
