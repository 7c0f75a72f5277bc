//! Service lifecycle: validate, build, (re)schedule, close.
//!
//! `UploaderService` is the long-lived owner the host talks to. Each
//! reconfiguration validates the new snapshot first, then rebuilds the
//! uploader and cycle controller from it and swaps the timer. A snapshot
//! that fails validation leaves the running job untouched.

use crate::config::{Config, ConfigValidationError};
use crate::s3_uploader::S3Uploader;
use crate::scheduler::{SchedulerError, UploadScheduler};
use crate::upload_cycle::{CycleSettings, UploadCycle};
use crate::video_store::VideoStore;
use std::sync::Arc;
use tracing::info;

/// Errors surfaced to the host. Everything inside a running cycle is
/// contained; only configuration and scheduler lifecycle problems escape.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Configuration rejected: {0}")]
    Config(#[from] ConfigValidationError),

    #[error("Scheduler failure: {0}")]
    Scheduler(#[from] SchedulerError),
}

/// Long-lived uploader service owning the active timer.
#[derive(Default)]
pub struct UploaderService {
    scheduler: UploadScheduler,
}

impl UploaderService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an upload job is currently scheduled.
    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    /// Apply a configuration snapshot, replacing any running job.
    ///
    /// The gate runs before anything is torn down, so an invalid snapshot
    /// never interrupts the job built from the previous one. `video_store`
    /// is the host-resolved capture component; `None` selects the variant
    /// that only sweeps files already on disk.
    pub async fn reconfigure(
        &mut self,
        config: &Config,
        video_store: Option<Arc<dyn VideoStore>>,
    ) -> Result<(), ServiceError> {
        config.validate()?;

        let object_store = Arc::new(S3Uploader::new(&config.s3).await);
        let cycle = Arc::new(UploadCycle::new(
            video_store,
            object_store,
            CycleSettings::from_config(&config.upload),
        ));

        self.scheduler
            .restart(cycle, config.upload.interval())
            .await?;

        info!(
            bucket = %config.s3.bucket,
            local_path = %config.upload.local_path,
            interval_minutes = config.upload.interval_minutes,
            "Uploader job configured"
        );
        Ok(())
    }

    /// Stop the upload job. No cycle fires afterwards; a cycle already in
    /// flight finishes first. Callable repeatedly.
    pub async fn close(&mut self) -> Result<(), ServiceError> {
        self.scheduler.shutdown().await?;
        Ok(())
    }
}
