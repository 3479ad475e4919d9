use crate::entities::shared_files;
use crate::services::file_repository::FileRepository;
use crate::services::storage::CiphertextStore;
use chrono::{DateTime, Utc};
use sea_orm::{DatabaseConnection, DbErr};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;
use tokio::time::{Duration, MissedTickBehavior, interval};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweeperState {
    Idle,
    Sweeping,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SweepFailure {
    pub file_id: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct SweepReport {
    /// Expired-but-unreclaimed records found by this run.
    pub scanned: usize,
    pub reclaimed: Vec<String>,
    pub failures: Vec<SweepFailure>,
}

#[derive(Debug)]
pub enum SweepOutcome {
    Completed(SweepReport),
    /// Another sweep held the lock; nothing was done.
    Skipped,
}

/// Resets the running flag when a sweep ends, however it ends.
struct SweepGuard<'a>(&'a AtomicBool);

impl Drop for SweepGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Reclaims ciphertext of records past their deadline.
///
/// At most one sweep runs at a time: an invocation that finds a sweep in
/// progress returns [`SweepOutcome::Skipped`] instead of waiting.
pub struct ExpirationSweeper {
    db: DatabaseConnection,
    storage: Arc<dyn CiphertextStore>,
    running: AtomicBool,
}

impl ExpirationSweeper {
    pub fn new(db: DatabaseConnection, storage: Arc<dyn CiphertextStore>) -> Self {
        Self {
            db,
            storage,
            running: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> SweeperState {
        if self.running.load(Ordering::Acquire) {
            SweeperState::Sweeping
        } else {
            SweeperState::Idle
        }
    }

    pub async fn sweep(&self) -> Result<SweepOutcome, DbErr> {
        self.sweep_at(Utc::now()).await
    }

    /// One sweep, treating `now` as the current time.
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> Result<SweepOutcome, DbErr> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::info!("Sweep already running, skipping");
            return Ok(SweepOutcome::Skipped);
        }
        let _guard = SweepGuard(&self.running);

        let expired = FileRepository::find_expired_unreclaimed(&self.db, now).await?;
        let mut report = SweepReport {
            scanned: expired.len(),
            ..Default::default()
        };

        for record in expired {
            match self.reclaim(&record).await {
                Ok(()) => report.reclaimed.push(record.id),
                Err(error) => {
                    tracing::warn!("Failed to reclaim file {}: {}", record.id, error);
                    report.failures.push(SweepFailure {
                        file_id: record.id,
                        error,
                    });
                }
            }
        }

        tracing::info!(
            "🧹 Sweep finished: {} scanned, {} reclaimed, {} failed",
            report.scanned,
            report.reclaimed.len(),
            report.failures.len()
        );
        Ok(SweepOutcome::Completed(report))
    }

    /// Delete the blob, then flag the record. A failed delete leaves the
    /// record live so the next sweep retries it.
    async fn reclaim(&self, record: &shared_files::Model) -> Result<(), String> {
        let existed = self
            .storage
            .delete(&record.ciphertext_ref)
            .await
            .map_err(|e| e.to_string())?;
        if !existed {
            tracing::warn!(
                "Ciphertext for file {} was already gone, marking expired",
                record.id
            );
        }

        FileRepository::mark_expired(&self.db, &record.id)
            .await
            .map_err(|e| e.to_string())?;
        Ok(())
    }

    /// Sweep on a fixed interval until `shutdown` flips.
    pub async fn run(self: Arc<Self>, period: Duration, mut shutdown: watch::Receiver<bool>) {
        tracing::info!("🚀 Expiration sweeper started (every {:?})", period);

        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    tracing::info!("🛑 Expiration sweeper shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.sweep().await {
                        tracing::error!("Sweep aborted: {}", e);
                    }
                }
            }
        }
    }
}
