use std::sync::Arc;

use tokio::time::{interval, Duration};

use crate::{
    constants::{SYNC_WORKER_BATCH_SIZE, SYNC_WORKER_INTERVAL_SECS},
    db::Database,
    error::Result,
    leveling,
    models::Skill,
    services::level_reconciler::LevelReconciler,
};

/// Out-of-band repair path for the best-effort ledger push: periodically
/// re-drives the reconciler for skill records still flagged pending.
pub struct SyncWorker {
    db: Database,
    reconciler: Arc<LevelReconciler>,
}

impl SyncWorker {
    pub fn new(db: Database, reconciler: Arc<LevelReconciler>) -> Self {
        Self { db, reconciler }
    }

    pub async fn start(self: Arc<Self>) {
        tokio::spawn(async move {
            let mut ticker = interval(Duration::from_secs(SYNC_WORKER_INTERVAL_SECS));

            loop {
                ticker.tick().await;

                if let Err(e) = self.flush_pending().await {
                    tracing::error!("Ledger sync worker error: {}", e);
                }
            }
        });
    }

    async fn flush_pending(&self) -> Result<()> {
        let records = self.db.get_pending_sync_records(SYNC_WORKER_BATCH_SIZE).await?;

        if records.is_empty() {
            return Ok(());
        }

        tracing::info!("Retrying ledger sync for {} pending record(s)", records.len());

        for record in records {
            let Some(skill) = Skill::parse(&record.skill) else {
                tracing::warn!(
                    "Skipping pending record with unknown skill '{}' on {}",
                    record.skill,
                    record.asset_id
                );
                continue;
            };

            let level = leveling::xp_to_level(record.experience);
            if let Err(e) = self
                .reconciler
                .sync_level_up(&record.asset_id, skill, level)
                .await
            {
                tracing::warn!(
                    "Pending sync retry failed for {} ({}): {}",
                    record.asset_id,
                    skill.as_str(),
                    e
                );
            }
        }

        Ok(())
    }
}
