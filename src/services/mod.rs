// All service modules
pub mod level_reconciler;
pub mod skill_ledger;
pub mod sync_worker;
pub mod xp_actions;

// Re-export for convenience
pub use level_reconciler::LevelReconciler;
pub use skill_ledger::{AwardOptions, SkillLedger};
pub use sync_worker::SyncWorker;

use std::sync::Arc;

use crate::db::Database;

// Internal helper that checks conditions for `is_env_flag_enabled`.
fn is_env_flag_enabled(name: &str) -> bool {
    std::env::var(name)
        .ok()
        .map(|value| {
            let normalized = value.trim().to_ascii_lowercase();
            normalized == "1" || normalized == "true" || normalized == "yes" || normalized == "on"
        })
        .unwrap_or(false)
}

/// Start all background services
pub async fn start_background_services(db: Database, reconciler: Arc<LevelReconciler>) {
    tracing::info!("Starting background services...");

    let enable_sync_worker = if std::env::var("ENABLE_LEDGER_SYNC_WORKER").is_ok() {
        is_env_flag_enabled("ENABLE_LEDGER_SYNC_WORKER")
    } else {
        true
    };

    if enable_sync_worker {
        let sync_worker = Arc::new(SyncWorker::new(db, reconciler));
        sync_worker.start().await;
    } else {
        tracing::warn!("Ledger sync worker disabled via ENABLE_LEDGER_SYNC_WORKER");
    }

    tracing::info!("All background services started successfully");
}
