use std::collections::HashMap;
use std::sync::Arc;

use tokio::time::{sleep, Duration};

use crate::{
    constants::{
        COMBAT_RANGED_STYLE_DENOM, COMBAT_RANGED_STYLE_WEIGHT, COMBAT_VITALITY_DIVISOR,
        LEDGER_SYNC_BACKOFF_BASE_MS, LEDGER_SYNC_BACKOFF_JITTER_MS, LEDGER_SYNC_MAX_ATTEMPTS,
    },
    db::Database,
    error::{AppError, Result},
    ledger::CharacterLedger,
    leveling,
    models::{CharacterState, Skill},
};

/// Keeps the blockchain-anchored display ledger eventually consistent with
/// the authoritative skill store. Runs off the award path: the caller's
/// grant has already committed by the time this is invoked.
pub struct LevelReconciler {
    db: Database,
    ledger: Option<Arc<dyn CharacterLedger>>,
}

impl LevelReconciler {
    pub fn new(db: Database, ledger: Option<Arc<dyn CharacterLedger>>) -> Self {
        Self { db, ledger }
    }

    /// Full reconcile pass for one leveled-up skill: merge all seventeen
    /// current levels, recompute the aggregates, persist them, then push the
    /// snapshot to the external ledger best-effort.
    pub async fn sync_level_up(&self, asset_id: &str, skill: Skill, new_level: u32) -> Result<()> {
        let Some(character) = self.db.get_character(asset_id).await? else {
            tracing::warn!("Level sync skipped: character {} not found", asset_id);
            return Ok(());
        };

        // The external ledger stores a full snapshot; pushing only the
        // changed skill would silently regress the other sixteen.
        let mut levels = self.current_skill_levels(asset_id).await?;
        let stored = levels.get(&skill).copied().unwrap_or(1);
        // Defensive merge: never let a stale write regress a level another
        // concurrent path already advanced further.
        levels.insert(skill, stored.max(new_level));

        let combat_level = combat_level(&levels);
        let total_level = total_level(&levels);

        self.db
            .update_character_aggregate(asset_id, combat_level, total_level)
            .await?;

        let state = CharacterState {
            asset_id: asset_id.to_string(),
            name: character.name,
            owner_address: character.owner_address,
            combat_level,
            total_level,
            skills: levels,
        };

        match &self.ledger {
            Some(ledger) => self.push_with_retry(ledger, asset_id, skill, &state).await,
            None => {
                tracing::debug!(
                    "Ledger push skipped for {} ({}): relayer not configured",
                    asset_id,
                    skill.as_str()
                );
            }
        }

        Ok(())
    }

    /// Levels recomputed from stored experience for all seventeen skills,
    /// absent records defaulting to level 1.
    async fn current_skill_levels(&self, asset_id: &str) -> Result<HashMap<Skill, u32>> {
        let mut levels: HashMap<Skill, u32> =
            Skill::ALL.iter().map(|skill| (*skill, 1)).collect();

        for row in self.db.get_all_skill_records(asset_id).await? {
            if let Some(skill) = Skill::parse(&row.skill) {
                levels.insert(skill, leveling::xp_to_level(row.experience));
            } else {
                tracing::warn!("Ignoring unknown skill column '{}' on {}", row.skill, asset_id);
            }
        }

        Ok(levels)
    }

    /// Best-effort push. A stale proof is retried with backoff, every other
    /// failure is logged and abandoned — the skill row stays flagged
    /// pending and the sweeper picks it up later. Never propagates.
    async fn push_with_retry(
        &self,
        ledger: &Arc<dyn CharacterLedger>,
        asset_id: &str,
        skill: Skill,
        state: &CharacterState,
    ) {
        for attempt in 1..=LEDGER_SYNC_MAX_ATTEMPTS {
            // Fresh proof every attempt. The anchor root is shared by all
            // characters and moves under unrelated writes, so a proof from
            // a previous attempt is already suspect.
            let proof = match ledger.fetch_asset_proof(asset_id).await {
                Ok(proof) => proof,
                Err(e) => {
                    tracing::error!(
                        "Proof fetch failed for {} ({}), push abandoned: {}",
                        asset_id,
                        skill.as_str(),
                        e
                    );
                    return;
                }
            };

            match ledger.push_character_state(asset_id, state, &proof).await {
                Ok(signature) => {
                    tracing::info!(
                        "Ledger updated: asset={}, skill={}, combat={}, total={}, sig={}",
                        asset_id,
                        skill.as_str(),
                        state.combat_level,
                        state.total_level,
                        signature
                    );
                    if let Err(e) = self.db.clear_pending_sync(asset_id, skill).await {
                        tracing::error!("Failed to clear pending sync flag for {}: {}", asset_id, e);
                    }
                    return;
                }
                Err(AppError::StaleProof) if attempt < LEDGER_SYNC_MAX_ATTEMPTS => {
                    let delay = sync_backoff_ms(attempt);
                    tracing::warn!(
                        "Stale proof for {} (attempt {}/{}), retrying in {}ms",
                        asset_id,
                        attempt,
                        LEDGER_SYNC_MAX_ATTEMPTS,
                        delay
                    );
                    sleep(Duration::from_millis(delay)).await;
                }
                Err(e) => {
                    tracing::error!(
                        "Ledger push abandoned for {} ({}) after attempt {}: {}",
                        asset_id,
                        skill.as_str(),
                        attempt,
                        e
                    );
                    return;
                }
            }
        }
    }
}

fn sync_backoff_ms(attempt: u32) -> u64 {
    let base = LEDGER_SYNC_BACKOFF_BASE_MS * 2u64.saturating_pow(attempt - 1);
    base + rand::random::<u64>() % LEDGER_SYNC_BACKOFF_JITTER_MS
}

/// Weighted blend of the six combat skills: the best of melee, magic, and
/// projectile styles plus a vitality bonus. Constants live in constants.rs
/// and are balance decisions, not architecture.
pub fn combat_level(levels: &HashMap<Skill, u32>) -> u32 {
    let level = |skill: Skill| levels.get(&skill).copied().unwrap_or(1) as f64;

    let melee = (level(Skill::Attack) + level(Skill::Strength) + level(Skill::Defense)) / 3.0;
    let magic = (level(Skill::Magic) * COMBAT_RANGED_STYLE_WEIGHT + level(Skill::Defense))
        / COMBAT_RANGED_STYLE_DENOM;
    let projectile = (level(Skill::Projectile) * COMBAT_RANGED_STYLE_WEIGHT
        + level(Skill::Defense))
        / COMBAT_RANGED_STYLE_DENOM;

    let best = melee.max(magic).max(projectile);
    let combat = (best + level(Skill::Vitality) / COMBAT_VITALITY_DIVISOR).floor() as u32;
    combat.max(1)
}

pub fn total_level(levels: &HashMap<Skill, u32>) -> u32 {
    Skill::ALL
        .iter()
        .map(|skill| levels.get(skill).copied().unwrap_or(1))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn baseline() -> HashMap<Skill, u32> {
        Skill::ALL.iter().map(|skill| (*skill, 1)).collect()
    }

    #[test]
    fn fresh_character_aggregates() {
        let levels = baseline();
        assert_eq!(combat_level(&levels), 1);
        assert_eq!(total_level(&levels), 17);
    }

    #[test]
    fn melee_build_drives_combat_level() {
        let mut levels = baseline();
        levels.insert(Skill::Attack, 60);
        levels.insert(Skill::Strength, 60);
        levels.insert(Skill::Defense, 60);
        levels.insert(Skill::Vitality, 40);
        // (60+60+60)/3 + 40/4 = 70
        assert_eq!(combat_level(&levels), 70);
    }

    #[test]
    fn magic_build_outweighs_weak_melee() {
        let mut levels = baseline();
        levels.insert(Skill::Magic, 80);
        levels.insert(Skill::Defense, 40);
        levels.insert(Skill::Vitality, 20);
        // magic style: (80*1.5 + 40)/2.5 = 64; melee: (1+1+40)/3 = 14
        assert_eq!(combat_level(&levels), 69);
    }

    #[test]
    fn total_level_sums_all_seventeen() {
        let mut levels = baseline();
        levels.insert(Skill::Fishing, 50);
        levels.insert(Skill::Luck, 10);
        assert_eq!(total_level(&levels), 16 + 50 + 10 - 1);
    }

    #[test]
    fn combat_level_never_below_one() {
        let levels: HashMap<Skill, u32> = HashMap::new();
        assert_eq!(combat_level(&levels), 1);
    }

    #[test]
    fn backoff_grows_with_attempts() {
        let first = sync_backoff_ms(1);
        let third = sync_backoff_ms(3);
        assert!(first >= LEDGER_SYNC_BACKOFF_BASE_MS);
        assert!(third >= LEDGER_SYNC_BACKOFF_BASE_MS * 4);
        assert!(third < LEDGER_SYNC_BACKOFF_BASE_MS * 4 + LEDGER_SYNC_BACKOFF_JITTER_MS);
    }
}
