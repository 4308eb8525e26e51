use std::collections::HashMap;
use std::sync::Arc;

use sqlx::Row;

use crate::{
    constants::MAX_XP_PER_AWARD,
    db::Database,
    error::{AppError, Result},
    leveling,
    models::{AwardResult, Skill, SkillXpEntry},
    services::level_reconciler::LevelReconciler,
};

/// Optional context attached to an award.
#[derive(Debug, Default, Clone)]
pub struct AwardOptions {
    pub idempotency_key: Option<String>,
    pub source: Option<String>,
    pub additional_data: Option<serde_json::Value>,
}

/// The single authoritative store of per-skill experience. Every mutation
/// in the system funnels through `add_skill_xp`.
pub struct SkillLedger {
    db: Database,
    reconciler: Arc<LevelReconciler>,
}

impl SkillLedger {
    pub fn new(db: Database, reconciler: Arc<LevelReconciler>) -> Self {
        Self { db, reconciler }
    }

    /// Idempotent, atomic XP award with level recompute.
    ///
    /// The award-event insert and the experience increment share one
    /// transaction, so a duplicate idempotency key can never have applied a
    /// partial effect. On a level increase the reconciler is dispatched as
    /// a detached task after commit; its failure never reaches the caller.
    pub async fn add_skill_xp(
        &self,
        asset_id: &str,
        skill: Skill,
        xp_gain: i64,
        opts: AwardOptions,
    ) -> Result<AwardResult> {
        let applied = validated_gain(asset_id, xp_gain)?;

        let mut tx = self.db.pool().begin().await?;

        if let Some(key) = opts.idempotency_key.as_deref() {
            let inserted = sqlx::query(
                "INSERT INTO award_events
                     (idempotency_key, asset_id, skill, xp_applied, source, metadata)
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(key)
            .bind(asset_id)
            .bind(skill.as_str())
            .bind(applied)
            .bind(&opts.source)
            .bind(&opts.additional_data)
            .execute(&mut *tx)
            .await;

            match inserted {
                Ok(_) => {}
                Err(e) if is_unique_violation(&e) => {
                    // Award already applied; hand back the current state
                    // without re-incrementing.
                    tx.rollback().await?;
                    tracing::info!(
                        "Duplicate award ignored: asset={}, skill={}, key={}",
                        asset_id,
                        skill.as_str(),
                        key
                    );
                    return self.current_state(asset_id, skill).await;
                }
                Err(e) => return Err(e.into()),
            }
        }

        // Upsert-with-default then increment, in one atomic statement. The
        // RETURNING level is the pre-write stored level: this statement
        // never touches the level column.
        let row = sqlx::query(
            "INSERT INTO skill_records (asset_id, skill, experience)
             VALUES ($1, $2, $3)
             ON CONFLICT (asset_id, skill) DO UPDATE
             SET experience = skill_records.experience + EXCLUDED.experience,
                 updated_at = NOW()
             RETURNING experience, level",
        )
        .bind(asset_id)
        .bind(skill.as_str())
        .bind(applied)
        .fetch_one(&mut *tx)
        .await?;

        let new_xp: i64 = row.try_get("experience")?;
        let old_level: i32 = row.try_get("level")?;
        let new_level = leveling::xp_to_level(new_xp) as i32;
        let leveled_up = new_level > old_level;

        if new_level != old_level {
            // A downward recompute is persisted too, but only an increase
            // is worth pushing to the external ledger.
            sqlx::query(
                "UPDATE skill_records
                 SET level = $3, pending_external_sync = $4, updated_at = NOW()
                 WHERE asset_id = $1 AND skill = $2",
            )
            .bind(asset_id)
            .bind(skill.as_str())
            .bind(new_level)
            .bind(leveled_up)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!(
            "XP awarded: asset={}, skill={}, gain={}, total={}, level={}{}",
            asset_id,
            skill.as_str(),
            applied,
            new_xp,
            new_level,
            if leveled_up { " (level up)" } else { "" }
        );

        if leveled_up {
            let reconciler = self.reconciler.clone();
            let asset = asset_id.to_string();
            let level = new_level as u32;
            tokio::spawn(async move {
                if let Err(e) = reconciler.sync_level_up(&asset, skill, level).await {
                    tracing::error!(
                        "Level sync failed for {} ({}): {}",
                        asset,
                        skill.as_str(),
                        e
                    );
                }
            });
        }

        Ok(build_result(asset_id, skill, new_xp, leveled_up))
    }

    /// All seventeen skills for a character, absent ones defaulting to
    /// zero experience. Levels are recomputed from experience on every
    /// read; the stored level column is a cache, not truth.
    pub async fn get_all_skill_xp(&self, asset_id: &str) -> Result<HashMap<Skill, SkillXpEntry>> {
        if asset_id.trim().is_empty() {
            return Err(AppError::BadRequest("asset_id cannot be empty".to_string()));
        }

        let mut skills: HashMap<Skill, SkillXpEntry> = Skill::ALL
            .iter()
            .map(|skill| {
                (
                    *skill,
                    SkillXpEntry {
                        experience: 0,
                        level: 1,
                    },
                )
            })
            .collect();

        for row in self.db.get_all_skill_records(asset_id).await? {
            if let Some(skill) = Skill::parse(&row.skill) {
                skills.insert(
                    skill,
                    SkillXpEntry {
                        experience: row.experience,
                        level: leveling::xp_to_level(row.experience),
                    },
                );
            }
        }

        Ok(skills)
    }

    async fn current_state(&self, asset_id: &str, skill: Skill) -> Result<AwardResult> {
        let experience = self
            .db
            .get_skill_record(asset_id, skill)
            .await?
            .map(|row| row.experience)
            .unwrap_or(0);

        Ok(build_result(asset_id, skill, experience, false))
    }
}

/// Validation and anti-abuse clamp shared by every award entry point.
pub fn validated_gain(asset_id: &str, xp_gain: i64) -> Result<i64> {
    if asset_id.trim().is_empty() {
        return Err(AppError::BadRequest("asset_id cannot be empty".to_string()));
    }
    if xp_gain <= 0 {
        return Err(AppError::BadRequest(
            "experience gain must be positive".to_string(),
        ));
    }

    if xp_gain > MAX_XP_PER_AWARD {
        tracing::warn!(
            "XP gain {} exceeds per-award cap, clamping to {}",
            xp_gain,
            MAX_XP_PER_AWARD
        );
        return Ok(MAX_XP_PER_AWARD);
    }

    Ok(xp_gain)
}

fn build_result(asset_id: &str, skill: Skill, experience: i64, leveled_up: bool) -> AwardResult {
    let progress = leveling::compute_progress(experience);
    AwardResult {
        asset_id: asset_id.to_string(),
        skill,
        experience,
        level: progress.level,
        leveled_up,
        xp_for_current_level: progress.xp_for_current_level,
        xp_for_next_level: progress.xp_for_next_level,
        progress_pct: progress.progress_pct,
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.is_unique_violation(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_asset_id() {
        let result = validated_gain("  ", 100);
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[test]
    fn rejects_non_positive_gain() {
        assert!(validated_gain("asset-1", 0).is_err());
        assert!(validated_gain("asset-1", -10).is_err());
    }

    #[test]
    fn clamps_oversized_gain() {
        assert_eq!(validated_gain("asset-1", 50_000).unwrap(), MAX_XP_PER_AWARD);
        assert_eq!(validated_gain("asset-1", 10_000).unwrap(), 10_000);
        assert_eq!(validated_gain("asset-1", 9_999).unwrap(), 9_999);
    }

    #[test]
    fn result_levels_derive_from_experience() {
        let result = build_result("asset-1", Skill::Attack, 83, true);
        assert_eq!(result.level, 2);
        assert!(result.leveled_up);
        assert_eq!(result.xp_for_current_level, 83);

        let fresh = build_result("asset-1", Skill::Attack, 0, false);
        assert_eq!(fresh.level, 1);
        assert!(!fresh.leveled_up);
    }
}
