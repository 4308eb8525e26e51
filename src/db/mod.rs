use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{config::Config, error::Result, models::*};

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .connect(&config.database_url)
            .await?;

        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> anyhow::Result<()> {
        // migrations harus berada di crate root: ./migrations
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

// ==================== CHARACTER QUERIES ====================
impl Database {
    pub async fn get_character(&self, asset_id: &str) -> Result<Option<Character>> {
        let row = sqlx::query_as::<_, Character>(
            "SELECT * FROM characters WHERE asset_id = $1",
        )
        .bind(asset_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Write back the derived aggregate so reads are consistent even before
    /// the external ledger push lands.
    pub async fn update_character_aggregate(
        &self,
        asset_id: &str,
        combat_level: u32,
        total_level: u32,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE characters
             SET combat_level = $2, total_level = $3, updated_at = NOW()
             WHERE asset_id = $1",
        )
        .bind(asset_id)
        .bind(combat_level as i32)
        .bind(total_level as i32)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

// ==================== SKILL RECORD QUERIES ====================
impl Database {
    pub async fn get_skill_record(
        &self,
        asset_id: &str,
        skill: Skill,
    ) -> Result<Option<SkillRecordRow>> {
        let row = sqlx::query_as::<_, SkillRecordRow>(
            "SELECT * FROM skill_records WHERE asset_id = $1 AND skill = $2",
        )
        .bind(asset_id)
        .bind(skill.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn get_all_skill_records(&self, asset_id: &str) -> Result<Vec<SkillRecordRow>> {
        let rows = sqlx::query_as::<_, SkillRecordRow>(
            "SELECT * FROM skill_records WHERE asset_id = $1",
        )
        .bind(asset_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn clear_pending_sync(&self, asset_id: &str, skill: Skill) -> Result<()> {
        sqlx::query(
            "UPDATE skill_records
             SET pending_external_sync = FALSE, updated_at = NOW()
             WHERE asset_id = $1 AND skill = $2",
        )
        .bind(asset_id)
        .bind(skill.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Records whose level increase has not been confirmed by the external
    /// ledger yet. Oldest first so the sweeper drains in arrival order.
    pub async fn get_pending_sync_records(&self, limit: i64) -> Result<Vec<SkillRecordRow>> {
        let rows = sqlx::query_as::<_, SkillRecordRow>(
            "SELECT * FROM skill_records
             WHERE pending_external_sync
             ORDER BY updated_at ASC
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(database_url: &str) -> Config {
        Config {
            host: "0.0.0.0".to_string(),
            port: 3000,
            environment: "development".to_string(),
            database_url: database_url.to_string(),
            database_max_connections: 1,
            solana_rpc_url: "http://localhost:8899".to_string(),
            ledger_relayer_url: None,
            merkle_tree_address: "11111111111111111111111111111111".to_string(),
            skill_api_key: "test_api_key".to_string(),
            xp_signing_secret: "test_signing_secret".to_string(),
            jwt_secret: "test_secret".to_string(),
            jwt_expiry_hours: 24,
            cors_allowed_origins: "*".to_string(),
        }
    }

    #[tokio::test]
    async fn database_new_returns_error_on_invalid_url() {
        let config = test_config("not-a-url");
        let result = Database::new(&config).await;
        assert!(result.is_err());
    }
}
