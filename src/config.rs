use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // Server
    pub host: String,
    pub port: u16,
    pub environment: String,

    // Database
    pub database_url: String,
    pub database_max_connections: u32,

    // External ledger (compressed-NFT anchor)
    pub solana_rpc_url: String,
    pub ledger_relayer_url: Option<String>,
    pub merkle_tree_address: String,

    // XP grant admission
    pub skill_api_key: String,
    pub xp_signing_secret: String,

    // JWT (session routes)
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,

    // CORS
    pub cors_allowed_origins: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Config {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?,
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),

            database_url: env::var("DATABASE_URL")?,
            database_max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "100".to_string())
                .parse()?,

            solana_rpc_url: env::var("SOLANA_RPC_URL")?,
            ledger_relayer_url: env::var("LEDGER_RELAYER_URL").ok(),
            merkle_tree_address: env::var("MERKLE_TREE_ADDRESS")
                .unwrap_or_else(|_| "11111111111111111111111111111111".to_string()),

            skill_api_key: env::var("SKILL_API_KEY")?,
            xp_signing_secret: env::var("XP_SIGNING_SECRET")?,

            jwt_secret: env::var("JWT_SECRET")?,
            jwt_expiry_hours: env::var("JWT_EXPIRY_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()?,

            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "*".to_string()),
        })
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.database_url.trim().is_empty() {
            anyhow::bail!("DATABASE_URL is empty");
        }
        if self.solana_rpc_url.trim().is_empty() {
            anyhow::bail!("SOLANA_RPC_URL is empty");
        }
        if self.skill_api_key.trim().is_empty() {
            anyhow::bail!("SKILL_API_KEY is empty");
        }
        if self.xp_signing_secret.trim().is_empty() {
            anyhow::bail!("XP_SIGNING_SECRET is empty");
        }
        if self.jwt_secret.trim().is_empty() {
            anyhow::bail!("JWT_SECRET is empty");
        }

        if self.ledger_relayer_url.is_none() {
            tracing::warn!("LEDGER_RELAYER_URL not set; level-ups will not be pushed on-chain");
        }
        if self.merkle_tree_address.starts_with("1111") {
            tracing::warn!("Using placeholder merkle tree address");
        }
        if self.skill_api_key.contains("dev_") || self.jwt_secret.contains("super_secret") {
            tracing::warn!("Detected dev credentials in config");
        }
        if self.cors_allowed_origins.trim().is_empty() {
            tracing::warn!("CORS_ALLOWED_ORIGINS is empty; requests may be blocked");
        }

        let _ = self.jwt_expiry_hours;

        Ok(())
    }

    pub fn is_testnet(&self) -> bool {
        self.environment == "development"
            || self.environment == "testnet"
            || self.solana_rpc_url.contains("devnet")
    }
}
