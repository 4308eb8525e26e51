use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{
    config::Config,
    error::{AppError, Result},
    models::CharacterState,
};

/// Merkle proof anchoring one compressed asset, as returned by the DAS
/// `getAssetProof` call. The root moves under unrelated concurrent writes,
/// so a proof is only good for the push attempt it was fetched for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetProof {
    pub root: String,
    pub proof: Vec<String>,
    pub node_index: i64,
    pub leaf: String,
    pub tree_id: String,
}

/// Seam to the blockchain-anchored display ledger. The real implementation
/// talks JSON-RPC + relayer HTTP; tests substitute their own.
#[async_trait]
pub trait CharacterLedger: Send + Sync {
    async fn fetch_asset_proof(&self, asset_id: &str) -> Result<AssetProof>;

    /// Push a full character snapshot under a freshly fetched proof.
    /// Returns the relayer's transaction signature.
    async fn push_character_state(
        &self,
        asset_id: &str,
        state: &CharacterState,
        proof: &AssetProof,
    ) -> Result<String>;
}

pub struct RpcLedgerClient {
    http: reqwest::Client,
    rpc_url: String,
    relayer_url: String,
    merkle_tree_address: String,
}

impl RpcLedgerClient {
    /// Returns `Ok(None)` when no relayer is configured — the service then
    /// runs with on-chain sync disabled and records stay flagged pending.
    pub fn from_config(config: &Config) -> Result<Option<Self>> {
        let Some(relayer_url) = config.ledger_relayer_url.clone() else {
            return Ok(None);
        };

        Url::parse(&config.solana_rpc_url)
            .map_err(|e| AppError::Configuration(format!("Invalid SOLANA_RPC_URL: {}", e)))?;
        Url::parse(&relayer_url)
            .map_err(|e| AppError::Configuration(format!("Invalid LEDGER_RELAYER_URL: {}", e)))?;

        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Some(Self {
            http,
            rpc_url: config.solana_rpc_url.clone(),
            relayer_url: relayer_url.trim_end_matches('/').to_string(),
            merkle_tree_address: config.merkle_tree_address.clone(),
        }))
    }
}

#[async_trait]
impl CharacterLedger for RpcLedgerClient {
    async fn fetch_asset_proof(&self, asset_id: &str) -> Result<AssetProof> {
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "getAssetProof",
            "params": { "id": asset_id },
        });

        let response = self
            .http
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::LedgerRpc(e.to_string()))?;

        let value: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AppError::LedgerRpc(e.to_string()))?;

        if let Some(err) = value.get("error") {
            return Err(AppError::LedgerRpc(format!(
                "getAssetProof failed for {}: {}",
                asset_id, err
            )));
        }

        parse_asset_proof(&value)
    }

    async fn push_character_state(
        &self,
        asset_id: &str,
        state: &CharacterState,
        proof: &AssetProof,
    ) -> Result<String> {
        let payload = serde_json::json!({
            "asset_id": asset_id,
            "tree": self.merkle_tree_address,
            "root": proof.root,
            "proof": proof.proof,
            "leaf": proof.leaf,
            "node_index": proof.node_index,
            "metadata": state,
        });

        let response = self
            .http
            .post(format!("{}/v1/metadata/update", self.relayer_url))
            .json(&payload)
            .send()
            .await
            .map_err(|e| AppError::LedgerRpc(e.to_string()))?;

        let status = response.status();
        let body: serde_json::Value = response.json().await.unwrap_or_default();

        if status == reqwest::StatusCode::CONFLICT || body_reports_stale_root(&body) {
            return Err(AppError::StaleProof);
        }
        if !status.is_success() {
            return Err(AppError::LedgerRpc(format!(
                "relayer rejected update for {}: {} {}",
                asset_id, status, body
            )));
        }

        let signature = body
            .get("signature")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        Ok(signature)
    }
}

fn parse_asset_proof(value: &serde_json::Value) -> Result<AssetProof> {
    let result = value
        .get("result")
        .cloned()
        .ok_or_else(|| AppError::LedgerRpc("getAssetProof returned no result".to_string()))?;

    serde_json::from_value(result)
        .map_err(|e| AppError::LedgerRpc(format!("Malformed asset proof: {}", e)))
}

fn body_reports_stale_root(body: &serde_json::Value) -> bool {
    body.get("error")
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
        .map(|msg| {
            let msg = msg.to_ascii_lowercase();
            msg.contains("stale") || msg.contains("root mismatch")
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_das_asset_proof_response() {
        let raw = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": {
                "root": "9Yf9dFkGhLSAyTZZd1nWkfprCw3jYcVtR8eLkXqTraAn",
                "proof": [
                    "EmJXiXWDDHtcNYrBBdk7GiFcdnSNGZeTh2whWsNHbciF",
                    "3T8qanmaRb858NDSo8nrnSUUEhTC7GIjTNnRge2tqMz1"
                ],
                "node_index": 131,
                "leaf": "6juAHRGqkzfMcACo5zAVHTZC89uKGO6jcENQ1VDG37aq",
                "tree_id": "2kuTFCcjbV22wvUmtmgsFR7cas7eZUzAu96jzJUvUcb7"
            }
        });

        let proof = parse_asset_proof(&raw).unwrap();
        assert_eq!(proof.node_index, 131);
        assert_eq!(proof.proof.len(), 2);
        assert!(proof.root.starts_with("9Yf9"));
    }

    #[test]
    fn missing_result_is_a_ledger_error() {
        let raw = serde_json::json!({ "jsonrpc": "2.0", "id": 1 });
        assert!(matches!(
            parse_asset_proof(&raw),
            Err(AppError::LedgerRpc(_))
        ));
    }

    #[test]
    fn stale_root_detection_reads_error_message() {
        let stale = serde_json::json!({
            "error": { "message": "Stale root: tree advanced since proof was fetched" }
        });
        assert!(body_reports_stale_root(&stale));

        let mismatch = serde_json::json!({
            "error": { "message": "proof root mismatch" }
        });
        assert!(body_reports_stale_root(&mismatch));

        let other = serde_json::json!({
            "error": { "message": "insufficient funds for fee payer" }
        });
        assert!(!body_reports_stale_root(&other));

        assert!(!body_reports_stale_root(&serde_json::json!({})));
    }
}
