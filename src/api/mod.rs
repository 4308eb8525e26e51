// src/api/mod.rs

pub mod auth;
pub mod characters;
pub mod health;
pub mod skills;

use std::sync::Arc;

use axum::http::{header::AUTHORIZATION, HeaderMap};
use chrono::Utc;

use crate::config::Config;
use crate::crypto::signature;
use crate::db::Database;
use crate::error::{AppError, Result};
use crate::services::SkillLedger;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Config,
    pub skills: Arc<SkillLedger>,
}

/// Session auth for player-facing routes: bearer JWT issued by the platform
/// auth service, verified locally against the shared secret.
pub async fn require_user(headers: &HeaderMap, state: &AppState) -> Result<String> {
    let auth_header = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| AppError::AuthError("Missing Authorization header".to_string()))?;
    let auth_str = auth_header
        .to_str()
        .map_err(|_| AppError::AuthError("Invalid Authorization header".to_string()))?;
    let token = auth_str
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::AuthError("Invalid Authorization scheme".to_string()))?;

    auth::extract_user_from_token(token, &state.config.jwt_secret).await
}

/// Server-to-server auth: static shared key in the x-api-key header.
pub fn require_api_key(headers: &HeaderMap, state: &AppState) -> Result<()> {
    let provided = headers
        .get("x-api-key")
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::AuthError("Missing x-api-key header".to_string()))?;

    if provided != state.config.skill_api_key {
        return Err(AppError::AuthError("Invalid API key".to_string()));
    }

    Ok(())
}

/// Admission for signed XP grants: either the static API key or a
/// time-windowed HMAC signature over the canonical action payload.
pub fn require_action_auth(
    headers: &HeaderMap,
    state: &AppState,
    asset_id: &str,
    action_key: &str,
    quantity: i64,
    difficulty_multiplier: f64,
) -> Result<()> {
    if require_api_key(headers, state).is_ok() {
        return Ok(());
    }

    let signature_hex = headers
        .get("x-xp-signature")
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| {
            AppError::AuthError("Missing x-api-key or x-xp-signature".to_string())
        })?;
    let timestamp: i64 = headers
        .get("x-xp-timestamp")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse().ok())
        .ok_or_else(|| AppError::AuthError("Missing or invalid x-xp-timestamp".to_string()))?;

    let payload = signature::canonical_action_payload(
        asset_id,
        action_key,
        quantity,
        difficulty_multiplier,
        timestamp,
    );

    signature::verify_signed_payload(
        &state.config.xp_signing_secret,
        &payload,
        signature_hex,
        timestamp,
        Utc::now().timestamp(),
    )
}

/// Ownership gate: when the caller claims an owner, the character must
/// exist and belong to it. Runs before any XP is applied.
pub async fn ensure_character_owner(
    state: &AppState,
    asset_id: &str,
    claimed_owner: Option<&str>,
) -> Result<()> {
    let Some(claimed) = claimed_owner else {
        return Ok(());
    };

    let character = state
        .db
        .get_character(asset_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Character {} not found", asset_id)))?;

    if character.owner_address != claimed {
        return Err(AppError::OwnershipMismatch);
    }

    Ok(())
}
