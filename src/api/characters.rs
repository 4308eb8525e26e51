use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, Result},
    models::{ApiResponse, AwardResult, Skill, SkillXpEntry},
    services::{
        level_reconciler::{combat_level, total_level},
        xp_actions::{self, XpAction},
        AwardOptions,
    },
};

use super::{ensure_character_owner, require_action_auth, require_api_key, AppState};

// ==================== REQUEST/RESPONSE TYPES ====================

#[derive(Debug, Deserialize)]
pub struct AddSkillXpRequest {
    pub asset_id: String,
    pub skill_name: String,
    pub xp_gain: i64,
    pub player_pda: Option<String>,
    pub idempotency_key: Option<String>,
    pub source: Option<String>,
    pub additional_data: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct AwardActionRequest {
    pub asset_id: String,
    pub action_key: String,
    pub quantity: Option<i64>,
    pub difficulty_multiplier: Option<f64>,
    pub player_pda: Option<String>,
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CharacterSkillsResponse {
    pub asset_id: String,
    pub name: String,
    pub owner_address: String,
    pub combat_level: u32,
    pub total_level: u32,
    pub skills: HashMap<Skill, SkillXpEntry>,
}

// ==================== HANDLERS ====================

/// POST /api/v1/characters/add-skill-xp
///
/// Direct grant for trusted game servers holding the shared API key.
pub async fn add_skill_xp(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<AddSkillXpRequest>,
) -> Result<Json<ApiResponse<AwardResult>>> {
    require_api_key(&headers, &state)?;

    let skill = Skill::parse(&req.skill_name)
        .ok_or_else(|| AppError::BadRequest(format!("Unknown skill: {}", req.skill_name)))?;

    ensure_character_owner(&state, &req.asset_id, req.player_pda.as_deref()).await?;

    let result = state
        .skills
        .add_skill_xp(
            &req.asset_id,
            skill,
            req.xp_gain,
            AwardOptions {
                idempotency_key: req.idempotency_key,
                source: req.source.or_else(|| Some("direct".to_string())),
                additional_data: req.additional_data,
            },
        )
        .await?;

    Ok(Json(ApiResponse::success(result)))
}

/// POST /api/v1/characters/award-action
///
/// Catalog-driven grant. Admitted by API key or HMAC signature; the
/// signature covers the canonical action payload, so tampering with any
/// field invalidates it.
pub async fn award_action(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<AwardActionRequest>,
) -> Result<Json<ApiResponse<AwardResult>>> {
    let quantity = req.quantity.unwrap_or(1);
    let difficulty_multiplier = req.difficulty_multiplier.unwrap_or(1.0);

    require_action_auth(
        &headers,
        &state,
        &req.asset_id,
        &req.action_key,
        quantity,
        difficulty_multiplier,
    )?;

    let action = xp_actions::lookup(&req.action_key)
        .ok_or_else(|| AppError::BadRequest(format!("Unknown action key: {}", req.action_key)))?;

    ensure_character_owner(&state, &req.asset_id, req.player_pda.as_deref()).await?;

    let xp_gain = xp_actions::compute_action_xp(action.base_xp, quantity, difficulty_multiplier);

    let result = state
        .skills
        .add_skill_xp(
            &req.asset_id,
            action.skill,
            xp_gain,
            AwardOptions {
                idempotency_key: req.idempotency_key,
                source: Some(format!("action:{}", action.action_key)),
                additional_data: None,
            },
        )
        .await?;

    Ok(Json(ApiResponse::success(result)))
}

/// GET /api/v1/characters/xp-actions/list
pub async fn list_xp_actions() -> Json<ApiResponse<Vec<XpAction>>> {
    Json(ApiResponse::success(xp_actions::ACTIONS.to_vec()))
}

/// GET /api/v1/characters/{asset_id}/skills
pub async fn get_character_skills(
    State(state): State<AppState>,
    Path(asset_id): Path<String>,
) -> Result<Json<ApiResponse<CharacterSkillsResponse>>> {
    let character = state
        .db
        .get_character(&asset_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Character {} not found", asset_id)))?;

    let skills = state.skills.get_all_skill_xp(&asset_id).await?;

    // Aggregates recomputed fresh from the skill set, not read from the
    // character row, so this endpoint can never serve a stale blend.
    let levels: HashMap<Skill, u32> = skills
        .iter()
        .map(|(skill, entry)| (*skill, entry.level))
        .collect();

    Ok(Json(ApiResponse::success(CharacterSkillsResponse {
        asset_id: character.asset_id,
        name: character.name,
        owner_address: character.owner_address,
        combat_level: combat_level(&levels),
        total_level: total_level(&levels),
        skills,
    })))
}
