use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, Result},
    leveling::{self, SkillProgress},
    models::{ApiResponse, AwardResult, Skill},
    services::AwardOptions,
};

use super::{require_user, AppState};

#[derive(Debug, Deserialize)]
pub struct AddExperienceRequest {
    pub character_ref: String,
    pub skill: String,
    pub experience_gain: i64,
    pub source: Option<String>,
    pub session_id: Option<String>,
    pub game_mode: Option<String>,
    pub additional_data: Option<serde_json::Value>,
}

/// POST /api/v1/skills/add-experience
///
/// Legacy session-authenticated award path. The signed game-server routes
/// under /characters are the preferred entry point.
pub async fn add_experience(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<AddExperienceRequest>,
) -> Result<Json<ApiResponse<AwardResult>>> {
    let user_address = require_user(&headers, &state).await?;

    let skill = Skill::parse(&req.skill)
        .ok_or_else(|| AppError::BadRequest(format!("Unknown skill: {}", req.skill)))?;

    // Session callers may only touch their own characters.
    let character = state
        .db
        .get_character(&req.character_ref)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Character {} not found", req.character_ref)))?;
    if character.owner_address != user_address {
        return Err(AppError::OwnershipMismatch);
    }

    if req.session_id.is_some() || req.game_mode.is_some() {
        tracing::debug!(
            "add-experience context: session={:?}, mode={:?}",
            req.session_id,
            req.game_mode
        );
    }

    let result = state
        .skills
        .add_skill_xp(
            &req.character_ref,
            skill,
            req.experience_gain,
            AwardOptions {
                idempotency_key: None,
                source: req.source.or_else(|| Some("legacy".to_string())),
                additional_data: req.additional_data,
            },
        )
        .await?;

    Ok(Json(ApiResponse::success(result)))
}

#[derive(Debug, Serialize)]
pub struct SkillsResponse {
    pub asset_id: String,
    pub skills: HashMap<Skill, SkillProgress>,
}

/// GET /api/v1/skills/{asset_id}
pub async fn get_skills(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(asset_id): Path<String>,
) -> Result<Json<ApiResponse<SkillsResponse>>> {
    let _user_address = require_user(&headers, &state).await?;

    let skills = state
        .skills
        .get_all_skill_xp(&asset_id)
        .await?
        .into_iter()
        .map(|(skill, entry)| (skill, leveling::compute_progress(entry.experience)))
        .collect();

    Ok(Json(ApiResponse::success(SkillsResponse {
        asset_id,
        skills,
    })))
}
