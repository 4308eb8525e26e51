use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ==================== SKILLS ====================

/// The closed set of progression tracks attached to a character.
/// Six combat, five gathering, five crafting, plus luck — seventeen total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Skill {
    Attack,
    Strength,
    Defense,
    Vitality,
    Magic,
    Projectile,
    Mining,
    Woodcutting,
    Fishing,
    Hunting,
    Harvesting,
    Crafting,
    Smithing,
    Cooking,
    Alchemy,
    Carpentry,
    Luck,
}

impl Skill {
    pub const ALL: [Skill; 17] = [
        Skill::Attack,
        Skill::Strength,
        Skill::Defense,
        Skill::Vitality,
        Skill::Magic,
        Skill::Projectile,
        Skill::Mining,
        Skill::Woodcutting,
        Skill::Fishing,
        Skill::Hunting,
        Skill::Harvesting,
        Skill::Crafting,
        Skill::Smithing,
        Skill::Cooking,
        Skill::Alchemy,
        Skill::Carpentry,
        Skill::Luck,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Skill::Attack => "attack",
            Skill::Strength => "strength",
            Skill::Defense => "defense",
            Skill::Vitality => "vitality",
            Skill::Magic => "magic",
            Skill::Projectile => "projectile",
            Skill::Mining => "mining",
            Skill::Woodcutting => "woodcutting",
            Skill::Fishing => "fishing",
            Skill::Hunting => "hunting",
            Skill::Harvesting => "harvesting",
            Skill::Crafting => "crafting",
            Skill::Smithing => "smithing",
            Skill::Cooking => "cooking",
            Skill::Alchemy => "alchemy",
            Skill::Carpentry => "carpentry",
            Skill::Luck => "luck",
        }
    }

    /// Parse a skill name as it appears on the wire or in the database.
    pub fn parse(value: &str) -> Option<Skill> {
        let normalized = value.trim().to_ascii_lowercase();
        Skill::ALL
            .iter()
            .copied()
            .find(|skill| skill.as_str() == normalized)
    }
}

// ==================== CHARACTER ====================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Character {
    pub asset_id: String,
    pub owner_address: String,
    pub name: String,
    pub combat_level: i32,
    pub total_level: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SkillRecordRow {
    pub asset_id: String,
    pub skill: String,
    pub experience: i64,
    pub level: i32,
    pub pending_external_sync: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Per-skill view returned by the read path. Level here is always
/// recomputed from experience, never read back from the level column.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SkillXpEntry {
    pub experience: i64,
    pub level: u32,
}

/// Full character snapshot pushed to the external ledger metadata.
#[derive(Debug, Clone, Serialize)]
pub struct CharacterState {
    pub asset_id: String,
    pub name: String,
    pub owner_address: String,
    pub combat_level: u32,
    pub total_level: u32,
    pub skills: HashMap<Skill, u32>,
}

// ==================== AWARDS ====================

#[derive(Debug, Clone, Serialize)]
pub struct AwardResult {
    pub asset_id: String,
    pub skill: Skill,
    pub experience: i64,
    pub level: u32,
    pub leveled_up: bool,
    pub xp_for_current_level: i64,
    pub xp_for_next_level: i64,
    pub progress_pct: f64,
}

// ==================== API RESPONSE ====================

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_response_success_sets_flag() {
        // Memastikan helper ApiResponse::success mengisi flag sukses
        let response = ApiResponse::success("ok");
        assert!(response.success);
        assert_eq!(response.data, "ok");
    }

    #[test]
    fn skill_set_is_closed_and_parseable() {
        assert_eq!(Skill::ALL.len(), 17);
        for skill in Skill::ALL {
            assert_eq!(Skill::parse(skill.as_str()), Some(skill));
        }
        assert_eq!(Skill::parse("  Attack "), Some(Skill::Attack));
        assert_eq!(Skill::parse("dancing"), None);
        assert_eq!(Skill::parse(""), None);
    }

    #[test]
    fn skill_serializes_as_lowercase_name() {
        let json = serde_json::to_string(&Skill::Woodcutting).unwrap();
        assert_eq!(json, "\"woodcutting\"");
    }
}
