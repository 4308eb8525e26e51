// src/models/mod.rs
pub mod character;

// Re-export commonly used types so other modules can use `crate::models::X`
pub use character::{
    ApiResponse,
    AwardResult,
    Character,
    CharacterState,
    Skill,
    SkillRecordRow,
    SkillXpEntry,
};
