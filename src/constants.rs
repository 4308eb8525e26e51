/// Application constants

// Leveling curve
pub const MAX_SKILL_LEVEL: u32 = 99;

// Anti-abuse cap applied to a single XP award, whatever the caller asked for.
pub const MAX_XP_PER_AWARD: i64 = 10_000;

// Base XP per gameplay action
pub const XP_ENEMY_KILL: i64 = 40;
pub const XP_ELITE_KILL: i64 = 150;
pub const XP_BOSS_KILL: i64 = 500;
pub const XP_SPELL_CAST: i64 = 25;
pub const XP_ARROW_HIT: i64 = 25;
pub const XP_DAMAGE_BLOCKED: i64 = 20;
pub const XP_ORE_MINED: i64 = 30;
pub const XP_TREE_FELLED: i64 = 30;
pub const XP_FISH_CAUGHT: i64 = 30;
pub const XP_CREATURE_TRAPPED: i64 = 35;
pub const XP_CROP_HARVESTED: i64 = 25;
pub const XP_ITEM_CRAFTED: i64 = 50;
pub const XP_BAR_SMELTED: i64 = 45;
pub const XP_MEAL_COOKED: i64 = 35;
pub const XP_POTION_BREWED: i64 = 45;
pub const XP_FURNITURE_BUILT: i64 = 45;
pub const XP_TREASURE_FOUND: i64 = 75;

// Action multiplier bounds
pub const DIFFICULTY_MULTIPLIER_MIN: f64 = 0.1;
pub const DIFFICULTY_MULTIPLIER_MAX: f64 = 10.0;

// Combat level blend. Magic and projectile are weighted 1.5:1 against
// defense; vitality feeds in as a flat bonus on top of the best style.
pub const COMBAT_RANGED_STYLE_WEIGHT: f64 = 1.5;
pub const COMBAT_RANGED_STYLE_DENOM: f64 = 2.5;
pub const COMBAT_VITALITY_DIVISOR: f64 = 4.0;

// Signed XP grants must carry a timestamp within this window of server time.
pub const SIGNATURE_WINDOW_SECS: i64 = 60;

// External ledger push retry policy (stale proof only)
pub const LEDGER_SYNC_MAX_ATTEMPTS: u32 = 4;
pub const LEDGER_SYNC_BACKOFF_BASE_MS: u64 = 500;
pub const LEDGER_SYNC_BACKOFF_JITTER_MS: u64 = 250;

// Background service intervals
pub const SYNC_WORKER_INTERVAL_SECS: u64 = 300;
pub const SYNC_WORKER_BATCH_SIZE: i64 = 25;

// API version
pub const API_VERSION: &str = "v1";
