use serde::Serialize;

use crate::constants::*;
use crate::models::Skill;

/// One entry of the action catalog: a gameplay event the game servers are
/// allowed to convert into XP, with its target skill and base amount.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct XpAction {
    pub action_key: &'static str,
    pub skill: Skill,
    pub base_xp: i64,
}

/// Immutable catalog, fixed at compile time. Read-only by construction, so
/// concurrent request handlers need no synchronization around it.
pub const ACTIONS: &[XpAction] = &[
    XpAction { action_key: "enemy_kill", skill: Skill::Attack, base_xp: XP_ENEMY_KILL },
    XpAction { action_key: "elite_kill", skill: Skill::Attack, base_xp: XP_ELITE_KILL },
    XpAction { action_key: "boss_kill", skill: Skill::Attack, base_xp: XP_BOSS_KILL },
    XpAction { action_key: "spell_cast", skill: Skill::Magic, base_xp: XP_SPELL_CAST },
    XpAction { action_key: "arrow_hit", skill: Skill::Projectile, base_xp: XP_ARROW_HIT },
    XpAction { action_key: "damage_blocked", skill: Skill::Defense, base_xp: XP_DAMAGE_BLOCKED },
    XpAction { action_key: "ore_mined", skill: Skill::Mining, base_xp: XP_ORE_MINED },
    XpAction { action_key: "tree_felled", skill: Skill::Woodcutting, base_xp: XP_TREE_FELLED },
    XpAction { action_key: "fish_caught", skill: Skill::Fishing, base_xp: XP_FISH_CAUGHT },
    XpAction { action_key: "creature_trapped", skill: Skill::Hunting, base_xp: XP_CREATURE_TRAPPED },
    XpAction { action_key: "crop_harvested", skill: Skill::Harvesting, base_xp: XP_CROP_HARVESTED },
    XpAction { action_key: "item_crafted", skill: Skill::Crafting, base_xp: XP_ITEM_CRAFTED },
    XpAction { action_key: "bar_smelted", skill: Skill::Smithing, base_xp: XP_BAR_SMELTED },
    XpAction { action_key: "meal_cooked", skill: Skill::Cooking, base_xp: XP_MEAL_COOKED },
    XpAction { action_key: "potion_brewed", skill: Skill::Alchemy, base_xp: XP_POTION_BREWED },
    XpAction { action_key: "furniture_built", skill: Skill::Carpentry, base_xp: XP_FURNITURE_BUILT },
    XpAction { action_key: "treasure_found", skill: Skill::Luck, base_xp: XP_TREASURE_FOUND },
];

pub fn lookup(action_key: &str) -> Option<&'static XpAction> {
    ACTIONS.iter().find(|action| action.action_key == action_key)
}

/// Computed grant for an action. Quantity is floored at 1, the difficulty
/// multiplier is clamped to its configured band, and the result never drops
/// below a single point of XP.
pub fn compute_action_xp(base_xp: i64, quantity: i64, difficulty_multiplier: f64) -> i64 {
    let quantity = quantity.max(1);
    let difficulty =
        difficulty_multiplier.clamp(DIFFICULTY_MULTIPLIER_MIN, DIFFICULTY_MULTIPLIER_MAX);

    let raw = (base_xp as f64 * quantity as f64 * difficulty).floor() as i64;
    raw.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boss_kill_with_quantity_and_difficulty() {
        let action = lookup("boss_kill").unwrap();
        assert_eq!(action.skill, Skill::Attack);
        assert_eq!(action.base_xp, 500);
        assert_eq!(compute_action_xp(action.base_xp, 2, 1.5), 1500);
    }

    #[test]
    fn unknown_action_is_none() {
        assert!(lookup("pet_rock").is_none());
    }

    #[test]
    fn action_keys_are_unique() {
        for (i, a) in ACTIONS.iter().enumerate() {
            for b in &ACTIONS[i + 1..] {
                assert_ne!(a.action_key, b.action_key);
            }
        }
    }

    #[test]
    fn quantity_is_floored_at_one() {
        assert_eq!(compute_action_xp(100, 0, 1.0), 100);
        assert_eq!(compute_action_xp(100, -5, 1.0), 100);
    }

    #[test]
    fn difficulty_is_clamped_to_band() {
        // di bawah batas bawah 0.1
        assert_eq!(compute_action_xp(100, 1, 0.0001), 10);
        // di atas batas atas 10.0
        assert_eq!(compute_action_xp(100, 1, 250.0), 1000);
    }

    #[test]
    fn grant_never_drops_below_one() {
        assert_eq!(compute_action_xp(1, 1, 0.1), 1);
    }

    #[test]
    fn fractional_results_are_floored() {
        // floor(40 * 0.33) = 13
        assert_eq!(compute_action_xp(40, 1, 0.33), 13);
    }
}
