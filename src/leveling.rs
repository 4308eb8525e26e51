use std::sync::OnceLock;

use serde::Serialize;

use crate::constants::MAX_SKILL_LEVEL;

/// Minimum experience required to hold each level, indexed by level.
/// Built once at first use via the cumulative point formula
/// `points += floor(level + 300 * 2^(level / 7))`, threshold = points / 4.
/// Level 1 is pinned to 0 regardless of what the formula would say.
fn thresholds() -> &'static [i64] {
    static TABLE: OnceLock<Vec<i64>> = OnceLock::new();
    TABLE.get_or_init(|| build_thresholds(MAX_SKILL_LEVEL))
}

fn build_thresholds(max_level: u32) -> Vec<i64> {
    let mut table = vec![0i64; (max_level + 1) as usize];
    let mut points: i64 = 0;

    for level in 1..max_level {
        points += (level as f64 + 300.0 * 2f64.powf(level as f64 / 7.0)).floor() as i64;
        table[(level + 1) as usize] = points / 4;
    }

    table
}

/// Minimum experience required to hold `level`. Input clamped to [1, 99].
pub fn level_to_xp(level: u32) -> i64 {
    let level = level.clamp(1, MAX_SKILL_LEVEL);
    thresholds()[level as usize]
}

/// Highest level whose threshold is <= `xp`, clamped to [1, 99].
/// Anything at or below zero is level 1.
pub fn xp_to_level(xp: i64) -> u32 {
    if xp <= 0 {
        return 1;
    }

    let table = thresholds();
    let mut lo: u32 = 1;
    let mut hi: u32 = MAX_SKILL_LEVEL;

    while lo < hi {
        let mid = (lo + hi + 1) / 2;
        if table[mid as usize] <= xp {
            lo = mid;
        } else {
            hi = mid - 1;
        }
    }

    lo
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SkillProgress {
    pub level: u32,
    pub experience: i64,
    pub xp_for_current_level: i64,
    pub xp_for_next_level: i64,
    pub progress_pct: f64,
}

/// UI-ready progress toward the next level for a raw experience total.
pub fn compute_progress(xp: i64) -> SkillProgress {
    let experience = xp.max(0);
    let level = xp_to_level(experience);
    let xp_for_current_level = level_to_xp(level);

    if level >= MAX_SKILL_LEVEL {
        // No further progress possible past the cap.
        return SkillProgress {
            level,
            experience,
            xp_for_current_level,
            xp_for_next_level: xp_for_current_level,
            progress_pct: 100.0,
        };
    }

    let xp_for_next_level = level_to_xp(level + 1);
    // Denominator floor of 1 guards adjacent thresholds that coincide.
    let span = (xp_for_next_level - xp_for_current_level).max(1);
    let pct = ((experience - xp_for_current_level) as f64 / span as f64) * 100.0;

    SkillProgress {
        level,
        experience,
        xp_for_current_level,
        xp_for_next_level,
        progress_pct: pct.clamp(0.0, 100.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_thresholds_match_curve() {
        assert_eq!(level_to_xp(1), 0);
        assert_eq!(level_to_xp(2), 83);
        assert_eq!(level_to_xp(10), 1_154);
        assert_eq!(level_to_xp(50), 101_333);
        assert_eq!(level_to_xp(99), 13_034_431);
    }

    #[test]
    fn xp_to_level_is_monotonic() {
        let mut prev = 0;
        for xp in (0i64..200_000).step_by(997) {
            let level = xp_to_level(xp);
            assert!(level >= prev, "level regressed at xp={}", xp);
            prev = level;
        }
    }

    #[test]
    fn round_trip_holds_for_every_level() {
        for level in 1..=MAX_SKILL_LEVEL {
            assert_eq!(xp_to_level(level_to_xp(level)), level);
        }
    }

    #[test]
    fn level_one_floor() {
        assert_eq!(xp_to_level(0), 1);
        assert_eq!(xp_to_level(-5), 1);
    }

    #[test]
    fn max_level_ceiling() {
        assert_eq!(xp_to_level(level_to_xp(99) + 10_000_000), 99);
    }

    #[test]
    fn one_below_threshold_stays_on_previous_level() {
        for level in 2..=MAX_SKILL_LEVEL {
            assert_eq!(xp_to_level(level_to_xp(level) - 1), level - 1);
        }
    }

    #[test]
    fn capped_award_lands_on_expected_level() {
        // 50k requested, 10k applied after the per-award clamp
        assert_eq!(xp_to_level(10_000), 27);
    }

    #[test]
    fn progress_pct_stays_in_bounds() {
        for xp in (0i64..15_000_000).step_by(99_991) {
            let p = compute_progress(xp);
            assert!(p.progress_pct >= 0.0 && p.progress_pct <= 100.0);
        }
    }

    #[test]
    fn progress_pinned_at_max_level() {
        let p = compute_progress(level_to_xp(99) + 123);
        assert_eq!(p.level, 99);
        assert_eq!(p.xp_for_next_level, p.xp_for_current_level);
        assert!((p.progress_pct - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn progress_at_fresh_skill() {
        let p = compute_progress(0);
        assert_eq!(p.level, 1);
        assert_eq!(p.xp_for_current_level, 0);
        assert_eq!(p.xp_for_next_level, 83);
        assert!(p.progress_pct.abs() < f64::EPSILON);
    }
}
