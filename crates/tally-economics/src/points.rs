// crates/tally-economics/src/points.rs
//
// Task-point arithmetic: promotional windows and activity streaks.
//
// Points for a task are computed in this exact order, truncating after
// each step:
//   p = base * window_pct / 100
//   p = p * (100 + streak_bonus_pct) / 100

use serde::{Deserialize, Serialize};

use tally_core::TallyError;

use crate::weighting::SECONDS_PER_DAY;

/// Time range `[start, end)` during which task points are multiplied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromoWindow {
    pub start: u64,
    pub end: u64,
    /// Percentage applied inside the window (200 = double points).
    pub multiplier_pct: u64,
}

impl PromoWindow {
    pub fn is_active(&self, now: u64) -> bool {
        self.start <= now && now < self.end
    }

    /// Multiplier percentage in effect at `now`; 100 outside the window.
    pub fn multiplier_pct_at(&self, now: u64) -> u64 {
        if self.is_active(now) {
            self.multiplier_pct
        } else {
            100
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakPolicy {
    /// Maximum gap between two events that continues a streak.
    pub window_secs: u64,
    /// Bonus percentage per streak step beyond the first.
    pub per_task_bonus_pct: u64,
    pub max_bonus_pct: u64,
}

impl StreakPolicy {
    /// Streak after an event at `now`, given the previous streak and event time.
    pub fn next_streak(&self, streak: u32, last_event_at: Option<u64>, now: u64) -> u32 {
        match last_event_at {
            Some(last) if streak > 0 && now.saturating_sub(last) <= self.window_secs => {
                streak.saturating_add(1)
            }
            _ => 1,
        }
    }

    /// `min(per_task_bonus_pct * (streak - 1), max_bonus_pct)`.
    pub fn bonus_pct(&self, streak: u32) -> u64 {
        let steps = streak.saturating_sub(1) as u64;
        self.per_task_bonus_pct
            .saturating_mul(steps)
            .min(self.max_bonus_pct)
    }
}

impl Default for StreakPolicy {
    fn default() -> Self {
        Self {
            window_secs: SECONDS_PER_DAY,
            per_task_bonus_pct: 5,
            max_bonus_pct: 50,
        }
    }
}

/// Points for one task. Do not reorder the steps; truncation depends on it.
pub fn task_points(base: u64, window_pct: u64, streak_bonus_pct: u64) -> Result<u64, TallyError> {
    let windowed = base
        .checked_mul(window_pct)
        .ok_or(TallyError::Overflow("task points"))?
        / 100;
    let factor = 100u64
        .checked_add(streak_bonus_pct)
        .ok_or(TallyError::Overflow("task points"))?;
    Ok(windowed
        .checked_mul(factor)
        .ok_or(TallyError::Overflow("task points"))?
        / 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_promo_window_is_half_open() {
        let promo = PromoWindow {
            start: 100,
            end: 200,
            multiplier_pct: 200,
        };
        assert_eq!(promo.multiplier_pct_at(99), 100);
        assert_eq!(promo.multiplier_pct_at(100), 200);
        assert_eq!(promo.multiplier_pct_at(199), 200);
        assert_eq!(promo.multiplier_pct_at(200), 100);
    }

    #[test]
    fn test_streak_continues_within_window_and_resets_after() {
        let policy = StreakPolicy::default();
        assert_eq!(policy.next_streak(0, None, 10), 1);
        assert_eq!(policy.next_streak(1, Some(10), 10 + SECONDS_PER_DAY), 2);
        assert_eq!(policy.next_streak(2, Some(10), 11 + SECONDS_PER_DAY), 1);
    }

    #[test]
    fn test_streak_bonus_caps() {
        let policy = StreakPolicy::default();
        let mut streak = 0;
        let mut last = None;
        for i in 0..20u64 {
            let now = 1_000 + i * 60;
            streak = policy.next_streak(streak, last, now);
            last = Some(now);
        }
        assert_eq!(streak, 20);
        assert_eq!(policy.bonus_pct(streak), 50);
        assert_eq!(policy.bonus_pct(1), 0);
        assert_eq!(policy.bonus_pct(3), 10);
    }

    #[test]
    fn test_task_points_truncate_in_order() {
        // 33 * 150 / 100 = 49, then 49 * 115 / 100 = 56.
        assert_eq!(task_points(33, 150, 15).unwrap(), 56);
        // 7 * 150 / 100 = 10, then 10 * 105 / 100 = 10; one merged division would give 11.
        assert_eq!(task_points(7, 150, 5).unwrap(), 10);
        assert_eq!(task_points(100, 200, 50).unwrap(), 300);
    }
}
