//! Step-to-calorie estimation.
//!
//! A fixed table of "round" step counts is consulted first; every other
//! count falls back to a flat per-step rate.

use crate::{CalorieEstimate, StepCount};
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Kilocalories burned per step for counts outside the table
pub const CALORIES_PER_STEP: f64 = 0.04;

/// Exact-match steps → kcal pairs.
///
/// NOTE: the 40000 entry is 16000, ten times the linear rate (1600). Kept
/// as-is until product confirms the intended value.
pub const STEPS_PER_CALORIE_TABLE: [(u64, u64); 7] = [
    (625, 25),
    (1_250, 50),
    (2_500, 100),
    (5_000, 200),
    (10_000, 400),
    (20_000, 800),
    (40_000, 16_000),
];

static TABLE: Lazy<HashMap<u64, u64>> =
    Lazy::new(|| STEPS_PER_CALORIE_TABLE.iter().copied().collect());

/// Estimate kilocalories burned for a day's step count
pub fn estimate_calories(steps: StepCount) -> CalorieEstimate {
    if let Some(&calories) = TABLE.get(&steps.0) {
        return CalorieEstimate(calories);
    }
    CalorieEstimate(linear_estimate(steps.0))
}

/// `floor(steps * 0.04)` in integer arithmetic
fn linear_estimate(steps: u64) -> u64 {
    // 0.04 == 1/25
    steps / 25
}
