//! Dashboard state and the pure reducers that update it.
//!
//! The controller owns one [`DashboardState`]; every change goes through a
//! reducer, and rendering reads a [`DashboardView`] projected from it.

use crate::{
    estimate_calories, CalorieEstimate, DailyTarget, Error, QueryError, Result, StepCount,
    TargetOptions,
};
use std::fmt;

/// Everything the dashboard shows
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DashboardState {
    pub step_count: StepCount,
    pub calories: CalorieEstimate,
    pub selected_target: DailyTarget,
    pub targets: TargetOptions,
}

impl DashboardState {
    /// Zero steps with the configured default target selected
    pub fn new(targets: TargetOptions) -> Self {
        Self {
            step_count: StepCount::ZERO,
            calories: estimate_calories(StepCount::ZERO),
            selected_target: targets.default_target(),
            targets,
        }
    }

    /// Fraction of the selected target reached, uncapped
    pub fn completion_ratio(&self) -> f64 {
        self.step_count.get() as f64 / self.selected_target.get() as f64
    }

    pub fn view(&self) -> DashboardView {
        DashboardView::from(self)
    }
}

/// Apply the outcome of a step-sum query.
///
/// Failures count as zero steps so the dashboard never shows stale numbers.
pub fn reduce_on_step_query_result(
    state: &DashboardState,
    result: &std::result::Result<StepCount, QueryError>,
) -> DashboardState {
    let step_count = match result {
        Ok(steps) => *steps,
        Err(_) => StepCount::ZERO,
    };
    DashboardState {
        step_count,
        calories: estimate_calories(step_count),
        ..state.clone()
    }
}

/// Select a new daily target from the configured options
pub fn reduce_on_target_selected(
    state: &DashboardState,
    target: DailyTarget,
) -> Result<DashboardState> {
    if !state.targets.contains(target) {
        return Err(Error::InvalidTarget(target.get()));
    }
    Ok(DashboardState {
        selected_target: target,
        ..state.clone()
    })
}

/// Render inputs projected from a [`DashboardState`]
#[derive(Clone, Debug, PartialEq)]
pub struct DashboardView {
    pub steps: StepCount,
    pub calories: CalorieEstimate,
    pub target: DailyTarget,
    /// Ring fill in `[0, 1]`
    pub ring_fraction: f64,
    pub percent_of_target: u64,
    pub target_options: Vec<(DailyTarget, bool)>,
}

impl From<&DashboardState> for DashboardView {
    fn from(state: &DashboardState) -> Self {
        let ratio = state.completion_ratio();
        Self {
            steps: state.step_count,
            calories: state.calories,
            target: state.selected_target,
            ring_fraction: ratio.clamp(0.0, 1.0),
            percent_of_target: (ratio * 100.0).floor() as u64,
            target_options: state
                .targets
                .options()
                .iter()
                .map(|&t| (t, t == state.selected_target))
                .collect(),
        }
    }
}

const RING_WIDTH: usize = 20;

impl fmt::Display for DashboardView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let filled = (self.ring_fraction * RING_WIDTH as f64).round() as usize;
        writeln!(f, "Steps")?;
        writeln!(f, "  {}", self.steps)?;
        writeln!(
            f,
            "  [{}{}] {}% of {}",
            "#".repeat(filled),
            "-".repeat(RING_WIDTH - filled),
            self.percent_of_target,
            self.target
        )?;
        writeln!(f, "  {}", self.calories)?;
        write!(f, "  Targets:")?;
        for (target, selected) in &self.target_options {
            if *selected {
                write!(f, " [{}]", target.get())?;
            } else {
                write!(f, " {}", target.get())?;
            }
        }
        Ok(())
    }
}
