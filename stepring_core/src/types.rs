//! Core domain types for the Stepring dashboard.
//!
//! This module defines the fundamental types used throughout the system:
//! - Step counts and calorie estimates
//! - Daily targets and the configured target options
//! - Health data types and authorization scopes
//! - Step samples and the day window used to aggregate them

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Counts
// ============================================================================

/// Cumulative steps recorded for one calendar day
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepCount(pub u64);

impl StepCount {
    pub const ZERO: StepCount = StepCount(0);

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for StepCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Estimated kilocalories burned, derived from a [`StepCount`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CalorieEstimate(pub u64);

impl CalorieEstimate {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CalorieEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} kcal", self.0)
    }
}

// ============================================================================
// Targets
// ============================================================================

/// A daily step goal picked by the user
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DailyTarget(pub u64);

impl DailyTarget {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for DailyTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} steps", self.0)
    }
}

/// The enumerated set of targets the picker offers, plus the initial selection
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetOptions {
    options: Vec<DailyTarget>,
    default: DailyTarget,
}

impl TargetOptions {
    /// Build a target set, rejecting empty or inconsistent input
    ///
    /// Options keep the order given. The default must be one of them.
    pub fn new(options: Vec<DailyTarget>, default: DailyTarget) -> crate::Result<Self> {
        if options.is_empty() {
            return Err(crate::Error::Config("target options must not be empty".into()));
        }
        if let Some(zero) = options.iter().find(|t| t.0 == 0) {
            return Err(crate::Error::Config(format!(
                "target options must be positive, got {}",
                zero.0
            )));
        }
        let unique: BTreeSet<_> = options.iter().collect();
        if unique.len() != options.len() {
            return Err(crate::Error::Config(
                "target options must not contain duplicates".into(),
            ));
        }
        if !options.contains(&default) {
            return Err(crate::Error::Config(format!(
                "default target {} is not one of the options",
                default.0
            )));
        }
        Ok(Self { options, default })
    }

    pub fn options(&self) -> &[DailyTarget] {
        &self.options
    }

    pub fn default_target(&self) -> DailyTarget {
        self.default
    }

    pub fn contains(&self, target: DailyTarget) -> bool {
        self.options.contains(&target)
    }
}

impl Default for TargetOptions {
    fn default() -> Self {
        Self {
            options: vec![
                DailyTarget(5_000),
                DailyTarget(10_000),
                DailyTarget(15_000),
                DailyTarget(20_000),
            ],
            default: DailyTarget(5_000),
        }
    }
}

// ============================================================================
// Authorization
// ============================================================================

/// Kind of health data a store can grant access to
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthDataType {
    Workout,
    StepCount,
}

/// Share (write) and read scopes requested in one handshake
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationScopes {
    pub share: BTreeSet<HealthDataType>,
    pub read: BTreeSet<HealthDataType>,
}

impl AuthorizationScopes {
    pub fn new(
        share: impl IntoIterator<Item = HealthDataType>,
        read: impl IntoIterator<Item = HealthDataType>,
    ) -> Self {
        Self {
            share: share.into_iter().collect(),
            read: read.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.share.is_empty() && self.read.is_empty()
    }
}

/// Answer to an authorization request that completed without error
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationOutcome {
    Granted,
    Denied,
}

// ============================================================================
// Samples and windows
// ============================================================================

/// A single step-count sample recorded by a health store
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepSample {
    pub id: Uuid,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub count: u64,
    #[serde(default)]
    pub source: Option<String>,
}

impl StepSample {
    /// Create a sample with a fresh id
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, count: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            start,
            end,
            count,
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Half-open time window `[start, end)` tied to one local calendar day
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DayWindow {
    pub date: NaiveDate,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DayWindow {
    /// Window from the start of `now`'s local day up to `now`
    pub fn today<Tz: TimeZone>(now: DateTime<Tz>) -> Self {
        let date = now.date_naive();
        let start = local_midnight(&now.timezone(), date);
        Self {
            date,
            start,
            end: now.with_timezone(&Utc),
        }
    }

    /// Whole local day `[midnight, next midnight)` for `date`
    pub fn for_date<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> Self {
        let start = local_midnight(tz, date);
        let end = date
            .succ_opt()
            .map(|next| local_midnight(tz, next))
            .unwrap_or_else(|| start + Duration::days(1));
        Self { date, start, end }
    }

    /// Inclusive start, exclusive end
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant < self.end
    }
}

/// Midnight of `date` in `tz`, as UTC.
///
/// Where a DST transition skips midnight the day starts at 01:00 local.
fn local_midnight<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> DateTime<Utc> {
    let naive: NaiveDateTime = date.and_time(chrono::NaiveTime::MIN);
    match tz.from_local_datetime(&naive).earliest() {
        Some(dt) => dt.with_timezone(&Utc),
        None => {
            // Midnight does not exist locally; the day begins one hour later.
            let shifted = naive + Duration::hours(1);
            tz.from_local_datetime(&shifted)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
        }
    }
}
