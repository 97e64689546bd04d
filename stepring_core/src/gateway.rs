//! The health-data store contract the dashboard depends on.
//!
//! Implementations live in [`crate::sample_store`] (file-backed) and
//! [`crate::synthetic`] (in-memory).

use crate::{
    AuthorizationError, AuthorizationOutcome, AuthorizationScopes, DayWindow, HealthDataType,
    QueryError, StepCount,
};
use async_trait::async_trait;

/// Asynchronous access to a store of health samples
#[async_trait]
pub trait HealthDataGateway: Send + Sync + 'static {
    /// Ask the store for share and read access to the given data types.
    ///
    /// `Ok(Denied)` is a normal answer; `Err` means the request itself failed.
    async fn request_authorization(
        &self,
        scopes: &AuthorizationScopes,
    ) -> Result<AuthorizationOutcome, AuthorizationError>;

    /// Sum of step samples whose start falls in `window`.
    ///
    /// A window with no samples sums to zero.
    async fn query_daily_step_sum(&self, window: DayWindow) -> Result<StepCount, QueryError>;
}

/// Scopes the dashboard requests on activation: share and read for
/// workouts and step count.
pub fn dashboard_scopes() -> AuthorizationScopes {
    let types = [HealthDataType::Workout, HealthDataType::StepCount];
    AuthorizationScopes::new(types, types)
}

/// Add up the samples of one day, saturating rather than overflowing
pub(crate) fn sum_in_window<'a>(
    samples: impl IntoIterator<Item = &'a crate::StepSample>,
    window: &DayWindow,
) -> StepCount {
    let total = samples
        .into_iter()
        .filter(|s| window.contains(s.start))
        .fold(0u64, |acc, s| acc.saturating_add(s.count));
    StepCount(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StepSample;
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn test_dashboard_scopes() {
        let scopes = dashboard_scopes();
        assert_eq!(scopes.share.len(), 2);
        assert_eq!(scopes.share, scopes.read);
        assert!(scopes.read.contains(&HealthDataType::StepCount));
        assert!(scopes.read.contains(&HealthDataType::Workout));
    }

    #[test]
    fn test_sum_in_window_uses_strict_start() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 18, 0, 0).unwrap();
        let window = DayWindow::today(now);
        let minute = Duration::minutes(1);

        let samples = vec![
            // exactly at midnight: included
            StepSample::new(window.start, window.start + minute, 100),
            // started yesterday, ends today: excluded
            StepSample::new(window.start - minute, window.start + minute, 50),
            StepSample::new(now - Duration::hours(2), now - Duration::hours(1), 1000),
            // starts at now: excluded
            StepSample::new(now, now + minute, 7),
        ];

        assert_eq!(sum_in_window(&samples, &window), StepCount(1100));
    }

    #[test]
    fn test_sum_in_window_empty_is_zero() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 18, 0, 0).unwrap();
        let window = DayWindow::today(now);
        let samples: Vec<StepSample> = Vec::new();
        assert_eq!(sum_in_window(&samples, &window), StepCount::ZERO);
    }
}
