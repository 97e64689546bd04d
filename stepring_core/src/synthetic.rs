//! In-memory health store for tests and hosts without a real store.
//!
//! Samples, the authorization answer, query failures and query latency are
//! all injectable, which makes the controller's ordering and fallback
//! behavior reproducible.
//!
//! All data access goes through `RwLock`; a poisoned lock surfaces as an
//! `Unavailable` error instead of a panic.

use crate::gateway::sum_in_window;
use crate::{
    AuthorizationError, AuthorizationOutcome, AuthorizationScopes, DayWindow, HealthDataGateway,
    QueryError, StepCount, StepSample,
};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

type AuthorizationAnswer = Result<AuthorizationOutcome, AuthorizationError>;

/// Synthetic health store
#[derive(Clone)]
pub struct SyntheticHealthStore {
    samples: Arc<RwLock<Vec<StepSample>>>,
    authorization: Arc<RwLock<AuthorizationAnswer>>,
    failure: Arc<RwLock<Option<QueryError>>>,
    /// Per-query delays, consumed front to back
    delays: Arc<RwLock<VecDeque<Duration>>>,
    authorization_requests: Arc<AtomicUsize>,
    queries: Arc<AtomicUsize>,
}

impl Default for SyntheticHealthStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntheticHealthStore {
    /// Empty store that grants every request
    pub fn new() -> Self {
        Self::with_samples(Vec::new())
    }

    pub fn with_samples(samples: Vec<StepSample>) -> Self {
        Self {
            samples: Arc::new(RwLock::new(samples)),
            authorization: Arc::new(RwLock::new(Ok(AuthorizationOutcome::Granted))),
            failure: Arc::new(RwLock::new(None)),
            delays: Arc::new(RwLock::new(VecDeque::new())),
            authorization_requests: Arc::new(AtomicUsize::new(0)),
            queries: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn add_sample(&self, sample: StepSample) {
        if let Ok(mut samples) = self.samples.write() {
            samples.push(sample);
        }
    }

    /// Answer every later authorization request with `answer`
    pub fn set_authorization(&self, answer: AuthorizationAnswer) {
        if let Ok(mut slot) = self.authorization.write() {
            *slot = answer;
        }
    }

    /// Fail every later query with `error`, or clear the failure with `None`
    pub fn set_query_failure(&self, error: Option<QueryError>) {
        if let Ok(mut slot) = self.failure.write() {
            *slot = error;
        }
    }

    /// Delay the next queries, one entry per query
    pub fn push_query_delay(&self, delay: Duration) {
        if let Ok(mut delays) = self.delays.write() {
            delays.push_back(delay);
        }
    }

    pub fn authorization_requests(&self) -> usize {
        self.authorization_requests.load(Ordering::SeqCst)
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    fn next_delay(&self) -> Option<Duration> {
        self.delays.write().ok().and_then(|mut d| d.pop_front())
    }
}

#[async_trait]
impl HealthDataGateway for SyntheticHealthStore {
    async fn request_authorization(
        &self,
        scopes: &AuthorizationScopes,
    ) -> Result<AuthorizationOutcome, AuthorizationError> {
        self.authorization_requests.fetch_add(1, Ordering::SeqCst);
        if scopes.is_empty() {
            return Ok(AuthorizationOutcome::Granted);
        }
        self.authorization
            .read()
            .map_err(|e| AuthorizationError::Unavailable(e.to_string()))?
            .clone()
    }

    async fn query_daily_step_sum(&self, window: DayWindow) -> Result<StepCount, QueryError> {
        self.queries.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.next_delay() {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = self
            .failure
            .read()
            .map_err(|e| QueryError::Unavailable(e.to_string()))?
            .clone()
        {
            return Err(error);
        }

        let samples = self
            .samples
            .read()
            .map_err(|e| QueryError::Unavailable(e.to_string()))?;
        Ok(sum_in_window(samples.iter(), &window))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard_scopes;
    use chrono::{Duration as ChronoDuration, TimeZone, Utc};

    #[tokio::test]
    async fn test_sums_injected_samples() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 18, 0, 0).unwrap();
        let store = SyntheticHealthStore::new();
        store.add_sample(StepSample::new(
            now - ChronoDuration::seconds(30),
            now - ChronoDuration::seconds(10),
            625,
        ));

        let steps = store.query_daily_step_sum(DayWindow::today(now)).await.unwrap();
        assert_eq!(steps, StepCount(625));
        assert_eq!(store.query_count(), 1);
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let store = SyntheticHealthStore::new();
        store.set_query_failure(Some(QueryError::Failed("disk on fire".into())));

        let result = store.query_daily_step_sum(DayWindow::today(Utc::now())).await;
        assert_eq!(result, Err(QueryError::Failed("disk on fire".into())));
    }

    #[tokio::test]
    async fn test_authorization_answer_is_configurable() {
        let store = SyntheticHealthStore::new();
        assert_eq!(
            store.request_authorization(&dashboard_scopes()).await,
            Ok(AuthorizationOutcome::Granted)
        );

        store.set_authorization(Ok(AuthorizationOutcome::Denied));
        assert_eq!(
            store.request_authorization(&dashboard_scopes()).await,
            Ok(AuthorizationOutcome::Denied)
        );
        assert_eq!(store.authorization_requests(), 2);
    }
}
