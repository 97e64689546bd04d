//! Dashboard controller: authorization handshake and ordered step refreshes.
//!
//! Every refresh gets a sequence number. Only the completion carrying the
//! latest number may write state; anything older is dropped. The controller
//! also keeps at most one query task alive, aborting the previous one when a
//! new refresh starts.

use crate::{
    dashboard_scopes, reduce_on_step_query_result, reduce_on_target_selected,
    AuthorizationError, AuthorizationOutcome, DailyTarget, DashboardState, DashboardView,
    DayWindow, HealthDataGateway, QueryError, Result, StepCount, TargetOptions,
};
use chrono::{DateTime, TimeZone};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

type QueryResult = std::result::Result<StepCount, QueryError>;

/// A step query the controller has issued
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RefreshTicket {
    pub seq: u64,
    pub window: DayWindow,
}

/// Result of a step query, tagged with the ticket it answers
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryCompletion {
    pub seq: u64,
    pub result: QueryResult,
}

/// What happened during [`DashboardController::activate`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Activation {
    pub authorization: std::result::Result<AuthorizationOutcome, AuthorizationError>,
    pub steps: QueryResult,
}

/// Run one ticket's query against `gateway`, bounded by `timeout`
pub async fn run_query<G: HealthDataGateway + ?Sized>(
    gateway: &G,
    ticket: RefreshTicket,
    timeout: Duration,
) -> QueryCompletion {
    let result = match tokio::time::timeout(timeout, gateway.query_daily_step_sum(ticket.window))
        .await
    {
        Ok(result) => result,
        Err(_) => Err(QueryError::TimedOut(timeout.as_millis() as u64)),
    };
    QueryCompletion {
        seq: ticket.seq,
        result,
    }
}

/// Owns the dashboard state and drives the gateway
pub struct DashboardController<G: HealthDataGateway> {
    gateway: Arc<G>,
    state: DashboardState,
    query_timeout: Duration,
    latest_seq: u64,
    applied_seq: u64,
    in_flight: Option<(u64, JoinHandle<QueryCompletion>)>,
}

impl<G: HealthDataGateway> DashboardController<G> {
    pub fn new(gateway: Arc<G>, targets: TargetOptions, query_timeout: Duration) -> Self {
        Self {
            gateway,
            state: DashboardState::new(targets),
            query_timeout,
            latest_seq: 0,
            applied_seq: 0,
            in_flight: None,
        }
    }

    pub fn state(&self) -> &DashboardState {
        &self.state
    }

    pub fn view(&self) -> DashboardView {
        self.state.view()
    }

    pub fn gateway(&self) -> &Arc<G> {
        &self.gateway
    }

    /// Request authorization, then refresh today's steps.
    ///
    /// The refresh runs whatever the authorization outcome; both outcomes are
    /// logged and returned.
    pub async fn activate<Tz: TimeZone>(&mut self, now: DateTime<Tz>) -> Activation {
        let authorization = self.authorize().await;
        let steps = self.refresh(now).await;
        Activation {
            authorization,
            steps,
        }
    }

    /// Ask the gateway for share and read access to workouts and steps
    pub async fn authorize(
        &self,
    ) -> std::result::Result<AuthorizationOutcome, AuthorizationError> {
        let result = self
            .gateway
            .request_authorization(&dashboard_scopes())
            .await;
        match &result {
            Ok(AuthorizationOutcome::Granted) => tracing::info!("Health data access granted"),
            Ok(AuthorizationOutcome::Denied) => {
                tracing::warn!("Health data access denied, continuing with available data")
            }
            Err(e) => tracing::warn!("Health data authorization failed: {}", e),
        }
        result
    }

    /// Issue a refresh and wait for it to land
    pub async fn refresh<Tz: TimeZone>(&mut self, now: DateTime<Tz>) -> QueryResult {
        self.begin_refresh(now);
        self.wait_for_refresh()
            .await
            .unwrap_or(Err(QueryError::Cancelled))
    }

    /// Allocate the next ticket without running anything.
    ///
    /// For hosts that run the query themselves and report back through
    /// [`complete_refresh`](Self::complete_refresh). Any ticket issued earlier
    /// is superseded.
    pub fn next_ticket<Tz: TimeZone>(&mut self, now: DateTime<Tz>) -> RefreshTicket {
        self.latest_seq += 1;
        RefreshTicket {
            seq: self.latest_seq,
            window: DayWindow::today(now),
        }
    }

    /// Start a query task for today, aborting any task still running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn begin_refresh<Tz: TimeZone>(&mut self, now: DateTime<Tz>) -> u64 {
        self.cancel();
        let ticket = self.next_ticket(now);
        let gateway = Arc::clone(&self.gateway);
        let timeout = self.query_timeout;
        let handle =
            tokio::spawn(async move { run_query(gateway.as_ref(), ticket, timeout).await });
        tracing::debug!("Started step query #{} for {}", ticket.seq, ticket.window.date);
        self.in_flight = Some((ticket.seq, handle));
        ticket.seq
    }

    /// Wait for the in-flight query, apply it, and return its result.
    ///
    /// Returns `None` when nothing is in flight.
    pub async fn wait_for_refresh(&mut self) -> Option<QueryResult> {
        let (seq, handle) = self.in_flight.take()?;
        let completion = match handle.await {
            Ok(completion) => completion,
            Err(e) if e.is_cancelled() => QueryCompletion {
                seq,
                result: Err(QueryError::Cancelled),
            },
            Err(e) => QueryCompletion {
                seq,
                result: Err(QueryError::Unavailable(e.to_string())),
            },
        };
        let result = completion.result.clone();
        self.complete_refresh(completion);
        Some(result)
    }

    /// Apply a completion if it answers the latest ticket.
    ///
    /// Returns whether state changed hands to this completion.
    pub fn complete_refresh(&mut self, completion: QueryCompletion) -> bool {
        if completion.seq != self.latest_seq || completion.seq <= self.applied_seq {
            tracing::debug!(
                "Discarding step query #{} (latest #{})",
                completion.seq,
                self.latest_seq
            );
            return false;
        }

        match &completion.result {
            Ok(steps) => tracing::info!("Step query #{}: {} steps today", completion.seq, steps),
            Err(e) => tracing::warn!(
                "Step query #{} failed, showing 0 steps: {}",
                completion.seq,
                e
            ),
        }

        self.state = reduce_on_step_query_result(&self.state, &completion.result);
        self.applied_seq = completion.seq;
        true
    }

    /// Abort the in-flight query, if any. State is left as it was.
    pub fn cancel(&mut self) -> bool {
        match self.in_flight.take() {
            Some((seq, handle)) => {
                handle.abort();
                tracing::debug!("Cancelled step query #{}", seq);
                true
            }
            None => false,
        }
    }

    pub fn select_target(&mut self, target: DailyTarget) -> Result<()> {
        self.state = reduce_on_target_selected(&self.state, target)?;
        tracing::debug!("Selected daily target {}", target);
        Ok(())
    }
}

impl<G: HealthDataGateway> Drop for DashboardController<G> {
    fn drop(&mut self) {
        self.cancel();
    }
}
