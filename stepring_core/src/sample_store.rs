//! File-backed step sample store.
//!
//! Samples are appended to a JSONL (JSON Lines) file with file locking so a
//! recorder and a reader can share the data directory safely. The store
//! answers the [`HealthDataGateway`] contract from that file.

use crate::authorization::AuthorizationLedger;
use crate::gateway::sum_in_window;
use crate::{
    AuthorizationError, AuthorizationOutcome, AuthorizationScopes, Config, DayWindow,
    HealthDataGateway, HealthDataType, QueryError, Result, StepCount, StepSample,
};
use async_trait::async_trait;
use chrono::Utc;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

const SAMPLES_FILE: &str = "step_samples.jsonl";
const LEDGER_FILE: &str = "authorization.json";

/// JSONL-based step store with an authorization ledger beside it
#[derive(Clone, Debug)]
pub struct JsonlHealthStore {
    samples_path: PathBuf,
    ledger_path: PathBuf,
    auto_grant: bool,
}

impl JsonlHealthStore {
    /// Create a store rooted at `data_dir`
    pub fn new(data_dir: impl AsRef<Path>, auto_grant: bool) -> Self {
        let data_dir = data_dir.as_ref();
        Self {
            samples_path: data_dir.join(SAMPLES_FILE),
            ledger_path: data_dir.join(LEDGER_FILE),
            auto_grant,
        }
    }

    /// Create a store from configuration, optionally overriding the data dir
    pub fn from_config(config: &Config, data_dir: Option<&Path>) -> Self {
        let dir = data_dir.unwrap_or(&config.data.data_dir);
        Self::new(dir, config.health.auto_grant)
    }

    pub fn samples_path(&self) -> &Path {
        &self.samples_path
    }

    pub fn ledger_path(&self) -> &Path {
        &self.ledger_path
    }

    /// Append one sample under an exclusive lock
    pub fn append(&self, sample: &StepSample) -> Result<()> {
        if let Some(parent) = self.samples_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.samples_path)?;

        file.lock_exclusive()?;

        let mut writer = std::io::BufWriter::new(&file);
        let line = serde_json::to_string(sample)?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        drop(writer);

        file.unlock()?;

        tracing::debug!("Appended step sample {} ({} steps)", sample.id, sample.count);
        Ok(())
    }

    /// Read every sample, skipping lines that fail to parse
    pub fn read_samples(&self) -> Result<Vec<StepSample>> {
        read_samples(&self.samples_path)
    }

    fn check_read_access(&self) -> Result<bool> {
        let ledger = AuthorizationLedger::load(&self.ledger_path)?;
        Ok(ledger.can_read(HealthDataType::StepCount))
    }

    fn authorize_blocking(&self, scopes: &AuthorizationScopes) -> Result<AuthorizationOutcome> {
        let mut ledger = AuthorizationLedger::load(&self.ledger_path)?;
        let (outcome, changed) = ledger.resolve(scopes, self.auto_grant, Utc::now());
        if changed {
            ledger.save(&self.ledger_path)?;
        }
        Ok(outcome)
    }

    fn query_blocking(&self, window: &DayWindow) -> std::result::Result<StepCount, QueryError> {
        if !self.check_read_access()? {
            return Err(QueryError::NotAuthorized);
        }
        let samples = self.read_samples()?;
        let total = sum_in_window(&samples, window);
        tracing::debug!(
            "Summed {} steps for {} from {} samples",
            total,
            window.date,
            samples.len()
        );
        Ok(total)
    }
}

/// Read all samples from a JSONL file
pub fn read_samples(path: &Path) -> Result<Vec<StepSample>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    file.lock_shared()?;

    let reader = BufReader::new(&file);
    let mut samples = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<StepSample>(&line) {
            Ok(sample) => samples.push(sample),
            Err(e) => {
                tracing::warn!("Failed to parse step sample at line {}: {}", line_num + 1, e);
            }
        }
    }

    file.unlock()?;
    tracing::debug!("Read {} step samples", samples.len());
    Ok(samples)
}

#[async_trait]
impl HealthDataGateway for JsonlHealthStore {
    async fn request_authorization(
        &self,
        scopes: &AuthorizationScopes,
    ) -> std::result::Result<AuthorizationOutcome, AuthorizationError> {
        let store = self.clone();
        let scopes = scopes.clone();
        tokio::task::spawn_blocking(move || store.authorize_blocking(&scopes))
            .await
            .map_err(|e| AuthorizationError::Unavailable(e.to_string()))?
            .map_err(AuthorizationError::from)
    }

    async fn query_daily_step_sum(
        &self,
        window: DayWindow,
    ) -> std::result::Result<StepCount, QueryError> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.query_blocking(&window))
            .await
            .map_err(|e| {
                if e.is_cancelled() {
                    QueryError::Cancelled
                } else {
                    QueryError::Unavailable(e.to_string())
                }
            })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard_scopes;
    use chrono::{Duration, TimeZone};

    fn store_in(dir: &Path, auto_grant: bool) -> JsonlHealthStore {
        JsonlHealthStore::new(dir, auto_grant)
    }

    #[test]
    fn test_append_and_read_samples() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = store_in(temp_dir.path(), true);

        let now = Utc::now();
        for i in 0..3 {
            let start = now - Duration::minutes(10 * (i + 1));
            store
                .append(&StepSample::new(start, start + Duration::minutes(5), 100))
                .unwrap();
        }

        let samples = store.read_samples().unwrap();
        assert_eq!(samples.len(), 3);
        assert!(samples.iter().all(|s| s.count == 100));
    }

    #[test]
    fn test_read_missing_file_is_empty() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = store_in(temp_dir.path(), true);
        assert!(store.read_samples().unwrap().is_empty());
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = store_in(temp_dir.path(), true);
        let now = Utc::now();
        store
            .append(&StepSample::new(now, now + Duration::minutes(1), 42))
            .unwrap();

        let mut file = OpenOptions::new()
            .append(true)
            .open(store.samples_path())
            .unwrap();
        writeln!(file, "{{ truncated").unwrap();

        let samples = store.read_samples().unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].count, 42);
    }

    #[tokio::test]
    async fn test_query_after_authorization() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = store_in(temp_dir.path(), true);

        let now = Utc.with_ymd_and_hms(2024, 6, 1, 20, 0, 0).unwrap();
        let window = DayWindow::today(now);
        store
            .append(&StepSample::new(window.start, window.start + Duration::hours(1), 1200))
            .unwrap();
        store
            .append(&StepSample::new(now - Duration::hours(3), now - Duration::hours(2), 2256))
            .unwrap();
        // yesterday
        store
            .append(&StepSample::new(
                window.start - Duration::hours(2),
                window.start - Duration::hours(1),
                9999,
            ))
            .unwrap();

        let outcome = store.request_authorization(&dashboard_scopes()).await.unwrap();
        assert_eq!(outcome, AuthorizationOutcome::Granted);
        assert!(store.ledger_path().exists());

        let steps = store.query_daily_step_sum(window).await.unwrap();
        assert_eq!(steps, StepCount(3456));
    }

    #[tokio::test]
    async fn test_query_without_grant_is_not_authorized() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = store_in(temp_dir.path(), false);

        let outcome = store.request_authorization(&dashboard_scopes()).await.unwrap();
        assert_eq!(outcome, AuthorizationOutcome::Denied);

        let result = store.query_daily_step_sum(DayWindow::today(Utc::now())).await;
        assert_eq!(result, Err(QueryError::NotAuthorized));
    }

    #[tokio::test]
    async fn test_query_with_no_samples_is_zero() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = store_in(temp_dir.path(), true);
        store.request_authorization(&dashboard_scopes()).await.unwrap();

        let steps = store
            .query_daily_step_sum(DayWindow::today(Utc::now()))
            .await
            .unwrap();
        assert_eq!(steps, StepCount::ZERO);
    }
}
