//! Per-day step history and CSV export.
//!
//! Totals are computed with the same half-open windows the dashboard uses:
//! today runs up to `now`, earlier days cover their whole local day.

use crate::gateway::sum_in_window;
use crate::{estimate_calories, CalorieEstimate, DayWindow, Result, StepCount, StepSample};
use chrono::{DateTime, Duration, NaiveDate, TimeZone};
use std::fs::File;
use std::path::Path;

/// One day's totals
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub steps: StepCount,
    pub calories: CalorieEstimate,
}

/// A row in the CSV output
#[derive(Debug, serde::Serialize)]
struct CsvRow {
    date: String,
    steps: u64,
    calories: u64,
}

impl From<&DailySummary> for CsvRow {
    fn from(summary: &DailySummary) -> Self {
        CsvRow {
            date: summary.date.to_string(),
            steps: summary.steps.get(),
            calories: summary.calories.get(),
        }
    }
}

/// Longest history a single call will compute
pub const MAX_HISTORY_DAYS: u32 = 3_660;

/// Totals for the last `days` local days ending today, newest first.
///
/// Days without samples report zero. `days` is capped at
/// [`MAX_HISTORY_DAYS`], and the walk stops early at the calendar's lower
/// bound.
pub fn daily_summaries<Tz: TimeZone>(
    samples: &[StepSample],
    days: u32,
    now: DateTime<Tz>,
) -> Vec<DailySummary> {
    let tz = now.timezone();
    let today = DayWindow::today(now);
    let days = days.min(MAX_HISTORY_DAYS);

    let mut windows = Vec::with_capacity(days as usize);
    if days > 0 {
        windows.push(today);
    }
    let mut date = today.date;
    for _ in 1..days {
        match date.checked_sub_signed(Duration::days(1)) {
            Some(prev) => date = prev,
            None => break,
        }
        windows.push(DayWindow::for_date(date, &tz));
    }

    windows
        .into_iter()
        .map(|window| {
            let steps = sum_in_window(samples, &window);
            DailySummary {
                date: window.date,
                steps,
                calories: estimate_calories(steps),
            }
        })
        .collect()
}

/// Write summaries to `path` as CSV with headers, replacing any existing file
///
/// Returns the number of rows written.
pub fn export_csv(summaries: &[DailySummary], path: &Path) -> Result<usize> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = File::create(path)?;
    let mut writer = csv::WriterBuilder::new().has_headers(true).from_writer(file);

    for summary in summaries {
        writer.serialize(CsvRow::from(summary))?;
    }

    writer.flush()?;
    let file = writer
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    file.sync_all()?;

    tracing::info!("Exported {} daily summaries to {:?}", summaries.len(), path);
    Ok(summaries.len())
}
