use anyhow::Result;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

use super::{load_log_records, LogRecord};

const CONFIDENCE_SCALE: f64 = 1e9;

/// Aggregated emotion metrics for a single (UTC) day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySummary {
    pub target_date: NaiveDate,
    pub total_scans: usize,
    /// Most frequent label, `None` when there were no scans
    pub dominant_emotion: Option<String>,
    /// Label frequency / total, empty when there were no scans
    pub distribution: BTreeMap<String, f64>,
    pub average_confidence: Option<f64>,
}

impl DailySummary {
    pub fn empty(target_date: NaiveDate) -> Self {
        Self {
            target_date,
            total_scans: 0,
            dominant_emotion: None,
            distribution: BTreeMap::new(),
            average_confidence: None,
        }
    }

    /// Aggregate the records that fall on `target_date`
    pub fn from_records(target_date: NaiveDate, records: &[LogRecord]) -> Self {
        let day: Vec<&LogRecord> = records
            .iter()
            .filter(|r| r.timestamp.date() == target_date)
            .collect();

        if day.is_empty() {
            return Self::empty(target_date);
        }

        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for record in &day {
            *counts.entry(record.emotion.as_str()).or_insert(0) += 1;
        }

        let total = day.len();

        // Label order iteration + strict `>` resolves ties to the smallest label
        let mut dominant: Option<(&str, usize)> = None;
        for (&label, &count) in &counts {
            if dominant.map_or(true, |(_, best)| count > best) {
                dominant = Some((label, count));
            }
        }

        let distribution = counts
            .iter()
            .map(|(label, count)| (label.to_string(), *count as f64 / total as f64))
            .collect();

        let sum: f64 = day.iter().map(|r| r.confidence).sum();
        let average_confidence = round_confidence(sum / total as f64);

        Self {
            target_date,
            total_scans: total,
            dominant_emotion: dominant.map(|(label, _)| label.to_string()),
            distribution,
            average_confidence: Some(average_confidence),
        }
    }
}

/// Drop float noise from a mean so `[0.5, 0.7, 0.9]` reports `0.7`
fn round_confidence(value: f64) -> f64 {
    (value * CONFIDENCE_SCALE).round() / CONFIDENCE_SCALE
}

/// Summarise the log for `target_date`, or today's UTC date when `None`.
///
/// Rows are bucketed by the calendar date of their stored timestamp, with no
/// timezone conversion.
pub fn get_daily_summary(path: &Path, target_date: Option<NaiveDate>) -> Result<DailySummary> {
    let target_date = target_date.unwrap_or_else(|| Utc::now().date_naive());
    let records = load_log_records(path)?;
    let summary = DailySummary::from_records(target_date, &records);
    debug!(
        "Summary for {}: {} scans, dominant {:?}",
        target_date, summary.total_scans, summary.dominant_emotion
    );
    Ok(summary)
}
