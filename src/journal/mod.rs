//! Append-only CSV journal of emotion detections.
//!
//! One header line followed by one line per detection:
//! `timestamp,emotion,confidence,source`. Fields are never quoted, so labels
//! must not contain commas. The file is never rewritten or rotated.

mod recent;
mod summary;

pub use recent::get_recent_entries;
pub use summary::{get_daily_summary, DailySummary};

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, SecondsFormat};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use tracing::{debug, warn};

use crate::analyzer::EmotionResult;

/// Column names, in file order
pub const LOG_COLUMNS: [&str; 4] = ["timestamp", "emotion", "confidence", "source"];

/// Source recorded when none is given
pub const DEFAULT_SOURCE: &str = "webcam";

/// One persisted detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Wall-clock time as stored (UTC for everything this crate writes)
    pub timestamp: NaiveDateTime,
    pub emotion: String,
    pub confidence: f64,
    pub source: String,
}

fn header_line() -> String {
    LOG_COLUMNS.join(",")
}

/// Create the log (and its parent directories) with the header row if it
/// does not exist yet. An existing file is left untouched.
pub fn ensure_log_file(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory {:?}", parent))?;
    }

    match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(mut file) => {
            writeln!(file, "{}", header_line())
                .with_context(|| format!("Failed to write log header to {:?}", path))?;
            debug!("Created emotion log at {:?}", path);
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(()),
        Err(e) => Err(e).with_context(|| format!("Failed to create emotion log {:?}", path)),
    }
}

/// Append one detection to the log
pub fn append_log_entry(path: &Path, result: &EmotionResult, source: &str) -> Result<()> {
    ensure_log_file(path)?;

    let line = format!(
        "{},{},{:.4},{}",
        result
            .timestamp
            .to_rfc3339_opts(SecondsFormat::Micros, true),
        result.dominant_emotion,
        result.confidence,
        source
    );

    let mut file = OpenOptions::new()
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open emotion log {:?}", path))?;
    writeln!(file, "{}", line)
        .with_context(|| format!("Failed to append to emotion log {:?}", path))?;

    debug!("Logged {} ({:.4}) from {}", result.dominant_emotion, result.confidence, source);
    Ok(())
}

/// Load every well-formed row. A missing or empty file yields no rows.
///
/// Rows with an unparseable timestamp, an empty emotion, or a confidence that
/// is missing or outside [0, 1] are dropped rather than failing the load.
pub fn load_log_records(path: &Path) -> Result<Vec<LogRecord>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read emotion log {:?}", path))?;

    let mut records = Vec::new();
    let mut dropped = 0usize;

    for (idx, line) in content.lines().enumerate() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        if idx == 0 && line.trim() == header_line() {
            continue;
        }

        match parse_record(line) {
            Some(record) => records.push(record),
            None => {
                dropped += 1;
                debug!("Dropping malformed log row {}: {:?}", idx + 1, line);
            }
        }
    }

    if dropped > 0 {
        warn!("Dropped {} malformed row(s) from {:?}", dropped, path);
    }

    Ok(records)
}

fn parse_record(line: &str) -> Option<LogRecord> {
    let mut fields = line.split(',');

    let timestamp = parse_timestamp(fields.next()?)?;

    let emotion = fields.next()?.trim();
    if emotion.is_empty() {
        return None;
    }

    let confidence: f64 = fields.next()?.trim().parse().ok()?;
    if !(0.0..=1.0).contains(&confidence) {
        return None;
    }

    let source = match fields.next().map(str::trim) {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => DEFAULT_SOURCE.to_string(),
    };

    Some(LogRecord {
        timestamp,
        emotion: emotion.to_string(),
        confidence,
        source,
    })
}

/// Parse a stored timestamp into its wall-clock value.
///
/// Offsets are kept as recorded, not converted: the calendar date of a row is
/// the date written in the file.
fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    fn result_at(emotion: &str, confidence: f64, ts: &str) -> EmotionResult {
        let timestamp = DateTime::parse_from_rfc3339(ts).unwrap().with_timezone(&Utc);
        EmotionResult {
            dominant_emotion: emotion.to_string(),
            confidence,
            emotions: BTreeMap::from([(emotion.to_string(), 1.0)]),
            timestamp,
        }
    }

    #[test]
    fn test_ensure_creates_header_only() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data").join("mood_log.csv");

        ensure_log_file(&path).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "timestamp,emotion,confidence,source\n"
        );
    }

    #[test]
    fn test_ensure_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mood_log.csv");

        ensure_log_file(&path).unwrap();
        let first = fs::read_to_string(&path).unwrap();
        ensure_log_file(&path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), first);
    }

    #[test]
    fn test_ensure_preserves_existing_entries() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mood_log.csv");
        let existing = "timestamp,emotion,confidence,source\n2026-10-19T08:00:00Z,happy,0.9000,webcam\n";
        fs::write(&path, existing).unwrap();

        ensure_log_file(&path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), existing);
    }

    #[test]
    fn test_append_line_format() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mood_log.csv");

        let result = result_at("happy", 0.666666, "2026-10-19T08:15:02.123456Z");
        append_log_entry(&path, &result, "webcam").unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], "2026-10-19T08:15:02.123456Z,happy,0.6667,webcam");
    }

    #[test]
    fn test_append_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mood_log.csv");

        append_log_entry(&path, &result_at("sad", 0.5, "2026-10-18T23:59:59Z"), "image").unwrap();
        append_log_entry(&path, &result_at("happy", 0.75, "2026-10-19T00:00:01Z"), "webcam")
            .unwrap();

        let records = load_log_records(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].emotion, "sad");
        assert_eq!(records[0].source, "image");
        assert_eq!(
            records[1].timestamp,
            NaiveDate::from_ymd_opt(2026, 10, 19)
                .unwrap()
                .and_hms_opt(0, 0, 1)
                .unwrap()
        );
    }

    #[test]
    fn test_load_missing_and_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mood_log.csv");
        assert!(load_log_records(&path).unwrap().is_empty());

        fs::write(&path, "").unwrap();
        assert!(load_log_records(&path).unwrap().is_empty());

        ensure_log_file(&dir.path().join("header_only.csv")).unwrap();
        assert!(load_log_records(&dir.path().join("header_only.csv"))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_load_drops_malformed_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mood_log.csv");
        fs::write(
            &path,
            "timestamp,emotion,confidence,source\n\
             2026-10-19T08:00:00Z,happy,0.9000,webcam\n\
             yesterday-ish,sad,0.5000,webcam\n\
             2026-10-19T08:01:00Z,,0.5000,webcam\n\
             2026-10-19T08:02:00Z,angry,,webcam\n\
             2026-10-19T08:03:00Z,angry,NaN,webcam\n\
             2026-10-19T08:03:30Z,angry,1e300,webcam\n\
             2026-10-19T08:03:45Z,angry,-0.2000,webcam\n\
             2026-10-19T08:04:00Z,fear\n\
             2026-10-19T08:05:00,neutral,0.4000\n",
        )
        .unwrap();

        let records = load_log_records(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].emotion, "happy");
        assert_eq!(records[1].emotion, "neutral");
        assert_eq!(records[1].source, DEFAULT_SOURCE);
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = NaiveDate::from_ymd_opt(2026, 10, 19)
            .unwrap()
            .and_hms_micro_opt(8, 15, 2, 500_000)
            .unwrap();
        assert_eq!(parse_timestamp("2026-10-19T08:15:02.5Z"), Some(expected));
        assert_eq!(parse_timestamp("2026-10-19T08:15:02.500000"), Some(expected));
        assert_eq!(parse_timestamp("2026-10-19 08:15:02.5"), Some(expected));
        assert!(parse_timestamp("not a time").is_none());
        assert!(parse_timestamp("").is_none());
    }

    #[test]
    fn test_parse_timestamp_keeps_recorded_offset() {
        // Stored date is the 20th even though the instant is the 19th in UTC
        let parsed = parse_timestamp("2026-10-20T01:00:00+05:00").unwrap();
        assert_eq!(parsed.date(), NaiveDate::from_ymd_opt(2026, 10, 20).unwrap());
        let utc = Utc.with_ymd_and_hms(2026, 10, 19, 20, 0, 0).unwrap();
        assert_ne!(parsed.date(), utc.date_naive());
    }
}
