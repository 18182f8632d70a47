use anyhow::Result;
use std::path::Path;

use super::{load_log_records, LogRecord};

/// The `limit` most recent well-formed rows, newest first.
///
/// Rows sharing a timestamp keep their file order.
pub fn get_recent_entries(path: &Path, limit: usize) -> Result<Vec<LogRecord>> {
    let mut records = load_log_records(path)?;
    records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    records.truncate(limit);
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::EmotionResult;
    use crate::journal::append_log_entry;
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeMap;
    use std::fs;
    use tempfile::tempdir;

    fn result(emotion: &str, hour: u32) -> EmotionResult {
        EmotionResult {
            dominant_emotion: emotion.to_string(),
            confidence: 0.9,
            emotions: BTreeMap::from([(emotion.to_string(), 1.0)]),
            timestamp: Utc.with_ymd_and_hms(2026, 10, 19, hour, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_newest_first_with_limit() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mood_log.csv");

        // Written out of order on purpose
        append_log_entry(&path, &result("sad", 9), "webcam").unwrap();
        append_log_entry(&path, &result("happy", 11), "webcam").unwrap();
        append_log_entry(&path, &result("neutral", 10), "webcam").unwrap();

        let recent = get_recent_entries(&path, 2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].emotion, "happy");
        assert_eq!(recent[1].emotion, "neutral");
    }

    #[test]
    fn test_limit_larger_than_log() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mood_log.csv");
        append_log_entry(&path, &result("sad", 9), "webcam").unwrap();

        assert_eq!(get_recent_entries(&path, 10).unwrap().len(), 1);
        assert!(get_recent_entries(&path, 0).unwrap().is_empty());
    }

    #[test]
    fn test_empty_and_malformed_logs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mood_log.csv");
        assert!(get_recent_entries(&path, 5).unwrap().is_empty());

        fs::write(
            &path,
            "timestamp,emotion,confidence,source\nbad,happy,0.5,webcam\n2026-10-19T08:00:00Z,,0.5,webcam\n",
        )
        .unwrap();
        assert!(get_recent_entries(&path, 5).unwrap().is_empty());
    }

    #[test]
    fn test_unparseable_timestamp_excluded() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mood_log.csv");
        fs::write(
            &path,
            "timestamp,emotion,confidence,source\n\
             2026-10-19T08:00:00Z,happy,0.5000,webcam\n\
             2026-10-19T25:00:00Z,sad,0.5000,webcam\n",
        )
        .unwrap();

        let recent = get_recent_entries(&path, 10).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].emotion, "happy");
    }
}
