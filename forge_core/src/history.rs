//! Performance log loading and per-exercise views.
//!
//! The log is a CSV file with one row per logged set:
//! `exercise_id,weight,reps,duration_sec,scheduled_weight,scheduled_reps,scheduled_duration_sec,performed_at`.
//! Blank cells are absent values (a blank weight is bodyweight work).

use crate::catalog::ExerciseCatalog;
use crate::coverage::SessionSummary;
use crate::{PerformanceLogEntry, PersonalRecord, Result};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use csv::ReaderBuilder;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// CSV row format for reading logged sets
#[derive(Debug, Deserialize)]
struct CsvRow {
    exercise_id: String,
    weight: Option<f64>,
    reps: Option<u32>,
    duration_sec: Option<u32>,
    scheduled_weight: Option<f64>,
    scheduled_reps: Option<u32>,
    scheduled_duration_sec: Option<u32>,
    performed_at: String,
}

impl TryFrom<CsvRow> for PerformanceLogEntry {
    type Error = crate::Error;

    fn try_from(row: CsvRow) -> Result<Self> {
        if row.exercise_id.trim().is_empty() {
            return Err(crate::Error::Other("Row has empty exercise_id".into()));
        }

        let performed_at = DateTime::parse_from_rfc3339(row.performed_at.trim())
            .map_err(|e| crate::Error::Other(format!("Invalid date: {}", e)))?
            .with_timezone(&Utc);

        if row.reps.is_none() && row.duration_sec.is_none() {
            return Err(crate::Error::Other(format!(
                "Row for {} has neither reps nor duration",
                row.exercise_id
            )));
        }

        Ok(PerformanceLogEntry {
            exercise_id: row.exercise_id.trim().to_string(),
            weight: row.weight.filter(|w| w.is_finite()),
            reps: row.reps,
            duration_sec: row.duration_sec,
            scheduled_weight: row.scheduled_weight.filter(|w| w.is_finite()),
            scheduled_reps: row.scheduled_reps,
            scheduled_duration_sec: row.scheduled_duration_sec,
            performed_at,
        })
    }
}

/// Load every entry from a history CSV, newest first.
///
/// A missing file is an empty history. Malformed rows are skipped with a
/// warning.
pub fn load_history(path: &Path) -> Result<Vec<PerformanceLogEntry>> {
    if !path.exists() {
        tracing::info!("No history file at {:?}, starting fresh", path);
        return Ok(Vec::new());
    }

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let mut entries = Vec::new();
    for result in reader.deserialize::<CsvRow>() {
        match result {
            Ok(row) => match PerformanceLogEntry::try_from(row) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    tracing::warn!("Failed to parse history row: {}", e);
                }
            },
            Err(e) => {
                tracing::warn!("Failed to deserialize history row: {}", e);
            }
        }
    }

    entries.sort_by(|a, b| b.performed_at.cmp(&a.performed_at));
    tracing::info!("Loaded {} history entries from {:?}", entries.len(), path);

    Ok(entries)
}

/// Load entries performed within the last `days` days of `now`
pub fn load_recent_history(
    path: &Path,
    days: i64,
    now: DateTime<Utc>,
) -> Result<Vec<PerformanceLogEntry>> {
    let cutoff = now - Duration::days(days);
    let entries: Vec<_> = load_history(path)?
        .into_iter()
        .filter(|e| e.performed_at >= cutoff)
        .collect();
    tracing::debug!("{} entries within the last {} days", entries.len(), days);
    Ok(entries)
}

/// Entries for one exercise, newest first, at most `window` of them
pub fn recent_for(
    entries: &[PerformanceLogEntry],
    exercise_id: &str,
    window: usize,
) -> Vec<PerformanceLogEntry> {
    let mut recent: Vec<_> = entries
        .iter()
        .filter(|e| e.exercise_id == exercise_id)
        .cloned()
        .collect();
    recent.sort_by(|a, b| b.performed_at.cmp(&a.performed_at));
    recent.truncate(window);
    recent
}

/// Heaviest logged weight per exercise, with the most reps done at it
pub fn derive_personal_records(entries: &[PerformanceLogEntry]) -> Vec<PersonalRecord> {
    let mut records: BTreeMap<&str, PersonalRecord> = BTreeMap::new();

    for entry in entries {
        let Some(weight) = entry.weight.filter(|w| w.is_finite() && *w > 0.0) else {
            continue;
        };

        let record = records
            .entry(entry.exercise_id.as_str())
            .or_insert_with(|| PersonalRecord {
                exercise_id: entry.exercise_id.clone(),
                weight,
                reps: entry.reps,
            });

        if weight > record.weight {
            record.weight = weight;
            record.reps = entry.reps;
        } else if weight == record.weight && entry.reps > record.reps {
            record.reps = entry.reps;
        }
    }

    records.into_values().collect()
}

/// Explicit records win; derived records fill exercises with none
pub fn merge_personal_records(
    explicit: &[PersonalRecord],
    derived: Vec<PersonalRecord>,
) -> Vec<PersonalRecord> {
    let mut merged: Vec<PersonalRecord> = explicit.to_vec();
    for record in derived {
        if !merged.iter().any(|r| r.exercise_id == record.exercise_id) {
            merged.push(record);
        }
    }
    merged
}

pub fn record_for<'a>(records: &'a [PersonalRecord], exercise_id: &str) -> Option<&'a PersonalRecord> {
    records.iter().find(|r| r.exercise_id == exercise_id)
}

/// Summaries of the most recent training dates, most recent first.
///
/// Entries are grouped by UTC calendar date; exercises the catalog does not
/// know are ignored.
pub fn recent_sessions(
    entries: &[PerformanceLogEntry],
    catalog: &ExerciseCatalog,
    limit: usize,
) -> Vec<SessionSummary> {
    let mut by_date: BTreeMap<NaiveDate, SessionSummary> = BTreeMap::new();
    for entry in entries {
        let Some(exercise) = catalog.get(&entry.exercise_id) else {
            continue;
        };
        let summary = by_date.entry(entry.performed_at.date_naive()).or_default();
        summary.patterns.insert(exercise.movement_pattern);
        summary
            .muscles
            .extend(exercise.primary_muscles.iter().copied());
    }

    by_date.into_values().rev().take(limit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{build_default_catalog, MovementPattern};
    use std::io::Write;

    const HEADER: &str = "exercise_id,weight,reps,duration_sec,scheduled_weight,scheduled_reps,scheduled_duration_sec,performed_at\n";

    fn entry(id: &str, weight: Option<f64>, reps: u32, days_ago: i64) -> PerformanceLogEntry {
        PerformanceLogEntry {
            exercise_id: id.into(),
            weight,
            reps: Some(reps),
            duration_sec: None,
            scheduled_weight: weight,
            scheduled_reps: Some(reps),
            scheduled_duration_sec: None,
            performed_at: Utc::now() - Duration::days(days_ago),
        }
    }

    #[test]
    fn test_load_history_from_csv() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("history.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(HEADER.as_bytes()).unwrap();
        writeln!(file, "bench_press,100,10,,100,10,,2026-10-01T18:00:00Z").unwrap();
        writeln!(file, "push_up,,15,,,12,,2026-10-03T07:30:00Z").unwrap();
        writeln!(file, "plank,,,45,,,40,2026-10-02T07:30:00Z").unwrap();

        let entries = load_history(&path).unwrap();
        assert_eq!(entries.len(), 3);
        // Newest first
        assert_eq!(entries[0].exercise_id, "push_up");
        assert_eq!(entries[0].weight, None);
        assert_eq!(entries[1].duration_sec, Some(45));
        assert_eq!(entries[2].weight, Some(100.0));
    }

    #[test]
    fn test_malformed_rows_are_skipped() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("history.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(HEADER.as_bytes()).unwrap();
        writeln!(file, "bench_press,100,10,,100,10,,not-a-date").unwrap();
        writeln!(file, "bench_press,heavy,10,,100,10,,2026-10-01T18:00:00Z").unwrap();
        writeln!(file, "bench_press,,,,,,,2026-10-01T18:00:00Z").unwrap();
        writeln!(file, "bench_press,95,8,,95,8,,2026-10-01T18:00:00Z").unwrap();

        let entries = load_history(&path).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].weight, Some(95.0));
    }

    #[test]
    fn test_missing_file_is_empty_history() {
        let temp_dir = tempfile::tempdir().unwrap();
        let entries = load_history(&temp_dir.path().join("nope.csv")).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_recent_history_window() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("history.csv");
        let now = Utc::now();
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(HEADER.as_bytes()).unwrap();
        for days_ago in [1, 5, 40] {
            writeln!(
                file,
                "deadlift,140,5,,140,5,,{}",
                (now - Duration::days(days_ago)).to_rfc3339()
            )
            .unwrap();
        }

        let entries = load_recent_history(&path, 30, now).unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn test_recent_for_filters_and_windows() {
        let entries: Vec<_> = (0..15)
            .map(|d| entry("bench_press", Some(100.0), 5, d))
            .chain(std::iter::once(entry("deadlift", Some(140.0), 5, 0)))
            .collect();

        let recent = recent_for(&entries, "bench_press", 10);
        assert_eq!(recent.len(), 10);
        assert!(recent.iter().all(|e| e.exercise_id == "bench_press"));
        assert!(recent[0].performed_at > recent[9].performed_at);
    }

    #[test]
    fn test_derive_personal_records() {
        let entries = vec![
            entry("bench_press", Some(100.0), 5, 3),
            entry("bench_press", Some(105.0), 3, 2),
            entry("bench_press", Some(105.0), 4, 1),
            entry("push_up", None, 20, 1),
        ];
        let records = derive_personal_records(&entries);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].weight, 105.0);
        assert_eq!(records[0].reps, Some(4));

        let explicit = vec![PersonalRecord {
            exercise_id: "bench_press".into(),
            weight: 110.0,
            reps: Some(1),
        }];
        let merged = merge_personal_records(&explicit, records);
        assert_eq!(merged.len(), 1);
        assert_eq!(record_for(&merged, "bench_press").unwrap().weight, 110.0);
    }

    #[test]
    fn test_recent_sessions_group_by_date() {
        let catalog = build_default_catalog();
        let entries = vec![
            entry("bench_press", Some(100.0), 5, 1),
            entry("push_up", None, 15, 1),
            entry("deadlift", Some(140.0), 5, 3),
            entry("mystery_move", None, 5, 2),
        ];
        let sessions = recent_sessions(&entries, &catalog, 5);
        assert_eq!(sessions.len(), 2);
        assert!(sessions[0].patterns.contains(&MovementPattern::Push));
        assert!(sessions[1].patterns.contains(&MovementPattern::Hinge));
    }
}
