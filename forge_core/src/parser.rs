//! Generator output parsing and normalization.
//!
//! Generator text is untrusted: it may be wrapped in markdown fences, use
//! abbreviated or oddly-cased day names, write numbers as strings or ranges,
//! or leave out days entirely. Parsing repairs what it can and records a
//! `FieldIssue` for everything it had to drop.

use crate::{Error, FieldIssue, Result, SlotOverrides, Weekday};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

static FENCED_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```[A-Za-z]*[ \t]*\r?\n?(.*?)```").expect("fence pattern is valid")
});

/// A number, optionally followed by a range upper bound ("8-12", "8 to 12")
/// and a unit word ("45 sec", "2 min", "20kg")
static NUMBER_OR_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(\d+(?:\.\d+)?)\s*(?:(?:-|–|to)\s*(\d+(?:\.\d+)?))?\s*([A-Za-z]*)\s*$")
        .expect("number pattern is valid")
});

const KG_PER_LB: f64 = 0.453_592_37;

/// What a numeric field measures, which decides the units it accepts
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Quantity {
    Count,
    Seconds,
}

impl Quantity {
    /// Multiplier into the field's base unit, `None` for a foreign unit
    fn scale(self, unit: &str) -> Option<f64> {
        match (self, unit) {
            (_, "") => Some(1.0),
            (Quantity::Count, "x" | "rep" | "reps" | "set" | "sets") => Some(1.0),
            (Quantity::Seconds, "s" | "sec" | "secs" | "second" | "seconds") => Some(1.0),
            (Quantity::Seconds, "m" | "min" | "mins" | "minute" | "minutes") => Some(60.0),
            _ => None,
        }
    }
}

/// One exercise entry as the generator wrote it, after normalization
#[derive(Clone, Debug, PartialEq)]
pub struct RawEntry {
    pub name: String,
    pub sets: Option<u32>,
    pub reps: Option<u32>,
    pub duration_sec: Option<u32>,
    pub rest_sec: Option<u32>,
    pub weight: Option<f64>,
}

impl RawEntry {
    /// Generator values become slot overrides for target selection
    pub fn overrides(&self) -> SlotOverrides {
        SlotOverrides {
            sets: self.sets,
            reps: self.reps,
            duration_sec: self.duration_sec,
            weight: self.weight,
            rest_time_sec: self.rest_sec,
        }
    }
}

/// One day of parsed entries
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedDay {
    pub day: Weekday,
    pub entries: Vec<RawEntry>,
}

/// All seven days, in the order the generator declared them followed by
/// any days it left out (calendar order)
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedWeek {
    pub days: Vec<ParsedDay>,
    pub issues: Vec<FieldIssue>,
}

/// Remove markdown code fences, returning the JSON-looking payload
pub fn strip_code_fences(text: &str) -> &str {
    if let Some(inner) = FENCED_BLOCK.captures(text).and_then(|c| c.get(1)) {
        return inner.as_str().trim();
    }

    let trimmed = text.trim();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return trimmed;
    }

    // Prose around a bare payload
    let start = trimmed.find(['{', '[']);
    let end = trimmed.rfind(['}', ']']);
    match (start, end) {
        (Some(start), Some(end)) if end > start => &trimmed[start..=end],
        _ => trimmed,
    }
}

/// Strip fences and parse JSON
pub fn parse_payload(text: &str) -> Result<Value> {
    let payload = strip_code_fences(text);
    if payload.is_empty() {
        return Err(Error::JsonParse("generator returned no content".into()));
    }
    serde_json::from_str(payload).map_err(|e| Error::JsonParse(e.to_string()))
}

/// Parse a week object into seven normalized days
pub fn parse_week(text: &str) -> Result<ParsedWeek> {
    let value = parse_payload(text)?;
    let Value::Object(mut root) = value else {
        return Err(Error::JsonParse("expected a JSON object keyed by day".into()));
    };

    // Some responses wrap the days one level down
    if root.len() == 1 {
        let wrapper = ["week", "days", "schedule", "plan"]
            .into_iter()
            .find(|k| matches!(root.get(*k), Some(Value::Object(_))));
        if let Some(Value::Object(inner)) = wrapper.and_then(|k| root.remove(k)) {
            root = inner;
        }
    }

    let mut issues = Vec::new();
    let mut days: Vec<ParsedDay> = Vec::new();

    for (key, value) in &root {
        let Some(day) = Weekday::from_key(key) else {
            tracing::warn!("Ignoring unknown day key {:?}", key);
            issues.push(FieldIssue::new(key.as_str(), "unknown day key"));
            continue;
        };

        if days.iter().any(|d| d.day == day) {
            issues.push(FieldIssue::new(
                key.as_str(),
                format!("duplicate entry for {}", day),
            ));
            continue;
        }

        let path = day.as_str();
        let entries = match day_entries(value) {
            Some(items) => normalize_entries(items, path, &mut issues),
            None => {
                issues.push(FieldIssue::new(path, "expected an exercises array"));
                Vec::new()
            }
        };
        days.push(ParsedDay { day, entries });
    }

    for day in Weekday::ALL {
        if !days.iter().any(|d| d.day == day) {
            tracing::debug!("{} missing from generated week, treating as rest", day);
            days.push(ParsedDay {
                day,
                entries: Vec::new(),
            });
        }
    }

    Ok(ParsedWeek { days, issues })
}

/// Parse a single day's entry array
pub fn parse_day(text: &str) -> Result<(Vec<RawEntry>, Vec<FieldIssue>)> {
    let value = parse_payload(text)?;
    let mut issues = Vec::new();
    let items = day_entries(&value)
        .ok_or_else(|| Error::JsonParse("expected a JSON array of exercises".into()))?;
    let entries = normalize_entries(items, "exercises", &mut issues);
    Ok((entries, issues))
}

/// Accept `{"exercises": [...]}`, a bare array, or `null` for a rest day
fn day_entries(value: &Value) -> Option<&[Value]> {
    match value {
        Value::Array(items) => Some(items),
        Value::Object(map) => match map.get("exercises") {
            Some(Value::Array(items)) => Some(items),
            Some(Value::Null) | None => Some(&[]),
            Some(_) => None,
        },
        Value::Null => Some(&[]),
        _ => None,
    }
}

fn normalize_entries(items: &[Value], path: &str, issues: &mut Vec<FieldIssue>) -> Vec<RawEntry> {
    items
        .iter()
        .enumerate()
        .filter_map(|(idx, item)| {
            let entry_path = format!("{}.exercises[{}]", path, idx);
            match normalize_entry(item, &entry_path) {
                Ok(entry) => Some(entry),
                Err(issue) => {
                    tracing::warn!("Dropping generated entry: {}", issue);
                    issues.push(issue);
                    None
                }
            }
        })
        .collect()
}

fn field<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<(&'a str, &'a Value)> {
    keys.iter().find_map(|k| {
        map.get_key_value(*k)
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| (k.as_str(), v))
    })
}

/// Validate and normalize one entry; any unusable field rejects the entry
pub fn normalize_entry(value: &Value, path: &str) -> std::result::Result<RawEntry, FieldIssue> {
    let Value::Object(map) = value else {
        return Err(FieldIssue::new(path, "expected an object"));
    };

    let name = match field(map, &["name", "exercise", "exercise_name"]) {
        Some((_, Value::String(s))) if !s.trim().is_empty() => s.trim().to_string(),
        Some((key, _)) => {
            return Err(FieldIssue::new(format!("{}.{}", path, key), "expected a non-empty string"))
        }
        None => return Err(FieldIssue::new(format!("{}.name", path), "missing")),
    };

    let count = |keys: &[&str], quantity: Quantity| -> std::result::Result<Option<u32>, FieldIssue> {
        match field(map, keys) {
            None => Ok(None),
            Some((key, value)) => normalize_count(value, quantity)
                .map(Some)
                .ok_or_else(|| FieldIssue::new(format!("{}.{}", path, key), format!("not a usable number: {}", value))),
        }
    };

    let sets = count(&["sets"], Quantity::Count)?;
    let reps = count(&["reps", "repetitions"], Quantity::Count)?;
    let duration_sec = count(&["duration_sec", "duration", "hold_sec", "seconds"], Quantity::Seconds)?;
    let rest_sec = count(&["rest_sec", "rest_time_sec", "rest"], Quantity::Seconds)?;

    if sets == Some(0) {
        return Err(FieldIssue::new(format!("{}.sets", path), "must be at least 1"));
    }

    let weight = match field(map, &["weight", "load", "weight_kg"]) {
        None => None,
        Some((key, value)) => Some(normalize_weight(value).ok_or_else(|| {
            FieldIssue::new(format!("{}.{}", path, key), format!("not a usable weight: {}", value))
        })?),
    };

    Ok(RawEntry {
        name,
        sets,
        reps,
        duration_sec,
        rest_sec,
        weight,
    })
}

/// Parse a number or range and its lowercased unit; ranges resolve to their lower bound
fn parse_number_or_range(text: &str) -> Option<(f64, String)> {
    let caps = NUMBER_OR_RANGE.captures(text)?;
    let number = caps.get(1)?.as_str().parse::<f64>().ok()?;
    let unit = caps.get(3).map_or("", |m| m.as_str()).to_lowercase();
    Some((number, unit))
}

/// Whole, non-negative count from a number or a string like "10", "8-12",
/// "45s" or "2 min"; durations come out in seconds
fn normalize_count(value: &Value, quantity: Quantity) -> Option<u32> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let (number, unit) = parse_number_or_range(s)?;
            number * quantity.scale(&unit)?
        }
        _ => return None,
    };
    if !number.is_finite() || number < 0.0 || number > f64::from(u32::MAX) {
        return None;
    }
    Some(number.round() as u32)
}

/// Non-negative load in kg; "bodyweight" and "bw" mean an explicit 0
fn normalize_weight(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|w| w.is_finite() && *w >= 0.0),
        Value::String(s) => {
            let lowered = s.trim().to_lowercase();
            if matches!(lowered.as_str(), "bodyweight" | "body weight" | "bw") {
                return Some(0.0);
            }
            let (number, unit) = parse_number_or_range(&lowered)?;
            match unit.as_str() {
                "" | "kg" | "kgs" => Some(number),
                "lb" | "lbs" => Some(number * KG_PER_LB),
                _ => None,
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("```\n[1, 2]\n```"), "[1, 2]");
        assert_eq!(strip_code_fences("  {\"a\": 1}  "), "{\"a\": 1}");
        assert_eq!(
            strip_code_fences("Here is your plan: {\"a\": 1} Enjoy!"),
            "{\"a\": 1}"
        );
    }

    #[test]
    fn test_unparseable_text_is_json_parse_error() {
        assert!(matches!(parse_week("I cannot help with that."), Err(Error::JsonParse(_))));
        assert!(matches!(parse_week(""), Err(Error::JsonParse(_))));
        assert!(matches!(parse_week("[1, 2, 3]"), Err(Error::JsonParse(_))));
    }

    #[test]
    fn test_week_normalizes_day_keys_and_fills_missing() {
        let text = r#"```json
{
  "THU": {"exercises": [{"name": "Deadlift", "sets": 3, "reps": 5}]},
  "Monday": {"exercises": [{"name": "Bench Press", "sets": "4", "reps": "8-12"}]},
  "funday": {"exercises": []}
}
```"#;
        let week = parse_week(text).unwrap();

        assert_eq!(week.days.len(), 7);
        // Declared order first
        assert_eq!(week.days[0].day, Weekday::Thursday);
        assert_eq!(week.days[1].day, Weekday::Monday);
        assert_eq!(week.days[2].day, Weekday::Tuesday);

        let bench = &week.days[1].entries[0];
        assert_eq!(bench.sets, Some(4));
        assert_eq!(bench.reps, Some(8));

        assert_eq!(week.issues.len(), 1);
        assert_eq!(week.issues[0].path, "funday");
    }

    #[test]
    fn test_invalid_entries_dropped_with_field_path() {
        let text = r#"{
  "monday": {"exercises": [
    {"name": "Squat", "sets": "lots", "reps": 5},
    {"sets": 3, "reps": 10},
    {"name": "Plank", "sets": 3, "duration": "45s", "weight": "bodyweight"},
    "Push-up"
  ]}
}"#;
        let week = parse_week(text).unwrap();
        let monday = &week.days[0];

        assert_eq!(monday.entries.len(), 1);
        assert_eq!(monday.entries[0].duration_sec, Some(45));
        assert_eq!(monday.entries[0].weight, Some(0.0));

        let paths: Vec<_> = week.issues.iter().map(|i| i.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "monday.exercises[0].sets",
                "monday.exercises[1].name",
                "monday.exercises[3]"
            ]
        );
    }

    #[test]
    fn test_wrapped_week_and_null_days() {
        let text = r#"{"week": {"mon": {"exercises": [{"name": "Pull-up"}]}, "tue": null, "wed": {}}}"#;
        let week = parse_week(text).unwrap();
        assert!(week.issues.is_empty());
        assert_eq!(week.days[0].entries.len(), 1);
        assert!(week.days[1].entries.is_empty());
        assert!(week.days[2].entries.is_empty());
    }

    #[test]
    fn test_duplicate_day_keys_keep_first() {
        let text = r#"{"mon": {"exercises": [{"name": "A"}]}, "Monday": {"exercises": [{"name": "B"}]}}"#;
        let week = parse_week(text).unwrap();
        assert_eq!(week.days[0].entries[0].name, "A");
        assert_eq!(week.issues[0].path, "Monday");
    }

    #[test]
    fn test_parse_day_array() {
        let text = "```json\n[{\"name\": \"Face Pull\", \"sets\": 3, \"reps\": \"15\", \"rest\": \"60 sec\", \"weight\": 12.5}]\n```";
        let (entries, issues) = parse_day(text).unwrap();
        assert!(issues.is_empty());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].rest_sec, Some(60));
        assert_eq!(entries[0].weight, Some(12.5));

        let overrides = entries[0].overrides();
        assert_eq!(overrides.reps, Some(15));
        assert_eq!(overrides.rest_time_sec, Some(60));
    }

    #[test]
    fn test_minutes_convert_to_seconds() {
        let value: Value = serde_json::json!({
            "name": "Plank", "sets": 3, "duration": "1 min", "rest": "2 minutes"
        });
        let entry = normalize_entry(&value, "monday.exercises[0]").unwrap();
        assert_eq!(entry.duration_sec, Some(60));
        assert_eq!(entry.rest_sec, Some(120));

        let value: Value = serde_json::json!({"name": "Plank", "duration_sec": "1.5m", "rest": "90s"});
        let entry = normalize_entry(&value, "monday.exercises[0]").unwrap();
        assert_eq!(entry.duration_sec, Some(90));
        assert_eq!(entry.rest_sec, Some(90));
    }

    #[test]
    fn test_unknown_units_rejected() {
        let value: Value = serde_json::json!({"name": "Farmer Carry", "sets": 3, "duration": "3 furlongs"});
        let issue = normalize_entry(&value, "monday.exercises[1]").unwrap_err();
        assert_eq!(issue.path, "monday.exercises[1].duration");

        let value: Value = serde_json::json!({"name": "Squat", "sets": 3, "reps": "5 min"});
        let issue = normalize_entry(&value, "monday.exercises[2]").unwrap_err();
        assert_eq!(issue.path, "monday.exercises[2].reps");

        let value: Value = serde_json::json!({"name": "Squat", "sets": "3 sets", "reps": "8-12 reps", "weight": "100 lbs"});
        let entry = normalize_entry(&value, "monday.exercises[3]").unwrap();
        assert_eq!(entry.sets, Some(3));
        assert_eq!(entry.reps, Some(8));
        assert!((entry.weight.unwrap() - 45.359).abs() < 0.01);
    }

    #[test]
    fn test_zero_sets_rejected() {
        let value: Value = serde_json::json!({"name": "Curl", "sets": 0});
        let issue = normalize_entry(&value, "friday.exercises[0]").unwrap_err();
        assert_eq!(issue.path, "friday.exercises[0].sets");
    }
}
