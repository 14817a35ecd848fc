//! Error types for the forge_core library.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// A single field-level problem found while validating generated output
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldIssue {
    /// Dotted path of the offending field, e.g. `monday.exercises[2].sets`
    pub path: String,
    pub message: String,
}

impl FieldIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

fn join_issues(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Core error type for forge_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Catalog validation error
    #[error("Catalog validation error: {0}")]
    CatalogValidation(String),

    /// The target selector could not resolve an exercise
    #[error("No prescription for exercise '{exercise_id}'")]
    MissingPrescription { exercise_id: String },

    /// Generator output held no extractable JSON payload
    #[error("Could not parse generated schedule: {0}")]
    JsonParse(String),

    /// Generated schedule had structural problems that normalization could not fix
    #[error("Generated schedule is invalid: {}", join_issues(.0))]
    ScheduleValidation(Vec<FieldIssue>),

    /// A generated exercise needs equipment the user does not have
    #[error("'{exercise}' requires equipment not available: {}", .missing.join(", "))]
    EquipmentConstraintViolation {
        exercise: String,
        missing: Vec<String>,
    },

    /// The day could not be trimmed under its ceiling
    #[error("Session exceeds its {limit_sec}s ceiling by {overage_sec}s after trimming")]
    DurationBudgetExceeded { limit_sec: u32, overage_sec: u32 },

    /// External generator failed
    #[error("Generator error: {0}")]
    Generator(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Message suitable for showing to the end user
    pub fn user_message(&self) -> String {
        match self {
            Error::JsonParse(_) | Error::Generator(_) => {
                "We couldn't build your plan right now. Please try again in a moment.".into()
            }
            Error::ScheduleValidation(issues) => format!(
                "The generated plan had problems we couldn't fix: {}",
                join_issues(issues)
            ),
            Error::MissingPrescription { exercise_id } => {
                format!("Missing targets for '{}'", exercise_id)
            }
            Error::DurationBudgetExceeded { overage_sec, .. } => format!(
                "This session runs about {} min over your time limit even after trimming accessories",
                overage_sec.div_ceil(60)
            ),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_validation_lists_fields() {
        let err = Error::ScheduleValidation(vec![
            FieldIssue::new("monday.exercises[0].sets", "not a number"),
            FieldIssue::new("funday", "unknown day key"),
        ]);
        let msg = err.to_string();
        assert!(msg.contains("monday.exercises[0].sets: not a number"));
        assert!(msg.contains("funday: unknown day key"));
    }

    #[test]
    fn test_user_message_hides_parse_details() {
        let err = Error::JsonParse("expected value at line 1".into());
        assert!(!err.user_message().contains("line 1"));
    }

    #[test]
    fn test_budget_message_rounds_up_minutes() {
        let err = Error::DurationBudgetExceeded {
            limit_sec: 2700,
            overage_sec: 61,
        };
        assert!(err.user_message().contains("2 min"));
    }
}
