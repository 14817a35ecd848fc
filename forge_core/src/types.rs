//! Core domain types for the Forge prescription engine.
//!
//! This module defines the fundamental types used throughout the system:
//! - Exercises and their movement/muscle/tempo classification
//! - Performance history and personal records
//! - Prescriptions (targets) and day/week schedules
//! - Duration constraints and coverage/rebalance reports

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::{Error, Result};

// ============================================================================
// Exercise Classification
// ============================================================================

/// Fundamental movement pattern of an exercise
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum MovementPattern {
    Squat,
    Hinge,
    Push,
    Pull,
    Lunge,
    Carry,
    Core,
    Cardio,
    Other,
}

impl MovementPattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementPattern::Squat => "squat",
            MovementPattern::Hinge => "hinge",
            MovementPattern::Push => "push",
            MovementPattern::Pull => "pull",
            MovementPattern::Lunge => "lunge",
            MovementPattern::Carry => "carry",
            MovementPattern::Core => "core",
            MovementPattern::Cardio => "cardio",
            MovementPattern::Other => "other",
        }
    }

    /// Muscles a pattern is expected to train, used to name what a skipped
    /// pattern leaves undertrained.
    pub fn typical_muscles(&self) -> &'static [MuscleGroup] {
        use MuscleGroup::*;
        match self {
            MovementPattern::Squat => &[Quads, Glutes],
            MovementPattern::Hinge => &[Hamstrings, Glutes, LowerBack],
            MovementPattern::Push => &[Chest, Shoulders, Triceps],
            MovementPattern::Pull => &[Back, Biceps],
            MovementPattern::Lunge => &[Quads, Glutes],
            MovementPattern::Carry => &[Forearms, Core],
            MovementPattern::Core => &[Core],
            MovementPattern::Cardio | MovementPattern::Other => &[],
        }
    }
}

impl fmt::Display for MovementPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Muscle group tag
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum MuscleGroup {
    Chest,
    Back,
    Shoulders,
    Biceps,
    Triceps,
    Forearms,
    Core,
    Quads,
    Hamstrings,
    Glutes,
    Calves,
    LowerBack,
}

impl MuscleGroup {
    pub const ALL: [MuscleGroup; 12] = [
        MuscleGroup::Chest,
        MuscleGroup::Back,
        MuscleGroup::Shoulders,
        MuscleGroup::Biceps,
        MuscleGroup::Triceps,
        MuscleGroup::Forearms,
        MuscleGroup::Core,
        MuscleGroup::Quads,
        MuscleGroup::Hamstrings,
        MuscleGroup::Glutes,
        MuscleGroup::Calves,
        MuscleGroup::LowerBack,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MuscleGroup::Chest => "chest",
            MuscleGroup::Back => "back",
            MuscleGroup::Shoulders => "shoulders",
            MuscleGroup::Biceps => "biceps",
            MuscleGroup::Triceps => "triceps",
            MuscleGroup::Forearms => "forearms",
            MuscleGroup::Core => "core",
            MuscleGroup::Quads => "quads",
            MuscleGroup::Hamstrings => "hamstrings",
            MuscleGroup::Glutes => "glutes",
            MuscleGroup::Calves => "calves",
            MuscleGroup::LowerBack => "lower_back",
        }
    }
}

impl fmt::Display for MuscleGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rep cadence class used by the duration estimator
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum TempoCategory {
    /// Slow, heavy reps (squats, deadlifts)
    Grind,
    #[default]
    Standard,
    /// Fast, explosive reps (swings, jumps)
    Ballistic,
}

/// An exercise definition from the catalog
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Exercise {
    pub id: String,
    pub name: String,
    pub movement_pattern: MovementPattern,
    #[serde(default)]
    pub primary_muscles: BTreeSet<MuscleGroup>,
    #[serde(default)]
    pub is_timed: bool,
    #[serde(default)]
    pub is_unilateral: bool,
    #[serde(default)]
    pub tempo_category: TempoCategory,
    #[serde(default)]
    pub setup_buffer_sec: Option<u32>,
    /// 0-10 proxy for how much work the exercise delivers per minute
    #[serde(default)]
    pub density_score: u8,
    #[serde(default)]
    pub equipment_needed: Vec<String>,
}

impl Exercise {
    /// Slot for a generated exercise name that the catalog cannot resolve.
    ///
    /// Placeholders carry no muscles, equipment or density and never resolve
    /// to a prescription.
    pub fn placeholder(name: &str) -> Self {
        Exercise {
            id: format!("unresolved:{}", slugify(name)),
            name: name.trim().to_string(),
            movement_pattern: MovementPattern::Other,
            primary_muscles: BTreeSet::new(),
            is_timed: false,
            is_unilateral: false,
            tempo_category: TempoCategory::Standard,
            setup_buffer_sec: None,
            density_score: 0,
            equipment_needed: Vec::new(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.id.starts_with("unresolved:")
    }

    /// Equipment this exercise needs that is not in `available`
    pub fn missing_equipment(&self, available: &BTreeSet<String>) -> Vec<String> {
        self.equipment_needed
            .iter()
            .filter(|e| !available.contains(&normalize_tag(e)))
            .cloned()
            .collect()
    }
}

/// Lowercase, trimmed tag with spaces and dashes folded to underscores
pub fn normalize_tag(tag: &str) -> String {
    tag.trim().to_lowercase().replace([' ', '-'], "_")
}

/// Identifier-friendly form of a display name
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_underscore = true;
    for c in name.trim().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_underscore = false;
        } else if !last_underscore {
            slug.push('_');
            last_underscore = true;
        }
    }
    while slug.ends_with('_') {
        slug.pop();
    }
    slug
}

// ============================================================================
// History Types
// ============================================================================

/// One logged working set (or timed effort) for an exercise
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PerformanceLogEntry {
    pub exercise_id: String,
    /// Absent for bodyweight work
    pub weight: Option<f64>,
    pub reps: Option<u32>,
    pub duration_sec: Option<u32>,
    pub scheduled_weight: Option<f64>,
    pub scheduled_reps: Option<u32>,
    pub scheduled_duration_sec: Option<u32>,
    pub performed_at: DateTime<Utc>,
}

/// Best known load on an exercise
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PersonalRecord {
    pub exercise_id: String,
    pub weight: f64,
    pub reps: Option<u32>,
}

// ============================================================================
// Profile Types
// ============================================================================

/// Training experience level
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExperienceLevel {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl ExperienceLevel {
    /// Map a free-text profile tag onto a level.
    ///
    /// Unrecognized tags fall back to `Beginner`, the most conservative
    /// volume row.
    pub fn from_tag(tag: &str) -> Self {
        match normalize_tag(tag).as_str() {
            "beginner" | "novice" | "new" | "starter" | "untrained" => ExperienceLevel::Beginner,
            "intermediate" | "moderate" | "some_experience" | "returning" => {
                ExperienceLevel::Intermediate
            }
            "advanced" | "expert" | "elite" | "experienced" | "competitive" => {
                ExperienceLevel::Advanced
            }
            other => {
                tracing::debug!("Unknown experience tag {:?}, using beginner", other);
                ExperienceLevel::Beginner
            }
        }
    }
}

/// Primary training goal
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum TrainingGoal {
    Strength,
    Hypertrophy,
    Endurance,
    #[default]
    GeneralFitness,
}

impl TrainingGoal {
    /// Map a free-text goal tag onto a goal; unknown tags fall back to
    /// `GeneralFitness`.
    pub fn from_tag(tag: &str) -> Self {
        match normalize_tag(tag).as_str() {
            "strength" | "strong" | "powerlifting" | "power" => TrainingGoal::Strength,
            "hypertrophy" | "muscle" | "muscle_gain" | "build_muscle" | "bodybuilding" => {
                TrainingGoal::Hypertrophy
            }
            "endurance" | "conditioning" | "stamina" | "muscular_endurance" => {
                TrainingGoal::Endurance
            }
            _ => TrainingGoal::GeneralFitness,
        }
    }
}

/// Snapshot of the user's profile supplied by the caller
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub experience: ExperienceLevel,
    #[serde(default)]
    pub goal: TrainingGoal,
    pub days_per_week: u8,
    /// Declared equipment tags (normalized on use)
    #[serde(default)]
    pub equipment: BTreeSet<String>,
    #[serde(default)]
    pub duration: Option<DurationConstraint>,
}

impl UserProfile {
    pub fn equipment_set(&self) -> BTreeSet<String> {
        self.equipment.iter().map(|e| normalize_tag(e)).collect()
    }
}

// ============================================================================
// Prescription Types
// ============================================================================

/// Whether a target is counted in reps or seconds
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TargetMode {
    Reps,
    Duration,
}

/// A single prescription for one exercise slot
///
/// Exactly one of `reps` / `duration_sec` is set, matching `mode`. Use the
/// checked constructors; `validate` re-checks targets that arrived through
/// deserialization.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ExerciseTarget {
    pub mode: TargetMode,
    pub sets: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reps: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_sec: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    pub rest_time_sec: u32,
}

impl ExerciseTarget {
    pub fn reps(sets: u32, reps: u32, rest_time_sec: u32) -> Result<Self> {
        let target = ExerciseTarget {
            mode: TargetMode::Reps,
            sets,
            reps: Some(reps),
            duration_sec: None,
            weight: None,
            rest_time_sec,
        };
        target.validate()?;
        Ok(target)
    }

    pub fn duration(sets: u32, duration_sec: u32, rest_time_sec: u32) -> Result<Self> {
        let target = ExerciseTarget {
            mode: TargetMode::Duration,
            sets,
            reps: None,
            duration_sec: Some(duration_sec),
            weight: None,
            rest_time_sec,
        };
        target.validate()?;
        Ok(target)
    }

    pub fn with_weight(mut self, weight: Option<f64>) -> Self {
        self.weight = weight;
        self
    }

    /// Check the mode/field invariant
    pub fn validate(&self) -> Result<()> {
        if self.sets == 0 {
            return Err(Error::Other("target must have at least one set".into()));
        }
        match self.mode {
            TargetMode::Reps => match (self.reps, self.duration_sec) {
                (Some(r), None) if r >= 1 => Ok(()),
                _ => Err(Error::Other(
                    "reps target needs reps >= 1 and no duration".into(),
                )),
            },
            TargetMode::Duration => match (self.reps, self.duration_sec) {
                (None, Some(d)) if d > 0 => Ok(()),
                _ => Err(Error::Other(
                    "duration target needs duration > 0 and no reps".into(),
                )),
            },
        }
    }

    /// True when no usable weight has been set (None or NaN). Zero is a
    /// deliberate bodyweight value, not a blank.
    pub fn weight_is_blank(&self) -> bool {
        is_blank_weight(self.weight)
    }
}

/// Blank means absent or NaN; `Some(0.0)` is a real (bodyweight) value
pub fn is_blank_weight(weight: Option<f64>) -> bool {
    match weight {
        None => true,
        Some(w) => w.is_nan(),
    }
}

/// Per-slot overrides that take precedence over profile-derived defaults
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct SlotOverrides {
    pub sets: Option<u32>,
    pub reps: Option<u32>,
    pub duration_sec: Option<u32>,
    pub weight: Option<f64>,
    pub rest_time_sec: Option<u32>,
}

/// Context the target selector works from
#[derive(Clone, Debug, Default)]
pub struct TargetSelectionContext {
    pub experience: ExperienceLevel,
    pub goal: TrainingGoal,
    pub overrides: SlotOverrides,
    /// Number of logged entries the caller knows of for this exercise
    pub history_count: usize,
}

// ============================================================================
// Schedule Types
// ============================================================================

/// An exercise slot in a day, with its prescription if one could be made
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ScheduledExercise {
    pub exercise: Exercise,
    pub target: Option<ExerciseTarget>,
}

impl ScheduledExercise {
    pub fn new(exercise: Exercise, target: ExerciseTarget) -> Self {
        Self {
            exercise,
            target: Some(target),
        }
    }

    pub fn missing_target(exercise: Exercise) -> Self {
        Self {
            exercise,
            target: None,
        }
    }
}

/// Ordered exercise slots for one training day
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct DaySchedule {
    pub exercises: Vec<ScheduledExercise>,
}

impl DaySchedule {
    pub fn new(exercises: Vec<ScheduledExercise>) -> Self {
        Self { exercises }
    }

    pub fn is_empty(&self) -> bool {
        self.exercises.is_empty()
    }

    /// Names of slots that carry no prescription
    pub fn missing_targets(&self) -> Vec<&str> {
        self.exercises
            .iter()
            .filter(|s| s.target.is_none())
            .map(|s| s.exercise.name.as_str())
            .collect()
    }

    pub fn patterns(&self) -> BTreeSet<MovementPattern> {
        self.exercises
            .iter()
            .map(|s| s.exercise.movement_pattern)
            .collect()
    }
}

/// Day of the training week
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Weekday::Monday => "monday",
            Weekday::Tuesday => "tuesday",
            Weekday::Wednesday => "wednesday",
            Weekday::Thursday => "thursday",
            Weekday::Friday => "friday",
            Weekday::Saturday => "saturday",
            Weekday::Sunday => "sunday",
        }
    }

    /// Parse a day key, accepting any case and three-letter abbreviations
    pub fn from_key(key: &str) -> Option<Self> {
        let key = key.trim().to_lowercase();
        Weekday::ALL.into_iter().find(|d| {
            let name = d.as_str();
            key == name || (key.len() >= 3 && name.starts_with(key.as_str()))
        })
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Seven days of schedules; every weekday is always present
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WeekSchedule {
    pub days: BTreeMap<Weekday, DaySchedule>,
}

impl Default for WeekSchedule {
    fn default() -> Self {
        Self {
            days: Weekday::ALL
                .into_iter()
                .map(|d| (d, DaySchedule::default()))
                .collect(),
        }
    }
}

impl WeekSchedule {
    pub fn day(&self, day: Weekday) -> Option<&DaySchedule> {
        self.days.get(&day)
    }

    pub fn set_day(&mut self, day: Weekday, schedule: DaySchedule) {
        self.days.insert(day, schedule);
    }

    /// Days that have at least one exercise, in calendar order
    pub fn training_days(&self) -> Vec<Weekday> {
        self.days
            .iter()
            .filter(|(_, s)| !s.is_empty())
            .map(|(d, _)| *d)
            .collect()
    }
}

// ============================================================================
// Duration Constraint
// ============================================================================

/// How a duration constraint is applied
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DurationMode {
    /// Grow the session toward the duration
    Target,
    /// Hard ceiling; trim accessory volume to fit
    Max,
}

/// Session duration budget
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct DurationConstraint {
    pub minutes: u32,
    pub mode: DurationMode,
}

impl DurationConstraint {
    pub fn new(minutes: u32, mode: DurationMode) -> Result<Self> {
        if minutes == 0 {
            return Err(Error::Config("duration constraint must be positive".into()));
        }
        Ok(Self { minutes, mode })
    }

    pub fn seconds(&self) -> u32 {
        self.minutes * 60
    }
}

// ============================================================================
// Analysis Results
// ============================================================================

/// Movement-pattern and muscle coverage of a day or week
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CoverageAnalysis {
    pub covered_movement_patterns: BTreeSet<MovementPattern>,
    pub missing_movement_patterns: BTreeSet<MovementPattern>,
    pub covered_muscle_groups: BTreeSet<MuscleGroup>,
    pub recovery_ready_muscles: BTreeSet<MuscleGroup>,
    pub recovery_fatigued_muscles: BTreeSet<MuscleGroup>,
    pub recommendations: Vec<String>,
}

/// Outcome of the pre-workout balance check
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RebalanceResult {
    pub needs_rebalance: bool,
    pub reasons: Vec<String>,
    pub missed_muscles: BTreeSet<MuscleGroup>,
}
