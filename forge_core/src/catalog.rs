//! Exercise catalog: built-in exercises, user-custom additions, lookup.
//!
//! The catalog is reference data owned by the host; the engine only reads it.

use crate::types::*;
use once_cell::sync::Lazy;
use std::collections::{BTreeSet, HashMap};

/// Cached default catalog - built once and reused across all operations
static DEFAULT_CATALOG: Lazy<ExerciseCatalog> = Lazy::new(build_default_catalog);

/// Get a reference to the cached default catalog
pub fn get_default_catalog() -> &'static ExerciseCatalog {
    &DEFAULT_CATALOG
}

/// Exercises keyed by id
#[derive(Clone, Debug, Default)]
pub struct ExerciseCatalog {
    pub exercises: HashMap<String, Exercise>,
}

impl ExerciseCatalog {
    pub fn new(exercises: impl IntoIterator<Item = Exercise>) -> Self {
        Self {
            exercises: exercises.into_iter().map(|e| (e.id.clone(), e)).collect(),
        }
    }

    /// Copy of this catalog with user-custom exercises added.
    ///
    /// Custom entries replace built-ins with the same id.
    pub fn with_custom(&self, custom: &[Exercise]) -> Self {
        let mut merged = self.clone();
        for exercise in custom {
            if merged.exercises.contains_key(&exercise.id) {
                tracing::debug!("Custom exercise {} overrides built-in", exercise.id);
            }
            merged.exercises.insert(exercise.id.clone(), exercise.clone());
        }
        merged
    }

    pub fn get(&self, id: &str) -> Option<&Exercise> {
        self.exercises.get(id)
    }

    /// Resolve an id or a display name as written by a person or generator.
    ///
    /// Tries the exact id, then a case-insensitive name match, then the
    /// slugified name as an id.
    pub fn resolve(&self, name_or_id: &str) -> Option<&Exercise> {
        if let Some(exercise) = self.exercises.get(name_or_id) {
            return Some(exercise);
        }

        let wanted = collapse_whitespace(name_or_id);
        if let Some(exercise) = self
            .exercises
            .values()
            .find(|e| collapse_whitespace(&e.name) == wanted)
        {
            return Some(exercise);
        }

        let slug = slugify(name_or_id);
        self.exercises
            .get(&slug)
            .or_else(|| self.exercises.values().find(|e| slugify(&e.name) == slug))
    }

    /// Exercises usable with the given equipment, sorted by name
    pub fn available_with(&self, equipment: &BTreeSet<String>) -> Vec<&Exercise> {
        let mut available: Vec<_> = self
            .exercises
            .values()
            .filter(|e| e.missing_equipment(equipment).is_empty())
            .collect();
        available.sort_by(|a, b| a.name.cmp(&b.name));
        available
    }

    /// Validate the catalog for consistency and completeness
    ///
    /// Returns a list of validation errors, or empty Vec if valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let mut seen_names = HashMap::new();

        for (id, exercise) in &self.exercises {
            if id.is_empty() || exercise.id.is_empty() {
                errors.push("Exercise has empty ID".to_string());
            }
            if id != &exercise.id {
                errors.push(format!(
                    "Exercise key '{}' doesn't match exercise.id '{}'",
                    id, exercise.id
                ));
            }
            if exercise.name.trim().is_empty() {
                errors.push(format!("Exercise '{}' has empty name", id));
            }
            if exercise.density_score > 10 {
                errors.push(format!(
                    "Exercise '{}': density score {} is above 10",
                    id, exercise.density_score
                ));
            }
            if exercise.primary_muscles.is_empty()
                && exercise.movement_pattern != MovementPattern::Cardio
            {
                errors.push(format!("Exercise '{}' lists no primary muscles", id));
            }
            if let Some(other) = seen_names.insert(collapse_whitespace(&exercise.name), id) {
                errors.push(format!(
                    "Exercises '{}' and '{}' share the name '{}'",
                    other, id, exercise.name
                ));
            }
        }

        // Every pattern a balanced week needs must be programmable
        for pattern in [
            MovementPattern::Squat,
            MovementPattern::Hinge,
            MovementPattern::Push,
            MovementPattern::Pull,
        ] {
            if !self
                .exercises
                .values()
                .any(|e| e.movement_pattern == pattern)
            {
                errors.push(format!("Catalog has no {} exercises", pattern));
            }
        }

        errors
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[allow(clippy::too_many_arguments)]
fn exercise(
    id: &str,
    name: &str,
    pattern: MovementPattern,
    muscles: &[MuscleGroup],
    tempo: TempoCategory,
    setup_buffer_sec: u32,
    density_score: u8,
    equipment: &[&str],
) -> Exercise {
    Exercise {
        id: id.into(),
        name: name.into(),
        movement_pattern: pattern,
        primary_muscles: muscles.iter().copied().collect(),
        is_timed: false,
        is_unilateral: false,
        tempo_category: tempo,
        setup_buffer_sec: Some(setup_buffer_sec),
        density_score,
        equipment_needed: equipment.iter().map(|e| e.to_string()).collect(),
    }
}

fn timed(mut exercise: Exercise) -> Exercise {
    exercise.is_timed = true;
    exercise
}

fn unilateral(mut exercise: Exercise) -> Exercise {
    exercise.is_unilateral = true;
    exercise
}

/// Builds the default catalog with built-in exercises
pub fn build_default_catalog() -> ExerciseCatalog {
    use MovementPattern as P;
    use MuscleGroup::*;
    use TempoCategory::*;

    ExerciseCatalog::new(vec![
        // Squat
        exercise("barbell_back_squat", "Barbell Back Squat", P::Squat, &[Quads, Glutes], Grind, 60, 10, &["barbell", "rack"]),
        exercise("goblet_squat", "Goblet Squat", P::Squat, &[Quads, Glutes], Standard, 20, 7, &["kettlebell"]),
        exercise("bodyweight_squat", "Bodyweight Squat", P::Squat, &[Quads, Glutes], Standard, 5, 4, &[]),
        // Hinge
        exercise("deadlift", "Deadlift", P::Hinge, &[Hamstrings, Glutes, LowerBack], Grind, 60, 10, &["barbell"]),
        exercise("romanian_deadlift", "Romanian Deadlift", P::Hinge, &[Hamstrings, Glutes, LowerBack], Grind, 45, 9, &["barbell"]),
        exercise("kettlebell_swing", "Kettlebell Swing", P::Hinge, &[Glutes, Hamstrings], Ballistic, 15, 8, &["kettlebell"]),
        exercise("glute_bridge", "Glute Bridge", P::Hinge, &[Glutes, Hamstrings], Standard, 10, 4, &[]),
        // Push
        exercise("bench_press", "Barbell Bench Press", P::Push, &[Chest, Triceps, Shoulders], Grind, 45, 9, &["barbell", "bench"]),
        exercise("overhead_press", "Overhead Press", P::Push, &[Shoulders, Triceps], Grind, 30, 8, &["barbell"]),
        exercise("push_up", "Push-up", P::Push, &[Chest, Triceps], Standard, 5, 6, &[]),
        exercise("lateral_raise", "Dumbbell Lateral Raise", P::Push, &[Shoulders], Standard, 10, 3, &["dumbbells"]),
        exercise("triceps_pushdown", "Triceps Pushdown", P::Push, &[Triceps], Standard, 15, 2, &["cable"]),
        // Pull
        exercise("pull_up", "Pull-up", P::Pull, &[Back, Biceps], Standard, 10, 8, &["pullup_bar"]),
        exercise("barbell_row", "Barbell Row", P::Pull, &[Back, Biceps, LowerBack], Standard, 30, 9, &["barbell"]),
        unilateral(exercise("dumbbell_row", "One-Arm Dumbbell Row", P::Pull, &[Back, Biceps], Standard, 15, 6, &["dumbbells", "bench"])),
        exercise("biceps_curl", "Dumbbell Biceps Curl", P::Pull, &[Biceps], Standard, 10, 2, &["dumbbells"]),
        exercise("face_pull", "Face Pull", P::Pull, &[Shoulders, Back], Standard, 15, 3, &["cable"]),
        // Lunge
        unilateral(exercise("walking_lunge", "Walking Lunge", P::Lunge, &[Quads, Glutes], Standard, 10, 6, &["dumbbells"])),
        unilateral(exercise("bulgarian_split_squat", "Bulgarian Split Squat", P::Lunge, &[Quads, Glutes], Standard, 20, 7, &["dumbbells", "bench"])),
        // Carry / core / misc
        timed(exercise("farmers_carry", "Farmer's Carry", P::Carry, &[Forearms, Core], Standard, 15, 6, &["dumbbells"])),
        timed(exercise("plank", "Plank", P::Core, &[Core], Standard, 5, 3, &[])),
        exercise("hanging_leg_raise", "Hanging Leg Raise", P::Core, &[Core], Standard, 10, 3, &["pullup_bar"]),
        exercise("calf_raise", "Standing Calf Raise", P::Other, &[Calves], Standard, 10, 2, &[]),
        timed(exercise("rowing_intervals", "Rowing Intervals", P::Cardio, &[Back, Quads], Standard, 30, 5, &["rower"])),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_loads() {
        let catalog = build_default_catalog();
        assert_eq!(catalog.exercises.len(), 24);
    }

    #[test]
    fn test_default_catalog_validates() {
        let catalog = build_default_catalog();
        let errors = catalog.validate();
        assert!(
            errors.is_empty(),
            "Default catalog has validation errors: {:?}",
            errors
        );
    }

    #[test]
    fn test_resolve_by_id_name_and_slug() {
        let catalog = build_default_catalog();
        assert_eq!(catalog.resolve("bench_press").unwrap().id, "bench_press");
        assert_eq!(
            catalog.resolve("barbell  bench PRESS").unwrap().id,
            "bench_press"
        );
        assert_eq!(catalog.resolve("Pull Up").unwrap().id, "pull_up");
        assert!(catalog.resolve("Underwater Basket Weaving").is_none());
    }

    #[test]
    fn test_custom_exercises_merge() {
        let catalog = build_default_catalog();
        let mut custom = Exercise::placeholder("Sandbag Clean");
        custom.id = "sandbag_clean".into();
        custom.movement_pattern = MovementPattern::Hinge;

        let merged = catalog.with_custom(&[custom]);
        assert_eq!(merged.exercises.len(), catalog.exercises.len() + 1);
        assert!(merged.resolve("sandbag clean").is_some());
    }

    #[test]
    fn test_available_with_equipment() {
        let catalog = build_default_catalog();
        let bodyweight_only = catalog.available_with(&BTreeSet::new());
        assert!(bodyweight_only.iter().all(|e| e.equipment_needed.is_empty()));
        assert!(bodyweight_only.iter().any(|e| e.id == "push_up"));

        let kb: BTreeSet<String> = ["kettlebell".to_string()].into_iter().collect();
        assert!(catalog
            .available_with(&kb)
            .iter()
            .any(|e| e.id == "kettlebell_swing"));
    }

    #[test]
    fn test_validate_flags_missing_pattern() {
        let catalog = ExerciseCatalog::new(
            build_default_catalog()
                .exercises
                .into_values()
                .filter(|e| e.movement_pattern != MovementPattern::Pull),
        );
        let errors = catalog.validate();
        assert!(errors.iter().any(|e| e.contains("no pull exercises")));
    }
}
