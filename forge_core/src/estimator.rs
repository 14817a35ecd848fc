//! Tempo-based wall-clock estimates for a prescribed exercise.
//!
//! Pure functions: identical inputs always produce identical estimates.

use crate::config::TempoConfig;
use crate::{Exercise, ExerciseTarget, MovementPattern, TargetMode, TempoCategory};

/// Work scheme being estimated
#[derive(Clone, Debug, PartialEq)]
pub enum WorkScheme {
    /// `sets` x `reps`
    Reps { sets: u32, reps: u32 },
    /// Explicit per-set durations, plus the rest interval counted once
    Timed {
        set_durations_sec: Vec<u32>,
        rest_sec: u32,
    },
}

/// Everything the estimator needs about one exercise slot
#[derive(Clone, Debug, PartialEq)]
pub struct EstimateInput {
    pub scheme: WorkScheme,
    pub movement_pattern: MovementPattern,
    pub tempo_category: TempoCategory,
    /// Defaults to the configured buffer (15s) when absent
    pub setup_buffer_sec: Option<u32>,
    pub is_unilateral: bool,
    /// 0-based order within the session
    pub position_index: usize,
}

impl EstimateInput {
    /// Build the input for a prescribed slot at a session position
    pub fn for_target(exercise: &Exercise, target: &ExerciseTarget, position_index: usize) -> Self {
        let scheme = match (target.mode, target.reps, target.duration_sec) {
            (TargetMode::Duration, _, Some(duration)) => WorkScheme::Timed {
                set_durations_sec: vec![duration; target.sets as usize],
                rest_sec: target.rest_time_sec,
            },
            (_, reps, _) => WorkScheme::Reps {
                sets: target.sets,
                reps: reps.unwrap_or(0),
            },
        };

        Self {
            scheme,
            movement_pattern: exercise.movement_pattern,
            tempo_category: exercise.tempo_category,
            setup_buffer_sec: exercise.setup_buffer_sec,
            is_unilateral: exercise.is_unilateral,
            position_index,
        }
    }
}

/// Estimated wall-clock cost of one exercise
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DurationEstimate {
    pub estimated_duration_sec: u32,
    /// Seconds per rep used; `None` for timed work
    pub estimated_time_per_rep_sec: Option<f64>,
}

/// Estimate how long an exercise takes.
///
/// Reps: `sec_per_rep(tempo) * sets * reps`, doubled when unilateral, plus
/// the setup buffer, scaled by the position fatigue multiplier. Timed: the
/// per-set durations replace reps x tempo, and the rest interval is added
/// once after fatigue scaling.
pub fn estimate_duration(input: &EstimateInput, tempo: &TempoConfig) -> DurationEstimate {
    let setup = f64::from(
        input
            .setup_buffer_sec
            .unwrap_or(tempo.default_setup_buffer_sec),
    );
    let fatigue = tempo.fatigue_multiplier(input.position_index);
    let side_factor = if input.is_unilateral { 2.0 } else { 1.0 };

    match &input.scheme {
        WorkScheme::Reps { sets, reps } => {
            let per_rep = tempo.seconds_per_rep(input.tempo_category);
            let work = per_rep * f64::from(*sets) * f64::from(*reps) * side_factor;
            let total = (work + setup) * fatigue;
            DurationEstimate {
                estimated_duration_sec: total.round() as u32,
                estimated_time_per_rep_sec: Some(per_rep),
            }
        }
        WorkScheme::Timed {
            set_durations_sec,
            rest_sec,
        } => {
            let work: f64 = set_durations_sec.iter().map(|d| f64::from(*d)).sum::<f64>() * side_factor;
            let total = (work + setup) * fatigue + f64::from(*rest_sec);
            DurationEstimate {
                estimated_duration_sec: total.round() as u32,
                estimated_time_per_rep_sec: None,
            }
        }
    }
}

/// Estimate a prescribed slot and add its between-set rest.
///
/// Rep targets rest `rest_time_sec * (sets - 1)`; timed estimates already
/// include their rest interval.
pub fn estimate_slot(
    exercise: &Exercise,
    target: &ExerciseTarget,
    position_index: usize,
    tempo: &TempoConfig,
) -> u32 {
    let estimate = estimate_duration(&EstimateInput::for_target(exercise, target, position_index), tempo);
    let rest = match target.mode {
        TargetMode::Reps => target.rest_time_sec * target.sets.saturating_sub(1),
        TargetMode::Duration => 0,
    };
    estimate.estimated_duration_sec + rest
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reps_input(sets: u32, reps: u32, tempo: TempoCategory) -> EstimateInput {
        EstimateInput {
            scheme: WorkScheme::Reps { sets, reps },
            movement_pattern: MovementPattern::Squat,
            tempo_category: tempo,
            setup_buffer_sec: None,
            is_unilateral: false,
            position_index: 0,
        }
    }

    #[test]
    fn test_tempo_table() {
        let tempo = TempoConfig::default();
        // 3x10 grind: 150s work + 15s default setup
        let est = estimate_duration(&reps_input(3, 10, TempoCategory::Grind), &tempo);
        assert_eq!(est.estimated_duration_sec, 165);
        assert_eq!(est.estimated_time_per_rep_sec, Some(5.0));

        let est = estimate_duration(&reps_input(3, 10, TempoCategory::Standard), &tempo);
        assert_eq!(est.estimated_duration_sec, 120);

        let est = estimate_duration(&reps_input(3, 10, TempoCategory::Ballistic), &tempo);
        assert_eq!(est.estimated_duration_sec, 60);
    }

    #[test]
    fn test_unilateral_doubles_work_not_setup() {
        let tempo = TempoConfig::default();
        let mut input = reps_input(3, 10, TempoCategory::Standard);
        input.is_unilateral = true;
        input.setup_buffer_sec = Some(20);
        // 105 * 2 + 20
        assert_eq!(estimate_duration(&input, &tempo).estimated_duration_sec, 230);
    }

    #[test]
    fn test_fatigue_multiplier_by_position() {
        let tempo = TempoConfig::default();
        let mut input = reps_input(2, 10, TempoCategory::Grind);
        input.setup_buffer_sec = Some(0);

        input.position_index = 2;
        // 100 * 1.10
        assert_eq!(estimate_duration(&input, &tempo).estimated_duration_sec, 110);

        input.position_index = 20;
        // capped at +30%
        assert_eq!(estimate_duration(&input, &tempo).estimated_duration_sec, 130);
    }

    #[test]
    fn test_timed_sums_sets_and_adds_rest_once() {
        let tempo = TempoConfig::default();
        let input = EstimateInput {
            scheme: WorkScheme::Timed {
                set_durations_sec: vec![30, 45, 60],
                rest_sec: 60,
            },
            movement_pattern: MovementPattern::Core,
            tempo_category: TempoCategory::Standard,
            setup_buffer_sec: Some(5),
            is_unilateral: false,
            position_index: 0,
        };
        let est = estimate_duration(&input, &tempo);
        assert_eq!(est.estimated_duration_sec, 135 + 5 + 60);
        assert!(est.estimated_time_per_rep_sec.is_none());
    }

    #[test]
    fn test_estimate_is_deterministic() {
        let tempo = TempoConfig::default();
        let mut input = reps_input(4, 8, TempoCategory::Grind);
        input.position_index = 3;
        input.is_unilateral = true;
        let first = estimate_duration(&input, &tempo);
        for _ in 0..100 {
            assert_eq!(estimate_duration(&input, &tempo), first);
        }
    }

    #[test]
    fn test_estimate_slot_adds_rest_between_sets() {
        let tempo = TempoConfig::default();
        let catalog = crate::build_default_catalog();
        let squat = catalog.get("barbell_back_squat").unwrap();
        let target = ExerciseTarget::reps(3, 5, 120).unwrap();
        // (3*5*5.0 + 60) * 1.0 = 135, plus 2 rests of 120
        assert_eq!(estimate_slot(squat, &target, 0, &tempo), 135 + 240);

        let plank = catalog.get("plank").unwrap();
        let target = ExerciseTarget::duration(3, 30, 45).unwrap();
        // (90 + 5) + 45
        assert_eq!(estimate_slot(plank, &target, 0, &tempo), 140);
    }
}
