//! Target selection: one prescription per exercise slot.
//!
//! Volume comes from the experience x goal table, slot overrides win over
//! table values, and the working load comes from an explicit override or
//! the progression engine.

use crate::catalog::ExerciseCatalog;
use crate::config::{Config, VolumeRow};
use crate::progression::{self, ProgressionSuggestion};
use crate::{
    Error, Exercise, ExerciseTarget, PerformanceLogEntry, PersonalRecord, Result,
    TargetSelectionContext,
};

/// Builds prescriptions against a catalog and configuration
#[derive(Clone, Copy, Debug)]
pub struct TargetSelector<'a> {
    catalog: &'a ExerciseCatalog,
    config: &'a Config,
}

impl<'a> TargetSelector<'a> {
    pub fn new(catalog: &'a ExerciseCatalog, config: &'a Config) -> Self {
        Self { catalog, config }
    }

    pub fn catalog(&self) -> &'a ExerciseCatalog {
        self.catalog
    }

    /// Full prescription for an exercise id, including a suggested load.
    ///
    /// Unknown ids yield `Error::MissingPrescription`; callers keep the slot
    /// and report it as missing a target.
    pub fn select_target(
        &self,
        exercise_id: &str,
        ctx: &TargetSelectionContext,
        history: &[PerformanceLogEntry],
        pr: Option<&PersonalRecord>,
    ) -> Result<ExerciseTarget> {
        let exercise = self.lookup(exercise_id)?;

        let mut ctx = ctx.clone();
        ctx.history_count = ctx.history_count.max(history.len());

        let mut target = self.base_for(exercise, &ctx)?;
        self.fill_weight(exercise, &mut target, history, pr);
        Ok(target)
    }

    /// Sets, reps-or-duration and rest for an exercise id, without consulting
    /// progression. Only an explicit weight override is applied.
    pub fn select_base(&self, exercise_id: &str, ctx: &TargetSelectionContext) -> Result<ExerciseTarget> {
        let exercise = self.lookup(exercise_id)?;
        self.base_for(exercise, ctx)
    }

    /// Base prescription for an already-resolved exercise
    pub fn base_for(&self, exercise: &Exercise, ctx: &TargetSelectionContext) -> Result<ExerciseTarget> {
        if exercise.is_placeholder() {
            return Err(Error::MissingPrescription {
                exercise_id: exercise.id.clone(),
            });
        }

        let row = self.config.volume.lookup(ctx.experience, ctx.goal);
        let overrides = &ctx.overrides;
        let positive = |v: Option<u32>| v.filter(|v| *v > 0);

        let sets = positive(overrides.sets).unwrap_or(row.sets);
        let rest = overrides.rest_time_sec.unwrap_or(row.rest_sec);

        // Timed exercises always hold; a rep exercise becomes timed only when
        // the slot asks for a duration and no reps.
        let timed = exercise.is_timed
            || (positive(overrides.duration_sec).is_some() && positive(overrides.reps).is_none());

        let target = if timed {
            let hold = positive(overrides.duration_sec).unwrap_or(row.hold_sec);
            ExerciseTarget::duration(sets, hold, rest)?
        } else {
            let reps = positive(overrides.reps).unwrap_or_else(|| band_reps(row, ctx.history_count));
            ExerciseTarget::reps(sets, reps, rest)?
        };

        let weight = overrides.weight.filter(|w| w.is_finite() && *w >= 0.0);
        let target = target.with_weight(weight);

        tracing::debug!(
            "Base target for {}: {} sets, {:?} reps, {:?}s, rest {}s ({:?}/{:?})",
            exercise.id,
            target.sets,
            target.reps,
            target.duration_sec,
            target.rest_time_sec,
            ctx.experience,
            ctx.goal
        );

        Ok(target)
    }

    /// Fill a blank weight from history and the PR; returns the suggestion
    /// that was consulted.
    pub fn fill_weight(
        &self,
        exercise: &Exercise,
        target: &mut ExerciseTarget,
        history: &[PerformanceLogEntry],
        pr: Option<&PersonalRecord>,
    ) -> Option<ProgressionSuggestion> {
        if !target.weight_is_blank() {
            return None;
        }

        let (_, suggestion) = progression::evaluate(exercise, history, pr, &self.config.progression);
        if progression::fill_blank_weight(target, &suggestion) {
            tracing::info!(
                "Filled {} load at {:?} ({:?})",
                exercise.id,
                target.weight,
                suggestion.rationale
            );
        }
        Some(suggestion)
    }

    fn lookup(&self, exercise_id: &str) -> Result<&'a Exercise> {
        self.catalog
            .get(exercise_id)
            .ok_or_else(|| Error::MissingPrescription {
                exercise_id: exercise_id.to_string(),
            })
    }
}

/// Top of the band with no history, midpoint once there is some
fn band_reps(row: &VolumeRow, history_count: usize) -> u32 {
    if history_count == 0 {
        row.rep_max
    } else {
        (row.rep_min + row.rep_max) / 2
    }
}
