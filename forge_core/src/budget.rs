//! Duration budgeting for a training day.
//!
//! `max` constraints trim accessory sets until the day fits under the ceiling;
//! `target` constraints add sets to the densest exercises already present.
//! Exercise order is never changed, and exercises at or above the Tier 1
//! density are never trimmed.

use crate::config::{BudgetConfig, Config, TempoConfig, TieBreak};
use crate::estimator::estimate_slot;
use crate::{DaySchedule, DurationConstraint, DurationMode, Error, Result};
use serde::{Deserialize, Serialize};

/// One change made to a day while budgeting
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BudgetAdjustment {
    SetRemoved { exercise_id: String, sets: u32 },
    ExerciseRemoved { exercise_id: String },
    SetAdded { exercise_id: String, sets: u32 },
}

/// Budgeted day and how it compares to its limit
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BudgetOutcome {
    pub schedule: DaySchedule,
    pub total_sec: u32,
    /// Nominal limit (`minutes * 60`)
    pub limit_sec: u32,
    /// Seconds still above the tolerated ceiling; 0 when the day fits
    pub overage_sec: u32,
    pub adjustments: Vec<BudgetAdjustment>,
}

impl BudgetOutcome {
    pub fn fits(&self) -> bool {
        self.overage_sec == 0
    }

    /// Turn an unresolved overage into `Error::DurationBudgetExceeded`
    pub fn ensure_within(&self) -> Result<()> {
        if self.fits() {
            Ok(())
        } else {
            Err(Error::DurationBudgetExceeded {
                limit_sec: self.limit_sec,
                overage_sec: self.overage_sec,
            })
        }
    }
}

/// Estimated seconds for a whole day; slots without a target count as 0
pub fn estimate_day(schedule: &DaySchedule, tempo: &TempoConfig) -> u32 {
    schedule
        .exercises
        .iter()
        .enumerate()
        .filter_map(|(pos, slot)| {
            slot.target
                .as_ref()
                .map(|target| estimate_slot(&slot.exercise, target, pos, tempo))
        })
        .sum()
}

fn ceiling_sec(limit_sec: u32, tolerance: f64) -> f64 {
    f64::from(limit_sec) * (1.0 + tolerance)
}

fn floor_sec(limit_sec: u32, tolerance: f64) -> f64 {
    f64::from(limit_sec) * (1.0 - tolerance)
}

/// Fit a day to a duration constraint
pub fn budget_day(schedule: &DaySchedule, constraint: &DurationConstraint, config: &Config) -> BudgetOutcome {
    let limit_sec = constraint.seconds();
    let tolerance = config.budget.tolerance;
    let mut day = schedule.clone();
    let mut adjustments = Vec::new();

    match constraint.mode {
        DurationMode::Max => {
            trim_to(&mut day, ceiling_sec(limit_sec, tolerance), config, &mut adjustments);
        }
        DurationMode::Target => {
            grow_to(
                &mut day,
                floor_sec(limit_sec, tolerance),
                ceiling_sec(limit_sec, tolerance),
                config,
                &mut adjustments,
            );
        }
    }

    finish(day, limit_sec, tolerance, &config.tempo, adjustments)
}

/// Fit a day with no explicit constraint into the Goldilocks range.
///
/// Long days are trimmed toward the upper bound, short days grown toward the
/// lower bound. The reported limit is the upper bound.
pub fn fit_goldilocks(schedule: &DaySchedule, config: &Config) -> BudgetOutcome {
    let budget = &config.budget;
    let upper = budget.goldilocks_max_minutes * 60;
    let lower = budget.goldilocks_min_minutes * 60;
    let ceiling = ceiling_sec(upper, budget.tolerance);

    let mut day = schedule.clone();
    let mut adjustments = Vec::new();

    let total = f64::from(estimate_day(&day, &config.tempo));
    if total > ceiling {
        trim_to(&mut day, ceiling, config, &mut adjustments);
    } else if total < floor_sec(lower, budget.tolerance) {
        grow_to(&mut day, floor_sec(lower, budget.tolerance), ceiling, config, &mut adjustments);
    }

    finish(day, upper, budget.tolerance, &config.tempo, adjustments)
}

/// Apply a constraint when given, otherwise the Goldilocks range
pub fn budget_with(schedule: &DaySchedule, constraint: Option<&DurationConstraint>, config: &Config) -> BudgetOutcome {
    match constraint {
        Some(constraint) => budget_day(schedule, constraint, config),
        None => fit_goldilocks(schedule, config),
    }
}

fn finish(
    schedule: DaySchedule,
    limit_sec: u32,
    tolerance: f64,
    tempo: &TempoConfig,
    adjustments: Vec<BudgetAdjustment>,
) -> BudgetOutcome {
    let total_sec = estimate_day(&schedule, tempo);
    let ceiling = ceiling_sec(limit_sec, tolerance);
    let overage_sec = (f64::from(total_sec) - ceiling).max(0.0).ceil() as u32;

    if overage_sec > 0 {
        tracing::warn!(
            "Day still {}s over its {}s ceiling; only Tier 1 work remains",
            overage_sec,
            limit_sec
        );
    }

    BudgetOutcome {
        schedule,
        total_sec,
        limit_sec,
        overage_sec,
        adjustments,
    }
}

/// Index of the next slot to lose a set, if any slot is trimmable
fn trim_candidate(day: &DaySchedule, budget: &BudgetConfig) -> Option<usize> {
    day.exercises
        .iter()
        .enumerate()
        .filter(|(_, slot)| slot.target.is_some() && slot.exercise.density_score < budget.tier1_density)
        .min_by(|(ia, a), (ib, b)| {
            let sets = |s: &crate::ScheduledExercise| s.target.as_ref().map_or(0, |t| t.sets);
            a.exercise
                .density_score
                .cmp(&b.exercise.density_score)
                .then_with(|| match budget.tie_break {
                    TieBreak::LaterFirst => ib.cmp(ia),
                    TieBreak::EarlierFirst => ia.cmp(ib),
                    TieBreak::MostSetsFirst => sets(b).cmp(&sets(a)).then_with(|| ib.cmp(ia)),
                })
        })
        .map(|(idx, _)| idx)
}

fn trim_to(day: &mut DaySchedule, ceiling: f64, config: &Config, adjustments: &mut Vec<BudgetAdjustment>) {
    let mut total = estimate_day(day, &config.tempo);

    while f64::from(total) > ceiling {
        let Some(idx) = trim_candidate(day, &config.budget) else {
            break;
        };

        let slot = &mut day.exercises[idx];
        let exercise_id = slot.exercise.id.clone();
        let remaining = match slot.target.as_mut() {
            Some(target) => {
                target.sets = target.sets.saturating_sub(1);
                target.sets
            }
            None => break,
        };

        if remaining == 0 {
            day.exercises.remove(idx);
            tracing::info!("Budget: removed {} entirely", exercise_id);
            adjustments.push(BudgetAdjustment::ExerciseRemoved { exercise_id });
        } else {
            tracing::debug!("Budget: {} down to {} sets", exercise_id, remaining);
            adjustments.push(BudgetAdjustment::SetRemoved {
                exercise_id,
                sets: remaining,
            });
        }

        total = estimate_day(day, &config.tempo);
    }
}

fn grow_to(
    day: &mut DaySchedule,
    floor: f64,
    ceiling: f64,
    config: &Config,
    adjustments: &mut Vec<BudgetAdjustment>,
) {
    let budget = &config.budget;
    let prescribed = day.exercises.iter().filter(|s| s.target.is_some()).count();
    let max_iterations = budget.max_added_sets_per_exercise as usize * prescribed;
    let mut added = vec![0u32; day.exercises.len()];
    let mut total = estimate_day(day, &config.tempo);

    for _ in 0..max_iterations {
        if f64::from(total) >= floor {
            break;
        }

        let candidate = day
            .exercises
            .iter()
            .enumerate()
            .filter(|(idx, slot)| {
                added[*idx] < budget.max_added_sets_per_exercise
                    && slot
                        .target
                        .as_ref()
                        .is_some_and(|t| t.sets < budget.max_sets_per_exercise)
            })
            // Highest density; earliest wins ties
            .max_by(|(ia, a), (ib, b)| {
                a.exercise
                    .density_score
                    .cmp(&b.exercise.density_score)
                    .then_with(|| ib.cmp(ia))
            })
            .map(|(idx, _)| idx);

        let Some(idx) = candidate else {
            break;
        };

        let Some(target) = day.exercises[idx].target.as_mut() else {
            break;
        };
        target.sets += 1;

        let grown = estimate_day(day, &config.tempo);
        if f64::from(grown) > ceiling {
            if let Some(target) = day.exercises[idx].target.as_mut() {
                target.sets -= 1;
            }
            tracing::debug!("Budget: growing {} would overshoot, stopping", day.exercises[idx].exercise.id);
            break;
        }

        added[idx] += 1;
        total = grown;
        let slot = &day.exercises[idx];
        let sets = slot.target.as_ref().map_or(0, |t| t.sets);
        tracing::debug!("Budget: {} up to {} sets", slot.exercise.id, sets);
        adjustments.push(BudgetAdjustment::SetAdded {
            exercise_id: slot.exercise.id.clone(),
            sets,
        });
    }

    if f64::from(total) < floor {
        tracing::info!("Budget: day stays short of its target at {}s", total);
    }
}
