//! Coverage and rebalance analysis.
//!
//! Checks a day or week against the expected movement patterns and a simple
//! per-muscle recovery curve, and decides whether today's session should be
//! rebalanced before it starts.

use crate::catalog::ExerciseCatalog;
use crate::config::RecoveryConfig;
use crate::{
    CoverageAnalysis, DaySchedule, MovementPattern, MuscleGroup, PerformanceLogEntry,
    RebalanceResult, WeekSchedule, Weekday,
};
use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeMap, BTreeSet};

/// Modeled freshness of a muscle `hours_since` its last stimulus.
///
/// `1 - (1 - t/T)^2`, clamped to 0..=1 and saturating at `T`.
pub fn recovery_fraction(hours_since: f64, full_recovery_hours: f64) -> f64 {
    if full_recovery_hours <= 0.0 || hours_since >= full_recovery_hours {
        return 1.0;
    }
    if hours_since <= 0.0 {
        return 0.0;
    }
    let remaining = 1.0 - hours_since / full_recovery_hours;
    1.0 - remaining * remaining
}

/// Last stimulus time per muscle group
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecoveryState {
    last_stimulus: BTreeMap<MuscleGroup, DateTime<Utc>>,
}

impl RecoveryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a performance log; entries for unknown exercises are skipped
    pub fn from_log(entries: &[PerformanceLogEntry], catalog: &ExerciseCatalog) -> Self {
        let mut state = Self::new();
        for entry in entries {
            match catalog.get(&entry.exercise_id) {
                Some(exercise) => {
                    for muscle in &exercise.primary_muscles {
                        state.record(*muscle, entry.performed_at);
                    }
                }
                None => tracing::debug!("Recovery: skipping unknown exercise {}", entry.exercise_id),
            }
        }
        state
    }

    /// Record a stimulus, keeping the most recent time per muscle
    pub fn record(&mut self, muscle: MuscleGroup, at: DateTime<Utc>) {
        self.last_stimulus
            .entry(muscle)
            .and_modify(|last| {
                if at > *last {
                    *last = at;
                }
            })
            .or_insert(at);
    }

    pub fn last_stimulus(&self, muscle: MuscleGroup) -> Option<DateTime<Utc>> {
        self.last_stimulus.get(&muscle).copied()
    }

    /// Recovery fraction at `now`; never-stimulated muscles are fully recovered
    pub fn fraction(&self, muscle: MuscleGroup, now: DateTime<Utc>, config: &RecoveryConfig) -> f64 {
        match self.last_stimulus.get(&muscle) {
            Some(last) => {
                let hours = (now - *last).num_seconds() as f64 / 3600.0;
                recovery_fraction(hours, config.full_recovery_hours)
            }
            None => 1.0,
        }
    }

    pub fn is_fatigued(&self, muscle: MuscleGroup, now: DateTime<Utc>, config: &RecoveryConfig) -> bool {
        self.fraction(muscle, now, config) < config.fatigued_threshold
    }

    /// (ready, fatigued) muscle sets at `now`
    pub fn classify(
        &self,
        now: DateTime<Utc>,
        config: &RecoveryConfig,
    ) -> (BTreeSet<MuscleGroup>, BTreeSet<MuscleGroup>) {
        let mut ready = BTreeSet::new();
        let mut fatigued = BTreeSet::new();
        for muscle in MuscleGroup::ALL {
            let fraction = self.fraction(muscle, now, config);
            if fraction >= config.ready_threshold {
                ready.insert(muscle);
            } else if fraction < config.fatigued_threshold {
                fatigued.insert(muscle);
            }
        }
        (ready, fatigued)
    }
}

/// What a past session trained
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SessionSummary {
    pub patterns: BTreeSet<MovementPattern>,
    pub muscles: BTreeSet<MuscleGroup>,
}

impl SessionSummary {
    /// Summarize a day; unresolved slots contribute nothing
    pub fn from_day(day: &DaySchedule) -> Self {
        let mut summary = Self::default();
        for slot in day.exercises.iter().filter(|s| !s.exercise.is_placeholder()) {
            summary.patterns.insert(slot.exercise.movement_pattern);
            summary.muscles.extend(slot.exercise.primary_muscles.iter().copied());
        }
        summary
    }
}

fn join<T: std::fmt::Display>(items: impl IntoIterator<Item = T>) -> String {
    items
        .into_iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn build_analysis(
    covered: SessionSummary,
    recovery: &RecoveryState,
    now: DateTime<Utc>,
    config: &RecoveryConfig,
) -> CoverageAnalysis {
    let missing: BTreeSet<MovementPattern> = config
        .expected_patterns
        .iter()
        .filter(|p| !covered.patterns.contains(p))
        .copied()
        .collect();

    let (ready, fatigued) = recovery.classify(now, config);

    let mut recommendations = Vec::new();
    for pattern in &missing {
        let muscles = pattern.typical_muscles();
        if muscles.is_empty() {
            recommendations.push(format!("Add a {} movement", pattern));
        } else {
            recommendations.push(format!(
                "Add a {} movement to train {}",
                pattern,
                join(muscles.iter())
            ));
        }
    }
    for muscle in fatigued.intersection(&covered.muscles) {
        recommendations.push(format!(
            "{} is still recovering ({:.0}%); keep its volume light",
            muscle,
            recovery.fraction(*muscle, now, config) * 100.0
        ));
    }

    CoverageAnalysis {
        covered_movement_patterns: covered.patterns,
        missing_movement_patterns: missing,
        covered_muscle_groups: covered.muscles,
        recovery_ready_muscles: ready,
        recovery_fatigued_muscles: fatigued,
        recommendations,
    }
}

/// Coverage of a single day
pub fn analyze_day(
    day: &DaySchedule,
    recovery: &RecoveryState,
    now: DateTime<Utc>,
    config: &RecoveryConfig,
) -> CoverageAnalysis {
    build_analysis(SessionSummary::from_day(day), recovery, now, config)
}

/// Coverage of a whole week
pub fn analyze_week(
    week: &WeekSchedule,
    recovery: &RecoveryState,
    now: DateTime<Utc>,
    config: &RecoveryConfig,
) -> CoverageAnalysis {
    let mut covered = SessionSummary::default();
    for day in week.days.values() {
        let summary = SessionSummary::from_day(day);
        covered.patterns.extend(summary.patterns);
        covered.muscles.extend(summary.muscles);
    }

    let analysis = build_analysis(covered, recovery, now, config);
    tracing::debug!(
        "Week coverage: {} patterns covered, {} missing",
        analysis.covered_movement_patterns.len(),
        analysis.missing_movement_patterns.len()
    );
    analysis
}

/// Decide whether today's session should be rebalanced.
///
/// `recent_sessions` are the preceding sessions, most recent first.
pub fn check_rebalance(
    today: &DaySchedule,
    recent_sessions: &[SessionSummary],
    recovery: &RecoveryState,
    now: DateTime<Utc>,
    config: &RecoveryConfig,
) -> RebalanceResult {
    let mut reasons = Vec::new();

    // Sets per muscle today
    let mut sets_by_muscle: BTreeMap<MuscleGroup, u32> = BTreeMap::new();
    for slot in &today.exercises {
        let sets = slot.target.as_ref().map_or(0, |t| t.sets);
        for muscle in &slot.exercise.primary_muscles {
            *sets_by_muscle.entry(*muscle).or_default() += sets;
        }
    }

    for (muscle, sets) in &sets_by_muscle {
        if *sets >= config.heavy_set_threshold && recovery.is_fatigued(*muscle, now, config) {
            reasons.push(format!(
                "{} is only {:.0}% recovered but today has {} sets on it",
                muscle,
                recovery.fraction(*muscle, now, config) * 100.0,
                sets
            ));
        }
    }

    let today_summary = SessionSummary::from_day(today);
    let window = config.missing_pattern_sessions;
    let sessions: Vec<&SessionSummary> = std::iter::once(&today_summary)
        .chain(recent_sessions.iter())
        .take(window)
        .collect();

    let mut missing_patterns = Vec::new();
    if sessions.len() >= window {
        for pattern in &config.expected_patterns {
            if sessions.iter().all(|s| !s.patterns.contains(pattern)) {
                missing_patterns.push(*pattern);
            }
        }
    }

    let mut missed_muscles = BTreeSet::new();
    if !missing_patterns.is_empty() {
        for pattern in &missing_patterns {
            missed_muscles.extend(
                pattern
                    .typical_muscles()
                    .iter()
                    .filter(|m| !today_summary.muscles.contains(m))
                    .copied(),
            );
        }
        reasons.push(format!(
            "Undertrained patterns: no {} in the last {} sessions",
            join(missing_patterns.iter()),
            window
        ));
    }

    let needs_rebalance = !reasons.is_empty();
    if needs_rebalance {
        tracing::info!("Rebalance suggested: {}", reasons.join("; "));
    }

    RebalanceResult {
        needs_rebalance,
        reasons,
        missed_muscles,
    }
}

/// Run the rebalance check for each training day of a planned week.
///
/// Training days are placed `week_start` plus their weekday offset. Each day
/// is judged against the planned days before it and then `history` (most
/// recent first), and the muscles it trains are recorded into a copy of
/// `recovery` before the next day is judged.
pub fn check_week_rebalance(
    week: &WeekSchedule,
    history: &[SessionSummary],
    recovery: &RecoveryState,
    week_start: DateTime<Utc>,
    config: &RecoveryConfig,
) -> Vec<(Weekday, RebalanceResult)> {
    let mut recovery = recovery.clone();
    let mut planned: Vec<SessionSummary> = Vec::new();
    let mut results = Vec::new();

    for (offset, day) in Weekday::ALL.into_iter().enumerate() {
        let Some(schedule) = week.day(day).filter(|s| !s.is_empty()) else {
            continue;
        };
        let at = week_start + Duration::days(offset as i64);

        let recent: Vec<SessionSummary> = planned
            .iter()
            .rev()
            .chain(history.iter())
            .cloned()
            .collect();
        results.push((day, check_rebalance(schedule, &recent, &recovery, at, config)));

        for slot in &schedule.exercises {
            if slot.target.as_ref().is_some_and(|t| t.sets > 0) {
                for muscle in &slot.exercise.primary_muscles {
                    recovery.record(*muscle, at);
                }
            }
        }
        planned.push(SessionSummary::from_day(schedule));
    }

    results
}
