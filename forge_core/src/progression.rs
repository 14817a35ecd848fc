//! Progression logic for choosing the next working load.
//!
//! Rules, in priority order:
//! 1. No history and no PR: no suggestion (a PR alone seeds a conservative start)
//! 2. Last attempt met its target with good adherence: step the load up
//!    (fixed step for light/isolation loads, percentage for heavy compounds)
//! 3. Last attempt fell short: hold; repeated shortfalls: deload
//!
//! Every suggestion is capped at the PR plus a configured margin, and filling
//! only ever touches blank weights.

use crate::config::ProgressionConfig;
use crate::metrics::{compute_metrics, PerformanceMetrics};
use crate::{is_blank_weight, Exercise, ExerciseTarget, PerformanceLogEntry, PersonalRecord};
use serde::{Deserialize, Serialize};

/// Why a load was suggested
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProgressionRationale {
    Increase,
    Hold,
    Deload,
    NoData,
}

/// Suggested working load for the next session
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct ProgressionSuggestion {
    pub suggested_weight: Option<f64>,
    pub rationale: ProgressionRationale,
}

impl ProgressionSuggestion {
    fn new(suggested_weight: Option<f64>, rationale: ProgressionRationale) -> Self {
        Self {
            suggested_weight,
            rationale,
        }
    }

    fn no_data() -> Self {
        Self::new(None, ProgressionRationale::NoData)
    }
}

fn round_up_to(weight: f64, increment: f64) -> f64 {
    (weight / increment).ceil() * increment
}

fn round_down_to(weight: f64, increment: f64) -> f64 {
    (weight / increment).floor() * increment
}

/// Highest load a suggestion may reach given the PR
fn pr_ceiling(pr: Option<&PersonalRecord>, config: &ProgressionConfig) -> Option<f64> {
    pr.filter(|pr| pr.weight.is_finite() && pr.weight > 0.0)
        .map(|pr| round_down_to(pr.weight * (1.0 + config.pr_margin), config.load_increment))
}

fn apply_cap(weight: f64, pr: Option<&PersonalRecord>, config: &ProgressionConfig) -> f64 {
    match pr_ceiling(pr, config) {
        Some(cap) if weight > cap => {
            tracing::debug!("Capping suggestion {:.1} at PR ceiling {:.1}", weight, cap);
            cap
        }
        _ => weight,
    }
}

/// Step size for a load increase on this exercise
fn increase_step(exercise: &Exercise, base: f64, config: &ProgressionConfig) -> f64 {
    let heavy_compound = exercise.density_score >= config.compound_density_threshold
        && base >= config.heavy_load_threshold;
    if heavy_compound {
        (base * config.compound_percent).max(config.load_increment)
    } else {
        config.isolation_step
    }
}

/// Suggest the next working load from reduced history and the PR
pub fn suggest_weight(
    exercise: &Exercise,
    metrics: &PerformanceMetrics,
    pr: Option<&PersonalRecord>,
    config: &ProgressionConfig,
) -> ProgressionSuggestion {
    let Some(latest) = metrics.latest.as_ref() else {
        return match pr.filter(|pr| pr.weight.is_finite() && pr.weight > 0.0) {
            Some(pr) => {
                let seed = round_down_to(pr.weight * config.pr_seed_fraction, config.load_increment);
                tracing::debug!("{}: no history, seeding from PR at {:.1}", exercise.id, seed);
                ProgressionSuggestion::new(Some(seed), ProgressionRationale::Hold)
            }
            None => ProgressionSuggestion::no_data(),
        };
    };

    let base = latest
        .weight
        .or(latest.scheduled_weight)
        .or(metrics.avg_weight)
        .filter(|w| w.is_finite());

    let Some(base) = base else {
        // Bodyweight work: nothing to load
        return ProgressionSuggestion::new(None, ProgressionRationale::Hold);
    };
    if base <= 0.0 {
        return ProgressionSuggestion::new(Some(0.0), ProgressionRationale::Hold);
    }

    let adherent = metrics
        .adherence
        .map_or(true, |a| a >= config.adherence_threshold);

    let suggestion = match latest.met_target {
        Some(true) if adherent => {
            let step = increase_step(exercise, base, config);
            let mut next = round_up_to(base + step, config.load_increment);
            if next <= base {
                next = base + config.load_increment;
            }
            let capped = apply_cap(next, pr, config);
            let rationale = if capped > base {
                ProgressionRationale::Increase
            } else {
                ProgressionRationale::Hold
            };
            ProgressionSuggestion::new(Some(capped), rationale)
        }
        Some(false) if metrics.miss_streak >= config.deload_streak => {
            let next = round_down_to(base * (1.0 - config.deload_percent), config.load_increment);
            ProgressionSuggestion::new(
                Some(apply_cap(next, pr, config)),
                ProgressionRationale::Deload,
            )
        }
        _ => ProgressionSuggestion::new(Some(apply_cap(base, pr, config)), ProgressionRationale::Hold),
    };

    tracing::debug!(
        "{}: {:?} from {:.1} to {:?}",
        exercise.id,
        suggestion.rationale,
        base,
        suggestion.suggested_weight
    );

    suggestion
}

/// Reduce history and suggest in one step
pub fn evaluate(
    exercise: &Exercise,
    history: &[PerformanceLogEntry],
    pr: Option<&PersonalRecord>,
    config: &ProgressionConfig,
) -> (PerformanceMetrics, ProgressionSuggestion) {
    let metrics = compute_metrics(history, config.history_window, config.trend_threshold);
    let suggestion = suggest_weight(exercise, &metrics, pr, config);
    (metrics, suggestion)
}

/// Fill a target's weight from a suggestion when, and only when, it is blank.
///
/// Returns whether the weight was written. `Some(0.0)` is a deliberate
/// bodyweight prescription and is never replaced.
pub fn fill_blank_weight(target: &mut ExerciseTarget, suggestion: &ProgressionSuggestion) -> bool {
    if !is_blank_weight(target.weight) {
        return false;
    }
    match suggestion.suggested_weight {
        Some(weight) => {
            target.weight = Some(weight);
            true
        }
        None => {
            // Normalize NaN to "unspecified"
            target.weight = None;
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build_default_catalog;
    use chrono::{Duration, Utc};

    fn log(days_ago: i64, weight: f64, reps: u32, scheduled_reps: u32) -> PerformanceLogEntry {
        PerformanceLogEntry {
            exercise_id: "bench_press".into(),
            weight: Some(weight),
            reps: Some(reps),
            duration_sec: None,
            scheduled_weight: Some(weight),
            scheduled_reps: Some(scheduled_reps),
            scheduled_duration_sec: None,
            performed_at: Utc::now() - Duration::days(days_ago),
        }
    }

    fn pr(weight: f64) -> PersonalRecord {
        PersonalRecord {
            exercise_id: "bench_press".into(),
            weight,
            reps: Some(5),
        }
    }

    fn bench() -> Exercise {
        build_default_catalog().get("bench_press").unwrap().clone()
    }

    fn curl() -> Exercise {
        build_default_catalog().get("biceps_curl").unwrap().clone()
    }

    #[test]
    fn test_no_history_no_pr_gives_nothing() {
        let config = ProgressionConfig::default();
        let (_, suggestion) = evaluate(&bench(), &[], None, &config);
        assert_eq!(suggestion.suggested_weight, None);
        assert_eq!(suggestion.rationale, ProgressionRationale::NoData);
    }

    #[test]
    fn test_pr_only_seeds_conservatively() {
        let config = ProgressionConfig::default();
        let (_, suggestion) = evaluate(&bench(), &[], Some(&pr(100.0)), &config);
        assert_eq!(suggestion.suggested_weight, Some(75.0));
        assert_eq!(suggestion.rationale, ProgressionRationale::Hold);
    }

    #[test]
    fn test_met_target_increases_within_pr_margin() {
        let config = ProgressionConfig::default();
        let history = vec![log(2, 100.0, 10, 10), log(2, 100.0, 10, 10), log(2, 100.0, 10, 10)];
        let (_, suggestion) = evaluate(&bench(), &history, Some(&pr(100.0)), &config);

        let weight = suggestion.suggested_weight.unwrap();
        assert!(weight > 100.0);
        assert!(weight <= 110.0);
        assert_eq!(suggestion.rationale, ProgressionRationale::Increase);
    }

    #[test]
    fn test_isolation_uses_fixed_step() {
        let config = ProgressionConfig::default();
        let mut entry = log(1, 12.0, 12, 12);
        entry.exercise_id = "biceps_curl".into();
        let (_, suggestion) = evaluate(&curl(), &[entry], None, &config);
        assert_eq!(suggestion.suggested_weight, Some(14.5));
    }

    #[test]
    fn test_heavy_compound_uses_percentage_step() {
        let config = ProgressionConfig::default();
        let (_, suggestion) = evaluate(&bench(), &[log(1, 200.0, 5, 5)], None, &config);
        // 2.5% of 200
        assert_eq!(suggestion.suggested_weight, Some(205.0));
    }

    #[test]
    fn test_pr_cap_limits_increase() {
        let config = ProgressionConfig::default();
        // Logged well above an outdated PR
        let (_, suggestion) = evaluate(&bench(), &[log(1, 120.0, 5, 5)], Some(&pr(100.0)), &config);
        assert_eq!(suggestion.suggested_weight, Some(110.0));
        assert_eq!(suggestion.rationale, ProgressionRationale::Hold);
    }

    #[test]
    fn test_single_miss_holds() {
        let config = ProgressionConfig::default();
        let history = vec![log(1, 100.0, 7, 10), log(3, 100.0, 10, 10)];
        let (_, suggestion) = evaluate(&bench(), &history, None, &config);
        assert_eq!(suggestion.suggested_weight, Some(100.0));
        assert_eq!(suggestion.rationale, ProgressionRationale::Hold);
    }

    #[test]
    fn test_repeated_misses_deload() {
        let config = ProgressionConfig::default();
        let history = vec![log(1, 100.0, 7, 10), log(3, 100.0, 8, 10)];
        let (_, suggestion) = evaluate(&bench(), &history, None, &config);
        assert_eq!(suggestion.suggested_weight, Some(90.0));
        assert_eq!(suggestion.rationale, ProgressionRationale::Deload);
    }

    #[test]
    fn test_met_target_with_poor_adherence_holds() {
        let config = ProgressionConfig::default();
        let history = vec![
            log(1, 100.0, 10, 10),
            log(2, 100.0, 5, 10),
            log(3, 100.0, 10, 10),
            log(4, 100.0, 5, 10),
        ];
        // adherence 0.75 < 0.9
        let (_, suggestion) = evaluate(&bench(), &history, None, &config);
        assert_eq!(suggestion.rationale, ProgressionRationale::Hold);
    }

    #[test]
    fn test_bodyweight_history_keeps_no_weight() {
        let config = ProgressionConfig::default();
        let mut entry = log(1, 0.0, 10, 10);
        entry.weight = None;
        entry.scheduled_weight = None;
        let (_, suggestion) = evaluate(&bench(), &[entry], None, &config);
        assert_eq!(suggestion.suggested_weight, None);
    }

    #[test]
    fn test_fill_only_blank_weights() {
        let suggestion = ProgressionSuggestion::new(Some(80.0), ProgressionRationale::Increase);

        let mut blank = ExerciseTarget::reps(3, 8, 90).unwrap();
        assert!(fill_blank_weight(&mut blank, &suggestion));
        assert_eq!(blank.weight, Some(80.0));

        let mut nan = ExerciseTarget::reps(3, 8, 90).unwrap().with_weight(Some(f64::NAN));
        assert!(fill_blank_weight(&mut nan, &suggestion));
        assert_eq!(nan.weight, Some(80.0));

        let mut bodyweight = ExerciseTarget::reps(3, 8, 90).unwrap().with_weight(Some(0.0));
        assert!(!fill_blank_weight(&mut bodyweight, &suggestion));
        assert_eq!(bodyweight.weight, Some(0.0));

        let mut explicit = ExerciseTarget::reps(3, 8, 90).unwrap().with_weight(Some(60.0));
        assert!(!fill_blank_weight(&mut explicit, &suggestion));
        assert_eq!(explicit.weight, Some(60.0));
    }

    #[test]
    fn test_suggestions_never_exceed_pr_margin() {
        let config = ProgressionConfig::default();
        for logged in [50.0, 95.0, 100.0, 105.0, 140.0] {
            for pr_weight in [60.0, 100.0, 120.0] {
                let (_, s) = evaluate(&bench(), &[log(1, logged, 5, 5)], Some(&pr(pr_weight)), &config);
                let w = s.suggested_weight.unwrap();
                assert!(
                    w <= pr_weight * 1.10 + 1e-9,
                    "{} exceeded cap for PR {}",
                    w,
                    pr_weight
                );
            }
        }
    }
}
