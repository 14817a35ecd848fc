//! Performance history reduction.
//!
//! Turns a recent window of logged sets for one exercise into averages, a
//! load trend, an adherence ratio against what was prescribed, and the
//! current run of missed targets.

use crate::PerformanceLogEntry;
use serde::{Deserialize, Serialize};

/// Direction of the working load over the window
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Improving,
    #[default]
    Flat,
    Declining,
}

/// Summary of the most recent logged attempt
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LatestAttempt {
    pub weight: Option<f64>,
    pub reps: Option<u32>,
    pub duration_sec: Option<u32>,
    pub scheduled_weight: Option<f64>,
    /// `None` when nothing was prescribed for the attempt
    pub met_target: Option<bool>,
}

/// Reduced history for one exercise
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
pub struct PerformanceMetrics {
    /// Entries considered (after windowing)
    pub sample_size: usize,
    /// Entries that carried a weight
    pub weighted_samples: usize,
    pub avg_weight: Option<f64>,
    pub avg_reps: Option<f64>,
    pub avg_duration_sec: Option<f64>,
    /// Mean weight x reps over weighted rep entries
    pub avg_set_volume: Option<f64>,
    pub trend: Trend,
    /// Mean fraction of the prescription completed, 0..=1
    pub adherence: Option<f64>,
    pub latest: Option<LatestAttempt>,
    /// Consecutive most-recent attempts that fell short
    pub miss_streak: u32,
}

impl PerformanceMetrics {
    pub fn has_history(&self) -> bool {
        self.sample_size > 0
    }
}

/// Fraction of an entry's prescription that was completed.
///
/// `None` when the entry carries no schedule. Reps (or duration) and weight
/// are compared separately and the weaker ratio wins.
fn entry_adherence(entry: &PerformanceLogEntry) -> Option<f64> {
    let volume_ratio = match (entry.scheduled_reps, entry.scheduled_duration_sec) {
        (Some(scheduled), _) if scheduled > 0 => {
            Some(f64::from(entry.reps.unwrap_or(0)) / f64::from(scheduled))
        }
        (_, Some(scheduled)) if scheduled > 0 => {
            Some(f64::from(entry.duration_sec.unwrap_or(0)) / f64::from(scheduled))
        }
        _ => None,
    };

    let weight_ratio = match (entry.scheduled_weight, entry.weight) {
        (Some(scheduled), Some(performed)) if scheduled > 0.0 => Some(performed / scheduled),
        _ => None,
    };

    let ratio = match (volume_ratio, weight_ratio) {
        (Some(v), Some(w)) => Some(v.min(w)),
        (Some(v), None) => Some(v),
        (None, Some(w)) => Some(w),
        (None, None) => None,
    }?;

    Some(ratio.clamp(0.0, 1.0))
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Reduce recent history for one exercise.
///
/// Entries may arrive in any order; the newest `window` are used. No entries
/// yields neutral metrics.
pub fn compute_metrics(
    entries: &[PerformanceLogEntry],
    window: usize,
    trend_threshold: f64,
) -> PerformanceMetrics {
    let mut recent: Vec<&PerformanceLogEntry> = entries.iter().collect();
    recent.sort_by(|a, b| b.performed_at.cmp(&a.performed_at));
    recent.truncate(window);

    if recent.is_empty() {
        return PerformanceMetrics::default();
    }

    // Weight trend ignores bodyweight entries
    let weights: Vec<f64> = recent
        .iter()
        .filter_map(|e| e.weight)
        .filter(|w| w.is_finite())
        .collect();

    let avg_weight = mean(weights.iter().copied());
    let avg_reps = mean(recent.iter().filter_map(|e| e.reps).map(f64::from));
    let avg_duration_sec = mean(recent.iter().filter_map(|e| e.duration_sec).map(f64::from));
    let avg_set_volume = mean(recent.iter().filter_map(|e| match (e.weight, e.reps) {
        (Some(w), Some(r)) if w.is_finite() => Some(w * f64::from(r)),
        _ => None,
    }));

    let trend = weight_trend(&weights, trend_threshold);
    let adherence = mean(recent.iter().filter_map(|e| entry_adherence(e)));

    let miss_streak = recent
        .iter()
        .map(|e| entry_adherence(e))
        .take_while(|a| matches!(a, Some(ratio) if *ratio < 1.0))
        .count() as u32;

    let newest = recent[0];
    let latest = LatestAttempt {
        weight: newest.weight,
        reps: newest.reps,
        duration_sec: newest.duration_sec,
        scheduled_weight: newest.scheduled_weight,
        met_target: entry_adherence(newest).map(|ratio| ratio >= 1.0),
    };

    let metrics = PerformanceMetrics {
        sample_size: recent.len(),
        weighted_samples: weights.len(),
        avg_weight,
        avg_reps,
        avg_duration_sec,
        avg_set_volume,
        trend,
        adherence,
        latest: Some(latest),
        miss_streak,
    };

    tracing::debug!(
        "Metrics over {} entries: trend {:?}, adherence {:?}, miss streak {}",
        metrics.sample_size,
        metrics.trend,
        metrics.adherence,
        metrics.miss_streak
    );

    metrics
}

/// Compare the newer half of the weights (newest first) against the older half
fn weight_trend(weights_newest_first: &[f64], threshold: f64) -> Trend {
    if weights_newest_first.len() < 2 {
        return Trend::Flat;
    }

    let mid = weights_newest_first.len() / 2;
    let (newer, older) = weights_newest_first.split_at(mid);
    let (Some(newer_avg), Some(older_avg)) = (
        mean(newer.iter().copied()),
        mean(older.iter().copied()),
    ) else {
        return Trend::Flat;
    };

    if older_avg <= 0.0 {
        return Trend::Flat;
    }

    let change = (newer_avg - older_avg) / older_avg;
    if change > threshold {
        Trend::Improving
    } else if change < -threshold {
        Trend::Declining
    } else {
        Trend::Flat
    }
}
