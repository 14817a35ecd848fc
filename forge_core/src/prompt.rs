//! Prompt construction for the workout generator.

use crate::{
    DaySchedule, DurationMode, Exercise, PerformanceLogEntry, PersonalRecord, UserProfile,
    WeekSchedule, Weekday,
};

/// Everything the generator is told about the user
#[derive(Clone, Debug)]
pub struct PromptContext<'a> {
    pub profile: &'a UserProfile,
    /// Exercises the user can perform with their equipment
    pub candidates: Vec<&'a Exercise>,
    pub personal_records: &'a [PersonalRecord],
    /// Newest first
    pub recent_history: &'a [PerformanceLogEntry],
    pub previous_week: Option<&'a WeekSchedule>,
}

/// History lines included in a prompt
const HISTORY_LINES: usize = 20;

fn format_weight(weight: Option<f64>) -> String {
    match weight {
        Some(value) if value.fract().abs() > f64::EPSILON => format!("{:.1}kg", value),
        Some(value) if value > 0.0 => format!("{:.0}kg", value),
        _ => "BW".to_string(),
    }
}

fn format_profile(profile: &UserProfile) -> String {
    let equipment = if profile.equipment.is_empty() {
        "none (bodyweight only)".to_string()
    } else {
        profile.equipment_set().into_iter().collect::<Vec<_>>().join(", ")
    };

    let duration = match &profile.duration {
        Some(d) => match d.mode {
            DurationMode::Max => format!("at most {} minutes per session", d.minutes),
            DurationMode::Target => format!("about {} minutes per session", d.minutes),
        },
        None => "no fixed limit (aim for 45-60 minutes)".to_string(),
    };

    format!(
        "Experience: {:?}\nGoal: {:?}\nTraining days per week: {}\nEquipment: {}\nSession length: {}\n",
        profile.experience, profile.goal, profile.days_per_week, equipment, duration
    )
}

fn format_candidates(candidates: &[&Exercise]) -> String {
    candidates
        .iter()
        .map(|e| format!("- {} [{}]\n", e.name, e.movement_pattern))
        .collect()
}

fn format_records(records: &[PersonalRecord]) -> String {
    if records.is_empty() {
        return "None recorded\n".to_string();
    }
    records
        .iter()
        .map(|r| match r.reps {
            Some(reps) => format!("- {}: {} x {}\n", r.exercise_id, format_weight(Some(r.weight)), reps),
            None => format!("- {}: {}\n", r.exercise_id, format_weight(Some(r.weight))),
        })
        .collect()
}

fn format_history(history: &[PerformanceLogEntry]) -> String {
    if history.is_empty() {
        return "No logged sessions yet\n".to_string();
    }
    history
        .iter()
        .take(HISTORY_LINES)
        .map(|e| {
            let work = match (e.reps, e.duration_sec) {
                (Some(reps), _) => format!("{} reps", reps),
                (None, Some(sec)) => format!("{}s", sec),
                (None, None) => "-".to_string(),
            };
            format!(
                "- {} {}: {} @ {}\n",
                e.performed_at.format("%Y-%m-%d"),
                e.exercise_id,
                work,
                format_weight(e.weight)
            )
        })
        .collect()
}

fn format_day(day: &DaySchedule) -> String {
    if day.is_empty() {
        return "rest".to_string();
    }
    day.exercises
        .iter()
        .map(|s| match &s.target {
            Some(t) => match (t.reps, t.duration_sec) {
                (Some(reps), _) => format!("{} {}x{}", s.exercise.name, t.sets, reps),
                (None, Some(sec)) => format!("{} {}x{}s", s.exercise.name, t.sets, sec),
                (None, None) => s.exercise.name.clone(),
            },
            None => s.exercise.name.clone(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_previous_week(week: Option<&WeekSchedule>) -> String {
    match week {
        Some(week) => week
            .days
            .iter()
            .map(|(day, schedule)| format!("- {}: {}\n", day, format_day(schedule)))
            .collect(),
        None => "No previous week\n".to_string(),
    }
}

const ENTRY_CONTRACT: &str = r#"{"name": "<exercise name from the list>", "sets": 3, "reps": 10, "duration_sec": null, "rest_sec": 90, "weight": null}"#;

/// Prompt for a full seven-day plan
pub fn build_week_prompt(ctx: &PromptContext<'_>) -> String {
    format!(
        r#"You are a strength and conditioning coach writing a one-week training plan.

USER PROFILE:
{profile}
AVAILABLE EXERCISES (use only these names):
{candidates}
PERSONAL RECORDS:
{records}
RECENT HISTORY (newest first):
{history}
PREVIOUS WEEK:
{previous}
RULES:
1. Schedule exactly {days} training days; every other day is a rest day with an empty exercise list.
2. Cover squat, hinge, push and pull patterns across the week and avoid the same pattern on back-to-back days.
3. Put heavy compound lifts first in each session.
4. Use "duration_sec" instead of "reps" for timed holds and carries.
5. Leave "weight" null unless you have a specific reason; loads are calculated separately.

Respond with ONLY valid JSON in this exact shape, with all seven days:
{{
  "monday": {{"exercises": [{entry}]}},
  "tuesday": {{"exercises": []}},
  "wednesday": {{"exercises": []}},
  "thursday": {{"exercises": []}},
  "friday": {{"exercises": []}},
  "saturday": {{"exercises": []}},
  "sunday": {{"exercises": []}}
}}"#,
        profile = format_profile(ctx.profile),
        candidates = format_candidates(&ctx.candidates),
        records = format_records(ctx.personal_records),
        history = format_history(ctx.recent_history),
        previous = format_previous_week(ctx.previous_week),
        days = ctx.profile.days_per_week,
        entry = ENTRY_CONTRACT,
    )
}

/// Prompt for extra exercises on one day
pub fn build_day_prompt(
    ctx: &PromptContext<'_>,
    day: Weekday,
    existing: &DaySchedule,
    focus: Option<&str>,
) -> String {
    let focus = focus
        .map(|f| format!("Focus for the added work: {}\n", f))
        .unwrap_or_default();

    format!(
        r#"You are a strength and conditioning coach adding exercises to one training day.

USER PROFILE:
{profile}
AVAILABLE EXERCISES (use only these names):
{candidates}
PERSONAL RECORDS:
{records}
RECENT HISTORY (newest first):
{history}
{day} CURRENTLY HAS: {existing}
{focus}
Suggest 2-4 additional exercises that complement what is already planned without repeating it.

Respond with ONLY a valid JSON array:
[{entry}]"#,
        profile = format_profile(ctx.profile),
        candidates = format_candidates(&ctx.candidates),
        records = format_records(ctx.personal_records),
        history = format_history(ctx.recent_history),
        day = day.as_str().to_uppercase(),
        existing = format_day(existing),
        focus = focus,
        entry = ENTRY_CONTRACT,
    )
}
