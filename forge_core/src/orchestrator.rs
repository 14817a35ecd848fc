//! Week generation orchestration.
//!
//! Pipeline for one plan:
//! 1. Collect candidate exercises the user's equipment allows
//! 2. Build the prompt and call the generator (one fallback retry)
//! 3. Parse and normalize the response into seven days
//! 4. Resolve names, enforce equipment, build base targets
//! 5. Keep the first `days_per_week` non-empty days
//! 6. Budget each day, then fill blank loads from progression
//!
//! Non-fatal problems are collected as `PlanIssue`s on the result; the caller
//! persists the plan through an atomic `PlanStore::replace_active`.

use crate::budget::{budget_with, BudgetOutcome};
use crate::catalog::ExerciseCatalog;
use crate::coverage::{analyze_day, analyze_week, RecoveryState};
use crate::generator::{
    generate_with_timeout, GenerationRequest, ModelCache, ResponseShape, WorkoutGenerator,
};
use crate::history::{merge_personal_records, derive_personal_records, recent_for, record_for};
use crate::parser::{parse_day, parse_week, RawEntry};
use crate::prompt::{build_day_prompt, build_week_prompt, PromptContext};
use crate::targets::TargetSelector;
use crate::{
    Config, CoverageAnalysis, DaySchedule, Error, Exercise, FieldIssue, PerformanceLogEntry,
    PersonalRecord, Result, ScheduledExercise, TargetSelectionContext, UserProfile, WeekSchedule,
    Weekday,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;
use uuid::Uuid;

/// Category of a non-fatal planning problem
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PlanIssueKind {
    /// A generated field or entry was unusable and dropped
    InvalidField,
    /// A generated name matched nothing in the catalog
    UnresolvedExercise,
    /// A generated exercise needed undeclared equipment and was dropped
    EquipmentConstraint,
    /// A day stayed over its ceiling after trimming
    DurationBudget,
    /// The generator produced a different number of training days
    TrainingDays,
    /// The primary model failed and the fallback was used
    ModelFallback,
}

/// Non-fatal problem found while planning
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PlanIssue {
    pub kind: PlanIssueKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<Weekday>,
    pub message: String,
}

impl PlanIssue {
    fn new(kind: PlanIssueKind, day: Option<Weekday>, message: impl Into<String>) -> Self {
        Self {
            kind,
            day,
            message: message.into(),
        }
    }

    fn field(issue: &FieldIssue) -> Self {
        let day = issue.path.split('.').next().and_then(Weekday::from_key);
        Self::new(PlanIssueKind::InvalidField, day, issue.to_string())
    }
}

/// Inputs for one week of planning, snapshotted by the caller
#[derive(Clone, Debug)]
pub struct WeekRequest {
    pub profile: UserProfile,
    pub custom_exercises: Vec<Exercise>,
    /// Performance log, any order
    pub history: Vec<PerformanceLogEntry>,
    pub personal_records: Vec<PersonalRecord>,
    pub previous_week: Option<WeekSchedule>,
    pub now: DateTime<Utc>,
}

impl WeekRequest {
    pub fn new(profile: UserProfile) -> Self {
        Self {
            profile,
            custom_exercises: Vec::new(),
            history: Vec::new(),
            personal_records: Vec::new(),
            previous_week: None,
            now: Utc::now(),
        }
    }
}

/// Inputs for supplementing a single day
#[derive(Clone, Debug)]
pub struct DayRequest {
    pub week: WeekRequest,
    pub day: Weekday,
    pub existing: DaySchedule,
    pub focus: Option<String>,
}

/// A ready-to-persist week plan
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct GeneratedWeek {
    pub plan_id: Uuid,
    pub generated_at: DateTime<Utc>,
    /// Model that produced the accepted response
    pub model: String,
    pub week: WeekSchedule,
    pub budgets: BTreeMap<Weekday, BudgetOutcome>,
    /// Slot names without a prescription, per day
    pub missing_targets: BTreeMap<Weekday, Vec<String>>,
    pub issues: Vec<PlanIssue>,
    pub coverage: CoverageAnalysis,
}

/// A supplemented day
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct GeneratedDay {
    pub model: String,
    pub day: Weekday,
    pub schedule: DaySchedule,
    pub budget: BudgetOutcome,
    pub missing_targets: Vec<String>,
    pub issues: Vec<PlanIssue>,
    pub coverage: CoverageAnalysis,
}

/// Catalog, equipment and history resolved once per request
struct Planning<'r> {
    catalog: ExerciseCatalog,
    equipment: BTreeSet<String>,
    request: &'r WeekRequest,
    records: Vec<PersonalRecord>,
    /// Newest first
    history: Vec<PerformanceLogEntry>,
}

impl<'r> Planning<'r> {
    fn new(base: &ExerciseCatalog, request: &'r WeekRequest) -> Self {
        let records = merge_personal_records(
            &request.personal_records,
            derive_personal_records(&request.history),
        );
        let mut history = request.history.clone();
        history.sort_by(|a, b| b.performed_at.cmp(&a.performed_at));
        Self {
            catalog: base.with_custom(&request.custom_exercises),
            equipment: request.profile.equipment_set(),
            request,
            records,
            history,
        }
    }

    fn prompt_context(&self) -> PromptContext<'_> {
        PromptContext {
            profile: &self.request.profile,
            candidates: self.catalog.available_with(&self.equipment),
            personal_records: &self.records,
            recent_history: &self.history,
            previous_week: self.request.previous_week.as_ref(),
        }
    }
}

/// Outcome of one generator attempt
enum Attempt<T> {
    Done(T),
    /// Worth one retry on the fallback model
    Retry(Error),
    Fatal(Error),
}

/// Plans weeks and days through an external generator
pub struct WeekPlanner<'a> {
    generator: &'a dyn WorkoutGenerator,
    catalog: &'a ExerciseCatalog,
    config: &'a Config,
    cache: &'a ModelCache,
}

impl<'a> WeekPlanner<'a> {
    pub fn new(
        generator: &'a dyn WorkoutGenerator,
        catalog: &'a ExerciseCatalog,
        config: &'a Config,
        cache: &'a ModelCache,
    ) -> Self {
        Self {
            generator,
            catalog,
            config,
            cache,
        }
    }

    /// Generate a full week plan
    pub async fn generate_week(&self, request: &WeekRequest) -> Result<GeneratedWeek> {
        let days_per_week = usize::from(request.profile.days_per_week);
        if !(1..=7).contains(&days_per_week) {
            return Err(Error::Config(format!(
                "days_per_week must be between 1 and 7, got {}",
                days_per_week
            )));
        }

        let planning = Planning::new(self.catalog, request);
        let context = planning.prompt_context();
        let prompt = build_week_prompt(&context);
        tracing::info!(
            "Generating week: {} candidates, {} training days",
            context.candidates.len(),
            days_per_week
        );

        let mut issues = Vec::new();
        let (model, parsed) = self
            .call_with_fallback(prompt, ResponseShape::Week, parse_week, &mut issues)
            .await?;
        issues.extend(parsed.issues.iter().map(PlanIssue::field));

        // Resolve every day first so that days emptied by the equipment
        // filter do not count toward the training-day limit
        let mut resolved = Vec::new();
        for parsed_day in &parsed.days {
            if parsed_day.entries.is_empty() {
                continue;
            }
            let mut day_issues = Vec::new();
            let schedule = self.resolve_entries(&planning, parsed_day.day, &parsed_day.entries, &mut day_issues);
            if schedule.is_empty() {
                issues.extend(day_issues);
                continue;
            }
            resolved.push((parsed_day.day, schedule, day_issues));
        }

        let content_days = resolved.len();
        if content_days > days_per_week {
            for (day, _, _) in &resolved[days_per_week..] {
                tracing::info!("Emptying {} to honor {} training days", day, days_per_week);
            }
            resolved.truncate(days_per_week);
            issues.push(PlanIssue::new(
                PlanIssueKind::TrainingDays,
                None,
                format!(
                    "Generator returned {} training days; kept the first {}",
                    content_days, days_per_week
                ),
            ));
        } else if content_days < days_per_week {
            tracing::warn!(
                "Generator returned {} training days, {} requested",
                content_days,
                days_per_week
            );
            issues.push(PlanIssue::new(
                PlanIssueKind::TrainingDays,
                None,
                format!(
                    "Generator returned only {} of {} requested training days",
                    content_days, days_per_week
                ),
            ));
        }

        let mut week = WeekSchedule::default();
        let mut budgets = BTreeMap::new();
        let mut missing_targets = BTreeMap::new();

        for (day, schedule, day_issues) in resolved {
            issues.extend(day_issues);
            let (schedule, budget) = self.finalize_day(&planning, day, schedule, &mut issues);

            let missing: Vec<String> = schedule.missing_targets().into_iter().map(String::from).collect();
            if !missing.is_empty() {
                missing_targets.insert(day, missing);
            }
            budgets.insert(day, budget);
            week.set_day(day, schedule);
        }

        if week.training_days().is_empty() {
            let mut field_issues = parsed.issues;
            field_issues.push(FieldIssue::new("week", "no usable training days"));
            return Err(Error::ScheduleValidation(field_issues));
        }

        let recovery = RecoveryState::from_log(&request.history, &planning.catalog);
        let coverage = analyze_week(&week, &recovery, request.now, &self.config.recovery);

        let plan = GeneratedWeek {
            plan_id: Uuid::new_v4(),
            generated_at: request.now,
            model,
            week,
            budgets,
            missing_targets,
            issues,
            coverage,
        };

        tracing::info!(
            "Week plan {} ready: {} training days, {} issues",
            plan.plan_id,
            plan.week.training_days().len(),
            plan.issues.len()
        );

        Ok(plan)
    }

    /// Generate additional exercises for one day and append them
    pub async fn generate_day_supplement(&self, request: &DayRequest) -> Result<GeneratedDay> {
        let planning = Planning::new(self.catalog, &request.week);
        let prompt = build_day_prompt(
            &planning.prompt_context(),
            request.day,
            &request.existing,
            request.focus.as_deref(),
        );

        let mut issues = Vec::new();
        let (model, (entries, field_issues)) = self
            .call_with_fallback(prompt, ResponseShape::Day, parse_day, &mut issues)
            .await?;
        issues.extend(field_issues.iter().map(PlanIssue::field));

        let added = self.resolve_entries(&planning, request.day, &entries, &mut issues);

        let mut schedule = request.existing.clone();
        for slot in added.exercises {
            if schedule.exercises.iter().any(|s| s.exercise.id == slot.exercise.id) {
                tracing::debug!("Skipping {}, already on {}", slot.exercise.id, request.day);
                continue;
            }
            schedule.exercises.push(slot);
        }

        let (schedule, budget) = self.finalize_day(&planning, request.day, schedule, &mut issues);
        let recovery = RecoveryState::from_log(&request.week.history, &planning.catalog);
        let coverage = analyze_day(&schedule, &recovery, request.week.now, &self.config.recovery);
        let missing_targets = schedule.missing_targets().into_iter().map(String::from).collect();

        Ok(GeneratedDay {
            model,
            day: request.day,
            schedule,
            budget,
            missing_targets,
            issues,
            coverage,
        })
    }

    /// Call the generator and parse, retrying once on the fallback model
    async fn call_with_fallback<T>(
        &self,
        prompt: String,
        shape: ResponseShape,
        parse: fn(&str) -> Result<T>,
        issues: &mut Vec<PlanIssue>,
    ) -> Result<(String, T)> {
        let generator_config = &self.config.generator;
        let first_model = self
            .cache
            .get()
            .unwrap_or_else(|| generator_config.primary_model.clone());

        let error = match self.attempt(&first_model, &prompt, shape, parse).await {
            Attempt::Done(value) => {
                self.cache.set(&first_model);
                return Ok((first_model, value));
            }
            Attempt::Fatal(e) => return Err(e),
            Attempt::Retry(e) => e,
        };

        // A cached fallback that failed retries against the primary
        let fallback = if first_model == generator_config.fallback_model {
            generator_config.primary_model.clone()
        } else {
            generator_config.fallback_model.clone()
        };
        tracing::warn!(
            "{} failed ({}), retrying once with {}",
            first_model,
            error,
            fallback
        );
        self.cache.invalidate();

        match self.attempt(&fallback, &prompt, shape, parse).await {
            Attempt::Done(value) => {
                self.cache.set(&fallback);
                issues.push(PlanIssue::new(
                    PlanIssueKind::ModelFallback,
                    None,
                    format!("{} failed ({}); used {}", first_model, error, fallback),
                ));
                Ok((fallback, value))
            }
            Attempt::Retry(e) | Attempt::Fatal(e) => {
                tracing::error!("Fallback model {} also failed: {}", fallback, e);
                Err(e)
            }
        }
    }

    async fn attempt<T>(
        &self,
        model: &str,
        prompt: &str,
        shape: ResponseShape,
        parse: fn(&str) -> Result<T>,
    ) -> Attempt<T> {
        let request = GenerationRequest {
            model: model.to_string(),
            prompt: prompt.to_string(),
            shape,
        };
        let timeout = Duration::from_secs(self.config.generator.timeout_secs);

        let text = match generate_with_timeout(self.generator, &request, timeout).await {
            Ok(text) => text,
            Err(e) if e.is_retriable() => return Attempt::Retry(e.into()),
            Err(e) => return Attempt::Fatal(e.into()),
        };

        match parse(&text) {
            Ok(value) => Attempt::Done(value),
            Err(e @ Error::JsonParse(_)) => Attempt::Retry(e),
            Err(e) => Attempt::Fatal(e),
        }
    }

    /// Resolve generated entries into slots with base targets.
    ///
    /// Unknown names keep their slot without a target; exercises needing
    /// undeclared equipment are dropped.
    fn resolve_entries(
        &self,
        planning: &Planning<'_>,
        day: Weekday,
        entries: &[RawEntry],
        issues: &mut Vec<PlanIssue>,
    ) -> DaySchedule {
        let selector = TargetSelector::new(&planning.catalog, self.config);
        let profile = &planning.request.profile;
        let mut slots = Vec::new();

        for entry in entries {
            let Some(exercise) = planning.catalog.resolve(&entry.name) else {
                tracing::warn!("{}: '{}' is not in the catalog", day, entry.name);
                issues.push(PlanIssue::new(
                    PlanIssueKind::UnresolvedExercise,
                    Some(day),
                    format!("'{}' is not a known exercise", entry.name),
                ));
                slots.push(ScheduledExercise::missing_target(Exercise::placeholder(&entry.name)));
                continue;
            };

            let missing = exercise.missing_equipment(&planning.equipment);
            if !missing.is_empty() {
                let violation = Error::EquipmentConstraintViolation {
                    exercise: exercise.name.clone(),
                    missing,
                };
                tracing::warn!("{}: dropping {}", day, violation);
                issues.push(PlanIssue::new(
                    PlanIssueKind::EquipmentConstraint,
                    Some(day),
                    violation.to_string(),
                ));
                continue;
            }

            let ctx = TargetSelectionContext {
                experience: profile.experience,
                goal: profile.goal,
                overrides: entry.overrides(),
                history_count: planning
                    .request
                    .history
                    .iter()
                    .filter(|e| e.exercise_id == exercise.id)
                    .count(),
            };

            match selector.base_for(exercise, &ctx) {
                Ok(target) => slots.push(ScheduledExercise::new(exercise.clone(), target)),
                Err(e) => {
                    tracing::warn!("{}: no target for {}: {}", day, exercise.id, e);
                    slots.push(ScheduledExercise::missing_target(exercise.clone()));
                }
            }
        }

        DaySchedule::new(slots)
    }

    /// Budget a day, then fill blank loads
    fn finalize_day(
        &self,
        planning: &Planning<'_>,
        day: Weekday,
        schedule: DaySchedule,
        issues: &mut Vec<PlanIssue>,
    ) -> (DaySchedule, BudgetOutcome) {
        let budget = budget_with(&schedule, planning.request.profile.duration.as_ref(), self.config);
        if let Err(e) = budget.ensure_within() {
            issues.push(PlanIssue::new(PlanIssueKind::DurationBudget, Some(day), e.to_string()));
        }

        let selector = TargetSelector::new(&planning.catalog, self.config);
        let window = self.config.progression.history_window;
        let mut schedule = budget.schedule.clone();
        for slot in &mut schedule.exercises {
            let Some(target) = slot.target.as_mut() else {
                continue;
            };
            let history = recent_for(&planning.history, &slot.exercise.id, window);
            let pr = record_for(&planning.records, &slot.exercise.id);
            selector.fill_weight(&slot.exercise, target, &history, pr);
        }

        let budget = BudgetOutcome {
            schedule: schedule.clone(),
            ..budget
        };
        (schedule, budget)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{GeneratorError, ReplayGenerator};
    use crate::{
        build_default_catalog, DurationConstraint, DurationMode, ExperienceLevel, TrainingGoal,
    };
    use chrono::Duration as ChronoDuration;

    fn profile(days_per_week: u8, equipment: &[&str]) -> UserProfile {
        UserProfile {
            experience: ExperienceLevel::Beginner,
            goal: TrainingGoal::Strength,
            days_per_week,
            equipment: equipment.iter().map(|e| e.to_string()).collect(),
            duration: None,
        }
    }

    const FOUR_DAYS: &str = r#"```json
{
  "tuesday": {"exercises": [{"name": "Goblet Squat", "sets": 3, "reps": 10}]},
  "monday": {"exercises": [{"name": "Push-up", "sets": 3, "reps": 12}]},
  "thursday": {"exercises": [{"name": "Kettlebell Swing", "sets": 4, "reps": "15"}]},
  "saturday": {"exercises": [{"name": "Plank", "sets": 3, "duration_sec": 40}]},
  "wednesday": {"exercises": []}
}
```"#;

    async fn plan(generator: &ReplayGenerator, request: &WeekRequest) -> Result<GeneratedWeek> {
        let catalog = build_default_catalog();
        let config = Config::default();
        let cache = ModelCache::new(std::time::Duration::from_secs(600));
        WeekPlanner::new(generator, &catalog, &config, &cache)
            .generate_week(request)
            .await
    }

    #[tokio::test]
    async fn test_extra_training_days_are_emptied_in_declared_order() {
        crate::logging::init_test();
        let generator = ReplayGenerator::new([FOUR_DAYS.to_string()]);
        let request = WeekRequest::new(profile(3, &["kettlebell"]));

        let plan = plan(&generator, &request).await.unwrap();

        assert_eq!(
            plan.week.training_days(),
            vec![Weekday::Monday, Weekday::Tuesday, Weekday::Thursday]
        );
        assert!(plan.week.day(Weekday::Saturday).unwrap().is_empty());
        assert_eq!(plan.week.days.len(), 7);
        assert!(plan
            .issues
            .iter()
            .any(|i| i.kind == PlanIssueKind::TrainingDays));
    }

    #[tokio::test]
    async fn test_exactly_n_days_for_every_n() {
        for n in 1..=4u8 {
            let generator = ReplayGenerator::new([FOUR_DAYS.to_string()]);
            let request = WeekRequest::new(profile(n, &["kettlebell"]));
            let plan = plan(&generator, &request).await.unwrap();
            assert_eq!(plan.week.training_days().len(), usize::from(n));
        }
    }

    #[tokio::test]
    async fn test_equipment_filter_drops_unavailable_exercises() {
        let text = r#"{
  "monday": {"exercises": [
    {"name": "Barbell Back Squat", "sets": 5, "reps": 5},
    {"name": "Goblet Squat", "sets": 3, "reps": 10},
    {"name": "Push-up", "sets": 3, "reps": 10}
  ]}
}"#;
        let generator = ReplayGenerator::new([text.to_string()]);
        let request = WeekRequest::new(profile(1, &["Kettlebell"]));
        let plan = plan(&generator, &request).await.unwrap();

        let equipment = request.profile.equipment_set();
        for day in plan.week.days.values() {
            for slot in &day.exercises {
                assert!(slot.exercise.missing_equipment(&equipment).is_empty());
            }
        }
        let monday = plan.week.day(Weekday::Monday).unwrap();
        assert_eq!(monday.exercises.len(), 2);
        assert!(plan
            .issues
            .iter()
            .any(|i| i.kind == PlanIssueKind::EquipmentConstraint && i.message.contains("barbell")));
    }

    #[tokio::test]
    async fn test_unknown_names_become_missing_targets() {
        let text = r#"{"friday": {"exercises": [
            {"name": "Push-up", "sets": 3, "reps": 10},
            {"name": "Zercher Good Morning", "sets": 3, "reps": 8}
        ]}}"#;
        let generator = ReplayGenerator::new([text.to_string()]);
        let plan = plan(&generator, &WeekRequest::new(profile(1, &[]))).await.unwrap();

        let friday = plan.week.day(Weekday::Friday).unwrap();
        assert_eq!(friday.exercises.len(), 2);
        assert!(friday.exercises[1].target.is_none());
        assert_eq!(
            plan.missing_targets[&Weekday::Friday],
            vec!["Zercher Good Morning".to_string()]
        );
    }

    #[tokio::test]
    async fn test_model_unavailable_retries_once_with_fallback() {
        let generator = ReplayGenerator::with_results(vec![
            Err(GeneratorError::ModelUnavailable("gemini-2.5-pro".into())),
            Ok(FOUR_DAYS.to_string()),
        ]);
        let catalog = build_default_catalog();
        let config = Config::default();
        let cache = ModelCache::new(std::time::Duration::from_secs(600));
        let planner = WeekPlanner::new(&generator, &catalog, &config, &cache);

        let plan = planner
            .generate_week(&WeekRequest::new(profile(2, &["kettlebell"])))
            .await
            .unwrap();

        assert_eq!(plan.model, "gemini-2.5-flash");
        assert_eq!(cache.get().as_deref(), Some("gemini-2.5-flash"));
        let models: Vec<_> = generator.requests().into_iter().map(|r| r.model).collect();
        assert_eq!(models, vec!["gemini-2.5-pro", "gemini-2.5-flash"]);
        assert!(plan.issues.iter().any(|i| i.kind == PlanIssueKind::ModelFallback));
    }

    #[tokio::test]
    async fn test_parse_failure_retries_then_surfaces() {
        let generator = ReplayGenerator::new(["Sorry, no JSON today".to_string(), "still no".to_string()]);
        let err = plan(&generator, &WeekRequest::new(profile(3, &[]))).await.unwrap_err();
        assert!(matches!(err, Error::JsonParse(_)));
        assert_eq!(generator.requests().len(), 2);
        assert!(!err.user_message().contains("JSON"));
    }

    #[tokio::test]
    async fn test_non_retriable_failure_is_not_retried() {
        let generator = ReplayGenerator::with_results(vec![Err(GeneratorError::Other("quota exceeded".into()))]);
        let err = plan(&generator, &WeekRequest::new(profile(3, &[]))).await.unwrap_err();
        assert!(matches!(err, Error::Generator(_)));
        assert_eq!(generator.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_cached_model_is_used_first() {
        let generator = ReplayGenerator::new([FOUR_DAYS.to_string()]);
        let catalog = build_default_catalog();
        let config = Config::default();
        let cache = ModelCache::new(std::time::Duration::from_secs(600));
        cache.set("gemini-2.5-flash");

        WeekPlanner::new(&generator, &catalog, &config, &cache)
            .generate_week(&WeekRequest::new(profile(3, &["kettlebell"])))
            .await
            .unwrap();
        assert_eq!(generator.requests()[0].model, "gemini-2.5-flash");
    }

    #[tokio::test]
    async fn test_cached_fallback_failure_retries_primary() {
        let generator = ReplayGenerator::with_results(vec![
            Err(GeneratorError::ModelUnavailable("gemini-2.5-flash".into())),
            Ok(FOUR_DAYS.to_string()),
        ]);
        let catalog = build_default_catalog();
        let config = Config::default();
        let cache = ModelCache::new(std::time::Duration::from_secs(600));
        cache.set("gemini-2.5-flash");

        let plan = WeekPlanner::new(&generator, &catalog, &config, &cache)
            .generate_week(&WeekRequest::new(profile(2, &["kettlebell"])))
            .await
            .unwrap();

        let models: Vec<_> = generator.requests().into_iter().map(|r| r.model).collect();
        assert_eq!(models, vec!["gemini-2.5-flash", "gemini-2.5-pro"]);
        assert_eq!(plan.model, "gemini-2.5-pro");
        assert_eq!(cache.get().as_deref(), Some("gemini-2.5-pro"));
    }

    #[tokio::test]
    async fn test_empty_week_is_schedule_validation_error() {
        let generator = ReplayGenerator::new([r#"{"monday": {"exercises": [{"sets": 3}]}}"#.to_string()]);
        let err = plan(&generator, &WeekRequest::new(profile(3, &[]))).await.unwrap_err();
        match err {
            Error::ScheduleValidation(issues) => {
                assert!(issues.iter().any(|i| i.path == "monday.exercises[0].name"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invalid_days_per_week_rejected() {
        let generator = ReplayGenerator::new([FOUR_DAYS.to_string()]);
        let err = plan(&generator, &WeekRequest::new(profile(0, &[]))).await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(generator.requests().is_empty());
    }

    #[tokio::test]
    async fn test_budget_and_progression_applied() {
        let text = r#"{"monday": {"exercises": [
            {"name": "Barbell Back Squat", "sets": 5, "reps": 5, "rest_sec": 180},
            {"name": "Bench Press", "sets": 4, "reps": 8, "rest_sec": 150},
            {"name": "Dumbbell Lateral Raise", "sets": 4, "reps": 15, "rest_sec": 60},
            {"name": "Dumbbell Biceps Curl", "sets": 4, "reps": 12, "rest_sec": 60},
            {"name": "Standing Calf Raise", "sets": 4, "reps": 20, "rest_sec": 60},
            {"name": "Plank", "sets": 3, "duration_sec": 60, "rest_sec": 60, "weight": 0}
        ]}}"#;
        let generator = ReplayGenerator::new([text.to_string()]);

        let mut profile = profile(1, &["barbell", "rack", "bench", "dumbbells"]);
        profile.duration = Some(DurationConstraint::new(30, DurationMode::Max).unwrap());

        let now = Utc::now();
        let mut request = WeekRequest::new(profile);
        request.now = now;
        request.history = vec![PerformanceLogEntry {
            exercise_id: "barbell_back_squat".into(),
            weight: Some(100.0),
            reps: Some(5),
            duration_sec: None,
            scheduled_weight: Some(100.0),
            scheduled_reps: Some(5),
            scheduled_duration_sec: None,
            performed_at: now - ChronoDuration::days(3),
        }];
        request.personal_records = vec![PersonalRecord {
            exercise_id: "bench_press".into(),
            weight: 80.0,
            reps: Some(5),
        }];

        let plan = plan(&generator, &request).await.unwrap();
        let monday = plan.week.day(Weekday::Monday).unwrap();
        let budget = &plan.budgets[&Weekday::Monday];

        assert_eq!(budget.limit_sec, 1800);
        assert!(!budget.adjustments.is_empty());
        if !budget.fits() {
            assert!(plan.issues.iter().any(|i| i.kind == PlanIssueKind::DurationBudget));
        }
        assert_eq!(&budget.schedule, monday);

        let squat = monday.exercises.iter().find(|s| s.exercise.id == "barbell_back_squat").unwrap();
        let squat_target = squat.target.as_ref().unwrap();
        // Tier 1 untouched, load progressed from history
        assert_eq!(squat_target.sets, 5);
        assert!(squat_target.weight.unwrap() > 100.0);

        let bench = monday.exercises.iter().find(|s| s.exercise.id == "bench_press").unwrap();
        assert_eq!(bench.target.as_ref().unwrap().weight, Some(60.0));

        if let Some(plank) = monday.exercises.iter().find(|s| s.exercise.id == "plank") {
            assert_eq!(plank.target.as_ref().unwrap().weight, Some(0.0));
        }
    }

    #[tokio::test]
    async fn test_day_supplement_appends_new_exercises() {
        let catalog = build_default_catalog();
        let config = Config::default();
        let cache = ModelCache::new(std::time::Duration::from_secs(600));
        let generator = ReplayGenerator::new([r#"```json
[
  {"name": "Push-up", "sets": 3, "reps": 10},
  {"name": "Plank", "sets": 3, "duration_sec": "30s"},
  {"name": "Glute Bridge", "sets": "2-3", "reps": 12}
]
```"#
            .to_string()]);

        let existing = DaySchedule::new(vec![ScheduledExercise::new(
            catalog.get("push_up").unwrap().clone(),
            crate::ExerciseTarget::reps(3, 12, 60).unwrap(),
        )]);
        let request = DayRequest {
            week: WeekRequest::new(profile(3, &[])),
            day: Weekday::Wednesday,
            existing,
            focus: Some("core".into()),
        };

        let day = WeekPlanner::new(&generator, &catalog, &config, &cache)
            .generate_day_supplement(&request)
            .await
            .unwrap();

        let ids: Vec<_> = day.schedule.exercises.iter().map(|s| s.exercise.id.as_str()).collect();
        assert_eq!(ids, vec!["push_up", "plank", "glute_bridge"]);
        assert_eq!(generator.requests()[0].shape, ResponseShape::Day);
        assert!(day.missing_targets.is_empty());
    }
}
