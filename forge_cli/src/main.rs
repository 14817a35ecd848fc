use chrono::Datelike;
use clap::{Parser, Subcommand};
use forge_core::coverage::check_week_rebalance;
use forge_core::estimator::estimate_slot;
use forge_core::generator::ReplayGenerator;
use forge_core::history::{derive_personal_records, recent_for, recent_sessions, record_for};
use forge_core::progression::ProgressionRationale;
use forge_core::*;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "forge")]
#[command(about = "Workout prescription and adaptive scheduling engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to the standard config path)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Estimate how long one prescribed exercise takes
    Estimate {
        /// Exercise id or name
        exercise: String,

        #[arg(long, default_value_t = 3)]
        sets: u32,

        #[arg(long, conflicts_with = "duration")]
        reps: Option<u32>,

        /// Seconds per set for timed work
        #[arg(long)]
        duration: Option<u32>,

        /// Rest between sets in seconds
        #[arg(long, default_value_t = 90)]
        rest: u32,

        /// Zero-based position in the session
        #[arg(long, default_value_t = 0)]
        position: usize,
    },

    /// Prescribe sets, reps and load for an exercise
    Prescribe {
        /// Exercise id or name
        exercise: String,

        #[arg(long, default_value = "beginner")]
        experience: String,

        #[arg(long, default_value = "general_fitness")]
        goal: String,

        #[arg(long)]
        sets: Option<u32>,

        #[arg(long)]
        reps: Option<u32>,

        #[arg(long)]
        duration: Option<u32>,

        #[arg(long)]
        weight: Option<f64>,

        /// Performance log CSV (defaults to <data-dir>/history.csv)
        #[arg(long)]
        history: Option<PathBuf>,
    },

    /// Build a week plan from a saved generator response
    Generate {
        /// User profile JSON
        #[arg(long)]
        profile: PathBuf,

        /// Raw generator response to replay
        #[arg(long)]
        response: PathBuf,

        /// Performance log CSV (defaults to <data-dir>/history.csv)
        #[arg(long)]
        history: Option<PathBuf>,

        /// Plan store file (defaults to <data-dir>/plans.json)
        #[arg(long)]
        out: Option<PathBuf>,

        /// Print the plan without activating it
        #[arg(long)]
        dry_run: bool,

        /// Print the full plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// Analyze coverage and recovery for the active plan
    Coverage {
        /// Plan store file (defaults to <data-dir>/plans.json)
        #[arg(long)]
        plan: Option<PathBuf>,

        /// Performance log CSV (defaults to <data-dir>/history.csv)
        #[arg(long)]
        history: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    forge_core::logging::init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());

    match cli.command {
        Commands::Estimate {
            exercise,
            sets,
            reps,
            duration,
            rest,
            position,
        } => cmd_estimate(&config, &exercise, sets, reps, duration, rest, position),
        Commands::Prescribe {
            exercise,
            experience,
            goal,
            sets,
            reps,
            duration,
            weight,
            history,
        } => {
            let ctx = TargetSelectionContext {
                experience: ExperienceLevel::from_tag(&experience),
                goal: TrainingGoal::from_tag(&goal),
                overrides: SlotOverrides {
                    sets,
                    reps,
                    duration_sec: duration,
                    weight,
                    rest_time_sec: None,
                },
                history_count: 0,
            };
            let history_path = history.unwrap_or_else(|| data_dir.join("history.csv"));
            cmd_prescribe(&config, &exercise, ctx, &history_path)
        }
        Commands::Generate {
            profile,
            response,
            history,
            out,
            dry_run,
            json,
        } => {
            let history_path = history.unwrap_or_else(|| data_dir.join("history.csv"));
            let store = match out {
                Some(path) => JsonPlanStore::new(path),
                None => JsonPlanStore::in_dir(&data_dir),
            };
            cmd_generate(&config, &profile, &response, &history_path, store, dry_run, json)
        }
        Commands::Coverage { plan, history } => {
            let history_path = history.unwrap_or_else(|| data_dir.join("history.csv"));
            let store = match plan {
                Some(path) => JsonPlanStore::new(path),
                None => JsonPlanStore::in_dir(&data_dir),
            };
            cmd_coverage(&config, &store, &history_path)
        }
    }
}

fn load_catalog() -> Result<&'static ExerciseCatalog> {
    let catalog = get_default_catalog();
    let errors = catalog.validate();
    if !errors.is_empty() {
        eprintln!("Catalog validation errors:");
        for error in errors {
            eprintln!("  - {}", error);
        }
        return Err(Error::CatalogValidation("Invalid catalog".into()));
    }
    Ok(catalog)
}

fn resolve<'a>(catalog: &'a ExerciseCatalog, name: &str) -> Result<&'a Exercise> {
    catalog.resolve(name).ok_or_else(|| Error::MissingPrescription {
        exercise_id: name.to_string(),
    })
}

fn format_minutes(seconds: u32) -> String {
    format!("{}m {:02}s", seconds / 60, seconds % 60)
}

fn format_target(target: &ExerciseTarget) -> String {
    let work = match (target.reps, target.duration_sec) {
        (Some(reps), _) => format!("{} x {} reps", target.sets, reps),
        (None, Some(sec)) => format!("{} x {}s", target.sets, sec),
        (None, None) => format!("{} sets", target.sets),
    };
    let load = match target.weight {
        Some(w) if w > 0.0 => format!(" @ {:.1}kg", w),
        Some(_) => " @ bodyweight".to_string(),
        None => String::new(),
    };
    format!("{}{}, rest {}s", work, load, target.rest_time_sec)
}

fn cmd_estimate(
    config: &Config,
    name: &str,
    sets: u32,
    reps: Option<u32>,
    duration: Option<u32>,
    rest: u32,
    position: usize,
) -> Result<()> {
    let catalog = load_catalog()?;
    let exercise = resolve(catalog, name)?;

    let target = match (reps, duration) {
        (Some(reps), _) => ExerciseTarget::reps(sets, reps, rest)?,
        (None, Some(duration)) => ExerciseTarget::duration(sets, duration, rest)?,
        (None, None) if exercise.is_timed => ExerciseTarget::duration(sets, 30, rest)?,
        (None, None) => ExerciseTarget::reps(sets, 10, rest)?,
    };

    let estimate = estimate_duration(
        &EstimateInput::for_target(exercise, &target, position),
        &config.tempo,
    );
    let total = estimate_slot(exercise, &target, position, &config.tempo);

    println!("{} ({})", exercise.name, exercise.id);
    println!("  Target:    {}", format_target(&target));
    if let Some(per_rep) = estimate.estimated_time_per_rep_sec {
        println!("  Per rep:   {:.1}s", per_rep);
    }
    println!("  Work:      {}s", estimate.estimated_duration_sec);
    println!("  Total:     {}s ({})", total, format_minutes(total));
    Ok(())
}

fn cmd_prescribe(
    config: &Config,
    name: &str,
    mut ctx: TargetSelectionContext,
    history_path: &Path,
) -> Result<()> {
    let catalog = load_catalog()?;
    let exercise = resolve(catalog, name)?;

    let entries = history::load_history(history_path)?;
    let records = derive_personal_records(&entries);
    let recent = recent_for(&entries, &exercise.id, config.progression.history_window);
    let pr = record_for(&records, &exercise.id);
    ctx.history_count = recent.len();

    let selector = TargetSelector::new(catalog, config);
    let mut target = selector.base_for(exercise, &ctx)?;
    let suggestion = selector.fill_weight(exercise, &mut target, &recent, pr);

    println!("{} ({})", exercise.name, exercise.id);
    println!("  Target:    {}", format_target(&target));
    if let Some(pr) = pr {
        println!("  PR:        {:.1}kg", pr.weight);
    }
    let rationale = match suggestion.map(|s| s.rationale) {
        Some(ProgressionRationale::Increase) => "increase after a completed session",
        Some(ProgressionRationale::Hold) => "hold",
        Some(ProgressionRationale::Deload) => "deload after repeated misses",
        Some(ProgressionRationale::NoData) => "no history; choose a starting load",
        None => "load set explicitly",
    };
    println!("  Load:      {}", rationale);
    println!(
        "  Estimated: {}",
        format_minutes(estimate_slot(exercise, &target, 0, &config.tempo))
    );
    Ok(())
}

fn cmd_generate(
    config: &Config,
    profile_path: &Path,
    response_path: &Path,
    history_path: &Path,
    mut store: JsonPlanStore,
    dry_run: bool,
    json: bool,
) -> Result<()> {
    let catalog = load_catalog()?;
    let profile: UserProfile = serde_json::from_str(&std::fs::read_to_string(profile_path)?)?;

    let mut request = WeekRequest::new(profile);
    request.history = history::load_history(history_path)?;
    request.previous_week = store.load_active()?.map(|plan| plan.week);

    let generator = ReplayGenerator::from_file(response_path)?;
    let cache = ModelCache::new(Duration::from_secs(config.generator.model_cache_ttl_secs));
    let planner = WeekPlanner::new(&generator, catalog, config, &cache);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let plan = runtime
        .block_on(planner.generate_week(&request))
        .map_err(|e| {
            eprintln!("{}", e.user_message());
            e
        })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        display_plan(&plan);
    }

    if dry_run {
        println!("\n[Dry run - plan not activated]");
        return Ok(());
    }

    match store.replace_active(&plan)? {
        Some(previous) => println!("\nActivated plan {} (replaced {})", plan.plan_id, previous),
        None => println!("\nActivated plan {}", plan.plan_id),
    }
    Ok(())
}

fn display_plan(plan: &GeneratedWeek) {
    println!("Week plan {} ({})", plan.plan_id, plan.model);
    println!("{}", "=".repeat(60));

    for (day, schedule) in &plan.week.days {
        if schedule.is_empty() {
            println!("\n{}: rest", day);
            continue;
        }
        let total = plan.budgets.get(day).map(|b| b.total_sec).unwrap_or(0);
        println!("\n{} ({})", day, format_minutes(total));
        for slot in &schedule.exercises {
            match &slot.target {
                Some(target) => println!("  - {}: {}", slot.exercise.name, format_target(target)),
                None => println!("  - {}: (no target)", slot.exercise.name),
            }
        }
    }

    if !plan.issues.is_empty() {
        println!("\nNotes:");
        for issue in &plan.issues {
            match issue.day {
                Some(day) => println!("  - {}: {}", day, issue.message),
                None => println!("  - {}", issue.message),
            }
        }
    }

    display_coverage(&plan.coverage);
}

fn display_coverage(coverage: &CoverageAnalysis) {
    let join = |items: Vec<String>| {
        if items.is_empty() {
            "-".to_string()
        } else {
            items.join(", ")
        }
    };

    println!("\nCoverage:");
    println!(
        "  Patterns:  {}",
        join(coverage.covered_movement_patterns.iter().map(|p| p.to_string()).collect())
    );
    println!(
        "  Missing:   {}",
        join(coverage.missing_movement_patterns.iter().map(|p| p.to_string()).collect())
    );
    println!(
        "  Fatigued:  {}",
        join(coverage.recovery_fatigued_muscles.iter().map(|m| m.to_string()).collect())
    );
    for recommendation in &coverage.recommendations {
        println!("  * {}", recommendation);
    }
}

/// Logged days that feed recovery and recent sessions
const RECENT_HISTORY_DAYS: i64 = 14;

fn cmd_coverage(config: &Config, store: &JsonPlanStore, history_path: &Path) -> Result<()> {
    let catalog = load_catalog()?;
    let Some(plan) = store.load_active()? else {
        println!("No active plan in {:?}", store.path());
        return Ok(());
    };

    let now = chrono::Utc::now();
    let entries = history::load_recent_history(history_path, RECENT_HISTORY_DAYS, now)?;
    let recovery = RecoveryState::from_log(&entries, catalog);

    let coverage = analyze_week(&plan.week, &recovery, now, &config.recovery);
    println!("Active plan {}", plan.plan_id);
    display_coverage(&coverage);

    // The plan covers the coming Monday through Sunday
    let days_to_monday = (7 - now.weekday().num_days_from_monday()) % 7;
    let week_start = now + chrono::Duration::days(i64::from(days_to_monday));
    let sessions = recent_sessions(&entries, catalog, config.recovery.missing_pattern_sessions);
    let rebalance = check_week_rebalance(&plan.week, &sessions, &recovery, week_start, &config.recovery);
    let flagged: Vec<_> = rebalance.iter().filter(|(_, r)| r.needs_rebalance).collect();
    if flagged.is_empty() {
        println!("\nNo rebalance needed");
    } else {
        println!("\nRebalance suggested:");
        for (day, result) in flagged {
            for reason in &result.reasons {
                println!("  - {}: {}", day, reason);
            }
        }
    }
    Ok(())
}
