//! Configuration file support for Forge.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/forge/config.toml`. Every
//! lookup table the engine uses (tempo, volume, progression steps, budget
//! tolerances, recovery curve, generator models) lives here as plain data so
//! hosts can inject their own.

use crate::{Error, ExperienceLevel, MovementPattern, Result, TempoCategory, TrainingGoal};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub tempo: TempoConfig,

    #[serde(default)]
    pub volume: VolumeConfig,

    #[serde(default)]
    pub progression: ProgressionConfig,

    #[serde(default)]
    pub budget: BudgetConfig,

    #[serde(default)]
    pub recovery: RecoveryConfig,

    #[serde(default)]
    pub generator: GeneratorConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

// ============================================================================
// Tempo
// ============================================================================

/// Seconds-per-rep by tempo category plus session fatigue parameters
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TempoConfig {
    #[serde(default = "default_grind_sec")]
    pub grind_sec_per_rep: f64,

    #[serde(default = "default_standard_sec")]
    pub standard_sec_per_rep: f64,

    #[serde(default = "default_ballistic_sec")]
    pub ballistic_sec_per_rep: f64,

    #[serde(default = "default_setup_buffer")]
    pub default_setup_buffer_sec: u32,

    /// Added to the fatigue multiplier per exercise already performed
    #[serde(default = "default_fatigue_step")]
    pub fatigue_step: f64,

    #[serde(default = "default_fatigue_cap")]
    pub fatigue_cap: f64,
}

impl Default for TempoConfig {
    fn default() -> Self {
        Self {
            grind_sec_per_rep: default_grind_sec(),
            standard_sec_per_rep: default_standard_sec(),
            ballistic_sec_per_rep: default_ballistic_sec(),
            default_setup_buffer_sec: default_setup_buffer(),
            fatigue_step: default_fatigue_step(),
            fatigue_cap: default_fatigue_cap(),
        }
    }
}

impl TempoConfig {
    pub fn seconds_per_rep(&self, tempo: TempoCategory) -> f64 {
        match tempo {
            TempoCategory::Grind => self.grind_sec_per_rep,
            TempoCategory::Standard => self.standard_sec_per_rep,
            TempoCategory::Ballistic => self.ballistic_sec_per_rep,
        }
    }

    /// `1 + min(step * position, cap)`
    pub fn fatigue_multiplier(&self, position_index: usize) -> f64 {
        1.0 + (self.fatigue_step * position_index as f64).min(self.fatigue_cap)
    }
}

// ============================================================================
// Volume Table
// ============================================================================

/// One row of the experience x goal volume table
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct VolumeRow {
    pub experience: ExperienceLevel,
    pub goal: TrainingGoal,
    pub sets: u32,
    pub rep_min: u32,
    pub rep_max: u32,
    pub rest_sec: u32,
    /// Per-set hold for timed exercises
    pub hold_sec: u32,
}

impl VolumeRow {
    const fn new(
        experience: ExperienceLevel,
        goal: TrainingGoal,
        sets: u32,
        rep_min: u32,
        rep_max: u32,
        rest_sec: u32,
        hold_sec: u32,
    ) -> Self {
        Self {
            experience,
            goal,
            sets,
            rep_min,
            rep_max,
            rest_sec,
            hold_sec,
        }
    }
}

/// Experience x goal lookup table
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VolumeConfig {
    #[serde(default = "default_volume_rows")]
    pub rows: Vec<VolumeRow>,

    /// Used when no row matches the requested experience and goal
    #[serde(default = "default_volume_fallback")]
    pub fallback: VolumeRow,
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self {
            rows: default_volume_rows(),
            fallback: default_volume_fallback(),
        }
    }
}

impl VolumeConfig {
    /// Find the row for an experience level and goal.
    ///
    /// Falls back to the level's general-fitness row, then to `fallback`.
    pub fn lookup(&self, experience: ExperienceLevel, goal: TrainingGoal) -> &VolumeRow {
        self.rows
            .iter()
            .find(|r| r.experience == experience && r.goal == goal)
            .or_else(|| {
                self.rows
                    .iter()
                    .find(|r| r.experience == experience && r.goal == TrainingGoal::GeneralFitness)
            })
            .unwrap_or(&self.fallback)
    }
}

// ============================================================================
// Progression
// ============================================================================

/// Load progression parameters
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProgressionConfig {
    /// Number of most recent log entries considered
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    /// Relative change in average weight that counts as a trend
    #[serde(default = "default_trend_threshold")]
    pub trend_threshold: f64,

    #[serde(default = "default_adherence_threshold")]
    pub adherence_threshold: f64,

    /// Absolute step for light/isolation loads
    #[serde(default = "default_isolation_step")]
    pub isolation_step: f64,

    /// Fractional step for heavy compound loads
    #[serde(default = "default_compound_percent")]
    pub compound_percent: f64,

    #[serde(default = "default_compound_density")]
    pub compound_density_threshold: u8,

    #[serde(default = "default_heavy_load")]
    pub heavy_load_threshold: f64,

    /// Suggestions never exceed PR * (1 + margin)
    #[serde(default = "default_pr_margin")]
    pub pr_margin: f64,

    /// Consecutive misses that trigger a deload
    #[serde(default = "default_deload_streak")]
    pub deload_streak: u32,

    #[serde(default = "default_deload_percent")]
    pub deload_percent: f64,

    /// Smallest load change available (plate math)
    #[serde(default = "default_load_increment")]
    pub load_increment: f64,

    /// Starting fraction of the PR when there is no history
    #[serde(default = "default_pr_seed_fraction")]
    pub pr_seed_fraction: f64,
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            history_window: default_history_window(),
            trend_threshold: default_trend_threshold(),
            adherence_threshold: default_adherence_threshold(),
            isolation_step: default_isolation_step(),
            compound_percent: default_compound_percent(),
            compound_density_threshold: default_compound_density(),
            heavy_load_threshold: default_heavy_load(),
            pr_margin: default_pr_margin(),
            deload_streak: default_deload_streak(),
            deload_percent: default_deload_percent(),
            load_increment: default_load_increment(),
            pr_seed_fraction: default_pr_seed_fraction(),
        }
    }
}

// ============================================================================
// Duration Budget
// ============================================================================

/// Order in which equally low-density exercises lose sets
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Exercises later in the session are trimmed first
    #[default]
    LaterFirst,
    EarlierFirst,
    /// The exercise with the most sets is trimmed first
    MostSetsFirst,
}

/// Duration budgeting parameters
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BudgetConfig {
    #[serde(default = "default_budget_tolerance")]
    pub tolerance: f64,

    /// Density at or above which an exercise is Tier 1 and never trimmed
    #[serde(default = "default_tier1_density")]
    pub tier1_density: u8,

    #[serde(default = "default_max_sets")]
    pub max_sets_per_exercise: u32,

    /// Growth iterations allowed per exercise in `target` mode
    #[serde(default = "default_max_added_sets")]
    pub max_added_sets_per_exercise: u32,

    #[serde(default)]
    pub tie_break: TieBreak,

    #[serde(default = "default_goldilocks_min")]
    pub goldilocks_min_minutes: u32,

    #[serde(default = "default_goldilocks_max")]
    pub goldilocks_max_minutes: u32,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            tolerance: default_budget_tolerance(),
            tier1_density: default_tier1_density(),
            max_sets_per_exercise: default_max_sets(),
            max_added_sets_per_exercise: default_max_added_sets(),
            tie_break: TieBreak::default(),
            goldilocks_min_minutes: default_goldilocks_min(),
            goldilocks_max_minutes: default_goldilocks_max(),
        }
    }
}

// ============================================================================
// Recovery / Coverage
// ============================================================================

/// Recovery curve and coverage expectations
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecoveryConfig {
    /// Hours after which a muscle is modeled as fully recovered
    #[serde(default = "default_full_recovery_hours")]
    pub full_recovery_hours: f64,

    #[serde(default = "default_ready_threshold")]
    pub ready_threshold: f64,

    #[serde(default = "default_fatigued_threshold")]
    pub fatigued_threshold: f64,

    /// Sets on one muscle in a day that count as heavy stress
    #[serde(default = "default_heavy_set_threshold")]
    pub heavy_set_threshold: u32,

    /// Consecutive sessions (including today) a pattern may be absent
    /// before a rebalance is requested
    #[serde(default = "default_missing_pattern_sessions")]
    pub missing_pattern_sessions: usize,

    #[serde(default = "default_expected_patterns")]
    pub expected_patterns: Vec<MovementPattern>,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            full_recovery_hours: default_full_recovery_hours(),
            ready_threshold: default_ready_threshold(),
            fatigued_threshold: default_fatigued_threshold(),
            heavy_set_threshold: default_heavy_set_threshold(),
            missing_pattern_sessions: default_missing_pattern_sessions(),
            expected_patterns: default_expected_patterns(),
        }
    }
}

// ============================================================================
// Generator
// ============================================================================

/// External generator model selection and call limits
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GeneratorConfig {
    #[serde(default = "default_primary_model")]
    pub primary_model: String,

    #[serde(default = "default_fallback_model")]
    pub fallback_model: String,

    /// How long a last-known-good model id is trusted
    #[serde(default = "default_cache_ttl")]
    pub model_cache_ttl_secs: u64,

    #[serde(default = "default_generator_timeout")]
    pub timeout_secs: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            primary_model: default_primary_model(),
            fallback_model: default_fallback_model(),
            model_cache_ttl_secs: default_cache_ttl(),
            timeout_secs: default_generator_timeout(),
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| {
        std::env::var("HOME")
            .map(|home| PathBuf::from(home).join(".local/share"))
            .unwrap_or_else(|_| PathBuf::from("."))
    });
    base.join("forge")
}

fn default_grind_sec() -> f64 {
    5.0
}

fn default_standard_sec() -> f64 {
    3.5
}

fn default_ballistic_sec() -> f64 {
    1.5
}

fn default_setup_buffer() -> u32 {
    15
}

fn default_fatigue_step() -> f64 {
    0.05
}

fn default_fatigue_cap() -> f64 {
    0.3
}

fn default_volume_rows() -> Vec<VolumeRow> {
    use ExperienceLevel::*;
    use TrainingGoal::*;
    vec![
        VolumeRow::new(Beginner, Strength, 3, 8, 12, 180, 30),
        VolumeRow::new(Beginner, Hypertrophy, 3, 8, 12, 90, 30),
        VolumeRow::new(Beginner, Endurance, 2, 8, 12, 75, 30),
        VolumeRow::new(Beginner, GeneralFitness, 2, 8, 12, 90, 30),
        VolumeRow::new(Intermediate, Strength, 4, 5, 8, 150, 40),
        VolumeRow::new(Intermediate, Hypertrophy, 4, 6, 12, 90, 40),
        VolumeRow::new(Intermediate, Endurance, 3, 12, 20, 60, 45),
        VolumeRow::new(Intermediate, GeneralFitness, 3, 6, 12, 75, 40),
        VolumeRow::new(Advanced, Strength, 5, 3, 6, 120, 45),
        VolumeRow::new(Advanced, Hypertrophy, 5, 6, 15, 75, 45),
        VolumeRow::new(Advanced, Endurance, 4, 15, 25, 45, 60),
        VolumeRow::new(Advanced, GeneralFitness, 4, 6, 15, 60, 45),
    ]
}

fn default_volume_fallback() -> VolumeRow {
    VolumeRow::new(
        ExperienceLevel::Beginner,
        TrainingGoal::GeneralFitness,
        2,
        8,
        12,
        90,
        30,
    )
}

fn default_history_window() -> usize {
    10
}

fn default_trend_threshold() -> f64 {
    0.025
}

fn default_adherence_threshold() -> f64 {
    0.9
}

fn default_isolation_step() -> f64 {
    2.5
}

fn default_compound_percent() -> f64 {
    0.025
}

fn default_compound_density() -> u8 {
    7
}

fn default_heavy_load() -> f64 {
    40.0
}

fn default_pr_margin() -> f64 {
    0.10
}

fn default_deload_streak() -> u32 {
    2
}

fn default_deload_percent() -> f64 {
    0.10
}

fn default_load_increment() -> f64 {
    0.5
}

fn default_pr_seed_fraction() -> f64 {
    0.75
}

fn default_budget_tolerance() -> f64 {
    0.05
}

fn default_tier1_density() -> u8 {
    9
}

fn default_max_sets() -> u32 {
    6
}

fn default_max_added_sets() -> u32 {
    2
}

fn default_goldilocks_min() -> u32 {
    45
}

fn default_goldilocks_max() -> u32 {
    60
}

fn default_full_recovery_hours() -> f64 {
    72.0
}

fn default_ready_threshold() -> f64 {
    0.8
}

fn default_fatigued_threshold() -> f64 {
    0.5
}

fn default_heavy_set_threshold() -> u32 {
    3
}

fn default_missing_pattern_sessions() -> usize {
    2
}

fn default_expected_patterns() -> Vec<MovementPattern> {
    vec![
        MovementPattern::Squat,
        MovementPattern::Hinge,
        MovementPattern::Push,
        MovementPattern::Pull,
    ]
}

fn default_primary_model() -> String {
    "gemini-2.5-pro".into()
}

fn default_fallback_model() -> String {
    "gemini-2.5-flash".into()
}

fn default_cache_ttl() -> u64 {
    600
}

fn default_generator_timeout() -> u64 {
    90
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| {
            std::env::var("HOME")
                .map(|home| PathBuf::from(home).join(".config"))
                .unwrap_or_else(|_| PathBuf::from("."))
        });
        base.join("forge").join("config.toml")
    }

    /// Check the tables for values the engine cannot work with
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        for row in self.volume.rows.iter().chain(std::iter::once(&self.volume.fallback)) {
            if row.sets == 0 {
                errors.push(format!("{:?}/{:?}: sets must be >= 1", row.experience, row.goal));
            }
            if row.rep_min == 0 || row.rep_min > row.rep_max {
                errors.push(format!(
                    "{:?}/{:?}: rep band {}-{} is invalid",
                    row.experience, row.goal, row.rep_min, row.rep_max
                ));
            }
            if row.hold_sec == 0 {
                errors.push(format!("{:?}/{:?}: hold_sec must be > 0", row.experience, row.goal));
            }
        }

        let tempo = &self.tempo;
        if [
            tempo.grind_sec_per_rep,
            tempo.standard_sec_per_rep,
            tempo.ballistic_sec_per_rep,
        ]
        .iter()
        .any(|s| !s.is_finite() || *s <= 0.0)
        {
            errors.push("tempo seconds-per-rep values must be positive".into());
        }

        let recovery = &self.recovery;
        if recovery.full_recovery_hours <= 0.0 {
            errors.push("recovery.full_recovery_hours must be positive".into());
        }
        if recovery.fatigued_threshold > recovery.ready_threshold {
            errors.push("recovery.fatigued_threshold must not exceed ready_threshold".into());
        }
        if recovery.missing_pattern_sessions == 0 {
            errors.push("recovery.missing_pattern_sessions must be >= 1".into());
        }

        if self.budget.goldilocks_min_minutes == 0
            || self.budget.goldilocks_min_minutes > self.budget.goldilocks_max_minutes
        {
            errors.push("budget goldilocks range is invalid".into());
        }
        if !(0.0..1.0).contains(&self.budget.tolerance) {
            errors.push("budget.tolerance must be in [0, 1)".into());
        }

        if self.progression.history_window == 0 {
            errors.push("progression.history_window must be >= 1".into());
        }
        if self.progression.load_increment <= 0.0 {
            errors.push("progression.load_increment must be positive".into());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::Config(errors.join("; ")))
        }
    }
}
