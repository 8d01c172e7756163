// Configuration loading and parsing (optimizer.toml).

use crate::optimizer::settings::{ContestMode, OptimizationSettings, StrategyMode};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// optimizer.toml sections
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire optimizer.toml file.
#[derive(Debug, Clone, Deserialize)]
struct OptimizerFile {
    #[serde(default)]
    solver: SolverSection,
    #[serde(default)]
    heuristics: HeuristicsSection,
    data: DataSection,
    #[serde(default)]
    request: RequestSection,
}

/// Time budgets for the MILP backend.
#[derive(Debug, Clone, Deserialize)]
pub struct SolverSection {
    #[serde(default = "default_single_timeout")]
    pub single_timeout_secs: u64,
    #[serde(default = "default_portfolio_timeout")]
    pub portfolio_timeout_secs: u64,
}

impl SolverSection {
    pub fn single_budget(&self) -> Duration {
        Duration::from_secs(self.single_timeout_secs)
    }

    pub fn portfolio_budget(&self) -> Duration {
        Duration::from_secs(self.portfolio_timeout_secs)
    }
}

impl Default for SolverSection {
    fn default() -> Self {
        Self {
            single_timeout_secs: default_single_timeout(),
            portfolio_timeout_secs: default_portfolio_timeout(),
        }
    }
}

/// Tunable thresholds for the tournament-mode pool drop rules.
#[derive(Debug, Clone, Deserialize)]
pub struct HeuristicsSection {
    /// Players on teams implied to score below this total are dropped in
    /// tournament mode.
    #[serde(default = "default_min_implied_total")]
    pub min_implied_total: f64,
    /// Normalized ownership at or above this fraction marks a player as chalk
    /// in tournament mode (running backs exempt).
    #[serde(default = "default_chalk_cutoff")]
    pub chalk_ownership_cutoff: f64,
}

impl Default for HeuristicsSection {
    fn default() -> Self {
        Self {
            min_implied_total: default_min_implied_total(),
            chalk_ownership_cutoff: default_chalk_cutoff(),
        }
    }
}

/// Paths to the slate input CSVs.
#[derive(Debug, Clone, Deserialize)]
pub struct DataSection {
    pub players: String,
    pub schedule: String,
}

/// Default optimization request, overridable per run.
#[derive(Debug, Clone, Deserialize)]
pub struct RequestSection {
    #[serde(default = "default_num_lineups")]
    pub num_lineups: u32,
    #[serde(default = "default_strategy")]
    pub strategy: String,
    #[serde(default = "default_contest")]
    pub contest: String,
    #[serde(default = "default_team_cap")]
    pub max_players_per_team: u32,
    #[serde(default = "default_game_cap")]
    pub max_players_per_game: u32,
    #[serde(default)]
    pub exclude_bottom_percentile: f64,
    #[serde(default)]
    pub max_ownership: Option<f64>,
    #[serde(default)]
    pub locked_captain_id: Option<u64>,
    #[serde(default)]
    pub exposure_limits: HashMap<String, f64>,
    #[serde(default = "default_true")]
    pub qb_stack: bool,
    #[serde(default)]
    pub bring_back: bool,
}

impl RequestSection {
    /// Convert the raw request table into validated optimizer settings.
    pub fn to_settings(&self) -> Result<OptimizationSettings, ConfigError> {
        let strategy_mode = StrategyMode::from_str_mode(&self.strategy).ok_or_else(|| {
            ConfigError::ValidationError {
                field: "request.strategy".into(),
                message: format!(
                    "unknown strategy '{}' (expected chalk, balanced, contrarian, or tournament)",
                    self.strategy
                ),
            }
        })?;
        let contest_mode = ContestMode::from_str_mode(&self.contest).ok_or_else(|| {
            ConfigError::ValidationError {
                field: "request.contest".into(),
                message: format!(
                    "unknown contest '{}' (expected main or showdown)",
                    self.contest
                ),
            }
        })?;

        let settings = OptimizationSettings {
            num_lineups: self.num_lineups,
            strategy_mode,
            contest_mode,
            max_players_per_team: self.max_players_per_team,
            max_players_per_game: self.max_players_per_game,
            exclude_bottom_percentile: self.exclude_bottom_percentile,
            max_ownership: self.max_ownership,
            locked_captain_id: self.locked_captain_id,
            exposure_limits: self.exposure_limits.clone(),
            qb_stack: self.qb_stack,
            bring_back: self.bring_back,
        };
        settings
            .validate()
            .map_err(|e| ConfigError::ValidationError {
                field: format!("request.{}", e.field()),
                message: e.message().to_string(),
            })?;
        Ok(settings)
    }
}

impl Default for RequestSection {
    fn default() -> Self {
        Self {
            num_lineups: default_num_lineups(),
            strategy: default_strategy(),
            contest: default_contest(),
            max_players_per_team: default_team_cap(),
            max_players_per_game: default_game_cap(),
            exclude_bottom_percentile: 0.0,
            max_ownership: None,
            locked_captain_id: None,
            exposure_limits: HashMap::new(),
            qb_stack: true,
            bring_back: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Serde default helpers
// ---------------------------------------------------------------------------

fn default_single_timeout() -> u64 {
    15
}

fn default_portfolio_timeout() -> u64 {
    180
}

fn default_min_implied_total() -> f64 {
    12.0
}

fn default_chalk_cutoff() -> f64 {
    0.50
}

fn default_num_lineups() -> u32 {
    5
}

fn default_strategy() -> String {
    "balanced".into()
}

fn default_contest() -> String {
    "main".into()
}

fn default_team_cap() -> u32 {
    4
}

fn default_game_cap() -> u32 {
    6
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Top-level assembled config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct OptimizerConfig {
    pub solver: SolverSection,
    pub heuristics: HeuristicsSection,
    pub data: DataSection,
    pub request: RequestSection,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from an explicit optimizer.toml path.
pub fn load_config_from_path(path: &Path) -> Result<OptimizerConfig, ConfigError> {
    let text = read_file(path)?;
    let file: OptimizerFile = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })?;

    let config = OptimizerConfig {
        solver: file.solver,
        heuristics: file.heuristics,
        data: file.data,
        request: file.request,
    };

    validate(&config)?;

    Ok(config)
}

/// Ensure `config/optimizer.toml` exists by copying it from
/// `defaults/optimizer.toml` when missing. Returns the copied path, if any.
pub fn ensure_config_file(base_dir: &Path) -> Result<Option<PathBuf>, ConfigError> {
    let default_path = base_dir.join("defaults/optimizer.toml");
    let config_dir = base_dir.join("config");
    let target = config_dir.join("optimizer.toml");

    if target.exists() {
        return Ok(None);
    }
    if !default_path.exists() {
        return Err(ConfigError::DefaultsCopyError {
            message: format!(
                "neither {} nor defaults/optimizer.toml found in {}; \
                 run from the project root or pass a config path",
                target.display(),
                base_dir.display()
            ),
        });
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;
    std::fs::copy(&default_path, &target).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to copy {}: {e}", default_path.display()),
    })?;

    Ok(Some(target))
}

/// Convenience wrapper: ensures the default config exists under `base_dir`
/// and loads `config/optimizer.toml` from it.
pub fn load_config(base_dir: &Path) -> Result<OptimizerConfig, ConfigError> {
    ensure_config_file(base_dir)?;
    load_config_from_path(&base_dir.join("config/optimizer.toml"))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &OptimizerConfig) -> Result<(), ConfigError> {
    // Solver validations
    if config.solver.single_timeout_secs == 0 {
        return Err(ConfigError::ValidationError {
            field: "solver.single_timeout_secs".into(),
            message: "must be greater than 0".into(),
        });
    }
    if config.solver.portfolio_timeout_secs == 0 {
        return Err(ConfigError::ValidationError {
            field: "solver.portfolio_timeout_secs".into(),
            message: "must be greater than 0".into(),
        });
    }

    // Heuristics validations
    let min_total = config.heuristics.min_implied_total;
    if !min_total.is_finite() || min_total < 0.0 {
        return Err(ConfigError::ValidationError {
            field: "heuristics.min_implied_total".into(),
            message: format!("must be a finite value >= 0, got {min_total}"),
        });
    }
    let cutoff = config.heuristics.chalk_ownership_cutoff;
    if !cutoff.is_finite() || cutoff <= 0.0 || cutoff > 1.0 {
        return Err(ConfigError::ValidationError {
            field: "heuristics.chalk_ownership_cutoff".into(),
            message: format!("must be a fraction in (0.0, 1.0], got {cutoff}"),
        });
    }

    // Data validations
    if config.data.players.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "data.players".into(),
            message: "must be a non-empty path".into(),
        });
    }
    if config.data.schedule.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "data.schedule".into(),
            message: "must be a non-empty path".into(),
        });
    }

    // Request validations (string parsing plus settings-level ranges)
    config.request.to_settings()?;

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
