// Optimization request settings: contest and strategy modes, caps, and flags.

use std::collections::HashMap;
use thiserror::Error;

/// Upper bound on portfolio size. Requests beyond this are rejected rather
/// than handed to the joint solver.
pub const MAX_PORTFOLIO_SIZE: u32 = 20;

// ---------------------------------------------------------------------------
// Modes
// ---------------------------------------------------------------------------

/// How aggressively the pool preparer prunes toward tournament leverage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyMode {
    Chalk,
    Balanced,
    Contrarian,
    Tournament,
}

impl StrategyMode {
    pub fn from_str_mode(s: &str) -> Option<StrategyMode> {
        match s.trim().to_lowercase().as_str() {
            "chalk" => Some(StrategyMode::Chalk),
            "balanced" => Some(StrategyMode::Balanced),
            "contrarian" => Some(StrategyMode::Contrarian),
            "tournament" | "gpp" => Some(StrategyMode::Tournament),
            _ => None,
        }
    }

    pub fn display_str(&self) -> &'static str {
        match self {
            StrategyMode::Chalk => "chalk",
            StrategyMode::Balanced => "balanced",
            StrategyMode::Contrarian => "contrarian",
            StrategyMode::Tournament => "tournament",
        }
    }
}

/// Contest structure being solved for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContestMode {
    MainSlate,
    Showdown,
}

impl ContestMode {
    pub fn from_str_mode(s: &str) -> Option<ContestMode> {
        match s.trim().to_lowercase().as_str() {
            "main" | "classic" | "main_slate" => Some(ContestMode::MainSlate),
            "showdown" | "single_game" => Some(ContestMode::Showdown),
            _ => None,
        }
    }

    pub fn display_str(&self) -> &'static str {
        match self {
            ContestMode::MainSlate => "main",
            ContestMode::Showdown => "showdown",
        }
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("invalid setting `{field}`: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
}

impl SettingsError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        SettingsError::Invalid {
            field,
            message: message.into(),
        }
    }

    pub fn field(&self) -> &'static str {
        match self {
            SettingsError::Invalid { field, .. } => field,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            SettingsError::Invalid { message, .. } => message,
        }
    }
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// One optimization request, fully resolved from config or caller input.
#[derive(Debug, Clone)]
pub struct OptimizationSettings {
    pub num_lineups: u32,
    pub strategy_mode: StrategyMode,
    pub contest_mode: ContestMode,
    pub max_players_per_team: u32,
    pub max_players_per_game: u32,
    /// Percentage of the scored pool to drop from the bottom by quality score.
    pub exclude_bottom_percentile: f64,
    /// Cap on a lineup's average projected ownership, as a fraction.
    pub max_ownership: Option<f64>,
    /// Showdown only: force this player into the captain slot.
    pub locked_captain_id: Option<u64>,
    /// Player key → maximum fraction of the portfolio the player may appear in.
    pub exposure_limits: HashMap<String, f64>,
    pub qb_stack: bool,
    pub bring_back: bool,
}

impl Default for OptimizationSettings {
    fn default() -> Self {
        Self {
            num_lineups: 1,
            strategy_mode: StrategyMode::Balanced,
            contest_mode: ContestMode::MainSlate,
            max_players_per_team: 4,
            max_players_per_game: 6,
            exclude_bottom_percentile: 0.0,
            max_ownership: None,
            locked_captain_id: None,
            exposure_limits: HashMap::new(),
            qb_stack: false,
            bring_back: false,
        }
    }
}

impl OptimizationSettings {
    /// Reject requests the engine cannot meaningfully solve. A request that
    /// passes here may still produce zero lineups (thin pool, infeasible
    /// constraints); those cases report diagnostics instead of erroring.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.num_lineups == 0 || self.num_lineups > MAX_PORTFOLIO_SIZE {
            return Err(SettingsError::new(
                "num_lineups",
                format!(
                    "must be between 1 and {}, got {}",
                    MAX_PORTFOLIO_SIZE, self.num_lineups
                ),
            ));
        }
        if self.max_players_per_team == 0 {
            return Err(SettingsError::new(
                "max_players_per_team",
                "must be greater than 0",
            ));
        }
        if self.max_players_per_game == 0 {
            return Err(SettingsError::new(
                "max_players_per_game",
                "must be greater than 0",
            ));
        }
        let pct = self.exclude_bottom_percentile;
        if !pct.is_finite() || !(0.0..=100.0).contains(&pct) {
            return Err(SettingsError::new(
                "exclude_bottom_percentile",
                format!("must be a percentage in [0, 100], got {pct}"),
            ));
        }
        if let Some(own) = self.max_ownership {
            if !own.is_finite() || own <= 0.0 || own > 1.0 {
                return Err(SettingsError::new(
                    "max_ownership",
                    format!("must be a fraction in (0.0, 1.0], got {own}"),
                ));
            }
        }
        for (key, fraction) in &self.exposure_limits {
            if !fraction.is_finite() || !(0.0..=1.0).contains(fraction) {
                return Err(SettingsError::new(
                    "exposure_limits",
                    format!("limit for '{key}' must be a fraction in [0.0, 1.0], got {fraction}"),
                ));
            }
        }
        match self.contest_mode {
            ContestMode::MainSlate => {
                if self.locked_captain_id.is_some() {
                    return Err(SettingsError::new(
                        "locked_captain_id",
                        "captains only exist in showdown contests",
                    ));
                }
            }
            ContestMode::Showdown => {
                // All six showdown players come from the same game, and at
                // least three must share a team.
                if self.max_players_per_game < 6 {
                    return Err(SettingsError::new(
                        "max_players_per_game",
                        format!(
                            "showdown lineups draw all 6 players from one game, got cap {}",
                            self.max_players_per_game
                        ),
                    ));
                }
                if self.max_players_per_team < 3 {
                    return Err(SettingsError::new(
                        "max_players_per_team",
                        format!(
                            "showdown lineups need at least 3 players from one team, got cap {}",
                            self.max_players_per_team
                        ),
                    ));
                }
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_settings() -> OptimizationSettings {
        OptimizationSettings {
            num_lineups: 5,
            strategy_mode: StrategyMode::Balanced,
            contest_mode: ContestMode::MainSlate,
            max_players_per_team: 4,
            max_players_per_game: 5,
            exclude_bottom_percentile: 10.0,
            max_ownership: Some(0.35),
            locked_captain_id: None,
            exposure_limits: HashMap::from([("Some Player:KC:WR".to_string(), 0.6)]),
            qb_stack: true,
            bring_back: false,
        }
    }

    // -- Mode parsing --

    #[test]
    fn strategy_modes_parse() {
        assert_eq!(
            StrategyMode::from_str_mode("Tournament"),
            Some(StrategyMode::Tournament)
        );
        assert_eq!(
            StrategyMode::from_str_mode("gpp"),
            Some(StrategyMode::Tournament)
        );
        assert_eq!(
            StrategyMode::from_str_mode(" chalk "),
            Some(StrategyMode::Chalk)
        );
        assert_eq!(StrategyMode::from_str_mode("cash"), None);
    }

    #[test]
    fn contest_modes_parse() {
        assert_eq!(
            ContestMode::from_str_mode("classic"),
            Some(ContestMode::MainSlate)
        );
        assert_eq!(
            ContestMode::from_str_mode("single_game"),
            Some(ContestMode::Showdown)
        );
        assert_eq!(ContestMode::from_str_mode("arcade"), None);
    }

    #[test]
    fn mode_display_roundtrip() {
        for mode in [
            StrategyMode::Chalk,
            StrategyMode::Balanced,
            StrategyMode::Contrarian,
            StrategyMode::Tournament,
        ] {
            assert_eq!(StrategyMode::from_str_mode(mode.display_str()), Some(mode));
        }
        for mode in [ContestMode::MainSlate, ContestMode::Showdown] {
            assert_eq!(ContestMode::from_str_mode(mode.display_str()), Some(mode));
        }
    }

    // -- Validation --

    #[test]
    fn valid_settings_pass() {
        valid_settings().validate().expect("should validate");
    }

    #[test]
    fn rejects_zero_lineups() {
        let mut settings = valid_settings();
        settings.num_lineups = 0;
        let err = settings.validate().unwrap_err();
        assert_eq!(err.field(), "num_lineups");
    }

    #[test]
    fn rejects_oversized_portfolio() {
        let mut settings = valid_settings();
        settings.num_lineups = MAX_PORTFOLIO_SIZE + 1;
        let err = settings.validate().unwrap_err();
        assert_eq!(err.field(), "num_lineups");
    }

    #[test]
    fn rejects_out_of_range_percentile() {
        let mut settings = valid_settings();
        settings.exclude_bottom_percentile = 120.0;
        let err = settings.validate().unwrap_err();
        assert_eq!(err.field(), "exclude_bottom_percentile");
    }

    #[test]
    fn rejects_ownership_above_one() {
        let mut settings = valid_settings();
        // 35 looks like a percentage; the contract wants a fraction.
        settings.max_ownership = Some(35.0);
        let err = settings.validate().unwrap_err();
        assert_eq!(err.field(), "max_ownership");
    }

    #[test]
    fn rejects_bad_exposure_fraction() {
        let mut settings = valid_settings();
        settings
            .exposure_limits
            .insert("Another Player:BUF:RB".to_string(), 1.5);
        let err = settings.validate().unwrap_err();
        assert_eq!(err.field(), "exposure_limits");
    }

    #[test]
    fn zero_exposure_is_allowed() {
        let mut settings = valid_settings();
        settings
            .exposure_limits
            .insert("Benched Player:NYJ:WR".to_string(), 0.0);
        settings.validate().expect("zero exposure excludes a player");
    }

    #[test]
    fn rejects_locked_captain_on_main_slate() {
        let mut settings = valid_settings();
        settings.locked_captain_id = Some(42);
        let err = settings.validate().unwrap_err();
        assert_eq!(err.field(), "locked_captain_id");
    }

    #[test]
    fn rejects_showdown_with_tight_game_cap() {
        let mut settings = valid_settings();
        settings.contest_mode = ContestMode::Showdown;
        settings.max_players_per_game = 5;
        let err = settings.validate().unwrap_err();
        assert_eq!(err.field(), "max_players_per_game");
    }

    #[test]
    fn showdown_with_roomy_caps_passes() {
        let mut settings = valid_settings();
        settings.contest_mode = ContestMode::Showdown;
        settings.max_players_per_game = 6;
        settings.max_players_per_team = 5;
        settings.locked_captain_id = Some(42);
        settings.validate().expect("should validate");
    }
}
