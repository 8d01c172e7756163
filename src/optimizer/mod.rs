// Lineup optimization engine: pool preparation, constraint building, MILP
// solving, and portfolio assembly.

pub mod baselines;
pub mod constraints;
pub mod elite;
pub mod groups;
pub mod lineup;
pub mod pool;
pub mod portfolio;
pub mod settings;
pub mod showdown;
pub mod single;
pub mod solver;
pub mod validate;

use crate::config::{HeuristicsSection, SolverSection};
use crate::slate::{OpponentMap, Position, ScoredPlayer};
use lineup::{GeneratedLineup, order_for_output};
use pool::DropCounts;
use settings::{ContestMode, OptimizationSettings, SettingsError};
use showdown::CaptainCache;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Everything one optimization request produces: the ordered lineups plus the
/// diagnostics a caller needs to explain an empty or degraded result.
#[derive(Debug)]
pub struct OptimizationReport {
    /// Baselines first (ascending lineup number, so -2 before -1), then the
    /// requested lineups by descending projected score.
    pub lineups: Vec<GeneratedLineup>,
    /// Prepared-pool size per position, including explicit zeros.
    pub position_counts: BTreeMap<Position, usize>,
    /// Prepared-pool size after filtering and drop rules.
    pub pool_size: usize,
    /// Players removed during preparation, by rule.
    pub drops: DropCounts,
    /// Elite ranks whose appearance windows had to be lifted (main slate).
    pub relaxed_ranks: Vec<usize>,
    /// True when the joint portfolio model gave way to one-at-a-time solving.
    pub used_fallback: bool,
    /// Human-readable explanation when no requested lineup was produced.
    pub reason: Option<String>,
}

impl OptimizationReport {
    /// The requested (non-baseline) lineups.
    pub fn requested(&self) -> impl Iterator<Item = &GeneratedLineup> {
        self.lineups.iter().filter(|l| !l.is_baseline())
    }

    pub fn baselines(&self) -> impl Iterator<Item = &GeneratedLineup> {
        self.lineups.iter().filter(|l| l.is_baseline())
    }
}

/// Run one full optimization request.
///
/// Pipeline: percentile filter → pool preparation → sufficiency gate →
/// grouping → baselines → portfolio (main slate) or captain rotation
/// (showdown) → output ordering.
///
/// Expected optimization failures (thin pool, infeasible constraints,
/// unsolvable locked captain) come back as an `Ok` report with an empty
/// requested-lineup list and a reason; only a malformed settings contract is
/// an `Err`.
pub fn optimize(
    players: &[ScoredPlayer],
    opponents: &OpponentMap,
    settings: &OptimizationSettings,
    heuristics: &HeuristicsSection,
    budgets: &SolverSection,
) -> Result<OptimizationReport, SettingsError> {
    settings.validate()?;

    let filtered = pool::percentile_filter(players, settings.exclude_bottom_percentile);
    let (prepared, drops) = pool::prepare_pool(&filtered, settings.strategy_mode, heuristics);
    let position_counts = pool::position_counts(&prepared);

    if let Some(reason) = pool_shortfall(&position_counts, prepared.len(), settings.contest_mode) {
        warn!("pool cannot fill the contest shape: {}", reason);
        return Ok(OptimizationReport {
            lineups: Vec::new(),
            position_counts,
            pool_size: prepared.len(),
            drops,
            relaxed_ranks: Vec::new(),
            used_fallback: false,
            reason: Some(reason),
        });
    }

    let groups = groups::build_groups(&prepared, opponents);
    let mut lineups =
        baselines::generate_baselines(&prepared, &groups, settings, budgets.single_budget());

    let (requested, relaxed_ranks, used_fallback, reason) = match settings.contest_mode {
        ContestMode::MainSlate => {
            let outcome = portfolio::solve_portfolio(
                &prepared,
                &groups,
                settings,
                budgets.portfolio_budget(),
                budgets.single_budget(),
            );
            (
                outcome.lineups,
                outcome.relaxed_ranks,
                outcome.used_fallback,
                outcome.reason,
            )
        }
        ContestMode::Showdown => {
            let mut cache = CaptainCache::new();
            let (lineups, reason) = showdown::generate_showdown(
                &prepared,
                &groups,
                settings,
                &mut cache,
                budgets.single_budget(),
            );
            (lineups, Vec::new(), false, reason)
        }
    };

    info!(
        "optimization produced {} of {} requested lineups ({} baselines)",
        requested.len(),
        settings.num_lineups,
        lineups.len()
    );

    lineups.extend(requested);
    order_for_output(&mut lineups);

    Ok(OptimizationReport {
        lineups,
        position_counts,
        pool_size: prepared.len(),
        drops,
        relaxed_ranks,
        used_fallback,
        reason,
    })
}

/// Pre-solve sufficiency gate: can the prepared pool fill the contest shape
/// at all? Returns a reason naming the short position when it cannot.
fn pool_shortfall(
    counts: &BTreeMap<Position, usize>,
    pool_size: usize,
    contest: ContestMode,
) -> Option<String> {
    let count = |position: Position| counts.get(&position).copied().unwrap_or(0);
    match contest {
        ContestMode::MainSlate => {
            let required: [(Position, usize); 5] = [
                (Position::Quarterback, 1),
                (Position::RunningBack, 2),
                (Position::WideReceiver, 3),
                (Position::TightEnd, 1),
                (Position::Defense, 1),
            ];
            for (position, minimum) in required {
                let available = count(position);
                if available < minimum {
                    return Some(format!(
                        "need at least {minimum} {position} players, pool has {available}"
                    ));
                }
            }
            let flex_pool = count(Position::RunningBack)
                + count(Position::WideReceiver)
                + count(Position::TightEnd);
            if flex_pool < constraints::MAIN_SLATE_FLEX_TOTAL {
                return Some(format!(
                    "need {} flex-eligible players, pool has {}",
                    constraints::MAIN_SLATE_FLEX_TOTAL,
                    flex_pool
                ));
            }
            if pool_size < constraints::MAIN_SLATE_SIZE {
                return Some(format!(
                    "need {} players for a main-slate lineup, pool has {}",
                    constraints::MAIN_SLATE_SIZE,
                    pool_size
                ));
            }
            None
        }
        ContestMode::Showdown => {
            if pool_size < constraints::SHOWDOWN_SIZE {
                Some(format!(
                    "need {} players for a showdown lineup, pool has {}",
                    constraints::SHOWDOWN_SIZE,
                    pool_size
                ))
            } else {
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
