// Baseline reference lineups: the best-quality and best-projection rosters,
// generated outside the diversity machinery.

use crate::optimizer::groups::SlateGroups;
use crate::optimizer::lineup::{
    BASELINE_BEST_PROJECTION, BASELINE_BEST_QUALITY, GeneratedLineup,
};
use crate::optimizer::pool::PoolPlayer;
use crate::optimizer::settings::{ContestMode, OptimizationSettings};
use crate::optimizer::showdown;
use crate::optimizer::single::{LineupObjective, solve_main_slate_lineup};
use std::time::Duration;
use tracing::debug;

/// Generate the two reference lineups: best quality score (numbered -1) and
/// best projection (numbered -2). Stacking rules are switched off for these;
/// position, salary, cap, and ownership rules still apply. An infeasible
/// baseline is simply omitted.
pub fn generate_baselines(
    pool: &[PoolPlayer],
    groups: &SlateGroups,
    settings: &OptimizationSettings,
    budget: Duration,
) -> Vec<GeneratedLineup> {
    match settings.contest_mode {
        ContestMode::MainSlate => main_slate_baselines(pool, groups, settings, budget),
        ContestMode::Showdown => showdown::showdown_baselines(pool, groups, settings, budget),
    }
}

fn main_slate_baselines(
    pool: &[PoolPlayer],
    groups: &SlateGroups,
    settings: &OptimizationSettings,
    budget: Duration,
) -> Vec<GeneratedLineup> {
    let mut unstacked = settings.clone();
    unstacked.qb_stack = false;
    unstacked.bring_back = false;

    let mut baselines = Vec::with_capacity(2);
    match solve_main_slate_lineup(
        pool,
        groups,
        &unstacked,
        LineupObjective::PureQuality,
        &[],
        budget,
        BASELINE_BEST_QUALITY,
    ) {
        Some(lineup) => baselines.push(lineup),
        None => debug!("best-quality baseline unavailable"),
    }
    match solve_main_slate_lineup(
        pool,
        groups,
        &unstacked,
        LineupObjective::PureProjection,
        &[],
        budget,
        BASELINE_BEST_PROJECTION,
    ) {
        Some(lineup) => baselines.push(lineup),
        None => debug!("best-projection baseline unavailable"),
    }
    baselines
}
