// Player pool preparation: drop rules, ownership normalization, and the
// bottom-percentile filter.

use crate::config::HeuristicsSection;
use crate::optimizer::settings::StrategyMode;
use crate::slate::{Position, ScoredPlayer, ALL_POSITIONS};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info, warn};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// A player that survived pool preparation. Every numeric field the solver
/// touches is guaranteed present and positive where the drop rules demand it.
#[derive(Debug, Clone)]
pub struct PoolPlayer {
    pub player_id: u64,
    pub key: String,
    pub name: String,
    pub team: String,
    pub position: Position,
    pub salary: u32,
    pub quality_score: f64,
    /// Normalized to a fraction in [0, 1].
    pub ownership: f64,
    pub projected_points: f64,
    pub implied_team_total: Option<f64>,
    pub snap_share_delta: Option<f64>,
}

/// Why players were removed during pool preparation, by rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DropCounts {
    pub no_quality: usize,
    pub no_projection: usize,
    pub bad_salary: usize,
    pub low_team_total: usize,
    pub chalk: usize,
}

impl DropCounts {
    pub fn total(&self) -> usize {
        self.no_quality + self.no_projection + self.bad_salary + self.low_team_total + self.chalk
    }
}

// ---------------------------------------------------------------------------
// Ownership normalization
// ---------------------------------------------------------------------------

/// Normalize a raw ownership figure to a fraction. Upstream feeds disagree on
/// units: anything above 1.0 is read as a percentage and divided by 100.
pub fn normalize_ownership(raw: f64) -> f64 {
    if raw > 1.0 {
        raw / 100.0
    } else {
        raw.max(0.0)
    }
}

// ---------------------------------------------------------------------------
// Bottom-percentile filter
// ---------------------------------------------------------------------------

/// Remove the bottom `percentile` percent of players by quality score.
///
/// Only players that carry a quality score participate in the ranking;
/// unscored players pass through untouched (the preparer drops them later).
/// The exclusion count is `floor(scored_count * percentile / 100)`. When that
/// count would empty the scored pool the filter fails open and keeps every
/// player. Input order is preserved.
pub fn percentile_filter(players: &[ScoredPlayer], percentile: f64) -> Vec<ScoredPlayer> {
    if percentile <= 0.0 {
        return players.to_vec();
    }

    let mut scored: Vec<(usize, f64)> = players
        .iter()
        .enumerate()
        .filter_map(|(i, p)| p.quality_score.map(|q| (i, q)))
        .collect();
    let scored_count = scored.len();
    let exclude_count = (scored_count as f64 * percentile / 100.0).floor() as usize;

    if exclude_count == 0 {
        return players.to_vec();
    }
    if exclude_count >= scored_count {
        warn!(
            "percentile filter at {}% would remove all {} scored players, keeping the full pool",
            percentile, scored_count
        );
        return players.to_vec();
    }

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    let dropped: HashSet<usize> = scored[scored_count - exclude_count..]
        .iter()
        .map(|(i, _)| *i)
        .collect();

    debug!(
        "percentile filter removed {} of {} scored players",
        exclude_count, scored_count
    );
    players
        .iter()
        .enumerate()
        .filter(|(i, _)| !dropped.contains(i))
        .map(|(_, p)| p.clone())
        .collect()
}

// ---------------------------------------------------------------------------
// Pool preparation
// ---------------------------------------------------------------------------

/// Apply the drop rules to the scored players and produce the solver pool.
///
/// Rules, in order:
/// 1. Drop players with a missing or non-positive quality score.
/// 2. Drop players with missing or non-positive projected points.
/// 3. Drop players with a missing or zero salary.
/// 4. Tournament mode only:
///    a. Drop players whose implied team total sits below the configured
///       minimum (players without the figure are kept).
///    b. Drop chalk: normalized ownership at or above the configured cutoff,
///       unless the player is a running back.
pub fn prepare_pool(
    players: &[ScoredPlayer],
    strategy: StrategyMode,
    heuristics: &HeuristicsSection,
) -> (Vec<PoolPlayer>, DropCounts) {
    let mut pool = Vec::with_capacity(players.len());
    let mut drops = DropCounts::default();

    for player in players {
        let Some(quality_score) = player.quality_score.filter(|q| *q > 0.0) else {
            drops.no_quality += 1;
            debug!("dropping '{}': no usable quality score", player.name);
            continue;
        };
        let Some(projected_points) = player.projected_points.filter(|p| *p > 0.0) else {
            drops.no_projection += 1;
            debug!("dropping '{}': no usable projection", player.name);
            continue;
        };
        let Some(salary) = player.salary.filter(|s| *s > 0) else {
            drops.bad_salary += 1;
            debug!("dropping '{}': missing or zero salary", player.name);
            continue;
        };

        let ownership = normalize_ownership(player.ownership);

        match strategy {
            StrategyMode::Tournament => {
                if let Some(total) = player.implied_team_total {
                    if total < heuristics.min_implied_total {
                        drops.low_team_total += 1;
                        debug!(
                            "dropping '{}': implied team total {:.1} below {:.1}",
                            player.name, total, heuristics.min_implied_total
                        );
                        continue;
                    }
                }
                if ownership >= heuristics.chalk_ownership_cutoff
                    && player.position != Position::RunningBack
                {
                    drops.chalk += 1;
                    debug!(
                        "dropping '{}': chalk at {:.0}% ownership",
                        player.name,
                        ownership * 100.0
                    );
                    continue;
                }
            }
            StrategyMode::Chalk | StrategyMode::Balanced | StrategyMode::Contrarian => {}
        }

        pool.push(PoolPlayer {
            player_id: player.player_id,
            key: player.key.clone(),
            name: player.name.clone(),
            team: player.team.clone(),
            position: player.position,
            salary,
            quality_score,
            ownership,
            projected_points,
            implied_team_total: player.implied_team_total,
            snap_share_delta: player.snap_share_delta,
        });
    }

    if drops.total() > 0 {
        info!(
            "pool prepared: {} kept, {} dropped (quality {}, projection {}, salary {}, team total {}, chalk {})",
            pool.len(),
            drops.total(),
            drops.no_quality,
            drops.no_projection,
            drops.bad_salary,
            drops.low_team_total,
            drops.chalk
        );
    }

    (pool, drops)
}

/// Count pool players per position. Every recognized position appears in the
/// map so diagnostics show explicit zeros.
pub fn position_counts(pool: &[PoolPlayer]) -> BTreeMap<Position, usize> {
    let mut counts: BTreeMap<Position, usize> =
        ALL_POSITIONS.iter().map(|p| (*p, 0)).collect();
    for player in pool {
        *counts.entry(player.position).or_insert(0) += 1;
    }
    counts
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
