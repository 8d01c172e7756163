// Elite appearance targets: how often each top-ranked player must and may
// appear across a generated portfolio.

use crate::optimizer::pool::PoolPlayer;
use crate::slate::{ALL_POSITIONS, Position};

/// Ranks covered by the target tables. Players ranked past this at their
/// position carry no appearance bounds.
pub const ELITE_RANKS: usize = 15;

type TargetRow = [(u32, u32); ELITE_RANKS];

// (min, max) appearance windows per rank, rank 0 first. Rank 0 holds the
// position's top player by quality score; its window is a hard product rule
// and is never relaxed.
const QUARTERBACK_TARGETS: TargetRow = [
    (2, 7),
    (1, 5),
    (1, 4),
    (0, 3),
    (0, 3),
    (0, 2),
    (0, 2),
    (0, 2),
    (0, 2),
    (0, 2),
    (0, 1),
    (0, 1),
    (0, 1),
    (0, 1),
    (0, 1),
];

const RUNNING_BACK_TARGETS: TargetRow = [
    (3, 8),
    (2, 6),
    (2, 5),
    (1, 5),
    (1, 4),
    (1, 4),
    (0, 3),
    (0, 3),
    (0, 3),
    (0, 2),
    (0, 2),
    (0, 2),
    (0, 2),
    (0, 2),
    (0, 2),
];

const WIDE_RECEIVER_TARGETS: TargetRow = [
    (4, 8),
    (3, 5),
    (2, 5),
    (2, 4),
    (1, 4),
    (1, 4),
    (0, 3),
    (0, 3),
    (0, 3),
    (0, 2),
    (0, 2),
    (0, 2),
    (0, 2),
    (0, 2),
    (0, 2),
];

const TIGHT_END_TARGETS: TargetRow = [
    (2, 6),
    (1, 4),
    (1, 3),
    (0, 3),
    (0, 2),
    (0, 2),
    (0, 2),
    (0, 2),
    (0, 1),
    (0, 1),
    (0, 1),
    (0, 1),
    (0, 1),
    (0, 1),
    (0, 1),
];

const DEFENSE_TARGETS: TargetRow = [
    (2, 6),
    (1, 4),
    (0, 3),
    (0, 2),
    (0, 2),
    (0, 2),
    (0, 1),
    (0, 1),
    (0, 1),
    (0, 1),
    (0, 1),
    (0, 1),
    (0, 1),
    (0, 1),
    (0, 1),
];

/// Appearance windows for a position, or `None` for positions whose usage is
/// left entirely to the solver.
pub fn targets_for(position: Position) -> Option<&'static TargetRow> {
    match position {
        Position::Quarterback => Some(&QUARTERBACK_TARGETS),
        Position::RunningBack => Some(&RUNNING_BACK_TARGETS),
        Position::WideReceiver => Some(&WIDE_RECEIVER_TARGETS),
        Position::TightEnd => Some(&TIGHT_END_TARGETS),
        Position::Defense => Some(&DEFENSE_TARGETS),
        Position::Kicker => None,
    }
}

/// An appearance window bound to a concrete pool player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EliteBound {
    /// Pool index of the ranked player.
    pub player: usize,
    pub position: Position,
    /// Rank within the position, 0 = top quality score.
    pub rank: usize,
    pub min_appearances: u32,
    pub max_appearances: u32,
}

/// Rank each position's players by quality score and attach the target
/// windows, both sides clamped to the portfolio size. Returned in position
/// order, then rank order.
pub fn elite_bounds(pool: &[PoolPlayer], num_lineups: u32) -> Vec<EliteBound> {
    let mut bounds = Vec::new();
    for &position in ALL_POSITIONS {
        let Some(targets) = targets_for(position) else {
            continue;
        };
        let mut ranked: Vec<(usize, f64)> = pool
            .iter()
            .enumerate()
            .filter(|(_, p)| p.position == position)
            .map(|(idx, p)| (idx, p.quality_score))
            .collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        for (rank, &(player, _)) in ranked.iter().take(ELITE_RANKS).enumerate() {
            let (min_raw, max_raw) = targets[rank];
            bounds.push(EliteBound {
                player,
                position,
                rank,
                min_appearances: min_raw.min(num_lineups),
                max_appearances: max_raw.min(num_lineups),
            });
        }
    }
    bounds
}
