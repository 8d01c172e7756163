// Generated lineup records and portfolio output ordering.

use crate::optimizer::constraints::{CAPTAIN_MULTIPLIER, captain_effective_salary};
use crate::optimizer::pool::PoolPlayer;
use crate::slate::Position;
use serde::Serialize;

/// Lineup number reserved for the best-quality baseline.
pub const BASELINE_BEST_QUALITY: i32 = -1;
/// Lineup number reserved for the best-projection baseline.
pub const BASELINE_BEST_PROJECTION: i32 = -2;

// ---------------------------------------------------------------------------
// Slots
// ---------------------------------------------------------------------------

/// One rostered player inside a generated lineup.
#[derive(Debug, Clone, Serialize)]
pub struct LineupSlot {
    pub position: Position,
    pub key: String,
    pub name: String,
    pub team: String,
    pub salary: u32,
    pub quality_score: f64,
    pub ownership: f64,
    pub projected_points: f64,
    pub is_captain: bool,
}

impl LineupSlot {
    pub fn from_player(player: &PoolPlayer) -> Self {
        Self {
            position: player.position,
            key: player.key.clone(),
            name: player.name.clone(),
            team: player.team.clone(),
            salary: player.salary,
            quality_score: player.quality_score,
            ownership: player.ownership,
            projected_points: player.projected_points,
            is_captain: false,
        }
    }

    pub fn captain_from_player(player: &PoolPlayer) -> Self {
        let mut slot = Self::from_player(player);
        slot.is_captain = true;
        slot
    }

    /// Salary charged against the cap, with the captain premium applied.
    pub fn effective_salary(&self) -> u32 {
        if self.is_captain {
            captain_effective_salary(self.salary)
        } else {
            self.salary
        }
    }

    pub fn effective_quality(&self) -> f64 {
        if self.is_captain {
            self.quality_score * CAPTAIN_MULTIPLIER
        } else {
            self.quality_score
        }
    }

    pub fn effective_points(&self) -> f64 {
        if self.is_captain {
            self.projected_points * CAPTAIN_MULTIPLIER
        } else {
            self.projected_points
        }
    }
}

// ---------------------------------------------------------------------------
// Lineups
// ---------------------------------------------------------------------------

/// A finished lineup with its roll-up figures.
///
/// `lineup_number` is positive for requested lineups and negative for the
/// baseline references (`-1` best quality, `-2` best projection).
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedLineup {
    pub lineup_number: i32,
    pub players: Vec<LineupSlot>,
    pub total_salary: u32,
    pub projected_score: f64,
    pub projected_points: f64,
    pub avg_ownership: f64,
}

impl GeneratedLineup {
    /// Assemble a lineup from its slots, computing the roll-ups. Slots are
    /// reordered for display: captain first, then position order, then salary.
    pub fn from_slots(lineup_number: i32, mut players: Vec<LineupSlot>) -> Self {
        players.sort_by(|a, b| {
            b.is_captain
                .cmp(&a.is_captain)
                .then_with(|| a.position.sort_order().cmp(&b.position.sort_order()))
                .then_with(|| b.salary.cmp(&a.salary))
                .then_with(|| a.name.cmp(&b.name))
        });

        let total_salary = players.iter().map(|s| s.effective_salary()).sum();
        let projected_score = players.iter().map(|s| s.effective_quality()).sum();
        let projected_points = players.iter().map(|s| s.effective_points()).sum();
        let avg_ownership = if players.is_empty() {
            0.0
        } else {
            players.iter().map(|s| s.ownership).sum::<f64>() / players.len() as f64
        };

        Self {
            lineup_number,
            players,
            total_salary,
            projected_score,
            projected_points,
            avg_ownership,
        }
    }

    pub fn is_baseline(&self) -> bool {
        self.lineup_number < 0
    }

    pub fn has_player(&self, key: &str) -> bool {
        self.players.iter().any(|s| s.key == key)
    }

    pub fn captain(&self) -> Option<&LineupSlot> {
        self.players.iter().find(|s| s.is_captain)
    }
}

/// Order a finished portfolio for output: baselines first by ascending
/// lineup number (so `-2` precedes `-1`), then requested lineups by
/// descending projected score. The sort is stable, so equal-score lineups
/// keep their generation order.
pub fn order_for_output(lineups: &mut [GeneratedLineup]) {
    lineups.sort_by(|a, b| match (a.is_baseline(), b.is_baseline()) {
        (true, true) => a.lineup_number.cmp(&b.lineup_number),
        (true, false) => std::cmp::Ordering::Less,
        (false, true) => std::cmp::Ordering::Greater,
        (false, false) => b
            .projected_score
            .partial_cmp(&a.projected_score)
            .unwrap_or(std::cmp::Ordering::Equal),
    });
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
