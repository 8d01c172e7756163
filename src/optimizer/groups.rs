// Pool indexers: position, team, and game groupings for constraint building.

use crate::optimizer::pool::PoolPlayer;
use crate::slate::{OpponentMap, Position};
use std::collections::HashMap;
use tracing::debug;

/// Index lookups over a prepared pool. Values are indices into the pool slice
/// the groups were built from.
#[derive(Debug, Clone)]
pub struct SlateGroups {
    pub by_position: HashMap<Position, Vec<usize>>,
    pub by_team: HashMap<String, Vec<usize>>,
    pub by_game: HashMap<String, Vec<usize>>,
    /// Team → opponent, carried along for stack pairing.
    pub opponent_of: OpponentMap,
}

impl SlateGroups {
    /// Pool indices at a position; empty when the position is unrepresented.
    pub fn position(&self, position: Position) -> &[usize] {
        self.by_position
            .get(&position)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Team groups in deterministic (alphabetical) order so constraint
    /// emission is stable run to run.
    pub fn teams(&self) -> Vec<(&String, &[usize])> {
        let mut entries: Vec<(&String, &[usize])> = self
            .by_team
            .iter()
            .map(|(team, members)| (team, members.as_slice()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }

    /// Game groups in deterministic (alphabetical) order.
    pub fn games(&self) -> Vec<(&String, &[usize])> {
        let mut entries: Vec<(&String, &[usize])> = self
            .by_game
            .iter()
            .map(|(game, members)| (game, members.as_slice()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }
}

/// Canonical key for a matchup: the two team codes in alphabetical order.
pub fn game_key(team: &str, opponent: &str) -> String {
    if team <= opponent {
        format!("{}@{}", team, opponent)
    } else {
        format!("{}@{}", opponent, team)
    }
}

/// Build the position, team, and game indexes for a prepared pool.
///
/// Players whose team is missing from the schedule stay out of the game
/// index (no game constraint can apply to them) but keep their position and
/// team entries.
pub fn build_groups(pool: &[PoolPlayer], opponents: &OpponentMap) -> SlateGroups {
    let mut by_position: HashMap<Position, Vec<usize>> = HashMap::new();
    let mut by_team: HashMap<String, Vec<usize>> = HashMap::new();
    let mut by_game: HashMap<String, Vec<usize>> = HashMap::new();
    let mut unscheduled = 0usize;

    for (i, player) in pool.iter().enumerate() {
        by_position.entry(player.position).or_default().push(i);
        by_team.entry(player.team.clone()).or_default().push(i);
        match opponents.get(&player.team) {
            Some(opponent) => {
                by_game
                    .entry(game_key(&player.team, opponent))
                    .or_default()
                    .push(i);
            }
            None => unscheduled += 1,
        }
    }

    if unscheduled > 0 {
        debug!(
            "{} pool players have no schedule entry and skip game constraints",
            unscheduled
        );
    }

    SlateGroups {
        by_position,
        by_team,
        by_game,
        opponent_of: opponents.clone(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
