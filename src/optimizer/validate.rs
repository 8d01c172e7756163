// Post-solve sanity checks applied to every lineup before it is surfaced.

use crate::optimizer::constraints::{
    MAIN_SLATE_FLEX_TOTAL, MAIN_SLATE_SIZE, SALARY_CAP, SHOWDOWN_SIZE,
};
use crate::optimizer::lineup::GeneratedLineup;
use crate::optimizer::settings::ContestMode;
use crate::slate::Position;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LineupFlaw {
    #[error("expected {expected} players, found {found}")]
    WrongSize { expected: usize, found: usize },
    #[error("total salary {salary} exceeds the {cap} cap")]
    OverCap { salary: u32, cap: u32 },
    #[error("{position} count {found} violates the {rule} rule")]
    PositionRule {
        position: Position,
        found: usize,
        rule: &'static str,
    },
    #[error("flex-eligible positions fill {found} slots, expected {expected}")]
    FlexTotal { found: usize, expected: usize },
    #[error("expected exactly one captain, found {found}")]
    CaptainCount { found: usize },
}

/// Checks run in a fixed order: count, salary, then composition.
pub fn check(lineup: &GeneratedLineup, contest: ContestMode) -> Result<(), LineupFlaw> {
    match contest {
        ContestMode::MainSlate => check_main_slate(lineup),
        ContestMode::Showdown => check_showdown(lineup),
    }
}

fn check_main_slate(lineup: &GeneratedLineup) -> Result<(), LineupFlaw> {
    if lineup.players.len() != MAIN_SLATE_SIZE {
        return Err(LineupFlaw::WrongSize {
            expected: MAIN_SLATE_SIZE,
            found: lineup.players.len(),
        });
    }
    if lineup.total_salary > SALARY_CAP {
        return Err(LineupFlaw::OverCap {
            salary: lineup.total_salary,
            cap: SALARY_CAP,
        });
    }

    let count =
        |position: Position| lineup.players.iter().filter(|s| s.position == position).count();
    let quarterbacks = count(Position::Quarterback);
    if quarterbacks != 1 {
        return Err(LineupFlaw::PositionRule {
            position: Position::Quarterback,
            found: quarterbacks,
            rule: "exactly 1",
        });
    }
    let running_backs = count(Position::RunningBack);
    if running_backs < 2 {
        return Err(LineupFlaw::PositionRule {
            position: Position::RunningBack,
            found: running_backs,
            rule: "at least 2",
        });
    }
    let receivers = count(Position::WideReceiver);
    if receivers < 3 {
        return Err(LineupFlaw::PositionRule {
            position: Position::WideReceiver,
            found: receivers,
            rule: "at least 3",
        });
    }
    let tight_ends = count(Position::TightEnd);
    if tight_ends < 1 {
        return Err(LineupFlaw::PositionRule {
            position: Position::TightEnd,
            found: tight_ends,
            rule: "at least 1",
        });
    }
    let flex_total = running_backs + receivers + tight_ends;
    if flex_total != MAIN_SLATE_FLEX_TOTAL {
        return Err(LineupFlaw::FlexTotal {
            found: flex_total,
            expected: MAIN_SLATE_FLEX_TOTAL,
        });
    }
    let defenses = count(Position::Defense);
    if defenses != 1 {
        return Err(LineupFlaw::PositionRule {
            position: Position::Defense,
            found: defenses,
            rule: "exactly 1",
        });
    }
    Ok(())
}

fn check_showdown(lineup: &GeneratedLineup) -> Result<(), LineupFlaw> {
    if lineup.players.len() != SHOWDOWN_SIZE {
        return Err(LineupFlaw::WrongSize {
            expected: SHOWDOWN_SIZE,
            found: lineup.players.len(),
        });
    }
    if lineup.total_salary > SALARY_CAP {
        return Err(LineupFlaw::OverCap {
            salary: lineup.total_salary,
            cap: SALARY_CAP,
        });
    }
    let captains = lineup.players.iter().filter(|s| s.is_captain).count();
    if captains != 1 {
        return Err(LineupFlaw::CaptainCount { found: captains });
    }
    Ok(())
}
