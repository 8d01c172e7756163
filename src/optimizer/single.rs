// One-lineup-at-a-time solving: the baseline path and the iterative fallback
// used when the joint portfolio model cannot be solved.

use crate::optimizer::constraints::{
    exclusion_constraints, main_slate_constraints, projection_objective, quality_objective,
    selection_vars,
};
use crate::optimizer::groups::SlateGroups;
use crate::optimizer::lineup::{GeneratedLineup, LineupSlot};
use crate::optimizer::pool::PoolPlayer;
use crate::optimizer::settings::{ContestMode, OptimizationSettings};
use crate::optimizer::solver::{SolveFailure, maximize, selected_indices};
use crate::optimizer::validate;
use good_lp::variables;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Consecutive failed solves tolerated by the iterative loop before giving up.
pub const MAX_CONSECUTIVE_FAILURES: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineupObjective {
    /// Quality score plus the salary-utilization bonus. The standard objective.
    QualityWithSalaryBonus,
    /// Quality score alone. Used by the best-quality baseline.
    PureQuality,
    /// Projected points alone. Used by the best-projection baseline.
    PureProjection,
}

/// Solve one nine-slot lineup. Returns `None` when the model is infeasible,
/// the solver errors out, or the solved lineup fails validation.
pub fn solve_main_slate_lineup(
    pool: &[PoolPlayer],
    groups: &SlateGroups,
    settings: &OptimizationSettings,
    objective: LineupObjective,
    banned: &[usize],
    budget: Duration,
    lineup_number: i32,
) -> Option<GeneratedLineup> {
    let mut vars = variables!();
    let x = selection_vars(&mut vars, pool.len());

    let objective_expr = match objective {
        LineupObjective::QualityWithSalaryBonus => quality_objective(&x, pool, true),
        LineupObjective::PureQuality => quality_objective(&x, pool, false),
        LineupObjective::PureProjection => projection_objective(&x, pool),
    };
    let mut constraints = main_slate_constraints(&x, pool, groups, settings);
    constraints.extend(exclusion_constraints(&x, banned));

    let solution = match maximize(vars, objective_expr, constraints, budget) {
        Ok(solution) => solution,
        Err(SolveFailure::Backend(message)) => {
            warn!("solver error on lineup {}: {}", lineup_number, message);
            return None;
        }
        Err(failure) => {
            debug!("lineup {} not solvable: {}", lineup_number, failure);
            return None;
        }
    };

    let picked = selected_indices(&solution, &x);
    if picked.is_empty() {
        warn!("empty selection returned for lineup {}", lineup_number);
        return None;
    }
    let slots: Vec<LineupSlot> = picked
        .iter()
        .map(|&idx| LineupSlot::from_player(&pool[idx]))
        .collect();
    let lineup = GeneratedLineup::from_slots(lineup_number, slots);
    match validate::check(&lineup, ContestMode::MainSlate) {
        Ok(()) => Some(lineup),
        Err(flaw) => {
            warn!("dropping lineup {}: {}", lineup_number, flaw);
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Iterative fallback
// ---------------------------------------------------------------------------

/// Generate up to `num_lineups` lineups one at a time. Lineups share no
/// diversity constraints beyond per-player exposure bans, so repeats are
/// possible. Stops early after `MAX_CONSECUTIVE_FAILURES` failed solves in a
/// row; lineups are numbered contiguously from 1 regardless of failures.
pub fn generate_iteratively(
    pool: &[PoolPlayer],
    groups: &SlateGroups,
    settings: &OptimizationSettings,
    budget: Duration,
) -> Vec<GeneratedLineup> {
    let requested = settings.num_lineups as usize;
    let index_of: HashMap<&str, usize> = pool
        .iter()
        .enumerate()
        .map(|(idx, player)| (player.key.as_str(), idx))
        .collect();
    let caps = exposure_caps(pool, settings);
    let mut appearances: HashMap<usize, u32> = HashMap::new();

    let mut lineups: Vec<GeneratedLineup> = Vec::with_capacity(requested);
    let mut consecutive_failures = 0u32;
    while lineups.len() < requested {
        let banned = exhausted_players(&caps, &appearances);
        let number = lineups.len() as i32 + 1;
        match solve_main_slate_lineup(
            pool,
            groups,
            settings,
            LineupObjective::QualityWithSalaryBonus,
            &banned,
            budget,
            number,
        ) {
            Some(lineup) => {
                for slot in &lineup.players {
                    if let Some(&idx) = index_of.get(slot.key.as_str()) {
                        *appearances.entry(idx).or_insert(0) += 1;
                    }
                }
                lineups.push(lineup);
                consecutive_failures = 0;
            }
            None => {
                consecutive_failures += 1;
                if consecutive_failures >= MAX_CONSECUTIVE_FAILURES {
                    warn!(
                        "stopping after {} consecutive failed solves, produced {} of {} lineups",
                        consecutive_failures,
                        lineups.len(),
                        requested
                    );
                    break;
                }
            }
        }
    }
    lineups
}

/// Appearance ceilings from per-player exposure fractions, floored against
/// the requested lineup count. A fraction of zero bans the player outright.
pub(crate) fn exposure_caps(
    pool: &[PoolPlayer],
    settings: &OptimizationSettings,
) -> HashMap<usize, u32> {
    let mut caps = HashMap::new();
    for (idx, player) in pool.iter().enumerate() {
        if let Some(&fraction) = settings.exposure_limits.get(&player.key) {
            let cap = (fraction * settings.num_lineups as f64).floor() as u32;
            caps.insert(idx, cap);
        }
    }
    caps
}

pub(crate) fn exhausted_players(
    caps: &HashMap<usize, u32>,
    appearances: &HashMap<usize, u32>,
) -> Vec<usize> {
    let mut banned: Vec<usize> = caps
        .iter()
        .filter(|(idx, &cap)| appearances.get(idx).copied().unwrap_or(0) >= cap)
        .map(|(&idx, _)| idx)
        .collect();
    banned.sort_unstable();
    banned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::groups::build_groups;
    use crate::slate::{OpponentMap, Position};

    fn make_player(
        name: &str,
        team: &str,
        position: Position,
        salary: u32,
        quality: f64,
    ) -> PoolPlayer {
        PoolPlayer {
            player_id: 0,
            key: format!("{name}:{team}:{}", position.display_str()),
            name: name.into(),
            team: team.into(),
            position,
            salary,
            quality_score: quality,
            ownership: 0.10,
            projected_points: quality * 2.0,
            implied_team_total: None,
            snap_share_delta: None,
        }
    }

    // Nine players summing to exactly 50000, spread over three teams.
    fn exact_fit_pool() -> Vec<PoolPlayer> {
        vec![
            make_player("QB", "KC", Position::Quarterback, 8000, 9.0),
            make_player("RB1", "KC", Position::RunningBack, 6000, 8.0),
            make_player("RB2", "BUF", Position::RunningBack, 6000, 7.5),
            make_player("RB3", "DAL", Position::RunningBack, 6000, 7.0),
            make_player("WR1", "KC", Position::WideReceiver, 5500, 7.0),
            make_player("WR2", "BUF", Position::WideReceiver, 5500, 6.5),
            make_player("WR3", "DAL", Position::WideReceiver, 5500, 6.0),
            make_player("TE", "BUF", Position::TightEnd, 5000, 5.0),
            make_player("DST", "DAL", Position::Defense, 2500, 4.0),
        ]
    }

    // The exact-fit core without a quarterback (42000 total), plus two
    // quarterback options that both land the total inside the salary band.
    fn two_quarterback_pool() -> Vec<PoolPlayer> {
        let mut pool = exact_fit_pool();
        pool.remove(0);
        pool.push(make_player("QB A", "SF", Position::Quarterback, 8000, 20.0));
        pool.push(make_player("QB B", "SF", Position::Quarterback, 7500, 10.0));
        pool
    }

    fn kc_buf_opponents() -> OpponentMap {
        let mut opponents = OpponentMap::new();
        opponents.insert("KC".into(), "BUF".into());
        opponents.insert("BUF".into(), "KC".into());
        opponents
    }

    fn budget() -> Duration {
        Duration::from_secs(10)
    }

    // ---- Single solves ----

    #[test]
    fn exact_fit_pool_solves_to_the_cap() {
        let pool = exact_fit_pool();
        let groups = build_groups(&pool, &kc_buf_opponents());
        let settings = OptimizationSettings::default();

        let lineup = solve_main_slate_lineup(
            &pool,
            &groups,
            &settings,
            LineupObjective::QualityWithSalaryBonus,
            &[],
            budget(),
            1,
        )
        .expect("exact-fit pool must solve");
        assert_eq!(lineup.lineup_number, 1);
        assert_eq!(lineup.players.len(), 9);
        assert_eq!(lineup.total_salary, 50000);
    }

    #[test]
    fn higher_quality_quarterback_wins_unbanned() {
        let pool = two_quarterback_pool();
        let groups = build_groups(&pool, &kc_buf_opponents());
        let settings = OptimizationSettings::default();

        let lineup = solve_main_slate_lineup(
            &pool,
            &groups,
            &settings,
            LineupObjective::QualityWithSalaryBonus,
            &[],
            budget(),
            1,
        )
        .expect("pool must solve");
        assert!(lineup.has_player("QB A:SF:QB"));
    }

    #[test]
    fn banned_players_never_appear() {
        let pool = two_quarterback_pool();
        let groups = build_groups(&pool, &kc_buf_opponents());
        let settings = OptimizationSettings::default();
        let qb_a = pool
            .iter()
            .position(|p| p.name == "QB A")
            .expect("QB A is in the pool");

        let lineup = solve_main_slate_lineup(
            &pool,
            &groups,
            &settings,
            LineupObjective::QualityWithSalaryBonus,
            &[qb_a],
            budget(),
            1,
        )
        .expect("pool must solve around the ban");
        assert!(!lineup.has_player("QB A:SF:QB"));
        assert!(lineup.has_player("QB B:SF:QB"));
    }

    #[test]
    fn underfunded_pool_yields_no_lineup() {
        let pool: Vec<PoolPlayer> = exact_fit_pool()
            .into_iter()
            .map(|mut p| {
                p.salary = 1000;
                p
            })
            .collect();
        let groups = build_groups(&pool, &kc_buf_opponents());
        let settings = OptimizationSettings::default();

        let lineup = solve_main_slate_lineup(
            &pool,
            &groups,
            &settings,
            LineupObjective::QualityWithSalaryBonus,
            &[],
            budget(),
            1,
        );
        assert!(lineup.is_none(), "9000 total spend cannot reach the band");
    }

    #[test]
    fn stack_rule_forces_a_same_team_catcher() {
        // The KC receiver has the worst score in the pool, but the stack
        // rule ties them to the KC quarterback: one of the three receiver
        // slots must go to them instead of a better wideout.
        let pool = vec![
            make_player("QB", "KC", Position::Quarterback, 7000, 50.0),
            make_player("RB1", "KC", Position::RunningBack, 6000, 8.0),
            make_player("RB2", "DAL", Position::RunningBack, 6000, 7.0),
            make_player("RB3", "DAL", Position::RunningBack, 6000, 6.0),
            make_player("WR KC", "KC", Position::WideReceiver, 5500, 1.0),
            make_player("WR1", "BUF", Position::WideReceiver, 5500, 7.0),
            make_player("WR2", "BUF", Position::WideReceiver, 5500, 6.5),
            make_player("WR3", "BUF", Position::WideReceiver, 5500, 6.0),
            make_player("TE", "PHI", Position::TightEnd, 5000, 5.0),
            make_player("DST", "SF", Position::Defense, 2500, 4.0),
        ];
        let groups = build_groups(&pool, &kc_buf_opponents());
        let mut settings = OptimizationSettings::default();
        settings.qb_stack = true;

        let lineup = solve_main_slate_lineup(
            &pool,
            &groups,
            &settings,
            LineupObjective::QualityWithSalaryBonus,
            &[],
            budget(),
            1,
        )
        .expect("stacked pool must solve");
        assert!(lineup.has_player("WR KC:KC:WR"), "the stack partner is in");
    }

    #[test]
    fn quarterback_without_partners_is_left_unconstrained() {
        // The only quarterback has no same-team pass catchers; the stack
        // rule must skip them, not force them out of the lineup.
        let mut pool = exact_fit_pool();
        pool[0] = make_player("QB", "SEA", Position::Quarterback, 8000, 9.0);
        let groups = build_groups(&pool, &kc_buf_opponents());
        let mut settings = OptimizationSettings::default();
        settings.qb_stack = true;

        let lineup = solve_main_slate_lineup(
            &pool,
            &groups,
            &settings,
            LineupObjective::QualityWithSalaryBonus,
            &[],
            budget(),
            1,
        )
        .expect("an unpaired quarterback must still be rosterable");
        assert!(lineup.has_player("QB:SEA:QB"));
        assert_eq!(lineup.total_salary, 50000);
    }

    // ---- Iterative loop ----

    #[test]
    fn exposure_limit_rotates_the_quarterback() {
        let pool = two_quarterback_pool();
        let groups = build_groups(&pool, &kc_buf_opponents());
        let mut settings = OptimizationSettings::default();
        settings.num_lineups = 2;
        settings
            .exposure_limits
            .insert("QB A:SF:QB".into(), 0.5);

        let lineups = generate_iteratively(&pool, &groups, &settings, budget());
        assert_eq!(lineups.len(), 2);
        assert_eq!(lineups[0].lineup_number, 1);
        assert_eq!(lineups[1].lineup_number, 2);
        // floor(0.5 * 2) = 1 appearance allowed.
        assert!(lineups[0].has_player("QB A:SF:QB"));
        assert!(!lineups[1].has_player("QB A:SF:QB"));
        assert!(lineups[1].has_player("QB B:SF:QB"));
    }

    #[test]
    fn iterative_loop_gives_up_after_three_failures() {
        let pool: Vec<PoolPlayer> = exact_fit_pool()
            .into_iter()
            .map(|mut p| {
                p.salary = 1000;
                p
            })
            .collect();
        let groups = build_groups(&pool, &kc_buf_opponents());
        let mut settings = OptimizationSettings::default();
        settings.num_lineups = 5;

        let lineups = generate_iteratively(&pool, &groups, &settings, budget());
        assert!(lineups.is_empty());
    }

    #[test]
    fn zero_exposure_bans_from_the_start() {
        let pool = two_quarterback_pool();
        let groups = build_groups(&pool, &kc_buf_opponents());
        let mut settings = OptimizationSettings::default();
        settings.num_lineups = 1;
        settings
            .exposure_limits
            .insert("QB A:SF:QB".into(), 0.0);

        let lineups = generate_iteratively(&pool, &groups, &settings, budget());
        assert_eq!(lineups.len(), 1);
        assert!(!lineups[0].has_player("QB A:SF:QB"));
    }
}
