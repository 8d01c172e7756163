// Linear constraint and objective builders shared by the single-lineup and
// portfolio models.

use crate::optimizer::groups::SlateGroups;
use crate::optimizer::pool::PoolPlayer;
use crate::optimizer::settings::OptimizationSettings;
use crate::slate::Position;
use good_lp::{Constraint, Expression, ProblemVariables, Variable, variable};
use tracing::debug;

pub const SALARY_CAP: u32 = 50_000;
pub const MAIN_SLATE_MIN_SALARY: u32 = SALARY_CAP - 1_000;
pub const MAIN_SLATE_SIZE: usize = 9;
/// RB + WR + TE together fill seven slots (the FLEX slot folds into this sum).
pub const MAIN_SLATE_FLEX_TOTAL: usize = 7;

pub const SHOWDOWN_MIN_SALARY: u32 = 47_000;
pub const SHOWDOWN_SIZE: usize = 6;
pub const SHOWDOWN_FLEX_SLOTS: usize = 5;
pub const CAPTAIN_MULTIPLIER: f64 = 1.5;

/// Bonus per salary dollar spent, added to the quality objective so full-budget
/// lineups win ties. The anchor at the minimum spend is a constant and drops
/// out of the argmax, so only the linear part is modeled.
pub const SALARY_BONUS_WEIGHT: f64 = 0.05;

/// Salary charged for the captain slot. Site salaries are multiples of 100,
/// so the 1.5x charge stays integral.
pub fn captain_effective_salary(salary: u32) -> u32 {
    salary * 3 / 2
}

// ---------------------------------------------------------------------------
// Variables and sums
// ---------------------------------------------------------------------------

/// One binary selection variable per pool player.
pub fn selection_vars(vars: &mut ProblemVariables, count: usize) -> Vec<Variable> {
    (0..count).map(|_| vars.add(variable().binary())).collect()
}

pub fn indices_sum(x: &[Variable], indices: &[usize]) -> Expression {
    let mut expr = Expression::with_capacity(indices.len());
    for &idx in indices {
        expr.add_mul(1.0, x[idx]);
    }
    expr
}

pub fn salary_sum(x: &[Variable], pool: &[PoolPlayer]) -> Expression {
    let mut expr = Expression::with_capacity(x.len());
    for (idx, player) in pool.iter().enumerate() {
        expr.add_mul(player.salary as f64, x[idx]);
    }
    expr
}

fn ownership_sum(x: &[Variable], pool: &[PoolPlayer]) -> Expression {
    let mut expr = Expression::with_capacity(x.len());
    for (idx, player) in pool.iter().enumerate() {
        expr.add_mul(player.ownership, x[idx]);
    }
    expr
}

fn roster_sum(x: &[Variable]) -> Expression {
    let mut expr = Expression::with_capacity(x.len());
    for &var in x {
        expr.add_mul(1.0, var);
    }
    expr
}

// ---------------------------------------------------------------------------
// Stack partner lookup
// ---------------------------------------------------------------------------

/// For each quarterback, the pool indices of same-team pass catchers. A
/// quarterback with no partners gets an empty list; the stack rule skips
/// such quarterbacks rather than constraining them.
pub fn stack_partners(pool: &[PoolPlayer], groups: &SlateGroups) -> Vec<(usize, Vec<usize>)> {
    groups
        .position(Position::Quarterback)
        .iter()
        .map(|&qb_idx| {
            let team = &pool[qb_idx].team;
            let partners: Vec<usize> = pool
                .iter()
                .enumerate()
                .filter(|(_, p)| p.team == *team && p.position.is_pass_catcher())
                .map(|(idx, _)| idx)
                .collect();
            if partners.is_empty() {
                debug!(
                    "no same-team pass catchers in pool for qb {}, stack rule skips them",
                    pool[qb_idx].name
                );
            }
            (qb_idx, partners)
        })
        .collect()
}

/// For each quarterback, the pool indices of pass catchers on the opposing
/// team. Unknown opponents yield an empty list, skipped the same way.
pub fn bring_back_partners(pool: &[PoolPlayer], groups: &SlateGroups) -> Vec<(usize, Vec<usize>)> {
    groups
        .position(Position::Quarterback)
        .iter()
        .map(|&qb_idx| {
            let team = &pool[qb_idx].team;
            let partners: Vec<usize> = match groups.opponent_of.get(team) {
                Some(opponent) => pool
                    .iter()
                    .enumerate()
                    .filter(|(_, p)| p.team == *opponent && p.position.is_pass_catcher())
                    .map(|(idx, _)| idx)
                    .collect(),
                None => Vec::new(),
            };
            if partners.is_empty() {
                debug!(
                    "no opposing pass catchers in pool for qb {}, bring-back rule skips them",
                    pool[qb_idx].name
                );
            }
            (qb_idx, partners)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Main slate constraint set
// ---------------------------------------------------------------------------

/// The full nine-slot rule set over one lineup's selection vector:
/// roster shape, salary band, team and game caps, optional stacking rules,
/// and the optional average-ownership ceiling.
pub fn main_slate_constraints(
    x: &[Variable],
    pool: &[PoolPlayer],
    groups: &SlateGroups,
    settings: &OptimizationSettings,
) -> Vec<Constraint> {
    let mut constraints = Vec::new();

    // Roster shape.
    constraints.push(indices_sum(x, groups.position(Position::Quarterback)).eq(1.0));
    constraints.push(indices_sum(x, groups.position(Position::RunningBack)).geq(2.0));
    constraints.push(indices_sum(x, groups.position(Position::WideReceiver)).geq(3.0));
    constraints.push(indices_sum(x, groups.position(Position::TightEnd)).geq(1.0));
    let mut flex = Expression::with_capacity(x.len());
    for (idx, player) in pool.iter().enumerate() {
        if player.position.is_flex_eligible() {
            flex.add_mul(1.0, x[idx]);
        }
    }
    constraints.push(flex.eq(MAIN_SLATE_FLEX_TOTAL as f64));
    constraints.push(indices_sum(x, groups.position(Position::Defense)).eq(1.0));
    constraints.push(roster_sum(x).eq(MAIN_SLATE_SIZE as f64));

    // Salary band.
    let spend = salary_sum(x, pool);
    constraints.push(spend.clone().leq(SALARY_CAP as f64));
    constraints.push(spend.geq(MAIN_SLATE_MIN_SALARY as f64));

    // Team caps apply to every team on the slate. Game caps only matter for
    // games with enough pool members to exceed the cap.
    for (_, members) in groups.teams() {
        constraints.push(indices_sum(x, members).leq(settings.max_players_per_team as f64));
    }
    for (_, members) in groups.games() {
        if members.len() > settings.max_players_per_game as usize {
            constraints.push(indices_sum(x, members).leq(settings.max_players_per_game as f64));
        }
    }

    // Rostering an eligible quarterback requires a same-team pass catcher.
    // Quarterbacks with no partners in the pool are left unconstrained.
    if settings.qb_stack {
        for (qb_idx, partners) in stack_partners(pool, groups) {
            if partners.is_empty() {
                continue;
            }
            let mut stack = indices_sum(x, &partners);
            stack.add_mul(-1.0, x[qb_idx]);
            constraints.push(stack.geq(0.0));
        }
    }
    // Bring-back: rostering an eligible quarterback requires a pass catcher
    // from the opposing side of that game.
    if settings.bring_back {
        for (qb_idx, partners) in bring_back_partners(pool, groups) {
            if partners.is_empty() {
                continue;
            }
            let mut bring = indices_sum(x, &partners);
            bring.add_mul(-1.0, x[qb_idx]);
            constraints.push(bring.geq(0.0));
        }
    }

    // Linearized average-ownership ceiling.
    if let Some(max_own) = settings.max_ownership {
        constraints.push(ownership_sum(x, pool).leq(max_own * MAIN_SLATE_SIZE as f64));
    }

    constraints
}

// ---------------------------------------------------------------------------
// Showdown constraint set
// ---------------------------------------------------------------------------

/// The five-FLEX rule set for a fixed captain. The captain is folded into the
/// right-hand sides as a constant: their variable is pinned to zero and the
/// salary, ownership, and cap budgets are reduced by the captain's share.
pub fn showdown_flex_constraints(
    x: &[Variable],
    pool: &[PoolPlayer],
    groups: &SlateGroups,
    settings: &OptimizationSettings,
    captain_idx: usize,
) -> Vec<Constraint> {
    let captain = &pool[captain_idx];
    let captain_spend = captain_effective_salary(captain.salary) as f64;
    let mut constraints = Vec::new();

    constraints.push(indices_sum(x, &[captain_idx]).eq(0.0));
    constraints.push(roster_sum(x).eq(SHOWDOWN_FLEX_SLOTS as f64));

    let spend = salary_sum(x, pool);
    constraints.push(spend.clone().leq(SALARY_CAP as f64 - captain_spend));
    constraints.push(spend.geq(SHOWDOWN_MIN_SALARY as f64 - captain_spend));

    for (team, members) in groups.teams() {
        let occupied = if *team == captain.team { 1.0 } else { 0.0 };
        constraints
            .push(indices_sum(x, members).leq(settings.max_players_per_team as f64 - occupied));
    }
    for (_, members) in groups.games() {
        if members.len() > settings.max_players_per_game as usize {
            let occupied = if members.contains(&captain_idx) { 1.0 } else { 0.0 };
            constraints
                .push(indices_sum(x, members).leq(settings.max_players_per_game as f64 - occupied));
        }
    }

    if let Some(max_own) = settings.max_ownership {
        let budget = max_own * SHOWDOWN_SIZE as f64 - captain.ownership;
        constraints.push(ownership_sum(x, pool).leq(budget));
    }

    constraints
}

/// Pin the given players out of the lineup. Used for per-player exposure
/// limits in the iterative paths.
pub fn exclusion_constraints(x: &[Variable], banned: &[usize]) -> Vec<Constraint> {
    banned
        .iter()
        .map(|&idx| indices_sum(x, &[idx]).eq(0.0))
        .collect()
}

// ---------------------------------------------------------------------------
// Objectives
// ---------------------------------------------------------------------------

/// Objective weight for one player: quality score, optionally plus the
/// salary-utilization bonus.
pub fn quality_coefficient(player: &PoolPlayer, include_salary_bonus: bool) -> f64 {
    let mut coefficient = player.quality_score;
    if include_salary_bonus {
        coefficient += SALARY_BONUS_WEIGHT * player.salary as f64;
    }
    coefficient
}

pub fn quality_objective(
    x: &[Variable],
    pool: &[PoolPlayer],
    include_salary_bonus: bool,
) -> Expression {
    let mut objective = Expression::with_capacity(x.len());
    for (idx, player) in pool.iter().enumerate() {
        objective.add_mul(quality_coefficient(player, include_salary_bonus), x[idx]);
    }
    objective
}

pub fn projection_objective(x: &[Variable], pool: &[PoolPlayer]) -> Expression {
    let mut objective = Expression::with_capacity(x.len());
    for (idx, player) in pool.iter().enumerate() {
        objective.add_mul(player.projected_points, x[idx]);
    }
    objective
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::groups::build_groups;
    use crate::slate::OpponentMap;
    use good_lp::variables;

    fn make_player(name: &str, team: &str, position: Position, salary: u32) -> PoolPlayer {
        PoolPlayer {
            player_id: 0,
            key: format!("{name}:{team}:{}", position.display_str()),
            name: name.into(),
            team: team.into(),
            position,
            salary,
            quality_score: 5.0,
            ownership: 0.10,
            projected_points: 10.0,
            implied_team_total: None,
            snap_share_delta: None,
        }
    }

    fn two_team_pool() -> Vec<PoolPlayer> {
        vec![
            make_player("QB KC", "KC", Position::Quarterback, 7000),
            make_player("QB BUF", "BUF", Position::Quarterback, 6800),
            make_player("RB KC", "KC", Position::RunningBack, 6000),
            make_player("RB BUF", "BUF", Position::RunningBack, 5800),
            make_player("WR KC", "KC", Position::WideReceiver, 6200),
            make_player("WR BUF", "BUF", Position::WideReceiver, 5900),
            make_player("TE KC", "KC", Position::TightEnd, 4500),
            make_player("DST BUF", "BUF", Position::Defense, 3000),
        ]
    }

    fn kc_buf_opponents() -> OpponentMap {
        let mut opponents = OpponentMap::new();
        opponents.insert("KC".into(), "BUF".into());
        opponents.insert("BUF".into(), "KC".into());
        opponents
    }

    // ---- Partner lookup ----

    #[test]
    fn stack_partners_are_same_team_pass_catchers() {
        let pool = two_team_pool();
        let groups = build_groups(&pool, &kc_buf_opponents());
        let partners = stack_partners(&pool, &groups);

        assert_eq!(partners.len(), 2);
        let (kc_qb, kc_partners) = &partners[0];
        assert_eq!(pool[*kc_qb].team, "KC");
        // KC pass catchers: WR KC (4) and TE KC (6). Running backs never count.
        assert_eq!(kc_partners, &vec![4, 6]);
        let (_, buf_partners) = &partners[1];
        assert_eq!(buf_partners, &vec![5]);
    }

    #[test]
    fn bring_back_partners_cross_to_the_opponent() {
        let pool = two_team_pool();
        let groups = build_groups(&pool, &kc_buf_opponents());
        let partners = bring_back_partners(&pool, &groups);

        let (kc_qb, kc_partners) = &partners[0];
        assert_eq!(pool[*kc_qb].team, "KC");
        assert_eq!(kc_partners, &vec![5], "KC qb pairs with BUF catchers");
        let (_, buf_partners) = &partners[1];
        assert_eq!(buf_partners, &vec![4, 6]);
    }

    #[test]
    fn unknown_opponent_leaves_no_bring_back_partners() {
        let pool = two_team_pool();
        let groups = build_groups(&pool, &OpponentMap::new());
        for (_, partners) in bring_back_partners(&pool, &groups) {
            assert!(partners.is_empty());
        }
    }

    // ---- Constraint counts ----

    #[test]
    fn main_slate_emits_expected_constraint_count() {
        let pool = two_team_pool();
        let groups = build_groups(&pool, &kc_buf_opponents());
        let settings = OptimizationSettings::default();

        let mut vars = variables!();
        let x = selection_vars(&mut vars, pool.len());

        // 7 shape + 2 salary + 2 team caps + 1 game cap (8 members > cap 6).
        let base = main_slate_constraints(&x, &pool, &groups, &settings);
        assert_eq!(base.len(), 12);

        let mut stacked = settings.clone();
        stacked.qb_stack = true;
        stacked.bring_back = true;
        stacked.max_ownership = Some(0.25);
        // Adds 2 stack + 2 bring-back + 1 ownership.
        let full = main_slate_constraints(&x, &pool, &groups, &stacked);
        assert_eq!(full.len(), 17);
    }

    #[test]
    fn partnerless_quarterback_gets_no_stack_constraint() {
        // The SEA quarterback has no same-team pass catchers; with no
        // schedule at all, neither quarterback has bring-back partners.
        let mut pool = two_team_pool();
        pool[0].team = "SEA".into();
        let groups = build_groups(&pool, &OpponentMap::new());
        let mut settings = OptimizationSettings::default();
        settings.qb_stack = true;
        settings.bring_back = true;

        let mut vars = variables!();
        let x = selection_vars(&mut vars, pool.len());
        // 7 shape + 2 salary + 3 team caps + 1 stack (BUF qb only); the
        // unpaired quarterbacks contribute nothing.
        let constraints = main_slate_constraints(&x, &pool, &groups, &settings);
        assert_eq!(constraints.len(), 13);
    }

    #[test]
    fn roomy_game_cap_is_not_emitted() {
        let pool = two_team_pool();
        let groups = build_groups(&pool, &kc_buf_opponents());
        let mut settings = OptimizationSettings::default();
        settings.max_players_per_game = 8;

        let mut vars = variables!();
        let x = selection_vars(&mut vars, pool.len());
        let constraints = main_slate_constraints(&x, &pool, &groups, &settings);
        assert_eq!(constraints.len(), 11, "7 shape + 2 salary + 2 team caps");
    }

    #[test]
    fn showdown_emits_expected_constraint_count() {
        let pool = two_team_pool();
        let groups = build_groups(&pool, &kc_buf_opponents());
        let settings = OptimizationSettings::default();

        let mut vars = variables!();
        let x = selection_vars(&mut vars, pool.len());

        // 1 captain pin + 1 flex total + 2 salary + 2 team caps + 1 game cap.
        let constraints = showdown_flex_constraints(&x, &pool, &groups, &settings, 0);
        assert_eq!(constraints.len(), 7);
    }

    #[test]
    fn exclusion_emits_one_constraint_per_ban() {
        let pool = two_team_pool();
        let mut vars = variables!();
        let x = selection_vars(&mut vars, pool.len());
        assert_eq!(exclusion_constraints(&x, &[]).len(), 0);
        assert_eq!(exclusion_constraints(&x, &[1, 3, 5]).len(), 3);
    }

    // ---- Captain salary ----

    #[test]
    fn captain_salary_math_is_exact() {
        assert_eq!(captain_effective_salary(9000), 13500);
        assert_eq!(captain_effective_salary(5500), 8250);
        assert_eq!(captain_effective_salary(200), 300);
    }
}
