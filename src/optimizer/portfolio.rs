// Joint portfolio solving: all requested lineups in one model, elite
// appearance windows across the portfolio, progressive relaxation when the
// joint model cannot be solved, and the one-at-a-time fallback after that.

use crate::optimizer::constraints::{main_slate_constraints, quality_coefficient, selection_vars};
use crate::optimizer::elite::{EliteBound, elite_bounds};
use crate::optimizer::groups::SlateGroups;
use crate::optimizer::lineup::{GeneratedLineup, LineupSlot};
use crate::optimizer::pool::PoolPlayer;
use crate::optimizer::settings::{ContestMode, OptimizationSettings};
use crate::optimizer::single::generate_iteratively;
use crate::optimizer::solver::{maximize, selected_indices};
use crate::optimizer::validate;
use good_lp::{Expression, Variable, variables};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Result of the portfolio pass, including how much relaxation it took.
#[derive(Debug)]
pub struct PortfolioOutcome {
    pub lineups: Vec<GeneratedLineup>,
    /// Elite ranks whose appearance windows were lifted, in relaxation order.
    pub relaxed_ranks: Vec<usize>,
    pub used_fallback: bool,
    /// Set when even the fallback produced nothing.
    pub reason: Option<String>,
}

/// Solve the requested lineups jointly. On infeasibility, lift elite ranks
/// one at a time from the bottom of the table upward and re-solve; rank 0 is
/// never lifted. When every liftable rank is gone and the model still does
/// not solve, fall back to generating lineups one at a time.
pub fn solve_portfolio(
    pool: &[PoolPlayer],
    groups: &SlateGroups,
    settings: &OptimizationSettings,
    portfolio_budget: Duration,
    single_budget: Duration,
) -> PortfolioOutcome {
    let bounds = elite_bounds(pool, settings.num_lineups);

    // Ranks actually present among the bounds, lowest elite rank first.
    let relaxable: Vec<usize> = {
        let ranks: HashSet<usize> = bounds
            .iter()
            .filter(|b| b.rank >= 1)
            .map(|b| b.rank)
            .collect();
        let mut ranks: Vec<usize> = ranks.into_iter().collect();
        ranks.sort_unstable_by(|a, b| b.cmp(a));
        ranks
    };

    for lifted in 0..=relaxable.len() {
        let relaxed = &relaxable[..lifted];
        if lifted > 0 {
            debug!(
                "joint model unsolved, retrying with elite ranks {:?} lifted",
                relaxed
            );
        }
        if let Some(lineups) =
            attempt_joint_solve(pool, groups, settings, &bounds, relaxed, portfolio_budget)
        {
            if lifted > 0 {
                info!(
                    "portfolio solved after lifting elite rank windows {:?}",
                    relaxed
                );
            }
            return PortfolioOutcome {
                lineups,
                relaxed_ranks: relaxed.to_vec(),
                used_fallback: false,
                reason: None,
            };
        }
    }

    warn!("joint portfolio unsolvable at every relaxation level, generating one lineup at a time");
    let lineups = generate_iteratively(pool, groups, settings, single_budget);
    let reason = if lineups.is_empty() {
        Some(
            "portfolio model infeasible at every relaxation level and the iterative fallback \
             produced no lineups"
                .to_string(),
        )
    } else {
        None
    };
    PortfolioOutcome {
        lineups,
        relaxed_ranks: relaxable,
        used_fallback: true,
        reason,
    }
}

/// Build and solve the joint model with the given ranks lifted. `None` means
/// the model did not produce a usable portfolio at this relaxation level.
fn attempt_joint_solve(
    pool: &[PoolPlayer],
    groups: &SlateGroups,
    settings: &OptimizationSettings,
    bounds: &[EliteBound],
    relaxed: &[usize],
    budget: Duration,
) -> Option<Vec<GeneratedLineup>> {
    let requested = settings.num_lineups as usize;

    let mut vars = variables!();
    let per_lineup: Vec<Vec<Variable>> = (0..requested)
        .map(|_| selection_vars(&mut vars, pool.len()))
        .collect();

    let mut objective = Expression::with_capacity(requested * pool.len());
    let mut constraints = Vec::new();
    for x in &per_lineup {
        for (idx, player) in pool.iter().enumerate() {
            objective.add_mul(quality_coefficient(player, true), x[idx]);
        }
        constraints.extend(main_slate_constraints(x, pool, groups, settings));
    }

    // Elite appearance windows, skipping lifted ranks. Zero minimums add
    // nothing and are not emitted.
    let lifted: HashSet<usize> = relaxed.iter().copied().collect();
    for bound in bounds {
        if lifted.contains(&bound.rank) {
            continue;
        }
        let mut appearances = Expression::with_capacity(requested);
        for x in &per_lineup {
            appearances.add_mul(1.0, x[bound.player]);
        }
        if bound.min_appearances > 0 {
            constraints.push(appearances.clone().geq(bound.min_appearances as f64));
        }
        constraints.push(appearances.leq(bound.max_appearances as f64));
    }

    // Portfolio-wide exposure ceilings.
    let mut limited: Vec<(&String, f64)> = settings
        .exposure_limits
        .iter()
        .map(|(key, &fraction)| (key, fraction))
        .collect();
    limited.sort_by(|a, b| a.0.cmp(b.0));
    for (key, fraction) in limited {
        let Some(player_idx) = pool.iter().position(|p| &p.key == key) else {
            continue;
        };
        let ceiling = (fraction * requested as f64).floor();
        let mut appearances = Expression::with_capacity(requested);
        for x in &per_lineup {
            appearances.add_mul(1.0, x[player_idx]);
        }
        constraints.push(appearances.leq(ceiling));
    }

    let solution = match maximize(vars, objective, constraints, budget) {
        Ok(solution) => solution,
        Err(failure) => {
            debug!("joint solve failed: {}", failure);
            return None;
        }
    };

    let mut lineups = Vec::with_capacity(requested);
    for (l, x) in per_lineup.iter().enumerate() {
        let picked = selected_indices(&solution, x);
        if picked.is_empty() {
            warn!("joint solution came back with an empty lineup block");
            return None;
        }
        let slots: Vec<LineupSlot> = picked
            .iter()
            .map(|&idx| LineupSlot::from_player(&pool[idx]))
            .collect();
        let lineup = GeneratedLineup::from_slots(l as i32 + 1, slots);
        match validate::check(&lineup, ContestMode::MainSlate) {
            Ok(()) => lineups.push(lineup),
            Err(flaw) => warn!("dropping portfolio lineup {}: {}", l + 1, flaw),
        }
    }
    if lineups.is_empty() {
        return None;
    }
    Some(lineups)
}
