// Showdown contest: captain candidate selection, per-captain solving, and
// captain rotation across the requested portfolio.

use crate::optimizer::constraints::{
    SALARY_CAP, SHOWDOWN_FLEX_SLOTS, captain_effective_salary, exclusion_constraints,
    projection_objective, quality_objective, selection_vars, showdown_flex_constraints,
};
use crate::optimizer::groups::SlateGroups;
use crate::optimizer::lineup::{
    BASELINE_BEST_PROJECTION, BASELINE_BEST_QUALITY, GeneratedLineup, LineupSlot,
};
use crate::optimizer::pool::PoolPlayer;
use crate::optimizer::settings::{ContestMode, OptimizationSettings};
use crate::optimizer::single::{LineupObjective, exhausted_players, exposure_caps};
use crate::optimizer::solver::{SolveFailure, maximize, selected_indices};
use crate::optimizer::validate;
use good_lp::variables;
use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;
use tracing::{debug, warn};

/// Captain candidates retained per pool.
pub const CAPTAIN_CANDIDATES: usize = 5;

// ---------------------------------------------------------------------------
// Captain candidates
// ---------------------------------------------------------------------------

/// Request-scoped cache of captain candidate lists, keyed by a stable hash of
/// the pool's player-id set. Created fresh per optimization request and never
/// shared across requests.
#[derive(Debug, Default)]
pub struct CaptainCache {
    entries: HashMap<u64, Vec<u64>>,
}

impl CaptainCache {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.len()
    }
}

fn pool_signature(pool: &[PoolPlayer]) -> u64 {
    let mut ids: Vec<u64> = pool.iter().map(|p| p.player_id).collect();
    ids.sort_unstable();
    let mut hasher = DefaultHasher::new();
    ids.hash(&mut hasher);
    hasher.finish()
}

/// The top captain candidates by value, where value = quality score per
/// salary dollar. The captain premium scales score and salary alike, so it
/// cancels out of the ratio and is ignored here.
pub fn captain_candidates(pool: &[PoolPlayer], cache: &mut CaptainCache) -> Vec<usize> {
    let signature = pool_signature(pool);
    let index_by_id: HashMap<u64, usize> = pool
        .iter()
        .enumerate()
        .map(|(idx, p)| (p.player_id, idx))
        .collect();
    if let Some(ids) = cache.entries.get(&signature) {
        let indices: Vec<usize> = ids
            .iter()
            .filter_map(|id| index_by_id.get(id).copied())
            .collect();
        if indices.len() == ids.len() {
            debug!("captain candidates served from cache");
            return indices;
        }
    }

    let mut ranked: Vec<(usize, f64)> = pool
        .iter()
        .enumerate()
        .map(|(idx, p)| (idx, p.quality_score / p.salary as f64))
        .collect();
    ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    ranked.truncate(CAPTAIN_CANDIDATES);
    let indices: Vec<usize> = ranked.iter().map(|&(idx, _)| idx).collect();
    cache.entries.insert(
        signature,
        indices.iter().map(|&idx| pool[idx].player_id).collect(),
    );
    indices
}

/// Cheapest-possible roster check for a fixed captain: the captain premium
/// plus the five cheapest remaining salaries must fit under the cap.
pub fn captain_feasibility(pool: &[PoolPlayer], captain_idx: usize) -> Result<(), String> {
    let mut other_salaries: Vec<u32> = pool
        .iter()
        .enumerate()
        .filter(|(idx, _)| *idx != captain_idx)
        .map(|(_, p)| p.salary)
        .collect();
    if other_salaries.len() < SHOWDOWN_FLEX_SLOTS {
        return Err(format!(
            "captain {} leaves only {} flex players, {} required",
            pool[captain_idx].name,
            other_salaries.len(),
            SHOWDOWN_FLEX_SLOTS
        ));
    }
    other_salaries.sort_unstable();
    let floor_spend = captain_effective_salary(pool[captain_idx].salary)
        + other_salaries
            .iter()
            .take(SHOWDOWN_FLEX_SLOTS)
            .sum::<u32>();
    if floor_spend > SALARY_CAP {
        return Err(format!(
            "captain {} needs at least {} salary, cap is {}",
            pool[captain_idx].name, floor_spend, SALARY_CAP
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Solving
// ---------------------------------------------------------------------------

/// Solve the five-FLEX subproblem for a fixed captain and assemble the full
/// six-player lineup. Returns `None` on infeasibility, solver error, or a
/// validation failure.
pub fn solve_showdown_lineup(
    pool: &[PoolPlayer],
    groups: &SlateGroups,
    settings: &OptimizationSettings,
    captain_idx: usize,
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
    let mut constraints = showdown_flex_constraints(&x, pool, groups, settings, captain_idx);
    constraints.extend(exclusion_constraints(&x, banned));

    let solution = match maximize(vars, objective_expr, constraints, budget) {
        Ok(solution) => solution,
        Err(SolveFailure::Backend(message)) => {
            warn!("solver error on showdown lineup {}: {}", lineup_number, message);
            return None;
        }
        Err(failure) => {
            debug!(
                "showdown lineup {} with captain {} not solvable: {}",
                lineup_number, pool[captain_idx].name, failure
            );
            return None;
        }
    };

    let picked = selected_indices(&solution, &x);
    if picked.is_empty() {
        warn!("empty flex selection for showdown lineup {}", lineup_number);
        return None;
    }
    let mut slots = vec![LineupSlot::captain_from_player(&pool[captain_idx])];
    slots.extend(picked.iter().map(|&idx| LineupSlot::from_player(&pool[idx])));
    let lineup = GeneratedLineup::from_slots(lineup_number, slots);
    match validate::check(&lineup, ContestMode::Showdown) {
        Ok(()) => Some(lineup),
        Err(flaw) => {
            warn!("dropping showdown lineup {}: {}", lineup_number, flaw);
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Portfolio generation
// ---------------------------------------------------------------------------

/// Generate the requested showdown lineups, rotating the captain through the
/// candidate list (lineup i takes candidate i mod candidates). A locked
/// captain replaces the candidate list entirely and must pass the feasibility
/// pre-check before any solve is attempted. Failed slots keep their lineup
/// number vacant so the rotation stays aligned.
pub fn generate_showdown(
    pool: &[PoolPlayer],
    groups: &SlateGroups,
    settings: &OptimizationSettings,
    cache: &mut CaptainCache,
    budget: Duration,
) -> (Vec<GeneratedLineup>, Option<String>) {
    let requested = settings.num_lineups as usize;

    let candidates = if let Some(locked_id) = settings.locked_captain_id {
        let Some(idx) = pool.iter().position(|p| p.player_id == locked_id) else {
            let reason = format!("locked captain id {locked_id} is not in the prepared pool");
            warn!("{}", reason);
            return (Vec::new(), Some(reason));
        };
        if let Err(reason) = captain_feasibility(pool, idx) {
            warn!("locked captain rejected: {}", reason);
            return (Vec::new(), Some(reason));
        }
        vec![idx]
    } else {
        captain_candidates(pool, cache)
    };
    if candidates.is_empty() {
        let reason = "no captain candidates available".to_string();
        warn!("{}", reason);
        return (Vec::new(), Some(reason));
    }

    let index_of: HashMap<&str, usize> = pool
        .iter()
        .enumerate()
        .map(|(idx, player)| (player.key.as_str(), idx))
        .collect();
    let caps = exposure_caps(pool, settings);
    let mut appearances: HashMap<usize, u32> = HashMap::new();

    let mut lineups: Vec<GeneratedLineup> = Vec::with_capacity(requested);
    for slot in 0..requested {
        let captain_idx = candidates[slot % candidates.len()];
        let banned = exhausted_players(&caps, &appearances);
        if banned.contains(&captain_idx) {
            warn!(
                "captain {} exhausted by exposure limits, skipping lineup {}",
                pool[captain_idx].name,
                slot + 1
            );
            continue;
        }
        match solve_showdown_lineup(
            pool,
            groups,
            settings,
            captain_idx,
            LineupObjective::QualityWithSalaryBonus,
            &banned,
            budget,
            slot as i32 + 1,
        ) {
            Some(lineup) => {
                for s in &lineup.players {
                    if let Some(&idx) = index_of.get(s.key.as_str()) {
                        *appearances.entry(idx).or_insert(0) += 1;
                    }
                }
                lineups.push(lineup);
            }
            None => {
                warn!(
                    "showdown lineup {} failed with captain {}",
                    slot + 1,
                    pool[captain_idx].name
                );
            }
        }
    }

    if lineups.is_empty() {
        let reason = "no showdown lineup could be solved for any captain candidate".to_string();
        return (Vec::new(), Some(reason));
    }
    (lineups, None)
}

// ---------------------------------------------------------------------------
// Baselines
// ---------------------------------------------------------------------------

/// The two showdown reference lineups. Best quality picks the captain
/// greedily by quality score and solves once; best projection solves the flex
/// subproblem per feasible captain, since the 1.5x premium couples the
/// captain choice to the flex five for that objective.
pub fn showdown_baselines(
    pool: &[PoolPlayer],
    groups: &SlateGroups,
    settings: &OptimizationSettings,
    budget: Duration,
) -> Vec<GeneratedLineup> {
    let feasible: Vec<usize> = match settings.locked_captain_id {
        Some(locked_id) => pool
            .iter()
            .position(|p| p.player_id == locked_id)
            .filter(|&idx| captain_feasibility(pool, idx).is_ok())
            .into_iter()
            .collect(),
        None => (0..pool.len())
            .filter(|&idx| captain_feasibility(pool, idx).is_ok())
            .collect(),
    };
    if feasible.is_empty() {
        debug!("no feasible captain, skipping showdown baselines");
        return Vec::new();
    }

    let mut baselines = Vec::with_capacity(2);

    let best_quality_captain = feasible.iter().copied().max_by(|&a, &b| {
        pool[a]
            .quality_score
            .partial_cmp(&pool[b].quality_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    if let Some(captain_idx) = best_quality_captain {
        if let Some(lineup) = solve_showdown_lineup(
            pool,
            groups,
            settings,
            captain_idx,
            LineupObjective::PureQuality,
            &[],
            budget,
            BASELINE_BEST_QUALITY,
        ) {
            baselines.push(lineup);
        }
    }

    let mut best_projection: Option<GeneratedLineup> = None;
    for &captain_idx in &feasible {
        let Some(candidate) = solve_showdown_lineup(
            pool,
            groups,
            settings,
            captain_idx,
            LineupObjective::PureProjection,
            &[],
            budget,
            BASELINE_BEST_PROJECTION,
        ) else {
            continue;
        };
        let improves = match &best_projection {
            Some(current) => candidate.projected_points > current.projected_points,
            None => true,
        };
        if improves {
            best_projection = Some(candidate);
        }
    }
    if let Some(lineup) = best_projection {
        baselines.push(lineup);
    }

    baselines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::groups::build_groups;
    use crate::slate::{OpponentMap, Position};

    fn make_player(
        id: u64,
        name: &str,
        team: &str,
        position: Position,
        salary: u32,
        quality: f64,
    ) -> PoolPlayer {
        PoolPlayer {
            player_id: id,
            key: format!("{name}:{team}:{}", position.display_str()),
            name: name.into(),
            team: team.into(),
            position,
            salary,
            quality_score: quality,
            ownership: 0.10,
            projected_points: 10.0,
            implied_team_total: None,
            snap_share_delta: None,
        }
    }

    // Eight players over one game. Values (quality per dollar) rank the first
    // three players P3 > P2 > P1 ahead of the rest.
    fn ladder_pool() -> Vec<PoolPlayer> {
        vec![
            make_player(1, "P1", "AAA", Position::Quarterback, 9000, 90.0),
            make_player(2, "P2", "AAA", Position::RunningBack, 8500, 93.5),
            make_player(3, "P3", "AAA", Position::WideReceiver, 8000, 96.0),
            make_player(4, "P4", "AAA", Position::WideReceiver, 7500, 60.0),
            make_player(5, "P5", "BBB", Position::Quarterback, 7000, 49.0),
            make_player(6, "P6", "BBB", Position::TightEnd, 6500, 39.0),
            make_player(7, "P7", "BBB", Position::RunningBack, 6000, 30.0),
            make_player(8, "P8", "BBB", Position::Kicker, 5500, 22.0),
        ]
    }

    fn one_game_opponents() -> OpponentMap {
        let mut opponents = OpponentMap::new();
        opponents.insert("AAA".into(), "BBB".into());
        opponents.insert("BBB".into(), "AAA".into());
        opponents
    }

    fn showdown_settings(num_lineups: u32) -> OptimizationSettings {
        let mut settings = OptimizationSettings::default();
        settings.num_lineups = num_lineups;
        settings.contest_mode = ContestMode::Showdown;
        settings
    }

    fn budget() -> Duration {
        Duration::from_secs(10)
    }

    // ---- Candidates and feasibility ----

    #[test]
    fn candidates_rank_by_quality_per_dollar() {
        let pool = ladder_pool();
        let mut cache = CaptainCache::new();
        let candidates = captain_candidates(&pool, &mut cache);

        let names: Vec<&str> = candidates.iter().map(|&idx| pool[idx].name.as_str()).collect();
        assert_eq!(names, vec!["P3", "P2", "P1", "P4", "P5"]);
    }

    #[test]
    fn candidate_cache_is_keyed_by_player_set() {
        let pool = ladder_pool();
        let mut cache = CaptainCache::new();

        let first = captain_candidates(&pool, &mut cache);
        let second = captain_candidates(&pool, &mut cache);
        assert_eq!(first, second);
        assert_eq!(cache.len(), 1);

        let mut smaller = pool.clone();
        smaller.pop();
        captain_candidates(&smaller, &mut cache);
        assert_eq!(cache.len(), 2, "a different player set gets its own entry");
    }

    #[test]
    fn captain_feasibility_checks_the_floor_spend() {
        let pool: Vec<PoolPlayer> = (0..6)
            .map(|i| {
                let salary = if i == 0 { 9000 } else { 8000 };
                make_player(
                    i as u64 + 1,
                    &format!("P{}", i + 1),
                    "AAA",
                    Position::WideReceiver,
                    salary,
                    10.0,
                )
            })
            .collect();
        // 13500 + 5 * 8000 = 53500 over the 50000 cap.
        let err = captain_feasibility(&pool, 0).unwrap_err();
        assert!(err.contains("needs at least 53500"), "got: {err}");

        // The ladder pool's priciest captain still fits: 13500 + 32500.
        let ladder = ladder_pool();
        assert_eq!(captain_feasibility(&ladder, 0), Ok(()));
    }

    #[test]
    fn tiny_pool_fails_feasibility() {
        let pool: Vec<PoolPlayer> = (0..4)
            .map(|i| {
                make_player(
                    i as u64 + 1,
                    &format!("P{}", i + 1),
                    "AAA",
                    Position::WideReceiver,
                    5000,
                    10.0,
                )
            })
            .collect();
        let err = captain_feasibility(&pool, 0).unwrap_err();
        assert!(err.contains("leaves only 3 flex players"), "got: {err}");
    }

    // ---- Generation ----

    #[test]
    fn captains_rotate_through_the_candidates() {
        let pool = ladder_pool();
        let groups = build_groups(&pool, &one_game_opponents());
        let settings = showdown_settings(3);
        let mut cache = CaptainCache::new();

        let (lineups, reason) = generate_showdown(&pool, &groups, &settings, &mut cache, budget());
        assert_eq!(reason, None);
        assert_eq!(lineups.len(), 3);

        let captains: Vec<&str> = lineups
            .iter()
            .map(|l| l.captain().expect("every lineup has a captain").name.as_str())
            .collect();
        assert_eq!(captains, vec!["P3", "P2", "P1"]);
        for lineup in &lineups {
            assert_eq!(lineup.players.len(), 6);
            assert!(lineup.total_salary <= SALARY_CAP);
        }
    }

    #[test]
    fn locked_captain_overrides_rotation() {
        let pool = ladder_pool();
        let groups = build_groups(&pool, &one_game_opponents());
        let mut settings = showdown_settings(2);
        settings.locked_captain_id = Some(5);
        let mut cache = CaptainCache::new();

        let (lineups, reason) = generate_showdown(&pool, &groups, &settings, &mut cache, budget());
        assert_eq!(reason, None);
        assert_eq!(lineups.len(), 2);
        for lineup in &lineups {
            assert_eq!(lineup.captain().expect("captain present").name, "P5");
        }
    }

    #[test]
    fn unknown_locked_captain_fails_fast() {
        let pool = ladder_pool();
        let groups = build_groups(&pool, &one_game_opponents());
        let mut settings = showdown_settings(2);
        settings.locked_captain_id = Some(999);
        let mut cache = CaptainCache::new();

        let (lineups, reason) = generate_showdown(&pool, &groups, &settings, &mut cache, budget());
        assert!(lineups.is_empty());
        let reason = reason.expect("a reason is reported");
        assert!(reason.contains("not in the prepared pool"), "got: {reason}");
    }

    #[test]
    fn unaffordable_locked_captain_fails_fast() {
        let pool: Vec<PoolPlayer> = (0..6)
            .map(|i| {
                let salary = if i == 0 { 9000 } else { 8000 };
                make_player(
                    i as u64 + 1,
                    &format!("P{}", i + 1),
                    "AAA",
                    Position::WideReceiver,
                    salary,
                    10.0,
                )
            })
            .collect();
        let groups = build_groups(&pool, &OpponentMap::new());
        let mut settings = showdown_settings(1);
        settings.locked_captain_id = Some(1);
        settings.max_players_per_team = 6;
        let mut cache = CaptainCache::new();

        let (lineups, reason) = generate_showdown(&pool, &groups, &settings, &mut cache, budget());
        assert!(lineups.is_empty());
        assert!(reason.expect("a reason is reported").contains("needs at least"));
    }

    // ---- Baselines ----

    #[test]
    fn baselines_split_quality_and_projection_captains() {
        let mut pool = ladder_pool();
        // P1 towers in projected points; P3 keeps the quality crown.
        for player in &mut pool {
            player.projected_points = if player.name == "P1" { 60.0 } else { 10.0 };
        }
        let groups = build_groups(&pool, &one_game_opponents());
        let settings = showdown_settings(1);

        let baselines = showdown_baselines(&pool, &groups, &settings, budget());
        assert_eq!(baselines.len(), 2);

        let quality = &baselines[0];
        assert_eq!(quality.lineup_number, BASELINE_BEST_QUALITY);
        assert_eq!(quality.captain().expect("captain present").name, "P3");

        let projection = &baselines[1];
        assert_eq!(projection.lineup_number, BASELINE_BEST_PROJECTION);
        assert_eq!(projection.captain().expect("captain present").name, "P1");
        // 60 * 1.5 for the captain plus five 10-point flex players.
        let expected = 60.0 * 1.5 + 50.0;
        assert!(
            (projection.projected_points - expected).abs() < 1e-6,
            "expected {} projected points, got {}",
            expected,
            projection.projected_points
        );
    }
}
