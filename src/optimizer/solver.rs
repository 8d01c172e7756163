// Thin facade over the MILP backend: objective and constraints in, selected
// pool indices out.

use good_lp::{
    Constraint, Expression, ProblemVariables, ResolutionError, Solution, SolverModel, Variable,
    default_solver,
};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SolveFailure {
    #[error("model is infeasible under the current constraints")]
    Infeasible,
    #[error("model is unbounded")]
    Unbounded,
    #[error("solver backend error: {0}")]
    Backend(String),
}

/// Solve a maximization problem against the configured backend. The time
/// budget is forwarded to backends that honor wall-clock limits; the pure-Rust
/// backend runs to completion.
pub fn maximize(
    vars: ProblemVariables,
    objective: Expression,
    constraints: Vec<Constraint>,
    budget: Duration,
) -> Result<impl Solution, SolveFailure> {
    let mut model = vars.maximise(objective).using(default_solver);
    #[cfg(feature = "coin_cbc")]
    {
        model.set_parameter("log", "0");
        model.set_parameter("sec", &budget.as_secs().max(1).to_string());
    }
    #[cfg(not(feature = "coin_cbc"))]
    let _ = &budget;

    for constraint in constraints {
        model = model.with(constraint);
    }

    match model.solve() {
        Ok(solution) => Ok(solution),
        Err(ResolutionError::Infeasible) => Err(SolveFailure::Infeasible),
        Err(ResolutionError::Unbounded) => Err(SolveFailure::Unbounded),
        Err(other) => Err(SolveFailure::Backend(other.to_string())),
    }
}

/// Pool indices whose binary variable came back set.
pub fn selected_indices(solution: &impl Solution, x: &[Variable]) -> Vec<usize> {
    x.iter()
        .enumerate()
        .filter(|(_, &var)| solution.value(var) > 0.5)
        .map(|(idx, _)| idx)
        .collect()
}
