use serde::{Deserialize, Serialize};

use super::DofMap;
use crate::energy::*;

#[derive(Copy, Clone, Debug, PartialEq, PartialOrd, Serialize, Deserialize)]
pub enum LineSearch {
    /// Backtracking line search method decreases the step `α` by `rho` to
    /// satisfy the sufficient decrease condition:
    /// f(xₖ + αpₖ) ≤ f(xₖ) + cα∇fₖᵀpₖ
    /// Infeasible trial points are always rejected. At most `max_steps` trial points are tried.
    BackTracking { c: f64, rho: f64, max_steps: u32 },
    /// Always take the full step unless it is infeasible.
    None,
}

impl Default for LineSearch {
    fn default() -> LineSearch {
        LineSearch::default_backtracking()
    }
}

impl LineSearch {
    pub const fn default_backtracking() -> Self {
        LineSearch::BackTracking {
            c: 1e-4,
            rho: 0.5,
            max_steps: 40,
        }
    }

    /// Gets the factor by which the step size should be decreased.
    pub fn step_factor(&self) -> f64 {
        match self {
            LineSearch::BackTracking { rho, .. } => *rho,
            LineSearch::None => 1.0,
        }
    }

    // Gets the coefficient for the Armijo condition.
    pub fn armijo_coeff(&self) -> f64 {
        match self {
            LineSearch::BackTracking { c, .. } => *c,
            LineSearch::None => 0.0,
        }
    }

    /// Maximum number of trial points.
    pub fn max_steps(&self) -> u32 {
        match self {
            LineSearch::BackTracking { max_steps, .. } => (*max_steps).max(1),
            LineSearch::None => 1,
        }
    }

    pub(crate) fn validate(&self) -> bool {
        match *self {
            LineSearch::BackTracking { c, rho, .. } => {
                c >= 0.0 && c < 1.0 && rho > 0.0 && rho < 1.0
            }
            LineSearch::None => true,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum LineSearchOutcome {
    /// The step `α` was accepted with the given energy after `steps` trial points.
    Accepted { alpha: f64, energy: f64, steps: u32 },
    /// Every trial point was rejected and the variables were restored.
    Exhausted { steps: u32 },
}

impl LineSearchOutcome {
    pub fn steps(&self) -> u32 {
        match *self {
            LineSearchOutcome::Accepted { steps, .. } | LineSearchOutcome::Exhausted { steps } => {
                steps
            }
        }
    }

    /// Accepted step size, zero if exhausted.
    pub fn alpha(&self) -> f64 {
        match *self {
            LineSearchOutcome::Accepted { alpha, .. } => alpha,
            LineSearchOutcome::Exhausted { .. } => 0.0,
        }
    }
}

/// Search along `direction` starting from the feasible point `x0` with energy `energy0`.
///
/// `slope` is the directional derivative `∇fᵀp` at `x0`. Only free variables are updated, so
/// fixed entries of `x` keep the values they had in `x0`. On success `x` holds the accepted
/// point; otherwise it is restored to `x0`.
#[allow(clippy::too_many_arguments)]
pub fn line_search<F>(
    params: &LineSearch,
    dof_map: &DofMap,
    x0: &[f64],
    direction: &[f64],
    energy0: f64,
    slope: f64,
    x: &mut [f64],
    mut energy: F,
) -> LineSearchOutcome
where
    F: FnMut(&[f64]) -> EnergyValue,
{
    let rho = params.step_factor();
    let c = params.armijo_coeff();
    let max_steps = params.max_steps();
    let mut alpha = 1.0;

    for step in 1..=max_steps {
        dof_map.apply_step(x, x0, direction, alpha);
        match energy(x) {
            Feasibility::Feasible(e) => {
                let accept = match params {
                    LineSearch::BackTracking { .. } => e <= energy0 + c * alpha * slope,
                    LineSearch::None => true,
                };
                if accept {
                    return LineSearchOutcome::Accepted {
                        alpha,
                        energy: e,
                        steps: step,
                    };
                }
            }
            Feasibility::Infeasible => {
                log::trace!("Rejected infeasible step α = {:.3e}", alpha);
            }
        }
        alpha *= rho;
    }

    x.copy_from_slice(x0);
    LineSearchOutcome::Exhausted { steps: max_steps }
}
