//! solver.rs — Gradient-descent shot localization
//!
//! Algorithm: normalized gradient descent on
//!   L(p, t) = (1/N) Σ_i r_i²,   r_i = (o_i - t - ||p - q_i||/c) / w_i
//! where w_i = o_i for relative residuals (1 when o_i ≈ 0) and w_i = 1 for absolute.
//!
//! Each iteration takes the exact gradient of L with respect to the time and the
//! position blocks separately, divides each by that block's Gauss-Newton
//! curvature (Σ J², so the step carries the block's own units) and scales it by
//! `step_scale_time` / `step_scale_space`. Step scales are therefore
//! dimensionless; the linearized iteration is stable below 1.
//!
//! Start point: earliest arrival time, array centroid.

use shot_types::{Point3, Seconds, SensorArray, ShotEstimate, Solution};
use tracing::{debug, trace, warn};

use crate::config::SolverConfig;
use crate::error::{ConvergenceFailure, FailureReason, InputError, SolveResult};
use crate::geometry::{centroid, distance_gradient};
use crate::residual::{evaluate, Evaluation};

// ── Gradient ──────────────────────────────────────────────────────────────────

/// Loss gradient split into time and position blocks, with each block's
/// Gauss-Newton curvature (2/N Σ J²).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Gradient {
    pub time: f64,
    pub time_curvature: f64,
    pub space: Point3,
    pub space_curvature: f64,
}

/// Gradient of the loss at `iterate`, given its forward evaluation.
///
/// A sensor the iterate sits on (distance ≤ `DISTANCE_EPSILON`) contributes
/// nothing to the position block.
pub fn loss_gradient(
    iterate: &ShotEstimate,
    eval: &Evaluation,
    positions: &[Point3],
    speed_of_sound: f64,
) -> Gradient {
    let mut g = Gradient::default();
    if eval.terms.is_empty() {
        return g;
    }
    let n = eval.terms.len() as f64;

    for (term, q) in eval.terms.iter().zip(positions) {
        // ∂r/∂t = -1/w
        let j_t = -1.0 / term.scale;
        g.time += 2.0 * term.residual * j_t / n;
        g.time_curvature += 2.0 * j_t * j_t / n;

        // ∂r/∂p = -(∂d/∂p) / (c·w),  ∂d/∂p_a = (p_a - q_a)/d
        if let Some(dd) = distance_gradient(&iterate.position, q) {
            let k = -1.0 / (speed_of_sound * term.scale);
            g.space = g.space.add(&dd.scale(2.0 * term.residual * k / n));
            g.space_curvature += 2.0 * k * k / n;
        }
    }
    g
}

/// One descent update. Blocks with zero curvature are left unchanged.
pub fn descend(iterate: &ShotEstimate, g: &Gradient, config: &SolverConfig) -> ShotEstimate {
    let mut next = *iterate;
    if g.time_curvature > 0.0 {
        next.time -= config.step_scale_time * g.time / g.time_curvature;
    }
    if g.space_curvature > 0.0 {
        next.position = next
            .position
            .sub(&g.space.scale(config.step_scale_space / g.space_curvature));
    }
    next
}

// ── Preconditions ─────────────────────────────────────────────────────────────

fn check_inputs(times: &[Seconds], positions: &[Point3], config: &SolverConfig) -> Result<(), InputError> {
    if times.is_empty() || positions.is_empty() {
        return Err(InputError::Empty);
    }
    if times.len() != positions.len() {
        return Err(InputError::LengthMismatch { times: times.len(), positions: positions.len() });
    }
    if let Some(index) = times.iter().position(|t| !t.is_finite()) {
        return Err(InputError::NonFiniteTime { index });
    }
    if let Some(index) = positions.iter().position(|p| !p.is_finite()) {
        return Err(InputError::NonFinitePosition { index });
    }
    config.validate()
}

/// Starting iterate: the earliest arrival time at the array centroid.
pub fn initial_estimate(times: &[Seconds], positions: &[Point3]) -> Result<ShotEstimate, InputError> {
    let position = centroid(positions).ok_or(InputError::Empty)?;
    let time = times.iter().copied().fold(f64::INFINITY, f64::min);
    if !time.is_finite() {
        return Err(InputError::Empty);
    }
    Ok(ShotEstimate { position, time })
}

// ── Main solve ────────────────────────────────────────────────────────────────

/// Estimate where and when a shot was fired from per-microphone arrival times.
///
/// Parameters:
/// - `times`: arrival time at each microphone, any common clock origin
/// - `positions`: microphone positions, index-aligned with `times`
/// - `config`: tolerances, step scales, iteration budget, speed of sound
///
/// Returns the converged [`Solution`], or:
/// - `SolveError::InvalidInput` before any iteration if the inputs or config are unusable
/// - `SolveError::NotConverged` carrying the lowest-loss iterate when the budget
///   runs out or the iterate blows up
pub fn find_shot_source(
    times: &[Seconds],
    positions: &[Point3],
    config: &SolverConfig,
) -> SolveResult<Solution> {
    check_inputs(times, positions, config)?;
    let c = config.speed_of_sound;

    let mut iterate = initial_estimate(times, positions)?;
    let mut best = iterate;
    let mut best_loss = f64::INFINITY;

    debug!(
        "solve start: {} sensors, t0={:.6}s, p0=({:.3}, {:.3}, {:.3}), tol={:e}",
        times.len(), iterate.time, iterate.position.x, iterate.position.y, iterate.position.z,
        config.error_tolerance
    );

    for iteration in 0..=config.max_iterations {
        let eval = evaluate(&iterate, times, positions, c, config.residual);

        trace!(
            "iter {iteration}: t={:.9} p=({:.4}, {:.4}, {:.4}) loss={:.3e}",
            iterate.time, iterate.position.x, iterate.position.y, iterate.position.z, eval.loss
        );

        if !eval.loss.is_finite() || !iterate.is_finite() {
            warn!("solve diverged at iteration {iteration}; best loss {best_loss:.3e}");
            return Err(ConvergenceFailure {
                best,
                loss: best_loss,
                iterations: iteration,
                reason: FailureReason::Diverged,
            }
            .into());
        }

        if eval.loss < best_loss {
            best = iterate;
            best_loss = eval.loss;
        }

        if eval.loss <= config.error_tolerance {
            debug!("solve converged after {iteration} iterations, loss {:.3e}", eval.loss);
            return Ok(Solution { estimate: iterate, iterations: iteration, loss: eval.loss });
        }

        if iteration == config.max_iterations {
            break;
        }

        let g = loss_gradient(&iterate, &eval, positions, c);
        iterate = descend(&iterate, &g, config);
    }

    warn!(
        "solve did not converge in {} iterations; best loss {best_loss:.3e} > tol {:e}",
        config.max_iterations, config.error_tolerance
    );
    Err(ConvergenceFailure {
        best,
        loss: best_loss,
        iterations: config.max_iterations,
        reason: FailureReason::BudgetExhausted,
    }
    .into())
}

/// [`find_shot_source`] against a deployed [`SensorArray`].
pub fn locate(array: &SensorArray, times: &[Seconds], config: &SolverConfig) -> SolveResult<Solution> {
    find_shot_source(times, array.positions(), config)
}
