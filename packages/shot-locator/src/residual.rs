//! residual.rs — Forward model: predicted arrival times, residuals, loss
//!
//! For a candidate shot (p, t) the wavefront reaches sensor i at
//!   t_i = t + ||p - q_i|| / c
//! and the loss is the mean of the squared per-sensor residuals.

use shot_types::{Meters, Point3, Seconds, ShotEstimate};

use crate::config::ResidualKind;
use crate::geometry::distance;

/// Observed times closer to zero than this (1 ns) are not used as a divisor;
/// their residual falls back to the absolute error.
pub const MIN_RELATIVE_SCALE: Seconds = 1e-9;

/// Arrival time at `sensor` for a shot at `estimate`.
pub fn predict_time(estimate: &ShotEstimate, sensor: &Point3, speed_of_sound: f64) -> Seconds {
    estimate.time + distance(&estimate.position, sensor) / speed_of_sound
}

/// Arrival times at every sensor, index-aligned with `positions`.
pub fn predict_times(estimate: &ShotEstimate, positions: &[Point3], speed_of_sound: f64) -> Vec<Seconds> {
    positions
        .iter()
        .map(|q| predict_time(estimate, q, speed_of_sound))
        .collect()
}

/// Divisor applied to `observed - predicted` for this observation.
pub fn residual_scale(observed: Seconds, kind: ResidualKind) -> f64 {
    match kind {
        ResidualKind::Relative if observed.abs() >= MIN_RELATIVE_SCALE => observed,
        _ => 1.0,
    }
}

pub fn residual(observed: Seconds, predicted: Seconds, kind: ResidualKind) -> f64 {
    (observed - predicted) / residual_scale(observed, kind)
}

/// Mean of the squares; 0 for an empty slice.
pub fn mean_square(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().map(|v| v * v).sum::<f64>() / values.len() as f64
}

// ── Full evaluation of one iterate ────────────────────────────────────────────

/// What the update step needs to know about one sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorTerm {
    pub residual: f64,
    /// Divisor used to form `residual` (observed time, or 1)
    pub scale: f64,
    /// Distance from the iterate's position to the sensor
    pub distance: Meters,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub terms: Vec<SensorTerm>,
    pub loss: f64,
}

/// Forward pass: distance, residual and loss for `estimate` against every sensor.
pub fn evaluate(
    estimate: &ShotEstimate,
    times: &[Seconds],
    positions: &[Point3],
    speed_of_sound: f64,
    kind: ResidualKind,
) -> Evaluation {
    let terms: Vec<SensorTerm> = times
        .iter()
        .zip(positions)
        .map(|(&observed, q)| {
            let d = distance(&estimate.position, q);
            let predicted = estimate.time + d / speed_of_sound;
            SensorTerm {
                residual: residual(observed, predicted, kind),
                scale: residual_scale(observed, kind),
                distance: d,
            }
        })
        .collect();
    let residuals: Vec<f64> = terms.iter().map(|t| t.residual).collect();
    Evaluation { loss: mean_square(&residuals), terms }
}
