//! replay.rs — Solve a recorded capture from disk
//!
//! Capture format (JSON):
//! ```json
//! { "label": "range day 3", "positions": [[10,0,0], [-10,0,0], ...], "times": [0.0291, ...] }
//! ```
//! `positions[i]` is the microphone that produced `times[i]`.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use shot_locator::{locate, SolveError, SolverConfig};
use shot_types::{Point3, Seconds, SensorArray, ShotEstimate};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Capture {
    #[serde(default)]
    pub label: Option<String>,
    pub positions: Vec<[f64; 3]>,
    pub times: Vec<Seconds>,
}

impl Capture {
    pub fn sensor_array(&self) -> SensorArray {
        SensorArray::new(self.positions.iter().copied().map(Point3::from).collect())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub label: Option<String>,
    pub converged: bool,
    pub estimate: Option<ShotEstimate>,
    pub azimuth_deg: Option<f64>,
    pub iterations: usize,
    pub loss: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn parse_capture(json: &str) -> Result<Capture> {
    serde_json::from_str(json).context("capture is not valid JSON of the expected shape")
}

pub fn load_capture(path: impl AsRef<Path>) -> Result<Capture> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading capture {}", path.display()))?;
    parse_capture(&raw).with_context(|| format!("parsing capture {}", path.display()))
}

/// Run one capture through the solver. Precondition errors are returned;
/// non-convergence is reported with the best estimate.
pub fn replay(capture: &Capture, cfg: &SolverConfig) -> Result<ReplayReport> {
    let array = capture.sensor_array();
    let center = Point3::origin();
    match locate(&array, &capture.times, cfg) {
        Ok(sol) => {
            info!(
                "replay converged: ({:.2}, {:.2}, {:.2}) m at t={:.6}s after {} iterations",
                sol.estimate.position.x, sol.estimate.position.y, sol.estimate.position.z,
                sol.estimate.time, sol.iterations
            );
            Ok(ReplayReport {
                label: capture.label.clone(),
                converged: true,
                estimate: Some(sol.estimate),
                azimuth_deg: Some(sol.estimate.azimuth_from(&center).to_degrees()),
                iterations: sol.iterations,
                loss: Some(sol.loss),
                error: None,
            })
        }
        Err(SolveError::NotConverged(f)) => {
            warn!("replay did not converge: {f}");
            Ok(ReplayReport {
                label: capture.label.clone(),
                converged: false,
                estimate: Some(f.best),
                azimuth_deg: Some(f.best.azimuth_from(&center).to_degrees()),
                iterations: f.iterations,
                loss: Some(f.loss),
                error: Some(f.to_string()),
            })
        }
        Err(e @ SolveError::InvalidInput(_)) => Err(e).context("capture rejected by solver"),
    }
}
