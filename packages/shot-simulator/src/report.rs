//! report.rs — Per-trial JSON-lines reports and run summary
//!
//! Every trial is written as one JSON object per line, to stdout or a file.
//! Write errors are logged and never abort a run.

use std::fs::File;
use std::io::{self, BufWriter, Write};

use serde::Serialize;
use shot_locator::{FailureReason, SolveError, SolveResult};
use shot_types::{angular_difference, Point3, ShotEstimate, Solution};
use tracing::{debug, warn};

// ── Trial report ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Converged,
    BudgetExhausted,
    Diverged,
    InvalidInput,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrialReport {
    pub trial: usize,
    pub outcome: Outcome,
    pub truth: ShotEstimate,
    /// Converged estimate, or best iterate on non-convergence
    pub estimate: Option<ShotEstimate>,
    pub iterations: usize,
    pub loss: Option<f64>,
    pub position_error_m: Option<f64>,
    pub time_error_s: Option<f64>,
    /// Bearing error seen from the array center, radians
    pub azimuth_error_rad: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TrialReport {
    pub fn new(trial: usize, truth: ShotEstimate, result: &SolveResult<Solution>) -> Self {
        let (outcome, estimate, iterations, loss, error) = match result {
            Ok(sol) => (Outcome::Converged, Some(sol.estimate), sol.iterations, Some(sol.loss), None),
            Err(SolveError::NotConverged(f)) => {
                let outcome = match f.reason {
                    FailureReason::BudgetExhausted => Outcome::BudgetExhausted,
                    FailureReason::Diverged => Outcome::Diverged,
                };
                (outcome, Some(f.best), f.iterations, Some(f.loss), Some(f.to_string()))
            }
            Err(e @ SolveError::InvalidInput(_)) => (Outcome::InvalidInput, None, 0, None, Some(e.to_string())),
        };

        let center = Point3::origin();
        Self {
            trial,
            outcome,
            truth,
            estimate,
            iterations,
            loss,
            position_error_m: estimate.map(|e| e.position.dist(&truth.position)),
            time_error_s: estimate.map(|e| e.time - truth.time),
            azimuth_error_rad: estimate.map(|e| {
                angular_difference(e.azimuth_from(&center), truth.azimuth_from(&center))
            }),
            error,
        }
    }
}

// ── Run summary ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    pub trials: usize,
    pub converged: usize,
    pub not_converged: usize,
    pub invalid: usize,
    /// Median position error over converged trials
    pub median_position_error_m: Option<f64>,
    /// Worst absolute azimuth error over converged trials
    pub max_azimuth_error_rad: Option<f64>,
    /// Mean iterations over converged trials
    pub mean_iterations: Option<f64>,
}

impl Summary {
    pub fn from_reports(reports: &[TrialReport]) -> Self {
        let converged: Vec<&TrialReport> =
            reports.iter().filter(|r| r.outcome == Outcome::Converged).collect();

        let mut errors: Vec<f64> = converged.iter().filter_map(|r| r.position_error_m).collect();
        errors.sort_by(|a, b| a.total_cmp(b));
        let median = match errors.len() {
            0 => None,
            n if n % 2 == 1 => Some(errors[n / 2]),
            n => Some((errors[n / 2 - 1] + errors[n / 2]) / 2.0),
        };

        let max_az = converged
            .iter()
            .filter_map(|r| r.azimuth_error_rad)
            .map(f64::abs)
            .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))));

        let mean_iterations = if converged.is_empty() {
            None
        } else {
            Some(converged.iter().map(|r| r.iterations as f64).sum::<f64>() / converged.len() as f64)
        };

        Self {
            trials: reports.len(),
            converged: converged.len(),
            not_converged: reports
                .iter()
                .filter(|r| matches!(r.outcome, Outcome::BudgetExhausted | Outcome::Diverged))
                .count(),
            invalid: reports.iter().filter(|r| r.outcome == Outcome::InvalidInput).count(),
            median_position_error_m: median,
            max_azimuth_error_rad: max_az,
            mean_iterations,
        }
    }

    pub fn convergence_rate(&self) -> f64 {
        if self.trials == 0 { 0.0 } else { self.converged as f64 / self.trials as f64 }
    }
}

// ── Sink ──────────────────────────────────────────────────────────────────────

pub struct ReportSink {
    writer: Box<dyn Write + Send>,
    label: String,
}

impl ReportSink {
    pub fn stdout() -> Self {
        Self { writer: Box::new(io::stdout()), label: "stdout".to_string() }
    }

    pub fn file(path: &str) -> Result<Self, io::Error> {
        let f = File::create(path)?;
        Ok(Self { writer: Box::new(BufWriter::new(f)), label: path.to_string() })
    }

    #[cfg(test)]
    fn from_writer(writer: Box<dyn Write + Send>) -> Self {
        Self { writer, label: "test".to_string() }
    }

    /// Write one record as a JSON line. Errors are logged, never returned.
    pub fn emit<T: Serialize>(&mut self, record: &T) {
        let line = match serde_json::to_string(record) {
            Ok(s) => s,
            Err(e) => { warn!("report: serialize failed: {e}"); return; }
        };
        if let Err(e) = writeln!(self.writer, "{line}") {
            warn!("report: write to {} failed: {e}", self.label);
        } else {
            debug!("report → {} ({} bytes)", self.label, line.len());
        }
    }

    pub fn flush(&mut self) {
        if let Err(e) = self.writer.flush() {
            warn!("report: flush of {} failed: {e}", self.label);
        }
    }
}
