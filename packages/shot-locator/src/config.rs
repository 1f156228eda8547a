//! config.rs — Solver tuning knobs
//!
//! Loaded from the `[solver]` table of a TOML file (serde defaults fill gaps),
//! or from `SHOT_*` environment variables layered over the defaults.

use serde::{Deserialize, Serialize};
use shot_types::SPEED_OF_SOUND_MPS;

use crate::error::InputError;

// ── Residual metric ───────────────────────────────────────────────────────────

/// How a per-sensor timing mismatch is turned into a residual.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResidualKind {
    /// `(observed - predicted) / observed`; absolute when `observed` is ~0
    #[default]
    Relative,
    /// `observed - predicted`, seconds
    Absolute,
}

// ── Solver configuration ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Stop once the mean squared residual is at or below this
    pub error_tolerance: f64,
    /// Fraction of the time-block Gauss-Newton step taken per iteration
    pub step_scale_time: f64,
    /// Fraction of the position-block Gauss-Newton step taken per iteration
    pub step_scale_space: f64,
    /// Upper bound on update steps before giving up
    pub max_iterations: usize,
    /// Propagation speed in the medium, m/s
    pub speed_of_sound: f64,
    /// Residual metric; see [`ResidualKind`]
    pub residual: ResidualKind,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            error_tolerance: 1e-6,
            step_scale_time: 0.3,
            step_scale_space: 0.3,
            max_iterations: 5000,
            speed_of_sound: SPEED_OF_SOUND_MPS,
            residual: ResidualKind::Relative,
        }
    }
}

impl SolverConfig {
    /// Defaults overridden by `SHOT_ERROR_TOLERANCE`, `SHOT_STEP_SCALE_TIME`,
    /// `SHOT_STEP_SCALE_SPACE`, `SHOT_MAX_ITERATIONS` and `SHOT_SPEED_OF_SOUND`.
    /// Unset or unparsable variables keep the default.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let d = Self::default();
        let parse_f64 = |key: &str, fallback: f64| {
            lookup(key).and_then(|v| v.trim().parse().ok()).unwrap_or(fallback)
        };
        Self {
            error_tolerance: parse_f64("SHOT_ERROR_TOLERANCE", d.error_tolerance),
            step_scale_time: parse_f64("SHOT_STEP_SCALE_TIME", d.step_scale_time),
            step_scale_space: parse_f64("SHOT_STEP_SCALE_SPACE", d.step_scale_space),
            max_iterations: lookup("SHOT_MAX_ITERATIONS")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(d.max_iterations),
            speed_of_sound: parse_f64("SHOT_SPEED_OF_SOUND", d.speed_of_sound),
            residual: d.residual,
        }
    }

    pub fn with_tolerance(mut self, error_tolerance: f64) -> Self {
        self.error_tolerance = error_tolerance;
        self
    }

    pub fn with_step_scales(mut self, time: f64, space: f64) -> Self {
        self.step_scale_time = time;
        self.step_scale_space = space;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_residual(mut self, residual: ResidualKind) -> Self {
        self.residual = residual;
        self
    }

    /// Check every field is usable before a solve starts.
    pub fn validate(&self) -> Result<(), InputError> {
        let positive = [
            ("error_tolerance", self.error_tolerance),
            ("step_scale_time", self.step_scale_time),
            ("step_scale_space", self.step_scale_space),
            ("speed_of_sound", self.speed_of_sound),
        ];
        for (field, value) in positive {
            if !value.is_finite() {
                return Err(InputError::NonFiniteConfig { field });
            }
            if value <= 0.0 {
                return Err(InputError::NonPositive { field, value });
            }
        }
        if self.max_iterations == 0 {
            return Err(InputError::ZeroIterations);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_is_valid() {
        assert!(SolverConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_non_positive_fields() {
        let cfg = SolverConfig::default().with_tolerance(0.0);
        assert_eq!(
            cfg.validate(),
            Err(InputError::NonPositive { field: "error_tolerance", value: 0.0 })
        );

        let cfg = SolverConfig::default().with_step_scales(0.1, -1.0);
        assert!(matches!(
            cfg.validate(),
            Err(InputError::NonPositive { field: "step_scale_space", .. })
        ));

        let cfg = SolverConfig { speed_of_sound: 0.0, ..Default::default() };
        assert!(matches!(
            cfg.validate(),
            Err(InputError::NonPositive { field: "speed_of_sound", .. })
        ));
    }

    #[test]
    fn test_rejects_nan_and_zero_budget() {
        let cfg = SolverConfig::default().with_step_scales(f64::NAN, 0.1);
        assert_eq!(cfg.validate(), Err(InputError::NonFiniteConfig { field: "step_scale_time" }));

        let cfg = SolverConfig::default().with_max_iterations(0);
        assert_eq!(cfg.validate(), Err(InputError::ZeroIterations));
    }

    #[test]
    fn test_env_overlay() {
        let vars: HashMap<&str, &str> = [
            ("SHOT_ERROR_TOLERANCE", "1e-9"),
            ("SHOT_MAX_ITERATIONS", " 250 "),
            ("SHOT_SPEED_OF_SOUND", "not-a-number"),
        ]
        .into_iter()
        .collect();
        let cfg = SolverConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.error_tolerance, 1e-9);
        assert_eq!(cfg.max_iterations, 250);
        assert_eq!(cfg.speed_of_sound, SPEED_OF_SOUND_MPS);
        assert_eq!(cfg.step_scale_time, SolverConfig::default().step_scale_time);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let cfg: SolverConfig = toml::from_str(
            "error_tolerance = 1e-3\nmax_iterations = 1000\nresidual = \"absolute\"\n",
        )
        .unwrap();
        assert_eq!(cfg.error_tolerance, 1e-3);
        assert_eq!(cfg.max_iterations, 1000);
        assert_eq!(cfg.residual, ResidualKind::Absolute);
        assert_eq!(cfg.step_scale_space, 0.3);
    }
}
