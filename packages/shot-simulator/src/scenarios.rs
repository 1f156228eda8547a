//! scenarios.rs — Injectable capture impairments for the shot simulator
//!
//! Each scenario models one real-world way the per-channel arrival times
//! drift away from the ideal propagation model. Scenarios stack: every
//! active one is applied to each synthetic event.

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScenarioType {
    /// Gaussian per-channel trigger jitter (comparator noise, ADC phase)
    TimingJitter,
    /// Same offset added to every channel (capture clock not aligned to the shot)
    ClockOffset,
    /// One channel triggers late on an echo instead of the direct wavefront
    OutlierChannel,
    /// Timestamps snapped up to the next ADC sample boundary
    SampleQuantization,
    /// Air temperature moves the true speed of sound away from the solver's constant
    TemperatureDrift,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScenarioConfig {
    pub active: Vec<ScenarioType>,
    pub jitter_sigma_s: f64,
    pub clock_offset_s: f64,
    /// Index of the channel that hears the echo
    pub outlier_channel: usize,
    pub outlier_delay_s: f64,
    pub sample_rate_hz: f64,
    pub air_temperature_c: f64,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            active: vec![],
            jitter_sigma_s: 20e-6,
            clock_offset_s: 0.25,
            outlier_channel: 0,
            outlier_delay_s: 2e-3,
            sample_rate_hz: 48_000.0,
            air_temperature_c: 20.0,
        }
    }
}

impl ScenarioConfig {
    pub fn has(&self, s: ScenarioType) -> bool {
        self.active.contains(&s)
    }

    /// Propagation speed the physical world actually uses for this event.
    /// Dry-air approximation c ≈ 331.3 + 0.606·T(°C) when drift is active.
    pub fn true_speed_of_sound(&self, nominal_mps: f64) -> f64 {
        if self.has(ScenarioType::TemperatureDrift) {
            331.3 + 0.606 * self.air_temperature_c
        } else {
            nominal_mps
        }
    }

    /// Reject knobs that would silently corrupt or skip an impairment on an
    /// array of `sensor_count` microphones.
    pub fn validate(&self, sensor_count: usize) -> Result<()> {
        let finite = [
            ("jitter_sigma_s", self.jitter_sigma_s),
            ("clock_offset_s", self.clock_offset_s),
            ("outlier_delay_s", self.outlier_delay_s),
            ("sample_rate_hz", self.sample_rate_hz),
            ("air_temperature_c", self.air_temperature_c),
        ];
        for (field, value) in finite {
            ensure!(value.is_finite(), "scenario {field} must be finite, got {value}");
        }
        ensure!(
            self.jitter_sigma_s >= 0.0,
            "scenario jitter_sigma_s must be >= 0, got {}",
            self.jitter_sigma_s
        );
        if self.has(ScenarioType::OutlierChannel) {
            ensure!(
                self.outlier_channel < sensor_count,
                "scenario outlier_channel {} out of range for {sensor_count} microphones",
                self.outlier_channel
            );
        }
        if self.has(ScenarioType::SampleQuantization) {
            ensure!(
                self.sample_rate_hz > 0.0,
                "scenario sample_rate_hz must be > 0, got {}",
                self.sample_rate_hz
            );
        }
        Ok(())
    }

    /// ADC sample period, or `None` when quantization is off or the rate is unusable
    pub fn sample_period_s(&self) -> Option<f64> {
        if self.has(ScenarioType::SampleQuantization) && self.sample_rate_hz > 0.0 {
            Some(1.0 / self.sample_rate_hz)
        } else {
            None
        }
    }
}

/// Ideal capture: exact propagation times
pub fn preset_clean() -> ScenarioConfig {
    ScenarioConfig::default()
}

pub fn preset_jitter() -> ScenarioConfig {
    ScenarioConfig {
        active: vec![ScenarioType::TimingJitter],
        ..Default::default()
    }
}

pub fn preset_echo() -> ScenarioConfig {
    ScenarioConfig {
        active: vec![ScenarioType::OutlierChannel],
        outlier_channel: 3,
        ..Default::default()
    }
}

/// What the bench rig produces: sampled, jittery, clock started before the shot
pub fn preset_field() -> ScenarioConfig {
    ScenarioConfig {
        active: vec![
            ScenarioType::TimingJitter,
            ScenarioType::SampleQuantization,
            ScenarioType::ClockOffset,
        ],
        ..Default::default()
    }
}

pub fn preset_hot_day() -> ScenarioConfig {
    ScenarioConfig {
        active: vec![ScenarioType::TemperatureDrift],
        air_temperature_c: 40.0,
        ..Default::default()
    }
}

/// Look up a preset by its CLI name
pub fn preset(name: &str) -> Option<ScenarioConfig> {
    match name {
        "clean" => Some(preset_clean()),
        "jitter" => Some(preset_jitter()),
        "echo" => Some(preset_echo()),
        "field" => Some(preset_field()),
        "hot_day" => Some(preset_hot_day()),
        _ => None,
    }
}
