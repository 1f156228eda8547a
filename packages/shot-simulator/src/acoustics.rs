//! acoustics.rs — Synthetic shot events and the capture chain
//!
//! Produces what the microphone front-end would hand the solver:
//! 1. Draw a source position and emission time
//! 2. Propagate the wavefront to every microphone (straight line, constant c)
//! 3. Apply the active capture impairments from `ScenarioConfig`
//!
//! The ground truth is kept alongside the times so each trial can be scored.

use rand::Rng;
use rand_distr::{Distribution, Normal, NormalError};
use serde::{Deserialize, Serialize};
use shot_locator::residual::predict_times;
use shot_types::{Meters, Point3, Seconds, SensorArray, ShotEstimate, SPEED_OF_SOUND_MPS};

use crate::scenarios::{ScenarioConfig, ScenarioType};

// ── Source model configuration ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcousticConfig {
    /// Nominal propagation speed used to synthesize arrival times
    pub speed_of_sound_mps: f64,
    /// Sources are drawn uniformly over a disk of this radius around the array center
    pub source_radius_m: Meters,
    /// Source height is drawn uniformly from ±this
    pub source_height_m: Meters,
    /// Emission time is drawn uniformly from [0, this]
    pub emission_time_max_s: Seconds,
}

impl Default for AcousticConfig {
    fn default() -> Self {
        Self {
            speed_of_sound_mps: SPEED_OF_SOUND_MPS,
            source_radius_m: 8.0,
            source_height_m: 0.0,
            emission_time_max_s: 0.1,
        }
    }
}

/// One synthetic shot: what really happened and what the microphones reported.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyntheticEvent {
    pub truth: ShotEstimate,
    pub times: Vec<Seconds>,
}

// ── Generation ────────────────────────────────────────────────────────────────

/// Random source inside the configured volume, area-uniform over the disk.
pub fn draw_source(cfg: &AcousticConfig, rng: &mut impl Rng) -> ShotEstimate {
    let r = cfg.source_radius_m.max(0.0) * rng.gen::<f64>().sqrt();
    let a = rng.gen_range(-std::f64::consts::PI..std::f64::consts::PI);
    let h = cfg.source_height_m.abs();
    let z = if h > 0.0 { rng.gen_range(-h..=h) } else { 0.0 };
    let t_max = cfg.emission_time_max_s.max(0.0);
    let t = if t_max > 0.0 { rng.gen_range(0.0..=t_max) } else { 0.0 };
    ShotEstimate::new(Point3::new(r * a.cos(), r * a.sin(), z), t)
}

/// Exact arrival times of a wavefront from `truth` at every sensor.
pub fn propagate(truth: &ShotEstimate, array: &SensorArray, speed_mps: f64) -> Vec<Seconds> {
    predict_times(truth, array.positions(), speed_mps)
}

/// Apply the active impairments in capture order: physics (echo), front-end
/// (jitter), clock (offset), then ADC sampling (quantization).
///
/// Expects a scenario that passed [`ScenarioConfig::validate`].
pub fn impair(times: &mut [Seconds], scenario: &ScenarioConfig, rng: &mut impl Rng) -> Result<(), NormalError> {
    if scenario.has(ScenarioType::OutlierChannel) {
        if let Some(t) = times.get_mut(scenario.outlier_channel) {
            *t += scenario.outlier_delay_s;
        }
    }
    if scenario.has(ScenarioType::TimingJitter) {
        let jitter = Normal::new(0.0, scenario.jitter_sigma_s)?;
        for t in times.iter_mut() {
            *t += jitter.sample(rng);
        }
    }
    if scenario.has(ScenarioType::ClockOffset) {
        for t in times.iter_mut() {
            *t += scenario.clock_offset_s;
        }
    }
    if let Some(period) = scenario.sample_period_s() {
        for t in times.iter_mut() {
            *t = (*t / period).ceil() * period;
        }
    }
    Ok(())
}

/// Draw a source, propagate it and run it through the capture chain.
pub fn generate_event(
    array: &SensorArray,
    cfg: &AcousticConfig,
    scenario: &ScenarioConfig,
    rng: &mut impl Rng,
) -> Result<SyntheticEvent, NormalError> {
    let truth = draw_source(cfg, rng);
    let speed = scenario.true_speed_of_sound(cfg.speed_of_sound_mps);
    let mut times = propagate(&truth, array, speed);
    impair(&mut times, scenario, rng)?;

    // the clock offset moves the emission instant the solver should find
    let truth = if scenario.has(ScenarioType::ClockOffset) {
        ShotEstimate::new(truth.position, truth.time + scenario.clock_offset_s)
    } else {
        truth
    };
    Ok(SyntheticEvent { truth, times })
}
