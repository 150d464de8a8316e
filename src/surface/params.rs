#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Result, SynthError};

/// Shared tuning of one surface material.
///
/// Speeds are in m/s, frequencies in Hz, times in seconds. Hardness is the
/// inverse of the impact pulse width, so it is also in 1/s.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceParams {
    /// Contact amplitude per unit of normal force.
    pub contact_gain: f32,
    /// Extra amplitude when slip speed is near zero (rolling).
    pub rolling_boost: f32,
    /// Slip speed below which the rolling boost applies.
    pub rolling_speed: f32,
    pub cutoff_min: f32,
    pub cutoff_max: f32,
    /// Cutoff rise per m/s of slip.
    pub cutoff_per_speed: f32,
    /// Time constant of the amplitude smoother.
    pub amp_smoothing_time: f32,

    pub quiet_amp: f32,
    pub quiet_speed: f32,
    /// A quiet contact wakes up again above this slip or contact speed.
    pub wake_speed: f32,

    pub hardness: f32,
    /// Impulse above which the surface stiffens.
    pub hardness_breakpoint: f32,
    pub hardness_slope: f32,
    pub hardness_exponent: f32,
    pub max_hardness: f32,
    /// Impact amplitude per unit of impulse.
    pub impact_gain: f32,

    /// Tangential impact speed above which a skid is added.
    pub skid_speed: f32,
    pub skid_time: f32,
    /// Skid force per unit of impulse.
    pub skid_gain: f32,
}

impl Default for SurfaceParams {
    fn default() -> Self {
        Self {
            contact_gain: 0.05,
            rolling_boost: 2.0,
            rolling_speed: 0.05,
            cutoff_min: 200.0,
            cutoff_max: 12_000.0,
            cutoff_per_speed: 4_000.0,
            amp_smoothing_time: 0.01,

            quiet_amp: 1.0e-4,
            quiet_speed: 0.01,
            wake_speed: 0.02,

            hardness: 2_000.0,
            hardness_breakpoint: 1.0,
            hardness_slope: 1_000.0,
            hardness_exponent: 1.0,
            max_hardness: 20_000.0,
            impact_gain: 1.0,

            skid_speed: 0.5,
            skid_time: 0.08,
            skid_gain: 1.0,
        }
    }
}

impl SurfaceParams {
    pub fn validate(&self) -> Result<()> {
        if let Some((name, value)) = self.values().into_iter().find(|(_, v)| !v.is_finite()) {
            return Err(SynthError::Configuration(format!(
                "surface parameter {name} is {value}"
            )));
        }
        if self.cutoff_min < 0.0 || self.cutoff_max < self.cutoff_min {
            return Err(SynthError::Configuration(format!(
                "cutoff range {}..{} is empty",
                self.cutoff_min, self.cutoff_max
            )));
        }
        if self.hardness <= 0.0 || self.max_hardness < self.hardness {
            return Err(SynthError::Configuration(format!(
                "hardness {} must be positive and at most {}",
                self.hardness, self.max_hardness
            )));
        }
        if self.amp_smoothing_time < 0.0 || self.skid_time < 0.0 {
            return Err(SynthError::Configuration(
                "surface times must not be negative".into(),
            ));
        }
        Ok(())
    }

    fn values(&self) -> [(&'static str, f32); 19] {
        [
            ("contact_gain", self.contact_gain),
            ("rolling_boost", self.rolling_boost),
            ("rolling_speed", self.rolling_speed),
            ("cutoff_min", self.cutoff_min),
            ("cutoff_max", self.cutoff_max),
            ("cutoff_per_speed", self.cutoff_per_speed),
            ("amp_smoothing_time", self.amp_smoothing_time),
            ("quiet_amp", self.quiet_amp),
            ("quiet_speed", self.quiet_speed),
            ("wake_speed", self.wake_speed),
            ("hardness", self.hardness),
            ("hardness_breakpoint", self.hardness_breakpoint),
            ("hardness_slope", self.hardness_slope),
            ("hardness_exponent", self.hardness_exponent),
            ("max_hardness", self.max_hardness),
            ("impact_gain", self.impact_gain),
            ("skid_speed", self.skid_speed),
            ("skid_time", self.skid_time),
            ("skid_gain", self.skid_gain),
        ]
    }

    /// Low-pass cutoff for a given slip speed, rising linearly between clamps.
    pub fn cutoff_for_speed(&self, slip_speed: f32) -> f32 {
        (self.cutoff_min + self.cutoff_per_speed * slip_speed.abs())
            .clamp(self.cutoff_min, self.cutoff_max)
    }

    /// Unsmoothed contact amplitude for a force and slip speed.
    pub fn contact_amp(&self, force: f32, slip_speed: f32) -> f32 {
        let boost = if slip_speed.abs() < self.rolling_speed {
            self.rolling_boost
        } else {
            1.0
        };
        self.contact_gain * force.max(0.0) * boost
    }

    /// Hardness of this surface when hit with `impulse`.
    pub fn hardness_at(&self, impulse: f32) -> f32 {
        let over = impulse.abs() - self.hardness_breakpoint;
        let stiffening = if over > 0.0 {
            self.hardness_slope * over.powf(self.hardness_exponent)
        } else {
            0.0
        };
        (self.hardness + stiffening).min(self.max_hardness)
    }
}

/// Hardness of a collision: the softer of the two surfaces wins.
pub fn effective_hardness(a: &SurfaceParams, b: Option<&SurfaceParams>, impulse: f32) -> f32 {
    let own = a.hardness_at(impulse);
    match b {
        Some(other) => own.min(other.hardness_at(impulse)),
        None => own,
    }
}
