//! Ambient light and shake detection.

use crate::{Error, Result};

pub mod fixed;
pub mod lis3dh;
pub mod vcnl4040;

pub use fixed::{FixedLight, StillMotion};
pub use lis3dh::Lis3dh;
pub use vcnl4040::Vcnl4040;

pub trait LightSensor {
    fn read_lux(&mut self) -> Result<f32>;
}

pub trait MotionSensor {
    /// True when the averaged acceleration magnitude exceeds `threshold` (m/s^2).
    fn shake(&mut self, threshold: f32) -> Result<bool>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightLevel {
    pub lux: f32,
}

impl LightLevel {
    pub fn is_lit(&self, threshold: f32) -> bool {
        self.lux >= threshold
    }
}

/// Classifies sensor readings into "should be lit" and "wake pulse".
pub struct SensorGate {
    light: Box<dyn LightSensor>,
    motion: Box<dyn MotionSensor>,
    light_threshold: f32,
    last_lit: bool,
}

impl SensorGate {
    pub fn new(
        light: Box<dyn LightSensor>,
        motion: Box<dyn MotionSensor>,
        light_threshold: f32,
    ) -> Self {
        Self {
            light,
            motion,
            light_threshold,
            last_lit: true,
        }
    }

    pub fn read_light(&mut self) -> Result<LightLevel> {
        let lux = self.light.read_lux()?;
        if !lux.is_finite() {
            return Err(Error::SensorRead(format!("light sensor returned {lux}")));
        }
        Ok(LightLevel { lux })
    }

    /// Classify the current light level. On error the caller should fall
    /// back to [`SensorGate::last_known_lit`].
    pub fn is_lit(&mut self) -> Result<bool> {
        let level = self.read_light()?;
        self.last_lit = level.is_lit(self.light_threshold);
        Ok(self.last_lit)
    }

    /// Last successful classification; "lit" before the first reading.
    pub fn last_known_lit(&self) -> bool {
        self.last_lit
    }

    pub fn detect_wake_pulse(&mut self, sensitivity: f32) -> Result<bool> {
        self.motion.shake(sensitivity)
    }
}

pub(crate) fn i2c_err<E: std::fmt::Debug>(what: &str, err: E) -> Error {
    Error::SensorRead(format!("{what}: {err:?}"))
}
