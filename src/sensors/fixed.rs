use super::{LightSensor, MotionSensor};
use crate::Result;

/// Reports the same lux forever.
#[derive(Debug, Clone, Copy)]
pub struct FixedLight(pub f32);

impl LightSensor for FixedLight {
    fn read_lux(&mut self) -> Result<f32> {
        Ok(self.0)
    }
}

/// Never shakes.
#[derive(Debug, Clone, Copy, Default)]
pub struct StillMotion;

impl MotionSensor for StillMotion {
    fn shake(&mut self, _threshold: f32) -> Result<bool> {
        Ok(false)
    }
}
