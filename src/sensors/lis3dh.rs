use std::time::Duration;

use embedded_hal_1::i2c::I2c;

use super::{i2c_err, MotionSensor};
use crate::{Error, Result};

pub const LIS3DH_DEFAULT_ADDR: u8 = 0x19;
const REG_WHO_AM_I: u8 = 0x0F;
const REG_CTRL1: u8 = 0x20;
const REG_CTRL4: u8 = 0x23;
const REG_OUT_X_L: u8 = 0x28;
/// Register auto-increment for multi-byte reads.
const AUTO_INCREMENT: u8 = 0x80;
const DEVICE_ID: u8 = 0x33;
/// 400 Hz, normal power, X/Y/Z enabled.
const CTRL1_400HZ_XYZ: u8 = 0x77;
/// Block data update, high resolution, +-2 g.
const CTRL4_BDU_HR_2G: u8 = 0x88;
const COUNTS_PER_G_2G: f32 = 16380.0;
const STANDARD_GRAVITY: f32 = 9.806_65;

pub const SHAKE_SAMPLES: u32 = 10;
pub const SHAKE_WINDOW: Duration = Duration::from_millis(100);

pub struct Lis3dh<I2C> {
    i2c: I2C,
    addr: u8,
    samples: u32,
    window: Duration,
}

impl<I2C: I2c> Lis3dh<I2C> {
    pub fn new(mut i2c: I2C, addr: u8) -> Result<Self> {
        let mut id = [0u8; 1];
        i2c.write_read(addr, &[REG_WHO_AM_I], &mut id)
            .map_err(|e| i2c_err("lis3dh who_am_i", e))?;
        if id[0] != DEVICE_ID {
            return Err(Error::SensorRead(format!(
                "lis3dh at {addr:#04x} reported id {:#04x}, expected {DEVICE_ID:#04x}",
                id[0]
            )));
        }
        i2c.write(addr, &[REG_CTRL1, CTRL1_400HZ_XYZ])
            .map_err(|e| i2c_err("lis3dh ctrl1", e))?;
        i2c.write(addr, &[REG_CTRL4, CTRL4_BDU_HR_2G])
            .map_err(|e| i2c_err("lis3dh ctrl4", e))?;
        Ok(Self {
            i2c,
            addr,
            samples: SHAKE_SAMPLES,
            window: SHAKE_WINDOW,
        })
    }

    /// Spread `samples` reads over `window` when checking for a shake.
    pub fn with_sampling(mut self, samples: u32, window: Duration) -> Self {
        self.samples = samples.max(1);
        self.window = window;
        self
    }

    /// Acceleration in m/s^2.
    pub fn acceleration(&mut self) -> Result<[f32; 3]> {
        let mut raw = [0u8; 6];
        self.i2c
            .write_read(self.addr, &[REG_OUT_X_L | AUTO_INCREMENT], &mut raw)
            .map_err(|e| i2c_err("lis3dh accel read", e))?;
        let axis = |lo: usize| {
            f32::from(i16::from_le_bytes([raw[lo], raw[lo + 1]])) / COUNTS_PER_G_2G
                * STANDARD_GRAVITY
        };
        Ok([axis(0), axis(2), axis(4)])
    }

    pub fn release(self) -> I2C {
        self.i2c
    }
}

impl<I2C: I2c> MotionSensor for Lis3dh<I2C> {
    fn shake(&mut self, threshold: f32) -> Result<bool> {
        let pause = self.window / self.samples;
        let mut sum = [0f32; 3];
        for _ in 0..self.samples {
            let sample = self.acceleration()?;
            for (acc, v) in sum.iter_mut().zip(sample) {
                *acc += v;
            }
            if !pause.is_zero() {
                std::thread::sleep(pause);
            }
        }
        let n = self.samples as f32;
        let magnitude = sum.iter().map(|v| (v / n) * (v / n)).sum::<f32>().sqrt();
        Ok(magnitude > threshold)
    }
}
