use embedded_hal_1::i2c::I2c;

use super::{i2c_err, LightSensor};
use crate::Result;

pub const VCNL4040_ADDR: u8 = 0x60;
const REG_ALS_CONF: u8 = 0x00;
const REG_ALS_DATA: u8 = 0x09;
/// Lux per count at the default 80 ms integration time.
const LUX_PER_COUNT: f32 = 0.1;

/// VCNL4040 proximity/ambient-light sensor, ALS channel only.
pub struct Vcnl4040<I2C> {
    i2c: I2C,
    addr: u8,
}

impl<I2C: I2c> Vcnl4040<I2C> {
    /// Power up the ALS with 80 ms integration, interrupts off.
    pub fn new(mut i2c: I2C) -> Result<Self> {
        i2c.write(VCNL4040_ADDR, &[REG_ALS_CONF, 0x00, 0x00])
            .map_err(|e| i2c_err("vcnl4040 enable", e))?;
        Ok(Self {
            i2c,
            addr: VCNL4040_ADDR,
        })
    }

    pub fn raw_als(&mut self) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.i2c
            .write_read(self.addr, &[REG_ALS_DATA], &mut buf)
            .map_err(|e| i2c_err("vcnl4040 als read", e))?;
        Ok(u16::from_le_bytes(buf))
    }

    pub fn release(self) -> I2C {
        self.i2c
    }
}

impl<I2C: I2c> LightSensor for Vcnl4040<I2C> {
    fn read_lux(&mut self) -> Result<f32> {
        Ok(f32::from(self.raw_als()?) * LUX_PER_COUNT)
    }
}
