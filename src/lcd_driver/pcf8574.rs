use crate::{lcd_driver::I2cBus, Error, Result};

/// Addresses PCF8574/PCF8574A backpacks ship with, most common first.
pub const BACKPACK_CANDIDATES: [u8; 8] = [0x27, 0x26, 0x25, 0x24, 0x23, 0x22, 0x21, 0x20];

#[cfg(target_os = "linux")]
pub(crate) fn map_i2c_err(err: rppal::i2c::Error) -> Error {
    Error::Io(std::io::Error::other(err.to_string()))
}

/// PCF8574 backpack on the Raspberry Pi's primary I2C bus.
#[cfg(target_os = "linux")]
pub struct RppalBus {
    inner: rppal::i2c::I2c,
}

#[cfg(target_os = "linux")]
impl RppalBus {
    pub fn new_default() -> Result<Self> {
        let inner = rppal::i2c::I2c::new().map_err(map_i2c_err)?;
        Ok(Self { inner })
    }

    /// Probe the usual backpack addresses; falls back to 0x27 when none ack.
    pub fn autodetect_default() -> Result<(Self, u8)> {
        let mut bus = Self::new_default()?;
        let addr = bus.detect_address(&BACKPACK_CANDIDATES, super::DEFAULT_I2C_ADDR);
        Ok((bus, addr))
    }

    pub fn detect_address(&mut self, candidates: &[u8], fallback: u8) -> u8 {
        for &addr in candidates {
            if self.inner.set_slave_address(u16::from(addr)).is_ok()
                && self.inner.block_write(0, &[]).is_ok()
            {
                return addr;
            }
        }
        fallback
    }
}

#[cfg(target_os = "linux")]
impl I2cBus for RppalBus {
    fn write_byte(&mut self, addr: u8, byte: u8) -> Result<()> {
        self.inner
            .set_slave_address(u16::from(addr))
            .map_err(map_i2c_err)?;
        self.inner.block_write(byte, &[]).map_err(map_i2c_err)
    }
}

#[cfg(not(target_os = "linux"))]
pub struct RppalBus;

#[cfg(not(target_os = "linux"))]
impl RppalBus {
    pub fn new_default() -> Result<Self> {
        Err(linux_only())
    }

    pub fn autodetect_default() -> Result<(Self, u8)> {
        Err(linux_only())
    }
}

#[cfg(not(target_os = "linux"))]
impl I2cBus for RppalBus {
    fn write_byte(&mut self, _addr: u8, _byte: u8) -> Result<()> {
        Err(linux_only())
    }
}

#[cfg(not(target_os = "linux"))]
fn linux_only() -> Error {
    Error::InvalidArgs("I2C is only available on Linux targets".into())
}
