use crate::{config::Pcf8574Addr, Error, Result};

#[cfg(target_os = "linux")]
use crate::lcd_driver::{self, pcf8574::RppalBus};

/// Row-oriented text output with a backlight. The presenter draws through
/// this so it can be exercised without hardware.
pub trait TextSurface {
    fn cols(&self) -> u8;
    fn rows(&self) -> u8;
    fn write_row(&mut self, row: u8, text: &str) -> Result<()>;
    fn set_backlight(&mut self, on: bool) -> Result<()>;
}

/// LCD facade: the HD44780 over I2C on Linux, a recording stub elsewhere.
pub struct Lcd {
    cols: u8,
    rows: u8,
    addr: u8,
    #[cfg(target_os = "linux")]
    driver: lcd_driver::Hd44780<RppalBus>,
    #[cfg(not(target_os = "linux"))]
    lines: Vec<String>,
    #[cfg(not(target_os = "linux"))]
    backlight_on: bool,
}

impl Lcd {
    pub fn new(cols: u8, rows: u8, pcf_addr: Pcf8574Addr) -> Result<Self> {
        #[cfg(target_os = "linux")]
        {
            let (bus, addr) = match pcf_addr {
                Pcf8574Addr::Auto => RppalBus::autodetect_default()?,
                Pcf8574Addr::Addr(a) => (RppalBus::new_default()?, a),
            };
            let driver = lcd_driver::Hd44780::new(bus, addr, cols, rows)?;
            Ok(Self {
                cols,
                rows,
                addr,
                driver,
            })
        }

        #[cfg(not(target_os = "linux"))]
        {
            let addr = match pcf_addr {
                Pcf8574Addr::Auto => crate::lcd_driver::DEFAULT_I2C_ADDR,
                Pcf8574Addr::Addr(a) => a,
            };
            Ok(Self {
                cols,
                rows,
                addr,
                lines: vec![String::new(); usize::from(rows)],
                backlight_on: true,
            })
        }
    }

    /// Backpack address in use (probed when configured as `auto`).
    pub fn addr(&self) -> u8 {
        self.addr
    }

    #[cfg(not(target_os = "linux"))]
    pub fn last_lines(&self) -> Vec<String> {
        self.lines.clone()
    }

    #[cfg(not(target_os = "linux"))]
    pub fn last_backlight(&self) -> bool {
        self.backlight_on
    }
}

impl TextSurface for Lcd {
    fn cols(&self) -> u8 {
        self.cols
    }

    fn rows(&self) -> u8 {
        self.rows
    }

    fn write_row(&mut self, row: u8, text: &str) -> Result<()> {
        if row >= self.rows {
            return Err(Error::InvalidArgs(format!(
                "row {row} out of bounds for display with {} rows",
                self.rows
            )));
        }

        #[cfg(target_os = "linux")]
        {
            self.driver.write_row(row, text)
        }

        #[cfg(not(target_os = "linux"))]
        {
            self.lines[usize::from(row)] = text.chars().take(usize::from(self.cols)).collect();
            Ok(())
        }
    }

    fn set_backlight(&mut self, on: bool) -> Result<()> {
        #[cfg(target_os = "linux")]
        {
            if on {
                self.driver.backlight_on()
            } else {
                self.driver.backlight_off()
            }
        }
        #[cfg(not(target_os = "linux"))]
        {
            self.backlight_on = on;
            Ok(())
        }
    }
}
