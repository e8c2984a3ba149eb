//! HD44780 character LCD in 4-bit mode behind a PCF8574 I2C backpack.

use std::time::Duration;

use crate::Result;

pub mod pcf8574;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backlight {
    On,
    Off,
}

/// Single-byte writes to the backpack; swapped for a recorder in tests.
pub trait I2cBus {
    fn write_byte(&mut self, addr: u8, byte: u8) -> Result<()>;
}

pub struct Hd44780<B: I2cBus> {
    bus: B,
    addr: u8,
    cols: u8,
    rows: u8,
    cursor_x: u8,
    cursor_y: u8,
    backlight: Backlight,
}

// PCF8574 pin mapping.
const MASK_RS: u8 = 0x01;
const MASK_E: u8 = 0x04;
const SHIFT_BACKLIGHT: u8 = 3;
const SHIFT_DATA: u8 = 4;

const LCD_CLR: u8 = 0x01;
const LCD_HOME: u8 = 0x02;
const LCD_ENTRY_MODE: u8 = 0x04;
const LCD_ENTRY_INC: u8 = 0x02;
const LCD_ON_CTRL: u8 = 0x08;
const LCD_ON_DISPLAY: u8 = 0x04;
const LCD_FUNCTION: u8 = 0x20;
const LCD_FUNCTION_2LINES: u8 = 0x08;
const LCD_FUNCTION_RESET: u8 = 0x30;
const LCD_DDRAM: u8 = 0x80;

/// ROM code A00 puts the degree sign here.
const GLYPH_DEGREE: u8 = 0xDF;

pub const DEFAULT_I2C_ADDR: u8 = 0x27;

impl<B: I2cBus> Hd44780<B> {
    /// Run the 4-bit init sequence and leave the display on, cleared, backlit.
    pub fn new(bus: B, addr: u8, cols: u8, rows: u8) -> Result<Self> {
        let mut driver = Hd44780 {
            bus,
            addr,
            cols: cols.min(40),
            rows: rows.clamp(1, 4),
            cursor_x: 0,
            cursor_y: 0,
            backlight: Backlight::On,
        };

        driver.bus.write_byte(driver.addr, 0)?;
        sleep_ms(20);
        driver.write_init_nibble(LCD_FUNCTION_RESET)?;
        sleep_ms(5);
        driver.write_init_nibble(LCD_FUNCTION_RESET)?;
        sleep_ms(1);
        driver.write_init_nibble(LCD_FUNCTION_RESET)?;
        sleep_ms(1);
        driver.write_init_nibble(LCD_FUNCTION)?;
        sleep_ms(1);

        let mut cmd = LCD_FUNCTION;
        if driver.rows > 1 {
            cmd |= LCD_FUNCTION_2LINES;
        }
        driver.write_command(cmd)?;
        driver.write_command(LCD_ON_CTRL)?;
        driver.clear()?;
        driver.write_command(LCD_ENTRY_MODE | LCD_ENTRY_INC)?;
        driver.display_on()?;
        Ok(driver)
    }

    pub fn cols(&self) -> u8 {
        self.cols
    }

    pub fn rows(&self) -> u8 {
        self.rows
    }

    pub fn backlight(&self) -> Backlight {
        self.backlight
    }

    pub fn clear(&mut self) -> Result<()> {
        self.write_command(LCD_CLR)?;
        self.write_command(LCD_HOME)?;
        self.cursor_x = 0;
        self.cursor_y = 0;
        Ok(())
    }

    pub fn display_on(&mut self) -> Result<()> {
        self.write_command(LCD_ON_CTRL | LCD_ON_DISPLAY)
    }

    pub fn backlight_on(&mut self) -> Result<()> {
        self.backlight = Backlight::On;
        self.bus.write_byte(self.addr, 1 << SHIFT_BACKLIGHT)
    }

    pub fn backlight_off(&mut self) -> Result<()> {
        self.backlight = Backlight::Off;
        self.bus.write_byte(self.addr, 0)
    }

    /// Overwrite a whole row: text is clipped to the width and padded with
    /// spaces, so no clear is needed between frames.
    pub fn write_row(&mut self, row: u8, text: &str) -> Result<()> {
        self.move_to(0, row)?;
        let width = usize::from(self.cols);
        let mut written = 0;
        for ch in text.chars().take(width) {
            self.write_data(lcd_byte(ch))?;
            written += 1;
        }
        for _ in written..width {
            self.write_data(b' ')?;
        }
        self.cursor_x = self.cols.saturating_sub(1);
        Ok(())
    }

    pub fn move_to(&mut self, cursor_x: u8, cursor_y: u8) -> Result<()> {
        self.cursor_x = cursor_x;
        self.cursor_y = cursor_y % self.rows;
        // Rows 2 and 3 continue rows 0 and 1 in DDRAM.
        let mut addr = cursor_x & 0x3f;
        if self.cursor_y & 1 == 1 {
            addr += 0x40;
        }
        if self.cursor_y & 2 == 2 {
            addr += self.cols;
        }
        self.write_command(LCD_DDRAM | addr)
    }

    fn write_init_nibble(&mut self, nibble: u8) -> Result<()> {
        let byte = ((nibble >> 4) & 0x0f) << SHIFT_DATA;
        self.bus.write_byte(self.addr, byte | MASK_E)?;
        self.bus.write_byte(self.addr, byte)?;
        Ok(())
    }

    fn write_command(&mut self, cmd: u8) -> Result<()> {
        self.write_nibble(cmd, false)?;
        self.write_nibble(cmd << 4, false)?;
        if cmd <= 3 {
            sleep_ms(5);
        }
        Ok(())
    }

    fn write_data(&mut self, data: u8) -> Result<()> {
        self.write_nibble(data, true)?;
        self.write_nibble(data << 4, true)?;
        Ok(())
    }

    fn write_nibble(&mut self, nibble: u8, is_data: bool) -> Result<()> {
        let mut byte = match self.backlight {
            Backlight::On => 1 << SHIFT_BACKLIGHT,
            Backlight::Off => 0,
        };
        if is_data {
            byte |= MASK_RS;
        }
        byte |= (nibble >> 4) << SHIFT_DATA;

        self.bus.write_byte(self.addr, byte | MASK_E)?;
        self.bus.write_byte(self.addr, byte)?;
        Ok(())
    }
}

fn lcd_byte(ch: char) -> u8 {
    match ch {
        '°' => GLYPH_DEGREE,
        c if c.is_ascii() && !c.is_ascii_control() => c as u8,
        _ => b'?',
    }
}

fn sleep_ms(ms: u64) {
    std::thread::sleep(Duration::from_millis(ms));
}
