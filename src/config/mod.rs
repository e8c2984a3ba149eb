use crate::{weather::Units, Error, Result};
use std::path::Path;

pub mod loader;

pub const DEFAULT_BLINK: bool = true;
pub const DEFAULT_LOCATION: &str = "Boston, US";
pub const DEFAULT_WEATHER_TIME_DISPLAY_SECS: u64 = 15;
pub const DEFAULT_LIGHT_THRESHOLD: f32 = 6.5;
pub const DEFAULT_SHAKE_THRESHOLD: f32 = 10.5;
pub const DEFAULT_TZ_OFFSET_HOURS: i8 = -4;
pub const DEFAULT_NTP_SERVER: &str = "pool.ntp.org";
pub const DEFAULT_FIXED_LUX: f32 = 10.0;
pub const DEFAULT_COLS: u8 = 20;
pub const DEFAULT_ROWS: u8 = 4;
pub const DEFAULT_PCF8574_ADDR: Pcf8574Addr = Pcf8574Addr::Auto;
pub const DEFAULT_ACCEL_ADDR: u8 = 0x19;
const CONFIG_DIR_NAME: &str = ".lumaclock";
const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pcf8574Addr {
    Auto,
    Addr(u8),
}

impl std::str::FromStr for Pcf8574Addr {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        parse_pcf_addr(s)
    }
}

/// Where light and motion readings come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SensorBackend {
    /// VCNL4040 + LIS3DH on the Linux I2C bus.
    #[default]
    I2c,
    /// Constant light level, never shakes. For bench hosts without sensors.
    Fixed,
}

impl SensorBackend {
    pub fn as_str(self) -> &'static str {
        match self {
            SensorBackend::I2c => "i2c",
            SensorBackend::Fixed => "fixed",
        }
    }
}

impl std::str::FromStr for SensorBackend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "i2c" => Ok(SensorBackend::I2c),
            "fixed" => Ok(SensorBackend::Fixed),
            _ => Err("expected 'i2c' or 'fixed'".into()),
        }
    }
}

/// Which local clock authoritative time is written into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RtcBackend {
    #[default]
    Soft,
    System,
}

impl RtcBackend {
    pub fn as_str(self) -> &'static str {
        match self {
            RtcBackend::Soft => "soft",
            RtcBackend::System => "system",
        }
    }
}

impl std::str::FromStr for RtcBackend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "soft" => Ok(RtcBackend::Soft),
            "system" => Ok(RtcBackend::System),
            _ => Err("expected 'soft' or 'system'".into()),
        }
    }
}

/// User-supplied settings loaded from the config file.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub blink: bool,
    pub debug: bool,
    pub units: Units,
    pub location: String,
    pub weather_time_display: u64,
    pub light_sensor_threshold: f32,
    pub shaker_threshold: f32,
    pub wifi_ssid: Option<String>,
    pub wifi_password: Option<String>,
    pub openweather_token: String,
    pub tz_offset_hours: i8,
    pub ntp_server: String,
    pub sensor_backend: SensorBackend,
    pub fixed_lux: f32,
    pub rtc: RtcBackend,
    pub cols: u8,
    pub rows: u8,
    pub pcf8574_addr: Pcf8574Addr,
    pub accel_addr: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            blink: DEFAULT_BLINK,
            debug: false,
            units: Units::default(),
            location: DEFAULT_LOCATION.to_string(),
            weather_time_display: DEFAULT_WEATHER_TIME_DISPLAY_SECS,
            light_sensor_threshold: DEFAULT_LIGHT_THRESHOLD,
            shaker_threshold: DEFAULT_SHAKE_THRESHOLD,
            wifi_ssid: None,
            wifi_password: None,
            openweather_token: String::new(),
            tz_offset_hours: DEFAULT_TZ_OFFSET_HOURS,
            ntp_server: DEFAULT_NTP_SERVER.to_string(),
            sensor_backend: SensorBackend::default(),
            fixed_lux: DEFAULT_FIXED_LUX,
            rtc: RtcBackend::default(),
            cols: DEFAULT_COLS,
            rows: DEFAULT_ROWS,
            pcf8574_addr: DEFAULT_PCF8574_ADDR,
            accel_addr: DEFAULT_ACCEL_ADDR,
        }
    }
}

impl Config {
    pub fn load_or_default() -> Result<Self> {
        loader::load_or_default()
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        loader::load_from_path(path)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        loader::save_to_path(self, path)
    }
}

pub(crate) fn validate(cfg: &Config) -> Result<()> {
    if !(8..=40).contains(&cfg.cols) {
        return Err(Error::InvalidArgs(format!(
            "cols must be between 8 and 40 (got {})",
            cfg.cols
        )));
    }
    if !(2..=4).contains(&cfg.rows) {
        return Err(Error::InvalidArgs(format!(
            "rows must be between 2 and 4 (got {})",
            cfg.rows
        )));
    }
    if !(1..=3600).contains(&cfg.weather_time_display) {
        return Err(Error::InvalidArgs(format!(
            "weather_time_display must be between 1 and 3600 seconds (got {})",
            cfg.weather_time_display
        )));
    }
    if !cfg.light_sensor_threshold.is_finite() || cfg.light_sensor_threshold < 0.0 {
        return Err(Error::InvalidArgs(
            "light_sensor_threshold must be a non-negative number".into(),
        ));
    }
    if !cfg.shaker_threshold.is_finite() || cfg.shaker_threshold <= 0.0 {
        return Err(Error::InvalidArgs(
            "shaker_threshold must be a positive number".into(),
        ));
    }
    if !cfg.fixed_lux.is_finite() || cfg.fixed_lux < 0.0 {
        return Err(Error::InvalidArgs(
            "fixed_lux must be a non-negative number".into(),
        ));
    }
    if !(-12..=14).contains(&cfg.tz_offset_hours) {
        return Err(Error::InvalidArgs(format!(
            "tz_offset_hours must be between -12 and 14 (got {})",
            cfg.tz_offset_hours
        )));
    }
    if cfg.location.trim().is_empty() {
        return Err(Error::InvalidArgs("location must not be empty".into()));
    }
    if cfg.ntp_server.trim().is_empty() {
        return Err(Error::InvalidArgs("ntp_server must not be empty".into()));
    }
    if cfg.wifi_ssid.is_none() && cfg.wifi_password.is_some() {
        return Err(Error::InvalidArgs(
            "wifi_password is set but wifi_ssid is missing".into(),
        ));
    }
    Ok(())
}

fn parse_pcf_addr(raw: &str) -> std::result::Result<Pcf8574Addr, String> {
    if raw.eq_ignore_ascii_case("auto") {
        return Ok(Pcf8574Addr::Auto);
    }
    parse_i2c_addr(raw).map(Pcf8574Addr::Addr)
}

pub(crate) fn parse_i2c_addr(raw: &str) -> std::result::Result<u8, String> {
    let value = if let Some(hex) = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        u8::from_str_radix(hex, 16).ok()
    } else {
        raw.parse::<u8>().ok()
    };
    match value {
        Some(addr) if addr <= 0x7f => Ok(addr),
        _ => Err("expected a 7-bit hex/decimal address (e.g., 0x27)".to_string()),
    }
}

fn format_pcf_addr(addr: &Pcf8574Addr) -> String {
    match addr {
        Pcf8574Addr::Auto => "\"auto\"".into(),
        Pcf8574Addr::Addr(a) => format!("\"{a:#04x}\""),
    }
}
