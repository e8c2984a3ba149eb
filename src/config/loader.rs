use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use crate::{Error, Result};

use super::{Config, CONFIG_DIR_NAME, CONFIG_FILE_NAME};

pub fn load_or_default() -> Result<Config> {
    let path = config_path()?;
    if !path.exists() {
        let cfg = Config::default();
        cfg.save_to_path(&path)?;
        super::validate(&cfg)?;
        return Ok(cfg);
    }
    load_from_path(&path)
}

pub fn load_from_path(path: &Path) -> Result<Config> {
    if !path.exists() {
        let cfg = Config::default();
        super::validate(&cfg)?;
        return Ok(cfg);
    }

    let raw = fs::read_to_string(path)?;
    parse(&raw)
}

pub fn save_to_path(config: &Config, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let contents = format!(
        "# lumaclock config\n\
blink = {}\n\
debug = {}\n\
units = \"{}\"\n\
location = \"{}\"\n\
weather_time_display = {}\n\
light_sensor_threshold = {}\n\
shaker_threshold = {}\n\
wifi_ssid = \"{}\"\n\
wifi_password = \"{}\"\n\
openweather_token = \"{}\"\n\
tz_offset_hours = {}\n\
ntp_server = \"{}\"\n\
sensor_backend = \"{}\"\n\
fixed_lux = {}\n\
rtc = \"{}\"\n\
cols = {}\n\
rows = {}\n\
pcf8574_addr = {}\n\
accel_addr = \"{:#04x}\"\n",
        config.blink,
        config.debug,
        config.units.as_str(),
        config.location,
        config.weather_time_display,
        config.light_sensor_threshold,
        config.shaker_threshold,
        config.wifi_ssid.as_deref().unwrap_or(""),
        config.wifi_password.as_deref().unwrap_or(""),
        config.openweather_token,
        config.tz_offset_hours,
        config.ntp_server,
        config.sensor_backend.as_str(),
        config.fixed_lux,
        config.rtc.as_str(),
        config.cols,
        config.rows,
        super::format_pcf_addr(&config.pcf8574_addr),
        config.accel_addr,
    );
    fs::write(path, contents)?;
    Ok(())
}

pub fn parse(raw: &str) -> Result<Config> {
    let mut cfg = Config::default();

    for (idx, line) in raw.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let (key, value) = trimmed.split_once('=').ok_or_else(|| {
            Error::InvalidArgs(format!("invalid config line {}: '{}'", idx + 1, line))
        })?;

        let key = key.trim();
        let value = value.trim().trim_matches('"');
        let line_no = idx + 1;
        match key {
            "blink" => cfg.blink = parse_value(key, value, line_no)?,
            "debug" => cfg.debug = parse_value(key, value, line_no)?,
            "units" => cfg.units = parse_value(key, value, line_no)?,
            "location" => cfg.location = value.to_string(),
            "weather_time_display" => {
                cfg.weather_time_display = parse_value(key, value, line_no)?
            }
            "light_sensor_threshold" => {
                cfg.light_sensor_threshold = parse_value(key, value, line_no)?
            }
            "shaker_threshold" => cfg.shaker_threshold = parse_value(key, value, line_no)?,
            "wifi_ssid" => cfg.wifi_ssid = optional_string(value),
            "wifi_password" => cfg.wifi_password = optional_string(value),
            "openweather_token" => cfg.openweather_token = value.to_string(),
            "tz_offset_hours" => cfg.tz_offset_hours = parse_value(key, value, line_no)?,
            "ntp_server" => cfg.ntp_server = value.to_string(),
            "sensor_backend" => cfg.sensor_backend = parse_value(key, value, line_no)?,
            "fixed_lux" => cfg.fixed_lux = parse_value(key, value, line_no)?,
            "rtc" => cfg.rtc = parse_value(key, value, line_no)?,
            "cols" => cfg.cols = parse_value(key, value, line_no)?,
            "rows" => cfg.rows = parse_value(key, value, line_no)?,
            "pcf8574_addr" => cfg.pcf8574_addr = parse_value(key, value, line_no)?,
            "accel_addr" => {
                cfg.accel_addr = super::parse_i2c_addr(value).map_err(|e| {
                    Error::InvalidArgs(format!("invalid accel_addr on line {line_no}: {e}"))
                })?;
            }
            other => {
                return Err(Error::InvalidArgs(format!(
                    "unknown config key '{}' on line {}",
                    other, line_no
                )));
            }
        }
    }

    super::validate(&cfg)?;
    Ok(cfg)
}

fn parse_value<T>(key: &str, value: &str, line_no: usize) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| Error::InvalidArgs(format!("invalid {key} on line {line_no}: {e}")))
}

fn optional_string(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn config_path() -> Result<PathBuf> {
    let home = std::env::var_os("HOME")
        .map(PathBuf::from)
        .ok_or_else(|| Error::InvalidArgs("HOME not set; cannot locate config directory".into()))?;
    Ok(home.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Pcf8574Addr, RtcBackend, SensorBackend};
    use crate::weather::Units;
    use std::fs;

    #[test]
    fn loads_default_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_from_path(&dir.path().join("missing.toml")).unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn parses_valid_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let contents = r#"
            blink = false
            debug = true
            units = "metric"
            location = "Ottawa, CA"
            weather_time_display = 30
            light_sensor_threshold = 4.5
            shaker_threshold = 12
            wifi_ssid = "attic"
            wifi_password = "hunter2"
            openweather_token = "abc123"
            tz_offset_hours = -5
            ntp_server = "ntp.example.org"
            sensor_backend = "fixed"
            fixed_lux = 2.5
            rtc = "system"
            cols = 16
            rows = 2
            pcf8574_addr = "0x3f"
            accel_addr = "0x18"
        "#;
        fs::write(&path, contents).unwrap();
        let cfg = load_from_path(&path).unwrap();
        assert!(!cfg.blink);
        assert!(cfg.debug);
        assert_eq!(cfg.units, Units::Metric);
        assert_eq!(cfg.location, "Ottawa, CA");
        assert_eq!(cfg.weather_time_display, 30);
        assert_eq!(cfg.light_sensor_threshold, 4.5);
        assert_eq!(cfg.shaker_threshold, 12.0);
        assert_eq!(cfg.wifi_ssid.as_deref(), Some("attic"));
        assert_eq!(cfg.wifi_password.as_deref(), Some("hunter2"));
        assert_eq!(cfg.openweather_token, "abc123");
        assert_eq!(cfg.tz_offset_hours, -5);
        assert_eq!(cfg.ntp_server, "ntp.example.org");
        assert_eq!(cfg.sensor_backend, SensorBackend::Fixed);
        assert_eq!(cfg.fixed_lux, 2.5);
        assert_eq!(cfg.rtc, RtcBackend::System);
        assert_eq!(cfg.cols, 16);
        assert_eq!(cfg.rows, 2);
        assert_eq!(cfg.pcf8574_addr, Pcf8574Addr::Addr(0x3f));
        assert_eq!(cfg.accel_addr, 0x18);
    }

    #[test]
    fn empty_wifi_fields_mean_unset() {
        let cfg = parse("wifi_ssid = \"\"\nwifi_password = \"\"\n").unwrap();
        assert_eq!(cfg.wifi_ssid, None);
        assert_eq!(cfg.wifi_password, None);
    }

    #[test]
    fn rejects_unknown_key() {
        let err = parse("blink = true\nnope = 1").unwrap_err();
        let msg = format!("{err}");
        assert!(msg.contains("unknown config key"));
        assert!(msg.contains("line 2"));
    }

    #[test]
    fn rejects_bad_units() {
        let err = parse("units = \"kelvin\"").unwrap_err();
        assert!(format!("{err}").contains("invalid units on line 1"));
    }

    #[test]
    fn rejects_line_without_equals() {
        let err = parse("blink true").unwrap_err();
        assert!(format!("{err}").contains("invalid config line 1"));
    }

    #[test]
    fn rejects_out_of_range_values() {
        let err = parse("cols = 99").unwrap_err();
        assert!(format!("{err}").contains("cols must"));
        let err = parse("rows = 1").unwrap_err();
        assert!(format!("{err}").contains("rows must"));
        let err = parse("weather_time_display = 0").unwrap_err();
        assert!(format!("{err}").contains("weather_time_display"));
        let err = parse("tz_offset_hours = 20").unwrap_err();
        assert!(format!("{err}").contains("tz_offset_hours"));
    }

    #[test]
    fn saves_and_loads_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let cfg = Config {
            blink: false,
            units: Units::Metric,
            location: "Reykjavik, IS".into(),
            wifi_ssid: Some("home".into()),
            wifi_password: Some("pw".into()),
            openweather_token: "token".into(),
            tz_offset_hours: 0,
            sensor_backend: SensorBackend::Fixed,
            rtc: RtcBackend::System,
            pcf8574_addr: Pcf8574Addr::Addr(0x27),
            accel_addr: 0x18,
            ..Config::default()
        };
        save_to_path(&cfg, &path).unwrap();
        let loaded = load_from_path(&path).unwrap();
        assert_eq!(cfg, loaded);
    }

    #[test]
    fn load_or_default_creates_file_with_defaults() {
        let home = tempfile::tempdir().unwrap();
        std::env::set_var("HOME", home.path());
        let cfg_path = home.path().join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME);

        let cfg = load_or_default().unwrap();
        assert_eq!(cfg, Config::default());
        assert!(cfg_path.exists(), "expected config file to be created");

        let contents = fs::read_to_string(&cfg_path).unwrap();
        assert!(contents.contains("location ="));
        assert!(contents.contains("light_sensor_threshold ="));
    }
}
