use crate::{
    cli::RunOptions,
    config::{Config, RtcBackend, SensorBackend},
    display::{DisplayPresenter, Lcd, LcdPresenter},
    sensors::{FixedLight, SensorGate, StillMotion},
    timekeeping::{NetworkTimeSource, Rtc, SntpReference, SoftRtc, SystemRtc},
    weather::OpenWeatherFetcher,
    Result,
};
use std::path::Path;
use std::time::Duration;

pub mod controller;
mod lifecycle;
pub mod logger;
pub mod timer;
pub mod wifi;

pub use controller::{AppContext, ClockController, ClockState, ControllerSettings, DisplayMode};
pub use logger::{LogLevel, Logger};
pub use timer::{IntervalTimer, MonotonicClock, SystemClock};

/// Config file values merged with command-line overrides.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppConfig {
    pub clock: Config,
    pub log_level: LogLevel,
    pub log_file: Option<String>,
}

impl AppConfig {
    pub fn from_sources(config: Config, opts: RunOptions) -> Self {
        let mut log_level = opts.log_level.unwrap_or_default();
        if config.debug && log_level < LogLevel::Debug {
            log_level = LogLevel::Debug;
        }
        Self {
            clock: config,
            log_level,
            log_file: opts.log_file,
        }
    }

    pub fn controller_settings(&self) -> ControllerSettings {
        ControllerSettings {
            blink: self.clock.blink,
            location: self.clock.location.clone(),
            units: self.clock.units,
            weather_time_display: Duration::from_secs(self.clock.weather_time_display),
            shake_threshold: self.clock.shaker_threshold,
        }
    }
}

pub struct App {
    config: AppConfig,
    logger: Logger,
}

impl App {
    pub fn new(config: AppConfig) -> Self {
        let mut logger = Logger::new(config.log_level, config.log_file.clone());
        if config.clock.debug {
            logger.raise_to(LogLevel::Debug);
        }
        Self { config, logger }
    }

    pub fn from_options(opts: RunOptions) -> Result<Self> {
        let cfg_file = match opts.config_path.as_deref() {
            Some(path) => Config::load_from_path(Path::new(path))?,
            None => Config::load_or_default()?,
        };
        Ok(Self::new(AppConfig::from_sources(cfg_file, opts)))
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Wire up hardware and network, then hand over to the controller
    /// until ctrl-c.
    pub fn run(self) -> Result<()> {
        let running = lifecycle::create_shutdown_flag()?;
        let cfg = &self.config.clock;

        let lcd = Lcd::new(cfg.cols, cfg.rows, cfg.pcf8574_addr.clone())?;
        self.logger.info(format!(
            "lcd ready (addr={:#04x}, cols={}, rows={})",
            lcd.addr(),
            cfg.cols,
            cfg.rows
        ));
        let mut display = LcdPresenter::new(lcd);
        display.show_message("lumaclock")?;

        let credentials = cfg.wifi_ssid.as_deref().map(|ssid| wifi::WifiCredentials {
            ssid,
            password: cfg.wifi_password.as_deref(),
        });
        wifi::ensure_connected(
            &mut wifi::NmcliLink,
            credentials,
            &SystemClock,
            &self.logger,
            &running,
            wifi::JOIN_RETRY_DELAY,
        );

        let sensors = build_sensor_gate(cfg)?;
        self.logger.info(format!(
            "sensors: {} (light threshold {}, shake threshold {})",
            cfg.sensor_backend.as_str(),
            cfg.light_sensor_threshold,
            cfg.shaker_threshold
        ));

        let reference = SntpReference::new(&cfg.ntp_server);
        self.logger.debug(format!(
            "time: {} into {} clock, offset {}h",
            crate::timekeeping::TimeReference::describe(&reference),
            cfg.rtc.as_str(),
            cfg.tz_offset_hours
        ));
        let time = NetworkTimeSource::new(Box::new(reference), build_rtc(cfg.rtc), cfg.tz_offset_hours);

        if cfg.openweather_token.is_empty() {
            self.logger
                .warn("openweather_token is empty; weather requests will be rejected");
        }
        let weather = OpenWeatherFetcher::new(cfg.openweather_token.clone());

        let settings = self.config.controller_settings();
        let ctx = AppContext {
            sensors,
            time: Box::new(time),
            weather: Box::new(weather),
            display: Box::new(display),
            clock: Box::new(SystemClock),
            logger: self.logger,
        };
        let mut controller = ClockController::new(ctx, settings);
        controller.run(&running);
        Ok(())
    }
}

fn build_rtc(backend: RtcBackend) -> Box<dyn Rtc> {
    match backend {
        RtcBackend::Soft => Box::new(SoftRtc::new()),
        RtcBackend::System => Box::new(SystemRtc::new()),
    }
}

fn build_sensor_gate(cfg: &Config) -> Result<SensorGate> {
    match cfg.sensor_backend {
        SensorBackend::Fixed => Ok(SensorGate::new(
            Box::new(FixedLight(cfg.fixed_lux)),
            Box::new(StillMotion),
            cfg.light_sensor_threshold,
        )),
        SensorBackend::I2c => open_i2c_sensors(cfg),
    }
}

#[cfg(target_os = "linux")]
fn open_i2c_sensors(cfg: &Config) -> Result<SensorGate> {
    use crate::lcd_driver::pcf8574::map_i2c_err;
    use crate::sensors::{Lis3dh, Vcnl4040};

    let light = Vcnl4040::new(rppal::i2c::I2c::new().map_err(map_i2c_err)?)?;
    let motion = Lis3dh::new(rppal::i2c::I2c::new().map_err(map_i2c_err)?, cfg.accel_addr)?;
    Ok(SensorGate::new(
        Box::new(light),
        Box::new(motion),
        cfg.light_sensor_threshold,
    ))
}

#[cfg(not(target_os = "linux"))]
fn open_i2c_sensors(_cfg: &Config) -> Result<SensorGate> {
    Err(crate::Error::InvalidArgs(
        "i2c sensors need Linux; set sensor_backend = \"fixed\" on this host".into(),
    ))
}
