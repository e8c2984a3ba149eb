//! The polling state machine: one `step` per outer cycle, choosing between
//! the dark, showcase and steady branches from the light classification.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use super::logger::Logger;
use super::timer::{IntervalTimer, MonotonicClock};
use crate::display::{ClockColor, DisplayPresenter};
use crate::errors::classify_error;
use crate::sensors::SensorGate;
use crate::timekeeping::{TimeSample, TimeSource};
use crate::weather::{Units, WeatherFetcher, WeatherSnapshot};
use crate::Result;

pub const TIME_SYNC_PERIOD: Duration = Duration::from_secs(3600);
pub const WEATHER_SYNC_PERIOD: Duration = Duration::from_secs(600);
pub const CLOCK_REFRESH_PERIOD: Duration = Duration::from_secs(3600);
pub const STEADY_HOLD: Duration = Duration::from_secs(1);
pub const SHOWCASE_HOLD: Duration = Duration::from_secs(2);
pub const WAKE_DISPLAY: Duration = Duration::from_secs(5);
pub const DARK_POLL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    Clock,
    WeatherShowcase,
    Dark,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClockState {
    pub display_mode: DisplayMode,
    pub colon_visible: bool,
    pub dark_since_last_check: bool,
}

impl Default for ClockState {
    fn default() -> Self {
        Self {
            display_mode: DisplayMode::Clock,
            colon_visible: true,
            dark_since_last_check: false,
        }
    }
}

/// Values the controller reads from configuration once at startup.
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub blink: bool,
    pub location: String,
    pub units: Units,
    pub weather_time_display: Duration,
    pub shake_threshold: f32,
}

/// Every collaborator the controller talks to. Owned, no globals.
pub struct AppContext {
    pub sensors: SensorGate,
    pub time: Box<dyn TimeSource>,
    pub weather: Box<dyn WeatherFetcher>,
    pub display: Box<dyn DisplayPresenter>,
    pub clock: Box<dyn MonotonicClock>,
    pub logger: Logger,
}

pub struct ClockController {
    ctx: AppContext,
    settings: ControllerSettings,
    state: ClockState,
    time_sync: IntervalTimer,
    weather_sync: IntervalTimer,
    clock_refresh: IntervalTimer,
    snapshot: Option<WeatherSnapshot>,
    field_index: usize,
}

impl ClockController {
    pub fn new(ctx: AppContext, settings: ControllerSettings) -> Self {
        Self {
            ctx,
            settings,
            state: ClockState::default(),
            time_sync: IntervalTimer::new(TIME_SYNC_PERIOD),
            weather_sync: IntervalTimer::new(WEATHER_SYNC_PERIOD),
            clock_refresh: IntervalTimer::new(CLOCK_REFRESH_PERIOD),
            snapshot: None,
            field_index: 0,
        }
    }

    pub fn state(&self) -> &ClockState {
        &self.state
    }

    pub fn snapshot(&self) -> Option<&WeatherSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn time_sync_timer(&self) -> &IntervalTimer {
        &self.time_sync
    }

    pub fn weather_sync_timer(&self) -> &IntervalTimer {
        &self.weather_sync
    }

    pub fn clock_refresh_timer(&self) -> &IntervalTimer {
        &self.clock_refresh
    }

    /// Loop until `running` drops, then leave an "offline" notice up.
    pub fn run(&mut self, running: &AtomicBool) {
        self.ctx.logger.info(format!(
            "clock loop started: showcase {}, weather for '{}' ({})",
            humantime::format_duration(self.settings.weather_time_display),
            self.settings.location,
            self.settings.units.as_str()
        ));
        while running.load(Ordering::SeqCst) {
            self.step(running);
        }
        if let Err(err) = super::lifecycle::render_shutdown(self.ctx.display.as_mut()) {
            self.ctx.logger.warn(format!("shutdown render failed: {err}"));
        }
        self.ctx.logger.info("clock loop stopped");
    }

    /// One outer cycle. Returns the branch that ran.
    pub fn step(&mut self, running: &AtomicBool) -> DisplayMode {
        let lit = self.classify_light();
        if !lit {
            self.dark_cycle();
        } else if self.state.dark_since_last_check {
            self.showcase_cycle(running);
        } else {
            self.steady_cycle();
        }
        self.state.display_mode
    }

    fn classify_light(&mut self) -> bool {
        match self.ctx.sensors.is_lit() {
            Ok(lit) => lit,
            Err(err) => {
                let fallback = self.ctx.sensors.last_known_lit();
                self.ctx.logger.warn(format!(
                    "light read failed ({}): {err}; keeping {}",
                    classify_error(&err),
                    if fallback { "lit" } else { "dark" }
                ));
                fallback
            }
        }
    }

    fn dark_cycle(&mut self) {
        if self.state.display_mode != DisplayMode::Dark {
            self.ctx.logger.debug("room dark, blanking clock");
        }
        self.state.display_mode = DisplayMode::Dark;
        self.state.dark_since_last_check = true;
        self.present(|d| d.set_blank(ClockColor::Off));

        match self
            .ctx
            .sensors
            .detect_wake_pulse(self.settings.shake_threshold)
        {
            Ok(true) => {
                self.ctx.logger.info(format!(
                    "wake pulse, showing time for {}",
                    humantime::format_duration(WAKE_DISPLAY)
                ));
                self.render_clock(false);
                self.ctx.clock.sleep(WAKE_DISPLAY);
                self.present(|d| d.set_blank(ClockColor::Off));
            }
            Ok(false) => {}
            Err(err) => self.ctx.logger.warn(format!(
                "shake read failed ({}): {err}",
                classify_error(&err)
            )),
        }
        self.ctx.clock.sleep(DARK_POLL);
    }

    fn showcase_cycle(&mut self, running: &AtomicBool) {
        self.state.display_mode = DisplayMode::WeatherShowcase;
        self.ctx.logger.info("room lit after dark, forcing time sync");
        self.attempt_time_sync();

        let deadline = self.ctx.clock.now() + self.settings.weather_time_display;
        self.field_index = 0;
        while running.load(Ordering::SeqCst) {
            let now = self.ctx.clock.now();
            if now >= deadline {
                break;
            }
            if self.time_sync.is_due(now) {
                self.attempt_time_sync();
            }
            if self.weather_sync.is_due(now) {
                self.attempt_weather_fetch();
            }

            let index = self.field_index;
            if let Err(err) = self
                .ctx
                .display
                .show_weather_field(self.snapshot.as_ref(), index)
            {
                self.ctx.logger.warn(format!("weather render failed: {err}"));
            }
            self.field_index = self.field_index.wrapping_add(1);
            self.ctx.clock.sleep(SHOWCASE_HOLD);
        }

        self.state.dark_since_last_check = false;
        self.state.display_mode = DisplayMode::Clock;
    }

    fn steady_cycle(&mut self) {
        self.state.display_mode = DisplayMode::Clock;
        if self.clock_refresh.is_due(self.ctx.clock.now()) {
            self.render_clock(true);
            self.attempt_time_sync();
        }
        self.render_clock(false);
        self.ctx.clock.sleep(STEADY_HOLD);
    }

    /// Fetch and apply network time. Timers only move on success.
    fn sync_time(&mut self) -> Result<TimeSample> {
        let sample = self.ctx.time.fetch_authoritative_time()?;
        self.ctx.time.apply_to_local_clock(&sample)?;
        let now = self.ctx.clock.now();
        self.time_sync.mark(now);
        self.clock_refresh.mark(now);
        Ok(sample)
    }

    fn attempt_time_sync(&mut self) {
        match self.sync_time() {
            Ok(sample) => self.ctx.logger.info(format!(
                "time synced: {:02}:{:02}:{:02}",
                sample.hour, sample.minute, sample.second
            )),
            Err(err) => self.ctx.logger.warn(format!(
                "time sync failed ({}): {err}",
                classify_error(&err)
            )),
        }
    }

    fn attempt_weather_fetch(&mut self) {
        let result = self
            .ctx
            .weather
            .fetch(&self.settings.location, self.settings.units);
        match result {
            Ok(snapshot) => {
                self.ctx.logger.info(format!(
                    "weather: {} {:.1}{} in {}",
                    snapshot.conditions,
                    snapshot.temperature,
                    snapshot.units.temperature_suffix(),
                    snapshot.location
                ));
                self.snapshot = Some(snapshot);
                self.weather_sync.mark(self.ctx.clock.now());
            }
            Err(err) => self.ctx.logger.warn(format!(
                "weather fetch failed ({}): {err}; {}",
                classify_error(&err),
                if self.snapshot.is_some() {
                    "keeping previous snapshot"
                } else {
                    "nothing to show yet"
                }
            )),
        }
    }

    fn render_clock(&mut self, force_colon: bool) {
        let sample = self.ctx.time.local_time();
        let colon = !self.settings.blink || force_colon || sample.second % 2 == 1;
        self.state.colon_visible = colon;
        let color = ClockColor::from(sample.color_theme());
        self.present(|d| d.show_clock(sample.hour_12(), sample.minute, colon, color));
    }

    fn present(&mut self, draw: impl FnOnce(&mut dyn DisplayPresenter) -> Result<()>) {
        if let Err(err) = draw(self.ctx.display.as_mut()) {
            self.ctx.logger.warn(format!("display update failed: {err}"));
        }
    }
}
