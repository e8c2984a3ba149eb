//! Authoritative time: a network reference, a local clock it is written into,
//! and the civil-time sample the display consumes.

use std::time::{Duration, Instant};

use chrono::{DateTime, FixedOffset, Timelike, Utc};

use crate::{Error, Result};

pub mod rtc;
pub mod sntp;

pub use rtc::{Rtc, SoftRtc, SystemRtc};
pub use sntp::SntpReference;

/// How long a network answer is trusted before asking the server again.
pub const NETWORK_CACHE_TTL: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorTheme {
    Day,
    Night,
}

/// Civil time in the configured offset plus the UTC second it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSample {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub timestamp: i64,
}

impl TimeSample {
    pub fn from_timestamp(utc_secs: i64, offset_hours: i8) -> Result<Self> {
        let offset = FixedOffset::east_opt(i32::from(offset_hours) * 3600).ok_or_else(|| {
            Error::InvalidArgs(format!("timezone offset {offset_hours}h out of range"))
        })?;
        let utc = DateTime::<Utc>::from_timestamp(utc_secs, 0)
            .ok_or_else(|| Error::Protocol(format!("timestamp {utc_secs} out of range")))?;
        let local = utc.with_timezone(&offset);
        Ok(Self {
            hour: local.hour() as u8,
            minute: local.minute() as u8,
            second: local.second() as u8,
            timestamp: utc_secs,
        })
    }

    /// 0 -> 12, 13..23 -> 1..11.
    pub fn hour_12(&self) -> u8 {
        match self.hour {
            0 => 12,
            h if h > 12 => h - 12,
            h => h,
        }
    }

    pub fn color_theme(&self) -> ColorTheme {
        if self.hour >= 18 || self.hour < 6 {
            ColorTheme::Night
        } else {
            ColorTheme::Day
        }
    }
}

/// Network time reference plus the device's local clock.
pub trait TimeSource {
    fn fetch_authoritative_time(&mut self) -> Result<TimeSample>;
    fn apply_to_local_clock(&mut self, sample: &TimeSample) -> Result<()>;
    /// Whatever the local clock says right now; never touches the network.
    fn local_time(&self) -> TimeSample;
}

/// Something that can answer "what is the UTC epoch second now".
pub trait TimeReference {
    fn query(&mut self) -> Result<i64>;
    fn describe(&self) -> String;
}

pub struct NetworkTimeSource {
    reference: Box<dyn TimeReference>,
    rtc: Box<dyn Rtc>,
    offset_hours: i8,
    cached: Option<(i64, Instant)>,
}

impl NetworkTimeSource {
    pub fn new(reference: Box<dyn TimeReference>, rtc: Box<dyn Rtc>, offset_hours: i8) -> Self {
        Self {
            reference,
            rtc,
            offset_hours,
            cached: None,
        }
    }

    /// Fetch as of `now`. A cached answer younger than the TTL is advanced by
    /// the elapsed monotonic time instead of asking the server again.
    pub fn fetch_at(&mut self, now: Instant) -> Result<TimeSample> {
        if let Some((secs, at)) = self.cached {
            let age = now.saturating_duration_since(at);
            if age < NETWORK_CACHE_TTL {
                return TimeSample::from_timestamp(secs + age.as_secs() as i64, self.offset_hours);
            }
        }
        let secs = self.reference.query()?;
        self.cached = Some((secs, now));
        TimeSample::from_timestamp(secs, self.offset_hours)
    }
}

impl TimeSource for NetworkTimeSource {
    fn fetch_authoritative_time(&mut self) -> Result<TimeSample> {
        self.fetch_at(Instant::now())
    }

    fn apply_to_local_clock(&mut self, sample: &TimeSample) -> Result<()> {
        self.rtc.set(sample.timestamp)
    }

    fn local_time(&self) -> TimeSample {
        let now = self.rtc.now_utc();
        // Offset is range-checked at config load.
        TimeSample::from_timestamp(now, self.offset_hours).unwrap_or(TimeSample {
            hour: 0,
            minute: 0,
            second: 0,
            timestamp: now,
        })
    }
}
