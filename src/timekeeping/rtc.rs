use std::time::{Instant, SystemTime, UNIX_EPOCH};

use crate::Result;

/// The device's local wall clock.
pub trait Rtc {
    fn set(&mut self, utc_secs: i64) -> Result<()>;
    fn now_utc(&self) -> i64;
}

fn system_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// In-process clock: the last synced second anchored to a monotonic instant.
/// Before the first sync it reads the host's wall clock.
#[derive(Debug, Default)]
pub struct SoftRtc {
    anchor: Option<(i64, Instant)>,
}

impl SoftRtc {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Rtc for SoftRtc {
    fn set(&mut self, utc_secs: i64) -> Result<()> {
        self.anchor = Some((utc_secs, Instant::now()));
        Ok(())
    }

    fn now_utc(&self) -> i64 {
        match self.anchor {
            Some((secs, at)) => secs + at.elapsed().as_secs() as i64,
            None => system_now(),
        }
    }
}

/// Writes CLOCK_REALTIME. Needs CAP_SYS_TIME.
#[derive(Debug, Default)]
pub struct SystemRtc;

impl SystemRtc {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(target_os = "linux")]
impl Rtc for SystemRtc {
    fn set(&mut self, utc_secs: i64) -> Result<()> {
        use rustix::time::{clock_settime, ClockId, Timespec};

        let ts = Timespec {
            tv_sec: utc_secs,
            tv_nsec: 0,
        };
        clock_settime(ClockId::Realtime, ts)
            .map_err(|e| crate::Error::ClockApply(format!("clock_settime: {e}")))
    }

    fn now_utc(&self) -> i64 {
        system_now()
    }
}

#[cfg(not(target_os = "linux"))]
impl Rtc for SystemRtc {
    fn set(&mut self, _utc_secs: i64) -> Result<()> {
        Err(crate::Error::ClockApply(
            "setting the system clock is only supported on Linux".into(),
        ))
    }

    fn now_utc(&self) -> i64 {
        system_now()
    }
}
