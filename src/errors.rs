use crate::Error;
use serde::Serialize;
use std::fmt;
use std::io::ErrorKind;

/// High-level reason an operation did not complete this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Timeout,
    Unreachable,
    BadStatus,
    MalformedBody,
    SensorRead,
    ClockApply,
    PermissionDenied,
    Config,
    Unknown,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Timeout => "timeout",
            FailureKind::Unreachable => "unreachable",
            FailureKind::BadStatus => "bad_status",
            FailureKind::MalformedBody => "malformed_body",
            FailureKind::SensorRead => "sensor_read",
            FailureKind::ClockApply => "clock_apply",
            FailureKind::PermissionDenied => "permission_denied",
            FailureKind::Config => "config",
            FailureKind::Unknown => "unknown",
        }
    }

    /// Network-side failures are the ones the controller retries on the next
    /// eligible cycle.
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            FailureKind::Timeout
                | FailureKind::Unreachable
                | FailureKind::BadStatus
                | FailureKind::MalformedBody
        )
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a crate-level error for log lines.
pub fn classify_error(err: &Error) -> FailureKind {
    match err {
        Error::InvalidArgs(_) => FailureKind::Config,
        Error::Io(io_err) => classify_io_error(io_err),
        Error::Transport(msg) => {
            let lower = msg.to_ascii_lowercase();
            if lower.contains("timed out") || lower.contains("timeout") {
                FailureKind::Timeout
            } else {
                FailureKind::Unreachable
            }
        }
        Error::Protocol(msg) => {
            if msg.starts_with("status") {
                FailureKind::BadStatus
            } else {
                FailureKind::MalformedBody
            }
        }
        Error::SensorRead(_) => FailureKind::SensorRead,
        Error::ClockApply(_) => FailureKind::ClockApply,
    }
}

/// Classify an std::io::Error raised by sockets or device files.
pub fn classify_io_error(err: &std::io::Error) -> FailureKind {
    match err.kind() {
        ErrorKind::PermissionDenied => FailureKind::PermissionDenied,
        ErrorKind::TimedOut | ErrorKind::WouldBlock => FailureKind::Timeout,
        ErrorKind::ConnectionRefused
        | ErrorKind::ConnectionReset
        | ErrorKind::ConnectionAborted
        | ErrorKind::NotConnected
        | ErrorKind::AddrNotAvailable
        | ErrorKind::BrokenPipe => FailureKind::Unreachable,
        ErrorKind::InvalidData | ErrorKind::UnexpectedEof => FailureKind::MalformedBody,
        ErrorKind::InvalidInput => FailureKind::Config,
        _ => match err.raw_os_error() {
            // 1 = EPERM, 13 = EACCES, 101 = ENETUNREACH, 110 = ETIMEDOUT, 113 = EHOSTUNREACH
            Some(1) | Some(13) => FailureKind::PermissionDenied,
            Some(101) | Some(113) => FailureKind::Unreachable,
            Some(110) => FailureKind::Timeout,
            _ => FailureKind::Unknown,
        },
    }
}
