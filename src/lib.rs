pub mod app;
pub mod cli;
pub mod config;
pub mod display;
pub mod errors;
pub mod lcd_driver;
pub mod sensors;
pub mod timekeeping;
pub mod weather;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    InvalidArgs(String),
    Io(std::io::Error),
    /// Network unreachable, DNS failure or timeout.
    Transport(String),
    /// Peer answered, but not with something we accept (non-200, bad body).
    Protocol(String),
    SensorRead(String),
    ClockApply(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidArgs(msg) => write!(f, "invalid arguments: {msg}"),
            Error::Io(err) => write!(f, "io error: {err}"),
            Error::Transport(msg) => write!(f, "transport error: {msg}"),
            Error::Protocol(msg) => write!(f, "protocol error: {msg}"),
            Error::SensorRead(msg) => write!(f, "sensor read error: {msg}"),
            Error::ClockApply(msg) => write!(f, "clock apply error: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Error::Io(value)
    }
}
