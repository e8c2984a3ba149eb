//! Current-conditions weather: the snapshot type, the fetcher seam, and the
//! field list the presenter scrolls through.

use crate::Result;

pub mod openweather;

pub use openweather::OpenWeatherFetcher;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Units {
    #[default]
    Imperial,
    Metric,
}

impl Units {
    pub fn as_str(self) -> &'static str {
        match self {
            Units::Imperial => "imperial",
            Units::Metric => "metric",
        }
    }

    pub fn temperature_suffix(self) -> &'static str {
        match self {
            Units::Imperial => "F",
            Units::Metric => "C",
        }
    }

    pub fn speed_suffix(self) -> &'static str {
        match self {
            Units::Imperial => "mph",
            Units::Metric => "m/s",
        }
    }
}

impl std::str::FromStr for Units {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "imperial" => Ok(Units::Imperial),
            "metric" => Ok(Units::Metric),
            _ => Err("expected 'imperial' or 'metric'".into()),
        }
    }
}

/// One successful weather response. Replaced wholesale on every good fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherSnapshot {
    pub temperature: f32,
    pub conditions: String,
    pub location: String,
    pub feels_like: Option<f32>,
    pub humidity: Option<u8>,
    pub wind_speed: Option<f32>,
    pub units: Units,
}

/// Fields shown during the showcase, in scroll order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeatherField {
    Conditions,
    Temperature,
    FeelsLike,
    Humidity,
    Wind,
    Location,
}

pub const WEATHER_FIELDS: [WeatherField; 6] = [
    WeatherField::Conditions,
    WeatherField::Temperature,
    WeatherField::FeelsLike,
    WeatherField::Humidity,
    WeatherField::Wind,
    WeatherField::Location,
];

impl WeatherField {
    /// Wraps, so the controller can keep counting up.
    pub fn from_index(index: usize) -> Self {
        WEATHER_FIELDS[index % WEATHER_FIELDS.len()]
    }

    pub fn label(self) -> &'static str {
        match self {
            WeatherField::Conditions => "Now",
            WeatherField::Temperature => "Temp",
            WeatherField::FeelsLike => "Feels like",
            WeatherField::Humidity => "Humidity",
            WeatherField::Wind => "Wind",
            WeatherField::Location => "Location",
        }
    }
}

impl WeatherSnapshot {
    /// Text for one field; `--` when the response omitted it.
    pub fn field_value(&self, field: WeatherField) -> String {
        let temp = self.units.temperature_suffix();
        match field {
            WeatherField::Conditions => self.conditions.clone(),
            WeatherField::Temperature => format!("{:.0}{temp}", self.temperature),
            WeatherField::FeelsLike => self
                .feels_like
                .map(|v| format!("{v:.0}{temp}"))
                .unwrap_or_else(|| "--".into()),
            WeatherField::Humidity => self
                .humidity
                .map(|v| format!("{v}%"))
                .unwrap_or_else(|| "--".into()),
            WeatherField::Wind => self
                .wind_speed
                .map(|v| format!("{v:.0} {}", self.units.speed_suffix()))
                .unwrap_or_else(|| "--".into()),
            WeatherField::Location => self.location.clone(),
        }
    }
}

/// One network request per call, no internal retry.
pub trait WeatherFetcher {
    fn fetch(&mut self, location: &str, units: Units) -> Result<WeatherSnapshot>;
}
