use std::io::Read;
use std::time::Duration;

use serde::Deserialize;

use super::{Units, WeatherFetcher, WeatherSnapshot};
use crate::{Error, Result};

pub const DEFAULT_ENDPOINT: &str = "https://api.openweathermap.org/data/2.5/weather";
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(10);
pub const MAX_BODY_BYTES: usize = 32 * 1024;

/// Blocking OpenWeatherMap current-weather client.
pub struct OpenWeatherFetcher {
    agent: ureq::Agent,
    endpoint: String,
    token: String,
}

impl OpenWeatherFetcher {
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_endpoint(DEFAULT_ENDPOINT, token)
    }

    pub fn with_endpoint(endpoint: impl Into<String>, token: impl Into<String>) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(HTTP_TIMEOUT).build();
        Self {
            agent,
            endpoint: endpoint.into(),
            token: token.into(),
        }
    }
}

impl WeatherFetcher for OpenWeatherFetcher {
    fn fetch(&mut self, location: &str, units: Units) -> Result<WeatherSnapshot> {
        let response = self
            .agent
            .get(&self.endpoint)
            .query("q", location)
            .query("units", units.as_str())
            .query("appid", &self.token)
            .call()
            .map_err(|err| match err {
                ureq::Error::Status(code, _) => Error::Protocol(format!("status {code}")),
                ureq::Error::Transport(transport) => Error::Transport(transport.to_string()),
            })?;

        // ureq accepts any 2xx/3xx it did not follow; only 200 counts here.
        if response.status() != 200 {
            return Err(Error::Protocol(format!("status {}", response.status())));
        }

        let mut body = Vec::new();
        response
            .into_reader()
            .take(MAX_BODY_BYTES as u64 + 1)
            .read_to_end(&mut body)
            .map_err(|e| Error::Transport(format!("reading body: {e}")))?;
        if body.len() > MAX_BODY_BYTES {
            return Err(Error::Protocol(format!(
                "body exceeds {MAX_BODY_BYTES} bytes"
            )));
        }

        parse_response(&body, location, units)
    }
}

#[derive(Deserialize)]
struct OwmCurrent {
    main: Option<OwmMain>,
    weather: Option<Vec<OwmWeather>>,
    wind: Option<OwmWind>,
    name: Option<String>,
    sys: Option<OwmSys>,
}

#[derive(Deserialize)]
struct OwmMain {
    temp: Option<f32>,
    feels_like: Option<f32>,
    humidity: Option<u8>,
}

#[derive(Deserialize)]
struct OwmWeather {
    main: Option<String>,
    description: Option<String>,
}

#[derive(Deserialize)]
struct OwmWind {
    speed: Option<f32>,
}

#[derive(Deserialize)]
struct OwmSys {
    country: Option<String>,
}

/// Turn a current-weather JSON body into a snapshot. Temperature and a
/// condition are required; everything else is optional.
pub fn parse_response(body: &[u8], requested: &str, units: Units) -> Result<WeatherSnapshot> {
    let root: OwmCurrent =
        serde_json::from_slice(body).map_err(|e| Error::Protocol(format!("json: {e}")))?;

    let main = root
        .main
        .ok_or_else(|| Error::Protocol("missing 'main' object".into()))?;
    let temperature = main
        .temp
        .ok_or_else(|| Error::Protocol("missing temperature".into()))?;

    let conditions = root
        .weather
        .unwrap_or_default()
        .into_iter()
        .find_map(|w| w.main.or(w.description))
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| Error::Protocol("missing weather condition".into()))?;

    let location = match (root.name.filter(|n| !n.is_empty()), root.sys.and_then(|s| s.country)) {
        (Some(name), Some(country)) if !country.is_empty() => format!("{name}, {country}"),
        (Some(name), _) => name,
        (None, _) => requested.to_string(),
    };

    Ok(WeatherSnapshot {
        temperature,
        conditions,
        location,
        feels_like: main.feels_like,
        humidity: main.humidity,
        wind_speed: root.wind.and_then(|w| w.speed),
        units,
    })
}
