//! Forecast response model.

use serde::Deserialize;

/// Current air temperature in degrees Celsius.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TemperatureReading {
    celsius: f32,
}

impl TemperatureReading {
    pub const fn from_celsius(celsius: f32) -> Self {
        Self { celsius }
    }

    pub const fn celsius(&self) -> f32 {
        self.celsius
    }
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current: CurrentConditions,
}

#[derive(Debug, Deserialize)]
struct CurrentConditions {
    temperature_2m: f32,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ParseError {
    /// Body is not JSON or lacks `current.temperature_2m`.
    Malformed,
    /// Field present but not a finite number.
    NotFinite,
}

/// Extracts `current.temperature_2m`; unrelated fields are ignored.
pub fn parse_current_temperature(body: &[u8]) -> Result<TemperatureReading, ParseError> {
    let (response, _) = serde_json_core::from_slice::<ForecastResponse>(body)
        .map_err(|_| ParseError::Malformed)?;
    let celsius = response.current.temperature_2m;
    if !celsius.is_finite() {
        return Err(ParseError::NotFinite);
    }
    Ok(TemperatureReading::from_celsius(celsius))
}
