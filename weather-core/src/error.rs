use thiserror::Error;

/// Everything that can go wrong while resolving settings or fetching a city.
///
/// At the batch level only the first captured error is returned, so these
/// variants carry no city attribution.
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("unexpected error getting weather for city: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("weather API responded with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected error parsing weather response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("request cancelled")]
    Cancelled,
}

impl WeatherError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, WeatherError::Cancelled)
    }
}
