use crate::{CurrentWeather, WeatherError};
use async_trait::async_trait;
use std::fmt::Debug;
use tokio_util::sync::CancellationToken;

pub mod openweather;

pub use openweather::OpenWeatherProvider;

/// A backend able to report the current weather for a city by name.
///
/// Implementations must return [`WeatherError::Cancelled`] promptly once
/// `cancel` fires, unless the response has already arrived.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn current(
        &self,
        city: &str,
        cancel: &CancellationToken,
    ) -> Result<CurrentWeather, WeatherError>;
}
