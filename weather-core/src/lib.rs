//! Core library for the `weather` CLI.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The OpenWeather wire schema and per-city reports
//! - A cancellable task group and the multi-city fetchers built on it
//!
//! It is used by `weather-cli`, but can also be reused by other binaries or services.

pub mod config;
pub mod error;
pub mod fetch;
pub mod group;
pub mod model;
pub mod provider;

pub use config::{Config, FetchSettings};
pub use error::WeatherError;
pub use fetch::{FetchOptions, fetch_all, fetch_sequential};
pub use group::TaskGroup;
pub use model::{CurrentWeather, WeatherReport};
pub use provider::{OpenWeatherProvider, WeatherProvider};
