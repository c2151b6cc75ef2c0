//! Multi-city fetching: the all-or-nothing concurrent fan-out and a
//! best-effort sequential loop.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{WeatherError, WeatherProvider, WeatherReport, group::TaskGroup};

#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Cap on requests in flight; `None` launches one task per city at once.
    pub max_concurrency: Option<usize>,
    /// Caller-owned scope. Cancel it to abort the batch (e.g. on a timeout).
    pub cancel: CancellationToken,
}

/// Fetch every city concurrently.
///
/// Returns one report per requested city, in completion order, or the first
/// error captured by the group. Partial results are discarded on failure.
pub async fn fetch_all(
    provider: Arc<dyn WeatherProvider>,
    cities: &[String],
    options: &FetchOptions,
) -> Result<Vec<WeatherReport>, WeatherError> {
    validate_cities(cities)?;

    // Sized to the batch so no sender ever waits on the buffer.
    let (tx, mut rx) = mpsc::channel(cities.len());

    let mut group: TaskGroup<WeatherError> = TaskGroup::new(&options.cancel);
    if let Some(limit) = options.max_concurrency {
        group = group.with_limit(limit);
    }

    for city in cities {
        let provider = Arc::clone(&provider);
        let tx = tx.clone();
        let city = city.clone();

        group.spawn(move |token| async move {
            tracing::debug!(%city, "requesting current weather");

            let current = provider.current(&city, &token).await.inspect_err(|err| {
                if !err.is_cancelled() {
                    tracing::warn!(%city, error = %err, "weather request failed");
                }
            })?;

            tracing::debug!(
                %city,
                temperature = current.main.temp,
                observed_at = ?current.observed_at(),
                "received current weather"
            );

            tx.send(WeatherReport::from_current(city, &current))
                .await
                .map_err(|_| WeatherError::Cancelled)
        });
    }
    drop(tx);

    group.wait().await?;

    let mut reports = Vec::with_capacity(cities.len());
    while let Some(report) = rx.recv().await {
        reports.push(report);
    }

    // Members skipped by a parent cancellation leave no error behind.
    if reports.len() != cities.len() {
        return Err(WeatherError::Cancelled);
    }

    Ok(reports)
}

/// Fetch cities one at a time, keeping per-city outcomes.
///
/// A failing city does not stop the loop; cancelling `cancel` does, and the
/// remaining cities are left out of the result.
pub async fn fetch_sequential(
    provider: &dyn WeatherProvider,
    cities: &[String],
    cancel: &CancellationToken,
) -> Result<Vec<(String, Result<WeatherReport, WeatherError>)>, WeatherError> {
    validate_cities(cities)?;

    let mut outcomes = Vec::with_capacity(cities.len());
    for city in cities {
        if cancel.is_cancelled() {
            tracing::info!(remaining = cities.len() - outcomes.len(), "sequential fetch cancelled");
            break;
        }

        let outcome = provider
            .current(city, cancel)
            .await
            .map(|current| WeatherReport::from_current(city.as_str(), &current));

        if let Err(err) = &outcome {
            tracing::warn!(%city, error = %err, "weather request failed");
        }
        outcomes.push((city.clone(), outcome));
    }

    Ok(outcomes)
}

pub fn validate_cities(cities: &[String]) -> Result<(), WeatherError> {
    if cities.is_empty() {
        return Err(WeatherError::Configuration("must provide at least 1 city".to_string()));
    }

    if let Some(pos) = cities.iter().position(|c| c.trim().is_empty()) {
        return Err(WeatherError::Configuration(format!(
            "city name at position {} is empty",
            pos + 1
        )));
    }

    Ok(())
}
