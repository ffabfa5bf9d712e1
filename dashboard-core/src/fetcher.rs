use std::sync::Arc;

use crate::{
    CityQuery, ReadingSource, WeatherError, WeatherProvider, WeatherRecord, mock::mock_weather,
};

/// Result of a fetch that produced a record, live or mocked.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOutcome {
    pub record: WeatherRecord,
    pub source: ReadingSource,
}

/// Live fetch with mock fallback.
///
/// Only [`WeatherError::CityNotFound`] and [`WeatherError::InvalidApiKey`]
/// reach the caller; every other failure is replaced by [`mock_weather`].
#[derive(Debug, Clone)]
pub struct Fetcher {
    provider: Option<Arc<dyn WeatherProvider>>,
}

impl Fetcher {
    pub fn new(provider: Arc<dyn WeatherProvider>) -> Self {
        Self { provider: Some(provider) }
    }

    /// Fetcher without a live provider; always answers with mock data.
    pub fn offline() -> Self {
        Self { provider: None }
    }

    pub fn is_offline(&self) -> bool {
        self.provider.is_none()
    }

    pub async fn fetch(&self, query: &CityQuery) -> Result<FetchOutcome, WeatherError> {
        let Some(provider) = &self.provider else {
            return Ok(Self::mocked(query));
        };

        match provider.current_weather(query).await {
            Ok(record) => Ok(FetchOutcome { record, source: ReadingSource::Live }),
            Err(err) if err.is_fallback_eligible() => {
                tracing::warn!(
                    city = %query.name,
                    error = %err,
                    "live fetch failed, using mock data"
                );
                Ok(Self::mocked(query))
            }
            Err(err) => Err(err),
        }
    }

    fn mocked(query: &CityQuery) -> FetchOutcome {
        FetchOutcome { record: mock_weather(&query.name), source: ReadingSource::Mock }
    }
}
