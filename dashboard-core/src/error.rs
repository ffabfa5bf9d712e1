use thiserror::Error;

/// Failures of a single weather fetch.
///
/// Classification happens where the HTTP status is inspected; callers decide
/// on mock fallback through [`WeatherError::is_fallback_eligible`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WeatherError {
    #[error("City \"{city}\" not found. Please check the spelling and try again.")]
    CityNotFound { city: String },

    #[error("Invalid API key. Please check your OpenWeatherMap API configuration.")]
    InvalidApiKey,

    #[error("Weather service error ({status}). Please try again later.")]
    Service { status: u16 },

    #[error("Failed to reach weather service: {0}")]
    Transport(String),

    #[error("Failed to parse weather response: {0}")]
    Parse(String),

    #[error("Please enter a city name.")]
    EmptyQuery,
}

impl WeatherError {
    /// Whether mock data may stand in for this failure. Not-found and
    /// credential errors are always surfaced to the user.
    pub fn is_fallback_eligible(&self) -> bool {
        matches!(
            self,
            WeatherError::Service { .. } | WeatherError::Transport(_) | WeatherError::Parse(_)
        )
    }
}
