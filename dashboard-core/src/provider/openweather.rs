use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

use crate::{CityQuery, WeatherError, WeatherRecord};

use super::WeatherProvider;

/// Visibility reported when the response carries none.
const DEFAULT_VISIBILITY_KM: f64 = 10.0;

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String, base_url: String, timeout: Duration) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client for OpenWeather")?;

        Ok(Self { api_key, base_url, http })
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    feels_like: f64,
    humidity: u8,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    description: String,
    icon: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    main: OwMain,
    weather: Vec<OwWeather>,
    wind: OwWind,
    visibility: Option<f64>,
}

impl OwCurrentResponse {
    fn into_record(self) -> Result<WeatherRecord, WeatherError> {
        let weather = self
            .weather
            .into_iter()
            .next()
            .ok_or_else(|| WeatherError::Parse("response contained no weather entries".into()))?;

        let visibility_km = match self.visibility {
            Some(meters) if meters > 0.0 => (meters / 1000.0).round(),
            _ => DEFAULT_VISIBILITY_KM,
        };

        Ok(WeatherRecord {
            temperature_c: self.main.temp,
            feels_like_c: self.main.feels_like,
            condition: weather.description,
            icon_code: weather.icon,
            humidity_pct: self.main.humidity,
            wind_speed_kmh: (self.wind.speed * 3.6).round(),
            visibility_km,
        })
    }
}

fn classify_status(status: StatusCode, city: &str) -> WeatherError {
    match status {
        StatusCode::NOT_FOUND => WeatherError::CityNotFound { city: city.to_string() },
        StatusCode::UNAUTHORIZED => WeatherError::InvalidApiKey,
        other => WeatherError::Service { status: other.as_u16() },
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn current_weather(&self, query: &CityQuery) -> Result<WeatherRecord, WeatherError> {
        let q = query.to_query_string();
        tracing::debug!(query = %q, "requesting current weather");

        let res = self
            .http
            .get(&self.base_url)
            .query(&[
                ("q", q.as_str()),
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
            ])
            .send()
            .await
            .map_err(|e| WeatherError::Transport(e.to_string()))?;

        let status = res.status();
        let body = res.text().await.map_err(|e| WeatherError::Transport(e.to_string()))?;

        if !status.is_success() {
            tracing::debug!(%status, body = %truncate_body(&body), "OpenWeather request failed");
            return Err(classify_status(status, &query.name));
        }

        let parsed: OwCurrentResponse =
            serde_json::from_str(&body).map_err(|e| WeatherError::Parse(e.to_string()))?;

        parsed.into_record()
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.chars().count() > MAX {
        format!("{}...", body.chars().take(MAX).collect::<String>())
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const WEATHER_PATH: &str = "/data/2.5/weather";

    fn provider_for(server: &MockServer) -> OpenWeatherProvider {
        OpenWeatherProvider::new(
            "test_key".into(),
            format!("{}{WEATHER_PATH}", server.uri()),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn tokyo() -> CityQuery {
        CityQuery::new("Tokyo", Some("JP".into()))
    }

    async fn respond_with(status: u16) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(WEATHER_PATH))
            .respond_with(ResponseTemplate::new(status).set_body_json(json!({"cod": status})))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn parses_current_weather_and_converts_units() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(WEATHER_PATH))
            .and(query_param("q", "Tokyo,JP"))
            .and(query_param("appid", "test_key"))
            .and(query_param("units", "metric"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "Tokyo",
                "main": {"temp": 18.4, "feels_like": 17.9, "humidity": 63},
                "weather": [
                    {"description": "broken clouds", "icon": "04d"},
                    {"description": "mist", "icon": "50d"}
                ],
                "wind": {"speed": 4.6},
                "visibility": 8500
            })))
            .mount(&server)
            .await;

        let record = provider_for(&server).current_weather(&tokyo()).await.unwrap();

        assert_eq!(record.temperature_c, 18.4);
        assert_eq!(record.feels_like_c, 17.9);
        assert_eq!(record.condition, "broken clouds");
        assert_eq!(record.icon_code.as_deref(), Some("04d"));
        assert_eq!(record.humidity_pct, 63);
        assert_eq!(record.wind_speed_kmh, 17.0);
        assert_eq!(record.visibility_km, 9.0);
    }

    #[tokio::test]
    async fn missing_or_zero_visibility_defaults_to_ten_km() {
        for visibility in [json!(null), json!(0)] {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path(WEATHER_PATH))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "main": {"temp": 1.0, "feels_like": -2.0, "humidity": 90},
                    "weather": [{"description": "snow", "icon": "13d"}],
                    "wind": {"speed": 1.0},
                    "visibility": visibility
                })))
                .mount(&server)
                .await;

            let record = provider_for(&server).current_weather(&tokyo()).await.unwrap();
            assert_eq!(record.visibility_km, DEFAULT_VISIBILITY_KM);
        }
    }

    #[tokio::test]
    async fn not_found_is_classified() {
        let server = respond_with(404).await;
        let err = provider_for(&server).current_weather(&tokyo()).await.unwrap_err();
        assert_eq!(err, WeatherError::CityNotFound { city: "Tokyo".into() });
    }

    #[tokio::test]
    async fn unauthorized_is_classified() {
        let server = respond_with(401).await;
        let err = provider_for(&server).current_weather(&tokyo()).await.unwrap_err();
        assert_eq!(err, WeatherError::InvalidApiKey);
    }

    #[tokio::test]
    async fn other_statuses_are_service_errors() {
        let server = respond_with(500).await;
        let err = provider_for(&server).current_weather(&tokyo()).await.unwrap_err();
        assert_eq!(err, WeatherError::Service { status: 500 });
    }

    #[tokio::test]
    async fn malformed_body_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(WEATHER_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = provider_for(&server).current_weather(&tokyo()).await.unwrap_err();
        assert!(matches!(err, WeatherError::Parse(_)));
    }

    #[tokio::test]
    async fn empty_weather_list_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(WEATHER_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "main": {"temp": 1.0, "feels_like": 1.0, "humidity": 50},
                "weather": [],
                "wind": {"speed": 1.0}
            })))
            .mount(&server)
            .await;

        let err = provider_for(&server).current_weather(&tokyo()).await.unwrap_err();
        assert!(matches!(err, WeatherError::Parse(_)));
    }

    #[tokio::test]
    async fn unreachable_host_is_transport_error() {
        let provider = OpenWeatherProvider::new(
            "test_key".into(),
            "http://127.0.0.1:1/data/2.5/weather".into(),
            Duration::from_secs(2),
        )
        .unwrap();

        let err = provider.current_weather(&tokyo()).await.unwrap_err();
        assert!(matches!(err, WeatherError::Transport(_)));
    }

    #[test]
    fn truncate_body_respects_char_boundaries() {
        let body = "é".repeat(300);
        let truncated = truncate_body(&body);
        assert!(truncated.ends_with("..."));
        assert_eq!(truncated.chars().count(), 203);
    }
}
