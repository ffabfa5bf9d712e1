use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of a tracked city; the only key used for list membership
/// and for the readings map.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CityId(String);

impl CityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Id for a city added at `now`: lowercased name with whitespace runs
    /// collapsed to `-`, suffixed with the unix time in milliseconds.
    pub fn generate(name: &str, now: DateTime<Utc>) -> Self {
        let slug = name
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("-");

        Self(format!("{slug}-{}", now.timestamp_millis()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lookup sent to a weather provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CityQuery {
    pub name: String,
    pub country_code: Option<String>,
}

impl CityQuery {
    pub fn new(name: impl Into<String>, country_code: Option<String>) -> Self {
        Self {
            name: name.into(),
            country_code: country_code.filter(|cc| !cc.trim().is_empty()),
        }
    }

    /// `name` or `name,CC` as expected by the `q` query parameter.
    pub fn to_query_string(&self) -> String {
        match &self.country_code {
            Some(cc) => format!("{},{}", self.name, cc),
            None => self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedCity {
    pub id: CityId,
    pub name: String,
    pub country_code: Option<String>,
}

impl TrackedCity {
    pub fn new(id: CityId, name: impl Into<String>, country_code: Option<String>) -> Self {
        Self {
            id,
            name: name.into(),
            country_code: country_code.filter(|cc| !cc.trim().is_empty()),
        }
    }

    pub fn query(&self) -> CityQuery {
        CityQuery::new(self.name.clone(), self.country_code.clone())
    }

    /// Case-insensitive name comparison used for duplicate detection.
    pub fn has_name(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.to_lowercase()
    }
}

/// Current conditions for one city, in metric units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub temperature_c: f64,
    pub feels_like_c: f64,
    pub condition: String,
    pub icon_code: Option<String>,
    pub humidity_pct: u8,
    pub wind_speed_kmh: f64,
    pub visibility_km: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadingSource {
    Live,
    Mock,
}

/// Latest record stored for a tracked city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub record: WeatherRecord,
    pub source: ReadingSource,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn query_string_includes_country_when_present() {
        let q = CityQuery::new("London", Some("GB".into()));
        assert_eq!(q.to_query_string(), "London,GB");

        let q = CityQuery::new("London", Some("  ".into()));
        assert_eq!(q.to_query_string(), "London");
    }

    #[test]
    fn generated_id_slugs_name_and_appends_millis() {
        let now = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        let id = CityId::generate("  Rio   de Janeiro ", now);
        assert_eq!(id.as_str(), "rio-de-janeiro-1700000000123");
    }

    #[test]
    fn has_name_ignores_case() {
        let city = TrackedCity::new(CityId::new("tokyo"), "Tokyo", Some("JP".into()));
        assert!(city.has_name("TOKYO"));
        assert!(!city.has_name("Kyoto"));
    }
}
