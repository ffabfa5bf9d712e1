use std::collections::HashMap;

use crate::model::{CityId, Reading, TrackedCity};

/// Tracked cities, their latest readings and the error banner.
///
/// Readings are keyed by city id; a reading is only ever stored for a city
/// that is currently tracked.
#[derive(Debug, Clone, Default)]
pub struct DashboardState {
    cities: Vec<TrackedCity>,
    readings: HashMap<CityId, Reading>,
    error: Option<String>,
}

impl DashboardState {
    pub fn with_cities(cities: impl IntoIterator<Item = TrackedCity>) -> Self {
        let mut state = Self::default();
        for city in cities {
            state.insert_city(city);
        }
        state
    }

    pub fn cities(&self) -> &[TrackedCity] {
        &self.cities
    }

    pub fn city(&self, id: &CityId) -> Option<&TrackedCity> {
        self.cities.iter().find(|c| &c.id == id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&TrackedCity> {
        self.cities.iter().find(|c| c.has_name(name))
    }

    /// Appends `city` unless its id or (case-insensitive) name is already
    /// tracked. Returns whether it was added.
    pub fn insert_city(&mut self, city: TrackedCity) -> bool {
        if self.city(&city.id).is_some() || self.find_by_name(&city.name).is_some() {
            return false;
        }
        self.cities.push(city);
        true
    }

    /// Removes the city and its reading.
    pub fn remove_city(&mut self, id: &CityId) -> Option<TrackedCity> {
        let pos = self.cities.iter().position(|c| &c.id == id)?;
        self.readings.remove(id);
        Some(self.cities.remove(pos))
    }

    /// Overwrites the reading for a tracked city; ignored for unknown ids.
    pub fn record_reading(&mut self, id: &CityId, reading: Reading) -> bool {
        if self.city(id).is_none() {
            return false;
        }
        self.readings.insert(id.clone(), reading);
        true
    }

    pub fn reading(&self, id: &CityId) -> Option<&Reading> {
        self.readings.get(id)
    }

    pub fn readings(&self) -> &HashMap<CityId, Reading> {
        &self.readings
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ReadingSource, mock::mock_weather};
    use chrono::Utc;

    fn city(id: &str, name: &str) -> TrackedCity {
        TrackedCity::new(CityId::new(id), name, None)
    }

    fn reading(name: &str) -> Reading {
        Reading { record: mock_weather(name), source: ReadingSource::Mock, updated_at: Utc::now() }
    }

    #[test]
    fn duplicate_names_are_rejected_case_insensitively() {
        let mut state = DashboardState::with_cities([city("tokyo", "Tokyo")]);

        assert!(!state.insert_city(city("tokyo-2", "TOKYO")));
        assert!(!state.insert_city(city("tokyo", "Kyoto")));
        assert!(state.insert_city(city("kyoto", "Kyoto")));
        assert_eq!(state.cities().len(), 2);
    }

    #[test]
    fn readings_only_stored_for_tracked_cities() {
        let mut state = DashboardState::with_cities([city("oslo", "Oslo")]);

        assert!(state.record_reading(&CityId::new("oslo"), reading("Oslo")));
        assert!(!state.record_reading(&CityId::new("ghost"), reading("Ghost")));
        assert_eq!(state.readings().len(), 1);
    }

    #[test]
    fn remove_drops_reading_and_allows_last_city() {
        let id = CityId::new("oslo");
        let mut state = DashboardState::with_cities([city("oslo", "Oslo")]);
        state.record_reading(&id, reading("Oslo"));

        let removed = state.remove_city(&id).unwrap();
        assert_eq!(removed.name, "Oslo");
        assert!(state.cities().is_empty());
        assert!(state.reading(&id).is_none());
        assert!(state.remove_city(&id).is_none());
    }

    #[test]
    fn error_banner_holds_latest_message() {
        let mut state = DashboardState::default();
        state.set_error("first");
        state.set_error("second");
        assert_eq!(state.error(), Some("second"));

        state.clear_error();
        assert_eq!(state.error(), None);
    }
}
