//! Deterministic stand-in weather, keyed only by city name.
//!
//! The same name always produces the same record, across calls and across
//! processes, so mocked cards stay stable between refreshes.

use crate::model::WeatherRecord;

/// Fixed condition template the generator picks from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Archetype {
    pub condition: &'static str,
    pub icon_code: &'static str,
    /// Inclusive range in °C.
    pub temp_range_c: (f64, f64),
}

pub const ARCHETYPES: [Archetype; 6] = [
    Archetype { condition: "clear sky", icon_code: "01d", temp_range_c: (25.0, 35.0) },
    Archetype { condition: "few clouds", icon_code: "02d", temp_range_c: (20.0, 30.0) },
    Archetype { condition: "scattered clouds", icon_code: "03d", temp_range_c: (15.0, 25.0) },
    Archetype { condition: "light rain", icon_code: "10d", temp_range_c: (10.0, 20.0) },
    Archetype { condition: "rain", icon_code: "09d", temp_range_c: (8.0, 18.0) },
    Archetype { condition: "thunderstorm", icon_code: "11d", temp_range_c: (12.0, 22.0) },
];

/// 31-multiplier rolling hash over UTF-16 code units with 32-bit signed
/// wraparound.
pub fn city_hash(name: &str) -> i32 {
    name.encode_utf16().fold(0i32, |hash, unit| {
        hash.wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(i32::from(unit))
    })
}

/// `abs(hash) mod 6`, without overflowing on `i32::MIN`.
pub fn archetype_index(hash: i32) -> usize {
    (hash.unsigned_abs() % ARCHETYPES.len() as u32) as usize
}

/// `abs(hash rem modulus)` with the remainder taking the sign of `hash`.
fn abs_rem(hash: i32, modulus: i32) -> u32 {
    (hash % modulus).unsigned_abs()
}

pub fn mock_weather(city_name: &str) -> WeatherRecord {
    let hash = city_hash(city_name);
    let archetype = ARCHETYPES[archetype_index(hash)];
    let (low, high) = archetype.temp_range_c;

    let base = low + (f64::from(abs_rem(hash, 1000)) / 1000.0) * (high - low);
    let temperature_c = (base * 10.0).round() / 10.0;
    let feels_like_c = temperature_c + (f64::from(abs_rem(hash, 10)) - 5.0);
    let humidity_pct = 40 + abs_rem(hash, 40) as u8;
    let wind_speed_kmh = (f64::from(2 + abs_rem(hash, 15)) * 3.6).round();
    let visibility_km = (f64::from(3 + abs_rem(hash, 12)) * 1000.0).round() / 1000.0;

    WeatherRecord {
        temperature_c,
        feels_like_c,
        condition: archetype.condition.to_string(),
        icon_code: Some(archetype.icon_code.to_string()),
        humidity_pct,
        wind_speed_kmh,
        visibility_km,
    }
}
