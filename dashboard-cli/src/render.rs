use chrono::Local;
use dashboard_core::{Reading, ReadingSource, Snapshot, TrackedCity};
use std::fmt::Write;

/// Emoji for a reading: the provider icon code wins, condition keywords are
/// the fallback.
pub fn icon_for(condition: &str, icon_code: Option<&str>) -> &'static str {
    if let Some(code) = icon_code {
        return match code {
            "01d" => "☀️",
            "01n" => "🌙",
            "02d" => "⛅",
            "02n" | "03d" | "03n" | "04d" | "04n" => "☁️",
            "09d" | "09n" | "10n" => "🌧️",
            "10d" => "🌦️",
            "11d" | "11n" => "⛈️",
            "13d" | "13n" => "❄️",
            "50d" | "50n" => "🌫️",
            _ => "🌤️",
        };
    }

    let condition = condition.to_lowercase();
    let has = |words: &[&str]| words.iter().any(|w| condition.contains(w));

    if has(&["clear", "sun"]) {
        "☀️"
    } else if has(&["cloud"]) {
        "☁️"
    } else if has(&["rain", "drizzle"]) {
        "🌧️"
    } else if has(&["snow"]) {
        "❄️"
    } else if has(&["thunder", "storm"]) {
        "⛈️"
    } else if has(&["mist", "fog"]) {
        "🌫️"
    } else {
        "🌤️"
    }
}

/// Plain-text card for one city. A city without a reading renders its title
/// only.
pub fn card(city: &TrackedCity, reading: Option<&Reading>) -> String {
    let mut out = String::new();

    let _ = write!(out, "{}", city.name);
    if let Some(cc) = &city.country_code {
        let _ = write!(out, " {cc}");
    }

    let Some(reading) = reading else {
        out.push_str("\n  loading...");
        return out;
    };
    let r = &reading.record;

    if reading.source == ReadingSource::Mock {
        out.push_str(" (mock)");
    }
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "  {} {}°C  {}",
        icon_for(&r.condition, r.icon_code.as_deref()),
        whole(r.temperature_c),
        r.condition
    );
    let _ = writeln!(
        out,
        "  Feels like {}°C   Humidity {}%",
        whole(r.feels_like_c),
        r.humidity_pct
    );
    let _ = writeln!(out, "  Wind {} km/h   Visibility {} km", r.wind_speed_kmh, r.visibility_km);
    let _ = write!(
        out,
        "  Updated: {}",
        reading.updated_at.with_timezone(&Local).format("%H:%M")
    );

    out
}

/// Rounds half toward positive infinity, without printing `-0`.
fn whole(value: f64) -> f64 {
    (value + 0.5).floor() + 0.0
}

/// All cards plus the error banner, in tracking order.
pub fn dashboard(snapshot: &Snapshot) -> String {
    let mut out = String::new();

    if let Some(error) = &snapshot.error {
        let _ = writeln!(out, "⚠ {error}\n");
    }

    if snapshot.cities.is_empty() {
        out.push_str("No cities added yet. Search for a city to get started.\n");
        return out;
    }

    for city in &snapshot.cities {
        let _ = writeln!(out, "{}\n", card(city, snapshot.reading(&city.id)));
    }
    out
}
