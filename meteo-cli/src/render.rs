use meteo_core::{SearchResult, WeatherRecord, map_url};
use serde::Serialize;

#[derive(Serialize)]
struct RecordOutput<'a> {
    #[serde(flatten)]
    record: &'a WeatherRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    map_url: Option<String>,
}

/// Card or JSON for one reading, including the map preview link.
pub fn record_output(record: &WeatherRecord, zoom: u8, json: bool) -> anyhow::Result<String> {
    let map = record
        .coordinates
        .map(|c| map_url(c.latitude, c.longitude, zoom));

    if json {
        let out = RecordOutput { record, map_url: map };
        return Ok(serde_json::to_string_pretty(&out)?);
    }

    let mut card = weather_card(record);
    if let Some(map) = map {
        card.push_str(&format!("\n🗺  {map}"));
    }
    Ok(card)
}

pub fn weather_card(record: &WeatherRecord) -> String {
    let code = record.weather_code;
    let mut lines = Vec::new();

    if let Some(city) = &record.city {
        lines.push(format!("📍 {city}"));
    }
    lines.push(format!("{} {}", code.icon(record.is_day), code.description()));
    lines.push(format!(
        "🌡  {:.1} {}",
        record.temperature,
        record.temperature_unit.symbol()
    ));
    lines.push(format!(
        "💨 {:.1} {}",
        record.wind_speed,
        record.wind_speed_unit.symbol()
    ));
    lines.push(format!(
        "🕑 {} ({})",
        record.time.format("%a %d %b %Y %H:%M"),
        if record.is_day { "day" } else { "night" }
    ));
    if let Some(coordinates) = record.coordinates {
        lines.push(format!("🧭 {coordinates}"));
    }

    lines.join("\n")
}

pub fn suggestion_table(results: &[SearchResult]) -> String {
    results
        .iter()
        .enumerate()
        .map(|(i, r)| {
            format!(
                "{:>2}. {:<40} ({:.4}, {:.4})",
                i + 1,
                r.display_name(),
                r.latitude,
                r.longitude
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use meteo_core::{Coordinates, TemperatureUnit, WeatherCode, WindSpeedUnit};

    fn record() -> WeatherRecord {
        WeatherRecord {
            temperature: 3.27,
            temperature_unit: TemperatureUnit::Celsius,
            wind_speed: 14.04,
            wind_speed_unit: WindSpeedUnit::Kmh,
            weather_code: WeatherCode::ClearSky,
            is_day: false,
            time: NaiveDate::from_ymd_opt(2024, 1, 15)
                .and_then(|d| d.and_hms_opt(22, 30, 0))
                .unwrap(),
            city: Some("Oslo".into()),
            coordinates: Some(Coordinates::new(59.91273, 10.74609)),
        }
    }

    #[test]
    fn card_shows_night_icon_and_units() {
        let card = weather_card(&record());

        assert!(card.starts_with("📍 Oslo"));
        assert!(card.contains("🌙 Clear sky"));
        assert!(card.contains("3.3 °C"));
        assert!(card.contains("14.0 km/h"));
        assert!(card.contains("Mon 15 Jan 2024 22:30 (night)"));
        assert!(card.contains("59.9127, 10.7461"));
    }

    #[test]
    fn text_output_appends_map_link() {
        let out = record_output(&record(), 13, false).unwrap();
        assert!(out.ends_with(
            "🗺  https://maps.google.com/maps?q=59.91273,10.74609&t=&z=13&ie=UTF8&iwloc=&output=embed"
        ));
    }

    #[test]
    fn json_output_flattens_record() {
        let out = record_output(&record(), 10, true).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();

        assert_eq!(value["city"], "Oslo");
        assert_eq!(value["weather_code"], 0);
        assert_eq!(value["temperature_unit"], "celsius");
        assert!(value["map_url"].as_str().unwrap().contains("z=10"));
    }

    #[test]
    fn table_numbers_each_suggestion() {
        let results = vec![SearchResult {
            name: "Oslo".into(),
            region: Some("Oslo".into()),
            country: Some("Norway".into()),
            latitude: 59.91273,
            longitude: 10.74609,
        }];

        let table = suggestion_table(&results);
        assert!(table.starts_with(" 1. Oslo, Oslo, Norway"));
        assert!(table.ends_with("(59.9127, 10.7461)"));
    }
}
