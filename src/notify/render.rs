// src/notify/render.rs
//! Alert message template (Telegram legacy Markdown).

use crate::feed::SeismicEvent;

const MAP_SEARCH_URL: &str = "https://www.google.com/maps/search/?api=1&query=";

/// Render the broadcast text for one event.
pub fn render_alert(ev: &SeismicEvent) -> String {
    let when = ev
        .time
        .map(|t| format!("{} UTC", t.format("%Y-%m-%d %H:%M")))
        .unwrap_or_else(|| "unknown time".to_string());

    let depth = ev
        .depth_km
        .map(|d| format!("{d:.1} km"))
        .unwrap_or_else(|| "? km".to_string());

    let location = match ev.coordinates {
        Some(c) => format!("🗺️ [View on map]({MAP_SEARCH_URL}{},{})", c.lat, c.lon),
        None => "🗺️ Location unknown".to_string(),
    };

    format!(
        "🚨 *Strong earthquake detected!*\n\n\
         📍 *{region}*\n\
         🕒 Time: {when}\n\
         💥 Magnitude: {magtype} *{mag:.1}*\n\
         📏 Depth: {depth}\n\
         {location}\n",
        region = markdown_safe(&ev.region),
        magtype = markdown_safe(&ev.magnitude_type),
        mag = ev.magnitude,
    )
}

/// Legacy Markdown has no escaping inside entities, so drop the control chars.
/// Underscores usually separate words, so they become spaces.
fn markdown_safe(s: &str) -> String {
    s.chars()
        .filter_map(|c| match c {
            '*' | '`' => None,
            '_' => Some(' '),
            '[' => Some('('),
            ']' => Some(')'),
            other => Some(other),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::Coordinates;
    use chrono::{TimeZone, Utc};

    fn event() -> SeismicEvent {
        SeismicEvent {
            id: Some("20250328_0000008".into()),
            magnitude: 7.7,
            magnitude_type: "mw".into(),
            depth_km: Some(10.0),
            region: "MYANMAR".into(),
            time: Some(Utc.with_ymd_and_hms(2025, 3, 28, 6, 20, 52).unwrap()),
            coordinates: Some(Coordinates {
                lat: 22.01,
                lon: 95.92,
            }),
        }
    }

    #[test]
    fn full_event_renders_every_field() {
        let msg = render_alert(&event());
        assert!(msg.contains("*MYANMAR*"));
        assert!(msg.contains("Time: 2025-03-28 06:20 UTC"));
        assert!(msg.contains("Magnitude: mw *7.7*"));
        assert!(msg.contains("Depth: 10.0 km"));
        assert!(msg.contains("(https://www.google.com/maps/search/?api=1&query=22.01,95.92)"));
    }

    #[test]
    fn missing_coordinates_give_placeholder_not_a_link() {
        let mut ev = event();
        ev.coordinates = None;
        ev.depth_km = None;
        ev.time = None;
        let msg = render_alert(&ev);
        assert!(msg.contains("Location unknown"));
        assert!(!msg.contains("maps"));
        assert!(msg.contains("Depth: ? km"));
        assert!(msg.contains("unknown time"));
    }

    #[test]
    fn region_markup_is_neutralized() {
        let mut ev = event();
        ev.region = "SOUTH_SANDWICH [ISLANDS] *REGION*".into();
        let msg = render_alert(&ev);
        assert!(msg.contains("*SOUTH SANDWICH (ISLANDS) REGION*"));
    }
}
