use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use metrics::{counter, histogram};
use serde::Deserialize;
use serde_json::Value;

use crate::error::FetchError;
use crate::feed::types::{Coordinates, FeedQuery, SeismicEvent, SeismicFeed};

/// Timestamp layout the feed expects for `start`/`end` (UTC, no offset).
const QUERY_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

const UNKNOWN_REGION: &str = "Unknown region";

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    // decoded per feature in `normalize`
    #[serde(default)]
    features: Vec<Value>,
}

/// Feed client for the EMSC FDSN event service (seismicportal.eu) and
/// anything speaking the same GeoJSON dialect.
pub struct EmscFeedClient {
    endpoint: String,
    client: reqwest::Client,
}

impl EmscFeedClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            endpoint: endpoint.into(),
            client,
        })
    }

    pub fn query_params(query: &FeedQuery) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("format", "json".to_string()),
            ("minmag", query.min_magnitude.to_string()),
            ("limit", query.limit.to_string()),
            ("orderby", "time".to_string()),
        ];
        if let Some(start) = query.start {
            params.push(("start", start.format(QUERY_TIME_FORMAT).to_string()));
        }
        if let Some(end) = query.end {
            params.push(("end", end.format(QUERY_TIME_FORMAT).to_string()));
        }
        params
    }
}

#[async_trait]
impl SeismicFeed for EmscFeedClient {
    async fn fetch(&self, query: &FeedQuery) -> Result<Vec<SeismicEvent>, FetchError> {
        let t0 = std::time::Instant::now();
        let resp = self
            .client
            .get(&self.endpoint)
            .query(&Self::query_params(query))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let body = resp.text().await?;
        let events = parse_feed_body(&body)?;

        histogram!("feed_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        counter!("feed_events_total").increment(events.len() as u64);
        tracing::debug!(target: "feed", count = events.len(), "feed fetched");
        Ok(events)
    }

    fn name(&self) -> &'static str {
        "emsc"
    }
}

/// Decode a feature collection into normalized events, keeping feed order.
/// Features that are not JSON objects are skipped with a warning.
pub fn parse_feed_body(body: &str) -> Result<Vec<SeismicEvent>, FetchError> {
    let collection: FeatureCollection = serde_json::from_str(body)?;
    let mut events = Vec::with_capacity(collection.features.len());
    for (index, feature) in collection.features.iter().enumerate() {
        match normalize(feature) {
            Some(ev) => events.push(ev),
            None => {
                counter!("feed_skipped_features_total").increment(1);
                tracing::warn!(target: "feed", index, "skipping feature that is not an object");
            }
        }
    }
    Ok(events)
}

fn normalize(feature: &Value) -> Option<SeismicEvent> {
    let feature = feature.as_object()?;
    // `null` or a non-object properties block reads as "all missing".
    let props = feature.get("properties").and_then(Value::as_object);
    let prop = |key: &str| props.and_then(|p| p.get(key)).filter(|v| !v.is_null());

    let id = match prop("unid") {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };

    let coordinates = feature
        .get("geometry")
        .and_then(|g| g.get("coordinates"))
        .and_then(Value::as_array)
        .and_then(|c| match c.as_slice() {
            [lon, lat, ..] => Some(Coordinates {
                lat: number(lat)?,
                lon: number(lon)?,
            }),
            _ => None,
        });

    Some(SeismicEvent {
        id,
        magnitude: prop("mag").and_then(number).unwrap_or(0.0),
        magnitude_type: text(prop("magtype")).unwrap_or_else(|| "?".to_string()),
        depth_km: prop("depth").and_then(number),
        region: text(prop("flynn_region")).unwrap_or_else(|| UNKNOWN_REGION.to_string()),
        time: prop("time").and_then(Value::as_str).and_then(parse_feed_time),
        coordinates,
    })
}

/// Numbers, or strings holding one (`"6.1"`).
fn number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

fn text(v: Option<&Value>) -> Option<String> {
    v.and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Feed timestamps sometimes carry no offset; those are UTC.
pub fn parse_feed_time(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}
