//! Pattern-based extraction of the eight PV sizing parameters from free text.
//!
//! Extraction is pure: it touches neither the store nor the network, and it
//! never fails. A field whose value cannot be parsed is simply left out.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// The parameters the estimator needs, each present only once observed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Slots {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surface_tilt: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surface_azimuth: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance_ratio: Option<f64>,
}

impl Slots {
    /// True once every parameter has been observed at least once
    pub fn is_complete(&self) -> bool {
        self.capacity.is_some()
            && self.latitude.is_some()
            && self.longitude.is_some()
            && self.timezone.is_some()
            && self.model.is_some()
            && self.surface_tilt.is_some()
            && self.surface_azimuth.is_some()
            && self.performance_ratio.is_some()
    }

    /// Overlay newly extracted values. Keys are only ever added or overwritten.
    pub fn merge(&mut self, update: Slots) {
        fn overlay<T>(slot: &mut Option<T>, value: Option<T>) {
            if value.is_some() {
                *slot = value;
            }
        }

        overlay(&mut self.capacity, update.capacity);
        overlay(&mut self.latitude, update.latitude);
        overlay(&mut self.longitude, update.longitude);
        overlay(&mut self.timezone, update.timezone);
        overlay(&mut self.model, update.model);
        overlay(&mut self.surface_tilt, update.surface_tilt);
        overlay(&mut self.surface_azimuth, update.surface_azimuth);
        overlay(&mut self.performance_ratio, update.performance_ratio);
    }

    pub fn is_empty(&self) -> bool {
        *self == Slots::default()
    }

    /// Names of the parameters still unknown, in canonical order
    pub fn missing(&self) -> Vec<&'static str> {
        let present = [
            ("capacity", self.capacity.is_some()),
            ("latitude", self.latitude.is_some()),
            ("longitude", self.longitude.is_some()),
            ("timezone", self.timezone.is_some()),
            ("model", self.model.is_some()),
            ("surface_tilt", self.surface_tilt.is_some()),
            ("surface_azimuth", self.surface_azimuth.is_some()),
            ("performance_ratio", self.performance_ratio.is_some()),
        ];
        present
            .into_iter()
            .filter(|(_, set)| !set)
            .map(|(name, _)| name)
            .collect()
    }
}

const NUMBER: &str = r"([-+]?[0-9]+(?:\.[0-9]*)?)";

/// A pattern that fails to compile disables only its own slot
fn pattern(key: &str, value: &str) -> Option<Regex> {
    match Regex::new(&format!(r"(?i){key}\s*[:=]\s*{value}")) {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::error!("Invalid pattern for slot {}: {}", key, e);
            None
        }
    }
}

static CAPACITY: LazyLock<Option<Regex>> = LazyLock::new(|| pattern("capacity", NUMBER));
static LATITUDE: LazyLock<Option<Regex>> = LazyLock::new(|| pattern("latitude", NUMBER));
static LONGITUDE: LazyLock<Option<Regex>> = LazyLock::new(|| pattern("longitude", NUMBER));
static TILT: LazyLock<Option<Regex>> = LazyLock::new(|| pattern("tilt", NUMBER));
static AZIMUTH: LazyLock<Option<Regex>> = LazyLock::new(|| pattern("azimuth", NUMBER));
static PERFORMANCE_RATIO: LazyLock<Option<Regex>> =
    LazyLock::new(|| pattern("performance_ratio", NUMBER));
static TIMEZONE: LazyLock<Option<Regex>> =
    LazyLock::new(|| pattern("timezone", r"([A-Za-z0-9_+\-/]+)"));
static MODEL: LazyLock<Option<Regex>> = LazyLock::new(|| pattern("model", r"([\w\-.+]+)"));

fn capture<'a>(re: &Option<Regex>, message: &'a str) -> Option<&'a str> {
    re.as_ref()?
        .captures(message)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

fn number(re: &Option<Regex>, message: &str) -> Option<f64> {
    let raw = capture(re, message)?;
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Some(value),
        _ => {
            tracing::debug!("Dropping unparsable slot value '{}'", raw);
            None
        }
    }
}

/// Extract whichever parameters appear as `name=value` or `name: value`.
///
/// Keys match case-insensitively; string values keep the casing the user
/// typed so module names and IANA zones reach the estimator intact.
pub fn extract(message: &str) -> Slots {
    Slots {
        capacity: number(&CAPACITY, message),
        latitude: number(&LATITUDE, message),
        longitude: number(&LONGITUDE, message),
        timezone: capture(&TIMEZONE, message).map(str::to_string),
        model: capture(&MODEL, message).map(str::to_string),
        surface_tilt: number(&TILT, message),
        surface_azimuth: number(&AZIMUTH, message),
        performance_ratio: number(&PERFORMANCE_RATIO, message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: [&str; 8] = [
        "capacity=5",
        "latitude=10.7",
        "longitude=106.6",
        "timezone=Asia/Ho_Chi_Minh",
        "model=JA72S20",
        "tilt=20",
        "azimuth=180",
        "performance_ratio=81",
    ];

    #[test]
    fn test_extracts_full_parameter_set() {
        let slots = extract(&FULL.join(" "));
        assert!(slots.is_complete());
        assert_eq!(slots.capacity, Some(5.0));
        assert_eq!(slots.latitude, Some(10.7));
        assert_eq!(slots.longitude, Some(106.6));
        assert_eq!(slots.timezone.as_deref(), Some("Asia/Ho_Chi_Minh"));
        assert_eq!(slots.model.as_deref(), Some("JA72S20"));
        assert_eq!(slots.surface_tilt, Some(20.0));
        assert_eq!(slots.surface_azimuth, Some(180.0));
        assert_eq!(slots.performance_ratio, Some(81.0));
    }

    #[test]
    fn test_extraction_is_order_independent() {
        let expected = extract(&FULL.join(" "));
        let mut reversed = FULL;
        reversed.reverse();
        assert_eq!(extract(&reversed.join(" ")), expected);

        let rotated: Vec<&str> = FULL.iter().cycle().skip(3).take(8).copied().collect();
        assert_eq!(extract(&rotated.join(", ")), expected);
    }

    #[test]
    fn test_malformed_number_drops_only_that_field() {
        let slots = extract("capacity=abc latitude=10.7");
        assert_eq!(slots.capacity, None);
        assert_eq!(slots.latitude, Some(10.7));

        // Matches the number pattern but overflows to infinity
        let huge = format!("capacity=1{} longitude=106.6", "0".repeat(400));
        let slots = extract(&huge);
        assert_eq!(slots.capacity, None);
        assert_eq!(slots.longitude, Some(106.6));
    }

    #[test]
    fn test_string_values_keep_user_casing() {
        let slots = extract("MODEL=Ja72S20 TimeZone=asia/Ho_Chi_Minh");
        assert_eq!(slots.model.as_deref(), Some("Ja72S20"));
        assert_eq!(slots.timezone.as_deref(), Some("asia/Ho_Chi_Minh"));
    }

    #[test]
    fn test_every_slot_pattern_compiles() {
        for re in [
            &CAPACITY,
            &LATITUDE,
            &LONGITUDE,
            &TILT,
            &AZIMUTH,
            &PERFORMANCE_RATIO,
            &TIMEZONE,
            &MODEL,
        ] {
            assert!(re.is_some());
        }
    }

    #[test]
    fn test_keys_match_case_insensitively_with_colon_and_spaces() {
        let slots = extract("CAPACITY : 12.5 and Longitude:  -3.25, Surface_Tilt = 15");
        assert_eq!(slots.capacity, Some(12.5));
        assert_eq!(slots.longitude, Some(-3.25));
        assert_eq!(slots.surface_tilt, Some(15.0));
    }

    #[test]
    fn test_free_text_yields_nothing() {
        assert!(extract("Tôi muốn lắp điện mặt trời cho nhà mình").is_empty());
        assert!(extract("").is_empty());
    }

    #[test]
    fn test_merge_overwrites_and_never_removes() {
        let mut slots = extract("capacity=5 latitude=10.7");
        slots.merge(extract("capacity=8 model=JA72S20"));
        assert_eq!(slots.capacity, Some(8.0));
        assert_eq!(slots.latitude, Some(10.7));
        assert_eq!(slots.model.as_deref(), Some("JA72S20"));

        slots.merge(Slots::default());
        assert_eq!(slots.capacity, Some(8.0));
        assert_eq!(slots.latitude, Some(10.7));
    }

    #[test]
    fn test_missing_lists_unknown_parameters() {
        let slots = extract("capacity=5 model=JA72S20");
        assert_eq!(
            slots.missing(),
            vec![
                "latitude",
                "longitude",
                "timezone",
                "surface_tilt",
                "surface_azimuth",
                "performance_ratio"
            ]
        );
        assert!(extract(&FULL.join(" ")).missing().is_empty());
    }
}
