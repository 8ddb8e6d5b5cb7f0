use serde_derive::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use crate::error::Error;

pub const DEFAULT_BBOX_GROWTH_RATE: f32 = 0.1;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct TrackerConfig {
    /// Detections below are dropped before they reach the scene
    pub min_detection_confidence: f32,
    /// Percent in [0, 100]. Validated and carried, but the scene suppresses
    /// new tracks on any overlap instead of consulting it.
    pub max_intersection_overlap_percent: f32,
    /// Tracks need strictly more locations than this to be saved
    pub min_track_length: usize,
    pub min_track_object_similarity: f32,
    pub min_update_correlation: f64,
    pub bbox_growth_rate: f32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            min_detection_confidence: 0.5,
            max_intersection_overlap_percent: 25.0,
            min_track_length: 3,
            min_track_object_similarity: 0.6,
            min_update_correlation: 6.5,
            bbox_growth_rate: DEFAULT_BBOX_GROWTH_RATE,
        }
    }
}

impl TrackerConfig {
    pub fn validate(&self) -> Result<(), Error> {
        unit_range("min_detection_confidence", self.min_detection_confidence)?;
        unit_range(
            "min_track_object_similarity",
            self.min_track_object_similarity,
        )?;

        if !(0.0..=100.0).contains(&self.max_intersection_overlap_percent) {
            return Err(invalid(
                "max_intersection_overlap_percent",
                format!("{} is outside [0, 100]", self.max_intersection_overlap_percent),
            ));
        }

        if !self.min_update_correlation.is_finite() {
            return Err(invalid(
                "min_update_correlation",
                format!("{} is not finite", self.min_update_correlation),
            ));
        }

        if !self.bbox_growth_rate.is_finite() || self.bbox_growth_rate < 0.0 {
            return Err(invalid(
                "bbox_growth_rate",
                format!("{} must be finite and non-negative", self.bbox_growth_rate),
            ));
        }

        Ok(())
    }

    pub fn from_json_str(src: &str) -> Result<Self, Error> {
        let config: TrackerConfig = serde_json::from_str(src)?;
        config.validate()?;

        Ok(config)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let contents = std::fs::read_to_string(path)?;

        Self::from_json_str(&contents)
    }

    /// Builds a config from job properties, keeping defaults for absent keys.
    pub fn from_properties(props: &HashMap<String, String>) -> Result<Self, Error> {
        let mut config = Self::default();

        if let Some(v) = property(props, "MIN_DETECTION_CONFIDENCE")? {
            config.min_detection_confidence = v;
        }
        if let Some(v) = property(props, "MAX_INTERSECTION_OVERLAP_AREA_PERCENT")? {
            config.max_intersection_overlap_percent = v;
        }
        if let Some(v) = property(props, "MIN_TRACK_LENGTH")? {
            config.min_track_length = v;
        }
        if let Some(v) = property(props, "MIN_TRACK_OBJECT_SIMILARITY_VALUE")? {
            config.min_track_object_similarity = v;
        }
        if let Some(v) = property(props, "MIN_UPDATE_CORRELATION_VALUE")? {
            config.min_update_correlation = v;
        }

        config.validate()?;

        Ok(config)
    }
}

fn property<T: FromStr>(props: &HashMap<String, String>, key: &str) -> Result<Option<T>, Error> {
    match props.get(key) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| Error::Property {
                key: key.to_string(),
                value: value.clone(),
            }),
    }
}

fn unit_range(field: &'static str, value: f32) -> Result<(), Error> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(invalid(field, format!("{} is outside [0, 1]", value)))
    }
}

#[inline]
fn invalid(field: &'static str, reason: String) -> Error {
    Error::InvalidConfig { field, reason }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_default_is_valid() {
        assert!(TrackerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_json_partial_keeps_defaults() {
        let config = TrackerConfig::from_json_str(r#"{"min_track_length": 5}"#).unwrap();

        assert_eq!(config.min_track_length, 5);
        assert_eq!(config.min_update_correlation, 6.5);
        assert_eq!(config.bbox_growth_rate, DEFAULT_BBOX_GROWTH_RATE);
    }

    #[test]
    fn test_json_negative_length_rejected() {
        let err = TrackerConfig::from_json_str(r#"{"min_track_length": -1}"#).unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_out_of_range_similarity_rejected() {
        let config = TrackerConfig {
            min_track_object_similarity: 1.5,
            ..Default::default()
        };

        match config.validate() {
            Err(Error::InvalidConfig { field, .. }) => {
                assert_eq!(field, "min_track_object_similarity")
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_overlap_percent_range() {
        let config = TrackerConfig {
            max_intersection_overlap_percent: 120.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_properties() {
        let config = TrackerConfig::from_properties(&props(&[
            ("MIN_TRACK_LENGTH", "7"),
            ("MIN_UPDATE_CORRELATION_VALUE", " 4.25 "),
        ]))
        .unwrap();

        assert_eq!(config.min_track_length, 7);
        assert_eq!(config.min_update_correlation, 4.25);
        assert_eq!(config.min_track_object_similarity, 0.6);
    }

    #[test]
    fn test_properties_unparsable() {
        let err = TrackerConfig::from_properties(&props(&[("MIN_TRACK_LENGTH", "-2")])).unwrap_err();

        match err {
            Error::Property { key, value } => {
                assert_eq!(key, "MIN_TRACK_LENGTH");
                assert_eq!(value, "-2");
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
