use serde::{Deserialize, Serialize};

use crate::geo::Coordinate;

/// Represents a unique identifier for a point of interest
pub type PoiId = String;

/// A named, geolocated entity eligible for narration.
///
/// Identity is the `id` field; a POI is immutable once loaded into the
/// working set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointOfInterest {
    pub id: PoiId,
    pub name: String,
    pub coordinates: Coordinate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,
}

/// Narration content for one POI: transcription text, an optional playable
/// audio reference, and the ordered pause points within that audio.
#[derive(Debug, Clone, PartialEq)]
pub struct GuideInfo {
    pub poi_id: PoiId,
    pub poi_name: String,
    pub transcription: String,
    pub audio_url: Option<String>,
    /// Timestamps (ms) where playback may pause without cutting off a sentence
    pub breakpoints_ms: Vec<u64>,
}

/// Full POI detail for on-demand UI display; not part of the narration hot
/// path.
#[derive(Debug, Clone, PartialEq)]
pub struct PoiDetail {
    pub entity_id: PoiId,
    pub title: String,
    pub text: String,
    pub text_audio: String,
    pub audio_file: String,
}
