use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::{DataService, ServiceError};
use crate::geo::Coordinate;
use crate::poi::{GuideInfo, PoiDetail, PointOfInterest};

/// Bundled Gamla Stan walking-tour data
const MOCK_DATA: &str = include_str!("mock_data.json");

const POI_LIST_DELAY: Duration = Duration::from_millis(300);
const GUIDE_INFO_DELAY: Duration = Duration::from_millis(1500);

/// Pause points for the simulated 30 s narration tracks
const MOCK_BREAKPOINTS_MS: [u64; 3] = [5_000, 12_000, 21_000];

#[derive(Debug, Deserialize)]
struct MockPoiEntry {
    entity_id: String,
    title: String,
    latitude: f64,
    longitude: f64,
    categories: Vec<String>,
    image_url: String,
}

#[derive(Debug, Deserialize)]
struct MockDataset {
    latitude: f64,
    longitude: f64,
    points_of_interest: Vec<MockPoiEntry>,
}

fn load_dataset() -> MockDataset {
    serde_json::from_str(MOCK_DATA).expect("bundled mock data is valid JSON")
}

/// Backend-free data service over a bundled POI set, with simulated network
/// delays. Used by the demo binary and scenario tests.
pub struct MockDataService {
    pois: Vec<PointOfInterest>,
    start_location: Coordinate,
}

impl MockDataService {
    pub fn new() -> Self {
        let dataset = load_dataset();
        let pois = dataset
            .points_of_interest
            .into_iter()
            .map(|p| PointOfInterest {
                id: p.entity_id,
                name: p.title,
                coordinates: Coordinate::new(p.latitude, p.longitude),
                description: None,
                image_url: Some(p.image_url),
                categories: Some(p.categories),
            })
            .collect();
        Self {
            pois,
            start_location: Coordinate::new(dataset.latitude, dataset.longitude),
        }
    }

    /// Where the bundled dataset is centered; a natural demo start position
    pub fn start_location(&self) -> Coordinate {
        self.start_location
    }
}

impl Default for MockDataService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DataService for MockDataService {
    async fn fetch_nearby_pois(
        &self,
        _coordinate: Coordinate,
        _user_id: &str,
        _force: bool,
    ) -> Result<Vec<PointOfInterest>, ServiceError> {
        tokio::time::sleep(POI_LIST_DELAY).await;
        Ok(self.pois.clone())
    }

    async fn fetch_guide_info(
        &self,
        poi_id: &str,
        poi_name: &str,
        _coordinate: Coordinate,
    ) -> Result<GuideInfo, ServiceError> {
        tokio::time::sleep(GUIDE_INFO_DELAY).await;
        Ok(GuideInfo {
            poi_id: poi_id.to_string(),
            poi_name: poi_name.to_string(),
            transcription: format!(
                "You are now near {poi_name}. This is a notable location in \
                 Stockholm's Gamla Stan district, rich with history and \
                 cultural significance."
            ),
            audio_url: Some(format!("mock://audio/{poi_id}")),
            breakpoints_ms: MOCK_BREAKPOINTS_MS.to_vec(),
        })
    }

    async fn fetch_poi_detail(&self, poi_id: &str) -> Result<PoiDetail, ServiceError> {
        tokio::time::sleep(POI_LIST_DELAY).await;
        let title = self
            .pois
            .iter()
            .find(|p| p.id == poi_id)
            .map(|p| p.name.clone())
            .unwrap_or_default();
        Ok(PoiDetail {
            entity_id: poi_id.to_string(),
            title: title.clone(),
            text: format!("{title} is one of the stops on the Gamla Stan walking tour."),
            text_audio: String::new(),
            audio_file: format!("{poi_id}.mp3"),
        })
    }

    fn clear_cache(&self) {}
}
