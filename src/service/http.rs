use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::Deserialize;

use super::{DataService, ServiceError};
use crate::geo::{distance_meters, Coordinate};
use crate::poi::{GuideInfo, PoiDetail, PointOfInterest};

const API_PREFIX: &str = "/api/v1/locations";

/// A cached POI list is reused while the user stays within this radius of
/// the coordinate it was fetched for
const POI_CACHE_RADIUS_M: f64 = 200.0;

#[derive(Debug, Deserialize)]
struct BackendPoi {
    entity_id: String,
    title: String,
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    categories: Vec<String>,
    #[serde(default)]
    image_url: Option<String>,
}

impl BackendPoi {
    fn into_poi(self) -> PointOfInterest {
        PointOfInterest {
            id: self.entity_id,
            name: self.title,
            coordinates: Coordinate::new(self.latitude, self.longitude),
            description: None,
            image_url: self.image_url,
            categories: Some(self.categories),
        }
    }
}

#[derive(Debug, Deserialize)]
struct UpdateResponse {
    points_of_interest: Vec<BackendPoi>,
}

#[derive(Debug, Clone, Deserialize)]
struct DetailResponse {
    entity_id: String,
    title: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    text_audio: Option<String>,
    #[serde(default)]
    audio_file: Option<String>,
    #[serde(default)]
    breakpoints_ms: Option<Vec<u64>>,
}

#[derive(Default)]
struct PoiCache {
    pois: Vec<PointOfInterest>,
    origin: Option<Coordinate>,
}

/// Backend-backed data service.
///
/// POST `{server}/api/v1/locations/update` for the nearby POI list (204
/// means "no movement", reuse the cache) and GET
/// `{server}/api/v1/locations/detail/{entity_id}` for narration content,
/// with an in-memory detail cache. Audio is referenced by URL; downloading
/// and decoding belong to the audio backend.
pub struct HttpDataService {
    client: reqwest::Client,
    server_url: String,
    poi_cache: Mutex<PoiCache>,
    detail_cache: Mutex<HashMap<String, DetailResponse>>,
}

impl HttpDataService {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            server_url: server_url.into(),
            poi_cache: Mutex::new(PoiCache::default()),
            detail_cache: Mutex::new(HashMap::new()),
        }
    }

    fn cached_pois_for(&self, coordinate: Coordinate) -> Option<Vec<PointOfInterest>> {
        let cache = self.poi_cache.lock().expect("poi cache poisoned");
        let origin = cache.origin?;
        if cache.pois.is_empty() {
            return None;
        }
        if distance_meters(origin, coordinate) < POI_CACHE_RADIUS_M {
            Some(cache.pois.clone())
        } else {
            None
        }
    }

    async fn fetch_detail(&self, entity_id: &str) -> Result<DetailResponse, ServiceError> {
        if let Some(cached) = self
            .detail_cache
            .lock()
            .expect("detail cache poisoned")
            .get(entity_id)
        {
            return Ok(cached.clone());
        }

        let endpoint = format!("{}{}/detail/{}", self.server_url, API_PREFIX, entity_id);
        let response = self.client.get(&endpoint).send().await?;
        if !response.status().is_success() {
            return Err(ServiceError::UnexpectedStatus {
                endpoint,
                status: response.status().as_u16(),
            });
        }
        let detail: DetailResponse = response.json().await?;

        self.detail_cache
            .lock()
            .expect("detail cache poisoned")
            .insert(entity_id.to_string(), detail.clone());
        Ok(detail)
    }

    fn audio_url_for(&self, entity_id: &str) -> String {
        format!("{}{}/audio/{}", self.server_url, API_PREFIX, entity_id)
    }
}

#[async_trait]
impl DataService for HttpDataService {
    async fn fetch_nearby_pois(
        &self,
        coordinate: Coordinate,
        _user_id: &str,
        force: bool,
    ) -> Result<Vec<PointOfInterest>, ServiceError> {
        if !force {
            if let Some(cached) = self.cached_pois_for(coordinate) {
                return Ok(cached);
            }
        }

        let endpoint = format!("{}{}/update", self.server_url, API_PREFIX);
        let response = self
            .client
            .post(&endpoint)
            .json(&serde_json::json!({
                "latitude": coordinate.latitude,
                "longitude": coordinate.longitude,
            }))
            .send()
            .await?;

        // 204: the backend considers the movement too small to matter
        if response.status().as_u16() == 204 {
            let cache = self.poi_cache.lock().expect("poi cache poisoned");
            return Ok(cache.pois.clone());
        }
        if !response.status().is_success() {
            return Err(ServiceError::UnexpectedStatus {
                endpoint,
                status: response.status().as_u16(),
            });
        }

        let body: UpdateResponse = response.json().await?;
        let pois: Vec<PointOfInterest> = body
            .points_of_interest
            .into_iter()
            .map(BackendPoi::into_poi)
            .collect();

        let mut cache = self.poi_cache.lock().expect("poi cache poisoned");
        cache.pois = pois.clone();
        cache.origin = Some(coordinate);
        Ok(pois)
    }

    async fn fetch_guide_info(
        &self,
        poi_id: &str,
        poi_name: &str,
        _coordinate: Coordinate,
    ) -> Result<GuideInfo, ServiceError> {
        let detail = self.fetch_detail(poi_id).await?;

        let audio_url = detail
            .audio_file
            .as_deref()
            .filter(|f| !f.is_empty())
            .map(|_| self.audio_url_for(poi_id));

        Ok(GuideInfo {
            poi_id: poi_id.to_string(),
            poi_name: poi_name.to_string(),
            transcription: detail.text_audio.unwrap_or_default(),
            audio_url,
            breakpoints_ms: detail.breakpoints_ms.unwrap_or_default(),
        })
    }

    async fn fetch_poi_detail(&self, poi_id: &str) -> Result<PoiDetail, ServiceError> {
        let detail = self.fetch_detail(poi_id).await?;
        Ok(PoiDetail {
            entity_id: detail.entity_id,
            title: detail.title,
            text: detail.text.unwrap_or_default(),
            text_audio: detail.text_audio.unwrap_or_default(),
            audio_file: detail.audio_file.unwrap_or_default(),
        })
    }

    fn clear_cache(&self) {
        let mut cache = self.poi_cache.lock().expect("poi cache poisoned");
        cache.pois.clear();
        cache.origin = None;
        self.detail_cache
            .lock()
            .expect("detail cache poisoned")
            .clear();
    }
}
