mod http;
mod mock;

pub use http::HttpDataService;
pub use mock::MockDataService;

use async_trait::async_trait;
use thiserror::Error;

use crate::geo::Coordinate;
use crate::poi::{GuideInfo, PoiDetail, PointOfInterest};

/// Data service failures.
///
/// All variants are recoverable: the engine keeps stale POI data on list
/// failures and emits a single notification on guide-content failures.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("unexpected status {status} from {endpoint}")]
    UnexpectedStatus { endpoint: String, status: u16 },
    #[error("malformed response from {endpoint}: {reason}")]
    Decode { endpoint: String, reason: String },
}

/// Source of POIs and narration content.
///
/// One interface, interchangeable real and mock implementations; the chosen
/// implementation is injected at engine construction, never selected by a
/// debug flag at call sites.
#[async_trait]
pub trait DataService: Send + Sync {
    /// Retrieve POIs known near `coordinate`. May be served from the
    /// implementation's own cache unless `force` is set.
    async fn fetch_nearby_pois(
        &self,
        coordinate: Coordinate,
        user_id: &str,
        force: bool,
    ) -> Result<Vec<PointOfInterest>, ServiceError>;

    /// Narration text plus an optional playable audio reference and its
    /// pause points.
    async fn fetch_guide_info(
        &self,
        poi_id: &str,
        poi_name: &str,
        coordinate: Coordinate,
    ) -> Result<GuideInfo, ServiceError>;

    /// On-demand full detail for UI display; only invoked by user
    /// interaction, not by the tick loop.
    async fn fetch_poi_detail(&self, poi_id: &str) -> Result<PoiDetail, ServiceError>;

    /// Drop any locally cached POI or detail data
    fn clear_cache(&self);
}
