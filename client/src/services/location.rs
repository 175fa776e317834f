//! Administrative location lookups

use std::sync::Arc;

use shared::{Community, Lga, State, Ward};

use crate::error::AppResult;
use crate::external::FarmApi;
use crate::services::cache::TtlCache;

#[derive(Clone)]
pub struct LocationService {
    api: Arc<dyn FarmApi>,
    communities: Arc<TtlCache<String, Vec<Community>>>,
}

impl LocationService {
    pub fn new(api: Arc<dyn FarmApi>, communities: Arc<TtlCache<String, Vec<Community>>>) -> Self {
        Self { api, communities }
    }

    pub async fn states(&self) -> AppResult<Vec<State>> {
        self.api.states().await
    }

    pub async fn lgas(&self, state_id: &str) -> AppResult<Vec<Lga>> {
        self.api.lgas(state_id).await
    }

    pub async fn wards(&self, lga_id: &str) -> AppResult<Vec<Ward>> {
        self.api.wards(lga_id).await
    }

    /// Communities of a ward, cached per ward
    pub async fn communities(&self, ward_id: &str) -> AppResult<Vec<Community>> {
        let key = ward_id.to_string();
        if let Some(cached) = self.communities.get(&key).await {
            return Ok(cached);
        }

        let communities = self.api.communities(ward_id).await?;
        tracing::debug!(ward_id, count = communities.len(), "Communities loaded");
        self.communities.insert(key, communities.clone()).await;
        Ok(communities)
    }

    /// LGA outlines of a state for the map overlay
    pub async fn lga_boundaries(&self, state_id: &str) -> AppResult<geojson::FeatureCollection> {
        self.api.lga_boundaries(state_id).await
    }
}
