//! Backend REST API client
//!
//! All farmer, farm, advisory and location calls go through [`FarmApi`] so
//! services can be exercised against an in-memory implementation.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use shared::{
    AdvisoryKind, AdvisoryParams, AdvisoryResult, BoundaryRing, Community, CropHealthAdvisory,
    ExistingBoundary, Farm, FarmPayload, Farmer, FarmerSummary, FertilizerAdvisory,
    HerbicidePesticideAdvisory, Lga, NewFarmer, State, Ward, WaterStressAdvisory,
};
use uuid::Uuid;

use crate::config::ApiConfig;
use crate::error::{AppError, AppResult};
use crate::session::Session;

/// Operations the client needs from the backend
#[async_trait]
pub trait FarmApi: Send + Sync {
    async fn search_farmers(&self, query: &str) -> AppResult<Vec<FarmerSummary>>;
    async fn get_farmer(&self, farmer_id: Uuid) -> AppResult<Farmer>;
    async fn create_farmer(&self, farmer: &NewFarmer) -> AppResult<Farmer>;
    async fn update_farmer(&self, farmer_id: Uuid, farmer: &NewFarmer) -> AppResult<Farmer>;
    async fn farmer_farms(&self, farmer_id: Uuid) -> AppResult<Vec<Farm>>;

    async fn get_farm(&self, farm_id: Uuid) -> AppResult<Farm>;
    async fn create_farm(&self, payload: &FarmPayload) -> AppResult<Farm>;
    async fn update_farm(&self, farm_id: Uuid, payload: &FarmPayload) -> AppResult<Farm>;
    async fn existing_boundaries(&self) -> AppResult<Vec<ExistingBoundary>>;

    async fn fertilizer_advisory(
        &self,
        farm_id: Uuid,
        params: &AdvisoryParams,
    ) -> AppResult<AdvisoryResult<FertilizerAdvisory>>;
    async fn crop_health_advisory(
        &self,
        farm_id: Uuid,
        params: &AdvisoryParams,
    ) -> AppResult<AdvisoryResult<CropHealthAdvisory>>;
    async fn water_stress_advisory(
        &self,
        farm_id: Uuid,
        params: &AdvisoryParams,
    ) -> AppResult<AdvisoryResult<WaterStressAdvisory>>;
    async fn herbicide_pesticide_advisory(
        &self,
        farm_id: Uuid,
        params: &AdvisoryParams,
    ) -> AppResult<AdvisoryResult<HerbicidePesticideAdvisory>>;

    async fn states(&self) -> AppResult<Vec<State>>;
    async fn lgas(&self, state_id: &str) -> AppResult<Vec<Lga>>;
    async fn wards(&self, lga_id: &str) -> AppResult<Vec<Ward>>;
    async fn communities(&self, ward_id: &str) -> AppResult<Vec<Community>>;
    async fn lga_boundaries(&self, state_id: &str) -> AppResult<geojson::FeatureCollection>;
}

/// reqwest-backed API client
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    session: Session,
}

/// Boundary record from `GET /farms/geometries`
#[derive(Debug, Deserialize)]
struct GeometryRecord {
    farm_id: Uuid,
    geometry: geojson::Geometry,
}

#[derive(Serialize)]
struct SearchQuery<'a> {
    q: &'a str,
}

impl ApiClient {
    /// Create a new ApiClient
    pub fn new(config: &ApiConfig, session: Session) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| AppError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    /// Create a new ApiClient with a custom base URL (for testing)
    pub fn with_base_url(base_url: impl Into<String>, session: Session) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session,
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client
            .request(method, url)
            .bearer_auth(self.session.token())
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, what: &str) -> AppResult<T> {
        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(%status, what, "API request failed");
            return Err(AppError::from_status(status, &body));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| AppError::Decode(format!("Failed to parse {}: {}", what, e)))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, what: &str) -> AppResult<T> {
        self.send(self.request(Method::GET, path), what).await
    }

    /// Advisory endpoints answer with the success/error envelope even on
    /// failure, so the body is read regardless of status.
    async fn advisory<T: DeserializeOwned>(
        &self,
        farm_id: Uuid,
        kind: AdvisoryKind,
        params: &AdvisoryParams,
    ) -> AppResult<AdvisoryResult<T>> {
        let path = format!("/advisory/{}/{}", farm_id, kind.endpoint());
        let response = self
            .request(Method::GET, &path)
            .query(params)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        match serde_json::from_str::<AdvisoryResult<T>>(&body) {
            Ok(result) => Ok(result),
            Err(_) if !status.is_success() => Err(AppError::from_status(status, &body)),
            Err(e) => Err(AppError::Decode(format!(
                "Failed to parse {} advisory: {}",
                kind.endpoint(),
                e
            ))),
        }
    }
}

#[async_trait]
impl FarmApi for ApiClient {
    async fn search_farmers(&self, query: &str) -> AppResult<Vec<FarmerSummary>> {
        let request = self
            .request(Method::GET, "/farmers/search")
            .query(&SearchQuery { q: query });
        self.send(request, "farmer search").await
    }

    async fn get_farmer(&self, farmer_id: Uuid) -> AppResult<Farmer> {
        self.get(&format!("/farmers/{}", farmer_id), "farmer").await
    }

    async fn create_farmer(&self, farmer: &NewFarmer) -> AppResult<Farmer> {
        let request = self.request(Method::POST, "/farmers").json(farmer);
        self.send(request, "farmer").await
    }

    async fn update_farmer(&self, farmer_id: Uuid, farmer: &NewFarmer) -> AppResult<Farmer> {
        let request = self
            .request(Method::PUT, &format!("/farmers/{}", farmer_id))
            .json(farmer);
        self.send(request, "farmer").await
    }

    async fn farmer_farms(&self, farmer_id: Uuid) -> AppResult<Vec<Farm>> {
        self.get(&format!("/farmers/{}/farms", farmer_id), "farms")
            .await
    }

    async fn get_farm(&self, farm_id: Uuid) -> AppResult<Farm> {
        self.get(&format!("/farms/{}", farm_id), "farm").await
    }

    async fn create_farm(&self, payload: &FarmPayload) -> AppResult<Farm> {
        let request = self.request(Method::POST, "/farms").json(payload);
        self.send(request, "farm").await
    }

    async fn update_farm(&self, farm_id: Uuid, payload: &FarmPayload) -> AppResult<Farm> {
        let request = self
            .request(Method::PUT, &format!("/farms/{}", farm_id))
            .json(payload);
        self.send(request, "farm").await
    }

    async fn existing_boundaries(&self) -> AppResult<Vec<ExistingBoundary>> {
        let records: Vec<GeometryRecord> = self.get("/farms/geometries", "farm geometries").await?;
        let total = records.len();

        let boundaries: Vec<ExistingBoundary> = records
            .into_iter()
            .filter_map(|record| match BoundaryRing::from_geojson(&record.geometry) {
                Ok(ring) => Some(ExistingBoundary {
                    farm_id: record.farm_id,
                    ring,
                }),
                Err(e) => {
                    tracing::debug!(farm_id = %record.farm_id, error = %e, "Skipping farm geometry");
                    None
                }
            })
            .collect();

        if boundaries.len() < total {
            tracing::warn!(
                skipped = total - boundaries.len(),
                "Some farm geometries could not be read"
            );
        }
        Ok(boundaries)
    }

    async fn fertilizer_advisory(
        &self,
        farm_id: Uuid,
        params: &AdvisoryParams,
    ) -> AppResult<AdvisoryResult<FertilizerAdvisory>> {
        self.advisory(farm_id, AdvisoryKind::Fertilizer, params).await
    }

    async fn crop_health_advisory(
        &self,
        farm_id: Uuid,
        params: &AdvisoryParams,
    ) -> AppResult<AdvisoryResult<CropHealthAdvisory>> {
        self.advisory(farm_id, AdvisoryKind::CropHealth, params).await
    }

    async fn water_stress_advisory(
        &self,
        farm_id: Uuid,
        params: &AdvisoryParams,
    ) -> AppResult<AdvisoryResult<WaterStressAdvisory>> {
        self.advisory(farm_id, AdvisoryKind::WaterStress, params).await
    }

    async fn herbicide_pesticide_advisory(
        &self,
        farm_id: Uuid,
        params: &AdvisoryParams,
    ) -> AppResult<AdvisoryResult<HerbicidePesticideAdvisory>> {
        self.advisory(farm_id, AdvisoryKind::HerbicidePesticide, params)
            .await
    }

    async fn states(&self) -> AppResult<Vec<State>> {
        self.get("/locations/states", "states").await
    }

    async fn lgas(&self, state_id: &str) -> AppResult<Vec<Lga>> {
        self.get(&format!("/locations/states/{}/lgas", state_id), "LGAs")
            .await
    }

    async fn wards(&self, lga_id: &str) -> AppResult<Vec<Ward>> {
        self.get(&format!("/locations/lgas/{}/wards", lga_id), "wards")
            .await
    }

    async fn communities(&self, ward_id: &str) -> AppResult<Vec<Community>> {
        self.get(
            &format!("/locations/wards/{}/communities", ward_id),
            "communities",
        )
        .await
    }

    async fn lga_boundaries(&self, state_id: &str) -> AppResult<geojson::FeatureCollection> {
        self.get(
            &format!("/locations/states/{}/lga_boundaries", state_id),
            "LGA boundaries",
        )
        .await
    }
}
