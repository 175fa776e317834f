//! In-memory FarmApi used by the service tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use shared::*;
use uuid::Uuid;

use farmdesk::external::FarmApi;
use farmdesk::{AppError, AppResult};

/// Square ring with its south-west corner at `(lat, lng)`
pub fn square(lat: f64, lng: f64, side_deg: f64) -> BoundaryRing {
    BoundaryRing::close(vec![
        LatLng::new(lat, lng),
        LatLng::new(lat, lng + side_deg),
        LatLng::new(lat + side_deg, lng + side_deg),
        LatLng::new(lat + side_deg, lng),
    ])
    .unwrap()
}

pub fn summary(first_name: &str) -> FarmerSummary {
    FarmerSummary {
        id: Uuid::new_v4(),
        first_name: first_name.to_string(),
        last_name: "Bello".to_string(),
        phone_number: "08031234567".to_string(),
        lga: Some("Zaria".to_string()),
        farm_count: 1,
    }
}

pub fn farmer(id: Uuid) -> Farmer {
    Farmer {
        id,
        first_name: "Amina".to_string(),
        middle_name: None,
        last_name: "Bello".to_string(),
        gender: None,
        date_of_birth: None,
        phone_number: "08031234567".to_string(),
        email: None,
        nin: None,
        address: FarmerAddress {
            state: "Kaduna".to_string(),
            lga: "Zaria".to_string(),
            ..Default::default()
        },
        photo: None,
        cooperative: None,
        created_at: Utc::now(),
    }
}

pub fn farm_from(farm_id: Uuid, payload: &FarmPayload) -> Farm {
    Farm {
        id: farm_id,
        farmer_id: payload.farmer_id,
        geometry: payload.geometry.clone(),
        farm_type: payload.farm_type.clone(),
        ownership_status: payload.ownership_status.clone(),
        lease_years: payload.lease_years,
        lease_months: payload.lease_months,
        crop_type: payload.crop_type.clone(),
        livestock_type: payload.livestock_type.clone(),
        livestock_count: payload.livestock_count,
        calculated_area: payload.calculated_area,
        created_at: Utc::now(),
        updated_at: None,
    }
}

/// A farm write seen by the fake: `None` for create, the id for update
pub type FarmWrite = (Option<Uuid>, FarmPayload);

#[derive(Default)]
pub struct FakeApi {
    pub search_delay: Duration,
    pub search_results: Vec<FarmerSummary>,
    pub searches_started: Mutex<Vec<String>>,
    pub searches_completed: Mutex<Vec<String>>,

    pub farmer_calls: AtomicUsize,
    pub farms_calls: AtomicUsize,
    pub farms: Vec<Farm>,

    pub boundaries: Vec<ExistingBoundary>,
    pub fail_writes: AtomicBool,
    pub writes: Mutex<Vec<FarmWrite>>,

    pub community_calls: AtomicUsize,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn started(&self) -> Vec<String> {
        self.searches_started.lock().unwrap().clone()
    }

    pub fn completed(&self) -> Vec<String> {
        self.searches_completed.lock().unwrap().clone()
    }

    pub fn writes(&self) -> Vec<FarmWrite> {
        self.writes.lock().unwrap().clone()
    }

    fn write(&self, farm_id: Option<Uuid>, payload: &FarmPayload) -> AppResult<Farm> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::Api {
                status: 500,
                message: "database unavailable".to_string(),
            });
        }
        self.writes.lock().unwrap().push((farm_id, payload.clone()));
        Ok(farm_from(farm_id.unwrap_or_else(Uuid::new_v4), payload))
    }
}

#[async_trait]
impl FarmApi for FakeApi {
    async fn search_farmers(&self, query: &str) -> AppResult<Vec<FarmerSummary>> {
        self.searches_started.lock().unwrap().push(query.to_string());
        tokio::time::sleep(self.search_delay).await;
        self.searches_completed.lock().unwrap().push(query.to_string());
        Ok(self.search_results.clone())
    }

    async fn get_farmer(&self, farmer_id: Uuid) -> AppResult<Farmer> {
        self.farmer_calls.fetch_add(1, Ordering::SeqCst);
        Ok(farmer(farmer_id))
    }

    async fn create_farmer(&self, _farmer: &NewFarmer) -> AppResult<Farmer> {
        Err(AppError::NotFound("create_farmer".to_string()))
    }

    async fn update_farmer(&self, _farmer_id: Uuid, _farmer: &NewFarmer) -> AppResult<Farmer> {
        Err(AppError::NotFound("update_farmer".to_string()))
    }

    async fn farmer_farms(&self, _farmer_id: Uuid) -> AppResult<Vec<Farm>> {
        self.farms_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.farms.clone())
    }

    async fn get_farm(&self, farm_id: Uuid) -> AppResult<Farm> {
        Err(AppError::NotFound(format!("Farm {}", farm_id)))
    }

    async fn create_farm(&self, payload: &FarmPayload) -> AppResult<Farm> {
        self.write(None, payload)
    }

    async fn update_farm(&self, farm_id: Uuid, payload: &FarmPayload) -> AppResult<Farm> {
        self.write(Some(farm_id), payload)
    }

    async fn existing_boundaries(&self) -> AppResult<Vec<ExistingBoundary>> {
        Ok(self.boundaries.clone())
    }

    async fn fertilizer_advisory(
        &self,
        _farm_id: Uuid,
        _params: &AdvisoryParams,
    ) -> AppResult<AdvisoryResult<FertilizerAdvisory>> {
        Ok(AdvisoryResult::Success(FertilizerAdvisory {
            crop_type: Some("Maize".to_string()),
            recommendations: vec![FertilizerRecommendation {
                product: "NPK 15-15-15".to_string(),
                rate_kg_per_ha: 200.0,
                timing: Some("at planting".to_string()),
                notes: None,
            }],
            ..Default::default()
        }))
    }

    async fn crop_health_advisory(
        &self,
        _farm_id: Uuid,
        _params: &AdvisoryParams,
    ) -> AppResult<AdvisoryResult<CropHealthAdvisory>> {
        Ok(AdvisoryResult::Error(
            "Satellite imagery unavailable".to_string(),
        ))
    }

    async fn water_stress_advisory(
        &self,
        _farm_id: Uuid,
        _params: &AdvisoryParams,
    ) -> AppResult<AdvisoryResult<WaterStressAdvisory>> {
        Ok(AdvisoryResult::Success(WaterStressAdvisory {
            ndwi_mean: Some(0.21),
            stress_level: Some("Low".to_string()),
            ..Default::default()
        }))
    }

    async fn herbicide_pesticide_advisory(
        &self,
        _farm_id: Uuid,
        _params: &AdvisoryParams,
    ) -> AppResult<AdvisoryResult<HerbicidePesticideAdvisory>> {
        Err(AppError::Api {
            status: 503,
            message: "model offline".to_string(),
        })
    }

    async fn states(&self) -> AppResult<Vec<State>> {
        Ok(vec![State {
            id: "KD".to_string(),
            name: "Kaduna".to_string(),
        }])
    }

    async fn lgas(&self, state_id: &str) -> AppResult<Vec<Lga>> {
        Ok(vec![Lga {
            id: "KD-ZAR".to_string(),
            name: "Zaria".to_string(),
            state_id: state_id.to_string(),
        }])
    }

    async fn wards(&self, lga_id: &str) -> AppResult<Vec<Ward>> {
        Ok(vec![Ward {
            id: "KD-ZAR-01".to_string(),
            name: "Samaru".to_string(),
            lga_id: lga_id.to_string(),
        }])
    }

    async fn communities(&self, ward_id: &str) -> AppResult<Vec<Community>> {
        self.community_calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![Community {
            id: "KD-ZAR-01-03".to_string(),
            name: "Hayin Dogo".to_string(),
            ward_id: ward_id.to_string(),
        }])
    }

    async fn lga_boundaries(&self, _state_id: &str) -> AppResult<geojson::FeatureCollection> {
        Ok(geojson::FeatureCollection {
            bbox: None,
            features: Vec::new(),
            foreign_members: None,
        })
    }
}
