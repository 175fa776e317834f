//! Farm models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geometry::{BoundaryRing, RingError};

/// A farm as returned by the API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Farm {
    pub id: Uuid,
    pub farmer_id: Uuid,
    pub geometry: geojson::Geometry,
    pub farm_type: FarmType,
    pub ownership_status: OwnershipStatus,
    #[serde(default)]
    pub lease_years: Option<u32>,
    #[serde(default)]
    pub lease_months: Option<u32>,
    #[serde(default)]
    pub crop_type: Option<String>,
    #[serde(default)]
    pub livestock_type: Option<String>,
    #[serde(default)]
    pub livestock_count: Option<u32>,
    /// Hectares, fixed once the geometry is accepted
    pub calculated_area: Decimal,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Farm {
    /// Outer boundary of the farm geometry
    pub fn boundary(&self) -> Result<BoundaryRing, RingError> {
        BoundaryRing::from_geojson(&self.geometry)
    }

    /// Re-open the farm in the edit flow
    pub fn to_draft(&self) -> FarmDraft {
        FarmDraft {
            farm_id: Some(self.id),
            farmer_id: Some(self.farmer_id),
            farm_type: Some(self.farm_type.clone()),
            ownership_status: Some(self.ownership_status.clone()),
            lease_years: self.lease_years,
            lease_months: self.lease_months,
            crop_type: self.crop_type.clone(),
            livestock_type: self.livestock_type.clone(),
            livestock_count: self.livestock_count,
            geometry: self.boundary().ok(),
        }
    }
}

/// Kind of farming carried out on a farm
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FarmType {
    Crop,
    Livestock,
    Mixed,
}

impl FarmType {
    pub fn needs_crop_type(&self) -> bool {
        matches!(self, FarmType::Crop | FarmType::Mixed)
    }

    pub fn needs_livestock_type(&self) -> bool {
        matches!(self, FarmType::Livestock | FarmType::Mixed)
    }
}

impl std::fmt::Display for FarmType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FarmType::Crop => write!(f, "Crop"),
            FarmType::Livestock => write!(f, "Livestock"),
            FarmType::Mixed => write!(f, "Mixed"),
        }
    }
}

/// Land tenure of a farm
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OwnershipStatus {
    Owned,
    Leased,
    Family,
    Community,
}

impl std::fmt::Display for OwnershipStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OwnershipStatus::Owned => write!(f, "Owned"),
            OwnershipStatus::Leased => write!(f, "Leased"),
            OwnershipStatus::Family => write!(f, "Family land"),
            OwnershipStatus::Community => write!(f, "Community land"),
        }
    }
}

/// In-progress farm form, also used to edit an existing farm
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FarmDraft {
    /// Set when editing an existing farm
    pub farm_id: Option<Uuid>,
    pub farmer_id: Option<Uuid>,
    pub farm_type: Option<FarmType>,
    pub ownership_status: Option<OwnershipStatus>,
    pub lease_years: Option<u32>,
    pub lease_months: Option<u32>,
    pub crop_type: Option<String>,
    pub livestock_type: Option<String>,
    pub livestock_count: Option<u32>,
    pub geometry: Option<BoundaryRing>,
}

impl FarmDraft {
    pub fn for_farmer(farmer_id: Uuid) -> Self {
        Self {
            farmer_id: Some(farmer_id),
            ..Default::default()
        }
    }

    pub fn is_edit(&self) -> bool {
        self.farm_id.is_some()
    }
}

/// Body of the farm create/update request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FarmPayload {
    pub farmer_id: Uuid,
    pub farm_type: FarmType,
    pub ownership_status: OwnershipStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lease_years: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lease_months: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crop_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub livestock_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub livestock_count: Option<u32>,
    pub calculated_area: Decimal,
    /// GeoJSON MultiPolygon
    pub geometry: geojson::Geometry,
}
