//! Farmer models

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::types::PhotoReference;

/// A registered farmer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Farmer {
    pub id: Uuid,
    pub first_name: String,
    #[serde(default)]
    pub middle_name: Option<String>,
    pub last_name: String,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    pub phone_number: String,
    #[serde(default)]
    pub email: Option<String>,
    /// National Identification Number
    #[serde(default)]
    pub nin: Option<String>,
    pub address: FarmerAddress,
    #[serde(default)]
    pub photo: Option<PhotoReference>,
    #[serde(default)]
    pub cooperative: Option<CooperativeAffiliation>,
    pub created_at: DateTime<Utc>,
}

impl Farmer {
    pub fn full_name(&self) -> String {
        match self.middle_name.as_deref().filter(|m| !m.is_empty()) {
            Some(middle) => format!("{} {} {}", self.first_name, middle, self.last_name),
            None => format!("{} {}", self.first_name, self.last_name),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other,
}

/// Where the farmer lives
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct FarmerAddress {
    #[validate(length(min = 1, message = "State is required"))]
    pub state: String,
    #[validate(length(min = 1, message = "LGA is required"))]
    pub lga: String,
    #[serde(default)]
    pub ward: Option<String>,
    #[serde(default)]
    pub community: Option<String>,
    #[serde(default)]
    pub street_address: Option<String>,
}

/// Membership of a farmers' cooperative
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CooperativeAffiliation {
    pub is_member: bool,
    #[serde(default)]
    pub cooperative_name: Option<String>,
    #[serde(default)]
    pub activities: Vec<String>,
}

/// A KYC photo captured during registration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KycPhotoUpload {
    pub filename: String,
    pub content_type: String,
    /// Base64-encoded image bytes
    pub data: String,
}

/// Registration form for a new farmer
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct NewFarmer {
    #[validate(length(min = 1, max = 100, message = "First name is required"))]
    pub first_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,
    #[validate(length(min = 1, max = 100, message = "Last name is required"))]
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<NaiveDate>,
    #[validate(custom = "crate::validation::validate_phone_number")]
    pub phone_number: String,
    #[validate(email(message = "Invalid email format"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[validate(custom = "crate::validation::validate_nin")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nin: Option<String>,
    #[validate]
    pub address: FarmerAddress,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cooperative: Option<CooperativeAffiliation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub kyc_photos: Vec<KycPhotoUpload>,
}

/// Short farmer record returned by search
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FarmerSummary {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    #[serde(default)]
    pub lga: Option<String>,
    #[serde(default)]
    pub farm_count: u32,
}
