//! Validation utilities for Farmdesk
//!
//! Form checks run client-side before anything is sent to the API.
//! Includes Nigeria-specific identity and phone validations.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use validator::{ValidationError, ValidationErrors, ValidationErrorsKind};

use crate::geometry::area_hectares;
use crate::models::{FarmDraft, FarmPayload, OwnershipStatus};

/// Per-field validation messages, keyed by field name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_insert_with(|| message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    fn collect_from(&mut self, prefix: &str, errors: &ValidationErrors) {
        for (field, kind) in errors.errors() {
            let name = if prefix.is_empty() {
                field.to_string()
            } else {
                format!("{}.{}", prefix, field)
            };
            match kind {
                ValidationErrorsKind::Field(list) => {
                    if let Some(first) = list.first() {
                        let message = first
                            .message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| format!("Invalid {}", field));
                        self.add(name, message);
                    }
                }
                ValidationErrorsKind::Struct(inner) => self.collect_from(&name, inner),
                ValidationErrorsKind::List(items) => {
                    for (index, inner) in items {
                        self.collect_from(&format!("{}[{}]", name, index), inner);
                    }
                }
            }
        }
    }
}

impl From<&ValidationErrors> for FieldErrors {
    fn from(errors: &ValidationErrors) -> Self {
        let mut out = FieldErrors::new();
        out.collect_from("", errors);
        out
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(field, message)| format!("{}: {}", field, message))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

// ============================================================================
// Farm Form Validations
// ============================================================================

/// Check the farm form before submission
///
/// Crop and livestock sub-types are required depending on the farm type, and
/// a leased farm needs a lease duration.
pub fn validate_farm_draft(draft: &FarmDraft) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();

    if draft.farmer_id.is_none() {
        errors.add("farmer_id", "Select the farmer who owns this farm");
    }

    match &draft.farm_type {
        None => errors.add("farm_type", "Farm type is required"),
        Some(farm_type) => {
            if farm_type.needs_crop_type() && is_blank(draft.crop_type.as_deref()) {
                errors.add("crop_type", "Crop type is required");
            }
            if farm_type.needs_livestock_type() {
                if is_blank(draft.livestock_type.as_deref()) {
                    errors.add("livestock_type", "Livestock type is required");
                }
                if draft.livestock_count.unwrap_or(0) == 0 {
                    errors.add("livestock_count", "Number of animals must be greater than 0");
                }
            }
        }
    }

    match &draft.ownership_status {
        None => errors.add("ownership_status", "Ownership status is required"),
        Some(OwnershipStatus::Leased) => {
            if let Err(message) = validate_lease_duration(draft.lease_years, draft.lease_months) {
                errors.add("lease_years", message);
                errors.add("lease_months", message);
            }
        }
        Some(_) => {}
    }

    if draft.geometry.is_none() {
        errors.add("geometry", "Draw or trace the farm boundary");
    }

    errors.into_result()
}

/// A lease needs a positive duration in years, months, or both
pub fn validate_lease_duration(
    years: Option<u32>,
    months: Option<u32>,
) -> Result<(), &'static str> {
    if years.is_none() && months.is_none() {
        return Err("Lease duration is required for leased farms");
    }
    if years.unwrap_or(0) == 0 && months.unwrap_or(0) == 0 {
        return Err("Lease duration must be greater than zero");
    }
    if months.unwrap_or(0) > 11 {
        return Err("Lease months must be between 0 and 11");
    }
    Ok(())
}

/// Validate the draft and build the request body for the API
pub fn compose_farm_payload(draft: &FarmDraft) -> Result<FarmPayload, FieldErrors> {
    validate_farm_draft(draft)?;

    let (Some(farmer_id), Some(farm_type), Some(ownership_status), Some(ring)) = (
        draft.farmer_id,
        draft.farm_type.clone(),
        draft.ownership_status.clone(),
        draft.geometry.as_ref(),
    ) else {
        // validate_farm_draft rejects drafts missing any of these
        return Err(FieldErrors::new());
    };

    let leased = ownership_status == OwnershipStatus::Leased;
    Ok(FarmPayload {
        farmer_id,
        crop_type: if farm_type.needs_crop_type() {
            trimmed(draft.crop_type.as_deref())
        } else {
            None
        },
        livestock_type: if farm_type.needs_livestock_type() {
            trimmed(draft.livestock_type.as_deref())
        } else {
            None
        },
        livestock_count: if farm_type.needs_livestock_type() {
            draft.livestock_count
        } else {
            None
        },
        farm_type,
        lease_years: draft.lease_years.filter(|_| leased),
        lease_months: draft.lease_months.filter(|_| leased),
        ownership_status,
        calculated_area: area_hectares(ring),
        geometry: ring.to_geojson(),
    })
}

fn is_blank(value: Option<&str>) -> bool {
    value.map(|v| v.trim().is_empty()).unwrap_or(true)
}

fn trimmed(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

// ============================================================================
// General Validations
// ============================================================================

/// Validate a coordinate pair is on the globe
pub fn validate_coordinates(lat: f64, lng: f64) -> Result<(), &'static str> {
    if !lat.is_finite() || !lng.is_finite() {
        return Err("Coordinates must be finite numbers");
    }
    if !(-90.0..=90.0).contains(&lat) {
        return Err("Latitude must be between -90 and 90");
    }
    if !(-180.0..=180.0).contains(&lng) {
        return Err("Longitude must be between -180 and 180");
    }
    Ok(())
}

/// Minimum characters before a farmer search is sent
pub const MIN_SEARCH_LENGTH: usize = 2;

/// True when a search query is long enough to send
pub fn is_searchable(query: &str) -> bool {
    query.trim().chars().count() >= MIN_SEARCH_LENGTH
}

// ============================================================================
// Nigeria-Specific Validations
// ============================================================================

/// Check a Nigerian phone number
/// Accepts: 08031234567, 0803-123-4567, +2348031234567
pub fn check_nigerian_phone(phone: &str) -> Result<(), &'static str> {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();

    // Local format: 11 digits starting with 0
    if digits.len() == 11 && digits.starts_with('0') {
        return Ok(());
    }
    // International format: 13 digits starting with 234
    if digits.len() == 13 && digits.starts_with("234") {
        return Ok(());
    }

    Err("Invalid Nigerian phone number format")
}

/// Check a National Identification Number (11 digits)
pub fn check_nin(nin: &str) -> Result<(), &'static str> {
    let trimmed = nin.trim();
    if trimmed.len() != 11 || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Err("NIN must be exactly 11 digits");
    }
    Ok(())
}

/// `validator` hook for phone fields
pub fn validate_phone_number(phone: &str) -> Result<(), ValidationError> {
    check_nigerian_phone(phone).map_err(|message| {
        let mut error = ValidationError::new("phone_number");
        error.message = Some(message.into());
        error
    })
}

/// `validator` hook for NIN fields
pub fn validate_nin(nin: &str) -> Result<(), ValidationError> {
    check_nin(nin).map_err(|message| {
        let mut error = ValidationError::new("nin");
        error.message = Some(message.into());
        error
    })
}

/// Nigerian states and the Federal Capital Territory
pub const NIGERIAN_STATES: &[&str] = &[
    "Abia", "Adamawa", "Akwa Ibom", "Anambra", "Bauchi", "Bayelsa", "Benue", "Borno",
    "Cross River", "Delta", "Ebonyi", "Edo", "Ekiti", "Enugu", "FCT", "Gombe", "Imo",
    "Jigawa", "Kaduna", "Kano", "Katsina", "Kebbi", "Kogi", "Kwara", "Lagos", "Nasarawa",
    "Niger", "Ogun", "Ondo", "Osun", "Oyo", "Plateau", "Rivers", "Sokoto", "Taraba", "Yobe",
    "Zamfara",
];

/// Check if a state name is a Nigerian state
pub fn is_nigerian_state(state: &str) -> bool {
    NIGERIAN_STATES
        .iter()
        .any(|s| s.eq_ignore_ascii_case(state.trim()))
}
