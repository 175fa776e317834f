//! Agronomic advisory models
//!
//! The advisory backend serves four independent datasets per farm. Each one
//! settles on its own into an [`AdvisoryResult`]; they are never merged.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

/// The four advisory datasets
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AdvisoryKind {
    Fertilizer,
    CropHealth,
    WaterStress,
    HerbicidePesticide,
}

impl AdvisoryKind {
    pub const ALL: [AdvisoryKind; 4] = [
        AdvisoryKind::Fertilizer,
        AdvisoryKind::CropHealth,
        AdvisoryKind::WaterStress,
        AdvisoryKind::HerbicidePesticide,
    ];

    /// Path segment of the advisory endpoint
    pub fn endpoint(&self) -> &'static str {
        match self {
            AdvisoryKind::Fertilizer => "fertilizer",
            AdvisoryKind::CropHealth => "crop_health",
            AdvisoryKind::WaterStress => "water_stress",
            AdvisoryKind::HerbicidePesticide => "herbicide_pesticide",
        }
    }
}

impl std::fmt::Display for AdvisoryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdvisoryKind::Fertilizer => write!(f, "Fertilizer Recommendations"),
            AdvisoryKind::CropHealth => write!(f, "Crop Health"),
            AdvisoryKind::WaterStress => write!(f, "Water Stress"),
            AdvisoryKind::HerbicidePesticide => write!(f, "Herbicide & Pesticide"),
        }
    }
}

/// Outcome of one advisory request
///
/// On the wire: `{"success": true, "data": ...}` or
/// `{"success": false, "error": "..."}`.
#[derive(Debug, Clone, PartialEq)]
pub enum AdvisoryResult<T> {
    Success(T),
    Error(String),
}

impl<T> AdvisoryResult<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, AdvisoryResult::Success(_))
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            AdvisoryResult::Success(data) => Some(data),
            AdvisoryResult::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            AdvisoryResult::Success(_) => None,
            AdvisoryResult::Error(message) => Some(message),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct Envelope<T> {
    success: bool,
    #[serde(default = "Option::default", skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for AdvisoryResult<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let envelope = Envelope::<T>::deserialize(deserializer)?;
        match (envelope.success, envelope.data) {
            (true, Some(data)) => Ok(AdvisoryResult::Success(data)),
            (true, None) => Ok(AdvisoryResult::Error("No data returned".to_string())),
            (false, _) => Ok(AdvisoryResult::Error(
                envelope
                    .error
                    .unwrap_or_else(|| "Unknown error".to_string()),
            )),
        }
    }
}

impl<T: Serialize> Serialize for AdvisoryResult<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let envelope = match self {
            AdvisoryResult::Success(data) => Envelope {
                success: true,
                data: Some(data),
                error: None,
            },
            AdvisoryResult::Error(message) => Envelope {
                success: false,
                data: None,
                error: Some(message.clone()),
            },
        };
        envelope.serialize(serializer)
    }
}

/// Optional inputs that tune the advisory models
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AdvisoryParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub planting_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub growth_stage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timing_preference: Option<TimingPreference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weed_pressure: Option<PressureLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pest_pressure: Option<PressureLevel>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TimingPreference {
    PreEmergence,
    PostEmergence,
    Any,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PressureLevel {
    Low,
    Medium,
    High,
}

/// A dated index reading (NDVI, NDWI)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexObservation {
    pub date: NaiveDate,
    pub value: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NutrientLevels {
    #[serde(default)]
    pub nitrogen: Option<f64>,
    #[serde(default)]
    pub phosphorus: Option<f64>,
    #[serde(default)]
    pub potassium: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FertilizerRecommendation {
    pub product: String,
    pub rate_kg_per_ha: f64,
    #[serde(default)]
    pub timing: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FertilizerAdvisory {
    #[serde(default)]
    pub crop_type: Option<String>,
    #[serde(default)]
    pub growth_stage: Option<String>,
    #[serde(default)]
    pub soil_nutrients: Option<NutrientLevels>,
    #[serde(default)]
    pub recommendations: Vec<FertilizerRecommendation>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CropHealthAdvisory {
    #[serde(default)]
    pub ndvi_mean: Option<f64>,
    #[serde(default)]
    pub ndvi_min: Option<f64>,
    #[serde(default)]
    pub ndvi_max: Option<f64>,
    #[serde(default)]
    pub health_status: Option<String>,
    #[serde(default)]
    pub observations: Vec<IndexObservation>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WaterStressAdvisory {
    #[serde(default)]
    pub ndwi_mean: Option<f64>,
    #[serde(default)]
    pub stress_level: Option<String>,
    #[serde(default)]
    pub irrigation_recommendation: Option<String>,
    #[serde(default)]
    pub observations: Vec<IndexObservation>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TreatmentRecommendation {
    pub product: String,
    pub target: String,
    #[serde(default)]
    pub dosage: Option<String>,
    #[serde(default)]
    pub application_window: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SprayWindow {
    pub date: NaiveDate,
    pub suitable: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HerbicidePesticideAdvisory {
    #[serde(default)]
    pub weed_pressure: Option<PressureLevel>,
    #[serde(default)]
    pub pest_pressure: Option<PressureLevel>,
    #[serde(default)]
    pub recommendations: Vec<TreatmentRecommendation>,
    #[serde(default)]
    pub spray_windows: Vec<SprayWindow>,
}

/// The four advisory results for one farm
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdvisoryReport {
    pub farm_id: Uuid,
    pub fertilizer: AdvisoryResult<FertilizerAdvisory>,
    pub crop_health: AdvisoryResult<CropHealthAdvisory>,
    pub water_stress: AdvisoryResult<WaterStressAdvisory>,
    pub herbicide_pesticide: AdvisoryResult<HerbicidePesticideAdvisory>,
}

impl AdvisoryReport {
    /// Number of datasets that loaded
    pub fn success_count(&self) -> usize {
        [
            self.fertilizer.is_success(),
            self.crop_health.is_success(),
            self.water_stress.is_success(),
            self.herbicide_pesticide.is_success(),
        ]
        .into_iter()
        .filter(|ok| *ok)
        .count()
    }

    pub fn status(&self) -> ReportStatus {
        ReportStatus::from_counts(self.success_count(), AdvisoryKind::ALL.len())
    }

    /// Error message for a dataset, if it failed
    pub fn error_for(&self, kind: AdvisoryKind) -> Option<&str> {
        match kind {
            AdvisoryKind::Fertilizer => self.fertilizer.error(),
            AdvisoryKind::CropHealth => self.crop_health.error(),
            AdvisoryKind::WaterStress => self.water_stress.error(),
            AdvisoryKind::HerbicidePesticide => self.herbicide_pesticide.error(),
        }
    }
}

/// Aggregate availability shown once in the report header
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum ReportStatus {
    Complete,
    Partial { succeeded: usize, total: usize },
    None,
}

impl ReportStatus {
    pub fn from_counts(succeeded: usize, total: usize) -> Self {
        if succeeded == 0 {
            ReportStatus::None
        } else if succeeded >= total {
            ReportStatus::Complete
        } else {
            ReportStatus::Partial { succeeded, total }
        }
    }
}

impl std::fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportStatus::Complete => write!(f, "Complete Data"),
            ReportStatus::Partial { succeeded, total } => {
                write!(f, "Partial Data ({}/{})", succeeded, total)
            }
            ReportStatus::None => write!(f, "No Data Available"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_envelope() {
        let json = r#"{"success": true, "data": {"ndwi_mean": 0.21, "stress_level": "low"}}"#;
        let result: AdvisoryResult<WaterStressAdvisory> = serde_json::from_str(json).unwrap();
        let data = result.data().unwrap();
        assert_eq!(data.ndwi_mean, Some(0.21));
        assert_eq!(data.stress_level.as_deref(), Some("low"));
    }

    #[test]
    fn test_error_envelope() {
        let json = r#"{"success": false, "error": "No imagery for this period"}"#;
        let result: AdvisoryResult<CropHealthAdvisory> = serde_json::from_str(json).unwrap();
        assert_eq!(result.error(), Some("No imagery for this period"));
    }

    #[test]
    fn test_success_without_data_is_error() {
        let json = r#"{"success": true}"#;
        let result: AdvisoryResult<CropHealthAdvisory> = serde_json::from_str(json).unwrap();
        assert!(!result.is_success());
    }

    #[test]
    fn test_status_text() {
        assert_eq!(ReportStatus::from_counts(4, 4).to_string(), "Complete Data");
        assert_eq!(
            ReportStatus::from_counts(2, 4).to_string(),
            "Partial Data (2/4)"
        );
        assert_eq!(ReportStatus::from_counts(0, 4).to_string(), "No Data Available");
    }

    #[test]
    fn test_params_skip_empty_fields() {
        let params = AdvisoryParams {
            growth_stage: Some("vegetative".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json, serde_json::json!({"growth_stage": "vegetative"}));
    }
}
