//! Advisory report service
//!
//! Fetches the four advisory datasets for a farm concurrently and turns each
//! one into an independent panel. A failed dataset becomes an error panel;
//! it never blocks the others.

use std::sync::Arc;

use serde::Serialize;
use shared::{
    AdvisoryKind, AdvisoryParams, AdvisoryReport, AdvisoryResult, CropHealthAdvisory,
    FertilizerAdvisory, HerbicidePesticideAdvisory, ReportStatus, WaterStressAdvisory,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::external::FarmApi;

/// Advisory report service
#[derive(Clone)]
pub struct AdvisoryService {
    api: Arc<dyn FarmApi>,
}

impl AdvisoryService {
    pub fn new(api: Arc<dyn FarmApi>) -> Self {
        Self { api }
    }

    /// Issue all four advisory requests together and wait for each to settle
    pub async fn fetch_report(&self, farm_id: Uuid, params: &AdvisoryParams) -> AdvisoryReport {
        let (fertilizer, crop_health, water_stress, herbicide_pesticide) = tokio::join!(
            self.api.fertilizer_advisory(farm_id, params),
            self.api.crop_health_advisory(farm_id, params),
            self.api.water_stress_advisory(farm_id, params),
            self.api.herbicide_pesticide_advisory(farm_id, params),
        );

        let report = AdvisoryReport {
            farm_id,
            fertilizer: settle(AdvisoryKind::Fertilizer, fertilizer),
            crop_health: settle(AdvisoryKind::CropHealth, crop_health),
            water_stress: settle(AdvisoryKind::WaterStress, water_stress),
            herbicide_pesticide: settle(AdvisoryKind::HerbicidePesticide, herbicide_pesticide),
        };

        tracing::info!(
            %farm_id,
            succeeded = report.success_count(),
            status = %report.status(),
            "Advisory report settled"
        );
        report
    }
}

/// Fold a transport failure into the dataset's own error result
fn settle<T>(kind: AdvisoryKind, result: AppResult<AdvisoryResult<T>>) -> AdvisoryResult<T> {
    match result {
        Ok(AdvisoryResult::Error(message)) => {
            tracing::debug!(dataset = kind.endpoint(), %message, "Advisory returned an error");
            AdvisoryResult::Error(message)
        }
        Ok(ok) => ok,
        Err(e) => {
            tracing::warn!(dataset = kind.endpoint(), error = %e, "Advisory request failed");
            AdvisoryResult::Error(e.detail().message)
        }
    }
}

// ============================================================================
// Page state
// ============================================================================

/// Lifecycle of the advisory page
#[derive(Debug, Clone, PartialEq)]
pub enum ReportState {
    Loading,
    Settled(AdvisoryReport),
}

/// Advisory page for one farm; `refresh` re-issues every request
pub struct AdvisoryPage {
    farm_id: Uuid,
    params: AdvisoryParams,
    state: ReportState,
}

impl AdvisoryPage {
    pub fn new(farm_id: Uuid, params: AdvisoryParams) -> Self {
        Self {
            farm_id,
            params,
            state: ReportState::Loading,
        }
    }

    pub fn state(&self) -> &ReportState {
        &self.state
    }

    pub fn set_params(&mut self, params: AdvisoryParams) {
        self.params = params;
    }

    pub async fn refresh(&mut self, service: &AdvisoryService) -> ReportStatus {
        self.state = ReportState::Loading;
        let report = service.fetch_report(self.farm_id, &self.params).await;
        let status = report.status();
        self.state = ReportState::Settled(report);
        status
    }

    pub fn report(&self) -> Option<&AdvisoryReport> {
        match &self.state {
            ReportState::Settled(report) => Some(report),
            ReportState::Loading => None,
        }
    }

    /// Header line shown above the panels
    pub fn header(&self) -> String {
        match &self.state {
            ReportState::Loading => "Loading advisory data...".to_string(),
            ReportState::Settled(report) => report.status().to_string(),
        }
    }
}

// ============================================================================
// Panels
// ============================================================================

/// One labelled value in a panel
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PanelLine {
    pub label: String,
    pub value: String,
}

impl PanelLine {
    fn new(label: impl Into<String>, value: impl ToString) -> Self {
        Self {
            label: label.into(),
            value: value.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PanelBody {
    Ready { lines: Vec<PanelLine> },
    Failed { message: String },
}

/// A rendered advisory panel
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Panel {
    pub kind: AdvisoryKind,
    pub title: String,
    pub body: PanelBody,
}

impl Panel {
    pub fn is_ready(&self) -> bool {
        matches!(self.body, PanelBody::Ready { .. })
    }
}

/// Dataset-specific panel content
pub trait PanelContent {
    fn panel_lines(&self) -> Vec<PanelLine>;
}

fn panel<T: PanelContent>(kind: AdvisoryKind, result: &AdvisoryResult<T>) -> Panel {
    let body = match result {
        AdvisoryResult::Success(data) => PanelBody::Ready {
            lines: data.panel_lines(),
        },
        AdvisoryResult::Error(message) => PanelBody::Failed {
            message: format!("{} data unavailable: {}", kind, message),
        },
    };
    Panel {
        kind,
        title: kind.to_string(),
        body,
    }
}

/// The four panels of a report, in display order
pub fn panels(report: &AdvisoryReport) -> Vec<Panel> {
    vec![
        panel(AdvisoryKind::Fertilizer, &report.fertilizer),
        panel(AdvisoryKind::CropHealth, &report.crop_health),
        panel(AdvisoryKind::WaterStress, &report.water_stress),
        panel(AdvisoryKind::HerbicidePesticide, &report.herbicide_pesticide),
    ]
}

/// Plain-text rendering of a whole report
pub fn render_text(report: &AdvisoryReport) -> String {
    let mut out = format!(
        "Advisory report for farm {}\nStatus: {}\n",
        report.farm_id,
        report.status()
    );
    for panel in panels(report) {
        out.push_str(&format!("\n== {} ==\n", panel.title));
        match panel.body {
            PanelBody::Ready { lines } if lines.is_empty() => {
                out.push_str("  No details reported\n");
            }
            PanelBody::Ready { lines } => {
                for line in lines {
                    out.push_str(&format!("  {}: {}\n", line.label, line.value));
                }
            }
            PanelBody::Failed { message } => {
                out.push_str(&format!("  {}\n", message));
            }
        }
    }
    out
}

/// Short description of the report status for logs and exports
pub fn status_line(status: ReportStatus) -> String {
    match status {
        ReportStatus::Complete => "All advisory datasets loaded".to_string(),
        ReportStatus::Partial { succeeded, total } => {
            format!("{} of {} advisory datasets loaded", succeeded, total)
        }
        ReportStatus::None => "No advisory datasets could be loaded".to_string(),
    }
}

fn format_index(value: f64) -> String {
    format!("{:.3}", value)
}

impl PanelContent for FertilizerAdvisory {
    fn panel_lines(&self) -> Vec<PanelLine> {
        let mut lines = Vec::new();
        if let Some(crop) = &self.crop_type {
            lines.push(PanelLine::new("Crop", crop));
        }
        if let Some(stage) = &self.growth_stage {
            lines.push(PanelLine::new("Growth stage", stage));
        }
        if let Some(soil) = &self.soil_nutrients {
            for (label, value) in [
                ("Soil nitrogen", soil.nitrogen),
                ("Soil phosphorus", soil.phosphorus),
                ("Soil potassium", soil.potassium),
            ] {
                if let Some(v) = value {
                    lines.push(PanelLine::new(label, format!("{:.1}", v)));
                }
            }
        }
        for rec in &self.recommendations {
            let mut value = format!("{:.1} kg/ha", rec.rate_kg_per_ha);
            if let Some(timing) = &rec.timing {
                value.push_str(&format!(" ({})", timing));
            }
            lines.push(PanelLine::new(&rec.product, value));
        }
        lines
    }
}

impl PanelContent for CropHealthAdvisory {
    fn panel_lines(&self) -> Vec<PanelLine> {
        let mut lines = Vec::new();
        if let Some(status) = &self.health_status {
            lines.push(PanelLine::new("Health status", status));
        }
        if let Some(mean) = self.ndvi_mean {
            lines.push(PanelLine::new("Mean NDVI", format_index(mean)));
        }
        if let (Some(min), Some(max)) = (self.ndvi_min, self.ndvi_max) {
            lines.push(PanelLine::new(
                "NDVI range",
                format!("{} to {}", format_index(min), format_index(max)),
            ));
        }
        if let Some(latest) = self.observations.iter().max_by_key(|o| o.date) {
            lines.push(PanelLine::new(
                "Latest NDVI",
                format!("{} on {}", format_index(latest.value), latest.date),
            ));
        }
        for rec in &self.recommendations {
            lines.push(PanelLine::new("Recommendation", rec));
        }
        lines
    }
}

impl PanelContent for WaterStressAdvisory {
    fn panel_lines(&self) -> Vec<PanelLine> {
        let mut lines = Vec::new();
        if let Some(level) = &self.stress_level {
            lines.push(PanelLine::new("Stress level", level));
        }
        if let Some(mean) = self.ndwi_mean {
            lines.push(PanelLine::new("Mean NDWI", format_index(mean)));
        }
        if let Some(latest) = self.observations.iter().max_by_key(|o| o.date) {
            lines.push(PanelLine::new(
                "Latest NDWI",
                format!("{} on {}", format_index(latest.value), latest.date),
            ));
        }
        if let Some(irrigation) = &self.irrigation_recommendation {
            lines.push(PanelLine::new("Irrigation", irrigation));
        }
        lines
    }
}

impl PanelContent for HerbicidePesticideAdvisory {
    fn panel_lines(&self) -> Vec<PanelLine> {
        let mut lines = Vec::new();
        if let Some(weeds) = self.weed_pressure {
            lines.push(PanelLine::new("Weed pressure", format!("{:?}", weeds)));
        }
        if let Some(pests) = self.pest_pressure {
            lines.push(PanelLine::new("Pest pressure", format!("{:?}", pests)));
        }
        for rec in &self.recommendations {
            let mut value = rec.product.clone();
            if let Some(dosage) = &rec.dosage {
                value.push_str(&format!(", {}", dosage));
            }
            if let Some(window) = &rec.application_window {
                value.push_str(&format!(", {}", window));
            }
            lines.push(PanelLine::new(format!("Treat {}", rec.target), value));
        }
        let suitable: Vec<String> = self
            .spray_windows
            .iter()
            .filter(|w| w.suitable)
            .map(|w| w.date.to_string())
            .collect();
        if !suitable.is_empty() {
            lines.push(PanelLine::new("Suitable spray days", suitable.join(", ")));
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use shared::{FertilizerRecommendation, IndexObservation};

    fn report() -> AdvisoryReport {
        AdvisoryReport {
            farm_id: Uuid::nil(),
            fertilizer: AdvisoryResult::Success(FertilizerAdvisory {
                crop_type: Some("Maize".to_string()),
                recommendations: vec![FertilizerRecommendation {
                    product: "NPK 15-15-15".to_string(),
                    rate_kg_per_ha: 200.0,
                    timing: Some("at planting".to_string()),
                    notes: None,
                }],
                ..Default::default()
            }),
            crop_health: AdvisoryResult::Error("No imagery".to_string()),
            water_stress: AdvisoryResult::Success(WaterStressAdvisory {
                ndwi_mean: Some(0.1234),
                observations: vec![
                    IndexObservation {
                        date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
                        value: 0.1,
                    },
                    IndexObservation {
                        date: NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(),
                        value: 0.2,
                    },
                ],
                ..Default::default()
            }),
            herbicide_pesticide: AdvisoryResult::Error("Service down".to_string()),
        }
    }

    #[test]
    fn test_panels_are_independent() {
        let panels = panels(&report());
        assert_eq!(panels.len(), 4);
        assert_eq!(panels.iter().filter(|p| p.is_ready()).count(), 2);
        match &panels[1].body {
            PanelBody::Failed { message } => {
                assert_eq!(message, "Crop Health data unavailable: No imagery")
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_fertilizer_lines() {
        let report = report();
        let lines = report.fertilizer.data().unwrap().panel_lines();
        assert_eq!(lines[0], PanelLine::new("Crop", "Maize"));
        assert_eq!(
            lines[1],
            PanelLine::new("NPK 15-15-15", "200.0 kg/ha (at planting)")
        );
    }

    #[test]
    fn test_latest_observation_is_used() {
        let report = report();
        let lines = report.water_stress.data().unwrap().panel_lines();
        assert!(lines.contains(&PanelLine::new("Latest NDWI", "0.200 on 2024-06-15")));
    }

    #[test]
    fn test_render_text_has_header_and_all_panels() {
        let text = render_text(&report());
        assert!(text.contains("Status: Partial Data (2/4)"));
        assert!(text.contains("== Fertilizer Recommendations =="));
        assert!(text.contains("== Herbicide & Pesticide =="));
        assert!(text.contains("Service down"));
    }

    #[test]
    fn test_status_line() {
        assert_eq!(
            status_line(ReportStatus::Partial {
                succeeded: 3,
                total: 4
            }),
            "3 of 4 advisory datasets loaded"
        );
    }
}
