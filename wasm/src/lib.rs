//! WebAssembly module for Farmdesk
//!
//! Runs the boundary and form rules in the browser map view:
//! - Ring closing, area and overlap checks
//! - GeoJSON conversion for the farm payload
//! - Farm form validation before submission
//! - GPS trace recording with jitter filtering

use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;
use shared::{
    accept_trace_point, area_hectares, assess, check_nigerian_phone, is_searchable,
    validate_farm_draft, BoundaryRing, ExistingBoundary, FarmDraft, FieldErrors, LatLng,
    ReportStatus, MIN_BOUNDARY_POINTS,
};
use wasm_bindgen::prelude::*;

fn js_error(message: impl std::fmt::Display) -> JsValue {
    js_sys::Error::new(&message.to_string()).into()
}

fn console_warn(message: &str) {
    #[cfg(target_arch = "wasm32")]
    web_sys::console::warn_1(&JsValue::from_str(message));
    #[cfg(not(target_arch = "wasm32"))]
    let _ = message;
}

fn to_json<T: Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| e.to_string())
}

/// Parse `[{lat, lng}, ...]`; the ring is closed if it is not already
fn parse_ring(points_json: &str) -> Result<BoundaryRing, String> {
    serde_json::from_str(points_json).map_err(|e| format!("Invalid boundary: {}", e))
}

// ============================================================================
// Geometry
// ============================================================================

fn close_ring_json(points_json: &str) -> Result<String, String> {
    to_json(&parse_ring(points_json)?)
}

fn area_hectares_json(points_json: &str) -> Result<f64, String> {
    let ring = parse_ring(points_json)?;
    Ok(area_hectares(&ring).to_f64().unwrap_or(0.0))
}

fn assess_json(points_json: &str, existing_json: &str) -> Result<String, String> {
    let ring = parse_ring(points_json)?;
    let existing: Vec<ExistingBoundary> = serde_json::from_str(existing_json)
        .map_err(|e| format!("Invalid existing boundaries: {}", e))?;

    let assessment = assess(&ring, &existing);
    if let Some(conflict) = assessment.conflicting_farm_id {
        console_warn(&format!("Boundary overlaps farm {}", conflict));
    }
    to_json(&assessment)
}

fn geojson_json(points_json: &str) -> Result<String, String> {
    to_json(&parse_ring(points_json)?.to_geojson())
}

/// Close a drawn ring; returns the closed points as JSON
#[wasm_bindgen]
pub fn close_ring(points_json: &str) -> Result<String, JsValue> {
    close_ring_json(points_json).map_err(js_error)
}

/// Geodesic area in hectares, one decimal place
#[wasm_bindgen]
pub fn boundary_area_hectares(points_json: &str) -> Result<f64, JsValue> {
    area_hectares_json(points_json).map_err(js_error)
}

/// Area and overlap of a boundary against `[{farm_id, ring}, ...]`
#[wasm_bindgen]
pub fn assess_boundary(points_json: &str, existing_json: &str) -> Result<String, JsValue> {
    assess_json(points_json, existing_json).map_err(js_error)
}

/// GeoJSON MultiPolygon of a boundary
#[wasm_bindgen]
pub fn boundary_to_geojson(points_json: &str) -> Result<String, JsValue> {
    geojson_json(points_json).map_err(js_error)
}

// ============================================================================
// Forms
// ============================================================================

fn validate_farm_form_json(draft_json: &str) -> Result<String, String> {
    let draft: FarmDraft =
        serde_json::from_str(draft_json).map_err(|e| format!("Invalid farm form: {}", e))?;
    let errors = validate_farm_draft(&draft).err().unwrap_or_else(FieldErrors::new);
    to_json(&errors)
}

/// Per-field errors of a farm form; `{}` when the form can be submitted
#[wasm_bindgen]
pub fn validate_farm_form(draft_json: &str) -> Result<String, JsValue> {
    validate_farm_form_json(draft_json).map_err(js_error)
}

#[wasm_bindgen]
pub fn is_valid_phone_number(phone: &str) -> bool {
    check_nigerian_phone(phone).is_ok()
}

#[wasm_bindgen]
pub fn is_searchable_query(query: &str) -> bool {
    is_searchable(query)
}

/// Advisory header text for `succeeded` of `total` datasets
#[wasm_bindgen]
pub fn report_status_text(succeeded: usize, total: usize) -> String {
    ReportStatus::from_counts(succeeded, total).to_string()
}

// ============================================================================
// Trace
// ============================================================================

/// Records browser geolocation fixes while the agent walks a boundary
#[wasm_bindgen]
pub struct BoundaryTracer {
    points: Vec<LatLng>,
    min_distance_meters: f64,
}

#[wasm_bindgen]
impl BoundaryTracer {
    #[wasm_bindgen(constructor)]
    pub fn new(min_distance_meters: f64) -> BoundaryTracer {
        BoundaryTracer {
            points: Vec::new(),
            min_distance_meters,
        }
    }

    /// Record a fix; returns whether it was kept
    pub fn push(&mut self, lat: f64, lng: f64) -> bool {
        let next = LatLng::new(lat, lng);
        let accepted = accept_trace_point(self.points.last(), &next, self.min_distance_meters);
        if accepted {
            self.points.push(next);
        }
        accepted
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    /// Closed ring as JSON, or nothing when fewer than three points were kept
    pub fn finish(&self) -> Option<String> {
        if self.points.len() < MIN_BOUNDARY_POINTS {
            console_warn("Trace stopped with too few points");
            return None;
        }
        BoundaryRing::close(self.points.clone())
            .ok()
            .and_then(|ring| to_json(&ring).ok())
    }
}
