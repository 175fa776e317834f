//! Common types used across the client

use serde::{Deserialize, Serialize};

/// A geographic position in decimal degrees
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// `geo` works in x/y order, i.e. longitude first
    pub fn to_coord(self) -> geo::Coord<f64> {
        geo::coord! { x: self.lng, y: self.lat }
    }

    pub fn from_coord(coord: geo::Coord<f64>) -> Self {
        Self {
            lat: coord.y,
            lng: coord.x,
        }
    }

    /// Great-circle distance in meters
    pub fn distance_meters(&self, other: &LatLng) -> f64 {
        use geo::HaversineDistance;
        geo::Point::from(self.to_coord()).haversine_distance(&geo::Point::from(other.to_coord()))
    }
}

/// Photo reference for KYC images
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotoReference {
    pub url: String,
    pub original_filename: Option<String>,
}

/// Image shown when a farmer photo is missing or fails to load
pub const PLACEHOLDER_PHOTO_URL: &str = "/images/farmer-placeholder.png";

/// Resolve a photo URL, falling back to the placeholder image
pub fn photo_url_or_placeholder(photo: Option<&PhotoReference>) -> &str {
    match photo {
        Some(p) if !p.url.trim().is_empty() => p.url.as_str(),
        _ => PLACEHOLDER_PHOTO_URL,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_for_missing_photo() {
        assert_eq!(photo_url_or_placeholder(None), PLACEHOLDER_PHOTO_URL);

        let blank = PhotoReference {
            url: "  ".to_string(),
            original_filename: None,
        };
        assert_eq!(photo_url_or_placeholder(Some(&blank)), PLACEHOLDER_PHOTO_URL);

        let real = PhotoReference {
            url: "https://cdn.example.com/kyc/1.jpg".to_string(),
            original_filename: Some("1.jpg".to_string()),
        };
        assert_eq!(
            photo_url_or_placeholder(Some(&real)),
            "https://cdn.example.com/kyc/1.jpg"
        );
    }

    #[test]
    fn test_distance_meters() {
        let a = LatLng::new(9.0765, 7.3986);
        let b = LatLng::new(9.0765, 7.3986);
        assert!(a.distance_meters(&b) < 1e-6);

        // ~111 m per 0.001 degree of latitude
        let c = LatLng::new(9.0775, 7.3986);
        let d = a.distance_meters(&c);
        assert!(d > 100.0 && d < 120.0);
    }
}
