//! Farmer registration service

use std::path::Path;
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use shared::{is_nigerian_state, Farmer, FieldErrors, KycPhotoUpload, NewFarmer};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::external::FarmApi;

/// Largest KYC photo accepted before encoding
pub const MAX_PHOTO_BYTES: usize = 5 * 1024 * 1024;

#[derive(Clone)]
pub struct FarmerService {
    api: Arc<dyn FarmApi>,
}

impl FarmerService {
    pub fn new(api: Arc<dyn FarmApi>) -> Self {
        Self { api }
    }

    /// Register a new farmer
    pub async fn register(&self, farmer: &NewFarmer) -> AppResult<Farmer> {
        validate_new_farmer(farmer)?;

        let created = self.api.create_farmer(farmer).await?;
        tracing::info!(
            farmer_id = %created.id,
            photos = farmer.kyc_photos.len(),
            "Farmer registered"
        );
        Ok(created)
    }

    pub async fn update(&self, farmer_id: Uuid, farmer: &NewFarmer) -> AppResult<Farmer> {
        validate_new_farmer(farmer)?;

        let updated = self.api.update_farmer(farmer_id, farmer).await?;
        tracing::info!(%farmer_id, "Farmer updated");
        Ok(updated)
    }
}

/// Field errors of a registration form
pub fn validate_new_farmer(farmer: &NewFarmer) -> AppResult<()> {
    let mut errors = match farmer.validate() {
        Ok(()) => FieldErrors::new(),
        Err(e) => FieldErrors::from(&e),
    };

    let state = farmer.address.state.trim();
    if !state.is_empty() && !is_nigerian_state(state) {
        errors.add("address.state", "Unknown state");
    }

    errors.into_result().map_err(AppError::Validation)
}

/// Encode an image for upload with the registration form
pub fn encode_photo(filename: &str, bytes: &[u8]) -> AppResult<KycPhotoUpload> {
    let mut errors = FieldErrors::new();
    let content_type = content_type_for(filename);

    if bytes.is_empty() {
        errors.add("kyc_photos", "Photo is empty");
    } else if bytes.len() > MAX_PHOTO_BYTES {
        errors.add("kyc_photos", "Photo must be 5 MB or smaller");
    }
    if content_type.is_none() {
        errors.add("kyc_photos", "Photo must be a JPEG, PNG or WebP image");
    }
    errors.into_result().map_err(AppError::Validation)?;

    Ok(KycPhotoUpload {
        filename: filename.to_string(),
        content_type: content_type.unwrap_or_default().to_string(),
        data: BASE64.encode(bytes),
    })
}

/// Read and attach a photo from disk
pub async fn attach_photo(farmer: &mut NewFarmer, path: &Path) -> AppResult<()> {
    let bytes = tokio::fs::read(path).await?;
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("photo")
        .to_string();

    farmer.kyc_photos.push(encode_photo(&filename, &bytes)?);
    Ok(())
}

fn content_type_for(filename: &str) -> Option<&'static str> {
    let extension = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())?
        .to_ascii_lowercase();

    match extension.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::FarmerAddress;

    fn farmer() -> NewFarmer {
        NewFarmer {
            first_name: "Amina".to_string(),
            last_name: "Bello".to_string(),
            phone_number: "08031234567".to_string(),
            address: FarmerAddress {
                state: "Kaduna".to_string(),
                lga: "Zaria".to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_farmer() {
        assert!(validate_new_farmer(&farmer()).is_ok());
    }

    #[test]
    fn test_invalid_farmer_fields() {
        let mut input = farmer();
        input.phone_number = "12345".to_string();
        input.address.lga = String::new();
        input.address.state = "Atlantis".to_string();

        match validate_new_farmer(&input) {
            Err(AppError::Validation(errors)) => {
                assert!(errors.contains("phone_number"));
                assert!(errors.contains("address.lga"));
                assert_eq!(errors.get("address.state"), Some("Unknown state"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_encode_photo() {
        let photo = encode_photo("face.JPG", b"abc").unwrap();
        assert_eq!(photo.content_type, "image/jpeg");
        assert_eq!(photo.data, "YWJj");

        assert!(encode_photo("notes.txt", b"abc").is_err());
        assert!(encode_photo("face.png", b"").is_err());
    }
}
