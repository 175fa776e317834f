//! Farm record composer
//!
//! Holds the farm form while the agent fills it in, checks the captured
//! boundary against existing farms, and submits it as a create or an update.

use std::sync::Arc;

use shared::{
    assess, compose_farm_payload, validate_farm_draft, BoundaryRing, Farm, FarmDraft,
    FieldErrors, GeometryAssessment,
};

use crate::error::{AppError, AppResult};
use crate::external::FarmApi;
use crate::services::drafts::{farm_draft_key, DraftStore};

pub struct FarmComposer {
    api: Arc<dyn FarmApi>,
    drafts: Option<DraftStore>,
    draft: FarmDraft,
}

impl FarmComposer {
    pub fn new(api: Arc<dyn FarmApi>, draft: FarmDraft) -> Self {
        Self {
            api,
            drafts: None,
            draft,
        }
    }

    /// Persist the draft locally between edits
    pub fn with_draft_store(mut self, drafts: DraftStore) -> Self {
        self.drafts = Some(drafts);
        self
    }

    /// Continue a draft saved earlier, or start from `fallback`
    pub async fn resume(
        api: Arc<dyn FarmApi>,
        drafts: DraftStore,
        fallback: FarmDraft,
    ) -> AppResult<Self> {
        let key = farm_draft_key(fallback.farm_id, fallback.farmer_id);
        let draft = drafts.load(&key).await?.unwrap_or(fallback);
        Ok(Self::new(api, draft).with_draft_store(drafts))
    }

    pub fn draft(&self) -> &FarmDraft {
        &self.draft
    }

    pub fn update_draft(&mut self, edit: impl FnOnce(&mut FarmDraft)) {
        edit(&mut self.draft);
    }

    pub fn set_geometry(&mut self, ring: BoundaryRing) {
        self.draft.geometry = Some(ring);
    }

    /// Per-field errors of the current form
    pub fn validate(&self) -> Result<(), FieldErrors> {
        validate_farm_draft(&self.draft)
    }

    /// Area and overlap of the captured boundary
    ///
    /// Overlap is a warning for the agent; it does not block submission.
    /// When editing, the farm's own stored boundary is ignored.
    pub async fn assess(&self) -> AppResult<Option<GeometryAssessment>> {
        let Some(ring) = self.draft.geometry.as_ref() else {
            return Ok(None);
        };

        let mut existing = self.api.existing_boundaries().await?;
        if let Some(farm_id) = self.draft.farm_id {
            existing.retain(|boundary| boundary.farm_id != farm_id);
        }

        let assessment = assess(ring, &existing);
        if let Some(conflict) = assessment.conflicting_farm_id {
            tracing::warn!(
                conflicting_farm_id = %conflict,
                "Captured boundary overlaps an existing farm"
            );
        }
        Ok(Some(assessment))
    }

    pub async fn save_draft(&self) -> AppResult<()> {
        if let Some(drafts) = &self.drafts {
            drafts.save(&self.draft_key(), &self.draft).await?;
        }
        Ok(())
    }

    /// Create or update the farm
    ///
    /// The draft is kept on any failure so the agent can correct it and
    /// submit again. On success the stored draft is removed.
    pub async fn submit(&mut self) -> AppResult<Farm> {
        let payload = compose_farm_payload(&self.draft).map_err(AppError::Validation)?;

        let result = match self.draft.farm_id {
            Some(farm_id) => self.api.update_farm(farm_id, &payload).await,
            None => self.api.create_farm(&payload).await,
        };

        let farm = match result {
            Ok(farm) => farm,
            Err(e) => {
                tracing::warn!(error = %e, edit = self.draft.is_edit(), "Farm submission failed");
                return Err(e);
            }
        };

        tracing::info!(
            farm_id = %farm.id,
            farmer_id = %farm.farmer_id,
            area_hectares = %farm.calculated_area,
            "Farm saved"
        );

        if let Some(drafts) = &self.drafts {
            if let Err(e) = drafts.discard(&self.draft_key()).await {
                tracing::warn!(error = %e, "Failed to remove submitted draft");
            }
        }
        self.draft = FarmDraft {
            farmer_id: self.draft.farmer_id,
            ..Default::default()
        };

        Ok(farm)
    }

    fn draft_key(&self) -> String {
        farm_draft_key(self.draft.farm_id, self.draft.farmer_id)
    }
}
