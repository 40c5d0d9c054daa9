use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use super::cache::RosterCache;
use super::demo::demo_technicians;
use crate::backend::{DataStore, PhotoStore, PhotoUpload, StoreError, TechnicianFilter};
use crate::config::RosterConfig;
use crate::domain::{
    BrandingChanges, Company, CompanyChanges, CompanySettings, ProfileView, Technician,
    TechnicianId, TechnicianPatch,
};
use crate::error::ServiceError;
use crate::session::TenantContext;
use crate::validation::{
    require_confirmation, validate_branding, validate_company, validate_technician,
    TechnicianDraft, ValidationError,
};

/// Company-scoped access to technicians, branding and event history. Every
/// read and write is filtered by the context's company id.
pub struct TenantRepository<S: ?Sized> {
    store: Arc<S>,
    photos: Arc<dyn PhotoStore>,
    roster: RosterCache,
    photo_max_bytes: usize,
}

impl<S> TenantRepository<S>
where
    S: DataStore + ?Sized,
{
    pub fn new(
        store: Arc<S>,
        photos: Arc<dyn PhotoStore>,
        roster: RosterConfig,
        photo_max_bytes: usize,
    ) -> Self {
        Self {
            store,
            photos,
            roster: RosterCache::new(roster.cache_ttl),
            photo_max_bytes,
        }
    }

    /// Newest first. Served from the roster cache while it is fresh.
    pub async fn list_technicians(
        &self,
        ctx: &TenantContext,
    ) -> Result<Vec<Technician>, ServiceError> {
        let company = ctx.company_id();
        if let Some(cached) = self.roster.fresh(company, Instant::now()) {
            debug!(%company, "roster served from cache");
            return Ok(cached);
        }

        let generation = self.roster.generation(company);
        let technicians = self.store.technicians_for(ctx.caller(), company).await?;
        if !self
            .roster
            .store(company, generation, technicians.clone(), Instant::now())
        {
            debug!(%company, "roster changed during fetch, not cached");
        }
        Ok(technicians)
    }

    pub async fn get_technician(
        &self,
        ctx: &TenantContext,
        id: TechnicianId,
    ) -> Result<Technician, ServiceError> {
        self.store
            .technician(ctx.caller(), TechnicianFilter::owned_by(id, ctx.company_id()))
            .await?
            .ok_or_else(|| ServiceError::not_found("technician", id))
    }

    pub async fn create_technician(
        &self,
        ctx: &TenantContext,
        draft: TechnicianDraft,
    ) -> Result<Technician, ServiceError> {
        let valid = validate_technician(draft)?;
        let company = ctx.company_id();

        let created = self
            .store
            .insert_technicians(ctx.caller(), vec![valid.into_new(company)])
            .await?
            .into_iter()
            .next()
            .ok_or(StoreError::UnexpectedResponse {
                table: "technicians",
                detail: "insert returned no row".to_string(),
            })?;

        self.roster.invalidate(company);
        info!(%company, technician = %created.id, "technician created");
        Ok(created)
    }

    pub async fn update_technician(
        &self,
        ctx: &TenantContext,
        id: TechnicianId,
        draft: TechnicianDraft,
    ) -> Result<Technician, ServiceError> {
        let valid = validate_technician(draft)?;
        self.patch(ctx, id, valid.into_patch()).await
    }

    /// Permanent; the caller must have confirmed.
    pub async fn delete_technician(
        &self,
        ctx: &TenantContext,
        id: TechnicianId,
        confirmed: bool,
    ) -> Result<(), ServiceError> {
        require_confirmation(confirmed, "deleting a technician")?;
        let company = ctx.company_id();

        let deleted = self
            .store
            .delete_technician(ctx.caller(), id, company)
            .await?;
        self.roster.invalidate(company);

        if !deleted {
            return Err(ServiceError::not_found("technician", id));
        }
        info!(%company, technician = %id, "technician deleted");
        Ok(())
    }

    pub async fn set_technician_active(
        &self,
        ctx: &TenantContext,
        id: TechnicianId,
        active: bool,
    ) -> Result<Technician, ServiceError> {
        self.patch(ctx, id, TechnicianPatch::active(active)).await
    }

    /// Stores the image in the photo store; the row keeps only the reference.
    pub async fn set_technician_photo(
        &self,
        ctx: &TenantContext,
        id: TechnicianId,
        upload: PhotoUpload,
    ) -> Result<Technician, ServiceError> {
        if upload.content_type.type_() != mime::IMAGE {
            return Err(ValidationError::UnsupportedPhotoType(upload.content_type.to_string()).into());
        }
        if upload.bytes.is_empty() {
            return Err(ValidationError::EmptyPhoto.into());
        }
        if upload.bytes.len() > self.photo_max_bytes {
            return Err(ValidationError::PhotoTooLarge {
                size: upload.bytes.len(),
                limit: self.photo_max_bytes,
            }
            .into());
        }

        self.get_technician(ctx, id).await?;
        let photo = self
            .photos
            .put(ctx.caller(), ctx.company_id(), id, upload)
            .await?;
        self.patch(ctx, id, TechnicianPatch::photo(photo)).await
    }

    async fn patch(
        &self,
        ctx: &TenantContext,
        id: TechnicianId,
        patch: TechnicianPatch,
    ) -> Result<Technician, ServiceError> {
        let company = ctx.company_id();
        let updated = self
            .store
            .update_technician(ctx.caller(), id, company, patch)
            .await?;
        self.roster.invalidate(company);
        updated.ok_or_else(|| ServiceError::not_found("technician", id))
    }

    /// Missing settings are created with the default colors on first read.
    pub async fn get_company_settings(
        &self,
        ctx: &TenantContext,
    ) -> Result<CompanySettings, ServiceError> {
        let company = ctx.company_id();
        if let Some(settings) = self.store.settings_for(ctx.caller(), company).await? {
            return Ok(settings);
        }

        warn!(%company, "company settings missing, creating defaults");
        let created = self
            .store
            .insert_settings(ctx.caller(), CompanySettings::defaults_for(company))
            .await?;
        Ok(created)
    }

    pub async fn update_company_settings(
        &self,
        ctx: &TenantContext,
        changes: BrandingChanges,
    ) -> Result<CompanySettings, ServiceError> {
        let changes = validate_branding(changes)?;
        self.get_company_settings(ctx).await?;
        let updated = self
            .store
            .update_settings(ctx.caller(), ctx.company_id(), changes)
            .await?;
        Ok(updated)
    }

    pub async fn update_company(
        &self,
        ctx: &TenantContext,
        changes: CompanyChanges,
    ) -> Result<Company, ServiceError> {
        let changes = validate_company(changes)?;
        let updated = self
            .store
            .update_company(ctx.caller(), ctx.company_id(), changes)
            .await?;
        info!(company = %updated.id, "company info updated");
        Ok(updated)
    }

    /// Inserts the sample roster in one request.
    pub async fn seed_demo_technicians(
        &self,
        ctx: &TenantContext,
    ) -> Result<Vec<Technician>, ServiceError> {
        let company = ctx.company_id();
        let inserted = self
            .store
            .insert_technicians(ctx.caller(), demo_technicians(company))
            .await?;
        self.roster.invalidate(company);
        info!(%company, count = inserted.len(), "demo technicians added");
        Ok(inserted)
    }

    /// Removes every technician of the company; returns how many went.
    pub async fn clear_technicians(
        &self,
        ctx: &TenantContext,
        confirmed: bool,
    ) -> Result<u64, ServiceError> {
        require_confirmation(confirmed, "removing all technicians")?;
        let company = ctx.company_id();
        let removed = self
            .store
            .delete_technicians_for(ctx.caller(), company)
            .await?;
        self.roster.invalidate(company);
        info!(%company, removed, "technicians cleared");
        Ok(removed)
    }

    /// Oldest first.
    pub async fn profile_views(
        &self,
        ctx: &TenantContext,
    ) -> Result<Vec<ProfileView>, ServiceError> {
        Ok(self
            .store
            .profile_views_for(ctx.caller(), ctx.company_id())
            .await?)
    }

    pub async fn count_profile_views(&self, ctx: &TenantContext) -> Result<u64, ServiceError> {
        Ok(self
            .store
            .count_profile_views(ctx.caller(), ctx.company_id())
            .await?)
    }

    pub async fn count_share_events(&self, ctx: &TenantContext) -> Result<u64, ServiceError> {
        Ok(self
            .store
            .count_share_events(ctx.caller(), ctx.company_id())
            .await?)
    }
}
