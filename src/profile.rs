//! Public, unauthenticated technician profile pages.

use std::sync::Arc;

use serde::Serialize;
use tracing::warn;

use crate::backend::{Caller, DataStore, TechnicianFilter};
use crate::domain::{
    CompanyId, NewProfileView, PhotoRef, Technician, TechnicianId, DEFAULT_PRIMARY_COLOR,
    DEFAULT_SECONDARY_COLOR,
};
use crate::error::ServiceError;

/// Read model rendered on the customer-facing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicProfile {
    pub technician_id: TechnicianId,
    pub company_id: CompanyId,
    pub first_name: String,
    pub last_name: String,
    pub title: String,
    #[serde(rename = "photo_url")]
    pub photo: Option<PhotoRef>,
    pub bio: Option<String>,
    pub certifications: Vec<String>,
    pub years_experience: Option<u32>,
    pub company_name: Option<String>,
    pub logo_url: Option<String>,
    pub primary_color: String,
    pub secondary_color: String,
}

impl PublicProfile {
    fn compose(
        technician: Technician,
        company_name: Option<String>,
        logo_url: Option<String>,
        primary_color: String,
        secondary_color: String,
    ) -> Self {
        Self {
            technician_id: technician.id,
            company_id: technician.company_id,
            first_name: technician.first_name,
            last_name: technician.last_name,
            title: technician.title,
            photo: technician.photo,
            bio: technician.bio,
            certifications: technician.certifications.unwrap_or_default(),
            years_experience: technician.years_experience,
            company_name,
            logo_url,
            primary_color,
            secondary_color,
        }
    }

    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Resolves profiles as the anonymous role. Always reads fresh.
pub struct ProfileResolver<S: ?Sized> {
    store: Arc<S>,
}

impl<S> ProfileResolver<S>
where
    S: DataStore + ?Sized,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Inactive and unknown technicians are indistinguishable: both are
    /// not found.
    pub async fn resolve(&self, id: TechnicianId) -> Result<PublicProfile, ServiceError> {
        let technician = self
            .store
            .technician(Caller::Anonymous, TechnicianFilter::public(id))
            .await?
            .ok_or_else(|| ServiceError::not_found("technician", id))?;

        let company_name = self
            .store
            .company_by_id(Caller::Anonymous, technician.company_id)
            .await?
            .map(|company| company.company_name);

        let (logo_url, primary_color, secondary_color) = match self
            .store
            .settings_for(Caller::Anonymous, technician.company_id)
            .await?
        {
            Some(settings) => (
                settings.logo_url,
                settings.primary_color,
                settings.secondary_color,
            ),
            None => (
                None,
                DEFAULT_PRIMARY_COLOR.to_string(),
                DEFAULT_SECONDARY_COLOR.to_string(),
            ),
        };

        Ok(PublicProfile::compose(
            technician,
            company_name,
            logo_url,
            primary_color,
            secondary_color,
        ))
    }

    /// Best effort: a failed write is logged and swallowed.
    pub async fn record_view(&self, profile: &PublicProfile) {
        let view = NewProfileView {
            technician_id: profile.technician_id,
            company_id: profile.company_id,
        };
        if let Err(err) = self.store.insert_profile_view(Caller::Anonymous, view).await {
            warn!(technician = %profile.technician_id, error = %err, "profile view not recorded");
        }
    }
}
