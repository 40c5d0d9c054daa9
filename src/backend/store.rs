use async_trait::async_trait;

use crate::domain::{
    AccessToken, BrandingChanges, Company, CompanyChanges, CompanyId, CompanySettings,
    NewCompany, NewProfileView, NewShareEvent, NewTechnician, ProfileView, ShareEvent,
    Technician, TechnicianId, TechnicianPatch, UserId,
};

/// Identity a data store request runs as. Row level security in the backend
/// evaluates against it.
#[derive(Debug, Clone, Copy)]
pub enum Caller<'a> {
    Anonymous,
    User(&'a AccessToken),
}

impl<'a> Caller<'a> {
    pub fn token(self) -> Option<&'a AccessToken> {
        match self {
            Caller::Anonymous => None,
            Caller::User(token) => Some(token),
        }
    }
}

/// Row selector for a single technician.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TechnicianFilter {
    pub id: TechnicianId,
    pub company: Option<CompanyId>,
    pub active_only: bool,
}

impl TechnicianFilter {
    pub fn owned_by(id: TechnicianId, company: CompanyId) -> Self {
        Self {
            id,
            company: Some(company),
            active_only: false,
        }
    }

    pub fn public(id: TechnicianId) -> Self {
        Self {
            id,
            company: None,
            active_only: true,
        }
    }

    pub fn matches(&self, technician: &Technician) -> bool {
        technician.id == self.id
            && self
                .company
                .map_or(true, |company| technician.company_id == company)
            && (!self.active_only || technician.is_active)
    }
}

/// Typed access to the `companies`, `company_settings`, `technicians`,
/// `share_events` and `profile_views` tables.
#[async_trait]
pub trait DataStore: Send + Sync {
    async fn insert_company(
        &self,
        caller: Caller<'_>,
        company: NewCompany,
    ) -> Result<Company, StoreError>;
    async fn company_by_owner(
        &self,
        caller: Caller<'_>,
        user: UserId,
    ) -> Result<Option<Company>, StoreError>;
    async fn company_by_id(
        &self,
        caller: Caller<'_>,
        id: CompanyId,
    ) -> Result<Option<Company>, StoreError>;
    async fn update_company(
        &self,
        caller: Caller<'_>,
        id: CompanyId,
        changes: CompanyChanges,
    ) -> Result<Company, StoreError>;

    async fn insert_settings(
        &self,
        caller: Caller<'_>,
        settings: CompanySettings,
    ) -> Result<CompanySettings, StoreError>;
    async fn settings_for(
        &self,
        caller: Caller<'_>,
        company: CompanyId,
    ) -> Result<Option<CompanySettings>, StoreError>;
    async fn update_settings(
        &self,
        caller: Caller<'_>,
        company: CompanyId,
        changes: BrandingChanges,
    ) -> Result<CompanySettings, StoreError>;

    /// Newest first.
    async fn technicians_for(
        &self,
        caller: Caller<'_>,
        company: CompanyId,
    ) -> Result<Vec<Technician>, StoreError>;
    async fn technician(
        &self,
        caller: Caller<'_>,
        filter: TechnicianFilter,
    ) -> Result<Option<Technician>, StoreError>;
    async fn insert_technicians(
        &self,
        caller: Caller<'_>,
        rows: Vec<NewTechnician>,
    ) -> Result<Vec<Technician>, StoreError>;
    /// Returns `None` when no row matched both id and company.
    async fn update_technician(
        &self,
        caller: Caller<'_>,
        id: TechnicianId,
        company: CompanyId,
        patch: TechnicianPatch,
    ) -> Result<Option<Technician>, StoreError>;
    async fn delete_technician(
        &self,
        caller: Caller<'_>,
        id: TechnicianId,
        company: CompanyId,
    ) -> Result<bool, StoreError>;
    async fn delete_technicians_for(
        &self,
        caller: Caller<'_>,
        company: CompanyId,
    ) -> Result<u64, StoreError>;

    async fn insert_share_event(
        &self,
        caller: Caller<'_>,
        event: NewShareEvent,
    ) -> Result<ShareEvent, StoreError>;
    async fn count_share_events(
        &self,
        caller: Caller<'_>,
        company: CompanyId,
    ) -> Result<u64, StoreError>;

    async fn insert_profile_view(
        &self,
        caller: Caller<'_>,
        view: NewProfileView,
    ) -> Result<(), StoreError>;
    /// Oldest first.
    async fn profile_views_for(
        &self,
        caller: Caller<'_>,
        company: CompanyId,
    ) -> Result<Vec<ProfileView>, StoreError>;
    async fn count_profile_views(
        &self,
        caller: Caller<'_>,
        company: CompanyId,
    ) -> Result<u64, StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{table} request rejected with status {status}: {message}")]
    Rejected {
        table: &'static str,
        status: u16,
        message: String,
    },
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected response from {table}: {detail}")]
    UnexpectedResponse { table: &'static str, detail: String },
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
