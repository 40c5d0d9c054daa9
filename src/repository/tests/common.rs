use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::backend::{
    Caller, DataStore, InMemoryAuth, InMemoryPhotoStore, InMemoryStore, StoreError,
    TechnicianFilter,
};
use crate::domain::{
    BrandingChanges, Company, CompanyChanges, CompanyId, CompanySettings, NewCompany,
    NewProfileView, NewShareEvent, NewTechnician, ProfileView, ShareEvent, Technician,
    TechnicianId, TechnicianPatch, UserId,
};
use crate::config::RosterConfig;
use crate::repository::TenantRepository;
use crate::session::{SessionStore, TenantContext};
use crate::validation::{TechnicianDraft, YearsInput};

pub(super) struct Fixture {
    pub store: Arc<InMemoryStore>,
    pub photos: Arc<InMemoryPhotoStore>,
    pub repository: TenantRepository<InMemoryStore>,
    pub auth: Arc<InMemoryAuth>,
}

pub(super) fn fixture() -> Fixture {
    fixture_with_ttl(Duration::from_secs(30))
}

pub(super) fn fixture_with_ttl(cache_ttl: Duration) -> Fixture {
    let store = Arc::new(InMemoryStore::default());
    let photos = Arc::new(InMemoryPhotoStore::default());
    let repository = TenantRepository::new(
        store.clone(),
        photos.clone(),
        RosterConfig { cache_ttl },
        1024,
    );
    Fixture {
        store,
        photos,
        repository,
        auth: Arc::new(InMemoryAuth::default()),
    }
}

impl Fixture {
    pub(super) async fn tenant(&self, email: &str, company: &str) -> TenantContext {
        let sessions = SessionStore::new(self.auth.clone(), self.store.clone());
        sessions
            .sign_up(email, "hunter22", company, None)
            .await
            .expect("sign up succeeds");
        sessions.context().expect("tenant resolved")
    }
}

pub(super) fn draft(first: &str, last: &str, title: &str) -> TechnicianDraft {
    TechnicianDraft {
        first_name: first.to_string(),
        last_name: last.to_string(),
        title: title.to_string(),
        photo_url: None,
        bio: Some("Keeps furnaces humming.".to_string()),
        certifications: vec!["NATE Certified".to_string()],
        years_experience: Some(YearsInput::Number(6)),
        is_active: true,
    }
}

/// Delegates to an [`InMemoryStore`]. Once armed, the next roster read holds
/// its rows until released, so a write can land while the read is in flight.
pub(super) struct HeldRosterStore {
    inner: Arc<InMemoryStore>,
    armed: AtomicBool,
    pub reached: Notify,
    pub release: Notify,
}

impl HeldRosterStore {
    pub(super) fn new(inner: Arc<InMemoryStore>) -> Self {
        Self {
            inner,
            armed: AtomicBool::new(false),
            reached: Notify::new(),
            release: Notify::new(),
        }
    }

    pub(super) fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl DataStore for HeldRosterStore {
    async fn insert_company(
        &self,
        caller: Caller<'_>,
        company: NewCompany,
    ) -> Result<Company, StoreError> {
        self.inner.insert_company(caller, company).await
    }

    async fn company_by_owner(
        &self,
        caller: Caller<'_>,
        user: UserId,
    ) -> Result<Option<Company>, StoreError> {
        self.inner.company_by_owner(caller, user).await
    }

    async fn company_by_id(
        &self,
        caller: Caller<'_>,
        id: CompanyId,
    ) -> Result<Option<Company>, StoreError> {
        self.inner.company_by_id(caller, id).await
    }

    async fn update_company(
        &self,
        caller: Caller<'_>,
        id: CompanyId,
        changes: CompanyChanges,
    ) -> Result<Company, StoreError> {
        self.inner.update_company(caller, id, changes).await
    }

    async fn insert_settings(
        &self,
        caller: Caller<'_>,
        settings: CompanySettings,
    ) -> Result<CompanySettings, StoreError> {
        self.inner.insert_settings(caller, settings).await
    }

    async fn settings_for(
        &self,
        caller: Caller<'_>,
        company: CompanyId,
    ) -> Result<Option<CompanySettings>, StoreError> {
        self.inner.settings_for(caller, company).await
    }

    async fn update_settings(
        &self,
        caller: Caller<'_>,
        company: CompanyId,
        changes: BrandingChanges,
    ) -> Result<CompanySettings, StoreError> {
        self.inner.update_settings(caller, company, changes).await
    }

    async fn technicians_for(
        &self,
        caller: Caller<'_>,
        company: CompanyId,
    ) -> Result<Vec<Technician>, StoreError> {
        let rows = self.inner.technicians_for(caller, company).await?;
        if self.armed.swap(false, Ordering::SeqCst) {
            self.reached.notify_one();
            self.release.notified().await;
        }
        Ok(rows)
    }

    async fn technician(
        &self,
        caller: Caller<'_>,
        filter: TechnicianFilter,
    ) -> Result<Option<Technician>, StoreError> {
        self.inner.technician(caller, filter).await
    }

    async fn insert_technicians(
        &self,
        caller: Caller<'_>,
        rows: Vec<NewTechnician>,
    ) -> Result<Vec<Technician>, StoreError> {
        self.inner.insert_technicians(caller, rows).await
    }

    async fn update_technician(
        &self,
        caller: Caller<'_>,
        id: TechnicianId,
        company: CompanyId,
        patch: TechnicianPatch,
    ) -> Result<Option<Technician>, StoreError> {
        self.inner.update_technician(caller, id, company, patch).await
    }

    async fn delete_technician(
        &self,
        caller: Caller<'_>,
        id: TechnicianId,
        company: CompanyId,
    ) -> Result<bool, StoreError> {
        self.inner.delete_technician(caller, id, company).await
    }

    async fn delete_technicians_for(
        &self,
        caller: Caller<'_>,
        company: CompanyId,
    ) -> Result<u64, StoreError> {
        self.inner.delete_technicians_for(caller, company).await
    }

    async fn insert_share_event(
        &self,
        caller: Caller<'_>,
        event: NewShareEvent,
    ) -> Result<ShareEvent, StoreError> {
        self.inner.insert_share_event(caller, event).await
    }

    async fn count_share_events(
        &self,
        caller: Caller<'_>,
        company: CompanyId,
    ) -> Result<u64, StoreError> {
        self.inner.count_share_events(caller, company).await
    }

    async fn insert_profile_view(
        &self,
        caller: Caller<'_>,
        view: NewProfileView,
    ) -> Result<(), StoreError> {
        self.inner.insert_profile_view(caller, view).await
    }

    async fn profile_views_for(
        &self,
        caller: Caller<'_>,
        company: CompanyId,
    ) -> Result<Vec<ProfileView>, StoreError> {
        self.inner.profile_views_for(caller, company).await
    }

    async fn count_profile_views(
        &self,
        caller: Caller<'_>,
        company: CompanyId,
    ) -> Result<u64, StoreError> {
        self.inner.count_profile_views(caller, company).await
    }
}
