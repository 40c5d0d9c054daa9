//! In-process backends used by the test suites and the offline demo.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::auth::{AuthError, AuthProvider, AuthUser, Session, SignUpOutcome};
use super::dispatch::{DispatchError, EmailMessage, MessageDispatcher, SmsMessage};
use super::photos::{PhotoStore, PhotoUpload};
use super::store::{Caller, DataStore, StoreError, TechnicianFilter};
use crate::domain::{
    AccessToken, BrandingChanges, Company, CompanyChanges, CompanyId, CompanySettings,
    NewCompany, NewProfileView, NewShareEvent, NewTechnician, PhotoRef, ProfileView, ShareEvent,
    Technician, TechnicianId, TechnicianPatch, UserId,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone)]
struct Account {
    user: AuthUser,
    password: String,
}

#[derive(Debug, Default)]
struct AuthState {
    accounts: HashMap<String, Account>,
    sessions: HashMap<AccessToken, AuthUser>,
}

/// Auth service double: accounts by lowercase email, opaque UUID tokens.
#[derive(Debug, Default, Clone)]
pub struct InMemoryAuth {
    state: Arc<Mutex<AuthState>>,
}

impl InMemoryAuth {
    fn issue(state: &mut AuthState, user: &AuthUser) -> Session {
        let token = AccessToken(Uuid::new_v4().to_string());
        state.sessions.insert(token.clone(), user.clone());
        Session {
            access_token: token,
            refresh_token: None,
            expires_at: None,
            user: user.clone(),
        }
    }

    /// Drops every issued session, as if all tokens expired at once.
    pub fn expire_sessions(&self) {
        lock(&self.state).sessions.clear();
    }
}

#[async_trait]
impl AuthProvider for InMemoryAuth {
    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, AuthError> {
        let key = email.trim().to_ascii_lowercase();
        if !key.contains('@') {
            return Err(AuthError::Rejected {
                status: 400,
                message: "Unable to validate email address: invalid format".to_string(),
            });
        }
        if password.len() < MIN_PASSWORD_LEN {
            return Err(AuthError::Rejected {
                status: 422,
                message: format!("Password should be at least {MIN_PASSWORD_LEN} characters."),
            });
        }

        let mut state = lock(&self.state);
        if state.accounts.contains_key(&key) {
            return Err(AuthError::AlreadyRegistered);
        }

        let user = AuthUser {
            id: UserId(Uuid::new_v4()),
            email: Some(key.clone()),
        };
        state.accounts.insert(
            key,
            Account {
                user: user.clone(),
                password: password.to_string(),
            },
        );
        let session = Self::issue(&mut state, &user);
        Ok(SignUpOutcome {
            user,
            session: Some(session),
        })
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        let mut state = lock(&self.state);
        let user = match state.accounts.get(&email.trim().to_ascii_lowercase()) {
            Some(account) if account.password == password => account.user.clone(),
            _ => return Err(AuthError::InvalidCredentials),
        };
        Ok(Self::issue(&mut state, &user))
    }

    async fn sign_out(&self, token: &AccessToken) -> Result<(), AuthError> {
        match lock(&self.state).sessions.remove(token) {
            Some(_) => Ok(()),
            None => Err(AuthError::SessionExpired),
        }
    }

    async fn get_session(&self, token: &AccessToken) -> Result<Option<Session>, AuthError> {
        Ok(lock(&self.state)
            .sessions
            .get(token)
            .map(|user| Session {
                access_token: token.clone(),
                refresh_token: None,
                expires_at: None,
                user: user.clone(),
            }))
    }
}

#[derive(Debug, Default)]
struct Tables {
    companies: Vec<Company>,
    settings: Vec<CompanySettings>,
    /// Insertion order; listings walk it backwards for newest first.
    technicians: Vec<Technician>,
    share_events: Vec<ShareEvent>,
    profile_views: Vec<ProfileView>,
    failing: HashSet<&'static str>,
}

impl Tables {
    fn check(&self, table: &'static str) -> Result<(), StoreError> {
        if self.failing.contains(table) {
            Err(StoreError::Rejected {
                table,
                status: 503,
                message: format!("{table} is unavailable"),
            })
        } else {
            Ok(())
        }
    }
}

/// Relational store double keeping each table as a vector.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryStore {
    /// Every later request touching `table` is rejected until restored.
    pub fn fail_table(&self, table: &'static str) {
        lock(&self.tables).failing.insert(table);
    }

    pub fn restore_table(&self, table: &'static str) {
        lock(&self.tables).failing.remove(table);
    }

    pub fn share_events(&self) -> Vec<ShareEvent> {
        lock(&self.tables).share_events.clone()
    }

    pub fn profile_views(&self) -> Vec<ProfileView> {
        lock(&self.tables).profile_views.clone()
    }

    pub fn companies(&self) -> Vec<Company> {
        lock(&self.tables).companies.clone()
    }

    /// Seeds a view with an explicit timestamp, for analytics fixtures.
    pub fn push_profile_view(&self, view: ProfileView) {
        lock(&self.tables).profile_views.push(view);
    }
}

#[async_trait]
impl DataStore for InMemoryStore {
    async fn insert_company(
        &self,
        _caller: Caller<'_>,
        company: NewCompany,
    ) -> Result<Company, StoreError> {
        let mut tables = lock(&self.tables);
        tables.check("companies")?;
        if tables
            .companies
            .iter()
            .any(|existing| existing.user_id == company.user_id)
        {
            return Err(StoreError::Rejected {
                table: "companies",
                status: 409,
                message: "duplicate key value violates unique constraint \"companies_user_id_key\""
                    .to_string(),
            });
        }
        let now = Utc::now();
        let row = Company {
            id: CompanyId(Uuid::new_v4()),
            user_id: company.user_id,
            company_name: company.company_name,
            email: company.email,
            phone: company.phone,
            created_at: now,
            updated_at: now,
        };
        tables.companies.push(row.clone());
        Ok(row)
    }

    async fn company_by_owner(
        &self,
        _caller: Caller<'_>,
        user: UserId,
    ) -> Result<Option<Company>, StoreError> {
        let tables = lock(&self.tables);
        tables.check("companies")?;
        Ok(tables
            .companies
            .iter()
            .find(|company| company.user_id == user)
            .cloned())
    }

    async fn company_by_id(
        &self,
        _caller: Caller<'_>,
        id: CompanyId,
    ) -> Result<Option<Company>, StoreError> {
        let tables = lock(&self.tables);
        tables.check("companies")?;
        Ok(tables
            .companies
            .iter()
            .find(|company| company.id == id)
            .cloned())
    }

    async fn update_company(
        &self,
        _caller: Caller<'_>,
        id: CompanyId,
        changes: CompanyChanges,
    ) -> Result<Company, StoreError> {
        let mut tables = lock(&self.tables);
        tables.check("companies")?;
        let company = tables
            .companies
            .iter_mut()
            .find(|company| company.id == id)
            .ok_or_else(|| StoreError::UnexpectedResponse {
                table: "companies",
                detail: "no row returned".to_string(),
            })?;
        company.company_name = changes.company_name;
        company.email = changes.email;
        company.phone = changes.phone;
        company.updated_at = Utc::now();
        Ok(company.clone())
    }

    async fn insert_settings(
        &self,
        _caller: Caller<'_>,
        settings: CompanySettings,
    ) -> Result<CompanySettings, StoreError> {
        let mut tables = lock(&self.tables);
        tables.check("company_settings")?;
        tables
            .settings
            .retain(|existing| existing.company_id != settings.company_id);
        tables.settings.push(settings.clone());
        Ok(settings)
    }

    async fn settings_for(
        &self,
        _caller: Caller<'_>,
        company: CompanyId,
    ) -> Result<Option<CompanySettings>, StoreError> {
        let tables = lock(&self.tables);
        tables.check("company_settings")?;
        Ok(tables
            .settings
            .iter()
            .find(|settings| settings.company_id == company)
            .cloned())
    }

    async fn update_settings(
        &self,
        _caller: Caller<'_>,
        company: CompanyId,
        changes: BrandingChanges,
    ) -> Result<CompanySettings, StoreError> {
        let mut tables = lock(&self.tables);
        tables.check("company_settings")?;
        let settings = tables
            .settings
            .iter_mut()
            .find(|settings| settings.company_id == company)
            .ok_or_else(|| StoreError::UnexpectedResponse {
                table: "company_settings",
                detail: "no row returned".to_string(),
            })?;
        settings.logo_url = changes.logo_url;
        settings.primary_color = changes.primary_color;
        settings.secondary_color = changes.secondary_color;
        Ok(settings.clone())
    }

    async fn technicians_for(
        &self,
        _caller: Caller<'_>,
        company: CompanyId,
    ) -> Result<Vec<Technician>, StoreError> {
        let tables = lock(&self.tables);
        tables.check("technicians")?;
        Ok(tables
            .technicians
            .iter()
            .rev()
            .filter(|technician| technician.company_id == company)
            .cloned()
            .collect())
    }

    async fn technician(
        &self,
        _caller: Caller<'_>,
        filter: TechnicianFilter,
    ) -> Result<Option<Technician>, StoreError> {
        let tables = lock(&self.tables);
        tables.check("technicians")?;
        Ok(tables
            .technicians
            .iter()
            .find(|technician| filter.matches(technician))
            .cloned())
    }

    async fn insert_technicians(
        &self,
        _caller: Caller<'_>,
        rows: Vec<NewTechnician>,
    ) -> Result<Vec<Technician>, StoreError> {
        let mut tables = lock(&self.tables);
        tables.check("technicians")?;
        let now = Utc::now();
        let inserted: Vec<Technician> = rows
            .into_iter()
            .map(|row| Technician {
                id: TechnicianId(Uuid::new_v4()),
                company_id: row.company_id,
                first_name: row.first_name,
                last_name: row.last_name,
                title: row.title,
                photo: row.photo,
                bio: row.bio,
                certifications: row.certifications,
                years_experience: row.years_experience,
                is_active: row.is_active,
                created_at: now,
                updated_at: now,
            })
            .collect();
        tables.technicians.extend(inserted.iter().cloned());
        Ok(inserted)
    }

    async fn update_technician(
        &self,
        _caller: Caller<'_>,
        id: TechnicianId,
        company: CompanyId,
        patch: TechnicianPatch,
    ) -> Result<Option<Technician>, StoreError> {
        let mut tables = lock(&self.tables);
        tables.check("technicians")?;
        let filter = TechnicianFilter::owned_by(id, company);
        Ok(tables
            .technicians
            .iter_mut()
            .find(|technician| filter.matches(technician))
            .map(|technician| {
                patch.apply(technician);
                technician.updated_at = Utc::now();
                technician.clone()
            }))
    }

    async fn delete_technician(
        &self,
        _caller: Caller<'_>,
        id: TechnicianId,
        company: CompanyId,
    ) -> Result<bool, StoreError> {
        let mut tables = lock(&self.tables);
        tables.check("technicians")?;
        let filter = TechnicianFilter::owned_by(id, company);
        let before = tables.technicians.len();
        tables
            .technicians
            .retain(|technician| !filter.matches(technician));
        Ok(tables.technicians.len() < before)
    }

    async fn delete_technicians_for(
        &self,
        _caller: Caller<'_>,
        company: CompanyId,
    ) -> Result<u64, StoreError> {
        let mut tables = lock(&self.tables);
        tables.check("technicians")?;
        let before = tables.technicians.len();
        tables
            .technicians
            .retain(|technician| technician.company_id != company);
        Ok((before - tables.technicians.len()) as u64)
    }

    async fn insert_share_event(
        &self,
        _caller: Caller<'_>,
        event: NewShareEvent,
    ) -> Result<ShareEvent, StoreError> {
        let mut tables = lock(&self.tables);
        tables.check("share_events")?;
        let row = ShareEvent {
            technician_id: event.technician_id,
            company_id: event.company_id,
            customer_name: event.customer_name,
            delivery_method: event.delivery_method,
            contact_info: event.contact_info,
            share_token: event.share_token,
            created_at: Utc::now(),
        };
        tables.share_events.push(row.clone());
        Ok(row)
    }

    async fn count_share_events(
        &self,
        _caller: Caller<'_>,
        company: CompanyId,
    ) -> Result<u64, StoreError> {
        let tables = lock(&self.tables);
        tables.check("share_events")?;
        Ok(tables
            .share_events
            .iter()
            .filter(|event| event.company_id == company)
            .count() as u64)
    }

    async fn insert_profile_view(
        &self,
        _caller: Caller<'_>,
        view: NewProfileView,
    ) -> Result<(), StoreError> {
        let mut tables = lock(&self.tables);
        tables.check("profile_views")?;
        tables.profile_views.push(ProfileView {
            technician_id: view.technician_id,
            company_id: view.company_id,
            viewed_at: Utc::now(),
        });
        Ok(())
    }

    async fn profile_views_for(
        &self,
        _caller: Caller<'_>,
        company: CompanyId,
    ) -> Result<Vec<ProfileView>, StoreError> {
        let tables = lock(&self.tables);
        tables.check("profile_views")?;
        let mut views: Vec<ProfileView> = tables
            .profile_views
            .iter()
            .filter(|view| view.company_id == company)
            .cloned()
            .collect();
        views.sort_by_key(|view| view.viewed_at);
        Ok(views)
    }

    async fn count_profile_views(
        &self,
        _caller: Caller<'_>,
        company: CompanyId,
    ) -> Result<u64, StoreError> {
        let tables = lock(&self.tables);
        tables.check("profile_views")?;
        Ok(tables
            .profile_views
            .iter()
            .filter(|view| view.company_id == company)
            .count() as u64)
    }
}

/// Dispatcher double that records what would have been sent.
#[derive(Debug, Default, Clone)]
pub struct RecordingDispatcher {
    emails: Arc<Mutex<Vec<EmailMessage>>>,
    texts: Arc<Mutex<Vec<SmsMessage>>>,
    failure: Arc<Mutex<Option<String>>>,
}

impl RecordingDispatcher {
    /// Makes every later dispatch fail with the given function error.
    pub fn fail_with(&self, message: impl Into<String>) {
        *lock(&self.failure) = Some(message.into());
    }

    pub fn emails(&self) -> Vec<EmailMessage> {
        lock(&self.emails).clone()
    }

    pub fn texts(&self) -> Vec<SmsMessage> {
        lock(&self.texts).clone()
    }

    fn check(&self) -> Result<(), DispatchError> {
        match lock(&self.failure).as_ref() {
            Some(message) => Err(DispatchError::Rejected {
                status: 500,
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl MessageDispatcher for RecordingDispatcher {
    async fn send_email(&self, message: &EmailMessage) -> Result<(), DispatchError> {
        self.check()?;
        lock(&self.emails).push(message.clone());
        Ok(())
    }

    async fn send_sms(&self, message: &SmsMessage) -> Result<(), DispatchError> {
        self.check()?;
        lock(&self.texts).push(message.clone());
        Ok(())
    }
}

/// Photo store double keyed by the generated reference.
#[derive(Debug, Default, Clone)]
pub struct InMemoryPhotoStore {
    objects: Arc<Mutex<HashMap<PhotoRef, PhotoUpload>>>,
}

impl InMemoryPhotoStore {
    pub fn get(&self, photo: &PhotoRef) -> Option<PhotoUpload> {
        lock(&self.objects).get(photo).cloned()
    }
}

#[async_trait]
impl PhotoStore for InMemoryPhotoStore {
    async fn put(
        &self,
        _caller: Caller<'_>,
        company: CompanyId,
        technician: TechnicianId,
        upload: PhotoUpload,
    ) -> Result<PhotoRef, StoreError> {
        let photo = PhotoRef(format!(
            "http://photos.localhost/{}",
            super::photos::RemotePhotoStore::object_path(company, technician, upload.extension())
        ));
        lock(&self.objects).insert(photo.clone(), upload);
        Ok(photo)
    }
}
