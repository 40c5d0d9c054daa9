//! Authenticated identity and the tenant (company) it owns.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};

use crate::backend::{AuthError, AuthProvider, AuthUser, Caller, DataStore, Session};
use crate::domain::{AccessToken, Company, CompanyId, CompanySettings, NewCompany};
use crate::error::ServiceError;
use crate::validation::{optional, required};

/// Who is asking and which company they act for. Every tenant-scoped
/// operation takes one of these explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantContext {
    pub user: AuthUser,
    pub company: Company,
    pub access_token: AccessToken,
}

impl TenantContext {
    pub fn company_id(&self) -> CompanyId {
        self.company.id
    }

    pub fn caller(&self) -> Caller<'_> {
        Caller::User(&self.access_token)
    }
}

/// Observable state of a [`SessionStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub user: Option<AuthUser>,
    pub session: Option<Session>,
    pub company: Option<Company>,
    pub loading: bool,
}

impl SessionSnapshot {
    fn loading() -> Self {
        Self {
            user: None,
            session: None,
            company: None,
            loading: true,
        }
    }

    fn signed_out() -> Self {
        Self {
            loading: false,
            ..Self::loading()
        }
    }

    pub fn context(&self) -> Option<TenantContext> {
        match (&self.user, &self.session, &self.company) {
            (Some(user), Some(session), Some(company)) => Some(TenantContext {
                user: user.clone(),
                company: company.clone(),
                access_token: session.access_token.clone(),
            }),
            _ => None,
        }
    }
}

/// Holds one client's session and publishes every change to subscribers.
pub struct SessionStore<A: ?Sized, S: ?Sized> {
    auth: Arc<A>,
    store: Arc<S>,
    state: watch::Sender<SessionSnapshot>,
}

impl<A, S> SessionStore<A, S>
where
    A: AuthProvider + ?Sized,
    S: DataStore + ?Sized,
{
    pub fn new(auth: Arc<A>, store: Arc<S>) -> Self {
        let (state, _) = watch::channel(SessionSnapshot::loading());
        Self { auth, store, state }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    pub fn context(&self) -> Option<TenantContext> {
        self.state.borrow().context()
    }

    /// Restores a previous session if a token is supplied. Loading stays
    /// true until this completes, whatever the outcome.
    pub async fn initialize(
        &self,
        token: Option<AccessToken>,
    ) -> Result<SessionSnapshot, ServiceError> {
        let Some(token) = token else {
            self.state.send_replace(SessionSnapshot::signed_out());
            return Ok(self.snapshot());
        };

        let restored = self.restore(&token).await;
        match restored {
            Ok(snapshot) => {
                self.state.send_replace(snapshot.clone());
                Ok(snapshot)
            }
            Err(err) => {
                self.state.send_replace(SessionSnapshot::signed_out());
                Err(err)
            }
        }
    }

    async fn restore(&self, token: &AccessToken) -> Result<SessionSnapshot, ServiceError> {
        let Some(session) = self.auth.get_session(token).await? else {
            return Ok(SessionSnapshot::signed_out());
        };
        let company = self
            .store
            .company_by_owner(Caller::User(token), session.user.id)
            .await?;
        Ok(SessionSnapshot {
            user: Some(session.user.clone()),
            session: Some(session),
            company,
            loading: false,
        })
    }

    /// Creates the identity, then the company, then its default branding.
    /// A failure after the identity exists leaves it in place.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        company_name: &str,
        phone: Option<&str>,
    ) -> Result<SessionSnapshot, ServiceError> {
        let company_name = required(company_name, "company name")?;
        let email = required(email, "email")?;

        let outcome = self.auth.sign_up(&email, password).await?;
        let token = outcome
            .session
            .as_ref()
            .map(|session| session.access_token.clone());
        let caller = token.as_ref().map_or(Caller::Anonymous, Caller::User);

        let company = self
            .store
            .insert_company(
                caller,
                NewCompany {
                    user_id: outcome.user.id,
                    company_name,
                    email,
                    phone: optional(phone),
                },
            )
            .await
            .map_err(|err| {
                warn!(user = %outcome.user.id, error = %err, "company insert failed after sign up");
                err
            })?;

        self.store
            .insert_settings(caller, CompanySettings::defaults_for(company.id))
            .await
            .map_err(|err| {
                warn!(company = %company.id, error = %err, "default settings insert failed");
                err
            })?;

        info!(company = %company.id, "company signed up");

        let snapshot = SessionSnapshot {
            user: Some(outcome.user),
            session: outcome.session,
            company: Some(company),
            loading: false,
        };
        self.state.send_replace(snapshot.clone());
        Ok(snapshot)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<SessionSnapshot, ServiceError> {
        let session = self
            .auth
            .sign_in_with_password(email.trim(), password)
            .await?;
        let company = self
            .store
            .company_by_owner(Caller::User(&session.access_token), session.user.id)
            .await?;

        let snapshot = SessionSnapshot {
            user: Some(session.user.clone()),
            session: Some(session),
            company,
            loading: false,
        };
        self.state.send_replace(snapshot.clone());
        Ok(snapshot)
    }

    /// Clears local state first; an already invalid token is not an error.
    pub async fn sign_out(&self) -> Result<(), ServiceError> {
        let previous = self.state.send_replace(SessionSnapshot::signed_out());
        let Some(session) = previous.session else {
            return Ok(());
        };

        match self.auth.sign_out(&session.access_token).await {
            Ok(()) | Err(AuthError::SessionExpired) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// Per-request resolution used by the HTTP layer: token to user to company.
pub async fn resolve_tenant<A, S>(
    auth: &A,
    store: &S,
    token: AccessToken,
) -> Result<TenantContext, ServiceError>
where
    A: AuthProvider + ?Sized,
    S: DataStore + ?Sized,
{
    let session = auth
        .get_session(&token)
        .await?
        .ok_or(AuthError::SessionExpired)?;
    let company = store
        .company_by_owner(Caller::User(&token), session.user.id)
        .await?
        .ok_or_else(|| ServiceError::not_found("company for user", session.user.id))?;

    Ok(TenantContext {
        user: session.user,
        company,
        access_token: token,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{InMemoryAuth, InMemoryStore};
    use crate::domain::{DEFAULT_PRIMARY_COLOR, DEFAULT_SECONDARY_COLOR};
    use crate::error::ErrorKind;

    fn session_store() -> (SessionStore<InMemoryAuth, InMemoryStore>, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::default());
        (
            SessionStore::new(Arc::new(InMemoryAuth::default()), store.clone()),
            store,
        )
    }

    #[tokio::test]
    async fn sign_up_creates_company_and_default_branding() {
        let (sessions, store) = session_store();
        let snapshot = sessions
            .sign_up("owner@acme.test", "hunter22", "Acme HVAC", Some(" "))
            .await
            .expect("sign up succeeds");

        let company = snapshot.company.expect("company resolved");
        assert_eq!(company.company_name, "Acme HVAC");
        assert_eq!(company.phone, None);
        assert!(!snapshot.loading);

        let settings = store
            .settings_for(Caller::Anonymous, company.id)
            .await
            .expect("settings lookup")
            .expect("settings created");
        assert_eq!(settings.primary_color, DEFAULT_PRIMARY_COLOR);
        assert_eq!(settings.secondary_color, DEFAULT_SECONDARY_COLOR);
        assert!(sessions.context().is_some());
    }

    #[tokio::test]
    async fn duplicate_sign_up_is_an_auth_error() {
        let (sessions, _) = session_store();
        sessions
            .sign_up("owner@acme.test", "hunter22", "Acme HVAC", None)
            .await
            .expect("first sign up");
        let err = sessions
            .sign_up("owner@acme.test", "hunter22", "Acme Again", None)
            .await
            .expect_err("duplicate rejected");
        assert_eq!(err.kind(), ErrorKind::Auth);
    }

    #[tokio::test]
    async fn failed_company_insert_keeps_identity() {
        let auth = Arc::new(InMemoryAuth::default());
        let store = Arc::new(InMemoryStore::default());
        store.fail_table("companies");
        let sessions = SessionStore::new(auth.clone(), store.clone());

        let err = sessions
            .sign_up("owner@acme.test", "hunter22", "Acme HVAC", None)
            .await
            .expect_err("company insert fails");
        assert_eq!(err.kind(), ErrorKind::Persistence);

        assert!(auth
            .sign_in_with_password("owner@acme.test", "hunter22")
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn subscribers_observe_sign_in_and_sign_out() {
        let (sessions, _) = session_store();
        sessions
            .sign_up("owner@acme.test", "hunter22", "Acme HVAC", None)
            .await
            .expect("sign up");
        sessions.sign_out().await.expect("sign out");

        let mut changes = sessions.subscribe();
        sessions
            .sign_in("owner@acme.test", "hunter22")
            .await
            .expect("sign in");
        assert!(changes.has_changed().expect("sender alive"));
        assert!(changes.borrow_and_update().company.is_some());

        sessions.sign_out().await.expect("sign out");
        let after = changes.borrow_and_update().clone();
        assert!(after.company.is_none());
        assert!(after.session.is_none());
    }

    #[tokio::test]
    async fn initialize_without_token_finishes_loading() {
        let (sessions, _) = session_store();
        assert!(sessions.snapshot().loading);
        let snapshot = sessions.initialize(None).await.expect("initialize");
        assert!(!snapshot.loading);
        assert!(snapshot.user.is_none());
    }

    #[tokio::test]
    async fn stale_token_does_not_resolve_a_tenant() {
        let auth = InMemoryAuth::default();
        let store = InMemoryStore::default();
        let err = resolve_tenant(&auth, &store, AccessToken("stale".to_string()))
            .await
            .expect_err("unknown token");
        assert_eq!(err.kind(), ErrorKind::Auth);
    }
}
