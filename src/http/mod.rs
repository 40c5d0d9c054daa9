//! JSON API over the session, repository, sharing, profile and analytics
//! components.

mod account;
mod insights;
mod roster;
mod sharing;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::routing::{get, post, put};
use axum::Router;

use crate::analytics::AnalyticsService;
use crate::backend::{AuthError, AuthProvider, DataStore, MessageDispatcher, PhotoStore};
use crate::config::{AppConfig, RosterConfig, ShareConfig};
use crate::domain::AccessToken;
use crate::error::ServiceError;
use crate::profile::ProfileResolver;
use crate::repository::TenantRepository;
use crate::session::{resolve_tenant, SessionStore, TenantContext};
use crate::sharing::ShareWorkflow;

/// Knobs the service graph needs beyond its adapters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSettings {
    pub share: ShareConfig,
    pub roster: RosterConfig,
    pub photo_max_bytes: usize,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            share: ShareConfig::default(),
            roster: RosterConfig::default(),
            photo_max_bytes: 5 * 1024 * 1024,
        }
    }
}

impl From<&AppConfig> for ServiceSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            share: config.share.clone(),
            roster: config.roster,
            photo_max_bytes: config.backend.photo_max_bytes,
        }
    }
}

/// Shared state behind every route.
pub struct KnockServices<A, S> {
    pub auth: Arc<A>,
    pub store: Arc<S>,
    pub repository: Arc<TenantRepository<S>>,
    pub sharing: ShareWorkflow<S>,
    pub profiles: ProfileResolver<S>,
    pub analytics: AnalyticsService<S>,
    photo_max_bytes: usize,
}

impl<A, S> KnockServices<A, S>
where
    A: AuthProvider + 'static,
    S: DataStore + 'static,
{
    pub fn new(
        auth: Arc<A>,
        store: Arc<S>,
        photos: Arc<dyn PhotoStore>,
        dispatcher: Arc<dyn MessageDispatcher>,
        settings: ServiceSettings,
    ) -> Self {
        let repository = Arc::new(TenantRepository::new(
            store.clone(),
            photos,
            settings.roster,
            settings.photo_max_bytes,
        ));
        Self {
            sharing: ShareWorkflow::new(store.clone(), dispatcher, settings.share),
            profiles: ProfileResolver::new(store.clone()),
            analytics: AnalyticsService::new(repository.clone()),
            repository,
            auth,
            store,
            photo_max_bytes: settings.photo_max_bytes,
        }
    }

    /// A fresh per-request session store, used by the sign up and sign in routes.
    pub fn sessions(&self) -> SessionStore<A, S> {
        SessionStore::new(self.auth.clone(), self.store.clone())
    }

    pub async fn tenant(&self, headers: &HeaderMap) -> Result<TenantContext, ServiceError> {
        let token = bearer_token(headers)?;
        resolve_tenant(self.auth.as_ref(), self.store.as_ref(), token).await
    }
}

pub(crate) fn bearer_token(headers: &HeaderMap) -> Result<AccessToken, ServiceError> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| AccessToken(token.to_string()))
        .ok_or_else(|| AuthError::SessionExpired.into())
}

/// Router builder for the JSON API and the public profile route.
pub fn api_router<A, S>(services: Arc<KnockServices<A, S>>) -> Router
where
    A: AuthProvider + 'static,
    S: DataStore + 'static,
{
    // Leave headroom over the photo limit so oversized uploads reach the
    // repository check and get a typed error.
    let photo_body_limit = services.photo_max_bytes.saturating_mul(2);

    Router::new()
        .route("/api/v1/auth/signup", post(account::sign_up::<A, S>))
        .route("/api/v1/auth/signin", post(account::sign_in::<A, S>))
        .route("/api/v1/auth/signout", post(account::sign_out::<A, S>))
        .route(
            "/api/v1/company",
            get(account::company::<A, S>).put(account::update_company::<A, S>),
        )
        .route(
            "/api/v1/company/settings",
            get(account::settings::<A, S>).put(account::update_settings::<A, S>),
        )
        .route(
            "/api/v1/technicians",
            get(roster::list::<A, S>)
                .post(roster::create::<A, S>)
                .delete(roster::clear::<A, S>),
        )
        .route("/api/v1/technicians/demo", post(roster::seed_demo::<A, S>))
        .route(
            "/api/v1/technicians/:id",
            get(roster::fetch::<A, S>)
                .put(roster::update::<A, S>)
                .delete(roster::delete::<A, S>),
        )
        .route(
            "/api/v1/technicians/:id/active",
            put(roster::set_active::<A, S>),
        )
        .route(
            "/api/v1/technicians/:id/photo",
            put(roster::upload_photo::<A, S>).layer(DefaultBodyLimit::max(photo_body_limit)),
        )
        .route(
            "/api/v1/technicians/:id/share",
            post(sharing::share::<A, S>),
        )
        .route("/api/v1/analytics", get(insights::analytics::<A, S>))
        .route("/api/v1/plans", get(insights::plans))
        .route("/tech/:id", get(sharing::public_profile::<A, S>))
        .with_state(services)
}
