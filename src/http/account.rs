use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::{bearer_token, KnockServices};
use crate::backend::{AuthError, AuthProvider, AuthUser, DataStore, Session};
use crate::domain::{BrandingChanges, Company, CompanyChanges, CompanySettings};
use crate::error::ServiceError;
use crate::session::SessionSnapshot;

#[derive(Debug, Deserialize)]
pub(crate) struct SignUpRequest {
    email: String,
    password: String,
    company_name: String,
    #[serde(default)]
    phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SignInRequest {
    email: String,
    password: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct SessionResponse {
    user: Option<AuthUser>,
    session: Option<Session>,
    company: Option<Company>,
}

impl From<SessionSnapshot> for SessionResponse {
    fn from(snapshot: SessionSnapshot) -> Self {
        Self {
            user: snapshot.user,
            session: snapshot.session,
            company: snapshot.company,
        }
    }
}

pub(crate) async fn sign_up<A, S>(
    State(services): State<Arc<KnockServices<A, S>>>,
    Json(request): Json<SignUpRequest>,
) -> Result<Response, ServiceError>
where
    A: AuthProvider + 'static,
    S: DataStore + 'static,
{
    let snapshot = services
        .sessions()
        .sign_up(
            &request.email,
            &request.password,
            &request.company_name,
            request.phone.as_deref(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(SessionResponse::from(snapshot))).into_response())
}

pub(crate) async fn sign_in<A, S>(
    State(services): State<Arc<KnockServices<A, S>>>,
    Json(request): Json<SignInRequest>,
) -> Result<Json<SessionResponse>, ServiceError>
where
    A: AuthProvider + 'static,
    S: DataStore + 'static,
{
    let snapshot = services
        .sessions()
        .sign_in(&request.email, &request.password)
        .await?;
    Ok(Json(snapshot.into()))
}

pub(crate) async fn sign_out<A, S>(
    State(services): State<Arc<KnockServices<A, S>>>,
    headers: HeaderMap,
) -> Result<StatusCode, ServiceError>
where
    A: AuthProvider + 'static,
    S: DataStore + 'static,
{
    let token = bearer_token(&headers)?;
    match services.auth.sign_out(&token).await {
        Ok(()) | Err(AuthError::SessionExpired) => Ok(StatusCode::NO_CONTENT),
        Err(err) => Err(err.into()),
    }
}

pub(crate) async fn company<A, S>(
    State(services): State<Arc<KnockServices<A, S>>>,
    headers: HeaderMap,
) -> Result<Json<Company>, ServiceError>
where
    A: AuthProvider + 'static,
    S: DataStore + 'static,
{
    let ctx = services.tenant(&headers).await?;
    Ok(Json(ctx.company))
}

pub(crate) async fn update_company<A, S>(
    State(services): State<Arc<KnockServices<A, S>>>,
    headers: HeaderMap,
    Json(changes): Json<CompanyChanges>,
) -> Result<Json<Company>, ServiceError>
where
    A: AuthProvider + 'static,
    S: DataStore + 'static,
{
    let ctx = services.tenant(&headers).await?;
    let company = services.repository.update_company(&ctx, changes).await?;
    Ok(Json(company))
}

pub(crate) async fn settings<A, S>(
    State(services): State<Arc<KnockServices<A, S>>>,
    headers: HeaderMap,
) -> Result<Json<CompanySettings>, ServiceError>
where
    A: AuthProvider + 'static,
    S: DataStore + 'static,
{
    let ctx = services.tenant(&headers).await?;
    let settings = services.repository.get_company_settings(&ctx).await?;
    Ok(Json(settings))
}

pub(crate) async fn update_settings<A, S>(
    State(services): State<Arc<KnockServices<A, S>>>,
    headers: HeaderMap,
    Json(changes): Json<BrandingChanges>,
) -> Result<Json<CompanySettings>, ServiceError>
where
    A: AuthProvider + 'static,
    S: DataStore + 'static,
{
    let ctx = services.tenant(&headers).await?;
    let settings = services
        .repository
        .update_company_settings(&ctx, changes)
        .await?;
    Ok(Json(settings))
}
