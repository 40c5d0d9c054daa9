use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use mime::Mime;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use super::KnockServices;
use crate::backend::{AuthProvider, DataStore, PhotoUpload};
use crate::domain::{Technician, TechnicianId};
use crate::error::ServiceError;
use crate::validation::{TechnicianDraft, ValidationError};

/// Destructive routes only act with `?confirm=true`.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct Confirmation {
    #[serde(default)]
    confirm: bool,
}

#[derive(Debug, Deserialize, Serialize)]
pub(crate) struct ActiveToggle {
    is_active: bool,
}

pub(crate) async fn list<A, S>(
    State(services): State<Arc<KnockServices<A, S>>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Technician>>, ServiceError>
where
    A: AuthProvider + 'static,
    S: DataStore + 'static,
{
    let ctx = services.tenant(&headers).await?;
    let technicians = services.repository.list_technicians(&ctx).await?;
    Ok(Json(technicians))
}

pub(crate) async fn create<A, S>(
    State(services): State<Arc<KnockServices<A, S>>>,
    headers: HeaderMap,
    Json(draft): Json<TechnicianDraft>,
) -> Result<(StatusCode, Json<Technician>), ServiceError>
where
    A: AuthProvider + 'static,
    S: DataStore + 'static,
{
    let ctx = services.tenant(&headers).await?;
    let technician = services.repository.create_technician(&ctx, draft).await?;
    Ok((StatusCode::CREATED, Json(technician)))
}

pub(crate) async fn clear<A, S>(
    State(services): State<Arc<KnockServices<A, S>>>,
    headers: HeaderMap,
    Query(confirmation): Query<Confirmation>,
) -> Result<Json<Value>, ServiceError>
where
    A: AuthProvider + 'static,
    S: DataStore + 'static,
{
    let ctx = services.tenant(&headers).await?;
    let removed = services
        .repository
        .clear_technicians(&ctx, confirmation.confirm)
        .await?;
    Ok(Json(json!({ "removed": removed })))
}

pub(crate) async fn seed_demo<A, S>(
    State(services): State<Arc<KnockServices<A, S>>>,
    headers: HeaderMap,
) -> Result<(StatusCode, Json<Vec<Technician>>), ServiceError>
where
    A: AuthProvider + 'static,
    S: DataStore + 'static,
{
    let ctx = services.tenant(&headers).await?;
    let technicians = services.repository.seed_demo_technicians(&ctx).await?;
    Ok((StatusCode::CREATED, Json(technicians)))
}

pub(crate) async fn fetch<A, S>(
    State(services): State<Arc<KnockServices<A, S>>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<Technician>, ServiceError>
where
    A: AuthProvider + 'static,
    S: DataStore + 'static,
{
    let ctx = services.tenant(&headers).await?;
    let technician = services
        .repository
        .get_technician(&ctx, TechnicianId(id))
        .await?;
    Ok(Json(technician))
}

pub(crate) async fn update<A, S>(
    State(services): State<Arc<KnockServices<A, S>>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(draft): Json<TechnicianDraft>,
) -> Result<Json<Technician>, ServiceError>
where
    A: AuthProvider + 'static,
    S: DataStore + 'static,
{
    let ctx = services.tenant(&headers).await?;
    let technician = services
        .repository
        .update_technician(&ctx, TechnicianId(id), draft)
        .await?;
    Ok(Json(technician))
}

pub(crate) async fn delete<A, S>(
    State(services): State<Arc<KnockServices<A, S>>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Query(confirmation): Query<Confirmation>,
) -> Result<StatusCode, ServiceError>
where
    A: AuthProvider + 'static,
    S: DataStore + 'static,
{
    let ctx = services.tenant(&headers).await?;
    services
        .repository
        .delete_technician(&ctx, TechnicianId(id), confirmation.confirm)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn set_active<A, S>(
    State(services): State<Arc<KnockServices<A, S>>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(toggle): Json<ActiveToggle>,
) -> Result<Json<Technician>, ServiceError>
where
    A: AuthProvider + 'static,
    S: DataStore + 'static,
{
    let ctx = services.tenant(&headers).await?;
    let technician = services
        .repository
        .set_technician_active(&ctx, TechnicianId(id), toggle.is_active)
        .await?;
    Ok(Json(technician))
}

/// Raw image body; the media type comes from `Content-Type`.
pub(crate) async fn upload_photo<A, S>(
    State(services): State<Arc<KnockServices<A, S>>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    body: Bytes,
) -> Result<Json<Technician>, ServiceError>
where
    A: AuthProvider + 'static,
    S: DataStore + 'static,
{
    let ctx = services.tenant(&headers).await?;
    let raw_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    let content_type: Mime = raw_type
        .parse()
        .map_err(|_| ValidationError::UnsupportedPhotoType(raw_type.to_string()))?;

    let technician = services
        .repository
        .set_technician_photo(
            &ctx,
            TechnicianId(id),
            PhotoUpload {
                content_type,
                bytes: body.to_vec(),
            },
        )
        .await?;
    Ok(Json(technician))
}
