use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::KnockServices;
use crate::backend::{AuthProvider, DataStore};
use crate::domain::{ShareEvent, TechnicianId};
use crate::error::ServiceError;
use crate::profile::PublicProfile;
use crate::sharing::{ShareForm, ShareReceipt};

#[derive(Debug, Serialize)]
pub(crate) struct ShareResponse {
    event: ShareEvent,
    url: String,
    message: String,
    dismiss_after_ms: u64,
}

impl From<ShareReceipt> for ShareResponse {
    fn from(receipt: ShareReceipt) -> Self {
        Self {
            dismiss_after_ms: u64::try_from(receipt.dismiss_after.as_millis()).unwrap_or(u64::MAX),
            event: receipt.event,
            url: receipt.url,
            message: receipt.message,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ProfileQuery {
    #[serde(default)]
    token: Option<String>,
}

pub(crate) async fn share<A, S>(
    State(services): State<Arc<KnockServices<A, S>>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(form): Json<ShareForm>,
) -> Result<Json<ShareResponse>, ServiceError>
where
    A: AuthProvider + 'static,
    S: DataStore + 'static,
{
    let ctx = services.tenant(&headers).await?;
    let receipt = services
        .sharing
        .share(&ctx, TechnicianId(id), &form)
        .await?;
    Ok(Json(receipt.into()))
}

/// Public page data. The share token is accepted but not checked.
pub(crate) async fn public_profile<A, S>(
    State(services): State<Arc<KnockServices<A, S>>>,
    Path(id): Path<Uuid>,
    Query(query): Query<ProfileQuery>,
) -> Result<Json<PublicProfile>, ServiceError>
where
    A: AuthProvider + 'static,
    S: DataStore + 'static,
{
    debug!(technician = %id, token = ?query.token, "public profile requested");
    let profile = services.profiles.resolve(TechnicianId(id)).await?;
    services.profiles.record_view(&profile).await;
    Ok(Json(profile))
}
