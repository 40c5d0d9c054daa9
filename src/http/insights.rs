use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;

use super::KnockServices;
use crate::analytics::AnalyticsDashboard;
use crate::backend::{AuthProvider, DataStore};
use crate::error::ServiceError;
use crate::plans::{catalog, PlanTier};

pub(crate) async fn analytics<A, S>(
    State(services): State<Arc<KnockServices<A, S>>>,
    headers: HeaderMap,
) -> Result<Json<AnalyticsDashboard>, ServiceError>
where
    A: AuthProvider + 'static,
    S: DataStore + 'static,
{
    let ctx = services.tenant(&headers).await?;
    let dashboard = services.analytics.dashboard(&ctx).await?;
    Ok(Json(dashboard))
}

pub(crate) async fn plans() -> Json<&'static [PlanTier]> {
    Json(catalog())
}
