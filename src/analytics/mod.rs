//! Profile view and share statistics for the company dashboard.

mod aggregate;

use std::sync::Arc;

use tracing::debug;

use crate::backend::DataStore;
use crate::error::ServiceError;
use crate::repository::TenantRepository;
use crate::session::TenantContext;

pub use aggregate::{
    daily_views, rank_technicians, summarize, AnalyticsDashboard, AnalyticsSnapshot, DailyViews,
    TechnicianViews, DAILY_WINDOW, TOP_TECHNICIANS, UNKNOWN_TECHNICIAN,
};

/// Fetches a snapshot through the tenant repository and aggregates it.
pub struct AnalyticsService<S: ?Sized> {
    repository: Arc<TenantRepository<S>>,
}

impl<S> AnalyticsService<S>
where
    S: DataStore + ?Sized,
{
    pub fn new(repository: Arc<TenantRepository<S>>) -> Self {
        Self { repository }
    }

    pub async fn snapshot(&self, ctx: &TenantContext) -> Result<AnalyticsSnapshot, ServiceError> {
        Ok(AnalyticsSnapshot {
            technicians: self.repository.list_technicians(ctx).await?,
            views: self.repository.profile_views(ctx).await?,
            total_views: self.repository.count_profile_views(ctx).await?,
            total_shares: self.repository.count_share_events(ctx).await?,
        })
    }

    pub async fn dashboard(&self, ctx: &TenantContext) -> Result<AnalyticsDashboard, ServiceError> {
        let snapshot = self.snapshot(ctx).await?;
        debug!(
            company = %ctx.company_id(),
            views = snapshot.views.len(),
            "aggregating analytics"
        );
        Ok(summarize(&snapshot))
    }
}
