use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::{ProfileView, Technician, TechnicianId};

pub const UNKNOWN_TECHNICIAN: &str = "Unknown";
pub const TOP_TECHNICIANS: usize = 5;
pub const DAILY_WINDOW: usize = 14;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TechnicianViews {
    pub technician_id: TechnicianId,
    pub name: String,
    pub views: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyViews {
    pub date: NaiveDate,
    /// Short chart label, e.g. `Oct 3`.
    pub label: String,
    pub views: u64,
}

/// Everything the aggregation needs, fetched up front.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalyticsSnapshot {
    pub technicians: Vec<Technician>,
    pub views: Vec<ProfileView>,
    pub total_views: u64,
    pub total_shares: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalyticsDashboard {
    pub total_technicians: usize,
    pub total_profile_views: u64,
    pub total_share_links: u64,
    pub most_viewed_technician: Option<TechnicianViews>,
    pub top_technicians: Vec<TechnicianViews>,
    pub views_over_time: Vec<DailyViews>,
}

/// Views per technician, most viewed first. Equal counts keep the order in
/// which each technician first appears in `views`.
pub fn rank_technicians(views: &[ProfileView], technicians: &[Technician]) -> Vec<TechnicianViews> {
    let names: HashMap<TechnicianId, String> = technicians
        .iter()
        .map(|technician| (technician.id, technician.display_name()))
        .collect();

    let mut ranking: Vec<TechnicianViews> = Vec::new();
    let mut slots: HashMap<TechnicianId, usize> = HashMap::new();
    for view in views {
        let slot = *slots.entry(view.technician_id).or_insert_with(|| {
            ranking.push(TechnicianViews {
                technician_id: view.technician_id,
                name: names
                    .get(&view.technician_id)
                    .cloned()
                    .unwrap_or_else(|| UNKNOWN_TECHNICIAN.to_string()),
                views: 0,
            });
            ranking.len() - 1
        });
        ranking[slot].views += 1;
    }

    ranking.sort_by(|a, b| b.views.cmp(&a.views));
    ranking
}

/// Views per UTC calendar day, the most recent `window` days, oldest first.
pub fn daily_views(views: &[ProfileView], window: usize) -> Vec<DailyViews> {
    let mut per_day: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for view in views {
        *per_day.entry(view.viewed_at.date_naive()).or_default() += 1;
    }

    let skip = per_day.len().saturating_sub(window);
    per_day
        .into_iter()
        .skip(skip)
        .map(|(date, views)| DailyViews {
            date,
            label: date.format("%b %-d").to_string(),
            views,
        })
        .collect()
}

pub fn summarize(snapshot: &AnalyticsSnapshot) -> AnalyticsDashboard {
    let ranking = rank_technicians(&snapshot.views, &snapshot.technicians);
    AnalyticsDashboard {
        total_technicians: snapshot.technicians.len(),
        total_profile_views: snapshot.total_views,
        total_share_links: snapshot.total_shares,
        most_viewed_technician: ranking.first().cloned(),
        top_technicians: ranking.into_iter().take(TOP_TECHNICIANS).collect(),
        views_over_time: daily_views(&snapshot.views, DAILY_WINDOW),
    }
}
