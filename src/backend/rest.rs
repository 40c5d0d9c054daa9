//! PostgREST-backed implementation of [`DataStore`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::CONTENT_RANGE;
use reqwest::{Method, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Display;

use super::store::{Caller, DataStore, StoreError, TechnicianFilter};
use super::{failure_details, BackendClient};
use crate::domain::{
    BrandingChanges, Company, CompanyChanges, CompanyId, CompanySettings, NewCompany,
    NewProfileView, NewShareEvent, NewTechnician, ProfileView, ShareEvent, Technician,
    TechnicianId, TechnicianPatch, UserId,
};

const COMPANIES: &str = "companies";
const COMPANY_SETTINGS: &str = "company_settings";
const TECHNICIANS: &str = "technicians";
const SHARE_EVENTS: &str = "share_events";
const PROFILE_VIEWS: &str = "profile_views";

type Query = Vec<(&'static str, String)>;

#[derive(Debug, Clone)]
pub struct RestStore {
    client: BackendClient,
}

/// Update body with the `updated_at` column bumped alongside the changes.
#[derive(Serialize)]
struct Touched<'a, T: Serialize> {
    #[serde(flatten)]
    changes: &'a T,
    updated_at: DateTime<Utc>,
}

fn touched<T: Serialize>(changes: &T) -> Touched<'_, T> {
    Touched {
        changes,
        updated_at: Utc::now(),
    }
}

fn eq(value: impl Display) -> String {
    format!("eq.{value}")
}

impl RestStore {
    pub fn new(client: BackendClient) -> Self {
        Self { client }
    }

    fn path(table: &str) -> String {
        format!("rest/v1/{table}")
    }

    async fn select<T>(
        &self,
        caller: Caller<'_>,
        table: &'static str,
        query: Query,
    ) -> Result<Vec<T>, StoreError>
    where
        T: DeserializeOwned + Send,
    {
        let response = self
            .client
            .request(Method::GET, &Self::path(table), caller.token())
            .query(&query)
            .send()
            .await?;
        Self::rows(table, response).await
    }

    async fn insert<B, T>(
        &self,
        caller: Caller<'_>,
        table: &'static str,
        body: &B,
    ) -> Result<Vec<T>, StoreError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned + Send,
    {
        let response = self
            .client
            .request(Method::POST, &Self::path(table), caller.token())
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await?;
        Self::rows(table, response).await
    }

    async fn update<B, T>(
        &self,
        caller: Caller<'_>,
        table: &'static str,
        query: Query,
        body: &B,
    ) -> Result<Vec<T>, StoreError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned + Send,
    {
        let response = self
            .client
            .request(Method::PATCH, &Self::path(table), caller.token())
            .header("Prefer", "return=representation")
            .query(&query)
            .json(&touched(body))
            .send()
            .await?;
        Self::rows(table, response).await
    }

    async fn delete<T>(
        &self,
        caller: Caller<'_>,
        table: &'static str,
        query: Query,
    ) -> Result<Vec<T>, StoreError>
    where
        T: DeserializeOwned + Send,
    {
        let response = self
            .client
            .request(Method::DELETE, &Self::path(table), caller.token())
            .header("Prefer", "return=representation")
            .query(&query)
            .send()
            .await?;
        Self::rows(table, response).await
    }

    async fn count(
        &self,
        caller: Caller<'_>,
        table: &'static str,
        query: Query,
    ) -> Result<u64, StoreError> {
        let response = self
            .client
            .request(Method::HEAD, &Self::path(table), caller.token())
            .header("Prefer", "count=exact")
            .query(&query)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::rejected(table, response).await);
        }

        let range = response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        parse_content_range_total(range).ok_or_else(|| StoreError::UnexpectedResponse {
            table,
            detail: format!("missing or malformed content-range '{range}'"),
        })
    }

    async fn rows<T>(table: &'static str, response: Response) -> Result<Vec<T>, StoreError>
    where
        T: DeserializeOwned,
    {
        if !response.status().is_success() {
            return Err(Self::rejected(table, response).await);
        }
        response
            .json::<Vec<T>>()
            .await
            .map_err(|err| StoreError::UnexpectedResponse {
                table,
                detail: err.to_string(),
            })
    }

    async fn rejected(table: &'static str, response: Response) -> StoreError {
        let (status, _, message) = failure_details(response, "request rejected").await;
        StoreError::Rejected {
            table,
            status,
            message,
        }
    }

    fn single<T>(table: &'static str, rows: Vec<T>) -> Result<T, StoreError> {
        rows.into_iter()
            .next()
            .ok_or_else(|| StoreError::UnexpectedResponse {
                table,
                detail: "no row returned".to_string(),
            })
    }
}

/// `Content-Range: 0-24/3573` or `*/0`.
fn parse_content_range_total(header: &str) -> Option<u64> {
    header.rsplit_once('/')?.1.trim().parse().ok()
}

#[async_trait]
impl DataStore for RestStore {
    async fn insert_company(
        &self,
        caller: Caller<'_>,
        company: NewCompany,
    ) -> Result<Company, StoreError> {
        let rows = self.insert(caller, COMPANIES, &company).await?;
        Self::single(COMPANIES, rows)
    }

    async fn company_by_owner(
        &self,
        caller: Caller<'_>,
        user: UserId,
    ) -> Result<Option<Company>, StoreError> {
        let rows: Vec<Company> = self
            .select(caller, COMPANIES, vec![("user_id", eq(user)), ("limit", "1".into())])
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn company_by_id(
        &self,
        caller: Caller<'_>,
        id: CompanyId,
    ) -> Result<Option<Company>, StoreError> {
        let rows: Vec<Company> = self
            .select(caller, COMPANIES, vec![("id", eq(id)), ("limit", "1".into())])
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn update_company(
        &self,
        caller: Caller<'_>,
        id: CompanyId,
        changes: CompanyChanges,
    ) -> Result<Company, StoreError> {
        let rows = self
            .update(caller, COMPANIES, vec![("id", eq(id))], &changes)
            .await?;
        Self::single(COMPANIES, rows)
    }

    async fn insert_settings(
        &self,
        caller: Caller<'_>,
        settings: CompanySettings,
    ) -> Result<CompanySettings, StoreError> {
        let rows = self.insert(caller, COMPANY_SETTINGS, &settings).await?;
        Self::single(COMPANY_SETTINGS, rows)
    }

    async fn settings_for(
        &self,
        caller: Caller<'_>,
        company: CompanyId,
    ) -> Result<Option<CompanySettings>, StoreError> {
        let rows: Vec<CompanySettings> = self
            .select(
                caller,
                COMPANY_SETTINGS,
                vec![("company_id", eq(company)), ("limit", "1".into())],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn update_settings(
        &self,
        caller: Caller<'_>,
        company: CompanyId,
        changes: BrandingChanges,
    ) -> Result<CompanySettings, StoreError> {
        let rows = self
            .update(
                caller,
                COMPANY_SETTINGS,
                vec![("company_id", eq(company))],
                &changes,
            )
            .await?;
        Self::single(COMPANY_SETTINGS, rows)
    }

    async fn technicians_for(
        &self,
        caller: Caller<'_>,
        company: CompanyId,
    ) -> Result<Vec<Technician>, StoreError> {
        self.select(
            caller,
            TECHNICIANS,
            vec![
                ("company_id", eq(company)),
                ("order", "created_at.desc".into()),
            ],
        )
        .await
    }

    async fn technician(
        &self,
        caller: Caller<'_>,
        filter: TechnicianFilter,
    ) -> Result<Option<Technician>, StoreError> {
        let mut query: Query = vec![("id", eq(filter.id))];
        if let Some(company) = filter.company {
            query.push(("company_id", eq(company)));
        }
        if filter.active_only {
            query.push(("is_active", eq(true)));
        }
        query.push(("limit", "1".into()));

        let rows: Vec<Technician> = self.select(caller, TECHNICIANS, query).await?;
        Ok(rows.into_iter().next())
    }

    async fn insert_technicians(
        &self,
        caller: Caller<'_>,
        rows: Vec<NewTechnician>,
    ) -> Result<Vec<Technician>, StoreError> {
        self.insert(caller, TECHNICIANS, rows.as_slice()).await
    }

    async fn update_technician(
        &self,
        caller: Caller<'_>,
        id: TechnicianId,
        company: CompanyId,
        patch: TechnicianPatch,
    ) -> Result<Option<Technician>, StoreError> {
        let rows: Vec<Technician> = self
            .update(
                caller,
                TECHNICIANS,
                vec![("id", eq(id)), ("company_id", eq(company))],
                &patch,
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn delete_technician(
        &self,
        caller: Caller<'_>,
        id: TechnicianId,
        company: CompanyId,
    ) -> Result<bool, StoreError> {
        let rows: Vec<Technician> = self
            .delete(
                caller,
                TECHNICIANS,
                vec![("id", eq(id)), ("company_id", eq(company))],
            )
            .await?;
        Ok(!rows.is_empty())
    }

    async fn delete_technicians_for(
        &self,
        caller: Caller<'_>,
        company: CompanyId,
    ) -> Result<u64, StoreError> {
        let rows: Vec<Technician> = self
            .delete(caller, TECHNICIANS, vec![("company_id", eq(company))])
            .await?;
        Ok(rows.len() as u64)
    }

    async fn insert_share_event(
        &self,
        caller: Caller<'_>,
        event: NewShareEvent,
    ) -> Result<ShareEvent, StoreError> {
        let rows = self.insert(caller, SHARE_EVENTS, &event).await?;
        Self::single(SHARE_EVENTS, rows)
    }

    async fn count_share_events(
        &self,
        caller: Caller<'_>,
        company: CompanyId,
    ) -> Result<u64, StoreError> {
        self.count(caller, SHARE_EVENTS, vec![("company_id", eq(company))])
            .await
    }

    async fn insert_profile_view(
        &self,
        caller: Caller<'_>,
        view: NewProfileView,
    ) -> Result<(), StoreError> {
        let response = self
            .client
            .request(Method::POST, &Self::path(PROFILE_VIEWS), caller.token())
            .header("Prefer", "return=minimal")
            .json(&view)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::rejected(PROFILE_VIEWS, response).await);
        }
        Ok(())
    }

    async fn profile_views_for(
        &self,
        caller: Caller<'_>,
        company: CompanyId,
    ) -> Result<Vec<ProfileView>, StoreError> {
        self.select(
            caller,
            PROFILE_VIEWS,
            vec![
                ("company_id", eq(company)),
                ("order", "viewed_at.asc".into()),
            ],
        )
        .await
    }

    async fn count_profile_views(
        &self,
        caller: Caller<'_>,
        company: CompanyId,
    ) -> Result<u64, StoreError> {
        self.count(caller, PROFILE_VIEWS, vec![("company_id", eq(company))])
            .await
    }
}
