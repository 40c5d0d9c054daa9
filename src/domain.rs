use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Brand colors applied when a company never customized its settings.
pub const DEFAULT_PRIMARY_COLOR: &str = "#0B2E51";
pub const DEFAULT_SECONDARY_COLOR: &str = "#39C0C3";

/// Identifier of an authenticated identity owned by the auth service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

/// Tenant identifier; every management query is filtered by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompanyId(pub Uuid);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TechnicianId(pub Uuid);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for CompanyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for TechnicianId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Bearer token issued by the auth service. The value never shows up in logs.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(pub String);

impl AccessToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

/// Tenant root: one service business using the product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub id: CompanyId,
    pub user_id: UserId,
    pub company_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewCompany {
    pub user_id: UserId,
    pub company_name: String,
    pub email: String,
    pub phone: Option<String>,
}

/// Editable company information from the settings screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyChanges {
    pub company_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Branding configuration, one-to-one with a company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanySettings {
    pub company_id: CompanyId,
    pub logo_url: Option<String>,
    pub primary_color: String,
    pub secondary_color: String,
}

impl CompanySettings {
    pub fn defaults_for(company_id: CompanyId) -> Self {
        Self {
            company_id,
            logo_url: None,
            primary_color: DEFAULT_PRIMARY_COLOR.to_string(),
            secondary_color: DEFAULT_SECONDARY_COLOR.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandingChanges {
    #[serde(default)]
    pub logo_url: Option<String>,
    pub primary_color: String,
    pub secondary_color: String,
}

/// Reference into the photo object store. Rows never carry photo bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhotoRef(pub String);

/// Staff member whose profile is shared with customers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Technician {
    pub id: TechnicianId,
    pub company_id: CompanyId,
    pub first_name: String,
    pub last_name: String,
    pub title: String,
    #[serde(rename = "photo_url")]
    pub photo: Option<PhotoRef>,
    pub bio: Option<String>,
    pub certifications: Option<Vec<String>>,
    pub years_experience: Option<u32>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Technician {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Validated technician row ready for insertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewTechnician {
    pub company_id: CompanyId,
    pub first_name: String,
    pub last_name: String,
    pub title: String,
    #[serde(rename = "photo_url")]
    pub photo: Option<PhotoRef>,
    pub bio: Option<String>,
    pub certifications: Option<Vec<String>>,
    pub years_experience: Option<u32>,
    pub is_active: bool,
}

/// Partial update; `None` leaves a column untouched, `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TechnicianPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "photo_url", skip_serializing_if = "Option::is_none")]
    pub photo: Option<Option<PhotoRef>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certifications: Option<Option<Vec<String>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub years_experience: Option<Option<u32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl TechnicianPatch {
    pub fn active(active: bool) -> Self {
        Self {
            is_active: Some(active),
            ..Self::default()
        }
    }

    pub fn photo(photo: PhotoRef) -> Self {
        Self {
            photo: Some(Some(photo)),
            ..Self::default()
        }
    }

    pub fn apply(&self, technician: &mut Technician) {
        if let Some(value) = &self.first_name {
            technician.first_name = value.clone();
        }
        if let Some(value) = &self.last_name {
            technician.last_name = value.clone();
        }
        if let Some(value) = &self.title {
            technician.title = value.clone();
        }
        if let Some(value) = &self.photo {
            technician.photo = value.clone();
        }
        if let Some(value) = &self.bio {
            technician.bio = value.clone();
        }
        if let Some(value) = &self.certifications {
            technician.certifications = value.clone();
        }
        if let Some(value) = self.years_experience {
            technician.years_experience = value;
        }
        if let Some(value) = self.is_active {
            technician.is_active = value;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMethod {
    Email,
    Sms,
}

impl DeliveryMethod {
    pub const fn label(self) -> &'static str {
        match self {
            DeliveryMethod::Email => "email",
            DeliveryMethod::Sms => "sms",
        }
    }
}

impl fmt::Display for DeliveryMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Append-only record of a share action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareEvent {
    pub technician_id: TechnicianId,
    pub company_id: CompanyId,
    pub customer_name: String,
    pub delivery_method: DeliveryMethod,
    pub contact_info: String,
    pub share_token: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewShareEvent {
    pub technician_id: TechnicianId,
    pub company_id: CompanyId,
    pub customer_name: String,
    pub delivery_method: DeliveryMethod,
    pub contact_info: String,
    pub share_token: Uuid,
}

/// Append-only record of a public profile page load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileView {
    pub technician_id: TechnicianId,
    pub company_id: CompanyId,
    pub viewed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NewProfileView {
    pub technician_id: TechnicianId,
    pub company_id: CompanyId,
}
