//! Input checks that run before any backend call.

use serde::{Deserialize, Serialize};

use crate::domain::{
    BrandingChanges, CompanyChanges, CompanyId, NewTechnician, PhotoRef, TechnicianPatch,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("years of experience must be a non-negative whole number, got '{0}'")]
    InvalidYearsOfExperience(String),
    #[error("{field} must be a #RRGGBB hex color, got '{value}'")]
    InvalidColor { field: &'static str, value: String },
    #[error("{0} requires explicit confirmation")]
    ConfirmationRequired(&'static str),
    #[error("photo content type '{0}' is not an image")]
    UnsupportedPhotoType(String),
    #[error("photo is {size} bytes, limit is {limit}")]
    PhotoTooLarge { size: usize, limit: usize },
    #[error("photo upload is empty")]
    EmptyPhoto,
    #[error("photo must be an http or https link, got '{0}'")]
    InvalidPhotoUrl(String),
}

/// Years of experience as typed into a form: a JSON number or a numeric string.
/// Fractional numbers deserialize so validation can reject them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum YearsInput {
    Number(i64),
    Fraction(f64),
    Text(String),
}

impl From<u32> for YearsInput {
    fn from(value: u32) -> Self {
        Self::Number(i64::from(value))
    }
}

/// Technician form submission for create and edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicianDraft {
    pub first_name: String,
    pub last_name: String,
    pub title: String,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub certifications: Vec<String>,
    #[serde(default)]
    pub years_experience: Option<YearsInput>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ValidTechnician {
    pub first_name: String,
    pub last_name: String,
    pub title: String,
    pub photo: Option<PhotoRef>,
    pub bio: Option<String>,
    pub certifications: Option<Vec<String>>,
    pub years_experience: Option<u32>,
    pub is_active: bool,
}

impl ValidTechnician {
    pub(crate) fn into_new(self, company_id: CompanyId) -> NewTechnician {
        NewTechnician {
            company_id,
            first_name: self.first_name,
            last_name: self.last_name,
            title: self.title,
            photo: self.photo,
            bio: self.bio,
            certifications: self.certifications,
            years_experience: self.years_experience,
            is_active: self.is_active,
        }
    }

    /// Full edit. The photo column is only touched when the form supplied one,
    /// uploads go through the photo endpoint.
    pub(crate) fn into_patch(self) -> TechnicianPatch {
        TechnicianPatch {
            first_name: Some(self.first_name),
            last_name: Some(self.last_name),
            title: Some(self.title),
            photo: self.photo.map(Some),
            bio: Some(self.bio),
            certifications: Some(self.certifications),
            years_experience: Some(self.years_experience),
            is_active: Some(self.is_active),
        }
    }
}

pub(crate) fn validate_technician(
    draft: TechnicianDraft,
) -> Result<ValidTechnician, ValidationError> {
    let first_name = required(&draft.first_name, "first name")?;
    let last_name = required(&draft.last_name, "last name")?;
    let title = required(&draft.title, "title")?;
    let years_experience = draft
        .years_experience
        .as_ref()
        .map(parse_years)
        .transpose()?
        .flatten();
    let photo = photo_link(draft.photo_url.as_deref())?;

    Ok(ValidTechnician {
        first_name,
        last_name,
        title,
        photo,
        bio: optional(draft.bio.as_deref()),
        certifications: normalize_certifications(draft.certifications),
        years_experience,
        is_active: draft.is_active,
    })
}

/// Blank text clears the value; anything else must be a whole number >= 0.
pub(crate) fn parse_years(input: &YearsInput) -> Result<Option<u32>, ValidationError> {
    match input {
        YearsInput::Number(value) => u32::try_from(*value)
            .map(Some)
            .map_err(|_| ValidationError::InvalidYearsOfExperience(value.to_string())),
        YearsInput::Fraction(value) => {
            Err(ValidationError::InvalidYearsOfExperience(value.to_string()))
        }
        YearsInput::Text(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            trimmed
                .parse::<u32>()
                .map(Some)
                .map_err(|_| ValidationError::InvalidYearsOfExperience(raw.clone()))
        }
    }
}

/// Photos live in the object store; a form may only point at one by link.
/// Inline `data:` payloads and other schemes are refused.
fn photo_link(value: Option<&str>) -> Result<Option<PhotoRef>, ValidationError> {
    let Some(link) = optional(value) else {
        return Ok(None);
    };
    match reqwest::Url::parse(&link) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(Some(PhotoRef(link))),
        _ => Err(ValidationError::InvalidPhotoUrl(
            link.chars().take(PHOTO_URL_PREVIEW).collect(),
        )),
    }
}

const PHOTO_URL_PREVIEW: usize = 32;

/// Trim, drop blanks, drop duplicates keeping the first occurrence.
pub(crate) fn normalize_certifications(raw: Vec<String>) -> Option<Vec<String>> {
    let mut kept: Vec<String> = Vec::with_capacity(raw.len());
    for entry in raw {
        let entry = entry.trim();
        if entry.is_empty() || kept.iter().any(|existing| existing == entry) {
            continue;
        }
        kept.push(entry.to_string());
    }

    if kept.is_empty() {
        None
    } else {
        Some(kept)
    }
}

pub(crate) fn validate_company(changes: CompanyChanges) -> Result<CompanyChanges, ValidationError> {
    Ok(CompanyChanges {
        company_name: required(&changes.company_name, "company name")?,
        email: required(&changes.email, "email")?,
        phone: optional(changes.phone.as_deref()),
    })
}

pub(crate) fn validate_branding(
    changes: BrandingChanges,
) -> Result<BrandingChanges, ValidationError> {
    Ok(BrandingChanges {
        logo_url: optional(changes.logo_url.as_deref()),
        primary_color: hex_color(&changes.primary_color, "primary color")?,
        secondary_color: hex_color(&changes.secondary_color, "secondary color")?,
    })
}

pub(crate) fn require_confirmation(
    confirmed: bool,
    action: &'static str,
) -> Result<(), ValidationError> {
    if confirmed {
        Ok(())
    } else {
        Err(ValidationError::ConfirmationRequired(action))
    }
}

pub(crate) fn required(value: &str, field: &'static str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ValidationError::MissingField(field))
    } else {
        Ok(trimmed.to_string())
    }
}

pub(crate) fn optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn hex_color(value: &str, field: &'static str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    let valid = trimmed.len() == 7
        && trimmed.starts_with('#')
        && trimmed.chars().skip(1).all(|c| c.is_ascii_hexdigit());
    if valid {
        Ok(trimmed.to_string())
    } else {
        Err(ValidationError::InvalidColor {
            field,
            value: value.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> TechnicianDraft {
        TechnicianDraft {
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            title: "HVAC Tech".to_string(),
            photo_url: None,
            bio: Some("  ".to_string()),
            certifications: Vec::new(),
            years_experience: None,
            is_active: true,
        }
    }

    #[test]
    fn blank_required_fields_are_rejected() {
        let mut missing_title = draft();
        missing_title.title = "   ".to_string();
        assert_eq!(
            validate_technician(missing_title),
            Err(ValidationError::MissingField("title"))
        );

        let mut missing_first = draft();
        missing_first.first_name.clear();
        assert_eq!(
            validate_technician(missing_first),
            Err(ValidationError::MissingField("first name"))
        );
    }

    #[test]
    fn years_accept_numbers_and_numeric_text() {
        assert_eq!(parse_years(&YearsInput::Number(12)), Ok(Some(12)));
        assert_eq!(parse_years(&YearsInput::Text(" 7 ".to_string())), Ok(Some(7)));
        assert_eq!(parse_years(&YearsInput::Text(String::new())), Ok(None));
    }

    #[test]
    fn negative_or_malformed_years_are_rejected() {
        assert!(matches!(
            parse_years(&YearsInput::Number(-1)),
            Err(ValidationError::InvalidYearsOfExperience(_))
        ));
        assert!(matches!(
            parse_years(&YearsInput::Text("ten".to_string())),
            Err(ValidationError::InvalidYearsOfExperience(_))
        ));
        assert!(matches!(
            parse_years(&YearsInput::Text("4.5".to_string())),
            Err(ValidationError::InvalidYearsOfExperience(_))
        ));
    }

    #[test]
    fn fractional_years_deserialize_then_fail_validation() {
        let input: YearsInput = serde_json::from_value(serde_json::json!(4.5)).expect("number");
        assert_eq!(input, YearsInput::Fraction(4.5));
        assert_eq!(
            parse_years(&input),
            Err(ValidationError::InvalidYearsOfExperience("4.5".to_string()))
        );

        let whole: YearsInput = serde_json::from_value(serde_json::json!(8)).expect("number");
        assert_eq!(parse_years(&whole), Ok(Some(8)));
    }

    #[test]
    fn photo_must_be_an_http_link() {
        let mut inline = draft();
        inline.photo_url = Some(format!("data:image/png;base64,{}", "A".repeat(1 << 20)));
        match validate_technician(inline) {
            Err(ValidationError::InvalidPhotoUrl(preview)) => {
                assert!(preview.starts_with("data:image/png"));
                assert_eq!(preview.len(), PHOTO_URL_PREVIEW);
            }
            other => panic!("expected photo url error, got {other:?}"),
        }

        let mut relative = draft();
        relative.photo_url = Some("jane.png".to_string());
        assert!(matches!(
            validate_technician(relative),
            Err(ValidationError::InvalidPhotoUrl(_))
        ));

        let mut linked = draft();
        linked.photo_url = Some(" HTTPS://cdn.acme.test/jane.png ".to_string());
        let valid = validate_technician(linked).expect("https link accepted");
        assert_eq!(
            valid.photo,
            Some(PhotoRef("HTTPS://cdn.acme.test/jane.png".to_string()))
        );

        let mut blank = draft();
        blank.photo_url = Some("  ".to_string());
        assert_eq!(validate_technician(blank).expect("blank is absent").photo, None);
    }

    #[test]
    fn certifications_are_trimmed_and_deduplicated() {
        let certs = normalize_certifications(vec![
            " NATE Certified ".to_string(),
            "".to_string(),
            "EPA Universal".to_string(),
            "NATE Certified".to_string(),
        ]);
        assert_eq!(
            certs,
            Some(vec!["NATE Certified".to_string(), "EPA Universal".to_string()])
        );
        assert_eq!(normalize_certifications(vec!["  ".to_string()]), None);
    }

    #[test]
    fn blank_bio_is_stored_as_absent() {
        let valid = validate_technician(draft()).expect("draft is valid");
        assert_eq!(valid.bio, None);
        assert_eq!(valid.certifications, None);
    }

    #[test]
    fn branding_colors_must_be_hex() {
        let bad = BrandingChanges {
            logo_url: None,
            primary_color: "navy".to_string(),
            secondary_color: "#39C0C3".to_string(),
        };
        assert!(matches!(
            validate_branding(bad),
            Err(ValidationError::InvalidColor {
                field: "primary color",
                ..
            })
        ));

        let good = BrandingChanges {
            logo_url: Some(" ".to_string()),
            primary_color: "#112233".to_string(),
            secondary_color: "#abcdef".to_string(),
        };
        let validated = validate_branding(good).expect("valid colors");
        assert_eq!(validated.logo_url, None);
    }

    #[test]
    fn confirmation_is_required_for_destructive_actions() {
        assert_eq!(
            require_confirmation(false, "technician deletion"),
            Err(ValidationError::ConfirmationRequired("technician deletion"))
        );
        assert!(require_confirmation(true, "technician deletion").is_ok());
    }
}
