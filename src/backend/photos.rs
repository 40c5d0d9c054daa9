use async_trait::async_trait;
use mime::Mime;
use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use uuid::Uuid;

use super::store::{Caller, StoreError};
use super::{failure_details, BackendClient};
use crate::domain::{CompanyId, PhotoRef, TechnicianId};

/// Raw image bytes on their way into the object store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoUpload {
    pub content_type: Mime,
    pub bytes: Vec<u8>,
}

impl PhotoUpload {
    /// File extension derived from the image subtype, `jpeg` becomes `jpg`.
    pub fn extension(&self) -> &str {
        match self.content_type.subtype().as_str() {
            "jpeg" => "jpg",
            other => other,
        }
    }
}

/// Binary object store holding technician photos outside the row.
#[async_trait]
pub trait PhotoStore: Send + Sync {
    async fn put(
        &self,
        caller: Caller<'_>,
        company: CompanyId,
        technician: TechnicianId,
        upload: PhotoUpload,
    ) -> Result<PhotoRef, StoreError>;
}

/// Uploads into a public storage bucket and returns the public object URL.
#[derive(Debug, Clone)]
pub struct RemotePhotoStore {
    client: BackendClient,
    bucket: String,
}

const STORAGE: &str = "storage";

impl RemotePhotoStore {
    pub fn new(client: BackendClient, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    pub(crate) fn object_path(
        company: CompanyId,
        technician: TechnicianId,
        extension: &str,
    ) -> String {
        format!("{company}/{technician}-{}.{extension}", Uuid::new_v4())
    }
}

#[async_trait]
impl PhotoStore for RemotePhotoStore {
    async fn put(
        &self,
        caller: Caller<'_>,
        company: CompanyId,
        technician: TechnicianId,
        upload: PhotoUpload,
    ) -> Result<PhotoRef, StoreError> {
        let object = Self::object_path(company, technician, upload.extension());
        let response = self
            .client
            .request(
                Method::POST,
                &format!("storage/v1/object/{}/{object}", self.bucket),
                caller.token(),
            )
            .header(CONTENT_TYPE, upload.content_type.as_ref())
            .header("x-upsert", "true")
            .body(upload.bytes)
            .send()
            .await?;

        if !response.status().is_success() {
            let (status, _, message) = failure_details(response, "upload rejected").await;
            return Err(StoreError::Rejected {
                table: STORAGE,
                status,
                message,
            });
        }

        Ok(PhotoRef(format!(
            "{}/storage/v1/object/public/{}/{object}",
            self.client.base_url(),
            self.bucket
        )))
    }
}
