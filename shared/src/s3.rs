use crate::auth::Caller;
use crate::error::ApiError;
use crate::response;
use crate::types::{MediaUploadRequest, UploadUrl};
use crate::AppState;
use async_trait::async_trait;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::types::ObjectCannedAcl;
use aws_sdk_s3::Client as S3Client;
use lambda_http::{http::StatusCode, Body, Response};
use std::time::Duration;

const UPLOAD_URL_TTL: Duration = Duration::from_secs(15 * 60);

/// Issues upload URLs for profile media.
#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn create_upload_url(&self, content_type: Option<&str>) -> Result<UploadUrl, ApiError>;
}

pub struct S3Media {
    client: S3Client,
    bucket: String,
}

impl S3Media {
    pub fn new(client: S3Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }
}

pub fn download_url(bucket: &str, key: &str) -> String {
    format!("https://{}.s3.amazonaws.com/{}", bucket, key)
}

#[async_trait]
impl MediaStore for S3Media {
    async fn create_upload_url(&self, content_type: Option<&str>) -> Result<UploadUrl, ApiError> {
        let key = uuid::Uuid::new_v4().to_string();
        let presigning = PresigningConfig::expires_in(UPLOAD_URL_TTL)
            .map_err(|e| ApiError::Internal(format!("invalid presigning config: {}", e)))?;

        let presigned = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .acl(ObjectCannedAcl::PublicRead)
            .set_content_type(content_type.map(str::to_string))
            .presigned(presigning)
            .await
            .map_err(ApiError::from_sdk)?;

        Ok(UploadUrl {
            upload_url: presigned.uri().to_string(),
            download_url: download_url(&self.bucket, &key),
        })
    }
}

/// `POST /mediaUpload`
pub async fn media_upload(
    state: &AppState,
    caller: &Caller,
    body: &[u8],
) -> Result<Response<Body>, ApiError> {
    if caller.role().is_none() {
        return Err(ApiError::Forbidden);
    }

    let request: MediaUploadRequest = if body.iter().all(u8::is_ascii_whitespace) {
        MediaUploadRequest { content_type: None }
    } else {
        serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(e.to_string()))?
    };

    let upload = state
        .media
        .create_upload_url(request.content_type.as_deref())
        .await?;
    tracing::info!("Issued upload URL for {}", caller.username);

    response::json(StatusCode::CREATED, &upload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::test_state;
    use crate::types::Role;

    #[test]
    fn test_download_url() {
        assert_eq!(
            download_url("media", "abc"),
            "https://media.s3.amazonaws.com/abc"
        );
    }

    #[tokio::test]
    async fn test_media_upload_without_body() {
        let (state, _, _) = test_state();
        let caller = Caller::new("host1", Role::Host);

        let response = media_upload(&state, &caller, b"").await.unwrap();
        assert_eq!(response.status(), 201);

        let body: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        let upload_url = body["uploadUrl"].as_str().unwrap();
        let download_url = body["downloadUrl"].as_str().unwrap();
        let key = download_url.strip_prefix("https://media.s3.amazonaws.com/").unwrap();
        assert!(upload_url.contains(key));
    }

    #[tokio::test]
    async fn test_media_upload_signs_content_type() {
        let (state, _, _) = test_state();
        let caller = Caller::new("cw1", Role::Caseworker);

        let response = media_upload(&state, &caller, br#"{"contentType":"image/png"}"#)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        assert!(body["uploadUrl"].as_str().unwrap().contains("image%2Fpng"));
    }

    #[tokio::test]
    async fn test_media_upload_requires_a_role() {
        let (state, _, _) = test_state();
        let caller = Caller {
            username: "nobody".to_string(),
            groups: vec![],
        };
        let err = media_upload(&state, &caller, b"").await.unwrap_err();
        assert!(matches!(err, ApiError::Forbidden));
    }

    #[tokio::test]
    async fn test_media_upload_rejects_malformed_body() {
        let (state, _, _) = test_state();
        let caller = Caller::new("host1", Role::Host);
        let err = media_upload(&state, &caller, b"{nope").await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }
}
