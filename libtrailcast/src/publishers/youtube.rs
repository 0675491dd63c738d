//! YouTube video publishing via the Data API v3
//!
//! Uses the multipart upload endpoint: a JSON metadata part built from
//! the item's title and caption, followed by the video bytes. YouTube
//! only takes uploads, so a media reference pointing at a local file is
//! required.

use async_trait::async_trait;
use serde::Deserialize;

use super::{error_for_status, PublishRequest, Publisher};
use crate::error::PublishError;
use crate::types::PlatformId;

const UPLOAD_URL: &str =
    "https://www.googleapis.com/upload/youtube/v3/videos?part=snippet,status&uploadType=multipart";

const TITLE_LIMIT: usize = 100;
const DESCRIPTION_LIMIT: usize = 5000;

pub struct YouTubePublisher {
    token: String,
    client: reqwest::Client,
    upload_url: String,
}

impl YouTubePublisher {
    pub fn new(token: String) -> Self {
        Self {
            token,
            client: reqwest::Client::new(),
            upload_url: UPLOAD_URL.to_string(),
        }
    }

    #[cfg(test)]
    pub fn with_upload_url(token: String, upload_url: String) -> Self {
        Self {
            token,
            client: reqwest::Client::new(),
            upload_url,
        }
    }
}

#[derive(Debug, Deserialize)]
struct VideoResponse {
    id: String,
}

#[async_trait]
impl Publisher for YouTubePublisher {
    fn platform(&self) -> PlatformId {
        PlatformId::YouTube
    }

    fn validate(&self, request: &PublishRequest) -> Result<(), PublishError> {
        let Some(media_ref) = &request.media_ref else {
            return Err(PublishError::Validation(
                "YouTube posts require a video media reference".to_string(),
            ));
        };
        if media_ref.starts_with("http://") || media_ref.starts_with("https://") {
            return Err(PublishError::Validation(
                "YouTube uploads need a local video file, not a remote URL".to_string(),
            ));
        }
        if request.title.chars().count() > TITLE_LIMIT {
            return Err(PublishError::Validation(format!(
                "title exceeds the {} character limit",
                TITLE_LIMIT
            )));
        }
        if request.caption.chars().count() > DESCRIPTION_LIMIT {
            return Err(PublishError::Validation(format!(
                "description exceeds the {} character limit",
                DESCRIPTION_LIMIT
            )));
        }
        Ok(())
    }

    async fn publish(&self, request: &PublishRequest) -> Result<String, PublishError> {
        let media_ref = request.media_ref.as_deref().ok_or_else(|| {
            PublishError::Validation("YouTube posts require a video media reference".to_string())
        })?;

        let path = shellexpand::tilde(media_ref).to_string();
        let video_bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| PublishError::Validation(format!("cannot read video {}: {}", path, e)))?;

        let metadata = serde_json::json!({
            "snippet": {
                "title": request.title,
                "description": request.caption,
            },
            "status": {
                "privacyStatus": "public",
            },
        });

        let form = reqwest::multipart::Form::new()
            .part(
                "metadata",
                reqwest::multipart::Part::text(metadata.to_string())
                    .mime_str("application/json")
                    .map_err(|e| PublishError::Remote(e.to_string()))?,
            )
            .part(
                "video",
                reqwest::multipart::Part::bytes(video_bytes)
                    .mime_str("application/octet-stream")
                    .map_err(|e| PublishError::Remote(e.to_string()))?,
            );

        let response = self
            .client
            .post(&self.upload_url)
            .bearer_auth(&self.token)
            .multipart(form)
            .send()
            .await
            .map_err(|e| PublishError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(error_for_status(status, &detail));
        }

        let parsed: VideoResponse = response
            .json()
            .await
            .map_err(|e| PublishError::Remote(format!("invalid response body: {}", e)))?;

        Ok(parsed.id)
    }
}
