//! TikTok video publishing via the Content Posting API
//!
//! Remote media references use the PULL_FROM_URL flow where TikTok
//! fetches the video itself. Local files use the FILE_UPLOAD flow: an
//! init call returns an upload URL, the bytes go there in one chunk.
//! Either way the publish id from the init call identifies the post.

use async_trait::async_trait;
use serde::Deserialize;

use super::{error_for_status, PublishRequest, Publisher};
use crate::error::PublishError;
use crate::types::PlatformId;

const API_BASE: &str = "https://open.tiktokapis.com/v2";

const CAPTION_LIMIT: usize = 2200;

pub struct TikTokPublisher {
    token: String,
    client: reqwest::Client,
    api_base: String,
}

impl TikTokPublisher {
    pub fn new(token: String) -> Self {
        Self {
            token,
            client: reqwest::Client::new(),
            api_base: API_BASE.to_string(),
        }
    }

    #[cfg(test)]
    pub fn with_api_base(token: String, api_base: String) -> Self {
        Self {
            token,
            client: reqwest::Client::new(),
            api_base,
        }
    }

    async fn init_post(
        &self,
        body: serde_json::Value,
    ) -> Result<InitData, PublishError> {
        let response = self
            .client
            .post(format!("{}/post/publish/video/init/", self.api_base))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| PublishError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(error_for_status(status, &detail));
        }

        let parsed: InitResponse = response
            .json()
            .await
            .map_err(|e| PublishError::Remote(format!("invalid response body: {}", e)))?;

        Ok(parsed.data)
    }
}

#[derive(Debug, Deserialize)]
struct InitResponse {
    data: InitData,
}

#[derive(Debug, Deserialize)]
struct InitData {
    publish_id: String,
    upload_url: Option<String>,
}

#[async_trait]
impl Publisher for TikTokPublisher {
    fn platform(&self) -> PlatformId {
        PlatformId::TikTok
    }

    fn validate(&self, request: &PublishRequest) -> Result<(), PublishError> {
        if request.media_ref.is_none() {
            return Err(PublishError::Validation(
                "TikTok posts require a video media reference".to_string(),
            ));
        }
        if request.caption.chars().count() > CAPTION_LIMIT {
            return Err(PublishError::Validation(format!(
                "caption exceeds the {} character limit",
                CAPTION_LIMIT
            )));
        }
        Ok(())
    }

    async fn publish(&self, request: &PublishRequest) -> Result<String, PublishError> {
        let media_ref = request.media_ref.as_deref().ok_or_else(|| {
            PublishError::Validation("TikTok posts require a video media reference".to_string())
        })?;

        let post_info = serde_json::json!({
            "title": request.caption,
            "privacy_level": "PUBLIC_TO_EVERYONE",
        });

        if media_ref.starts_with("http://") || media_ref.starts_with("https://") {
            let data = self
                .init_post(serde_json::json!({
                    "post_info": post_info,
                    "source_info": {
                        "source": "PULL_FROM_URL",
                        "video_url": media_ref,
                    },
                }))
                .await?;
            return Ok(data.publish_id);
        }

        // Local file: single-chunk upload
        let path = shellexpand::tilde(media_ref).to_string();
        let video_bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| PublishError::Validation(format!("cannot read video {}: {}", path, e)))?;
        let size = video_bytes.len();

        let data = self
            .init_post(serde_json::json!({
                "post_info": post_info,
                "source_info": {
                    "source": "FILE_UPLOAD",
                    "video_size": size,
                    "chunk_size": size,
                    "total_chunk_count": 1,
                },
            }))
            .await?;

        let upload_url = data.upload_url.ok_or_else(|| {
            PublishError::Remote("init response missing upload_url".to_string())
        })?;

        let response = self
            .client
            .put(&upload_url)
            .header(
                reqwest::header::CONTENT_RANGE,
                format!("bytes 0-{}/{}", size.saturating_sub(1), size),
            )
            .header(reqwest::header::CONTENT_TYPE, "video/mp4")
            .body(video_bytes)
            .send()
            .await
            .map_err(|e| PublishError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(error_for_status(status, &detail));
        }

        Ok(data.publish_id)
    }
}
