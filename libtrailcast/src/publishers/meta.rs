//! Facebook/Instagram page publishing via the Meta Graph API
//!
//! Posts go to the configured page. A post with a media reference becomes
//! a photo post (the Graph API fetches the image from the URL itself);
//! without one it becomes a plain feed message.

use async_trait::async_trait;
use serde::Deserialize;

use super::{error_for_status, PublishRequest, Publisher};
use crate::error::PublishError;
use crate::types::PlatformId;

const GRAPH_API_BASE: &str = "https://graph.facebook.com/v19.0";

// Both Facebook and Instagram cap captions at 2200 characters
const CAPTION_LIMIT: usize = 2200;

pub struct MetaPublisher {
    page_id: String,
    token: String,
    client: reqwest::Client,
    api_base: String,
}

impl MetaPublisher {
    pub fn new(page_id: String, token: String) -> Self {
        Self {
            page_id,
            token,
            client: reqwest::Client::new(),
            api_base: GRAPH_API_BASE.to_string(),
        }
    }

    #[cfg(test)]
    pub fn with_api_base(page_id: String, token: String, api_base: String) -> Self {
        Self {
            page_id,
            token,
            client: reqwest::Client::new(),
            api_base,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GraphPostResponse {
    id: String,
}

#[async_trait]
impl Publisher for MetaPublisher {
    fn platform(&self) -> PlatformId {
        PlatformId::FacebookInstagram
    }

    fn validate(&self, request: &PublishRequest) -> Result<(), PublishError> {
        if request.caption.is_empty() {
            return Err(PublishError::Validation("caption is empty".to_string()));
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
        // Photo posts take a URL the Graph API fetches itself; text posts
        // go straight to the feed.
        let (endpoint, params) = match &request.media_ref {
            Some(media_url) => (
                format!("{}/{}/photos", self.api_base, self.page_id),
                vec![
                    ("url", media_url.clone()),
                    ("caption", request.caption.clone()),
                ],
            ),
            None => (
                format!("{}/{}/feed", self.api_base, self.page_id),
                vec![("message", request.caption.clone())],
            ),
        };

        let response = self
            .client
            .post(&endpoint)
            .bearer_auth(&self.token)
            .form(&params)
            .send()
            .await
            .map_err(|e| PublishError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(error_for_status(status, &detail));
        }

        let parsed: GraphPostResponse = response
            .json()
            .await
            .map_err(|e| PublishError::Remote(format!("invalid response body: {}", e)))?;

        Ok(parsed.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(caption: &str, media_ref: Option<&str>) -> PublishRequest {
        PublishRequest {
            content_id: "c-1".to_string(),
            title: "Top Safari Lodges in Queen Elizabeth NP".to_string(),
            summary: "Sunrise views over the Kazinga Channel.".to_string(),
            caption: caption.to_string(),
            media_ref: media_ref.map(String::from),
        }
    }

    #[test]
    fn test_platform_id() {
        let publisher = MetaPublisher::new("page-1".to_string(), "token".to_string());
        assert_eq!(publisher.platform(), PlatformId::FacebookInstagram);
    }

    #[test]
    fn test_validate_accepts_normal_caption() {
        let publisher = MetaPublisher::new("page-1".to_string(), "token".to_string());
        assert!(publisher.validate(&request("A fine caption", None)).is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_caption() {
        let publisher = MetaPublisher::new("page-1".to_string(), "token".to_string());
        let result = publisher.validate(&request("", None));
        assert!(matches!(result, Err(PublishError::Validation(_))));
    }

    #[test]
    fn test_validate_rejects_oversized_caption() {
        let publisher = MetaPublisher::new("page-1".to_string(), "token".to_string());
        let long = "x".repeat(CAPTION_LIMIT + 1);
        let result = publisher.validate(&request(&long, None));
        assert!(matches!(result, Err(PublishError::Validation(_))));
    }

    #[tokio::test]
    async fn test_publish_network_error_maps_cleanly() {
        // Unroutable port: the request fails before any HTTP exchange
        let publisher = MetaPublisher::with_api_base(
            "page-1".to_string(),
            "token".to_string(),
            "http://127.0.0.1:1".to_string(),
        );

        let result = publisher.publish(&request("caption", None)).await;
        assert!(matches!(result, Err(PublishError::Network(_))));
    }
}
