//! Publisher abstraction and platform implementations
//!
//! Each publisher wraps one platform API behind a uniform trait so the
//! dispatcher never needs platform-specific handling. An absent or
//! unreadable credential disables the platform instead of erroring; the
//! queue keeps working with whatever capabilities remain.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::PublishError;
use crate::types::{ContentItem, PlatformId};

pub mod meta;
pub mod tiktok;
pub mod youtube;

// Available outside cfg(test) so integration tests and the daemon's
// dry-run mode can use it.
pub mod mock;

/// Everything a publisher needs for one post
#[derive(Debug, Clone)]
pub struct PublishRequest {
    pub content_id: String,
    pub title: String,
    pub summary: String,
    pub caption: String,
    /// Opaque media reference: a local path or a remote URI
    pub media_ref: Option<String>,
}

impl PublishRequest {
    pub fn from_item(item: &ContentItem, caption: String) -> Self {
        Self {
            content_id: item.id.clone(),
            title: item.title.clone(),
            summary: item.summary.clone(),
            caption,
            media_ref: item.media_ref.clone(),
        }
    }
}

/// Uniform interface over platform posting APIs
#[async_trait]
pub trait Publisher: Send + Sync {
    /// The platform this publisher posts to
    fn platform(&self) -> PlatformId;

    /// Cheap local checks before any network traffic, such as caption
    /// length limits and whether the platform needs media
    fn validate(&self, request: &PublishRequest) -> Result<(), PublishError>;

    /// Publish the post and return the platform's identifier for it
    ///
    /// Callers own the deadline; implementations may block on the network
    /// for as long as the platform takes.
    async fn publish(&self, request: &PublishRequest) -> Result<String, PublishError>;
}

/// Read a credential file, treating absence as "capability disabled"
pub(crate) fn read_token(token_file: &str, platform: &str) -> Option<String> {
    let path = shellexpand::tilde(token_file).to_string();
    match std::fs::read_to_string(&path) {
        Ok(contents) => {
            let token = contents.trim().to_string();
            if token.is_empty() {
                warn!(platform, token_file = %path, "Token file is empty, platform disabled");
                None
            } else {
                Some(token)
            }
        }
        Err(e) => {
            warn!(platform, token_file = %path, error = %e, "Cannot read token file, platform disabled");
            None
        }
    }
}

/// Map an HTTP error status to a publish error
pub(crate) fn error_for_status(status: reqwest::StatusCode, detail: &str) -> PublishError {
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        PublishError::Authentication(format!("HTTP {}: {}", status.as_u16(), detail))
    } else {
        PublishError::Remote(format!("HTTP {}: {}", status.as_u16(), detail))
    }
}

/// Build publishers for every enabled, credentialed platform in the config
///
/// Disabled sections are skipped quietly; enabled sections with missing
/// credentials are skipped with a warning. The returned list may be empty.
pub fn create_publishers(config: &Config) -> Vec<Arc<dyn Publisher>> {
    let mut publishers: Vec<Arc<dyn Publisher>> = Vec::new();

    if let Some(meta) = &config.meta {
        if !meta.enabled {
            debug!("Facebook/Instagram publishing disabled in config");
        } else if let Some(token) = read_token(&meta.token_file, "facebook_instagram") {
            publishers.push(Arc::new(meta::MetaPublisher::new(
                meta.page_id.clone(),
                token,
            )));
        }
    }

    if let Some(youtube) = &config.youtube {
        if !youtube.enabled {
            debug!("YouTube publishing disabled in config");
        } else if let Some(token) = read_token(&youtube.token_file, "youtube") {
            publishers.push(Arc::new(youtube::YouTubePublisher::new(token)));
        }
    }

    if let Some(tiktok) = &config.tiktok {
        if !tiktok.enabled {
            debug!("TikTok publishing disabled in config");
        } else if let Some(token) = read_token(&tiktok.token_file, "tiktok") {
            publishers.push(Arc::new(tiktok::TikTokPublisher::new(token)));
        }
    }

    publishers
}
