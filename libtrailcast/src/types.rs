//! Core types for Trailcast

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A target platform for publishing
///
/// Instagram and Facebook share the Meta Graph API and are treated as a
/// single publishing target, matching how the page token works.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum PlatformId {
    FacebookInstagram,
    YouTube,
    TikTok,
}

impl PlatformId {
    /// Canonical lowercase identifier used in the database and config
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FacebookInstagram => "facebook_instagram",
            Self::YouTube => "youtube",
            Self::TikTok => "tiktok",
        }
    }

    /// All known platforms
    pub fn all() -> [PlatformId; 3] {
        [Self::FacebookInstagram, Self::YouTube, Self::TikTok]
    }
}

impl std::fmt::Display for PlatformId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PlatformId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "facebook_instagram" | "facebook" | "instagram" | "meta" => {
                Ok(Self::FacebookInstagram)
            }
            "youtube" => Ok(Self::YouTube),
            "tiktok" => Ok(Self::TikTok),
            _ => Err(format!(
                "Unknown platform: '{}'. Valid options: instagram, facebook, youtube, tiktok",
                s
            )),
        }
    }
}

/// Lifecycle status of a schedule entry
///
/// Transitions are monotonic: Pending -> Dispatching -> one of
/// {Succeeded, PartiallyFailed, Failed}, or Pending -> Cancelled.
/// An entry is never dispatched twice.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum EntryStatus {
    Pending,
    Dispatching,
    Succeeded,
    PartiallyFailed,
    Failed,
    Cancelled,
}

impl EntryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Dispatching => "dispatching",
            Self::Succeeded => "succeeded",
            Self::PartiallyFailed => "partially_failed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "dispatching" => Some(Self::Dispatching),
            "succeeded" => Some(Self::Succeeded),
            "partially_failed" => Some(Self::PartiallyFailed),
            "failed" => Some(Self::Failed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Whether the entry will never change status again
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Succeeded | Self::PartiallyFailed | Self::Failed | Self::Cancelled
        )
    }

    /// Whether the state machine permits moving to `next`
    pub fn can_transition_to(&self, next: EntryStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Dispatching)
                | (Self::Pending, Self::Cancelled)
                | (Self::Dispatching, Self::Succeeded)
                | (Self::Dispatching, Self::PartiallyFailed)
                | (Self::Dispatching, Self::Failed)
        )
    }
}

impl std::fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A candidate post: title, summary, tags, optional media and caption
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub tags: Vec<String>,
    /// Opaque media reference (local path or remote URI), passed through
    /// to publishers untouched
    pub media_ref: Option<String>,
    /// Generated or user-edited caption; editable until a referencing
    /// schedule entry fires
    pub caption: Option<String>,
    pub created_at: i64,
}

impl ContentItem {
    pub fn new(title: String, summary: String, tags: Vec<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title,
            summary,
            tags,
            media_ref: None,
            caption: None,
            created_at: chrono::Utc::now().timestamp(),
        }
    }
}

/// A scheduled posting task referencing one content item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub id: String,
    pub content_id: String,
    pub platforms: Vec<PlatformId>,
    /// Absolute fire time (Unix timestamp)
    pub fire_at: i64,
    pub status: EntryStatus,
    /// Number of times a dispatch has been started for this entry,
    /// including interrupted attempts recovered after a restart
    pub dispatch_attempts: i64,
    pub dispatch_started_at: Option<i64>,
    pub created_at: i64,
}

impl ScheduleEntry {
    pub fn new(content_id: String, platforms: Vec<PlatformId>, fire_at: i64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content_id,
            platforms,
            fire_at,
            status: EntryStatus::Pending,
            dispatch_attempts: 0,
            dispatch_started_at: None,
            created_at: chrono::Utc::now().timestamp(),
        }
    }
}

/// Outcome of one platform publish attempt
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum PostOutcome {
    /// The platform accepted the post and returned its identifier
    Posted { remote_id: String },
    /// The attempt failed; the reason is recorded for audit
    Failed { reason: String },
}

/// Immutable record of one platform attempt for a schedule entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostResult {
    /// Database row ID (None for records not yet stored)
    pub id: Option<i64>,
    pub entry_id: String,
    pub platform: PlatformId,
    pub outcome: PostOutcome,
    pub completed_at: i64,
}

impl PostResult {
    pub fn posted(entry_id: &str, platform: PlatformId, remote_id: String) -> Self {
        Self {
            id: None,
            entry_id: entry_id.to_string(),
            platform,
            outcome: PostOutcome::Posted { remote_id },
            completed_at: chrono::Utc::now().timestamp(),
        }
    }

    pub fn failed(entry_id: &str, platform: PlatformId, reason: String) -> Self {
        Self {
            id: None,
            entry_id: entry_id.to_string(),
            platform,
            outcome: PostOutcome::Failed { reason },
            completed_at: chrono::Utc::now().timestamp(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, PostOutcome::Posted { .. })
    }
}
