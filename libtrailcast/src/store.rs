//! Schedule store: durable record of content items, schedule entries
//! and per-platform post results
//!
//! The store exclusively owns the ScheduleEntry lifecycle. All status
//! mutation goes through conditional single-statement updates so that a
//! scheduler tick and a manual "post now" racing on the same entry can
//! never both dispatch it.

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::Path;

use crate::error::{Result, StoreError};
use crate::types::{ContentItem, EntryStatus, PlatformId, PostOutcome, PostResult, ScheduleEntry};

/// Per-status entry counts for queue inspection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub pending: i64,
    pub dispatching: i64,
    pub succeeded: i64,
    pub partially_failed: i64,
    pub failed: i64,
    pub cancelled: i64,
}

impl QueueStats {
    pub fn total(&self) -> i64 {
        self.pending
            + self.dispatching
            + self.succeeded
            + self.partially_failed
            + self.failed
            + self.cancelled
    }
}

/// Entries reset or failed by a startup recovery pass
#[derive(Debug, Clone, Default)]
pub struct RecoveryReport {
    pub retried: Vec<String>,
    pub failed: Vec<String>,
}

#[derive(Clone)]
pub struct ScheduleStore {
    pool: SqlitePool,
}

impl ScheduleStore {
    /// Open (or create) the store at the given path and run migrations
    pub async fn new(db_path: &str) -> Result<Self> {
        let pool = if db_path == ":memory:" {
            // A pooled in-memory database would give every connection its
            // own empty database, so pin it to a single connection.
            SqlitePoolOptions::new()
                .max_connections(1)
                .connect("sqlite::memory:")
                .await
                .map_err(StoreError::SqlxError)?
        } else {
            let expanded_path = shellexpand::tilde(db_path).to_string();
            let path = Path::new(&expanded_path);

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(StoreError::IoError)?;
            }

            // Forward slashes work on both Windows and Unix; mode=rwc
            // creates the database file if it doesn't exist.
            let db_url = format!("sqlite://{}?mode=rwc", expanded_path.replace('\\', "/"));

            SqlitePool::connect(&db_url)
                .await
                .map_err(StoreError::SqlxError)?
        };

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(StoreError::MigrationError)?;

        Ok(Self { pool })
    }

    // ========================================================================
    // Content items
    // ========================================================================

    pub async fn create_content_item(&self, item: &ContentItem) -> Result<()> {
        let tags = serde_json::to_string(&item.tags)
            .map_err(|e| crate::error::TrailcastError::InvalidInput(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO content_items (id, title, summary, tags, media_ref, caption, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&item.id)
        .bind(&item.title)
        .bind(&item.summary)
        .bind(tags)
        .bind(&item.media_ref)
        .bind(&item.caption)
        .bind(item.created_at)
        .execute(&self.pool)
        .await
        .map_err(StoreError::SqlxError)?;

        Ok(())
    }

    pub async fn get_content_item(&self, id: &str) -> Result<ContentItem> {
        let row = sqlx::query(
            r#"
            SELECT id, title, summary, tags, media_ref, caption, created_at
            FROM content_items WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::SqlxError)?;

        row.map(item_from_row)
            .transpose()?
            .ok_or_else(|| StoreError::ContentNotFound(id.to_string()).into())
    }

    pub async fn list_content_items(&self, limit: usize) -> Result<Vec<ContentItem>> {
        let rows = sqlx::query(
            r#"
            SELECT id, title, summary, tags, media_ref, caption, created_at
            FROM content_items
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::SqlxError)?;

        rows.into_iter().map(item_from_row).collect()
    }

    /// Update a content item's caption
    ///
    /// Captions stay editable only while every referencing entry is still
    /// Pending or Cancelled; once one has fired the item is frozen.
    pub async fn update_caption(&self, id: &str, caption: &str) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE content_items SET caption = ?
            WHERE id = ?
              AND NOT EXISTS (
                SELECT 1 FROM schedule_entries
                WHERE content_id = content_items.id
                  AND status NOT IN ('pending', 'cancelled')
              )
            "#,
        )
        .bind(caption)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(StoreError::SqlxError)?;

        if result.rows_affected() == 0 {
            // Distinguish "missing" from "frozen"
            self.get_content_item(id).await?;
            return Err(StoreError::ContentFrozen(id.to_string()).into());
        }

        Ok(())
    }

    /// Set the media reference for a content item (same freeze rule as captions)
    pub async fn update_media_ref(&self, id: &str, media_ref: &str) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE content_items SET media_ref = ?
            WHERE id = ?
              AND NOT EXISTS (
                SELECT 1 FROM schedule_entries
                WHERE content_id = content_items.id
                  AND status NOT IN ('pending', 'cancelled')
              )
            "#,
        )
        .bind(media_ref)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(StoreError::SqlxError)?;

        if result.rows_affected() == 0 {
            self.get_content_item(id).await?;
            return Err(StoreError::ContentFrozen(id.to_string()).into());
        }

        Ok(())
    }

    // ========================================================================
    // Schedule entries
    // ========================================================================

    /// Create a Pending entry for the given content and platforms
    pub async fn create_entry(
        &self,
        content_id: &str,
        platforms: Vec<PlatformId>,
        fire_at: i64,
    ) -> Result<ScheduleEntry> {
        // SQLite doesn't enforce the foreign key by default; check here so
        // a typo'd content id fails at creation, not at dispatch.
        self.get_content_item(content_id).await?;

        let entry = ScheduleEntry::new(content_id.to_string(), platforms, fire_at);
        let platforms_json = serde_json::to_string(&entry.platforms)
            .map_err(|e| crate::error::TrailcastError::InvalidInput(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO schedule_entries
                (id, content_id, platforms, fire_at, status, dispatch_attempts,
                 dispatch_started_at, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.content_id)
        .bind(platforms_json)
        .bind(entry.fire_at)
        .bind(entry.status.as_str())
        .bind(entry.dispatch_attempts)
        .bind(entry.dispatch_started_at)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await
        .map_err(StoreError::SqlxError)?;

        Ok(entry)
    }

    pub async fn get_entry(&self, id: &str) -> Result<ScheduleEntry> {
        let row = sqlx::query(
            r#"
            SELECT id, content_id, platforms, fire_at, status, dispatch_attempts,
                   dispatch_started_at, created_at
            FROM schedule_entries WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::SqlxError)?;

        row.map(entry_from_row)
            .transpose()?
            .ok_or_else(|| StoreError::EntryNotFound(id.to_string()).into())
    }

    pub async fn list_entries(&self, limit: usize) -> Result<Vec<ScheduleEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, content_id, platforms, fire_at, status, dispatch_attempts,
                   dispatch_started_at, created_at
            FROM schedule_entries
            ORDER BY fire_at ASC, rowid ASC
            LIMIT ?
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::SqlxError)?;

        rows.into_iter().map(entry_from_row).collect()
    }

    /// Pending entries whose fire time has passed, ordered by
    /// (fire_at, creation order) for fairness
    pub async fn due_entries(&self, now: i64) -> Result<Vec<ScheduleEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, content_id, platforms, fire_at, status, dispatch_attempts,
                   dispatch_started_at, created_at
            FROM schedule_entries
            WHERE status = 'pending' AND fire_at <= ?
            ORDER BY fire_at ASC, rowid ASC
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::SqlxError)?;

        rows.into_iter().map(entry_from_row).collect()
    }

    /// Atomically claim a Pending entry for dispatch
    ///
    /// Returns `false` when the entry is no longer Pending (already
    /// claimed, cancelled or completed); the caller must treat that as a
    /// no-op. This single conditional update is the at-most-once dispatch
    /// guarantee.
    pub async fn claim(&self, id: &str) -> Result<bool> {
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query(
            r#"
            UPDATE schedule_entries
            SET status = 'dispatching',
                dispatch_attempts = dispatch_attempts + 1,
                dispatch_started_at = ?
            WHERE id = ? AND status = 'pending'
            "#,
        )
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(StoreError::SqlxError)?;

        if result.rows_affected() > 0 {
            return Ok(true);
        }

        // Surface missing ids as an error; anything else is the benign race.
        self.get_entry(id).await?;
        Ok(false)
    }

    /// Cancel a Pending entry
    ///
    /// Rejected with `InvalidState` once dispatch has started; losing that
    /// race to the scheduler is documented and expected.
    pub async fn cancel(&self, id: &str) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE schedule_entries SET status = 'cancelled'
            WHERE id = ? AND status = 'pending'
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(StoreError::SqlxError)?;

        if result.rows_affected() == 0 {
            let entry = self.get_entry(id).await?;
            return Err(StoreError::InvalidState {
                id: id.to_string(),
                status: entry.status,
                operation: "cancel",
            }
            .into());
        }

        Ok(())
    }

    /// Move a Pending entry to a new fire time
    ///
    /// Same window as `cancel`: once dispatch has started the fire time is
    /// history, not a knob.
    pub async fn reschedule(&self, id: &str, fire_at: i64) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE schedule_entries SET fire_at = ?
            WHERE id = ? AND status = 'pending'
            "#,
        )
        .bind(fire_at)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(StoreError::SqlxError)?;

        if result.rows_affected() == 0 {
            let entry = self.get_entry(id).await?;
            return Err(StoreError::InvalidState {
                id: id.to_string(),
                status: entry.status,
                operation: "reschedule",
            }
            .into());
        }

        Ok(())
    }

    /// Move an entry to `new_status`, enforcing the monotonic state machine
    pub async fn transition(&self, id: &str, new_status: EntryStatus) -> Result<()> {
        let allowed_from: Vec<&str> = [
            EntryStatus::Pending,
            EntryStatus::Dispatching,
            EntryStatus::Succeeded,
            EntryStatus::PartiallyFailed,
            EntryStatus::Failed,
            EntryStatus::Cancelled,
        ]
        .iter()
        .filter(|from| from.can_transition_to(new_status))
        .map(|from| from.as_str())
        .collect();

        if !allowed_from.is_empty() {
            // allowed_from holds fixed enum strings, never user input
            let placeholders = vec!["?"; allowed_from.len()].join(", ");
            let sql = format!(
                "UPDATE schedule_entries SET status = ? WHERE id = ? AND status IN ({})",
                placeholders
            );

            let mut query = sqlx::query(&sql).bind(new_status.as_str()).bind(id);
            for from in &allowed_from {
                query = query.bind(*from);
            }

            let result = query.execute(&self.pool).await.map_err(StoreError::SqlxError)?;
            if result.rows_affected() > 0 {
                return Ok(());
            }
        }

        let entry = self.get_entry(id).await?;
        Err(StoreError::InvalidTransition {
            id: id.to_string(),
            from: entry.status,
            to: new_status,
        }
        .into())
    }

    /// Reset or fail entries stuck in Dispatching after a restart
    ///
    /// Entries whose dispatch started more than `grace_secs` ago were
    /// interrupted mid-flight. Each gets retried (reset to Pending) while
    /// it has attempts left, otherwise it is marked Failed with a
    /// synthesized result per target platform for audit. This reset is the
    /// one sanctioned exception to the monotonic state machine.
    pub async fn recover_interrupted(
        &self,
        now: i64,
        grace_secs: i64,
        max_attempts: i64,
    ) -> Result<RecoveryReport> {
        let cutoff = now - grace_secs;

        let stuck = sqlx::query(
            r#"
            SELECT id, content_id, platforms, fire_at, status, dispatch_attempts,
                   dispatch_started_at, created_at
            FROM schedule_entries
            WHERE status = 'dispatching'
              AND dispatch_started_at IS NOT NULL
              AND dispatch_started_at <= ?
            ORDER BY dispatch_started_at ASC
            "#,
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::SqlxError)?;

        let mut report = RecoveryReport::default();

        for row in stuck {
            let entry = entry_from_row(row)?;

            if entry.dispatch_attempts < max_attempts {
                let result = sqlx::query(
                    r#"
                    UPDATE schedule_entries
                    SET status = 'pending', dispatch_started_at = NULL
                    WHERE id = ? AND status = 'dispatching'
                    "#,
                )
                .bind(&entry.id)
                .execute(&self.pool)
                .await
                .map_err(StoreError::SqlxError)?;

                if result.rows_affected() > 0 {
                    report.retried.push(entry.id);
                }
            } else {
                let result = sqlx::query(
                    r#"
                    UPDATE schedule_entries SET status = 'failed'
                    WHERE id = ? AND status = 'dispatching'
                    "#,
                )
                .bind(&entry.id)
                .execute(&self.pool)
                .await
                .map_err(StoreError::SqlxError)?;

                if result.rows_affected() > 0 {
                    for platform in &entry.platforms {
                        let already_done = self
                            .results_for(&entry.id)
                            .await?
                            .iter()
                            .any(|r| r.platform == *platform);
                        if !already_done {
                            self.record_result(&PostResult::failed(
                                &entry.id,
                                *platform,
                                "dispatch interrupted; retry budget exhausted".to_string(),
                            ))
                            .await?;
                        }
                    }
                    report.failed.push(entry.id);
                }
            }
        }

        Ok(report)
    }

    // ========================================================================
    // Post results
    // ========================================================================

    pub async fn record_result(&self, result: &PostResult) -> Result<()> {
        let (success, remote_id, error) = match &result.outcome {
            PostOutcome::Posted { remote_id } => (1, Some(remote_id.clone()), None),
            PostOutcome::Failed { reason } => (0, None, Some(reason.clone())),
        };

        sqlx::query(
            r#"
            INSERT INTO post_results (entry_id, platform, success, remote_id, error, completed_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&result.entry_id)
        .bind(result.platform.as_str())
        .bind(success)
        .bind(remote_id)
        .bind(error)
        .bind(result.completed_at)
        .execute(&self.pool)
        .await
        .map_err(StoreError::SqlxError)?;

        Ok(())
    }

    pub async fn results_for(&self, entry_id: &str) -> Result<Vec<PostResult>> {
        let rows = sqlx::query(
            r#"
            SELECT id, entry_id, platform, success, remote_id, error, completed_at
            FROM post_results
            WHERE entry_id = ?
            ORDER BY id ASC
            "#,
        )
        .bind(entry_id)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::SqlxError)?;

        rows.into_iter().map(result_from_row).collect()
    }

    pub async fn stats(&self) -> Result<QueueStats> {
        let rows = sqlx::query(
            r#"
            SELECT status, COUNT(*) AS n FROM schedule_entries GROUP BY status
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::SqlxError)?;

        let mut stats = QueueStats::default();
        for row in rows {
            let status: String = row.get("status");
            let n: i64 = row.get("n");
            match EntryStatus::parse(&status) {
                Some(EntryStatus::Pending) => stats.pending = n,
                Some(EntryStatus::Dispatching) => stats.dispatching = n,
                Some(EntryStatus::Succeeded) => stats.succeeded = n,
                Some(EntryStatus::PartiallyFailed) => stats.partially_failed = n,
                Some(EntryStatus::Failed) => stats.failed = n,
                Some(EntryStatus::Cancelled) => stats.cancelled = n,
                None => {}
            }
        }

        Ok(stats)
    }
}

fn item_from_row(row: sqlx::sqlite::SqliteRow) -> Result<ContentItem> {
    let tags: String = row.get("tags");
    let tags: Vec<String> = serde_json::from_str(&tags).unwrap_or_default();

    Ok(ContentItem {
        id: row.get("id"),
        title: row.get("title"),
        summary: row.get("summary"),
        tags,
        media_ref: row.get("media_ref"),
        caption: row.get("caption"),
        created_at: row.get("created_at"),
    })
}

fn entry_from_row(row: sqlx::sqlite::SqliteRow) -> Result<ScheduleEntry> {
    let platforms: String = row.get("platforms");
    let platforms: Vec<PlatformId> = serde_json::from_str(&platforms).unwrap_or_default();
    let status: String = row.get("status");

    Ok(ScheduleEntry {
        id: row.get("id"),
        content_id: row.get("content_id"),
        platforms,
        fire_at: row.get("fire_at"),
        status: EntryStatus::parse(&status).unwrap_or(EntryStatus::Pending),
        dispatch_attempts: row.get("dispatch_attempts"),
        dispatch_started_at: row.get("dispatch_started_at"),
        created_at: row.get("created_at"),
    })
}

fn result_from_row(row: sqlx::sqlite::SqliteRow) -> Result<PostResult> {
    use std::str::FromStr;

    let platform: String = row.get("platform");
    let platform = PlatformId::from_str(&platform)
        .map_err(crate::error::TrailcastError::InvalidInput)?;

    let success: i64 = row.get("success");
    let outcome = if success != 0 {
        PostOutcome::Posted {
            remote_id: row.get::<Option<String>, _>("remote_id").unwrap_or_default(),
        }
    } else {
        PostOutcome::Failed {
            reason: row.get::<Option<String>, _>("error").unwrap_or_default(),
        }
    };

    Ok(PostResult {
        id: row.get("id"),
        entry_id: row.get("entry_id"),
        platform,
        outcome,
        completed_at: row.get("completed_at"),
    })
}
