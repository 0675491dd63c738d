//! Dispatch: claim a due entry and fan out to its target platforms
//!
//! One dispatch is claim, publish to every target concurrently, record
//! the per-platform results, then settle the entry's terminal status.
//! The claim is atomic, so an entry is published at most once no matter
//! how many schedulers or CLI invocations race on it.

use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::caption::CaptionGateway;
use crate::error::Result;
use crate::publishers::{PublishRequest, Publisher};
use crate::store::ScheduleStore;
use crate::types::{EntryStatus, PlatformId, PostResult, ScheduleEntry};

/// What one dispatch attempt did
#[derive(Debug)]
pub enum DispatchOutcome {
    /// The entry was claimed and dispatched; holds the settled status
    /// and the per-platform results
    Dispatched(EntryStatus, Vec<PostResult>),
    /// Someone else got the claim first (or the entry was cancelled)
    Skipped,
}

pub struct Dispatcher {
    store: ScheduleStore,
    publishers: HashMap<PlatformId, Arc<dyn Publisher>>,
    caption: Arc<CaptionGateway>,
    publish_timeout: Duration,
}

impl Dispatcher {
    pub fn new(
        store: ScheduleStore,
        publishers: Vec<Arc<dyn Publisher>>,
        caption: Arc<CaptionGateway>,
        publish_timeout: Duration,
    ) -> Self {
        let publishers = publishers
            .into_iter()
            .map(|p| (p.platform(), p))
            .collect();

        Self {
            store,
            publishers,
            caption,
            publish_timeout,
        }
    }

    pub fn configured_platforms(&self) -> Vec<PlatformId> {
        self.publishers.keys().copied().collect()
    }

    /// Dispatch a single entry end to end
    ///
    /// Returns `Skipped` without touching any platform when the claim is
    /// lost. Publish failures never propagate as errors; they become
    /// failed results and show up in the settled status.
    pub async fn dispatch(&self, entry_id: &str) -> Result<DispatchOutcome> {
        if !self.store.claim(entry_id).await? {
            return Ok(DispatchOutcome::Skipped);
        }

        let entry = self.store.get_entry(entry_id).await?;
        let item = self.store.get_content_item(&entry.content_id).await?;

        // Use the stored caption when one exists; otherwise generate on
        // the spot (template fallback keeps this infallible).
        let caption = match &item.caption {
            Some(caption) => caption.clone(),
            None => self.caption.generate(&item).await.text,
        };

        let request = PublishRequest::from_item(&item, caption);
        let results = self.publish_all(&entry, &request).await;

        for result in &results {
            self.store.record_result(result).await?;
        }

        let status = settle_status(&results);
        if let Err(e) = self.store.transition(entry_id, status).await {
            // Unreachable while this dispatch holds the claim; if the
            // entry moved anyway, log it and force Failed rather than
            // leaving it stuck in Dispatching.
            error!(entry_id, status = %status, error = %e, "Could not settle entry status");
            if status != EntryStatus::Failed {
                if let Err(e) = self.store.transition(entry_id, EntryStatus::Failed).await {
                    error!(entry_id, error = %e, "Could not mark entry failed");
                }
            }
        }

        let succeeded = results.iter().filter(|r| r.is_success()).count();
        info!(
            entry_id,
            status = %status,
            succeeded,
            failed = results.len() - succeeded,
            "Dispatch complete"
        );

        Ok(DispatchOutcome::Dispatched(status, results))
    }

    async fn publish_all(&self, entry: &ScheduleEntry, request: &PublishRequest) -> Vec<PostResult> {
        let attempts = entry.platforms.iter().map(|platform| {
            let platform = *platform;
            async move {
                let Some(publisher) = self.publishers.get(&platform) else {
                    warn!(entry_id = %entry.id, %platform, "No publisher configured, recording failure");
                    return PostResult::failed(
                        &entry.id,
                        platform,
                        "platform not configured".to_string(),
                    );
                };

                if let Err(e) = publisher.validate(request) {
                    return PostResult::failed(&entry.id, platform, e.to_string());
                }

                match timeout(self.publish_timeout, publisher.publish(request)).await {
                    Ok(Ok(remote_id)) => {
                        info!(entry_id = %entry.id, %platform, remote_id, "Posted");
                        PostResult::posted(&entry.id, platform, remote_id)
                    }
                    Ok(Err(e)) => {
                        warn!(entry_id = %entry.id, %platform, error = %e, "Publish failed");
                        PostResult::failed(&entry.id, platform, e.to_string())
                    }
                    Err(_) => {
                        warn!(
                            entry_id = %entry.id,
                            %platform,
                            timeout_secs = self.publish_timeout.as_secs(),
                            "Publish timed out"
                        );
                        PostResult::failed(
                            &entry.id,
                            platform,
                            format!("timed out after {}s", self.publish_timeout.as_secs()),
                        )
                    }
                }
            }
        });

        join_all(attempts).await
    }
}

/// Settle an entry's terminal status from its per-platform results
fn settle_status(results: &[PostResult]) -> EntryStatus {
    let succeeded = results.iter().filter(|r| r.is_success()).count();
    if succeeded == results.len() && !results.is_empty() {
        EntryStatus::Succeeded
    } else if succeeded > 0 {
        EntryStatus::PartiallyFailed
    } else {
        EntryStatus::Failed
    }
}
