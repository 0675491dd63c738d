//! Mock publisher for testing dispatch logic
//!
//! Configurable successes, failures and delays, with call counting so
//! tests can assert how many publish attempts actually happened without
//! credentials or network access.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

use super::{PublishRequest, Publisher};
use crate::error::PublishError;
use crate::types::PlatformId;

#[derive(Clone)]
pub struct MockPublisher {
    platform: PlatformId,
    outcome: MockOutcome,
    delay: Duration,
    publish_calls: Arc<Mutex<usize>>,
    published_captions: Arc<Mutex<Vec<String>>>,
}

#[derive(Clone)]
enum MockOutcome {
    Succeed,
    Fail(PublishError),
}

impl MockPublisher {
    /// A publisher that always succeeds
    pub fn success(platform: PlatformId) -> Self {
        Self {
            platform,
            outcome: MockOutcome::Succeed,
            delay: Duration::ZERO,
            publish_calls: Arc::new(Mutex::new(0)),
            published_captions: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A publisher that always fails with the given error
    pub fn failure(platform: PlatformId, error: PublishError) -> Self {
        Self {
            outcome: MockOutcome::Fail(error),
            ..Self::success(platform)
        }
    }

    /// A succeeding publisher that sleeps before responding
    pub fn with_delay(platform: PlatformId, delay: Duration) -> Self {
        Self {
            delay,
            ..Self::success(platform)
        }
    }

    pub fn publish_call_count(&self) -> usize {
        *self.publish_calls.lock().unwrap()
    }

    pub fn published_captions(&self) -> Vec<String> {
        self.published_captions.lock().unwrap().clone()
    }
}

#[async_trait]
impl Publisher for MockPublisher {
    fn platform(&self) -> PlatformId {
        self.platform
    }

    fn validate(&self, request: &PublishRequest) -> Result<(), PublishError> {
        if request.caption.is_empty() {
            return Err(PublishError::Validation("caption is empty".to_string()));
        }
        Ok(())
    }

    async fn publish(&self, request: &PublishRequest) -> Result<String, PublishError> {
        *self.publish_calls.lock().unwrap() += 1;

        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }

        match &self.outcome {
            MockOutcome::Succeed => {
                self.published_captions
                    .lock()
                    .unwrap()
                    .push(request.caption.clone());
                Ok(format!("{}:mock-{}", self.platform, uuid::Uuid::new_v4()))
            }
            MockOutcome::Fail(error) => Err(error.clone()),
        }
    }
}
