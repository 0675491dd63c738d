//! Trailcast core library
//!
//! Scheduling and dispatch for a social media posting assistant: durable
//! content and schedule storage, caption generation with a deterministic
//! fallback, and concurrent fan-out to platform publishers.
//!
//! The flow is create a [`types::ContentItem`], schedule it with a
//! [`store::ScheduleStore`] entry, then let the [`scheduler::Scheduler`]
//! claim due entries and hand them to the [`dispatch::Dispatcher`].

pub mod caption;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod publishers;
pub mod scheduler;
pub mod scheduling;
pub mod store;
pub mod trends;
pub mod types;

pub use config::Config;
pub use error::{Result, TrailcastError};
pub use store::ScheduleStore;
pub use types::{ContentItem, EntryStatus, PlatformId, PostOutcome, PostResult, ScheduleEntry};
