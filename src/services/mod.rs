//! Services layer for Pasture
//!
//! Business logic that spans collections:
//!
//! - **Feed**: reflections shared with a user, across direct shares and
//!   live herd memberships, newest first with author names attached
//! - **Reminders**: cadence windows and messages for the reflection
//!   reminder check

pub mod feed;
pub mod reminders;

pub use feed::{feed_pipeline, FeedItem, FeedService, FEED_LIMIT};
pub use reminders::{evaluate_reminder, window_start, NotificationStatus};
