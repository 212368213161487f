//! Core trait definitions
//!
//! The orchestrator talks to the outside world only through these seams, so tests can swap
//! the HTTP clients for in-memory doubles.

use crate::error::FetchOutcome;
use crate::types::AnnouncementItem;
use async_trait::async_trait;

/// Source of current announcement items
#[async_trait]
pub trait AnnouncementSource: Send + Sync {
    /// Fetch and normalize the current announcements. An empty list is success.
    async fn fetch_announcements(&self) -> FetchOutcome<Vec<AnnouncementItem>>;
}

/// Single-turn text completion
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Complete one prompt. No conversation history is carried between calls.
    async fn complete(&self, prompt: &str) -> FetchOutcome<String>;

    /// Model identifier, for logging
    fn model(&self) -> &str;
}
