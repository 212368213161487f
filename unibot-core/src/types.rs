//! Core data type definitions

use crate::logging::LoggingConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category applied to announcements that arrive without one
pub const DEFAULT_CATEGORY: &str = "General";

/// One normalized news/notice record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnouncementItem {
    pub title: String,
    pub description: String,
    /// Absent when the source gives no usable timestamp
    pub published_at: Option<DateTime<Utc>>,
    /// Never empty
    pub category: String,
    pub link: Option<String>,
}

impl AnnouncementItem {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            published_at: None,
            category: DEFAULT_CATEGORY.to_string(),
            link: None,
        }
    }

    pub fn with_published_at(mut self, published_at: DateTime<Utc>) -> Self {
        self.published_at = Some(published_at);
        self
    }

    /// Set the category; blank input keeps [`DEFAULT_CATEGORY`]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        let category = category.into();
        self.category = if category.trim().is_empty() {
            DEFAULT_CATEGORY.to_string()
        } else {
            category
        };
        self
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }
}

/// Which pipeline stage produced an answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerSource {
    /// Completion prompted with announcement or static-knowledge context
    ContextCompletion,
    /// Completion prompted with the bare question
    PlainCompletion,
    /// No completion succeeded
    None,
}

/// Final output of one `resolve` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatbotAnswer {
    pub success: bool,
    /// User-facing text, never empty
    pub response_text: String,
    /// Underlying diagnostic message, for logs only
    pub error_detail: Option<String>,
    pub source: AnswerSource,
}

impl ChatbotAnswer {
    pub fn answered(response_text: impl Into<String>, source: AnswerSource) -> Self {
        Self {
            success: true,
            response_text: response_text.into(),
            error_detail: None,
            source,
        }
    }

    pub fn failed(response_text: impl Into<String>, error_detail: Option<String>) -> Self {
        Self {
            success: false,
            response_text: response_text.into(),
            error_detail,
            source: AnswerSource::None,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnibotConfig {
    pub announcements: AnnouncementsConfig,
    pub completion: CompletionConfig,
    #[serde(default)]
    pub speech: SpeechConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Live announcements endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnouncementsConfig {
    pub base_url: String,
    pub path: String,
    /// Bound on the whole request, body included
    pub timeout_seconds: u64,
    pub user_agent: String,
}

/// Chat-completion endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    pub api_url: String,
    pub model: String,
    /// Bearer credential; may also be supplied through `OPENROUTER_API_KEY`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub timeout_seconds: u64,
    /// Sent as `X-Title`
    pub app_title: String,
    /// Sent as `HTTP-Referer` when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referer: Option<String>,
}

/// Defaults handed to the speech capabilities
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    pub rate: f32,
    pub pitch: f32,
    /// Stop listening after the first final transcript
    pub auto_close: bool,
    pub silence_timeout_ms: u64,
}
