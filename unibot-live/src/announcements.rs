//! Live announcements client
//!
//! The announcements service returns a JSON object keyed by source URL, each value holding a
//! `title` and `content`. Items carry no timestamps of their own, so every item is stamped
//! with the fetch time.

use async_trait::async_trait;
use crate::http::{
    classify_request_error, create_http_client, read_body, EndpointLabels, HttpClientConfig,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info};
use unibot_core::{
    performance, with_timeout, AnnouncementItem, AnnouncementSource,
    AnnouncementsConfig, ErrorContext, FetchOutcome, UnibotError, UnibotResult,
};

/// Category given to every fetched item until the backend provides one
pub const FETCHED_CATEGORY: &str = "Academic";

const OPERATION: &str = "fetch_announcements";

/// One entry of the remote payload
#[derive(Debug, Default, Deserialize)]
struct RawAnnouncement {
    title: Option<String>,
    content: Option<String>,
}

/// HTTP client for the announcements endpoint
pub struct AnnouncementClient {
    client: reqwest::Client,
    url: String,
    timeout_ms: u64,
}

impl AnnouncementClient {
    pub fn new(config: &AnnouncementsConfig) -> UnibotResult<Self> {
        let http_config = HttpClientConfig {
            timeout_seconds: config.timeout_seconds,
            user_agent: config.user_agent.clone(),
            ..Default::default()
        }
        .with_header("Accept", "application/json");
        let client = create_http_client(&http_config)?;

        info!("Created announcements client for {}", config.url());

        Ok(Self {
            client,
            url: config.url(),
            timeout_ms: config.timeout_seconds.saturating_mul(1000),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn fetch_once(&self) -> FetchOutcome<Vec<AnnouncementItem>> {
        debug!("Fetching announcements from {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| {
                classify_request_error(e, EndpointLabels::ANNOUNCEMENTS, OPERATION, self.timeout_ms)
            })?;

        let body = read_body(
            response,
            EndpointLabels::ANNOUNCEMENTS,
            OPERATION,
            self.timeout_ms,
        )
        .await?;

        normalize_payload(&body, Utc::now())
    }
}

#[async_trait]
impl AnnouncementSource for AnnouncementClient {
    async fn fetch_announcements(&self) -> FetchOutcome<Vec<AnnouncementItem>> {
        let bounded = with_timeout(self.fetch_once(), self.timeout_ms, OPERATION);
        let items = performance::measure_async(OPERATION, bounded).await??;

        info!(count = items.len(), "Fetched announcements");
        Ok(items)
    }
}

/// Turn the raw announcements payload into items, preserving payload order.
///
/// Entries that are not objects, or lack fields, fall back to placeholder text rather than
/// failing the whole fetch.
pub fn normalize_payload(
    body: &str,
    fetched_at: DateTime<Utc>,
) -> FetchOutcome<Vec<AnnouncementItem>> {
    let entries: Map<String, Value> = serde_json::from_str(body).map_err(|e| UnibotError::Parse {
        message: "Invalid response: Could not parse announcement data".to_string(),
        source: Some(Box::new(e)),
        context: ErrorContext::new("announcement_client")
            .with_operation("normalize_payload")
            .with_suggestion("The endpoint must return a JSON object keyed by source URL"),
    })?;

    let items = entries
        .into_iter()
        .map(|(url, value)| {
            let raw: RawAnnouncement = serde_json::from_value(value).unwrap_or_default();
            AnnouncementItem::new(
                non_blank(raw.title).unwrap_or_else(|| "No Title".to_string()),
                non_blank(raw.content).unwrap_or_else(|| "No Content".to_string()),
            )
            .with_published_at(fetched_at)
            .with_category(FETCHED_CATEGORY)
            .with_link(url)
        })
        .collect();

    Ok(items)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
