//! Chat-completion client
//!
//! Speaks the OpenAI-compatible `chat/completions` wire format used by OpenRouter.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, warn};
use unibot_core::{
    config_error, server_error, with_timeout, CompletionConfig, CompletionProvider,
    ErrorContext, FetchOutcome, UnibotError, UnibotResult,
};
use unibot_live::{classify_request_error, create_http_client, EndpointLabels, HttpClientConfig};

/// Reply text used when the service returns no content
pub const EMPTY_COMPLETION: &str = "No response generated.";

const OPERATION: &str = "complete";

const LABELS: EndpointLabels = EndpointLabels {
    server: "completion service",
    endpoint: "completion API endpoint",
};

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: [RequestMessage<'a>; 1],
}

#[derive(Debug, Serialize)]
struct RequestMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

impl CompletionResponse {
    fn into_text(self) -> String {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .filter(|content| !content.is_empty())
            .unwrap_or_else(|| EMPTY_COMPLETION.to_string())
    }
}

/// HTTP completion client
pub struct CompletionClient {
    client: reqwest::Client,
    config: CompletionConfig,
}

impl CompletionClient {
    /// Create a client. A missing API key is reported per call, not here.
    pub fn new(config: &CompletionConfig) -> UnibotResult<Self> {
        let http_config = HttpClientConfig::default()
            .with_timeout(config.timeout_seconds)
            .with_header("X-Title", config.app_title.as_str());
        let http_config = match &config.referer {
            Some(referer) => http_config.with_header("HTTP-Referer", referer.as_str()),
            None => http_config,
        };
        let client = create_http_client(&http_config)?;

        info!("Created completion client for model: {}", config.model);

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    fn timeout_ms(&self) -> u64 {
        self.config.timeout_seconds.saturating_mul(1000)
    }

    fn api_key(&self) -> FetchOutcome<&str> {
        self.config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| config_error!("Completion API key is not set.", "completion_client"))
    }

    async fn post(&self, api_key: &str, prompt: &str) -> FetchOutcome<String> {
        let request = CompletionRequest {
            model: &self.config.model,
            messages: [RequestMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| classify_request_error(e, LABELS, OPERATION, self.timeout_ms()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| classify_request_error(e, LABELS, OPERATION, self.timeout_ms()))?;

        if !status.is_success() {
            warn!(status = status.as_u16(), "Completion API returned an error");
            return Err(server_error!(
                format!("Completion API error: {} - {}", status.as_u16(), body),
                status.as_u16(),
                "completion_client"
            ));
        }

        let parsed: CompletionResponse =
            serde_json::from_str(&body).map_err(|e| UnibotError::Parse {
                message: "Invalid response: Could not parse completion data".to_string(),
                source: Some(Box::new(e)),
                context: ErrorContext::new("completion_client").with_operation(OPERATION),
            })?;

        Ok(parsed.into_text())
    }
}

#[async_trait]
impl CompletionProvider for CompletionClient {
    async fn complete(&self, prompt: &str) -> FetchOutcome<String> {
        let api_key = self.api_key()?;
        let start = Instant::now();

        debug!(model = %self.config.model, prompt_chars = prompt.len(), "Requesting completion");

        let text = with_timeout(self.post(api_key, prompt), self.timeout_ms(), OPERATION).await??;

        info!(
            model = %self.config.model,
            duration_ms = start.elapsed().as_millis() as u64,
            "Completion received"
        );
        Ok(text)
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}
