//! Registry of live JSON data sources with one-shot fetches and periodic polling

use crate::http::{classify_request_error, read_body, EndpointLabels};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};
use unibot_core::{
    config_error, with_timeout, ErrorContext, EventBus, FetchOutcome, Subscription, UnibotError, UnibotResult,
};

/// Polling interval used when neither the caller nor the source specifies one
pub const DEFAULT_POLLING_INTERVAL: Duration = Duration::from_secs(30);

/// Bound on each individual fetch
pub const FETCH_TIMEOUT_MS: u64 = 8_000;

/// A registered remote endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSource {
    pub id: String,
    pub name: String,
    pub endpoint: String,
    /// Request headers; `Accept: application/json` when empty
    #[serde(default)]
    pub headers: HashMap<String, String>,
    pub polling_interval_ms: Option<u64>,
}

impl DataSource {
    pub fn new(id: impl Into<String>, name: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            endpoint: endpoint.into(),
            headers: HashMap::new(),
            polling_interval_ms: None,
        }
    }

    pub fn with_polling_interval(mut self, interval: Duration) -> Self {
        self.polling_interval_ms = Some(interval.as_millis() as u64);
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }
}

/// Live data integration point.
///
/// Polls run as tokio tasks and must be started from inside a runtime. Dropping the service
/// stops every poll.
pub struct LiveDataService {
    client: reqwest::Client,
    sources: RwLock<HashMap<String, DataSource>>,
    polls: Mutex<HashMap<String, Subscription>>,
}

impl Default for LiveDataService {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

impl LiveDataService {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            sources: RwLock::new(HashMap::new()),
            polls: Mutex::new(HashMap::new()),
        }
    }

    /// Register or replace a data source
    pub fn register_source(&self, source: DataSource) {
        info!(source_id = %source.id, endpoint = %source.endpoint, "Registered data source");
        self.sources
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(source.id.clone(), source);
    }

    pub fn data_source(&self, id: &str) -> Option<DataSource> {
        self.sources
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(id)
            .cloned()
    }

    pub fn list_sources(&self) -> Vec<DataSource> {
        let mut sources: Vec<DataSource> = self
            .sources
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .values()
            .cloned()
            .collect();
        sources.sort_by(|a, b| a.id.cmp(&b.id));
        sources
    }

    /// Fetch a registered source once
    pub async fn fetch_data(&self, id: &str) -> FetchOutcome<Value> {
        let source = self.require_source(id)?;
        fetch_source(&self.client, &source).await
    }

    /// Start polling a source, replacing any poll already running for it.
    ///
    /// The first fetch happens immediately; outcomes reach `handler` in fetch order. The
    /// handler runs on its own task and may call [`stop_polling`](Self::stop_polling).
    pub fn start_polling<F>(
        &self,
        id: &str,
        mut handler: F,
        interval: Option<Duration>,
    ) -> UnibotResult<()>
    where
        F: FnMut(&FetchOutcome<Value>) + Send + 'static,
    {
        let source = self.require_source(id)?;
        self.stop_polling(id);

        let period = interval
            .or_else(|| source.polling_interval_ms.map(Duration::from_millis))
            .unwrap_or(DEFAULT_POLLING_INTERVAL);
        if period.is_zero() {
            return Err(config_error!(
                format!("Polling interval for '{}' must be greater than zero", id),
                "live_data_service"
            ));
        }

        let bus: EventBus<Arc<FetchOutcome<Value>>> = EventBus::new();
        let subscription =
            bus.subscribe(move |outcome: &Arc<FetchOutcome<Value>>| handler(outcome.as_ref()));
        let client = self.client.clone();
        let source_id = source.id.clone();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let outcome = fetch_source(&client, &source).await;
                if let Err(e) = &outcome {
                    e.log();
                    debug!(source_id = %source.id, "Poll failed");
                }
                bus.publish(Arc::new(outcome));
            }
        });

        info!(source_id = %source_id, interval_ms = period.as_millis() as u64, "Started polling");

        let poll = Subscription::new(subscription.id(), move || {
            task.abort();
            subscription.unsubscribe();
        });
        self.lock_polls().insert(source_id, poll);
        Ok(())
    }

    /// Stop polling a source. Returns whether a poll was running.
    pub fn stop_polling(&self, id: &str) -> bool {
        let poll = self.lock_polls().remove(id);
        match poll {
            Some(poll) => {
                poll.unsubscribe();
                debug!(source_id = %id, "Stopped polling");
                true
            }
            None => false,
        }
    }

    pub fn is_polling(&self, id: &str) -> bool {
        self.lock_polls().contains_key(id)
    }

    fn lock_polls(&self) -> std::sync::MutexGuard<'_, HashMap<String, Subscription>> {
        self.polls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn require_source(&self, id: &str) -> UnibotResult<DataSource> {
        self.data_source(id).ok_or_else(|| UnibotError::Internal {
            message: format!("Data source '{}' not found", id),
            source: None,
            context: ErrorContext::new("live_data_service")
                .with_operation("lookup_source")
                .with_suggestion("Register the source before fetching or polling it"),
        })
    }
}

async fn fetch_source(client: &reqwest::Client, source: &DataSource) -> FetchOutcome<Value> {
    debug!(source = %source.name, "Fetching data source");
    with_timeout(fetch_unbounded(client, source), FETCH_TIMEOUT_MS, "fetch_data").await?
}

async fn fetch_unbounded(client: &reqwest::Client, source: &DataSource) -> FetchOutcome<Value> {
    let mut request = client.get(&source.endpoint);
    if source.headers.is_empty() {
        request = request.header(reqwest::header::ACCEPT, "application/json");
    } else {
        for (key, value) in &source.headers {
            request = request.header(key.as_str(), value.as_str());
        }
    }

    let response = request.send().await.map_err(|e| {
        classify_request_error(e, EndpointLabels::GENERIC, "fetch_data", FETCH_TIMEOUT_MS)
    })?;
    let body = read_body(response, EndpointLabels::GENERIC, "fetch_data", FETCH_TIMEOUT_MS).await?;

    serde_json::from_str(&body).map_err(|e| UnibotError::Parse {
        message: "Invalid response: Could not parse data".to_string(),
        source: Some(Box::new(e)),
        context: ErrorContext::new("live_data_service")
            .with_operation("fetch_data")
            .with_metadata("source", &source.id),
    })
}
