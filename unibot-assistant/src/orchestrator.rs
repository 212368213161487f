//! Query answering pipeline
//!
//! A query moves through a fixed sequence of stages: gather context (live announcements or
//! static knowledge), ask for a completion grounded on that context, then fall back to an
//! ungrounded completion. The caller always receives a [`ChatbotAnswer`]; failures never
//! escape as errors or panics.

use crate::detection::{is_announcement_query, matched_announcement_keyword};
use crate::knowledge::{match_topic, resolve_static};
use std::sync::Arc;
use tracing::{debug, info, info_span, warn, Instrument};
use unibot_core::{
    catch_panic, AnnouncementSource, AnswerSource, ChatbotAnswer, CompletionProvider, ErrorKind,
    UnibotConfig, UnibotResult,
};
use unibot_live::{format_announcements, AnnouncementClient};
use unibot_llm::{format_prompt, CompletionClient};
use uuid::Uuid;

const FALLBACK_PREFIX: &str = "I couldn't retrieve the latest announcements right now. ";

const FAILURE_PREFIX: &str = "I couldn't generate a response for your query right now.";

const FAILURE_GUIDANCE: &str =
    " Please try again later or contact REVA University directly for assistance.";

/// Reply used when the pipeline itself breaks down
pub const CRITICAL_FAILURE_MESSAGE: &str = "I apologize, but I'm experiencing critical technical difficulties and cannot respond right now. Please try again later.";

/// Sentence used as context when announcements could not be fetched
pub fn announcement_fallback(kind: ErrorKind) -> String {
    let detail = match kind {
        ErrorKind::Network => "There seems to be a network connectivity issue. Please check your internet connection and try again later.",
        ErrorKind::Server => "The university's announcement server is currently unavailable. Please try again later or check the university website directly.",
        ErrorKind::Timeout => "The request timed out while trying to fetch the announcements. This might be due to server congestion or network issues.",
        ErrorKind::Parse => "There was an issue processing the announcement data. The IT team has been notified of this issue.",
        ErrorKind::Unknown => "Here's what I know from my last update: REVA University regularly posts announcements about academic events, extracurricular activities, and administrative updates on their official website and student portal.",
    };
    format!("{}{}", FALLBACK_PREFIX, detail)
}

/// Pipeline position for a single query
#[derive(Debug)]
enum Stage {
    Start,
    DataLookup,
    CompletionWithContext { context: LookupContext },
    CompletionPlain {
        last_error: Option<String>,
        /// Fetch-failure sentence to lead the reply if this attempt fails too
        fallback: Option<String>,
    },
    Done(ChatbotAnswer),
}

impl Stage {
    fn name(&self) -> &'static str {
        match self {
            Stage::Start => "start",
            Stage::DataLookup => "data_lookup",
            Stage::CompletionWithContext { .. } => "completion_with_context",
            Stage::CompletionPlain { .. } => "completion_plain",
            Stage::Done(_) => "done",
        }
    }
}

/// Context gathered for one query
#[derive(Debug)]
struct LookupContext {
    text: String,
    /// `text` is a fallback sentence standing in for announcements that could not be fetched
    degraded: bool,
}

/// Answers user queries. Holds no per-query state, so one instance serves concurrent calls.
#[derive(Clone)]
pub struct ResponseOrchestrator {
    announcements: Arc<dyn AnnouncementSource>,
    completion: Arc<dyn CompletionProvider>,
}

impl ResponseOrchestrator {
    pub fn new(
        announcements: Arc<dyn AnnouncementSource>,
        completion: Arc<dyn CompletionProvider>,
    ) -> Self {
        Self {
            announcements,
            completion,
        }
    }

    /// Build the orchestrator with the HTTP clients described by `config`
    pub fn from_config(config: &UnibotConfig) -> UnibotResult<Self> {
        let announcements = AnnouncementClient::new(&config.announcements)?;
        let completion = CompletionClient::new(&config.completion)?;

        info!(announcements_url = %announcements.url(), "Response orchestrator ready");

        Ok(Self::new(Arc::new(announcements), Arc::new(completion)))
    }

    /// Answer a query. Never fails and never panics.
    pub async fn resolve(&self, query: &str) -> ChatbotAnswer {
        let query_id = Uuid::new_v4();
        let span = info_span!("resolve", query_id = %query_id);

        match catch_panic(self.run(query).instrument(span)).await {
            Ok(answer) => answer,
            Err(panic_message) => {
                warn!(query_id = %query_id, panic = %panic_message, "Pipeline panicked");
                ChatbotAnswer::failed(CRITICAL_FAILURE_MESSAGE, Some(panic_message))
            }
        }
    }

    /// Context for a query: formatted live announcements (or a fallback sentence when they
    /// cannot be fetched) for announcement queries, static knowledge otherwise.
    pub async fn lookup_context(&self, query: &str) -> String {
        self.data_lookup(query).await.text
    }

    async fn data_lookup(&self, query: &str) -> LookupContext {
        if is_announcement_query(query) {
            debug!(
                keyword = matched_announcement_keyword(query).unwrap_or_default(),
                "Announcement query detected"
            );

            match self.announcements.fetch_announcements().await {
                Ok(items) => LookupContext {
                    text: format_announcements(&items),
                    degraded: false,
                },
                Err(e) => {
                    e.log();
                    debug!(kind = %e.kind(), "Using fallback announcement context");
                    LookupContext {
                        text: announcement_fallback(e.kind()),
                        degraded: true,
                    }
                }
            }
        } else {
            debug!(topic = ?match_topic(query), "Using static knowledge");
            LookupContext {
                text: resolve_static(query),
                degraded: false,
            }
        }
    }

    async fn run(&self, query: &str) -> ChatbotAnswer {
        let mut stage = Stage::Start;

        loop {
            debug!(stage = stage.name(), "Pipeline stage");

            stage = match stage {
                Stage::Start => Stage::DataLookup,

                Stage::DataLookup => Stage::CompletionWithContext {
                    context: self.data_lookup(query).await,
                },

                Stage::CompletionWithContext { context } => {
                    let prompt = format_prompt(query, Some(&context.text));
                    let fallback = context.degraded.then_some(context.text);
                    match self.completion.complete(&prompt).await {
                        Ok(text) if !text.is_empty() => {
                            Stage::Done(ChatbotAnswer::answered(text, AnswerSource::ContextCompletion))
                        }
                        Ok(_) => Stage::CompletionPlain {
                            last_error: None,
                            fallback,
                        },
                        Err(e) => {
                            e.log();
                            debug!("Completion with context failed, retrying without context");
                            Stage::CompletionPlain {
                                last_error: Some(e.message()),
                                fallback,
                            }
                        }
                    }
                }

                Stage::CompletionPlain {
                    last_error,
                    fallback,
                } => {
                    let prompt = format_prompt(query, None);
                    match self.completion.complete(&prompt).await {
                        Ok(text) if !text.is_empty() => {
                            Stage::Done(ChatbotAnswer::answered(text, AnswerSource::PlainCompletion))
                        }
                        Ok(_) => Stage::Done(failure_answer(last_error, fallback)),
                        Err(e) => {
                            e.log();
                            debug!("Plain completion failed");
                            Stage::Done(failure_answer(Some(e.message()), fallback))
                        }
                    }
                }

                Stage::Done(answer) => {
                    info!(
                        success = answer.success,
                        source = ?answer.source,
                        model = self.completion.model(),
                        "Query resolved"
                    );
                    return answer;
                }
            };
        }
    }
}

/// Reply after both completion attempts failed, led by the fetch-failure sentence if any
fn failure_answer(detail: Option<String>, fallback: Option<String>) -> ChatbotAnswer {
    let lead = format!("{} {}", FAILURE_PREFIX, detail.as_deref().unwrap_or_default());
    let mut text = format!("{}{}", lead.trim(), FAILURE_GUIDANCE);
    if let Some(fallback) = fallback {
        text = format!("{} {}", fallback, text);
    }
    ChatbotAnswer::failed(text, detail)
}
