//! Unibot Assistant - query answering and voice sessions
//!
//! Builds on the live data clients (unibot-live) and the completion client (unibot-llm):
//!
//! - Announcement query detection
//! - Static knowledge about the university
//! - The response orchestrator that turns any query into a [`unibot_core::ChatbotAnswer`]
//! - Voice input/output session management

pub mod detection;
pub mod knowledge;
pub mod orchestrator;
pub mod voice;

pub use detection::{is_announcement_query, matched_announcement_keyword, ANNOUNCEMENT_KEYWORDS};
pub use knowledge::{match_topic, resolve_static, Topic};
pub use orchestrator::{announcement_fallback, ResponseOrchestrator, CRITICAL_FAILURE_MESSAGE};
pub use voice::{
    ListenOptions, SessionSlot, SpeakOptions, SpeechRecognizer, SpeechSynthesizer,
    TranscriptSink, VoiceAssistant,
};
