//! Unibot LLM - chat-completion client and prompt construction
//!
//! Single-turn completions over an OpenAI-compatible HTTP endpoint.

pub mod completion;
pub mod prompt;

pub use completion::*;
pub use prompt::*;
