//! Configuration management

use crate::error::{UnibotError, UnibotResult};
use crate::logging::LoggingConfig;
use crate::types::{AnnouncementsConfig, CompletionConfig, SpeechConfig, UnibotConfig};

use std::path::Path;

/// Environment variable consulted for the completion credential at startup
pub const API_KEY_ENV: &str = "OPENROUTER_API_KEY";

/// Upper bound accepted for any network timeout
pub const MAX_TIMEOUT_SECONDS: u64 = 3600;

impl Default for UnibotConfig {
    fn default() -> Self {
        Self {
            announcements: AnnouncementsConfig::default(),
            completion: CompletionConfig::default(),
            speech: SpeechConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for AnnouncementsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://live-data-reva.onrender.com".to_string(),
            path: "/api/reva-about".to_string(),
            timeout_seconds: 8,
            user_agent: format!("unibot/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl AnnouncementsConfig {
    /// Full URL of the announcements endpoint
    pub fn url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.path.trim_start_matches('/')
        )
    }
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_url: "https://openrouter.ai/api/v1/chat/completions".to_string(),
            // Free-tier model; subject to change upstream
            model: "mistralai/mistral-7b-instruct:free".to_string(),
            api_key: None,
            timeout_seconds: 30,
            app_title: "REVA Assistant".to_string(),
            referer: None,
        }
    }
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            rate: 1.0,
            pitch: 1.1,
            auto_close: true,
            silence_timeout_ms: 1500,
        }
    }
}

impl UnibotConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> UnibotResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| UnibotError::Config {
            message: format!("Failed to read config file: {}", e),
            source: Some(Box::new(e)),
            context: crate::ErrorContext::new("config")
                .with_operation("read_file")
                .with_suggestion("Check if the config file exists and is readable"),
        })?;

        let config: UnibotConfig = toml::from_str(&content).map_err(|e| UnibotError::Config {
            message: format!("Failed to parse config: {}", e),
            source: Some(Box::new(e)),
            context: crate::ErrorContext::new("config")
                .with_operation("parse_toml")
                .with_suggestion("Check TOML syntax in config file"),
        })?;

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> UnibotResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| UnibotError::Config {
            message: format!("Failed to serialize config: {}", e),
            source: Some(Box::new(e)),
            context: crate::ErrorContext::new("config").with_operation("serialize_toml"),
        })?;

        std::fs::write(path, content).map_err(|e| UnibotError::Config {
            message: format!("Failed to write config file: {}", e),
            source: Some(Box::new(e)),
            context: crate::ErrorContext::new("config")
                .with_operation("write_file")
                .with_suggestion("Check if the directory exists and is writable"),
        })?;

        Ok(())
    }

    /// Fill in the completion credential from [`API_KEY_ENV`] when the file left it unset.
    ///
    /// Called once while building configuration; the pipeline itself never touches the
    /// environment.
    pub fn with_env_api_key(mut self) -> Self {
        if self.completion.api_key.is_none() {
            self.completion.api_key = std::env::var(API_KEY_ENV)
                .ok()
                .filter(|key| !key.trim().is_empty());
        }
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> UnibotResult<()> {
        validate_url(&self.announcements.url(), "announcements.base_url")?;
        validate_url(&self.completion.api_url, "completion.api_url")?;

        if !(1..=MAX_TIMEOUT_SECONDS).contains(&self.announcements.timeout_seconds) {
            return Err(invalid(
                "Announcements timeout_seconds must be between 1 and 3600",
                "Set announcements.timeout_seconds to a value such as 8",
            ));
        }

        if !(1..=MAX_TIMEOUT_SECONDS).contains(&self.completion.timeout_seconds) {
            return Err(invalid(
                "Completion timeout_seconds must be between 1 and 3600",
                "Set completion.timeout_seconds to a value such as 30",
            ));
        }

        if self.completion.model.trim().is_empty() {
            return Err(invalid(
                "Completion model must not be empty",
                "Set completion.model to a model identifier",
            ));
        }

        if !(0.1..=10.0).contains(&self.speech.rate) {
            return Err(invalid(
                "Speech rate must be between 0.1 and 10.0",
                "Set speech.rate to a value such as 1.0",
            ));
        }

        if !(0.0..=2.0).contains(&self.speech.pitch) {
            return Err(invalid(
                "Speech pitch must be between 0.0 and 2.0",
                "Set speech.pitch to a value such as 1.1",
            ));
        }

        Ok(())
    }
}

fn validate_url(value: &str, field: &str) -> UnibotResult<()> {
    url::Url::parse(value).map_err(|e| UnibotError::Config {
        message: format!("Invalid URL for {}: {}", field, e),
        source: Some(Box::new(e)),
        context: crate::ErrorContext::new("config")
            .with_operation("validate")
            .with_metadata("field", field)
            .with_suggestion("Use an absolute http(s) URL"),
    })?;
    Ok(())
}

fn invalid(message: &str, suggestion: &str) -> UnibotError {
    UnibotError::Config {
        message: message.to_string(),
        source: None,
        context: crate::ErrorContext::new("config")
            .with_operation("validate")
            .with_suggestion(suggestion),
    }
}
