//! Unibot CLI - Command-line interface for the REVA University assistant
//!
//! Ask one-off questions, chat interactively, inspect live announcements and manage
//! configuration.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use unibot_assistant::{match_topic, matched_announcement_keyword, ResponseOrchestrator};
use unibot_core::{
    init_logging, log_operation_error, log_operation_start, log_operation_success,
    AnnouncementSource, ChatbotAnswer, ErrorContext, LoggingConfig, UnibotConfig, UnibotError,
    UnibotResult,
};
use unibot_live::{format_announcements, AnnouncementClient};

#[derive(Parser)]
#[command(name = "unibot")]
#[command(about = "A campus assistant for REVA University questions and announcements")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a single question
    Ask {
        /// Question to ask
        query: String,

        /// Print the full answer record as JSON
        #[arg(long)]
        json: bool,
    },

    /// Interactive chat mode
    Chat,

    /// Show the current live announcements
    Announcements {
        /// Print normalized items as JSON instead of the chat message
        #[arg(long)]
        raw: bool,
    },

    /// Show how a query would be routed
    Classify {
        /// Query to classify
        query: String,
    },

    /// Manage configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,

        /// Initialize default configuration
        #[arg(long)]
        init: bool,

        /// Set a configuration value (key=value format)
        #[arg(long)]
        set: Option<String>,

        /// Get a configuration value
        #[arg(long)]
        get: Option<String>,

        /// Validate current configuration
        #[arg(long)]
        validate: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is normal
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let (config, loaded_from) = load_config(cli.config.as_deref())?;
    let config = config.with_env_api_key();

    let logging_config = if cli.verbose {
        LoggingConfig::verbose()
    } else {
        config.logging.clone()
    };
    init_logging(&logging_config).context("Failed to initialize logging")?;

    info!("Starting Unibot CLI v{}", env!("CARGO_PKG_VERSION"));
    match &loaded_from {
        Some(path) => info!("Loaded configuration from {:?}", path),
        None => info!("No configuration file found, using defaults"),
    }

    match cli.command {
        Commands::Ask { query, json } => handle_ask(&query, json, &config).await?,
        Commands::Chat => handle_chat(&config).await?,
        Commands::Announcements { raw } => handle_announcements(raw, &config).await?,
        Commands::Classify { query } => handle_classify(&query),
        Commands::Config {
            show,
            init,
            set,
            get,
            validate,
        } => handle_config(show, init, set, get, validate, cli.config.as_deref())?,
    }

    Ok(())
}

/// Load configuration from `explicit`, else the first default location that exists
fn load_config(explicit: Option<&Path>) -> UnibotResult<(UnibotConfig, Option<PathBuf>)> {
    if let Some(path) = explicit {
        return Ok((UnibotConfig::from_file(path)?, Some(path.to_path_buf())));
    }

    let default_paths = [
        dirs::config_dir().map(|d| d.join("unibot").join("config.toml")),
        dirs::home_dir().map(|d| d.join(".unibot").join("config.toml")),
        Some(PathBuf::from("unibot.toml")),
    ];

    for path in default_paths.into_iter().flatten() {
        if path.exists() {
            return Ok((UnibotConfig::from_file(&path)?, Some(path)));
        }
    }

    Ok((UnibotConfig::default(), None))
}

fn get_config_path() -> UnibotResult<PathBuf> {
    dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|d| d.join(".config")))
        .map(|d| d.join("unibot").join("config.toml"))
        .ok_or_else(|| UnibotError::Config {
            message: "Could not determine a configuration directory".to_string(),
            source: None,
            context: ErrorContext::new("cli")
                .with_operation("config_path")
                .with_suggestion("Pass --config with an explicit path"),
        })
}

fn build_orchestrator(config: &UnibotConfig) -> anyhow::Result<ResponseOrchestrator> {
    config.validate().context("Invalid configuration")?;
    ResponseOrchestrator::from_config(config).context("Failed to create the assistant")
}

async fn handle_ask(query: &str, json: bool, config: &UnibotConfig) -> anyhow::Result<()> {
    log_operation_start!("ask", query = %query);

    let orchestrator = build_orchestrator(config)?;
    let answer = orchestrator.resolve(query).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&answer)?);
    } else {
        print_answer(&answer);
    }

    log_operation_success!("ask", success = answer.success, source = ?answer.source);
    Ok(())
}

fn print_answer(answer: &ChatbotAnswer) {
    if answer.success {
        println!("🤖 {}", answer.response_text);
    } else {
        println!("⚠️  {}", answer.response_text);
        if let Some(detail) = &answer.error_detail {
            debug!(detail = %detail, "Answer failed");
        }
    }
}

/// One exchange in the interactive session
struct ChatTurn {
    query: String,
    answer: ChatbotAnswer,
}

async fn handle_chat(config: &UnibotConfig) -> anyhow::Result<()> {
    log_operation_start!("chat_mode");

    let orchestrator = build_orchestrator(config)?;
    let mut history: Vec<ChatTurn> = Vec::new();

    println!("🤖 **Unibot Chat Started**");
    println!("🧠 Model: {}", config.completion.model);
    println!("💡 Type 'help' for commands, 'quit' to exit\n");

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("💬 You: ");
        io::stdout().flush()?;

        let input = match lines.next() {
            Some(line) => line?,
            None => break,
        };
        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        match input.to_lowercase().as_str() {
            "quit" | "exit" | "q" => break,
            "help" | "h" => {
                show_help();
                continue;
            }
            "history" => {
                show_history(&history);
                continue;
            }
            "clear" => {
                history.clear();
                println!("🧹 History cleared.");
                continue;
            }
            _ => {}
        }

        print!("🤔 Thinking...");
        io::stdout().flush()?;

        let answer = orchestrator.resolve(input).await;
        print!("\r");
        print_answer(&answer);
        println!();

        history.push(ChatTurn {
            query: input.to_string(),
            answer,
        });
    }

    println!("👋 Goodbye!");
    log_operation_success!("chat_mode", turns = history.len());
    Ok(())
}

fn show_help() {
    println!("📖 Commands:");
    println!("  help, h     Show this help");
    println!("  history     Show the last 10 exchanges");
    println!("  clear       Forget the conversation history");
    println!("  quit, q     Exit");
    println!();
}

fn show_history(history: &[ChatTurn]) {
    if history.is_empty() {
        println!("📜 No messages yet.");
        return;
    }

    println!("📜 Conversation:");
    let start = history.len().saturating_sub(10);
    for turn in &history[start..] {
        println!("  💬 You: {}", shorten(&turn.query, 100));
        let marker = if turn.answer.success { "🤖" } else { "⚠️ " };
        println!("  {} Assistant: {}", marker, shorten(&turn.answer.response_text, 100));
    }
    println!();
}

fn shorten(text: &str, limit: usize) -> String {
    if text.chars().count() > limit {
        let head: String = text.chars().take(limit).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

async fn handle_announcements(raw: bool, config: &UnibotConfig) -> anyhow::Result<()> {
    log_operation_start!("announcements");

    config.validate().context("Invalid configuration")?;
    let client = AnnouncementClient::new(&config.announcements)?;

    let items = match client.fetch_announcements().await {
        Ok(items) => items,
        Err(e) => {
            log_operation_error!("announcements", e, kind = %e.kind());
            bail!("Could not fetch announcements ({}): {}", e.kind(), e.message());
        }
    };

    if raw {
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else {
        println!("{}", format_announcements(&items));
    }

    log_operation_success!("announcements", count = items.len());
    Ok(())
}

fn handle_classify(query: &str) {
    match matched_announcement_keyword(query) {
        Some(keyword) => println!("📢 Announcement query (matched \"{}\")", keyword),
        None => match match_topic(query) {
            Some(topic) => println!("📚 Static knowledge: {}", topic),
            None => println!("❔ Static knowledge: general contact details"),
        },
    }
}

fn handle_config(
    show: bool,
    init: bool,
    set: Option<String>,
    get: Option<String>,
    validate: bool,
    explicit: Option<&Path>,
) -> anyhow::Result<()> {
    let config_path = match explicit {
        Some(path) => path.to_path_buf(),
        None => get_config_path()?,
    };

    if init {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        UnibotConfig::default().save_to_file(&config_path)?;
        println!("✅ Configuration initialized at: {:?}", config_path);
        println!(
            "📝 Set completion.api_key in the file or export {}.",
            unibot_core::API_KEY_ENV
        );
    }

    if let Some(key_value) = set {
        let Some((key, value)) = key_value.split_once('=') else {
            bail!("Invalid format. Use key=value, e.g. --set completion.model=openai/gpt-4o-mini");
        };

        let mut config = if config_path.exists() {
            UnibotConfig::from_file(&config_path)?
        } else {
            UnibotConfig::default()
        };
        set_config_value(&mut config, key.trim(), value.trim())?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        config.save_to_file(&config_path)?;
        println!("✅ Set {} = {}", key.trim(), value.trim());
    }

    if let Some(key) = get {
        let (config, _) = load_config(explicit)?;
        println!("{} = {}", key, get_config_value(&config.with_env_api_key(), &key)?);
    }

    if show {
        let (config, _) = load_config(explicit)?;
        let mut shown = config.with_env_api_key();
        shown.completion.api_key = shown.completion.api_key.as_deref().map(mask_secret);
        println!("📋 Current configuration:");
        println!("{}", toml::to_string_pretty(&shown)?);
    }

    if validate {
        let (config, _) = load_config(explicit)?;
        match config.validate() {
            Ok(()) => println!("✅ Configuration is valid"),
            Err(e) => {
                println!("❌ Configuration validation failed: {}", e);
                return Err(e.into());
            }
        }
    }

    Ok(())
}

fn invalid_value(key: &str, value: &str, expected: &str) -> UnibotError {
    UnibotError::Config {
        message: format!("Invalid {} value for {}: {}", expected, key, value),
        source: None,
        context: ErrorContext::new("config_set").with_operation("parse_value"),
    }
}

fn unknown_key(key: &str, component: &str) -> UnibotError {
    UnibotError::Config {
        message: format!("Unknown configuration key: {}", key),
        source: None,
        context: ErrorContext::new(component)
            .with_suggestion("Use --show to see available configuration keys"),
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str, expected: &str) -> UnibotResult<T> {
    value.parse().map_err(|_| invalid_value(key, value, expected))
}

/// Update one dotted configuration key
fn set_config_value(config: &mut UnibotConfig, key: &str, value: &str) -> UnibotResult<()> {
    let parts: Vec<&str> = key.split('.').collect();
    match parts.as_slice() {
        ["announcements", "base_url"] => config.announcements.base_url = value.to_string(),
        ["announcements", "path"] => config.announcements.path = value.to_string(),
        ["announcements", "timeout_seconds"] => {
            config.announcements.timeout_seconds = parse_value(key, value, "integer")?
        }
        ["completion", "api_url"] => config.completion.api_url = value.to_string(),
        ["completion", "model"] => config.completion.model = value.to_string(),
        ["completion", "api_key"] => {
            config.completion.api_key = Some(value.to_string()).filter(|v| !v.is_empty())
        }
        ["completion", "timeout_seconds"] => {
            config.completion.timeout_seconds = parse_value(key, value, "integer")?
        }
        ["completion", "app_title"] => config.completion.app_title = value.to_string(),
        ["completion", "referer"] => {
            config.completion.referer = Some(value.to_string()).filter(|v| !v.is_empty())
        }
        ["speech", "rate"] => config.speech.rate = parse_value(key, value, "float")?,
        ["speech", "pitch"] => config.speech.pitch = parse_value(key, value, "float")?,
        ["speech", "auto_close"] => config.speech.auto_close = parse_value(key, value, "boolean")?,
        ["speech", "silence_timeout_ms"] => {
            config.speech.silence_timeout_ms = parse_value(key, value, "integer")?
        }
        ["logging", "level"] => config.logging.level = value.to_string(),
        _ => return Err(unknown_key(key, "config_set")),
    }

    config.validate()
}

/// Read one dotted configuration key. Secrets are masked.
fn get_config_value(config: &UnibotConfig, key: &str) -> UnibotResult<String> {
    let parts: Vec<&str> = key.split('.').collect();
    let value = match parts.as_slice() {
        ["announcements", "base_url"] => config.announcements.base_url.clone(),
        ["announcements", "path"] => config.announcements.path.clone(),
        ["announcements", "url"] => config.announcements.url(),
        ["announcements", "timeout_seconds"] => config.announcements.timeout_seconds.to_string(),
        ["completion", "api_url"] => config.completion.api_url.clone(),
        ["completion", "model"] => config.completion.model.clone(),
        ["completion", "api_key"] => config
            .completion
            .api_key
            .as_deref()
            .map(mask_secret)
            .unwrap_or_else(|| "(not set)".to_string()),
        ["completion", "timeout_seconds"] => config.completion.timeout_seconds.to_string(),
        ["completion", "app_title"] => config.completion.app_title.clone(),
        ["completion", "referer"] => config.completion.referer.clone().unwrap_or_default(),
        ["speech", "rate"] => config.speech.rate.to_string(),
        ["speech", "pitch"] => config.speech.pitch.to_string(),
        ["speech", "auto_close"] => config.speech.auto_close.to_string(),
        ["speech", "silence_timeout_ms"] => config.speech.silence_timeout_ms.to_string(),
        ["logging", "level"] => config.logging.level.clone(),
        _ => return Err(unknown_key(key, "config_get")),
    };

    Ok(value)
}

fn mask_secret(secret: &str) -> String {
    let visible: String = secret.chars().take(4).collect();
    format!("{}****", visible)
}
