//! Schema Overseer CLI
//!
//! Resolves search-log payloads against a registry that accepts both the
//! legacy `{query}` shape and the current `{text, image, created_at}` shape.

use std::io::Read;
use std::path::PathBuf;

use anyhow::Context as _;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use schema_overseer::{Builder, RegistryConfig, Schema, SchemaRegistry, SetupError, Violation};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "overseer")]
#[command(about = "Resolve versioned payloads into one canonical context")]
struct Cli {
    /// Registry config file (TOML)
    #[arg(short, long)]
    config: Option<String>,

    /// Reject payloads matched by more than one schema
    #[arg(long)]
    strict: bool,

    /// Validate builder output
    #[arg(long)]
    validate_output: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a JSON payload (file or stdin)
    Resolve {
        /// Payload file, stdin if omitted
        file: Option<PathBuf>,
    },

    /// List registered schemas in priority order
    Schemas,
}

/// Canonical context every payload version is built into
#[derive(Debug, Clone, Serialize, Deserialize)]
struct LogContext {
    log_entry: String,
    log_datetime: DateTime<Utc>,
}

/// Legacy payload
#[derive(Debug, Deserialize)]
struct OldPayload {
    query: String,
}

impl Schema for OldPayload {}

/// Current payload: text, an image link, or both
#[derive(Debug, Deserialize)]
struct NewPayload {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

impl Schema for NewPayload {
    fn validate(&self) -> Result<(), Violation> {
        if self.text.is_none() && self.image.is_none() {
            return Err(Violation::new::<Self>(
                "At least one of the following fields must be present: text, image",
            ));
        }
        if let Some(image) = &self.image {
            if !(image.starts_with("http://") || image.starts_with("https://")) {
                return Err(Violation::new::<Self>(format!(
                    "image is not an http(s) URL: {}",
                    image
                )));
            }
        }
        Ok(())
    }
}

fn old_builder(payload: OldPayload) -> LogContext {
    LogContext {
        log_entry: payload.query,
        log_datetime: Utc::now(),
    }
}

fn new_builder(payload: NewPayload) -> LogContext {
    let text = payload.text.as_deref().unwrap_or("<no text>");
    let image = payload.image.as_deref().unwrap_or("empty");
    LogContext {
        log_entry: format!("{} | <image \"{}\">", text, image),
        log_datetime: payload.created_at.unwrap_or_else(Utc::now),
    }
}

fn payload_registry(mut config: RegistryConfig) -> Result<SchemaRegistry<LogContext>, SetupError> {
    if config.discovery_paths.is_empty() {
        config.discovery_paths = vec!["payload".to_string()];
    }

    let mut registry = SchemaRegistry::new(config);
    registry.add_module("payload.models.new", |registry| {
        registry.register_schema::<NewPayload>();
        Ok(())
    })?;
    registry.add_module("payload.models.old", |registry| {
        registry.register_schema::<OldPayload>();
        Ok(())
    })?;
    registry.add_module("payload.builders", |registry| {
        registry.register_builder(Builder::from_fn("new_builder", new_builder))?;
        registry.register_builder(Builder::from_fn("old_builder", old_builder))?;
        Ok(())
    })?;
    registry.setup()?;
    Ok(registry)
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<i32> {
    let mut config =
        RegistryConfig::load_from(cli.config.as_deref()).context("loading registry config")?;
    config.check_for_single_valid_schema |= cli.strict;
    config.validate_output |= cli.validate_output;

    let registry = payload_registry(config).context("setting up payload registry")?;

    match cli.command {
        Commands::Schemas => {
            for (priority, schema) in registry.schemas().enumerate() {
                let builder = registry.builder_for(schema).map(|b| b.name()).unwrap_or("<none>");
                println!("{}. {} -> {}", priority + 1, schema, builder);
            }
            Ok(0)
        }

        Commands::Resolve { file } => {
            let raw = match file {
                Some(path) => std::fs::read_to_string(&path)
                    .with_context(|| format!("reading payload {}", path.display()))?,
                None => {
                    let mut buf = String::new();
                    std::io::stdin()
                        .read_to_string(&mut buf)
                        .context("reading payload from stdin")?;
                    buf
                }
            };
            let payload: serde_json::Value =
                serde_json::from_str(&raw).context("payload is not JSON")?;

            match registry.build_from_value(payload) {
                Ok(context) => {
                    println!(
                        "✅ User query for logging: \"{}\" at {}",
                        context.log_entry, context.log_datetime
                    );
                    Ok(0)
                }
                Err(err) if err.is_invalid_input() => {
                    println!("❌ Invalid payload schema: {}", err);
                    Ok(2)
                }
                Err(err) => Err(err.into()),
            }
        }
    }
}
