//! `waiverdesk` - CLI for collecting signed liability waivers
//!
//! This binary submits waivers, renders them locally and manages the queue
//! of confirmation emails that are waiting to be resent.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use chrono::Utc;
use clap::Parser;

use waiverdesk::cli::{
    read_form, read_signature, Cli, Command, ConfigCommand, QueueCommand, RenderCommand,
    SubmitCommand,
};
use waiverdesk::notify::PendingQueue;
use waiverdesk::pipeline::{build_notifier, prepare_document, SubmitError};
use waiverdesk::render::{DocumentRenderer, WaiverTemplate};
use waiverdesk::validate::Validator;
use waiverdesk::{init_logging, Config, SqliteQueue, SubmissionPipeline};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    let custom_path = cli.config;
    match cli.command {
        Command::Submit(cmd) => handle_submit(&load_config(custom_path)?, &cmd).await,
        Command::Render(cmd) => handle_render(&load_config(custom_path)?, &cmd),
        Command::Queue(cmd) => handle_queue(&load_config(custom_path)?, cmd).await,
        Command::Config(cmd) => handle_config(cmd, custom_path),
    }
}

fn load_config(custom_path: Option<PathBuf>) -> anyhow::Result<Config> {
    Config::load_from(custom_path).context("loading configuration")
}

fn open_queue(config: &Config) -> anyhow::Result<Arc<SqliteQueue>> {
    let path = config.queue_path();
    let queue = SqliteQueue::open(&path)
        .with_context(|| format!("opening notification queue at {}", path.display()))?;
    Ok(Arc::new(queue))
}

async fn handle_submit(config: &Config, cmd: &SubmitCommand) -> anyhow::Result<()> {
    let form = read_form(&cmd.form)?;
    let pad = read_signature(&cmd.signature)?;

    let queue: Arc<dyn PendingQueue> = open_queue(config)?;
    let pipeline = SubmissionPipeline::from_config(config, queue)?;

    let result = if cmd.no_sweep {
        pipeline.submit(&form, &pad).await
    } else {
        let notifier = pipeline.notifier();
        let (sweep, submitted) =
            tokio::join!(notifier.retry_pending(), pipeline.submit(&form, &pad));
        match sweep {
            Ok(report) if report.attempted > 0 || report.pruned > 0 => {
                tracing::info!(
                    sent = report.sent,
                    failed = report.failed,
                    pruned = report.pruned,
                    remaining = report.remaining,
                    "Resent queued notifications"
                );
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "Queue sweep failed"),
        }
        submitted
    };

    match result {
        Ok(receipt) => {
            if cmd.json {
                println!("{}", serde_json::to_string_pretty(&receipt)?);
            } else {
                println!("{}", receipt.summary());
                println!("  Waiver: {}", receipt.artifact_url);
                println!("  Record: {}", receipt.record_id);
            }
            Ok(())
        }
        Err(SubmitError::Upload {
            local_copy: Some(path),
            source,
        }) => {
            bail!(
                "waiver upload failed: {source}\nThe signed waiver was saved to {}",
                path.display()
            )
        }
        Err(e) => Err(e.into()),
    }
}

fn handle_render(config: &Config, cmd: &RenderCommand) -> anyhow::Result<()> {
    let form = read_form(&cmd.form)?;
    let pad = read_signature(&cmd.signature)?;

    let template = WaiverTemplate::default();
    let validator = Validator::for_template(&template);
    let renderer = DocumentRenderer::new(config.layout.clone(), template)?;
    let (_, document) = prepare_document(&validator, &renderer, &form, &pad, Utc::now())?;

    let path = output_path(&cmd.output, &document.filename);
    std::fs::write(&path, &document.bytes)
        .with_context(|| format!("writing {}", path.display()))?;
    println!(
        "Wrote {} ({} bytes, {} page{})",
        path.display(),
        document.len(),
        document.page_count,
        if document.page_count == 1 { "" } else { "s" }
    );
    Ok(())
}

fn output_path(output: &Path, filename: &str) -> PathBuf {
    if output.is_dir() {
        output.join(filename)
    } else {
        output.to_path_buf()
    }
}

async fn handle_queue(config: &Config, cmd: QueueCommand) -> anyhow::Result<()> {
    let queue = open_queue(config)?;

    match cmd {
        QueueCommand::List { json } => {
            let entries = queue.list()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else if entries.is_empty() {
                println!("No pending notifications.");
            } else {
                for entry in &entries {
                    println!(
                        "#{:<4} {}  {}  attempts={}",
                        entry.id,
                        entry.enqueued_at.format("%Y-%m-%d %H:%M"),
                        entry.payload.form_data.form_id,
                        entry.attempts
                    );
                    if let Some(error) = &entry.last_error {
                        println!("      last error: {error}");
                    }
                }
                let stats = queue.stats()?;
                println!();
                println!(
                    "{} pending, database {} ({} bytes)",
                    stats.pending,
                    queue.path().display(),
                    stats.db_size_bytes
                );
            }
        }
        QueueCommand::Retry => {
            let notifier = build_notifier(config, queue)?;
            let report = notifier.retry_pending().await?;
            println!(
                "Attempted {}, sent {}, failed {}, pruned {}. {} still pending.",
                report.attempted, report.sent, report.failed, report.pruned, report.remaining
            );
        }
        QueueCommand::Clear { yes } => {
            if yes {
                let removed = queue.clear()?;
                println!("Removed {removed} pending notification(s).");
            } else {
                println!(
                    "This will drop {} pending notification(s) without sending them.",
                    queue.len()?
                );
                println!("Use --yes to confirm.");
            }
        }
    }
    Ok(())
}

fn handle_config(cmd: ConfigCommand, custom_path: Option<PathBuf>) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            let config = load_config(custom_path)?;
            let shown = config.redacted();
            if json {
                println!("{}", serde_json::to_string_pretty(&shown)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                print!("{}", toml_like(&serde_json::to_value(&shown)?));
                println!("[paths]");
                println!("  queue = {}", config.queue_path().display());
                println!("  fallback_dir = {}", config.fallback_dir().display());
            }
            Ok(())
        }
        ConfigCommand::Path => {
            let path = custom_path.unwrap_or_else(Config::default_config_path);
            println!("{}", path.display());
            Ok(())
        }
        ConfigCommand::Validate { file } => {
            let path = file
                .or(custom_path)
                .unwrap_or_else(Config::default_config_path);
            handle_validate(&path)
        }
    }
}

fn handle_validate(path: &Path) -> anyhow::Result<()> {
    println!("Validating configuration: {}", path.display());
    let config = Config::load_from(Some(path.to_path_buf()))?;

    let mut missing = Vec::new();
    for check in [
        config.artifact_settings().err(),
        config.record_settings().err(),
        config.notify_settings().err(),
    ]
    .into_iter()
    .flatten()
    {
        missing.push(check.to_string());
    }

    if missing.is_empty() {
        println!("Configuration is valid.");
        Ok(())
    } else {
        for message in &missing {
            println!("  {message}");
        }
        bail!("configuration is incomplete")
    }
}

/// Render a two-level JSON object as `[section]` blocks of `key = value`.
fn toml_like(value: &serde_json::Value) -> String {
    use std::fmt::Write as _;

    let mut out = String::new();
    let Some(sections) = value.as_object() else {
        return value.to_string();
    };
    for (section, body) in sections {
        let _ = writeln!(out, "[{section}]");
        if let Some(fields) = body.as_object() {
            for (key, field) in fields {
                let shown = match field {
                    serde_json::Value::Null => "(unset)".to_string(),
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                let _ = writeln!(out, "  {key} = {shown}");
            }
        }
        out.push('\n');
    }
    out
}
