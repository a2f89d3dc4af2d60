//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};

use crate::error::{Error, Result};
use crate::signature::{SignaturePad, StrokeData};
use crate::submission::FormInput;

/// Submit command arguments.
#[derive(Debug, Args)]
pub struct SubmitCommand {
    /// Form answers as JSON (`fields`, `initials`, `age_confirmed`)
    #[arg(short, long, value_name = "FILE")]
    pub form: PathBuf,

    /// Signature strokes as JSON (`width`, `height`, `strokes`)
    #[arg(short, long, value_name = "FILE")]
    pub signature: PathBuf,

    /// Skip resending queued notifications
    #[arg(long)]
    pub no_sweep: bool,

    /// Output the receipt as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Render command arguments.
#[derive(Debug, Args)]
pub struct RenderCommand {
    /// Form answers as JSON
    #[arg(short, long, value_name = "FILE")]
    pub form: PathBuf,

    /// Signature strokes as JSON
    #[arg(short, long, value_name = "FILE")]
    pub signature: PathBuf,

    /// Where to write the PDF (a directory keeps the generated file name)
    #[arg(short, long, value_name = "PATH", default_value = ".")]
    pub output: PathBuf,
}

/// Pending notification queue commands.
#[derive(Debug, Subcommand)]
pub enum QueueCommand {
    /// List queued notifications
    List {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Resend every queued notification now
    Retry,

    /// Drop every queued notification
    Clear {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration with secrets masked
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Read form answers from a JSON file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a form object.
pub fn read_form(path: &Path) -> Result<FormInput> {
    let text = std::fs::read_to_string(path)?;
    serde_json::from_str(&text)
        .map_err(|e| Error::invalid_input(format!("{}: {e}", path.display())))
}

/// Read recorded strokes from a JSON file and replay them onto a pad.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the strokes do not fit
/// a valid canvas.
pub fn read_signature(path: &Path) -> Result<SignaturePad> {
    let text = std::fs::read_to_string(path)?;
    let data: StrokeData = serde_json::from_str(&text)
        .map_err(|e| Error::invalid_input(format!("{}: {e}", path.display())))?;
    SignaturePad::from_strokes(&data)
        .map_err(|e| Error::invalid_input(format!("{}: {e}", path.display())))
}
