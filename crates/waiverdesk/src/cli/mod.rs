//! Command-line interface for waiverdesk.
//!
//! This module provides the CLI structure and the file readers used by the
//! `waiverdesk` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    read_form, read_signature, ConfigCommand, QueueCommand, RenderCommand, SubmitCommand,
};

/// waiverdesk - Collect signed liability waivers
///
/// Validates a guest's answers, renders the signed waiver to PDF, stores it,
/// records the submission and emails a confirmation. Confirmations that
/// cannot be delivered wait in a local queue until the next run.
#[derive(Debug, Parser)]
#[command(name = "waiverdesk")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Submit a signed waiver
    Submit(SubmitCommand),

    /// Render a waiver to a local PDF without sending it anywhere
    Render(RenderCommand),

    /// Inspect or resend queued confirmation emails
    #[command(subcommand)]
    Queue(QueueCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        crate::logging::Verbosity::from_flags(self.verbose, self.quiet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn cli_with(verbose: u8, quiet: bool) -> Cli {
        Cli {
            config: None,
            verbose,
            quiet,
            command: Command::Queue(QueueCommand::Retry),
        }
    }

    #[test]
    fn test_cli_name() {
        assert_eq!(Cli::command().get_name(), "waiverdesk");
    }

    #[test]
    fn test_verbosity_levels() {
        use crate::logging::Verbosity;

        assert_eq!(cli_with(0, true).verbosity(), Verbosity::Quiet);
        assert_eq!(cli_with(3, true).verbosity(), Verbosity::Quiet);
        assert_eq!(cli_with(0, false).verbosity(), Verbosity::Normal);
        assert_eq!(cli_with(1, false).verbosity(), Verbosity::Verbose);
        assert_eq!(cli_with(2, false).verbosity(), Verbosity::Trace);
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_submit() {
        let args = vec![
            "waiverdesk",
            "submit",
            "--form",
            "form.json",
            "--signature",
            "sig.json",
        ];
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Command::Submit(cmd) => {
                assert_eq!(cmd.form, PathBuf::from("form.json"));
                assert_eq!(cmd.signature, PathBuf::from("sig.json"));
                assert!(!cmd.no_sweep);
                assert!(!cmd.json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_submit_requires_signature() {
        let args = vec!["waiverdesk", "submit", "--form", "form.json"];
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn test_parse_submit_no_sweep() {
        let args = vec![
            "waiverdesk",
            "submit",
            "-f",
            "form.json",
            "-s",
            "sig.json",
            "--no-sweep",
        ];
        let cli = Cli::try_parse_from(args).unwrap();
        assert!(matches!(
            cli.command,
            Command::Submit(SubmitCommand { no_sweep: true, .. })
        ));
    }

    #[test]
    fn test_parse_render_default_output() {
        let args = vec!["waiverdesk", "render", "-f", "form.json", "-s", "sig.json"];
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Command::Render(cmd) => assert_eq!(cmd.output, PathBuf::from(".")),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_queue_commands() {
        let cli = Cli::try_parse_from(["waiverdesk", "queue", "list", "--json"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Queue(QueueCommand::List { json: true })
        ));

        let cli = Cli::try_parse_from(["waiverdesk", "queue", "retry"]).unwrap();
        assert!(matches!(cli.command, Command::Queue(QueueCommand::Retry)));

        let cli = Cli::try_parse_from(["waiverdesk", "queue", "clear", "-y"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Queue(QueueCommand::Clear { yes: true })
        ));
    }

    #[test]
    fn test_parse_config_validate() {
        let args = vec!["waiverdesk", "config", "validate", "--file", "/tmp/c.toml"];
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Command::Config(ConfigCommand::Validate { file }) => {
                assert_eq!(file, Some(PathBuf::from("/tmp/c.toml")));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_with_config() {
        let args = vec!["waiverdesk", "-c", "/custom/config.toml", "queue", "list"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = vec!["waiverdesk", "queue", "retry", "-vv"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(cli.verbose, 2);

        let args = vec!["waiverdesk", "config", "path", "-q"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert!(cli.quiet);
    }
}
