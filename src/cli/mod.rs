//! CLI module for the plan delegator
//!
//! Provides command-line interface parsing and handling for the plan-delegator binary.
//! Uses clap for argument parsing and owo-colors for colored terminal output.

pub mod init;
pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// plan-delegator - executes planner-produced action plans
///
/// Walks a plan step by step, fills request bodies for each capability with a
/// completion model and dispatches them to the configured integrations.
#[derive(Parser, Debug)]
#[command(
    name = "plan-delegator",
    author = "Dirmacs <build@dirmacs.com>",
    version,
    about = "plan-delegator - delegation and schema-synthesis engine",
    long_about = "Executes a multi-step action plan produced by an upstream planner.\n\
                  Each step is answered by the completion model, executed against a\n\
                  capability integration (Google Calendar, Zoom, Outlook, REST), or skipped.\n\n\
                  Use 'init' to scaffold a configuration, then 'run' a plan file.",
    after_help = "EXAMPLES:\n    \
                  plan-delegator init                         # Scaffold delegator.toml and a sample plan\n    \
                  plan-delegator validate                     # Check delegator.toml\n    \
                  plan-delegator run plan.json                # Execute a plan\n    \
                  plan-delegator run plan.json -o result.json # Execute and save the result\n    \
                  plan-delegator run next.json --resume result.json  # Continue a conversation"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "delegator.toml", global = true)]
    pub config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Execute an action plan
    ///
    /// The plan file holds either a JSON array of steps or an object with a
    /// `steps` array.
    Run {
        /// Plan file (JSON)
        plan: PathBuf,

        /// Initial narrative handed to the first step
        #[arg(long)]
        context: Option<String>,

        /// Continue from a previous result file (narrative and capability state)
        #[arg(long)]
        resume: Option<PathBuf>,

        /// Write the plan result as JSON to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate the configuration file
    Validate,

    /// List the configured capabilities
    Capabilities,

    /// Scaffold a starter configuration and a sample plan
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Overwrite existing files
        #[arg(short, long)]
        force: bool,

        /// Completion model provider to configure (ollama or openai)
        #[arg(long, default_value = "ollama")]
        provider: String,
    },
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_command() {
        let cli = Cli::try_parse_from([
            "plan-delegator",
            "run",
            "plan.json",
            "--context",
            "Dana is free on Tuesday",
            "-o",
            "result.json",
        ])
        .unwrap();

        assert_eq!(cli.config, PathBuf::from("delegator.toml"));
        match cli.command {
            Commands::Run {
                plan,
                context,
                resume,
                output,
            } => {
                assert_eq!(plan, PathBuf::from("plan.json"));
                assert_eq!(context.as_deref(), Some("Dana is free on Tuesday"));
                assert!(resume.is_none());
                assert_eq!(output, Some(PathBuf::from("result.json")));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "plan-delegator",
            "validate",
            "--config",
            "custom.toml",
            "--no-color",
            "--json-logs",
        ])
        .unwrap();

        assert_eq!(cli.config, PathBuf::from("custom.toml"));
        assert!(cli.no_color);
        assert!(cli.json_logs);
        assert!(matches!(cli.command, Commands::Validate));
    }

    #[test]
    fn test_init_defaults() {
        let cli = Cli::try_parse_from(["plan-delegator", "init"]).unwrap();
        match cli.command {
            Commands::Init {
                path,
                force,
                provider,
            } => {
                assert_eq!(path, PathBuf::from("."));
                assert!(!force);
                assert_eq!(provider, "ollama");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_run_requires_plan() {
        assert!(Cli::try_parse_from(["plan-delegator", "run"]).is_err());
    }
}
