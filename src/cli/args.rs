//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--config <path>`: Use this configuration file
//! - `--debug`: Enable debug logging

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// gitops-guard - template rollback and workload readiness checks for GitOps controllers
#[derive(Parser, Debug)]
#[command(name = "gitops-guard")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Use this configuration file instead of the discovered one
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Move a template repository's tracked branch back one commit
    #[command(
        long_about = "Move a template repository's tracked branch back to the first parent \
            of its tip with a forced ref update.\n\n\
            Not idempotent: every successful run undoes one more commit.",
        after_help = "\
EXAMPLES:
    # Token from a cluster secret (key \"token\")
    gitops-guard revert --uri https://github.com/acme/templates \\
        --namespace team-a --secret-ref gh-token

    # Token from the environment
    GITHUB_TOKEN=... gitops-guard revert --uri github.com/acme/templates --token-env GITHUB_TOKEN"
    )]
    Revert(RevertArgs),

    /// Wait for a workload to reach a state
    Wait {
        #[command(subcommand)]
        condition: WaitCondition,
    },

    /// Generate shell completion scripts
    #[command(
        long_about = "Generate shell completion scripts for tab-completion.",
        after_help = "\
EXAMPLES:
    # Bash (add to ~/.bashrc)
    gitops-guard completion bash >> ~/.bashrc

    # Zsh (add to ~/.zshrc)
    gitops-guard completion zsh >> ~/.zshrc"
    )]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Arguments for `revert`.
#[derive(Args, Debug, Clone)]
pub struct RevertArgs {
    /// Template repository URI (last two path segments are owner/name)
    #[arg(long)]
    pub uri: String,

    /// Namespace of the GitOps resource and its credential secret
    #[arg(long, short = 'n', default_value = "default")]
    pub namespace: String,

    /// Name of the GitOps resource (used in logs)
    #[arg(long, default_value = "gitops")]
    pub name: String,

    /// Secret holding the access token
    #[arg(long)]
    pub secret_ref: Option<String>,

    /// Read the token from this environment variable instead of the cluster
    #[arg(long, value_name = "VAR", conflicts_with = "secret_ref")]
    pub token_env: Option<String>,

    /// Revert this branch instead of the first ref the host lists
    #[arg(long)]
    pub branch: Option<String>,

    /// Re-read the ref after the update and fail if it did not move
    #[arg(long)]
    pub verify: bool,
}

/// Timing flags shared by every wait.
#[derive(Args, Debug, Clone)]
pub struct WaitTiming {
    /// Namespace to look in
    #[arg(long, short = 'n', default_value = "default")]
    pub namespace: String,

    /// Seconds between checks (overrides config)
    #[arg(long)]
    pub interval: Option<f64>,

    /// Total seconds to wait (overrides config)
    #[arg(long)]
    pub timeout: Option<f64>,
}

/// Conditions `wait` can block on.
#[derive(Subcommand, Debug, Clone)]
pub enum WaitCondition {
    /// A pod with this exact name is Running
    Pod {
        name: String,
        #[command(flatten)]
        timing: WaitTiming,
    },
    /// A pod whose name starts with PREFIX and runs IMAGE is Running
    PodImage {
        prefix: String,
        /// Substring of a container image
        image: String,
        #[command(flatten)]
        timing: WaitTiming,
    },
    /// No pod whose name starts with PREFIX is left (or it is Terminated)
    PodAbsent {
        prefix: String,
        /// Only consider pods running an image containing this
        #[arg(long)]
        image: Option<String>,
        #[command(flatten)]
        timing: WaitTiming,
    },
    /// A CronJob whose name starts with PREFIX exists
    Cronjob {
        prefix: String,
        #[command(flatten)]
        timing: WaitTiming,
    },
}

impl WaitCondition {
    pub fn timing(&self) -> &WaitTiming {
        match self {
            WaitCondition::Pod { timing, .. }
            | WaitCondition::PodImage { timing, .. }
            | WaitCondition::PodAbsent { timing, .. }
            | WaitCondition::Cronjob { timing, .. } => timing,
        }
    }
}

/// Supported shells for completion
#[derive(clap::ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}
