//! Clap derive structures for the `pitu` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// pitu -- edge gateway for router telemetry and device shadows
#[derive(Debug, Parser)]
#[command(
    name = "pitu",
    version,
    about = "Edge gateway: sanitized router telemetry into device shadows, live shadow bridge for UI clients",
    long_about = "Runs the pitu edge gateway.\n\n\
        Router telemetry is polled, stripped of sensitive sections, and\n\
        reported into a named device shadow. UI clients connect over\n\
        websocket to receive every shadow and its live updates.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "PITU_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log line format
    #[arg(long, env = "PITU_LOG_FORMAT", default_value = "text", global = true)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    Text,
    /// One JSON object per line
    Json,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the gateway: telemetry ingest, shadow bridge, router poller
    Serve(ServeArgs),

    /// Sanitize a telemetry document and print the result
    Sanitize(SanitizeArgs),

    /// Talk to the cellular router directly
    Router(RouterArgs),

    /// Manage configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Serve ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Bridge listen address (overrides bridge.listen)
    #[arg(long)]
    pub listen: Option<String>,

    /// Do not poll the router; telemetry must come from another publisher
    #[arg(long)]
    pub no_poller: bool,
}

// ── Sanitize ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SanitizeArgs {
    /// JSON file to read (stdin when omitted or "-")
    pub file: Option<PathBuf>,

    /// Print compact single-line JSON
    #[arg(long)]
    pub compact: bool,
}

// ── Router ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct RouterArgs {
    #[command(subcommand)]
    pub command: RouterCommand,
}

#[derive(Debug, Subcommand)]
pub enum RouterCommand {
    /// Log in and show link status
    Status {
        /// Print the sanitized status model as JSON
        #[arg(long)]
        json: bool,
    },

    /// Bounce the cellular link
    Reconnect,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration (passwords masked)
    Show,

    /// Print the config file path
    Path,

    /// Write a config file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Store the router password in the system keyring (read from stdin)
    SetPassword,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
