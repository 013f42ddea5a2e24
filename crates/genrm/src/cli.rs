//! Clap derive structures for the `genrm` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// genrm -- declarative resources over a generic resource-manager API
#[derive(Debug, Parser)]
#[command(
    name = "genrm",
    version,
    about = "Manage resource-manager resources declared as JSON documents",
    long_about = "Create, update, import and delete resources behind a generic,\n\
        versioned resource-manager REST API. Each resource is a URL, an\n\
        api-version and a JSON body; state is recorded in a local file.",
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
    /// Endpoint profile to use
    #[arg(long, short = 'p', env = "GENRM_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Resource manager endpoint (overrides profile)
    #[arg(long, short = 'e', env = "GENRM_ENDPOINT", global = true)]
    pub endpoint: Option<String>,

    /// Bearer token
    #[arg(long, env = "GENRM_TOKEN", global = true, hide_env_values = true)]
    pub token: Option<String>,

    /// State file (overrides config default)
    #[arg(long, env = "GENRM_STATE_FILE", global = true)]
    pub state_file: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "GENRM_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Skip TLS certificate verification
    #[arg(long, short = 'k', env = "GENRM_INSECURE", global = true)]
    pub insecure: bool,

    /// Per-request timeout in seconds
    #[arg(long, env = "GENRM_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create or update the resources declared in a manifest
    Apply(ApplyArgs),

    /// Show what `apply` would change
    Plan(PlanArgs),

    /// Re-read recorded resources from the remote
    Refresh(RefreshArgs),

    /// Adopt an existing remote resource into state
    Import(ImportArgs),

    /// Delete a recorded resource
    #[command(alias = "rm")]
    Delete(DeleteArgs),

    /// Show one recorded resource
    Show(ShowArgs),

    /// List recorded resources
    #[command(alias = "ls")]
    List,

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Resource Commands ────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ManifestArgs {
    /// Manifest file (YAML or JSON) with a `resources` list
    #[arg(long, short = 'f', value_name = "FILE")]
    pub file: PathBuf,

    /// Only these resources (by name)
    #[arg(long = "target", short = 't', value_name = "NAME")]
    pub targets: Vec<String>,
}

#[derive(Debug, Args)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub manifest: ManifestArgs,
}

#[derive(Debug, Args)]
pub struct PlanArgs {
    #[command(flatten)]
    pub manifest: ManifestArgs,

    /// Exit with code 10 when changes are pending
    #[arg(long)]
    pub detailed_exitcode: bool,
}

#[derive(Debug, Args)]
pub struct RefreshArgs {
    /// Only these resources (default: all)
    pub names: Vec<String>,
}

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// Name to record the resource under
    pub name: String,

    /// Encoded identifier: `{url}?api-version={version}`
    pub id: String,

    /// Dotted paths to project into the output
    #[arg(long = "path", value_name = "PATH")]
    pub paths: Vec<String>,
}

#[derive(Debug, Args)]
pub struct DeleteArgs {
    /// Recorded resource name
    pub name: String,

    /// Only forget the resource locally; leave the remote untouched
    #[arg(long)]
    pub keep_remote: bool,
}

#[derive(Debug, Args)]
pub struct ShowArgs {
    /// Recorded resource name
    pub name: String,

    /// Print only the projected output document
    #[arg(long)]
    pub output_only: bool,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current resolved configuration
    Show,

    /// Set a profile value
    Set {
        /// Profile key (e.g., "endpoint", "timeouts.create")
        key: String,

        /// Value to set
        value: String,
    },

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Store a bearer token in the system keyring
    SetToken {
        /// Profile name
        #[arg(long)]
        profile: Option<String>,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
