//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use genrm_config::ConfigError;
use genrm_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    /// `plan --detailed-exitcode` with pending changes.
    pub const CHANGES_PENDING: i32 = 10;
    /// Interrupted by Ctrl-C (128 + SIGINT).
    pub const CANCELLED: i32 = 130;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the resource manager while {context}")]
    #[diagnostic(
        code(genrm::connection_failed),
        help(
            "Check the endpoint and your network.\n\
             Try: genrm config show"
        )
    )]
    ConnectionFailed {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed (HTTP {status})")]
    #[diagnostic(
        code(genrm::auth_failed),
        help(
            "Verify the bearer token is current and has access to the resource.\n\
             Run: genrm config set-token"
        )
    )]
    AuthFailed {
        status: u16,
        #[source]
        source: CoreError,
    },

    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(genrm::no_credentials),
        help(
            "Configure credentials with: genrm config init\n\
             Or set GENRM_TOKEN, or `anonymous = true` for local emulators."
        )
    )]
    NoCredentials { profile: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(genrm::not_found),
        help("Run: genrm {list_command} to see what is recorded")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error(
        "A resource with the ID {id:?} already exists - to be managed it needs to be imported first"
    )]
    #[diagnostic(
        code(genrm::conflict),
        help("Run: genrm import <NAME> '{id}'")
    )]
    Conflict { id: String },

    // ── Remote ───────────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(code(genrm::remote))]
    Remote(CoreError),

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(genrm::validation))]
    Validation { field: String, reason: String },

    #[error("Invalid manifest {path}: {reason}")]
    #[diagnostic(
        code(genrm::manifest),
        help("A manifest is a YAML or JSON document with a top-level `resources` list.")
    )]
    Manifest { path: String, reason: String },

    #[error("Unreadable state file {path}: {reason}")]
    #[diagnostic(
        code(genrm::state),
        help("Restore the file from a backup, or point --state-file elsewhere.")
    )]
    State { path: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(genrm::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: genrm config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No endpoint configured")]
    #[diagnostic(
        code(genrm::no_config),
        help(
            "Create a profile with: genrm config init\n\
             Or pass --endpoint. Config expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(genrm::config))]
    Config(Box<figment::Error>),

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(genrm::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── Timeout / cancellation ───────────────────────────────────────
    #[error("{operation} timed out after {}", humantime::format_duration(*.limit))]
    #[diagnostic(
        code(genrm::timeout),
        help("Raise the limit with `genrm config set timeouts.{operation} <duration>`.")
    )]
    Timeout {
        operation: String,
        limit: std::time::Duration,
    },

    #[error("Interrupted")]
    #[diagnostic(code(genrm::cancelled))]
    Cancelled,

    #[error("{count} resource(s) have pending changes")]
    #[diagnostic(code(genrm::changes_pending))]
    ChangesPending { count: usize },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    #[diagnostic(code(genrm::json))]
    Json(#[from] serde_json::Error),

    #[error("Invalid YAML: {0}")]
    #[diagnostic(code(genrm::yaml))]
    Yaml(#[from] serde_yaml::Error),
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Conflict { .. } => exit_code::CONFLICT,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Cancelled => exit_code::CANCELLED,
            Self::ChangesPending { .. } => exit_code::CHANGES_PENDING,
            Self::Validation { .. }
            | Self::Manifest { .. }
            | Self::ProfileNotFound { .. }
            | Self::NoConfig { .. }
            | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    /// Quiet outcomes that still end the process non-zero.
    pub fn is_silent(&self) -> bool {
        matches!(self, Self::ChangesPending { .. })
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        if err.is_cancelled() {
            return Self::Cancelled;
        }
        if err.is_connection() {
            let context = match &err {
                CoreError::Remote { operation, id, .. } => format!("{operation} {id}"),
                _ => "connecting".into(),
            };
            return Self::ConnectionFailed {
                context,
                source: Box::new(err),
            };
        }
        if let Some(status @ (401 | 403)) = err.status() {
            return Self::AuthFailed {
                status,
                source: err,
            };
        }

        match err {
            CoreError::ConflictAlreadyExists { id } => Self::Conflict { id },
            CoreError::RemoteNotFound { id } => Self::NotFound {
                resource_type: "remote resource".into(),
                identifier: id,
                list_command: "list".into(),
            },
            CoreError::Validation { field, reason } => Self::Validation { field, reason },
            CoreError::MalformedIdentifier { input, reason } => Self::Validation {
                field: "id".into(),
                reason: format!("{input:?}: {reason}"),
            },
            e @ (CoreError::InvalidJson { .. }
            | CoreError::InvalidIdentity { .. }
            | CoreError::InvalidIdentityType { .. }) => Self::Validation {
                field: "resource".into(),
                reason: e.to_string(),
            },
            other => Self::Remote(other),
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::UnknownProfile { name } => Self::ProfileNotFound {
                name,
                available: "(see: genrm config profiles)".into(),
            },
            ConfigError::NoCredentials { profile } => Self::NoCredentials { profile },
            ConfigError::Discovery(core) => core.into(),
            ConfigError::Serialization(e) => Self::Validation {
                field: "config".into(),
                reason: format!("failed to serialize config: {e}"),
            },
            ConfigError::Figment(e) => Self::Config(e),
            ConfigError::Io(e) => Self::Io(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_exits_with_conflict_code() {
        let err = CliError::from(CoreError::ConflictAlreadyExists {
            id: "/a?api-version=1".into(),
        });
        assert_eq!(err.exit_code(), exit_code::CONFLICT);
        assert!(err.to_string().contains("needs to be imported first"));
    }

    #[test]
    fn malformed_identifier_is_a_usage_error() {
        let err = CliError::from(CoreError::MalformedIdentifier {
            input: "nope".into(),
            reason: "missing api-version".into(),
        });
        assert_eq!(err.exit_code(), exit_code::USAGE);
    }

    #[test]
    fn unknown_profile_is_a_usage_error() {
        let err = CliError::from(ConfigError::UnknownProfile {
            name: "prod".into(),
        });
        assert!(matches!(err, CliError::ProfileNotFound { .. }));
        assert_eq!(err.exit_code(), exit_code::USAGE);
    }

    #[test]
    fn timeout_message_is_human_readable() {
        let err = CliError::Timeout {
            operation: "create".into(),
            limit: std::time::Duration::from_secs(1800),
        };
        assert_eq!(err.to_string(), "create timed out after 30m");
        assert_eq!(err.exit_code(), exit_code::TIMEOUT);
    }
}
