// ── Core error types ──
//
// Errors surfaced by identifier handling, document composition and the
// reconciler. Transport failures are wrapped in `Remote` together with the
// operation and resource they belong to, so the message reads like
// "creating/updating \"...\": ..." rather than a bare HTTP status.

use strum::Display;
use thiserror::Error;

/// The reconciler step a remote failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Operation {
    #[strum(to_string = "checking for presence of existing")]
    ExistenceCheck,
    #[strum(to_string = "creating/updating")]
    CreateUpdate,
    #[strum(to_string = "reading")]
    Read,
    #[strum(to_string = "deleting")]
    Delete,
}

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Identifier errors ────────────────────────────────────────────
    #[error("Malformed resource identifier {input:?}: {reason}")]
    MalformedIdentifier { input: String, reason: String },

    // ── Document errors ──────────────────────────────────────────────
    #[error("Invalid JSON in {context}: {message}")]
    InvalidJson { context: String, message: String },

    #[error("Invalid identity type {value:?}: expected one of {expected}")]
    InvalidIdentityType { value: String, expected: String },

    #[error("Invalid identity: {message}")]
    InvalidIdentity { message: String },

    #[error("Validation failed for `{field}`: {reason}")]
    Validation { field: String, reason: String },

    // ── Lifecycle errors ─────────────────────────────────────────────
    #[error(
        "A resource with the ID {id:?} already exists - to be managed it needs to be imported first"
    )]
    ConflictAlreadyExists { id: String },

    #[error("Resource {id:?} was not found")]
    RemoteNotFound { id: String },

    #[error("Invalid lifecycle transition: {event} while {state}")]
    InvalidTransition { state: String, event: String },

    // ── Remote errors (wrapped with context) ─────────────────────────
    #[error("{operation} {id:?}: {source}")]
    Remote {
        operation: Operation,
        id: String,
        #[source]
        source: genrm_api::Error,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    pub(crate) fn remote(
        operation: Operation,
        id: impl ToString,
        source: genrm_api::Error,
    ) -> Self {
        Self::Remote {
            operation,
            id: id.to_string(),
            source,
        }
    }

    /// The remote reported the resource missing, either directly or as a
    /// wrapped 404.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::RemoteNotFound { .. } => true,
            Self::Remote { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    /// HTTP status of a wrapped remote failure.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Remote { source, .. } => source.status(),
            _ => None,
        }
    }

    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Remote { source, .. } if source.is_connection())
    }

    /// The operation was interrupted by its cancellation token.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Remote { source, .. } if source.is_cancelled())
    }

    /// The failure came from the remote API rather than local input.
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote { .. } | Self::RemoteNotFound { .. })
    }
}

impl From<genrm_api::Error> for CoreError {
    fn from(err: genrm_api::Error) -> Self {
        match err {
            genrm_api::Error::InvalidUrl(e) => Self::Config {
                message: format!("Invalid URL: {e}"),
            },
            genrm_api::Error::Tls(message) => Self::Config {
                message: format!("TLS setup failed: {message}"),
            },
            genrm_api::Error::Authentication { message } => Self::Config {
                message: format!("Credentials rejected: {message}"),
            },
            other => Self::Config {
                message: other.to_string(),
            },
        }
    }
}
