// ── Runtime client configuration ──
//
// These types describe *how* to reach a resource manager. They carry
// credential data and tuning but never touch disk; the CLI builds a
// `ClientConfig` from its profile and hands it in.

use std::sync::Arc;
use std::time::Duration;

use genrm_api::{Credentials, RemoteClient, ResourceClient, TlsMode, TransportConfig};
use secrecy::SecretString;
use url::Url;

use crate::error::CoreError;

/// How to authenticate against the resource manager.
#[derive(Debug, Clone, Default)]
pub enum AuthCredentials {
    /// Pre-acquired bearer token.
    BearerToken(SecretString),
    /// No `Authorization` header (local emulators).
    #[default]
    Anonymous,
}

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (self-signed gateways).
    DangerAcceptInvalid,
}

impl From<&TlsVerification> for TlsMode {
    fn from(tls: &TlsVerification) -> Self {
        match tls {
            TlsVerification::SystemDefaults => Self::System,
            TlsVerification::CustomCa(path) => Self::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => Self::DangerAcceptInvalid,
        }
    }
}

/// Upper bounds for whole lifecycle operations, polling included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationTimeouts {
    pub create: Duration,
    pub read: Duration,
    pub update: Duration,
    pub delete: Duration,
}

impl Default for OperationTimeouts {
    fn default() -> Self {
        Self {
            create: Duration::from_secs(30 * 60),
            read: Duration::from_secs(5 * 60),
            update: Duration::from_secs(30 * 60),
            delete: Duration::from_secs(30 * 60),
        }
    }
}

/// Configuration for talking to one resource manager endpoint.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Resource manager endpoint; relative resource URLs resolve against it.
    pub endpoint: Url,
    pub auth: AuthCredentials,
    pub tls: TlsVerification,
    /// Per-request HTTP timeout.
    pub timeout: Duration,
    pub timeouts: OperationTimeouts,
    pub max_retries: u32,
    pub count_throttling_as_retry: bool,
    pub poll_interval: Duration,
}

impl ClientConfig {
    pub fn new(endpoint: Url) -> Self {
        let transport = TransportConfig::default();
        Self {
            endpoint,
            auth: AuthCredentials::default(),
            tls: TlsVerification::default(),
            timeout: transport.timeout,
            timeouts: OperationTimeouts::default(),
            max_retries: transport.max_retries,
            count_throttling_as_retry: transport.count_throttling_as_retry,
            poll_interval: transport.poll_interval,
        }
    }

    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: TlsMode::from(&self.tls),
            timeout: self.timeout,
            max_retries: self.max_retries,
            count_throttling_as_retry: self.count_throttling_as_retry,
            poll_interval: self.poll_interval,
            ..TransportConfig::default()
        }
    }

    fn credentials(&self) -> Credentials {
        match &self.auth {
            AuthCredentials::BearerToken(token) => Credentials::BearerToken(token.clone()),
            AuthCredentials::Anonymous => Credentials::Anonymous,
        }
    }

    /// Build the HTTP client the reconciler talks through.
    pub fn build_client(&self) -> Result<Arc<dyn RemoteClient>, CoreError> {
        let client = ResourceClient::new(
            self.endpoint.as_str(),
            &self.credentials(),
            &self.transport(),
        )?;
        Ok(Arc::new(client))
    }
}

/// Resolve the resource manager endpoint of `environment` through a
/// metadata host.
pub async fn discover_endpoint(
    metadata_host: &str,
    environment: &str,
    tls: &TlsVerification,
) -> Result<Url, CoreError> {
    let transport = TransportConfig {
        tls: TlsMode::from(tls),
        ..TransportConfig::default()
    };
    let http = transport.build_client()?;

    let env = genrm_api::discover_environment(&http, metadata_host, environment)
        .await
        .map_err(|e| CoreError::Config {
            message: e.to_string(),
        })?;
    tracing::debug!(name = %env.name, endpoint = %env.resource_manager, "discovered environment");
    Url::parse(&env.resource_manager).map_err(|e| CoreError::Config {
        message: format!("environment {:?} has an invalid resource manager URL: {e}", env.name),
    })
}
