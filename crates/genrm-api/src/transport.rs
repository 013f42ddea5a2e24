// Shared transport configuration for building reqwest::Client instances.
//
// Every knob that alters HTTP behaviour (TLS, timeouts, throttling retry,
// long-running operation polling) lives here as an explicit option. Nothing
// in this crate mutates process-wide state.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::header::HeaderMap;

use crate::error::Error;

const USER_AGENT: &str = concat!("genrm/", env!("CARGO_PKG_VERSION"));

/// TLS verification mode (api-level mirror of core's TlsVerification).
#[derive(Debug, Clone, Default)]
pub enum TlsMode {
    /// Use the system certificate store.
    #[default]
    System,
    /// Use a custom CA certificate from the given PEM file.
    CustomCa(PathBuf),
    /// Accept any certificate (local emulators, self-signed gateways).
    DangerAcceptInvalid,
}

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tls: TlsMode,
    /// Per-request HTTP timeout.
    pub timeout: Duration,
    /// Retries allowed for throttled (429) and unavailable (503) responses.
    pub max_retries: u32,
    /// Delay between retries when the server sends no `Retry-After`.
    pub retry_delay: Duration,
    /// When `false`, 429 responses are retried without consuming the
    /// `max_retries` budget; only the caller's cancellation bounds them.
    pub count_throttling_as_retry: bool,
    /// Delay between long-running operation polls when the server sends no
    /// `Retry-After`.
    pub poll_interval: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tls: TlsMode::System,
            timeout: Duration::from_secs(60),
            max_retries: 3,
            retry_delay: Duration::from_secs(5),
            count_throttling_as_retry: false,
            poll_interval: Duration::from_secs(10),
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        self.build_client_with_headers(HeaderMap::new())
    }

    /// Build a `reqwest::Client` with additional default headers.
    ///
    /// Used by the resource client to inject the `Authorization` header.
    pub fn build_client_with_headers(&self, headers: HeaderMap) -> Result<reqwest::Client, Error> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .default_headers(headers);

        match &self.tls {
            TlsMode::System => {}
            TlsMode::CustomCa(path) => {
                let cert_pem = std::fs::read(path)
                    .map_err(|e| Error::Tls(format!("failed to read CA cert: {e}")))?;
                let cert = reqwest::Certificate::from_pem(&cert_pem)
                    .map_err(|e| Error::Tls(format!("invalid CA cert: {e}")))?;
                builder = builder.add_root_certificate(cert);
            }
            TlsMode::DangerAcceptInvalid => {
                builder = builder.danger_accept_invalid_certs(true);
            }
        }

        builder
            .build()
            .map_err(|e| Error::Tls(format!("failed to build HTTP client: {e}")))
    }

    /// Shorten every delay; handy for tests against a mock server.
    pub fn with_fast_polling(mut self) -> Self {
        self.retry_delay = Duration::from_millis(10);
        self.poll_interval = Duration::from_millis(10);
        self
    }
}
