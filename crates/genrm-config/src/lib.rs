//! Configuration for the genrm CLI.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext),
//! and translation to `genrm_core::ClientConfig`. The CLI layers its
//! `GlobalOpts` overrides on top.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use genrm_core::{AuthCredentials, ClientConfig, OperationTimeouts, TlsVerification};

pub const KEYRING_SERVICE: &str = "genrm";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found in config")]
    UnknownProfile { name: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("endpoint discovery failed: {0}")]
    Discovery(#[source] genrm_core::CoreError),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named endpoint profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Look up `name`, or the default profile when `name` is `None`.
    pub fn profile(&self, name: Option<&str>) -> Result<(String, &Profile), ConfigError> {
        let name = name
            .map(str::to_owned)
            .or_else(|| self.default_profile.clone())
            .unwrap_or_else(|| "default".into());
        self.profiles
            .get(&name)
            .map(|p| (name.clone(), p))
            .ok_or(ConfigError::UnknownProfile { name })
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    /// Per-request HTTP timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Where resource state is recorded. Relative to the working
    /// directory unless absolute.
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            timeout: default_timeout(),
            state_file: default_state_file(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_timeout() -> u64 {
    60
}
fn default_state_file() -> PathBuf {
    PathBuf::from("genrm.state.json")
}

/// A named resource manager profile.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct Profile {
    /// Resource manager endpoint (e.g., "https://management.azure.com/").
    pub endpoint: Option<String>,

    /// Metadata host to discover the endpoint from when `endpoint` is unset.
    pub metadata_host: Option<String>,

    /// Environment to pick from the metadata host ("public", "usgovernment").
    pub environment: Option<String>,

    /// Bearer token in plaintext. Prefer keyring or env var.
    pub token: Option<String>,

    /// Environment variable name containing the bearer token.
    pub token_env: Option<String>,

    /// Send no Authorization header at all (local emulators).
    #[serde(default)]
    pub anonymous: bool,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Skip TLS verification.
    pub insecure: Option<bool>,

    /// Override the per-request timeout (seconds).
    pub timeout: Option<u64>,

    /// Whole-operation timeouts ("30m", "5m").
    #[serde(default)]
    pub timeouts: Timeouts,

    /// Retries for 503 responses (and 429 when counted).
    pub max_retries: Option<u32>,

    /// Count 429 responses against `max_retries`.
    pub count_throttling_as_retry: Option<bool>,
}

/// Operation timeouts in `humantime` form. Unset entries use the
/// built-in defaults.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct Timeouts {
    pub create: Option<String>,
    pub read: Option<String>,
    pub update: Option<String>,
    pub delete: Option<String>,
}

impl Timeouts {
    pub fn resolve(&self) -> Result<OperationTimeouts, ConfigError> {
        let defaults = OperationTimeouts::default();
        let parse = |field: &str, value: Option<&String>, fallback: Duration| {
            value.map_or(Ok(fallback), |raw| {
                humantime::parse_duration(raw).map_err(|e| ConfigError::Validation {
                    field: format!("timeouts.{field}"),
                    reason: format!("{raw:?}: {e}"),
                })
            })
        };
        Ok(OperationTimeouts {
            create: parse("create", self.create.as_ref(), defaults.create)?,
            read: parse("read", self.read.as_ref(), defaults.read)?,
            update: parse("update", self.update.as_ref(), defaults.update)?,
            delete: parse("delete", self.delete.as_ref(), defaults.delete)?,
        })
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("dev", "genrm", "genrm").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("genrm");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` (missing file is fine) layered under `GENRM_*`
/// environment variables. Nested keys use `__`:
/// `GENRM_DEFAULTS__OUTPUT=json`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("GENRM_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve a bearer token from the credential chain.
pub fn resolve_token(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    // 1. Profile's token_env → env var lookup
    if let Some(ref env_name) = profile.token_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
        debug!(env = %env_name, "token variable not set");
    }

    // 2. System keyring
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &keyring_entry(profile_name)) {
        if let Ok(secret) = entry.get_password() {
            return Ok(SecretString::from(secret));
        }
    }

    // 3. Plaintext in config
    if let Some(ref token) = profile.token {
        return Ok(SecretString::from(token.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Keyring entry name for a profile's token.
pub fn keyring_entry(profile_name: &str) -> String {
    format!("{profile_name}/token")
}

pub fn resolve_auth(profile: &Profile, profile_name: &str) -> Result<AuthCredentials, ConfigError> {
    if profile.anonymous {
        return Ok(AuthCredentials::Anonymous);
    }
    resolve_token(profile, profile_name).map(AuthCredentials::BearerToken)
}

pub fn resolve_tls(profile: &Profile) -> TlsVerification {
    if profile.insecure.unwrap_or(false) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    }
}

/// The configured endpoint, or the one published by the metadata host.
pub async fn resolve_endpoint(profile: &Profile) -> Result<url::Url, ConfigError> {
    if let Some(ref endpoint) = profile.endpoint {
        return endpoint.parse().map_err(|_| ConfigError::Validation {
            field: "endpoint".into(),
            reason: format!("invalid URL: {endpoint}"),
        });
    }
    if let Some(ref host) = profile.metadata_host {
        let environment = profile.environment.as_deref().unwrap_or_default();
        return genrm_core::discover_endpoint(host, environment, &resolve_tls(profile))
            .await
            .map_err(ConfigError::Discovery);
    }
    Err(ConfigError::Validation {
        field: "endpoint".into(),
        reason: "set either `endpoint` or `metadata_host`".into(),
    })
}

/// Build a `ClientConfig` from a profile, without CLI flag overrides.
pub async fn profile_to_client_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<ClientConfig, ConfigError> {
    let endpoint = resolve_endpoint(profile).await?;
    let mut config = ClientConfig::new(endpoint);
    config.auth = resolve_auth(profile, profile_name)?;
    config.tls = resolve_tls(profile);
    config.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    config.timeouts = profile.timeouts.resolve()?;
    if let Some(max_retries) = profile.max_retries {
        config.max_retries = max_retries;
    }
    if let Some(counted) = profile.count_throttling_as_retry {
        config.count_throttling_as_retry = counted;
    }
    Ok(config)
}
