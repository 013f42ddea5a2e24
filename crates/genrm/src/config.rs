//! CLI flag overrides on top of `genrm-config` profiles.
//!
//! This is the single boundary where `GlobalOpts` meet the profile and
//! become a `genrm_core::ClientConfig`.

use std::path::PathBuf;

use secrecy::SecretString;

use genrm_config::{Config, Profile};
use genrm_core::{AuthCredentials, ClientConfig};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Where resource state lives: flag > config default.
pub fn state_path(global: &GlobalOpts, config: &Config) -> PathBuf {
    global
        .state_file
        .clone()
        .unwrap_or_else(|| config.defaults.state_file.clone())
}

/// A comma-separated list of profile names, or `(none)`.
pub fn available_profiles(config: &Config) -> String {
    if config.profiles.is_empty() {
        "(none)".into()
    } else {
        config.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}

/// Layer the connection flags over a profile.
fn apply_overrides(profile: &mut Profile, global: &GlobalOpts) {
    if let Some(ref endpoint) = global.endpoint {
        profile.endpoint = Some(endpoint.clone());
    }
    if global.insecure {
        profile.insecure = Some(true);
    }
    if let Some(timeout) = global.timeout {
        profile.timeout = Some(timeout);
    }
    // The token flag short-circuits the credential chain.
    if global.token.is_some() {
        profile.anonymous = true;
    }
}

/// Build the client configuration for commands that talk to the remote.
///
/// A named profile is required unless `--endpoint` is given, in which case
/// the flags alone describe the connection.
pub async fn build_client_config(
    global: &GlobalOpts,
    config: &Config,
) -> Result<ClientConfig, CliError> {
    let profile_name = active_profile_name(global, config);

    let mut profile = match config.profiles.get(&profile_name) {
        Some(profile) => profile.clone(),
        None if global.endpoint.is_some() => Profile::default(),
        None if global.profile.is_some() => {
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: available_profiles(config),
            });
        }
        None => {
            return Err(CliError::NoConfig {
                path: genrm_config::config_path().display().to_string(),
            });
        }
    };
    apply_overrides(&mut profile, global);

    let mut client =
        genrm_config::profile_to_client_config(&profile, &profile_name, &config.defaults).await?;
    if let Some(ref token) = global.token {
        client.auth = AuthCredentials::BearerToken(SecretString::from(token.clone()));
    }
    Ok(client)
}
