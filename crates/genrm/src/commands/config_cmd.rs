//! Config subcommand handlers.

use dialoguer::{Input, Password, Select};

use genrm_config::{self as config_file, KEYRING_SERVICE, Profile, keyring_entry};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{active_profile_name, available_profiles};
use crate::error::CliError;
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn keyring_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "keyring".into(),
        reason: format!("failed to access keyring: {e}"),
    }
}

fn store_token_in_keyring(profile_name: &str, token: &str) -> Result<(), CliError> {
    let entry =
        keyring::Entry::new(KEYRING_SERVICE, &keyring_entry(profile_name)).map_err(keyring_err)?;
    entry.set_password(token).map_err(keyring_err)
}

fn parse_bool(field: &str, value: &str) -> Result<bool, CliError> {
    value.parse().map_err(|_| CliError::Validation {
        field: field.into(),
        reason: "must be 'true' or 'false'".into(),
    })
}

fn parse_number<T: std::str::FromStr>(field: &str, value: &str) -> Result<T, CliError> {
    value.parse().map_err(|_| CliError::Validation {
        field: field.into(),
        reason: "must be a non-negative number".into(),
    })
}

fn parse_duration(field: &str, value: String) -> Result<String, CliError> {
    humantime::parse_duration(&value).map_err(|e| CliError::Validation {
        field: field.into(),
        reason: format!("{value:?} is not a duration: {e}"),
    })?;
    Ok(value)
}

/// Apply one `config set` key to a profile.
fn set_key(profile: &mut Profile, key: &str, value: String) -> Result<(), CliError> {
    match key {
        "endpoint" => {
            url::Url::parse(&value).map_err(|e| CliError::Validation {
                field: "endpoint".into(),
                reason: format!("invalid URL: {e}"),
            })?;
            profile.endpoint = Some(value);
        }
        "metadata_host" | "metadata-host" => profile.metadata_host = Some(value),
        "environment" => profile.environment = Some(value),
        "token" => profile.token = Some(value),
        "token_env" | "token-env" => profile.token_env = Some(value),
        "anonymous" => profile.anonymous = parse_bool("anonymous", &value)?,
        "ca_cert" | "ca-cert" => profile.ca_cert = Some(value.into()),
        "insecure" => profile.insecure = Some(parse_bool("insecure", &value)?),
        "timeout" => profile.timeout = Some(parse_number("timeout", &value)?),
        "max_retries" | "max-retries" => {
            profile.max_retries = Some(parse_number("max_retries", &value)?);
        }
        "count_throttling_as_retry" | "count-throttling-as-retry" => {
            profile.count_throttling_as_retry =
                Some(parse_bool("count_throttling_as_retry", &value)?);
        }
        "timeouts.create" => profile.timeouts.create = Some(parse_duration(key, value)?),
        "timeouts.read" => profile.timeouts.read = Some(parse_duration(key, value)?),
        "timeouts.update" => profile.timeouts.update = Some(parse_duration(key, value)?),
        "timeouts.delete" => profile.timeouts.delete = Some(parse_duration(key, value)?),
        other => {
            return Err(CliError::Validation {
                field: other.into(),
                reason: format!(
                    "unknown config key '{other}'. Valid keys: endpoint, metadata_host, \
                     environment, token, token_env, anonymous, ca_cert, insecure, timeout, \
                     max_retries, count_throttling_as_retry, timeouts.{{create,read,update,delete}}"
                ),
            });
        }
    }
    Ok(())
}

// ── Init wizard ─────────────────────────────────────────────────────

fn init() -> Result<(), CliError> {
    let config_path = config_file::config_path();
    eprintln!("genrm -- configuration wizard");
    eprintln!("   Config path: {}\n", config_path.display());

    // 1. Profile name
    let profile_name: String = Input::new()
        .with_prompt("Profile name")
        .default("default".into())
        .interact_text()
        .map_err(prompt_err)?;

    // 2. How to find the endpoint
    let endpoint_choices = &[
        "Endpoint URL",
        "Discover from a cloud metadata host",
        "Local emulator (no authentication)",
    ];
    let endpoint_selection = Select::new()
        .with_prompt("How should genrm reach the resource manager?")
        .items(endpoint_choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    let mut profile = Profile::default();
    match endpoint_selection {
        1 => {
            let host: String = Input::new()
                .with_prompt("Metadata host")
                .default("management.azure.com".into())
                .interact_text()
                .map_err(prompt_err)?;
            let environment: String = Input::new()
                .with_prompt("Environment (empty = the only one published)")
                .allow_empty(true)
                .interact_text()
                .map_err(prompt_err)?;
            profile.metadata_host = Some(host);
            profile.environment = (!environment.is_empty()).then_some(environment);
        }
        _ => {
            let endpoint: String = Input::new()
                .with_prompt("Endpoint URL")
                .default("https://management.azure.com/".into())
                .interact_text()
                .map_err(prompt_err)?;
            set_key(&mut profile, "endpoint", endpoint)?;
        }
    }

    // 3. Credentials
    if endpoint_selection == 2 {
        profile.anonymous = true;
    } else {
        let store_choices = &[
            "Store a token in the system keyring (recommended)",
            "Read the token from an environment variable",
            "Save a token to the config file (plaintext)",
        ];
        let store_selection = Select::new()
            .with_prompt("Where does the bearer token come from?")
            .items(store_choices)
            .default(0)
            .interact()
            .map_err(prompt_err)?;

        if store_selection == 1 {
            let var: String = Input::new()
                .with_prompt("Environment variable")
                .default("GENRM_BEARER_TOKEN".into())
                .interact_text()
                .map_err(prompt_err)?;
            profile.token_env = Some(var);
        } else {
            let token = Password::new()
                .with_prompt("Bearer token")
                .interact()
                .map_err(prompt_err)?;
            if token.is_empty() {
                return Err(CliError::Validation {
                    field: "token".into(),
                    reason: "token cannot be empty".into(),
                });
            }
            if store_selection == 0 {
                store_token_in_keyring(&profile_name, &token)?;
                eprintln!("   ✓ Token stored in system keyring");
            } else {
                profile.token = Some(token);
            }
        }
    }

    // 4. Merge into any existing config and write
    let mut cfg = config_file::load_config()?;
    cfg.profiles.insert(profile_name.clone(), profile);
    cfg.default_profile = Some(profile_name.clone());
    config_file::save_config(&cfg)?;

    eprintln!("\n✓ Configuration written to {}", config_path.display());
    eprintln!("  Active profile: {profile_name}");
    eprintln!("\n  Try it: genrm import <NAME> '<url>?api-version=<version>'");
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init => init(),

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let mut cfg = config_file::load_config()?;
            for profile in cfg.profiles.values_mut() {
                if profile.token.is_some() {
                    profile.token = Some("********".into());
                }
            }
            let out = output::render_single(
                &global.output,
                &cfg,
                |c| toml::to_string_pretty(c).unwrap_or_else(|_| format!("{c:#?}")),
                |_| config_file::config_path().display().to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Set <key> <value> ───────────────────────────────────────
        ConfigCommand::Set { key, value } => {
            let mut cfg = config_file::load_config()?;
            let profile_name = active_profile_name(global, &cfg);
            let profile = cfg.profiles.entry(profile_name.clone()).or_default();
            set_key(profile, &key, value)?;

            config_file::save_config(&cfg)?;
            eprintln!("✓ Set {key} on profile '{profile_name}'");
            Ok(())
        }

        // ── Profiles ────────────────────────────────────────────────
        ConfigCommand::Profiles => {
            let cfg = config_file::load_config()?;
            let default = cfg.default_profile.as_deref().unwrap_or("default");
            if cfg.profiles.is_empty() {
                eprintln!("No profiles configured. Run: genrm config init");
            } else {
                for name in cfg.profiles.keys() {
                    let marker = if name == default { " *" } else { "" };
                    println!("{name}{marker}");
                }
            }
            Ok(())
        }

        // ── Use <name> ─────────────────────────────────────────────
        ConfigCommand::Use { name } => {
            let mut cfg = config_file::load_config()?;
            if !cfg.profiles.contains_key(&name) {
                return Err(CliError::ProfileNotFound {
                    name,
                    available: available_profiles(&cfg),
                });
            }
            cfg.default_profile = Some(name.clone());
            config_file::save_config(&cfg)?;
            eprintln!("✓ Default profile set to '{name}'");
            Ok(())
        }

        // ── SetToken ────────────────────────────────────────────────
        ConfigCommand::SetToken { profile } => {
            let cfg = config_file::load_config()?;
            let profile_name = profile.unwrap_or_else(|| active_profile_name(global, &cfg));
            if !cfg.profiles.contains_key(&profile_name) {
                return Err(CliError::ProfileNotFound {
                    name: profile_name,
                    available: available_profiles(&cfg),
                });
            }

            let token = Password::new()
                .with_prompt("Bearer token")
                .interact()
                .map_err(prompt_err)?;
            if token.is_empty() {
                return Err(CliError::Validation {
                    field: "token".into(),
                    reason: "value cannot be empty".into(),
                });
            }
            store_token_in_keyring(&profile_name, &token)?;
            eprintln!("✓ Token stored in system keyring for profile '{profile_name}'");
            Ok(())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn set_key_parses_typed_values() {
        let mut profile = Profile::default();
        set_key(&mut profile, "endpoint", "https://example.com/".into()).unwrap();
        set_key(&mut profile, "insecure", "true".into()).unwrap();
        set_key(&mut profile, "max-retries", "5".into()).unwrap();
        set_key(&mut profile, "timeouts.create", "45m".into()).unwrap();

        assert_eq!(profile.endpoint.as_deref(), Some("https://example.com/"));
        assert_eq!(profile.insecure, Some(true));
        assert_eq!(profile.max_retries, Some(5));
        assert_eq!(profile.timeouts.create.as_deref(), Some("45m"));
    }

    #[test]
    fn set_key_rejects_bad_values() {
        let mut profile = Profile::default();
        assert!(set_key(&mut profile, "endpoint", "not a url".into()).is_err());
        assert!(set_key(&mut profile, "timeouts.read", "soonish".into()).is_err());
        assert!(set_key(&mut profile, "insecure", "yes".into()).is_err());
        assert!(matches!(
            set_key(&mut profile, "colour", "blue".into()),
            Err(CliError::Validation { field, .. }) if field == "colour"
        ));
    }
}
