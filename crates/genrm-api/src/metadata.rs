// Cloud environment discovery from a metadata host.
//
// Sovereign and private clouds publish their endpoints at
// `https://{host}/metadata/endpoints?api-version=2020-06-01`. The response is
// a list of environments; the caller picks one by name.

use serde::Deserialize;
use tracing::debug;

use crate::error::Error;

const METADATA_API_VERSION: &str = "2020-06-01";

/// The endpoints of one cloud environment this client needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudEnvironment {
    pub name: String,
    /// Resource manager endpoint, always with a trailing slash.
    pub resource_manager: String,
    /// Token authority host.
    pub login_endpoint: String,
    /// Token audiences accepted by the resource manager.
    pub audiences: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Environment {
    #[serde(default)]
    name: String,
    #[serde(default)]
    resource_manager: String,
    #[serde(default)]
    authentication: Authentication,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Authentication {
    #[serde(default)]
    login_endpoint: String,
    #[serde(default)]
    audiences: Vec<String>,
}

/// Normalize an environment name: `AzureUSGovernment` → `usgovernment`.
///
/// Names are stored as `Azure{Environment}Cloud`; the public cloud is plain
/// `AzureCloud`, which normalizes to `public`.
pub fn normalize_environment_name(input: &str) -> String {
    let lower = input.to_lowercase();
    let trimmed = lower.strip_prefix("azure").unwrap_or(&lower);
    let trimmed = trimmed.strip_suffix("cloud").unwrap_or(trimmed);
    if trimmed.is_empty() {
        "public".into()
    } else {
        trimmed.to_owned()
    }
}

/// Split `endpoint` into `(scheme, host)`.
///
/// Bare hosts and `https://` endpoints use https; an explicit `http://`
/// is kept (local metadata emulators).
fn split_endpoint(endpoint: &str) -> (&'static str, &str) {
    let (scheme, rest) = match endpoint.strip_prefix("http://") {
        Some(rest) => ("http", rest),
        None => ("https", endpoint.strip_prefix("https://").unwrap_or(endpoint)),
    };
    (scheme, rest.trim_end_matches('/'))
}

/// Fetch the metadata document from `endpoint` and select `environment`.
///
/// An empty `environment` selects the only entry when exactly one is
/// published. An environment without a resource manager endpoint falls back
/// to the metadata host itself.
pub async fn discover_environment(
    http: &reqwest::Client,
    endpoint: &str,
    environment: &str,
) -> Result<CloudEnvironment, Error> {
    let (scheme, host) = split_endpoint(endpoint);
    let uri = format!("{scheme}://{host}/metadata/endpoints?api-version={METADATA_API_VERSION}");
    debug!("GET {uri}");

    let resp = http.get(&uri).send().await.map_err(|e| Error::Metadata {
        message: format!("retrieving environments from {host}: {e}"),
    })?;
    let status = resp.status();
    let body = resp.text().await?;
    if !status.is_success() {
        return Err(Error::Metadata {
            message: format!("metadata host {host} returned HTTP {status}"),
        });
    }

    let environments: Vec<Environment> =
        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: format!("metadata endpoints: {e}"),
            body: body.clone(),
        })?;

    let single = environments.len() == 1;
    environments
        .into_iter()
        .find(|env| {
            normalize_environment_name(&env.name).eq_ignore_ascii_case(environment)
                || (environment.is_empty() && single)
        })
        .map(|env| {
            let resource_manager = if env.resource_manager.is_empty() {
                format!("{scheme}://{host}/")
            } else if env.resource_manager.ends_with('/') {
                env.resource_manager
            } else {
                format!("{}/", env.resource_manager)
            };
            CloudEnvironment {
                name: env.name,
                resource_manager,
                login_endpoint: env.authentication.login_endpoint,
                audiences: env.authentication.audiences,
            }
        })
        .ok_or_else(|| Error::Metadata {
            message: format!(
                "unable to locate metadata for environment {environment:?} from custom metadata host {host:?}"
            ),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_cloud_normalizes_to_public() {
        assert_eq!(normalize_environment_name("AzureCloud"), "public");
    }

    #[test]
    fn named_clouds_drop_prefix_and_suffix() {
        assert_eq!(normalize_environment_name("AzureUSGovernment"), "usgovernment");
        assert_eq!(normalize_environment_name("AzureChinaCloud"), "china");
        assert_eq!(normalize_environment_name("AzureStackCloud"), "stack");
    }

    #[test]
    fn endpoint_scheme_and_slashes() {
        assert_eq!(
            split_endpoint("https://management.example.com/"),
            ("https", "management.example.com")
        );
        assert_eq!(
            split_endpoint("management.example.com"),
            ("https", "management.example.com")
        );
        assert_eq!(split_endpoint("http://127.0.0.1:8080/"), ("http", "127.0.0.1:8080"));
    }
}
