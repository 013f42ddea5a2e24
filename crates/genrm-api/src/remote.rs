// The remote collaborator boundary consumed by genrm-core.
//
// Anything that can GET, PUT/POST and DELETE a JSON document addressed by
// `(url, api-version)` implements `RemoteClient`. `ResourceClient` is the
// HTTP implementation; tests substitute in-memory fakes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};
use tokio_util::sync::CancellationToken;

use crate::error::Error;

/// HTTP method used to create or update a resource.
///
/// No `PATCH`: the sent body is always the full desired document.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum HttpMethod {
    Post,
    #[default]
    Put,
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Post => Self::POST,
            HttpMethod::Put => Self::PUT,
        }
    }
}

/// A successful response: status code plus parsed JSON body.
///
/// An empty response body is represented as `Value::Null`.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteResponse {
    pub status: u16,
    pub body: Value,
}

impl RemoteResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }
}

/// Generic resource-manager operations.
///
/// Every call receives the caller's cancellation token and must abandon the
/// request with [`Error::Cancelled`] once it fires. Non-success statuses are
/// reported as [`Error::Api`] so callers can tell "not found" apart from
/// other failures.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    async fn get(
        &self,
        cancel: &CancellationToken,
        url: &str,
        api_version: &str,
    ) -> Result<RemoteResponse, Error>;

    async fn create_update(
        &self,
        cancel: &CancellationToken,
        url: &str,
        api_version: &str,
        body: &Value,
        method: HttpMethod,
    ) -> Result<RemoteResponse, Error>;

    async fn delete(
        &self,
        cancel: &CancellationToken,
        url: &str,
        api_version: &str,
    ) -> Result<RemoteResponse, Error>;
}
