// Async HTTP client for generic resource-manager endpoints.
//
// Resources are addressed by a REST path (resolved against the configured
// endpoint) plus an `api-version` query parameter. Throttling retry lives in
// `send`; long-running operation polling lives in `polling.rs`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::RETRY_AFTER;
use serde::Deserialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use crate::auth::Credentials;
use crate::error::Error;
use crate::polling::PollTarget;
use crate::remote::{HttpMethod, RemoteClient, RemoteResponse};
use crate::transport::TransportConfig;

// ── Error response shape from the resource manager ───────────────────

#[derive(Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    error: Option<ErrorDetail>,
}

#[derive(Deserialize)]
pub(crate) struct ErrorDetail {
    #[serde(default)]
    pub(crate) code: Option<String>,
    #[serde(default)]
    pub(crate) message: Option<String>,
}

// ── Client ───────────────────────────────────────────────────────────

/// HTTP implementation of [`RemoteClient`].
///
/// Holds no per-resource state: every call is a fresh round-trip (plus
/// polling for asynchronous operations).
pub struct ResourceClient {
    pub(crate) http: reqwest::Client,
    base_url: Url,
    pub(crate) transport: TransportConfig,
}

impl ResourceClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build from an endpoint, credentials and transport config.
    ///
    /// Credentials are injected as default headers on every request,
    /// including long-running operation polls.
    pub fn new(
        endpoint: &str,
        credentials: &Credentials,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client_with_headers(credentials.headers()?)?;
        Self::from_reqwest(endpoint, http, transport)
    }

    /// Wrap an existing `reqwest::Client` (caller manages auth headers).
    pub fn from_reqwest(
        endpoint: &str,
        http: reqwest::Client,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let mut base_url = Url::parse(endpoint)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            http,
            base_url,
            transport: transport.clone(),
        })
    }

    /// The resource manager endpoint every relative path is resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builder ──────────────────────────────────────────────────

    /// Resolve a resource path and attach `api-version`.
    ///
    /// Absolute `http(s)://` URLs are used as-is; anything else is joined
    /// onto the endpoint, below any path prefix it carries.
    pub fn resource_url(&self, url: &str, api_version: &str) -> Result<Url, Error> {
        let mut full = if url.starts_with("https://") || url.starts_with("http://") {
            Url::parse(url)?
        } else {
            self.base_url
                .join(&format!("./{}", url.trim_start_matches('/')))?
        };
        full.query_pairs_mut()
            .append_pair("api-version", api_version);
        Ok(full)
    }

    // ── Request loop ─────────────────────────────────────────────────

    /// Send one logical request, retrying throttled (429) and unavailable
    /// (503) responses per the transport config.
    pub(crate) async fn send(
        &self,
        cancel: &CancellationToken,
        method: reqwest::Method,
        url: Url,
        body: Option<&Value>,
    ) -> Result<reqwest::Response, Error> {
        let mut counted: u32 = 0;
        loop {
            debug!("{method} {url}");
            let mut request = self.http.request(method.clone(), url.clone());
            if let Some(body) = body {
                request = request.json(body);
            }

            let resp = tokio::select! {
                () = cancel.cancelled() => return Err(Error::Cancelled),
                resp = request.send() => resp?,
            };

            let status = resp.status();
            let throttled = status == StatusCode::TOO_MANY_REQUESTS;
            if !throttled && status != StatusCode::SERVICE_UNAVAILABLE {
                return Ok(resp);
            }
            if !throttled || self.transport.count_throttling_as_retry {
                counted += 1;
                if counted > self.transport.max_retries {
                    return Ok(resp);
                }
            }

            let delay = retry_after(&resp).unwrap_or(self.transport.retry_delay);
            warn!(%status, ?delay, "request throttled, retrying");
            sleep_or_cancel(cancel, delay).await?;
        }
    }

    /// Turn a response into a [`RemoteResponse`], following asynchronous
    /// operations to completion.
    async fn finish(
        &self,
        cancel: &CancellationToken,
        method: &reqwest::Method,
        resource_url: &Url,
        resp: reqwest::Response,
    ) -> Result<RemoteResponse, Error> {
        let status = resp.status();
        if !status.is_success() {
            return Err(parse_error(status, resp).await);
        }

        if matches!(status, StatusCode::CREATED | StatusCode::ACCEPTED) {
            if let Some(target) = PollTarget::from_headers(resp.headers())? {
                debug!(%status, "long-running operation accepted");
                let first_delay = retry_after(&resp);
                return self
                    .poll_until_done(cancel, method, resource_url, target, first_delay)
                    .await;
            }
        }

        read_body(status, resp).await
    }

    async fn execute(
        &self,
        cancel: &CancellationToken,
        method: reqwest::Method,
        url: &str,
        api_version: &str,
        body: Option<&Value>,
    ) -> Result<RemoteResponse, Error> {
        let resource_url = self.resource_url(url, api_version)?;
        let resp = self
            .send(cancel, method.clone(), resource_url.clone(), body)
            .await?;
        self.finish(cancel, &method, &resource_url, resp).await
    }
}

#[async_trait]
impl RemoteClient for ResourceClient {
    async fn get(
        &self,
        cancel: &CancellationToken,
        url: &str,
        api_version: &str,
    ) -> Result<RemoteResponse, Error> {
        self.execute(cancel, reqwest::Method::GET, url, api_version, None)
            .await
    }

    async fn create_update(
        &self,
        cancel: &CancellationToken,
        url: &str,
        api_version: &str,
        body: &Value,
        method: HttpMethod,
    ) -> Result<RemoteResponse, Error> {
        self.execute(cancel, method.into(), url, api_version, Some(body))
            .await
    }

    async fn delete(
        &self,
        cancel: &CancellationToken,
        url: &str,
        api_version: &str,
    ) -> Result<RemoteResponse, Error> {
        self.execute(cancel, reqwest::Method::DELETE, url, api_version, None)
            .await
    }
}

// ── Response helpers ─────────────────────────────────────────────────

/// Parse a success body; an empty body becomes `Value::Null`.
pub(crate) async fn read_body(
    status: StatusCode,
    resp: reqwest::Response,
) -> Result<RemoteResponse, Error> {
    let body = resp.text().await?;
    if body.trim().is_empty() {
        return Ok(RemoteResponse::new(status.as_u16(), Value::Null));
    }
    let value = serde_json::from_str(&body).map_err(|e| {
        let preview = body.chars().take(200).collect::<String>();
        Error::Deserialization {
            message: format!("{e} (body preview: {preview:?})"),
            body: body.clone(),
        }
    })?;
    Ok(RemoteResponse::new(status.as_u16(), value))
}

pub(crate) async fn parse_error(status: StatusCode, resp: reqwest::Response) -> Error {
    let raw = resp.text().await.unwrap_or_default();

    match serde_json::from_str::<ErrorEnvelope>(&raw) {
        Ok(ErrorEnvelope {
            error: Some(detail),
        }) => Error::Api {
            status: status.as_u16(),
            message: detail.message.unwrap_or_else(|| status.to_string()),
            code: detail.code,
        },
        _ => Error::Api {
            status: status.as_u16(),
            message: if raw.is_empty() {
                status.to_string()
            } else {
                raw
            },
            code: None,
        },
    }
}

/// `Retry-After` in delta-seconds form.
pub(crate) fn retry_after(resp: &reqwest::Response) -> Option<Duration> {
    resp.headers()
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

pub(crate) async fn sleep_or_cancel(
    cancel: &CancellationToken,
    delay: Duration,
) -> Result<(), Error> {
    tokio::select! {
        () = cancel.cancelled() => Err(Error::Cancelled),
        () = tokio::time::sleep(delay) => Ok(()),
    }
}
