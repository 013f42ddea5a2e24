// Long-running operation polling.
//
// A 201/202 carrying `Azure-AsyncOperation` (preferred) or `Location` means
// the resource manager accepted the request and completes it later. The
// client polls until a terminal status, honouring `Retry-After`.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::{HeaderMap, LOCATION};
use serde::Deserialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use crate::client::{
    ErrorDetail, ResourceClient, parse_error, read_body, retry_after, sleep_or_cancel,
};
use crate::error::Error;
use crate::remote::RemoteResponse;

const ASYNC_OPERATION_HEADER: &str = "azure-asyncoperation";

/// Where to poll for completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PollTarget {
    /// Operation status resource: `{ "status": "InProgress" | "Succeeded" | … }`.
    AsyncOperation(Url),
    /// Result location: 202 while running, final result once done.
    Location(Url),
}

impl PollTarget {
    pub(crate) fn from_headers(headers: &HeaderMap) -> Result<Option<Self>, Error> {
        if let Some(raw) = header_str(headers, ASYNC_OPERATION_HEADER) {
            return Ok(Some(Self::AsyncOperation(Url::parse(raw)?)));
        }
        if let Some(raw) = header_str(headers, LOCATION.as_str()) {
            return Ok(Some(Self::Location(Url::parse(raw)?)));
        }
        Ok(None)
    }

    fn url(&self) -> &Url {
        match self {
            Self::AsyncOperation(url) | Self::Location(url) => url,
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

#[derive(Deserialize)]
struct OperationStatus {
    status: String,
    #[serde(default)]
    error: Option<ErrorDetail>,
}

impl ResourceClient {
    pub(crate) async fn poll_until_done(
        &self,
        cancel: &CancellationToken,
        method: &reqwest::Method,
        resource_url: &Url,
        target: PollTarget,
        first_delay: Option<Duration>,
    ) -> Result<RemoteResponse, Error> {
        let mut delay = first_delay.unwrap_or(self.transport.poll_interval);
        loop {
            sleep_or_cancel(cancel, delay).await?;

            let url = target.url().clone();
            debug!("GET {url} (operation poll)");
            let resp = tokio::select! {
                () = cancel.cancelled() => return Err(Error::Cancelled),
                resp = self.http.get(url).send() => resp?,
            };

            let status = resp.status();
            if !status.is_success() {
                return Err(parse_error(status, resp).await);
            }
            delay = retry_after(&resp).unwrap_or(self.transport.poll_interval);

            match &target {
                PollTarget::Location(_) => {
                    if status != StatusCode::ACCEPTED {
                        return read_body(status, resp).await;
                    }
                }
                PollTarget::AsyncOperation(_) => {
                    let text = resp.text().await?;
                    let op: OperationStatus =
                        serde_json::from_str(&text).map_err(|e| Error::Deserialization {
                            message: format!("operation status: {e}"),
                            body: text.clone(),
                        })?;
                    debug!(status = %op.status, "operation status");

                    if op.status.eq_ignore_ascii_case("Succeeded") {
                        return self.final_state(cancel, method, resource_url).await;
                    }
                    if op.status.eq_ignore_ascii_case("Failed")
                        || op.status.eq_ignore_ascii_case("Canceled")
                    {
                        return Err(Error::OperationFailed {
                            message: op
                                .error
                                .and_then(|e| e.message)
                                .unwrap_or_else(|| "no error details".into()),
                            status: op.status,
                        });
                    }
                }
            }
        }
    }

    /// Fetch the resource once an async PUT has succeeded. DELETE and POST
    /// have no resource body to return.
    async fn final_state(
        &self,
        cancel: &CancellationToken,
        method: &reqwest::Method,
        resource_url: &Url,
    ) -> Result<RemoteResponse, Error> {
        if *method != reqwest::Method::PUT {
            return Ok(RemoteResponse::new(StatusCode::OK.as_u16(), Value::Null));
        }
        let resp = self
            .send(cancel, reqwest::Method::GET, resource_url.clone(), None)
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(parse_error(status, resp).await);
        }
        read_body(status, resp).await
    }
}
