//! Shared helpers for command handlers.

use std::future::Future;
use std::io::IsTerminal;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::warn;

use genrm_core::{CancellationToken, CoreError};

use crate::error::CliError;

/// Run one lifecycle step under `limit`.
///
/// The step gets a child of `cancel`, so Ctrl-C still reaches it, and an
/// expired limit cancels only this step.
pub async fn with_timeout<T, F, Fut>(
    operation: &str,
    limit: Duration,
    cancel: &CancellationToken,
    step: F,
) -> Result<T, CliError>
where
    F: FnOnce(CancellationToken) -> Fut,
    Fut: Future<Output = Result<T, CoreError>>,
{
    let token = cancel.child_token();
    match tokio::time::timeout(limit, step(token.clone())).await {
        Ok(result) => result.map_err(CliError::from),
        Err(_) => {
            token.cancel();
            warn!(operation, limit = ?limit, "operation timed out");
            Err(CliError::Timeout {
                operation: operation.into(),
                limit,
            })
        }
    }
}

/// A spinner on stderr; hidden when quiet or not attached to a terminal.
pub fn spinner(message: String, quiet: bool) -> ProgressBar {
    if quiet || !std::io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg} {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
///
/// Without a terminal there is nobody to ask, so the operation is refused.
pub fn confirm(action: &str, message: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))
}
