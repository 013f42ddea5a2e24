//! Command dispatch: bridges CLI args -> reconciler -> state file -> output.

pub mod apply;
pub mod config_cmd;
pub mod delete;
pub mod import;
pub mod plan;
pub mod refresh;
pub mod show;
pub mod util;

use std::path::PathBuf;

use genrm_config::Config;
use genrm_core::{CancellationToken, OperationTimeouts, Reconciler};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;
use crate::{config, output};

/// Everything a remote-bound command needs.
pub struct Session {
    pub reconciler: Reconciler,
    pub timeouts: OperationTimeouts,
    pub cancel: CancellationToken,
    pub state_path: PathBuf,
}

impl Session {
    pub async fn connect(
        global: &GlobalOpts,
        cfg: &Config,
        cancel: CancellationToken,
    ) -> Result<Self, CliError> {
        let client_config = config::build_client_config(global, cfg).await?;
        tracing::debug!(endpoint = %client_config.endpoint, "connecting");
        let client = client_config.build_client()?;
        Ok(Self {
            reconciler: Reconciler::new(client),
            timeouts: client_config.timeouts,
            cancel,
            state_path: config::state_path(global, cfg),
        })
    }
}

/// Dispatch a resource command to its handler.
pub async fn dispatch(
    cmd: Command,
    global: &GlobalOpts,
    cfg: &Config,
    cancel: CancellationToken,
) -> Result<(), CliError> {
    let color = output::should_color(&global.color);
    match cmd {
        // Local-only: manifest vs. state file
        Command::Plan(args) => plan::handle(&args, global, &config::state_path(global, cfg), color),
        Command::Show(args) => show::handle(&args, global, &config::state_path(global, cfg)),
        Command::List => show::list(global, &config::state_path(global, cfg)),

        // Remote-bound
        Command::Apply(args) => {
            let session = Session::connect(global, cfg, cancel).await?;
            apply::handle(&session, &args, global, color).await
        }
        Command::Refresh(args) => {
            let session = Session::connect(global, cfg, cancel).await?;
            refresh::handle(&session, &args, global, color).await
        }
        Command::Import(args) => {
            let session = Session::connect(global, cfg, cancel).await?;
            import::handle(&session, &args, global, color).await
        }
        Command::Delete(args) => {
            if args.keep_remote {
                return delete::forget(&args, global, &config::state_path(global, cfg), color);
            }
            let session = Session::connect(global, cfg, cancel).await?;
            delete::handle(&session, &args, global, color).await
        }

        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Err(CliError::Validation {
            field: "command".into(),
            reason: "not a resource command".into(),
        }),
    }
}
