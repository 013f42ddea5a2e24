//! `genrm delete`: delete a recorded resource, or just forget it.

use std::path::Path;

use genrm_core::DeleteOutcome;

use crate::cli::{DeleteArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;
use crate::state::StateFile;

use super::Session;
use super::util;

pub async fn handle(
    session: &Session,
    args: &DeleteArgs,
    global: &GlobalOpts,
    color: bool,
) -> Result<(), CliError> {
    let mut state = StateFile::load(&session.state_path)?;
    let recorded = state.get(&args.name)?.clone();

    let prompt = format!("Delete {} ({})? This is destructive.", args.name, recorded.id);
    if !util::confirm("delete", &prompt, global.yes)? {
        return Ok(());
    }

    let spinner = util::spinner(format!("deleting {}", args.name), global.quiet);
    let outcome = util::with_timeout("delete", session.timeouts.delete, &session.cancel, |token| {
        let recorded = &recorded;
        async move { session.reconciler.destroy(&token, recorded).await }
    })
    .await;
    spinner.finish_and_clear();

    let message = match outcome? {
        DeleteOutcome::Deleted => format!("Deleted {}", args.name),
        DeleteOutcome::AlreadyAbsent => format!("{} was already gone", args.name),
    };
    state.resources.remove(&args.name);
    state.save(&session.state_path)?;
    output::success(&message, color, global.quiet);
    Ok(())
}

/// `--keep-remote`: drop the record and leave the remote untouched.
pub fn forget(
    args: &DeleteArgs,
    global: &GlobalOpts,
    state_path: &Path,
    color: bool,
) -> Result<(), CliError> {
    let mut state = StateFile::load(state_path)?;
    state.get(&args.name)?;
    state.resources.remove(&args.name);
    state.save(state_path)?;
    output::success(&format!("Forgot {}", args.name), color, global.quiet);
    Ok(())
}
