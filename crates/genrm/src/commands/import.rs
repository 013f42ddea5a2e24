//! `genrm import`: adopt an existing remote resource under a name.

use crate::cli::{GlobalOpts, ImportArgs};
use crate::error::CliError;
use crate::output;
use crate::state::StateFile;

use super::Session;
use super::show::detail;
use super::util;

pub async fn handle(
    session: &Session,
    args: &ImportArgs,
    global: &GlobalOpts,
    color: bool,
) -> Result<(), CliError> {
    let mut state = StateFile::load(&session.state_path)?;
    if let Some(existing) = state.resources.get(&args.name) {
        return Err(CliError::Validation {
            field: "name".into(),
            reason: format!("`{}` is already recorded as {}", args.name, existing.id),
        });
    }

    let spinner = util::spinner(format!("importing {}", args.name), global.quiet);
    let imported = util::with_timeout("read", session.timeouts.read, &session.cancel, |token| {
        let (id, paths) = (args.id.as_str(), args.paths.clone());
        async move { session.reconciler.import(&token, id, paths).await }
    })
    .await;
    spinner.finish_and_clear();
    let imported = imported?;

    let out = output::render_single(&global.output, &imported, |s| detail(&args.name, s), |s| {
        s.id.encode()
    })?;
    state.resources.insert(args.name.clone(), imported);
    state.save(&session.state_path)?;

    output::print_output(&out, global.quiet);
    output::success(&format!("Imported {}", args.name), color, global.quiet);
    Ok(())
}
