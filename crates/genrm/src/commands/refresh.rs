//! `genrm refresh`: re-read recorded resources and record drift.

use tracing::warn;

use crate::cli::{GlobalOpts, RefreshArgs};
use crate::error::CliError;
use crate::output;
use crate::state::StateFile;

use super::Session;
use super::util;

pub async fn handle(
    session: &Session,
    args: &RefreshArgs,
    global: &GlobalOpts,
    color: bool,
) -> Result<(), CliError> {
    let mut state = StateFile::load(&session.state_path)?;
    let names: Vec<String> = if args.names.is_empty() {
        state.resources.keys().cloned().collect()
    } else {
        for name in &args.names {
            state.get(name)?;
        }
        args.names.clone()
    };

    let (mut refreshed, mut removed) = (0_usize, 0_usize);
    for name in names {
        let prior = state.get(&name)?.clone();
        let spinner = util::spinner(format!("reading {name}"), global.quiet);
        let current =
            util::with_timeout("read", session.timeouts.read, &session.cancel, |token| {
                let prior = &prior;
                async move { session.reconciler.read(&token, prior).await }
            })
            .await;
        spinner.finish_and_clear();

        match current? {
            Some(current) => {
                if current.body != prior.body || current.output != prior.output {
                    output::success(&format!("{name}: drift recorded"), color, global.quiet);
                }
                state.resources.insert(name, current);
                refreshed += 1;
            }
            None => {
                warn!(name = %name, id = %prior.id, "resource is gone remotely; dropped from state");
                state.resources.remove(&name);
                removed += 1;
            }
        }
        state.save(&session.state_path)?;
    }

    output::success(
        &format!("Refreshed {refreshed}, removed {removed}."),
        color,
        global.quiet,
    );
    Ok(())
}
