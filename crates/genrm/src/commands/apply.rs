//! `genrm apply`: drive each declared resource to its declaration.
//!
//! State is saved after every resource so a failure part-way keeps what
//! already succeeded.

use tracing::info;

use genrm_core::{DeleteOutcome, PlanAction, ResourceSpec, ResourceState};

use crate::cli::{ApplyArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;
use crate::state::StateFile;

use super::Session;
use super::plan::{load_and_compute, summary};
use super::util;

pub async fn handle(
    session: &Session,
    args: &ApplyArgs,
    global: &GlobalOpts,
    color: bool,
) -> Result<(), CliError> {
    let (mut state, plans) = load_and_compute(&args.manifest, &session.state_path)?;
    let plan_list: Vec<_> = plans.iter().map(|(_, p)| p.clone()).collect();

    if plan_list.iter().all(|p| !p.has_changes()) {
        output::success("No changes.", color, global.quiet);
        return Ok(());
    }

    let replacing: Vec<&str> = plan_list
        .iter()
        .filter(|p| p.action == PlanAction::Replace)
        .map(|p| p.name.as_str())
        .collect();
    if !replacing.is_empty() {
        let prompt = format!(
            "Replace (delete, then create) {}?",
            replacing.join(", ")
        );
        if !util::confirm("replace", &prompt, global.yes)? {
            return Ok(());
        }
    }

    for (spec, plan) in &plans {
        if !plan.has_changes() {
            continue;
        }
        let spinner = util::spinner(
            format!("{} {}", output::action_symbol(plan.action, color), spec.name),
            global.quiet,
        );
        let prior = state.resources.get(&spec.name).cloned();
        let applied = match (plan.action, prior) {
            (PlanAction::Update, Some(prior)) => update(session, spec, &prior).await,
            (PlanAction::Replace, Some(prior)) => replace(session, spec, &prior, &mut state).await,
            _ => create(session, spec).await,
        };
        spinner.finish_and_clear();

        let applied = applied?;
        state.resources.insert(spec.name.clone(), applied);
        state.save(&session.state_path)?;
        info!(name = %spec.name, action = %plan.action, "applied");
        output::success(&format!("{}: {}", spec.name, plan.action), color, global.quiet);
    }

    if !global.quiet {
        eprintln!("{}", summary(&plan_list).replacen("Plan:", "Applied:", 1));
    }
    Ok(())
}

async fn create(session: &Session, spec: &ResourceSpec) -> Result<ResourceState, CliError> {
    util::with_timeout("create", session.timeouts.create, &session.cancel, |token| async move {
        session.reconciler.create(&token, spec).await
    })
    .await
}

async fn update(
    session: &Session,
    spec: &ResourceSpec,
    prior: &ResourceState,
) -> Result<ResourceState, CliError> {
    util::with_timeout("update", session.timeouts.update, &session.cancel, |token| async move {
        session.reconciler.update(&token, spec, prior).await
    })
    .await
}

/// The identifier changed: delete what is recorded, then create anew. The
/// old record is dropped as soon as the delete lands.
async fn replace(
    session: &Session,
    spec: &ResourceSpec,
    prior: &ResourceState,
    state: &mut StateFile,
) -> Result<ResourceState, CliError> {
    let outcome =
        util::with_timeout("delete", session.timeouts.delete, &session.cancel, |token| async move {
            session.reconciler.destroy(&token, prior).await
        })
        .await?;
    if outcome == DeleteOutcome::AlreadyAbsent {
        info!(id = %prior.id, "replaced resource was already gone");
    }
    state.resources.remove(&spec.name);
    state.save(&session.state_path)?;
    create(session, spec).await
}
