//! `genrm plan`: compare a manifest against recorded state. Never touches
//! the remote.

use std::path::Path;

use tabled::Tabled;

use genrm_core::{Plan, PlanAction, ResourceSpec};

use crate::cli::{GlobalOpts, ManifestArgs, PlanArgs};
use crate::error::CliError;
use crate::manifest::Manifest;
use crate::output;
use crate::state::StateFile;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct PlanRow {
    #[tabled(rename = "")]
    symbol: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Changed")]
    changed: String,
}

impl PlanRow {
    fn new(plan: &Plan, color: bool) -> Self {
        Self {
            symbol: output::action_symbol(plan.action, color),
            name: plan.name.clone(),
            action: plan.action.to_string(),
            changed: plan
                .changed
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

/// Plans for the selected manifest entries, in manifest order.
pub fn compute(
    manifest: &Manifest,
    targets: &[String],
    state: &StateFile,
) -> Result<Vec<(ResourceSpec, Plan)>, CliError> {
    manifest
        .select(targets)?
        .into_iter()
        .map(|spec| -> Result<_, CliError> {
            let plan = genrm_core::plan(spec, state.resources.get(&spec.name))?;
            Ok((spec.clone(), plan))
        })
        .collect()
}

/// Load the manifest and state named on the command line and plan them.
pub fn load_and_compute(
    args: &ManifestArgs,
    state_path: &Path,
) -> Result<(StateFile, Vec<(ResourceSpec, Plan)>), CliError> {
    let manifest = Manifest::load(&args.file)?;
    let state = StateFile::load(state_path)?;
    let plans = compute(&manifest, &args.targets, &state)?;

    if args.targets.is_empty() {
        for name in state.resources.keys() {
            if manifest.resources.iter().all(|spec| &spec.name != name) {
                tracing::warn!(name = %name, "recorded resource is no longer declared; `genrm delete` it to remove");
            }
        }
    }
    Ok((state, plans))
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(
    args: &PlanArgs,
    global: &GlobalOpts,
    state_path: &Path,
    color: bool,
) -> Result<(), CliError> {
    let (_, plans) = load_and_compute(&args.manifest, state_path)?;
    let plans: Vec<Plan> = plans.into_iter().map(|(_, plan)| plan).collect();

    let out = output::render_list(
        &global.output,
        &plans,
        |p| PlanRow::new(p, color),
        ToString::to_string,
    )?;
    output::print_output(&out, global.quiet);

    let pending = plans.iter().filter(|p| p.has_changes()).count();
    if !global.quiet && matches!(global.output, crate::cli::OutputFormat::Table) {
        eprintln!("{}", summary(&plans));
    }
    if args.detailed_exitcode && pending > 0 {
        return Err(CliError::ChangesPending { count: pending });
    }
    Ok(())
}

/// `Plan: 1 to create, 2 to update, 0 to replace.`
pub fn summary(plans: &[Plan]) -> String {
    let count = |action: PlanAction| plans.iter().filter(|p| p.action == action).count();
    format!(
        "Plan: {} to create, {} to update, {} to replace.",
        count(PlanAction::Create),
        count(PlanAction::Update),
        count(PlanAction::Replace)
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use genrm_core::{HttpMethod, ResourceIdentifier, ResourceState};
    use serde_json::json;

    use super::*;

    fn manifest() -> Manifest {
        Manifest::parse(
            r#"
resources:
  - {name: same, url: /a, api_version: "1", body: {"x": 1}}
  - {name: moved, url: /b2, api_version: "1", body: {}}
  - {name: fresh, url: /c, api_version: "1", body: {}}
"#,
        )
        .unwrap()
    }

    fn recorded(url: &str, body: serde_json::Value) -> ResourceState {
        ResourceState {
            id: ResourceIdentifier::new(url, "1").unwrap(),
            body,
            tags: std::collections::BTreeMap::new(),
            location: None,
            identity: None,
            paths: Vec::new(),
            create_method: HttpMethod::Put,
            update_method: HttpMethod::Put,
            output: json!({}),
            refreshed_at: Utc::now(),
        }
    }

    #[test]
    fn plans_follow_manifest_order() {
        let mut state = StateFile::default();
        state.resources.insert("same".into(), recorded("/a", json!({"x": 1})));
        state.resources.insert("moved".into(), recorded("/b", json!({})));

        let plans: Vec<Plan> = compute(&manifest(), &[], &state)
            .unwrap()
            .into_iter()
            .map(|(_, p)| p)
            .collect();
        let actions: Vec<PlanAction> = plans.iter().map(|p| p.action).collect();
        assert_eq!(
            actions,
            vec![PlanAction::NoOp, PlanAction::Replace, PlanAction::Create]
        );
        assert_eq!(
            summary(&plans),
            "Plan: 1 to create, 0 to update, 1 to replace."
        );
    }

    #[test]
    fn row_lists_changed_fields() {
        let mut state = StateFile::default();
        state.resources.insert("moved".into(), recorded("/b", json!({})));
        let (_, plan) = compute(&manifest(), &["moved".into()], &state)
            .unwrap()
            .remove(0);
        let row = PlanRow::new(&plan, false);
        assert_eq!(row.symbol, "-/+");
        assert_eq!(row.changed, "url");
    }
}
