//! `genrm show` / `genrm list`: read the state file.

use std::path::Path;

use tabled::Tabled;

use genrm_core::ResourceState;

use crate::cli::{GlobalOpts, ShowArgs};
use crate::error::CliError;
use crate::output;
use crate::state::StateFile;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct ResourceRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "URL")]
    url: String,
    #[tabled(rename = "API version")]
    api_version: String,
    #[tabled(rename = "Location")]
    location: String,
    #[tabled(rename = "Refreshed")]
    refreshed: String,
}

/// One recorded resource with its name, for list output.
#[derive(serde::Serialize)]
struct Named<'a> {
    name: &'a str,
    #[serde(flatten)]
    state: &'a ResourceState,
}

impl From<&Named<'_>> for ResourceRow {
    fn from(n: &Named<'_>) -> Self {
        Self {
            name: n.name.to_owned(),
            url: n.state.id.url().to_owned(),
            api_version: n.state.id.api_version().to_owned(),
            location: n.state.location.clone().unwrap_or_else(|| "-".into()),
            refreshed: n.state.refreshed_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

/// Multi-line detail view of one resource.
pub fn detail(name: &str, s: &ResourceState) -> String {
    let json = |v: &serde_json::Value| {
        serde_json::to_string_pretty(v).unwrap_or_else(|_| v.to_string())
    };
    let mut lines = vec![
        format!("Name:       {name}"),
        format!("ID:         {}", s.id),
        format!("Location:   {}", s.location.as_deref().unwrap_or("-")),
        format!("Methods:    {} / {}", s.create_method, s.update_method),
        format!("Refreshed:  {}", s.refreshed_at.to_rfc3339()),
    ];
    if !s.tags.is_empty() {
        let tags: Vec<String> = s.tags.iter().map(|(k, v)| format!("{k}={v}")).collect();
        lines.push(format!("Tags:       {}", tags.join(", ")));
    }
    if let Some(identity) = &s.identity {
        lines.push(format!("Identity:   {}", identity.identity_type));
        if let Some(principal) = &identity.principal_id {
            lines.push(format!("Principal:  {principal}"));
        }
    }
    lines.push(format!("Body:\n{}", json(&s.body)));
    if !s.paths.is_empty() {
        lines.push(format!("Output ({}):\n{}", s.paths.join(", "), json(&s.output)));
    }
    lines.join("\n")
}

// ── Handlers ────────────────────────────────────────────────────────

pub fn handle(args: &ShowArgs, global: &GlobalOpts, state_path: &Path) -> Result<(), CliError> {
    let state = StateFile::load(state_path)?;
    let recorded = state.get(&args.name)?;

    let out = if args.output_only {
        output::render_single(
            &global.output,
            &recorded.output,
            |v| serde_json::to_string_pretty(v).unwrap_or_else(|_| v.to_string()),
            ToString::to_string,
        )?
    } else {
        output::render_single(
            &global.output,
            recorded,
            |s| detail(&args.name, s),
            |s| s.id.encode(),
        )?
    };
    output::print_output(&out, global.quiet);
    Ok(())
}

pub fn list(global: &GlobalOpts, state_path: &Path) -> Result<(), CliError> {
    let state = StateFile::load(state_path)?;
    let named: Vec<Named<'_>> = state
        .resources
        .iter()
        .map(|(name, state)| Named { name, state })
        .collect();
    let out = output::render_list(
        &global.output,
        &named,
        |n| ResourceRow::from(n),
        |n| n.name.to_owned(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
