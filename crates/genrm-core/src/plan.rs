// ── Planning ──
//
// Compare a declaration against recorded state and decide what an apply
// would do. Body comparison goes through the canonical JSON form, so key
// order and formatting never produce a change.

use std::fmt;

use serde::Serialize;
use strum::Display;

use crate::error::CoreError;
use crate::json::{is_empty_document, normalize};
use crate::projector::normalize_location;
use crate::resource::{ResourceSpec, ResourceState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PlanAction {
    Create,
    Update,
    /// `url` or `api_version` changed: delete the old, create the new.
    Replace,
    NoOp,
}

/// A declared field whose value differs from recorded state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ChangedField {
    Url,
    ApiVersion,
    Body,
    Tags,
    Location,
    Identity,
    Paths,
    CreateMethod,
    UpdateMethod,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plan {
    pub name: String,
    pub action: PlanAction,
    pub changed: Vec<ChangedField>,
    /// The recorded output no longer reflects the declaration and will be
    /// recomputed by the apply.
    pub output_stale: bool,
}

impl Plan {
    pub fn has_changes(&self) -> bool {
        self.action != PlanAction::NoOp
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.action)?;
        if !self.changed.is_empty() {
            let fields: Vec<String> = self.changed.iter().map(ToString::to_string).collect();
            write!(f, " ({})", fields.join(", "))?;
        }
        Ok(())
    }
}

/// Plan `spec` against the state recorded for it, if any.
///
/// Body, tags, location and identity are only compared when declared;
/// leaving them out (or an empty body) means "whatever the remote has".
pub fn plan(spec: &ResourceSpec, prior: Option<&ResourceState>) -> Result<Plan, CoreError> {
    spec.validate()?;
    let desired_id = spec.identifier()?;

    let Some(prior) = prior else {
        return Ok(Plan {
            name: spec.name.clone(),
            action: PlanAction::Create,
            changed: Vec::new(),
            output_stale: true,
        });
    };

    let mut changed = Vec::new();
    if desired_id.url() != prior.id.url() {
        changed.push(ChangedField::Url);
    }
    if desired_id.api_version() != prior.id.api_version() {
        changed.push(ChangedField::ApiVersion);
    }
    if !changed.is_empty() {
        return Ok(Plan {
            name: spec.name.clone(),
            action: PlanAction::Replace,
            changed,
            output_stale: true,
        });
    }

    let desired_body = spec.desired_body()?;
    if !is_empty_document(&desired_body) && normalize(&desired_body) != normalize(&prior.body) {
        changed.push(ChangedField::Body);
    }
    if !spec.addons.tags.is_empty() && spec.addons.tags != prior.tags {
        changed.push(ChangedField::Tags);
    }
    if let Some(location) = spec.addons.location.as_deref() {
        let declared = normalize_location(location);
        if prior.location.as_deref() != Some(declared.as_str()) {
            changed.push(ChangedField::Location);
        }
    }
    if let Some(identity) = &spec.addons.identity {
        let same = prior
            .identity
            .as_ref()
            .is_some_and(|recorded| identity.same_declaration(recorded));
        if !same {
            changed.push(ChangedField::Identity);
        }
    }
    if spec.paths != prior.paths {
        changed.push(ChangedField::Paths);
    }
    if spec.create_method != prior.create_method {
        changed.push(ChangedField::CreateMethod);
    }
    if spec.update_method != prior.update_method {
        changed.push(ChangedField::UpdateMethod);
    }

    let output_stale = changed.iter().any(|field| {
        matches!(
            field,
            ChangedField::Body | ChangedField::Tags | ChangedField::Identity | ChangedField::Paths
        )
    });
    let action = if changed.is_empty() {
        PlanAction::NoOp
    } else {
        PlanAction::Update
    };

    Ok(Plan {
        name: spec.name.clone(),
        action,
        changed,
        output_stale,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::Utc;
    use genrm_api::HttpMethod;
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};

    use super::*;
    use crate::identifier::ResourceIdentifier;
    use crate::projector::{IdentityBlock, StructuredAddOns};

    fn spec(body: Value) -> ResourceSpec {
        ResourceSpec {
            name: "acct".into(),
            url: "/things/acct".into(),
            api_version: "2021-01-01".into(),
            body,
            create_method: HttpMethod::Put,
            update_method: HttpMethod::Put,
            paths: Vec::new(),
            addons: StructuredAddOns::default(),
            extra: BTreeMap::new(),
        }
    }

    fn state(body: Value) -> ResourceState {
        ResourceState {
            id: ResourceIdentifier::new("/things/acct", "2021-01-01").unwrap(),
            body,
            tags: BTreeMap::from([("owner".to_owned(), "ops".to_owned())]),
            location: Some("westus2".into()),
            identity: None,
            paths: Vec::new(),
            create_method: HttpMethod::Put,
            update_method: HttpMethod::Put,
            output: json!({}),
            refreshed_at: Utc::now(),
        }
    }

    #[test]
    fn missing_state_plans_create() {
        let p = plan(&spec(json!({})), None).unwrap();
        assert_eq!(p.action, PlanAction::Create);
        assert!(p.output_stale);
    }

    #[test]
    fn reordered_body_is_no_op() {
        let s = spec(json!(r#"{"b": [1, 2], "a": {"y": 1, "x": 2}}"#));
        let prior = state(json!({"a": {"x": 2, "y": 1}, "b": [1, 2]}));
        let p = plan(&s, Some(&prior)).unwrap();
        assert_eq!(p.action, PlanAction::NoOp);
        assert!(!p.output_stale);
        assert!(!p.has_changes());
    }

    #[test]
    fn changed_body_plans_update_with_stale_output() {
        let p = plan(&spec(json!({"a": 2})), Some(&state(json!({"a": 1})))).unwrap();
        assert_eq!(p.action, PlanAction::Update);
        assert_eq!(p.changed, vec![ChangedField::Body]);
        assert!(p.output_stale);
    }

    #[test]
    fn empty_body_accepts_whatever_the_remote_reports() {
        let prior = state(json!({"properties": {"provisioningState": "Succeeded"}}));
        let p = plan(&spec(json!({})), Some(&prior)).unwrap();
        assert_eq!(p.action, PlanAction::NoOp);
    }

    #[test]
    fn api_version_change_plans_replace() {
        let mut s = spec(json!({}));
        s.api_version = "2022-01-01".into();
        let p = plan(&s, Some(&state(json!({})))).unwrap();
        assert_eq!(p.action, PlanAction::Replace);
        assert_eq!(p.changed, vec![ChangedField::ApiVersion]);
    }

    #[test]
    fn undeclared_addons_are_not_compared() {
        let p = plan(&spec(json!({})), Some(&state(json!({})))).unwrap();
        assert_eq!(p.action, PlanAction::NoOp);
    }

    #[test]
    fn declared_location_compares_normalized() {
        let mut s = spec(json!({}));
        s.addons.location = Some("West US 2".into());
        assert_eq!(plan(&s, Some(&state(json!({})))).unwrap().action, PlanAction::NoOp);

        s.addons.location = Some("eastus".into());
        let p = plan(&s, Some(&state(json!({})))).unwrap();
        assert_eq!(p.changed, vec![ChangedField::Location]);
        assert!(!p.output_stale);
    }

    #[test]
    fn identity_and_tag_changes_mark_output_stale() {
        let mut s = spec(json!({}));
        s.addons.identity = Some(IdentityBlock {
            identity_type: "SystemAssigned".into(),
            ..IdentityBlock::default()
        });
        s.addons.tags = BTreeMap::from([("owner".to_owned(), "dev".to_owned())]);
        let p = plan(&s, Some(&state(json!({})))).unwrap();
        assert_eq!(p.changed, vec![ChangedField::Tags, ChangedField::Identity]);
        assert!(p.output_stale);
    }

    #[test]
    fn display_lists_changed_fields() {
        let p = plan(&spec(json!({"a": 2})), Some(&state(json!({"a": 1})))).unwrap();
        assert_eq!(p.to_string(), "acct: update (body)");
    }
}
