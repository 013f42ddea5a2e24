// ── Structured add-ons ──
//
// Tags, location and managed identity are declared as typed fields rather
// than inside the free-form body. Each one expands to a small JSON fragment
// that is merged over the body before it is sent, and flattens back out of
// the remote document after a read.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use crate::error::CoreError;
use crate::json::merge;

// ── Identity ─────────────────────────────────────────────────────────

/// Managed identity types the resource manager accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
#[strum(ascii_case_insensitive)]
pub enum IdentityType {
    #[strum(serialize = "None")]
    Disabled,
    SystemAssigned,
    UserAssigned,
    #[strum(
        to_string = "SystemAssigned, UserAssigned",
        serialize = "SystemAssigned,UserAssigned"
    )]
    SystemAndUserAssigned,
}

impl IdentityType {
    pub fn includes_user_assigned(self) -> bool {
        matches!(self, Self::UserAssigned | Self::SystemAndUserAssigned)
    }

    fn expected() -> String {
        Self::iter()
            .map(|t| format!("{:?}", t.to_string()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Declared (or read-back) managed identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityBlock {
    #[serde(rename = "type")]
    pub identity_type: String,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub identity_ids: BTreeSet<String>,
    /// Assigned by the remote; ignored on input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal_id: Option<String>,
    /// Assigned by the remote; ignored on input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
}

impl IdentityBlock {
    pub fn parsed_type(&self) -> Result<IdentityType, CoreError> {
        self.identity_type
            .parse()
            .map_err(|_| CoreError::InvalidIdentityType {
                value: self.identity_type.clone(),
                expected: IdentityType::expected(),
            })
    }

    /// Equal in the fields a user declares: type and identity ids.
    pub fn same_declaration(&self, other: &Self) -> bool {
        let same_type = match (self.parsed_type(), other.parsed_type()) {
            (Ok(a), Ok(b)) => a == b,
            _ => self.identity_type == other.identity_type,
        };
        let lower = |ids: &BTreeSet<String>| -> BTreeSet<String> {
            ids.iter().map(|id| id.to_lowercase()).collect()
        };
        same_type && lower(&self.identity_ids) == lower(&other.identity_ids)
    }
}

/// The typed add-ons a resource can declare next to its body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredAddOns {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<IdentityBlock>,
}

// ── Expansion ────────────────────────────────────────────────────────

/// `{"tags": {...}}`, or nothing when no tags are declared.
pub fn tags_fragment(tags: &BTreeMap<String, String>) -> Option<Value> {
    if tags.is_empty() {
        return None;
    }
    Some(json!({ "tags": tags }))
}

/// `{"location": "..."}`, or nothing when unset or blank.
pub fn location_fragment(location: Option<&str>) -> Option<Value> {
    location
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| json!({ "location": l }))
}

/// `{"identity": {"type": ..., "userAssignedIdentities": {id: {}}}}`.
///
/// Identity ids are only accepted for types that include `UserAssigned`.
pub fn identity_fragment(identity: &IdentityBlock) -> Result<Value, CoreError> {
    let identity_type = identity.parsed_type()?;

    let mut block = Map::new();
    block.insert("type".into(), Value::String(identity_type.to_string()));
    if identity_type.includes_user_assigned() {
        let ids: Map<String, Value> = identity
            .identity_ids
            .iter()
            .map(|id| (id.clone(), json!({})))
            .collect();
        block.insert("userAssignedIdentities".into(), Value::Object(ids));
    } else if !identity.identity_ids.is_empty() {
        return Err(CoreError::InvalidIdentity {
            message: format!(
                "`identity_ids` can only be specified when `type` includes `UserAssigned`, got {:?}",
                identity_type.to_string()
            ),
        });
    }

    Ok(json!({ "identity": block }))
}

/// Merge the add-on fragments over `desired` in a fixed order: tags,
/// location, identity. `desired` itself is left untouched.
pub fn compose_request_body(
    desired: &Value,
    addons: &StructuredAddOns,
) -> Result<Value, CoreError> {
    let mut body = desired.clone();
    if let Some(tags) = tags_fragment(&addons.tags) {
        body = merge(&body, &tags);
    }
    if let Some(location) = location_fragment(addons.location.as_deref()) {
        body = merge(&body, &location);
    }
    if let Some(identity) = &addons.identity {
        body = merge(&body, &identity_fragment(identity)?);
    }
    Ok(body)
}

// ── Flattening ───────────────────────────────────────────────────────

/// String-valued tags of a remote document.
pub fn flatten_tags(doc: &Value) -> BTreeMap<String, String> {
    doc.get("tags")
        .and_then(Value::as_object)
        .map(|tags| {
            tags.iter()
                .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_owned())))
                .collect()
        })
        .unwrap_or_default()
}

/// The remote location, normalized.
pub fn flatten_location(doc: &Value) -> Option<String> {
    doc.get("location")
        .and_then(Value::as_str)
        .map(normalize_location)
        .filter(|l| !l.is_empty())
}

/// The remote identity block, if the document carries one with a type.
pub fn flatten_identity(doc: &Value) -> Option<IdentityBlock> {
    let identity = doc.get("identity")?.as_object()?;
    let raw_type = identity.get("type")?.as_str()?;
    let identity_type = raw_type
        .parse::<IdentityType>()
        .map_or_else(|_| raw_type.to_owned(), |t| t.to_string());

    let identity_ids = identity
        .get("userAssignedIdentities")
        .and_then(Value::as_object)
        .map(|ids| ids.keys().cloned().collect())
        .unwrap_or_default();
    let text = |key: &str| {
        identity
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_owned)
    };

    Some(IdentityBlock {
        identity_type,
        identity_ids,
        principal_id: text("principalId"),
        tenant_id: text("tenantId"),
    })
}

/// `West US 2` and `westus2` name the same region.
pub fn normalize_location(location: &str) -> String {
    location
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn identity(kind: &str, ids: &[&str]) -> IdentityBlock {
        IdentityBlock {
            identity_type: kind.into(),
            identity_ids: ids.iter().map(|s| (*s).to_owned()).collect(),
            ..IdentityBlock::default()
        }
    }

    #[test]
    fn empty_tags_produce_no_fragment() {
        assert_eq!(tags_fragment(&BTreeMap::new()), None);
        let tags = BTreeMap::from([("env".to_owned(), "dev".to_owned())]);
        assert_eq!(tags_fragment(&tags), Some(json!({"tags": {"env": "dev"}})));
    }

    #[test]
    fn blank_location_produces_no_fragment() {
        assert_eq!(location_fragment(None), None);
        assert_eq!(location_fragment(Some("  ")), None);
        assert_eq!(
            location_fragment(Some("westeurope")),
            Some(json!({"location": "westeurope"}))
        );
    }

    #[test]
    fn user_assigned_identity_lists_ids() {
        let fragment = identity_fragment(&identity("UserAssigned", &["/ids/a", "/ids/b"])).unwrap();
        assert_eq!(
            fragment,
            json!({"identity": {
                "type": "UserAssigned",
                "userAssignedIdentities": {"/ids/a": {}, "/ids/b": {}}
            }})
        );
    }

    #[test]
    fn combined_identity_type_is_canonicalized() {
        let fragment =
            identity_fragment(&identity("systemassigned,userassigned", &["/ids/a"])).unwrap();
        assert_eq!(
            fragment["identity"]["type"],
            json!("SystemAssigned, UserAssigned")
        );
    }

    #[test]
    fn system_assigned_identity_rejects_ids() {
        let err = identity_fragment(&identity("SystemAssigned", &["/ids/a"])).unwrap_err();
        assert!(matches!(err, CoreError::InvalidIdentity { .. }));
        assert_eq!(
            identity_fragment(&identity("SystemAssigned", &[])).unwrap(),
            json!({"identity": {"type": "SystemAssigned"}})
        );
    }

    #[test]
    fn unknown_identity_type_is_rejected() {
        let err = identity_fragment(&identity("Magic", &[])).unwrap_err();
        match err {
            CoreError::InvalidIdentityType { value, expected } => {
                assert_eq!(value, "Magic");
                assert!(expected.contains("\"SystemAssigned, UserAssigned\""));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn compose_merges_addons_over_body() {
        let desired = json!({"properties": {"sku": "S1"}, "tags": {"from": "body"}});
        let addons = StructuredAddOns {
            tags: BTreeMap::from([("env".to_owned(), "prod".to_owned())]),
            location: Some("westus".into()),
            identity: Some(identity("SystemAssigned", &[])),
        };
        let body = compose_request_body(&desired, &addons).unwrap();
        assert_eq!(
            body,
            json!({
                "properties": {"sku": "S1"},
                "tags": {"from": "body", "env": "prod"},
                "location": "westus",
                "identity": {"type": "SystemAssigned"}
            })
        );
        assert_eq!(desired["tags"], json!({"from": "body"}));
    }

    #[test]
    fn compose_without_addons_is_the_body() {
        let desired = json!({"properties": {"a": 1}});
        assert_eq!(
            compose_request_body(&desired, &StructuredAddOns::default()).unwrap(),
            desired
        );
    }

    #[test]
    fn flatten_reads_remote_addons() {
        let remote = json!({
            "location": "West Europe",
            "tags": {"env": "dev", "count": 3},
            "identity": {
                "type": "SystemAssigned,UserAssigned",
                "principalId": "p-1",
                "tenantId": "t-1",
                "userAssignedIdentities": {"/ids/a": {"clientId": "c"}}
            }
        });
        assert_eq!(flatten_location(&remote), Some("westeurope".into()));
        assert_eq!(
            flatten_tags(&remote),
            BTreeMap::from([("env".to_owned(), "dev".to_owned())])
        );
        let flattened = flatten_identity(&remote).unwrap();
        assert_eq!(flattened.identity_type, "SystemAssigned, UserAssigned");
        assert_eq!(flattened.principal_id.as_deref(), Some("p-1"));
        assert_eq!(flattened.tenant_id.as_deref(), Some("t-1"));
        assert!(flattened.same_declaration(&identity(
            "SystemAssigned, UserAssigned",
            &["/IDS/A"]
        )));
    }

    #[test]
    fn flatten_missing_addons() {
        let remote = json!({"properties": {}});
        assert!(flatten_tags(&remote).is_empty());
        assert_eq!(flatten_location(&remote), None);
        assert_eq!(flatten_identity(&remote), None);
    }

    #[test]
    fn location_normalization() {
        assert_eq!(normalize_location("West US 2"), "westus2");
        assert_eq!(normalize_location("eastus"), "eastus");
    }
}
