// ── Resource declarations and recorded state ──
//
// `ResourceSpec` is what a user declares (one entry in a manifest).
// `ResourceState` is what the reconciler last observed for it, persisted by
// the caller between runs.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use genrm_api::HttpMethod;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CoreError;
use crate::identifier::ResourceIdentifier;
use crate::projector::{IdentityBlock, StructuredAddOns};

// ── Declaration ──────────────────────────────────────────────────────

/// A declared resource.
///
/// `body` may be given as a JSON object or as a string of JSON text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceSpec {
    pub name: String,
    pub url: String,
    pub api_version: String,
    pub body: Value,
    #[serde(default)]
    pub create_method: HttpMethod,
    #[serde(default)]
    pub update_method: HttpMethod,
    /// Dotted paths projected from the remote document into `output`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub paths: Vec<String>,
    #[serde(flatten)]
    pub addons: StructuredAddOns,
    /// Keys nothing above claims; any here fail validation.
    #[serde(flatten, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, Value>,
}

impl ResourceSpec {
    pub fn identifier(&self) -> Result<ResourceIdentifier, CoreError> {
        ResourceIdentifier::new(&self.url, &self.api_version)
    }

    /// The declared body as a JSON object.
    pub fn desired_body(&self) -> Result<Value, CoreError> {
        let invalid = |message: String| CoreError::InvalidJson {
            context: format!("body of `{}`", self.name),
            message,
        };
        let value = match &self.body {
            Value::String(text) if text.trim().is_empty() => Value::Object(Map::new()),
            Value::String(text) => serde_json::from_str(text).map_err(|e| invalid(e.to_string()))?,
            other => other.clone(),
        };
        match value {
            Value::Object(_) => Ok(value),
            Value::Null => Ok(Value::Object(Map::new())),
            _ => Err(invalid("body must be a JSON object".into())),
        }
    }

    /// Check everything that can be checked without the remote.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.name.trim().is_empty() {
            return Err(CoreError::Validation {
                field: "name".into(),
                reason: "must not be empty".into(),
            });
        }
        if !self.extra.is_empty() {
            let keys: Vec<&str> = self.extra.keys().map(String::as_str).collect();
            return Err(CoreError::Validation {
                field: keys.join(", "),
                reason: "unknown field in resource declaration".into(),
            });
        }
        self.identifier()?;
        self.desired_body()?;
        if let Some(identity) = &self.addons.identity {
            crate::projector::identity_fragment(identity)?;
        }
        for path in &self.paths {
            if path.trim().is_empty() {
                return Err(CoreError::Validation {
                    field: "paths".into(),
                    reason: "paths must not be empty strings".into(),
                });
            }
        }
        Ok(())
    }
}

// ── Recorded state ───────────────────────────────────────────────────

/// What the reconciler last saw for one resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceState {
    pub id: ResourceIdentifier,
    /// Read-back body: declared keys with their remote values.
    pub body: Value,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<IdentityBlock>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub paths: Vec<String>,
    #[serde(default)]
    pub create_method: HttpMethod,
    #[serde(default)]
    pub update_method: HttpMethod,
    /// Projection of `paths` out of the last remote document.
    pub output: Value,
    pub refreshed_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn spec(body: Value) -> ResourceSpec {
        ResourceSpec {
            name: "rg".into(),
            url: "/subscriptions/s1/resourceGroups/rg".into(),
            api_version: "2021-04-01".into(),
            body,
            create_method: HttpMethod::Put,
            update_method: HttpMethod::Put,
            paths: Vec::new(),
            addons: StructuredAddOns::default(),
            extra: BTreeMap::new(),
        }
    }

    #[test]
    fn body_may_be_json_text() {
        let s = spec(json!(r#"{"properties": {"a": 1}}"#));
        assert_eq!(s.desired_body().unwrap(), json!({"properties": {"a": 1}}));
    }

    #[test]
    fn empty_body_is_an_empty_object() {
        assert_eq!(spec(json!("")).desired_body().unwrap(), json!({}));
        assert_eq!(spec(Value::Null).desired_body().unwrap(), json!({}));
    }

    #[test]
    fn body_must_be_an_object() {
        assert!(matches!(
            spec(json!([1, 2])).desired_body(),
            Err(CoreError::InvalidJson { .. })
        ));
        assert!(matches!(
            spec(json!("{oops")).desired_body(),
            Err(CoreError::InvalidJson { .. })
        ));
    }

    #[test]
    fn manifest_entry_deserializes_with_defaults() {
        let s: ResourceSpec = serde_json::from_value(json!({
            "name": "rg",
            "url": "/subscriptions/s1/resourceGroups/rg",
            "api_version": "2021-04-01",
            "body": {},
            "location": "westus",
            "tags": {"env": "dev"},
            "identity": {"type": "SystemAssigned"}
        }))
        .unwrap();
        assert_eq!(s.create_method, HttpMethod::Put);
        assert_eq!(s.update_method, HttpMethod::Put);
        assert_eq!(s.addons.location.as_deref(), Some("westus"));
        assert_eq!(s.addons.tags.get("env").map(String::as_str), Some("dev"));
        s.validate().unwrap();
    }

    #[test]
    fn misspelled_keys_fail_validation() {
        let s: ResourceSpec = serde_json::from_value(json!({
            "name": "rg",
            "url": "/a",
            "api_version": "1",
            "body": {},
            "path": ["properties.x"],
            "identity_id": ["/ids/a"],
            "tags": {"env": "dev"}
        }))
        .unwrap();
        assert_eq!(s.addons.tags.len(), 1);
        assert!(s.paths.is_empty());
        match s.validate() {
            Err(CoreError::Validation { field, .. }) => assert_eq!(field, "identity_id, path"),
            other => panic!("expected a validation error, got {other:?}"),
        }
    }

    #[test]
    fn declared_keys_leave_nothing_unclaimed() {
        let s: ResourceSpec = serde_json::from_value(json!({
            "name": "rg",
            "url": "/a",
            "api_version": "1",
            "body": {},
            "paths": ["properties.x"],
            "location": "westus",
            "identity": {"type": "SystemAssigned"}
        }))
        .unwrap();
        assert!(s.extra.is_empty());
        let round_tripped = serde_json::to_value(&s).unwrap();
        assert!(round_tripped.get("extra").is_none());
    }

    #[test]
    fn patch_is_not_an_accepted_method() {
        let result = serde_json::from_value::<ResourceSpec>(json!({
            "name": "rg",
            "url": "/a",
            "api_version": "1",
            "body": {},
            "update_method": "PATCH"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn validate_rejects_identity_ids_without_user_assigned() {
        let mut s = spec(json!({}));
        s.addons.identity = Some(IdentityBlock {
            identity_type: "SystemAssigned".into(),
            identity_ids: ["/ids/a".to_owned()].into(),
            ..IdentityBlock::default()
        });
        assert!(matches!(
            s.validate(),
            Err(CoreError::InvalidIdentity { .. })
        ));
    }

    #[test]
    fn validate_rejects_missing_url() {
        let mut s = spec(json!({}));
        s.url = String::new();
        assert!(s.validate().is_err());
    }
}
