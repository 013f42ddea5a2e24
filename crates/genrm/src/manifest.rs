//! Manifest loading: a YAML (or JSON) document with a `resources` list.
//!
//! ```yaml
//! resources:
//!   - name: rg
//!     url: /subscriptions/s1/resourceGroups/rg1
//!     api_version: "2021-04-01"
//!     location: westeurope
//!     body: {}
//! ```

use std::collections::BTreeSet;
use std::path::Path;

use serde::Deserialize;

use genrm_core::ResourceSpec;

use crate::error::CliError;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub resources: Vec<ResourceSpec>,
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self, CliError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text).map_err(|reason| CliError::Manifest {
            path: path.display().to_string(),
            reason,
        })
    }

    /// Parse and validate manifest text. JSON is accepted as a YAML subset.
    pub fn parse(text: &str) -> Result<Self, String> {
        let manifest: Self = serde_yaml::from_str(text).map_err(|e| e.to_string())?;

        let mut seen = BTreeSet::new();
        for spec in &manifest.resources {
            if !seen.insert(spec.name.as_str()) {
                return Err(format!("resource name `{}` is declared twice", spec.name));
            }
            spec.validate()
                .map_err(|e| format!("resource `{}`: {e}", spec.name))?;
        }
        Ok(manifest)
    }

    /// The declared resources, narrowed to `targets` when any are given.
    pub fn select(&self, targets: &[String]) -> Result<Vec<&ResourceSpec>, CliError> {
        if targets.is_empty() {
            return Ok(self.resources.iter().collect());
        }
        targets
            .iter()
            .map(|target| {
                self.resources
                    .iter()
                    .find(|spec| &spec.name == target)
                    .ok_or_else(|| CliError::NotFound {
                        resource_type: "manifest entry".into(),
                        identifier: target.clone(),
                        list_command: "plan -f <FILE>".into(),
                    })
            })
            .collect()
    }
}
