//! Local state file: the last observed `ResourceState` per resource name.
//!
//! Written atomically (uniquely named temp file in the same directory, then
//! rename) so an interrupted run never leaves a truncated file behind and
//! concurrent runs never share a temp file.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::debug;

use genrm_core::ResourceState;

use crate::error::CliError;

const STATE_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
pub struct StateFile {
    pub version: u32,
    #[serde(default)]
    pub resources: BTreeMap<String, ResourceState>,
}

impl Default for StateFile {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            resources: BTreeMap::new(),
        }
    }
}

impl StateFile {
    /// Load from `path`. A missing file is an empty state.
    pub fn load(path: &Path) -> Result<Self, CliError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no state file yet");
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };
        let state: Self = serde_json::from_str(&text).map_err(|e| CliError::State {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        if state.version != STATE_VERSION {
            return Err(CliError::State {
                path: path.display().to_string(),
                reason: format!(
                    "unsupported version {} (expected {STATE_VERSION})",
                    state.version
                ),
            });
        }
        Ok(state)
    }

    pub fn save(&self, path: &Path) -> Result<(), CliError> {
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir)?;
        let text = serde_json::to_string_pretty(self)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(text.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| e.error)?;
        debug!(path = %path.display(), resources = self.resources.len(), "state saved");
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&ResourceState, CliError> {
        self.resources.get(name).ok_or_else(|| CliError::NotFound {
            resource_type: "resource".into(),
            identifier: name.into(),
            list_command: "list".into(),
        })
    }
}
