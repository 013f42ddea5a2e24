// ── Reconciler ──
//
// Drives one resource through its lifecycle against a `RemoteClient`:
//
//   create  = existence guard → compose body → create_update → read back
//   update  = compose body → create_update → read back
//   read    = get → reconcile with declared body → project outputs
//   import  = decode identifier → get → read back with no declared body
//   destroy = delete (404 counts as done)
//
// Each call is independent; the reconciler keeps no per-resource state and
// can serve concurrent operations on different identifiers.

use std::sync::Arc;

use chrono::Utc;
use genrm_api::{HttpMethod, RemoteClient};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{CoreError, Operation};
use crate::identifier::ResourceIdentifier;
use crate::json::{UNSUPPORTED_PROPERTIES, is_empty_document, project_output, reconcile_read};
use crate::lifecycle::{Lifecycle, LifecycleEvent, LifecycleState};
use crate::projector::{compose_request_body, flatten_identity, flatten_location, flatten_tags};
use crate::resource::{ResourceSpec, ResourceState};

/// Whether a write targets a resource that must not exist yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteIntent {
    /// Fail with `ConflictAlreadyExists` if the identifier already resolves.
    Create,
    Update,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// The remote already reported 404.
    AlreadyAbsent,
}

pub struct Reconciler {
    client: Arc<dyn RemoteClient>,
    ignored_properties: Vec<String>,
}

impl Reconciler {
    pub fn new(client: Arc<dyn RemoteClient>) -> Self {
        Self {
            client,
            ignored_properties: UNSUPPORTED_PROPERTIES
                .iter()
                .map(|p| (*p).to_owned())
                .collect(),
        }
    }

    /// Replace the top-level keys dropped from imported bodies.
    #[must_use]
    pub fn with_ignored_properties(mut self, properties: Vec<String>) -> Self {
        self.ignored_properties = properties;
        self
    }

    // ── Remote primitives ────────────────────────────────────────────

    /// Fetch the remote document; a 404 is `None`.
    pub async fn get(
        &self,
        cancel: &CancellationToken,
        id: &ResourceIdentifier,
    ) -> Result<Option<Value>, CoreError> {
        match self.client.get(cancel, id.url(), id.api_version()).await {
            Ok(resp) => Ok(Some(resp.body)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(CoreError::remote(Operation::Read, id, e)),
        }
    }

    /// Fail if something already lives at `id`. An empty body counts as
    /// nothing.
    pub async fn ensure_absent(
        &self,
        cancel: &CancellationToken,
        id: &ResourceIdentifier,
    ) -> Result<(), CoreError> {
        match self.client.get(cancel, id.url(), id.api_version()).await {
            Ok(resp) if !is_empty_document(&resp.body) => Err(CoreError::ConflictAlreadyExists {
                id: id.encode(),
            }),
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(CoreError::remote(Operation::ExistenceCheck, id, e)),
        }
    }

    /// Send a composed body. With [`WriteIntent::Create`] the existence
    /// guard runs first.
    pub async fn create_or_update(
        &self,
        cancel: &CancellationToken,
        id: &ResourceIdentifier,
        body: &Value,
        method: HttpMethod,
        intent: WriteIntent,
    ) -> Result<Value, CoreError> {
        if intent == WriteIntent::Create {
            self.ensure_absent(cancel, id).await?;
        }
        debug!(%id, %method, body = %body, "sending request body");
        self.client
            .create_update(cancel, id.url(), id.api_version(), body, method)
            .await
            .map(|resp| resp.body)
            .map_err(|e| CoreError::remote(Operation::CreateUpdate, id, e))
    }

    pub async fn delete(
        &self,
        cancel: &CancellationToken,
        id: &ResourceIdentifier,
    ) -> Result<DeleteOutcome, CoreError> {
        match self.client.delete(cancel, id.url(), id.api_version()).await {
            Ok(_) => Ok(DeleteOutcome::Deleted),
            Err(e) if e.is_not_found() => Ok(DeleteOutcome::AlreadyAbsent),
            Err(e) => Err(CoreError::remote(Operation::Delete, id, e)),
        }
    }

    // ── Lifecycle operations ─────────────────────────────────────────

    /// Create a resource that is not yet managed.
    pub async fn create(
        &self,
        cancel: &CancellationToken,
        spec: &ResourceSpec,
    ) -> Result<ResourceState, CoreError> {
        spec.validate()?;
        let id = spec.identifier()?;
        let body = compose_request_body(&spec.desired_body()?, &spec.addons)?;

        let mut lifecycle = Lifecycle::new(id.encode(), LifecycleState::Absent);
        lifecycle.apply(LifecycleEvent::BeginCreate)?;
        let result = self
            .create_or_update(cancel, &id, &body, spec.create_method, WriteIntent::Create)
            .await;
        lifecycle.settle(&result)?;
        result?;

        info!(%id, name = %spec.name, "created");
        self.read_back(cancel, &id, spec).await
    }

    /// Push the declaration over an existing resource.
    ///
    /// The identifier is immutable: a changed `url` or `api_version` is a
    /// replacement, not an update.
    pub async fn update(
        &self,
        cancel: &CancellationToken,
        spec: &ResourceSpec,
        prior: &ResourceState,
    ) -> Result<ResourceState, CoreError> {
        spec.validate()?;
        let id = spec.identifier()?;
        if id != prior.id {
            return Err(CoreError::Validation {
                field: "url".into(),
                reason: format!(
                    "{} is recorded as {}; replace the resource to change its identifier",
                    spec.name, prior.id
                ),
            });
        }
        let body = compose_request_body(&spec.desired_body()?, &spec.addons)?;

        let mut lifecycle = Lifecycle::new(id.encode(), LifecycleState::Present);
        lifecycle.apply(LifecycleEvent::BeginUpdate)?;
        let result = self
            .create_or_update(cancel, &id, &body, spec.update_method, WriteIntent::Update)
            .await;
        lifecycle.settle(&result)?;
        result?;

        info!(%id, name = %spec.name, "updated");
        self.read_back(cancel, &id, spec).await
    }

    /// Refresh recorded state from the remote. `None` means the resource
    /// is gone and should be dropped from state.
    pub async fn read(
        &self,
        cancel: &CancellationToken,
        prior: &ResourceState,
    ) -> Result<Option<ResourceState>, CoreError> {
        let mut lifecycle = Lifecycle::new(prior.id.encode(), LifecycleState::Present);
        let Some(remote) = self.get(cancel, &prior.id).await? else {
            lifecycle.apply(LifecycleEvent::Vanished)?;
            info!(id = %prior.id, "resource not found remotely, removing from state");
            return Ok(None);
        };

        let mut state = self.observe(&prior.id, &prior.body, &remote, prior.paths.clone());
        state.create_method = prior.create_method;
        state.update_method = prior.update_method;
        Ok(Some(state))
    }

    /// Adopt an existing resource by its encoded identifier.
    ///
    /// The recorded body is the whole remote document minus the ignored
    /// properties.
    pub async fn import(
        &self,
        cancel: &CancellationToken,
        encoded_id: &str,
        paths: Vec<String>,
    ) -> Result<ResourceState, CoreError> {
        let id = ResourceIdentifier::decode(encoded_id)?;
        let remote = self
            .get(cancel, &id)
            .await?
            .ok_or_else(|| CoreError::RemoteNotFound { id: id.encode() })?;

        info!(%id, "imported");
        Ok(self.observe(&id, &Value::Object(Map::new()), &remote, paths))
    }

    /// Delete a managed resource.
    pub async fn destroy(
        &self,
        cancel: &CancellationToken,
        state: &ResourceState,
    ) -> Result<DeleteOutcome, CoreError> {
        let mut lifecycle = Lifecycle::new(state.id.encode(), LifecycleState::Present);
        lifecycle.apply(LifecycleEvent::BeginDelete)?;
        let result = self.delete(cancel, &state.id).await;
        lifecycle.settle(&result)?;

        let outcome = result?;
        match outcome {
            DeleteOutcome::Deleted => info!(id = %state.id, "deleted"),
            DeleteOutcome::AlreadyAbsent => info!(id = %state.id, "already absent"),
        }
        Ok(outcome)
    }

    // ── Read-back ────────────────────────────────────────────────────

    async fn read_back(
        &self,
        cancel: &CancellationToken,
        id: &ResourceIdentifier,
        spec: &ResourceSpec,
    ) -> Result<ResourceState, CoreError> {
        let remote = self
            .get(cancel, id)
            .await?
            .ok_or_else(|| CoreError::RemoteNotFound { id: id.encode() })?;

        let mut state = self.observe(id, &spec.desired_body()?, &remote, spec.paths.clone());
        state.create_method = spec.create_method;
        state.update_method = spec.update_method;
        Ok(state)
    }

    /// Build state from a remote document.
    fn observe(
        &self,
        id: &ResourceIdentifier,
        desired: &Value,
        remote: &Value,
        paths: Vec<String>,
    ) -> ResourceState {
        let ignored: Vec<&str> = self.ignored_properties.iter().map(String::as_str).collect();
        ResourceState {
            id: id.clone(),
            body: reconcile_read(desired, remote, &ignored),
            tags: flatten_tags(remote),
            location: flatten_location(remote),
            identity: flatten_identity(remote),
            output: project_output(remote, &paths),
            paths,
            create_method: HttpMethod::default(),
            update_method: HttpMethod::default(),
            refreshed_at: Utc::now(),
        }
    }
}
