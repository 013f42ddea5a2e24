// ── Resource lifecycle ──
//
//   Absent ──create──▶ Creating ──ok──▶ Present ──update──▶ Updating ──ok──▶ Present
//                         │                │  └───delete──▶ Deleting ──ok──▶ Absent
//                         └──err──▶ Failed └──read 404──▶ Absent
//
// `Failed` ends the operation, not the resource: the last stable state is
// kept and the next operation starts from it.

use strum::Display;
use tracing::debug;

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum LifecycleState {
    Absent,
    Creating,
    Present,
    Updating,
    Deleting,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum LifecycleEvent {
    BeginCreate,
    BeginUpdate,
    BeginDelete,
    Succeeded,
    RemoteFailed,
    /// A read found nothing at the identifier.
    Vanished,
}

impl LifecycleState {
    pub fn is_stable(self) -> bool {
        matches!(self, Self::Absent | Self::Present)
    }

    /// The state after `event`, or `InvalidTransition`.
    pub fn next(self, event: LifecycleEvent) -> Result<Self, CoreError> {
        use LifecycleEvent as E;

        let next = match (self, event) {
            (Self::Absent, E::BeginCreate) => Self::Creating,
            (Self::Present, E::BeginUpdate) => Self::Updating,
            (Self::Present, E::BeginDelete) => Self::Deleting,
            (Self::Creating | Self::Updating, E::Succeeded) => Self::Present,
            (Self::Deleting, E::Succeeded) | (Self::Present, E::Vanished) => Self::Absent,
            (Self::Creating | Self::Updating | Self::Deleting, E::RemoteFailed) => Self::Failed,
            (state, event) => {
                return Err(CoreError::InvalidTransition {
                    state: state.to_string(),
                    event: event.to_string(),
                });
            }
        };
        Ok(next)
    }
}

/// Tracks one resource through one operation.
#[derive(Debug, Clone)]
pub struct Lifecycle {
    id: String,
    last_stable: LifecycleState,
    current: LifecycleState,
}

impl Lifecycle {
    pub fn new(id: impl Into<String>, state: LifecycleState) -> Self {
        Self {
            id: id.into(),
            last_stable: state,
            current: state,
        }
    }

    pub fn current(&self) -> LifecycleState {
        self.current
    }

    /// The last `Absent`/`Present` state, unaffected by failures.
    pub fn last_stable(&self) -> LifecycleState {
        self.last_stable
    }

    pub fn apply(&mut self, event: LifecycleEvent) -> Result<LifecycleState, CoreError> {
        let next = self.current.next(event)?;
        debug!(id = %self.id, from = %self.current, to = %next, "lifecycle transition");
        self.current = next;
        if next.is_stable() {
            self.last_stable = next;
        }
        Ok(next)
    }

    /// Settle an in-flight operation from its result.
    pub fn settle<T>(&mut self, result: &Result<T, CoreError>) -> Result<LifecycleState, CoreError> {
        match result {
            Ok(_) => self.apply(LifecycleEvent::Succeeded),
            Err(_) => self.apply(LifecycleEvent::RemoteFailed),
        }
    }
}
