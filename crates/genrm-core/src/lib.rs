// genrm-core: resource identifiers, JSON merge engine and the reconciler
// between genrm-api and its consumers.

pub mod config;
pub mod error;
pub mod identifier;
pub mod json;
pub mod lifecycle;
pub mod plan;
pub mod projector;
pub mod reconciler;
pub mod resource;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{AuthCredentials, ClientConfig, OperationTimeouts, TlsVerification, discover_endpoint};
pub use error::{CoreError, Operation};
pub use identifier::ResourceIdentifier;
pub use lifecycle::{Lifecycle, LifecycleEvent, LifecycleState};
pub use plan::{ChangedField, Plan, PlanAction, plan};
pub use projector::{IdentityBlock, IdentityType, StructuredAddOns};
pub use reconciler::{DeleteOutcome, Reconciler, WriteIntent};
pub use resource::{ResourceSpec, ResourceState};

pub use genrm_api::HttpMethod;
pub use tokio_util::sync::CancellationToken;
