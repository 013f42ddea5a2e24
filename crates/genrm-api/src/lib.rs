// genrm-api: async client for generic, versioned resource-manager endpoints

pub mod auth;
pub mod client;
pub mod error;
pub mod metadata;
mod polling;
pub mod remote;
pub mod transport;

pub use auth::Credentials;
pub use client::ResourceClient;
pub use error::Error;
pub use metadata::{CloudEnvironment, discover_environment, normalize_environment_name};
pub use remote::{HttpMethod, RemoteClient, RemoteResponse};
pub use transport::{TlsMode, TransportConfig};
