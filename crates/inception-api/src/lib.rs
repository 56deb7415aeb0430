// inception-api: Async Rust client for the Inception security panel API

pub mod auth;
pub mod client;
pub mod dialect;
pub mod error;
pub mod models;
pub mod monitor;
pub mod session;
pub mod stream;
pub mod transport;

pub use auth::{AuthMethod, Credential, CredentialSource, CredentialTransport};
pub use client::PanelClient;
pub use dialect::ApiDialect;
pub use error::{AuthError, Error};
pub use models::{AreaControl, AreaId, AreaSummary, AreaUpdate, RawAreaState, UpdateBatch};
pub use session::SessionManager;
pub use stream::UpdateStream;
pub use transport::{TlsMode, TransportConfig};
