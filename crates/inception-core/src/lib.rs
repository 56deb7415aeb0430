// inception-core: Area-state synchronization between a security panel and
// an accessory layer.

pub mod command;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod model;
pub mod resolver;
pub mod sync;
pub mod system;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{BridgeConfig, MAX_LONG_POLL_TIMEOUT, SyncMode, TlsVerification};
pub use dispatch::CommandDispatcher;
pub use error::{CommandError, CoreError, ResolveError};
pub use model::{AreaStateFlags, SemanticState, TargetState, decode, decode_bool, decode_raw};
pub use resolver::{AreaRef, AreaSelector, select_area};
pub use sync::{CycleOutcome, StateSink, StateSynchronizer, next_delay};
pub use system::SecuritySystem;

// Wire-level types consumers need alongside the facade.
pub use inception_api::{
    ApiDialect, AreaId, AreaSummary, AuthMethod, CredentialSource, CredentialTransport,
};
