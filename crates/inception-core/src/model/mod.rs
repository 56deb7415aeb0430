// ── Domain model ──
//
// Panel-neutral area state as the accessory layer sees it, plus the pure
// functions that turn wire state into it.

pub mod decode;
pub mod flags;
pub mod state;

pub use decode::{decode, decode_bool, decode_raw};
pub use flags::AreaStateFlags;
pub use state::{SemanticState, TargetState};
