pub mod error;
pub mod opcodes;
pub mod script_builder;
pub mod standard;

pub use error::TxScriptError;
pub use standard::*;

/// Upper bound for a single locking or unlocking script accepted by the builder.
pub const MAX_SCRIPTS_SIZE: usize = 10_000_000;
/// Largest element a single `OpPushData4` can carry.
pub const MAX_SCRIPT_ELEMENT_SIZE: usize = u32::MAX as usize;

/// Size of a P2PKH unlocking script carrying a low-S DER signature of
/// maximal length plus the hash type byte and a compressed public key.
/// Used to estimate fees before inputs are signed.
pub const P2PKH_UNLOCK_SIZE: usize = 1 + 72 + 1 + 33;
