//!
//! Fee and size constants of the composer.
//!

pub use sensible_consensus_core::constants::DUST_FLOOR;
pub use sensible_txscript::P2PKH_UNLOCK_SIZE;

/// Serialized size of a P2PKH change output.
pub const MAX_CHANGE_OUTPUT_SIZE: usize = 34;

/// Largest value any single output may carry.
pub const MAX_SATOSHIS: u64 = 21_000_000 * 100_000_000;

/// Extra bytes budgeted per contract input in the second convergence round.
/// A contract signature computed in that round may be longer than the one
/// measured in the first round.
pub const CONTRACT_UNLOCK_SLACK: usize = 2;

/// Fee for a transaction of `size` bytes at `fee_rate` satoshis per byte.
pub fn calc_fee(size: usize, fee_rate: f64) -> u64 {
    (size as f64 * fee_rate).ceil() as u64
}
