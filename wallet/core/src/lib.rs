//!
//! Transaction construction for the FT and NFT token protocols: UTXO
//! selection, the transaction composer, ancestry proofs and the token
//! operations built on them.
//!

pub mod api;
pub mod cache;
pub mod error;
pub mod result;
pub mod token;
pub mod tx;
pub mod utxo;

#[cfg(test)]
mod tests;

pub use api::IndexerApi;
pub use result::Result;
pub use token::{FeeOptions, FtManager, NftManager};
