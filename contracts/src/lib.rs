//!
//! Sensible token protocol: locking script codec, contract templates and
//! the backtrace proofs their unlock methods consume.
//!

pub mod adapter;
pub mod calls;
pub mod check;
pub mod config;
pub mod error;
pub mod factory;
pub mod ft;
pub mod nft;
pub mod proof;
pub mod proto;
pub mod tier;

pub use adapter::{ContractAdapter, ContractKind, DataPart};
pub use config::ProtocolConfig;
pub use factory::ContractFactory;
