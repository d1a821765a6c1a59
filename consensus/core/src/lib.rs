//!
//! Transaction model of the chain together with the hashing, serialization and
//! signing primitives the token contracts rely upon.
//!

pub mod constants;
pub mod errors;
pub mod hashing;
pub mod keys;
pub mod sign;
pub mod tx;
