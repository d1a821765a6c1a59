pub mod composer;
pub mod fees;

pub use composer::TxComposer;
pub use fees::*;
