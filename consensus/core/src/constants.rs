/// Transaction version produced by the builders. Version 10 and above use
/// the header-digest transaction id.
pub const TX_VERSION: u32 = 10;

/// Lowest transaction version whose id is computed from the transaction header.
pub const TX_VERSION_HEADER_ID: u32 = 10;

/// Sequence number marking an input as final.
pub const MAX_TX_IN_SEQUENCE_NUM: u32 = u32::MAX;

/// Smallest output value accepted by relay policy, regardless of fee rate.
pub const DUST_FLOOR: u64 = 546;
