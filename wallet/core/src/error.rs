use sensible_addresses::AddressError;
use sensible_consensus_core::{
    errors::TxDecodeError,
    sign::Error as SignError,
    tx::{TransactionId, TransactionOutpoint},
};
use sensible_txscript::{TxScriptError, script_builder::ScriptBuilderError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Custom(String),

    #[error("insufficient funds: {needed} satoshis required, {available} available")]
    InsufficientFunds { needed: u64, available: u64 },

    #[error("insufficient token balance: {needed} required, {available} available")]
    InsufficientToken { needed: u128, available: u128 },

    #[error("too many token UTXOs ({0}), merge them first")]
    TooManyTokenUtxos(usize),

    #[error("too many fee UTXOs ({count}), at most {max} can be spent at once")]
    TooManyFeeUtxos { count: usize, max: usize },

    #[error("token supply is fixed: no genesis UTXO left to mint from")]
    FixedTokenSupply,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("UTXO {0} is not held by the burn address")]
    CannotBurnNonZeroAddress(TransactionOutpoint),

    #[error("token lineage error: {0}")]
    InternalLineageError(String),

    #[error("token amounts do not balance: {inputs} in, {outputs} out")]
    TokenConservation { inputs: u128, outputs: u128 },

    #[error("outputs spend {outputs} satoshis but the inputs only hold {inputs}")]
    NegativeUnspent { inputs: u64, outputs: u64 },

    #[error("fee rate {actual} is below the required {required} satoshis per byte")]
    FeeRateTooLow { actual: f64, required: f64 },

    #[error("check transaction {check_txid} was broadcast but the main transaction failed: {source}")]
    PartialBroadcast { check_txid: TransactionId, source: Box<Error> },

    #[error("output value {0} exceeds the money supply")]
    OutputValueOverflow(u64),

    #[error("indexer error: {0}")]
    Indexer(String),

    #[error(transparent)]
    Contract(#[from] sensible_contracts::error::Error),

    #[error(transparent)]
    ScriptBuilder(#[from] ScriptBuilderError),

    #[error(transparent)]
    TxScript(#[from] TxScriptError),

    #[error("signing error: {0}")]
    Sign(#[from] SignError),

    #[error("transaction decoding error: {0}")]
    TxDecode(#[from] TxDecodeError),

    #[error(transparent)]
    Address(#[from] AddressError),

    #[error("hex decoding error: {0}")]
    Hex(#[from] hex::FromHexError),
}

impl Error {
    pub fn custom<T: Into<String>>(msg: T) -> Self {
        Error::Custom(msg.into())
    }
}

impl From<String> for Error {
    fn from(err: String) -> Self {
        Self::Custom(err)
    }
}

impl From<&str> for Error {
    fn from(err: &str) -> Self {
        Self::Custom(err.to_string())
    }
}
