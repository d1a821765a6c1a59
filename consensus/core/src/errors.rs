use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TxDecodeError {
    #[error("unexpected end of data at offset {0}")]
    UnexpectedEof(usize),

    #[error("{0} trailing bytes after the transaction")]
    TrailingBytes(usize),

    #[error("length {0} exceeds the remaining data")]
    OversizedLength(u64),

    #[error("hex decoding error: {0}")]
    Hex(#[from] hex::FromHexError),
}

pub type TxDecodeResult<T> = std::result::Result<T, TxDecodeError>;
