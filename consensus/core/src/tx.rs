mod script_public_key;

use crate::{
    errors::{TxDecodeError, TxDecodeResult},
    hashing,
};
use sensible_hashes::Hash;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

pub use script_public_key::ScriptPublicKey;

/// Represents the ID of a transaction
pub type TransactionId = Hash;

/// Represents a transaction outpoint
#[derive(Eq, Hash, PartialEq, Debug, Copy, Clone, Default, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub struct TransactionOutpoint {
    pub transaction_id: TransactionId,
    pub index: u32,
}

impl TransactionOutpoint {
    pub fn new(transaction_id: TransactionId, index: u32) -> Self {
        Self { transaction_id, index }
    }
}

impl Display for TransactionOutpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.transaction_id, self.index)
    }
}

/// Represents a transaction input
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TransactionInput {
    pub previous_outpoint: TransactionOutpoint,
    #[serde(with = "hex::serde")]
    pub signature_script: Vec<u8>,
    pub sequence: u32,
}

impl TransactionInput {
    pub fn new(previous_outpoint: TransactionOutpoint, signature_script: Vec<u8>, sequence: u32) -> Self {
        Self { previous_outpoint, signature_script, sequence }
    }
}

/// Represents a transaction output
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TransactionOutput {
    pub value: u64,
    pub script_public_key: ScriptPublicKey,
}

impl TransactionOutput {
    pub fn new(value: u64, script_public_key: ScriptPublicKey) -> Self {
        Self { value, script_public_key }
    }
}

/// Represents a transaction
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub version: u32,
    pub inputs: Vec<TransactionInput>,
    pub outputs: Vec<TransactionOutput>,
    pub lock_time: u32,
}

impl Transaction {
    pub fn new(version: u32, inputs: Vec<TransactionInput>, outputs: Vec<TransactionOutput>, lock_time: u32) -> Self {
        Self { version, inputs, outputs, lock_time }
    }

    /// Computes the transaction id. The id is not cached since builders
    /// keep mutating the transaction until it is signed.
    pub fn id(&self) -> TransactionId {
        hashing::tx::id(self)
    }

    pub fn serialized_size(&self) -> usize {
        hashing::tx::serialized_size(self)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        hashing::tx::serialize(self)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    pub fn from_bytes(bytes: &[u8]) -> TxDecodeResult<Self> {
        let mut reader = Reader { data: bytes, offset: 0 };
        let tx = reader.read_transaction()?;
        if reader.offset != bytes.len() {
            return Err(TxDecodeError::TrailingBytes(bytes.len() - reader.offset));
        }
        Ok(tx)
    }

    pub fn from_hex(raw: &str) -> TxDecodeResult<Self> {
        Self::from_bytes(&hex::decode(raw)?)
    }

    pub fn total_output_value(&self) -> u64 {
        self.outputs.iter().map(|output| output.value).sum()
    }
}

struct Reader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize) -> TxDecodeResult<&'a [u8]> {
        let end = self.offset.checked_add(len).filter(|end| *end <= self.data.len()).ok_or(TxDecodeError::UnexpectedEof(self.offset))?;
        let slice = &self.data[self.offset..end];
        self.offset = end;
        Ok(slice)
    }

    fn read_array<const N: usize>(&mut self) -> TxDecodeResult<[u8; N]> {
        let mut array = [0u8; N];
        array.copy_from_slice(self.take(N)?);
        Ok(array)
    }

    fn read_u32(&mut self) -> TxDecodeResult<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    fn read_u64(&mut self) -> TxDecodeResult<u64> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    fn read_len(&mut self) -> TxDecodeResult<usize> {
        let [prefix] = self.read_array::<1>()?;
        let len = match prefix {
            0xfd => u16::from_le_bytes(self.read_array()?) as u64,
            0xfe => u32::from_le_bytes(self.read_array()?) as u64,
            0xff => self.read_u64()?,
            n => n as u64,
        };
        // Every counted element takes at least one byte.
        if len > (self.data.len() - self.offset) as u64 {
            return Err(TxDecodeError::OversizedLength(len));
        }
        Ok(len as usize)
    }

    fn read_var_bytes(&mut self) -> TxDecodeResult<Vec<u8>> {
        let len = self.read_len()?;
        Ok(self.take(len)?.to_vec())
    }

    fn read_transaction(&mut self) -> TxDecodeResult<Transaction> {
        let version = self.read_u32()?;
        let input_count = self.read_len()?;
        let mut inputs = Vec::with_capacity(input_count);
        for _ in 0..input_count {
            let transaction_id = Hash::from_bytes(self.read_array()?);
            let index = self.read_u32()?;
            let signature_script = self.read_var_bytes()?;
            let sequence = self.read_u32()?;
            inputs.push(TransactionInput::new(TransactionOutpoint::new(transaction_id, index), signature_script, sequence));
        }
        let output_count = self.read_len()?;
        let mut outputs = Vec::with_capacity(output_count);
        for _ in 0..output_count {
            let value = self.read_u64()?;
            let script = self.read_var_bytes()?;
            outputs.push(TransactionOutput::new(value, ScriptPublicKey::new(script)));
        }
        let lock_time = self.read_u32()?;
        Ok(Transaction::new(version, inputs, outputs, lock_time))
    }
}
