//!
//! Backtrace proofs: compact, hash committed slices of an ancestor
//! transaction that let a contract check its lineage one hop at a time.
//!

use crate::error::{Error, Result};
use sensible_consensus_core::{hashing::tx as tx_hashing, tx::Transaction};
use sensible_hashes::sha256;

/// Pieces of a transaction a contract needs to recompute its header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxDigest {
    pub header: Vec<u8>,
    pub input_hash_proof: Vec<u8>,
    pub output_hash_proof: Vec<u8>,
}

/// Proof that an input of a transaction spends a given outpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TxInputProof {
    pub hash_proof: Vec<u8>,
    pub prev_tx_hash: Vec<u8>,
    pub output_index_bytes: Vec<u8>,
    pub sequence_bytes: Vec<u8>,
}

impl TxInputProof {
    /// Placeholder passed when there is no ancestor to prove against.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.hash_proof.is_empty() && self.prev_tx_hash.is_empty()
    }
}

/// Proof that a transaction carries a given output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TxOutputProof {
    pub tx_header: Vec<u8>,
    pub hash_proof: Vec<u8>,
    pub satoshi_bytes: Vec<u8>,
    pub script_hash: Vec<u8>,
}

impl TxOutputProof {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.tx_header.is_empty() && self.hash_proof.is_empty()
    }
}

pub fn transaction_digest(tx: &Transaction) -> TxDigest {
    TxDigest {
        header: tx_hashing::header(tx),
        input_hash_proof: tx_hashing::input_hash_proof(tx),
        output_hash_proof: tx_hashing::output_hash_proof(&tx.outputs),
    }
}

pub fn input_proof(tx: &Transaction, input_index: usize) -> Result<TxInputProof> {
    let input = tx.inputs.get(input_index).ok_or(Error::InputIndexOutOfRange(input_index))?;
    Ok(TxInputProof {
        hash_proof: tx_hashing::input_hash_proof(tx),
        prev_tx_hash: input.previous_outpoint.transaction_id.as_bytes().to_vec(),
        output_index_bytes: input.previous_outpoint.index.to_le_bytes().to_vec(),
        sequence_bytes: input.sequence.to_le_bytes().to_vec(),
    })
}

pub fn output_proof(tx: &Transaction, output_index: usize) -> Result<TxOutputProof> {
    let output = tx.outputs.get(output_index).ok_or(Error::OutputIndexOutOfRange(output_index))?;
    Ok(TxOutputProof {
        tx_header: tx_hashing::header(tx),
        hash_proof: tx_hashing::output_hash_proof(&tx.outputs),
        satoshi_bytes: output.value.to_le_bytes().to_vec(),
        script_hash: sha256(output.script_public_key.script()).to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sensible_consensus_core::{
        constants::TX_VERSION,
        tx::{ScriptPublicKey, TransactionInput, TransactionOutpoint, TransactionOutput},
    };
    use sensible_hashes::{Hash, sha256d};

    fn transaction() -> Transaction {
        let inputs = (0..3u8)
            .map(|i| TransactionInput::new(TransactionOutpoint::new(Hash::from_bytes([i + 1; 32]), i as u32 * 2), vec![i; 10 + i as usize], 0xffff_fff0 + i as u32))
            .collect();
        let outputs = (0..4u8).map(|i| TransactionOutput::new(1000 * (i as u64 + 1), ScriptPublicKey::new(vec![0x51 + i; 3 + i as usize]))).collect();
        Transaction::new(TX_VERSION, inputs, outputs, 7)
    }

    #[test]
    fn test_input_proof_is_self_consistent() {
        let tx = transaction();
        let digest = transaction_digest(&tx);
        for (i, input) in tx.inputs.iter().enumerate() {
            let proof = input_proof(&tx, i).unwrap();
            assert_eq!(proof.hash_proof, digest.input_hash_proof);
            let slice = &proof.hash_proof[i * 40..(i + 1) * 40];
            assert_eq!(&slice[..32], proof.prev_tx_hash.as_slice());
            assert_eq!(&slice[32..36], proof.output_index_bytes.as_slice());
            assert_eq!(&slice[36..], proof.sequence_bytes.as_slice());
            assert_eq!(proof.sequence_bytes, input.sequence.to_le_bytes());
            assert_eq!(&digest.header[16..48], sha256(&proof.hash_proof).as_slice());
        }
        assert_eq!(input_proof(&tx, 3), Err(Error::InputIndexOutOfRange(3)));
    }

    #[test]
    fn test_output_proof_is_self_consistent() {
        let tx = transaction();
        let digest = transaction_digest(&tx);
        for (i, output) in tx.outputs.iter().enumerate() {
            let proof = output_proof(&tx, i).unwrap();
            assert_eq!(proof.tx_header, digest.header);
            assert_eq!(proof.hash_proof, digest.output_hash_proof);
            let slice = &proof.hash_proof[i * 40..(i + 1) * 40];
            assert_eq!(&slice[..8], proof.satoshi_bytes.as_slice());
            assert_eq!(&slice[8..], proof.script_hash.as_slice());
            assert_eq!(proof.script_hash, sha256(output.script_public_key.script()));
            assert_eq!(&proof.tx_header[80..112], sha256(&proof.hash_proof).as_slice());
            assert_eq!(sha256d(&proof.tx_header), tx.id());
        }
        assert_eq!(output_proof(&tx, 4), Err(Error::OutputIndexOutOfRange(4)));
    }

    #[test]
    fn test_empty_proofs() {
        assert!(TxInputProof::empty().is_empty());
        assert!(TxOutputProof::empty().is_empty());
        assert!(!input_proof(&transaction(), 0).unwrap().is_empty());
    }
}
