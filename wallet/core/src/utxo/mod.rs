//!
//! Spendable outputs and the ancestry bundles token inputs carry.
//!

pub mod selection;

pub use selection::*;

use crate::api::UnspentOutput;
use sensible_addresses::Address;
use sensible_consensus_core::tx::{ScriptPublicKey, Transaction, TransactionOutpoint};
use sensible_hashes::Hash160;
use sensible_txscript::pay_to_address_script;
use std::sync::Arc;

/// An output about to be spent together with the data needed to sign it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utxo {
    pub outpoint: TransactionOutpoint,
    pub script_public_key: ScriptPublicKey,
    pub satoshis: u64,
    /// Owner of a P2PKH output.
    pub address: Option<Address>,
}

impl Utxo {
    pub fn new(outpoint: TransactionOutpoint, script_public_key: ScriptPublicKey, satoshis: u64) -> Self {
        Self { outpoint, script_public_key, satoshis, address: None }
    }

    pub fn p2pkh(outpoint: TransactionOutpoint, address: Address, satoshis: u64) -> Self {
        Self { outpoint, script_public_key: pay_to_address_script(&address), satoshis, address: Some(address) }
    }

    /// Output `index` of a transaction.
    pub fn from_output(tx: &Transaction, index: u32) -> Option<Self> {
        let output = tx.outputs.get(index as usize)?;
        Some(Self::new(TransactionOutpoint::new(tx.id(), index), output.script_public_key.clone(), output.value))
    }
}

impl From<&UnspentOutput> for Utxo {
    fn from(unspent: &UnspentOutput) -> Self {
        Self::p2pkh(unspent.outpoint(), unspent.address, unspent.satoshis)
    }
}

/// Ancestry of a token output: the transaction that created it, and the
/// input of that transaction which spent the previous token state.
#[derive(Debug, Clone)]
pub struct SatotxInfo {
    pub tx: Arc<Transaction>,
    pub output_index: u32,
    pub prev_tx: Arc<Transaction>,
    pub prev_input_index: u32,
    pub prev_output_index: u32,
    pub prev_token_address: Hash160,
    pub prev_token_amount: u64,
}

#[derive(Debug, Clone)]
pub struct FtUtxo {
    pub utxo: Utxo,
    pub token_address: Address,
    pub token_amount: u64,
    pub satotx_info: SatotxInfo,
}

impl FtUtxo {
    pub fn outpoint(&self) -> TransactionOutpoint {
        self.utxo.outpoint
    }
}

#[derive(Debug, Clone)]
pub struct NftUtxo {
    pub utxo: Utxo,
    pub nft_address: Address,
    pub token_index: u64,
    pub satotx_info: SatotxInfo,
}

