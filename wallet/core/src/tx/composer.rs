//!
//! [`TxComposer`] assembles one transaction: inputs with their signing
//! metadata, outputs and an optional change output that can be recomputed as
//! unlocking scripts grow.
//!

use super::fees::*;
use crate::{error::Error, result::Result, utxo::Utxo};
use sensible_addresses::Address;
use sensible_consensus_core::{
    constants::{MAX_TX_IN_SEQUENCE_NUM, TX_VERSION},
    hashing::{
        sighash::{SigHashReusedValues, calc_signature_preimage},
        sighash_type::{SIG_HASH_ALL_FORK_ID, SigHashType},
    },
    keys::PrivateKey,
    sign::{self, sign_input},
    tx::{ScriptPublicKey, Transaction, TransactionId, TransactionInput, TransactionOutput},
};
use sensible_contracts::proto::outpoint_to_bytes;
use sensible_txscript::{op_return_script, pay_to_address_script, pay_to_pub_key_hash_signature_script};

/// How an input gets unlocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    P2pkh,
    Contract,
}

#[derive(Debug, Clone)]
struct InputEntry {
    utxo: Utxo,
    kind: InputKind,
}

#[derive(Debug, Clone)]
pub struct TxComposer {
    tx: Transaction,
    inputs: Vec<InputEntry>,
    change_output_index: Option<usize>,
    dust_floor: u64,
}

impl Default for TxComposer {
    fn default() -> Self {
        Self::new()
    }
}

impl TxComposer {
    pub fn new() -> Self {
        Self { tx: Transaction::new(TX_VERSION, vec![], vec![], 0), inputs: vec![], change_output_index: None, dust_floor: DUST_FLOOR }
    }

    /// Change below `dust_floor` satoshis is left to the miner.
    pub fn with_dust_floor(mut self, dust_floor: u64) -> Self {
        self.dust_floor = dust_floor;
        self
    }

    pub fn tx(&self) -> &Transaction {
        &self.tx
    }

    pub fn into_transaction(self) -> Transaction {
        self.tx
    }

    pub fn txid(&self) -> TransactionId {
        self.tx.id()
    }

    pub fn raw_hex(&self) -> String {
        self.tx.to_hex()
    }

    pub fn input_count(&self) -> usize {
        self.tx.inputs.len()
    }

    pub fn output_count(&self) -> usize {
        self.tx.outputs.len()
    }

    pub fn input_utxo(&self, input_index: usize) -> Result<&Utxo> {
        self.entry(input_index).map(|entry| &entry.utxo)
    }

    fn entry(&self, input_index: usize) -> Result<&InputEntry> {
        self.inputs.get(input_index).ok_or(Error::Sign(sign::Error::InputIndexOutOfRange(input_index)))
    }

    fn append(&mut self, utxo: &Utxo, kind: InputKind) -> usize {
        self.tx.inputs.push(TransactionInput::new(utxo.outpoint, vec![], MAX_TX_IN_SEQUENCE_NUM));
        self.inputs.push(InputEntry { utxo: utxo.clone(), kind });
        self.tx.inputs.len() - 1
    }

    pub fn append_p2pkh_input(&mut self, utxo: &Utxo) -> usize {
        self.append(utxo, InputKind::P2pkh)
    }

    /// Appends an input spending a contract output.
    pub fn append_input(&mut self, utxo: &Utxo) -> usize {
        self.append(utxo, InputKind::Contract)
    }

    pub fn append_output(&mut self, script_public_key: ScriptPublicKey, satoshis: u64) -> Result<usize> {
        if satoshis > MAX_SATOSHIS {
            return Err(Error::OutputValueOverflow(satoshis));
        }
        self.tx.outputs.push(TransactionOutput::new(satoshis, script_public_key));
        Ok(self.tx.outputs.len() - 1)
    }

    pub fn append_op_return_output(&mut self, chunks: &[&[u8]]) -> Result<usize> {
        self.append_output(op_return_script(chunks)?, 0)
    }

    pub fn total_input_value(&self) -> u64 {
        self.inputs.iter().map(|entry| entry.utxo.satoshis).sum()
    }

    pub fn total_output_value(&self) -> u64 {
        self.tx.total_output_value()
    }

    /// P2PKH inputs whose unlocking script is still missing.
    fn pending_p2pkh_unlocks(&self) -> usize {
        self.inputs.iter().zip(self.tx.inputs.iter()).filter(|(entry, input)| entry.kind == InputKind::P2pkh && input.signature_script.is_empty()).count()
    }

    /// Appends a P2PKH change output paying back whatever the fee at
    /// `fee_rate` leaves. `extra_unlock_size` accounts for unlocking scripts
    /// not set yet. Returns `None` when the change would be dust.
    pub fn append_change_output(&mut self, address: &Address, fee_rate: f64, extra_unlock_size: usize) -> Result<Option<usize>> {
        let size = self.tx.serialized_size() + self.pending_p2pkh_unlocks() * P2PKH_UNLOCK_SIZE + extra_unlock_size + MAX_CHANGE_OUTPUT_SIZE;
        let fee = calc_fee(size, fee_rate);
        let available = self.total_input_value();
        let needed = self.total_output_value() + fee;
        if available < needed {
            return Err(Error::InsufficientFunds { needed, available });
        }

        let change = available - needed;
        self.change_output_index =
            if change >= self.dust_floor { Some(self.append_output(pay_to_address_script(address), change)?) } else { None };
        Ok(self.change_output_index)
    }

    pub fn clear_change_output(&mut self) {
        if let Some(index) = self.change_output_index.take() {
            self.tx.outputs.remove(index);
        }
    }

    pub fn change_output_index(&self) -> Option<usize> {
        self.change_output_index
    }

    pub fn change_satoshis(&self) -> u64 {
        self.change_output_index.map(|index| self.tx.outputs[index].value).unwrap_or_default()
    }

    /// Outpoints of every input, concatenated.
    pub fn prevouts(&self) -> Vec<u8> {
        self.tx.inputs.iter().flat_map(|input| outpoint_to_bytes(&input.previous_outpoint)).collect()
    }

    /// Sighash preimage of an input, passed to contracts so they can inspect
    /// the spending transaction.
    pub fn get_input_preimage(&self, input_index: usize, hash_type: SigHashType) -> Result<Vec<u8>> {
        let utxo = self.input_utxo(input_index)?;
        let reused_values = &mut SigHashReusedValues::new();
        Ok(calc_signature_preimage(&self.tx, input_index, utxo.script_public_key.script(), utxo.satoshis, hash_type, reused_values))
    }

    /// Signature in the format contracts check with `OP_CHECKSIG`.
    pub fn get_tx_format_sig(&self, key: &PrivateKey, input_index: usize, hash_type: SigHashType) -> Result<Vec<u8>> {
        let utxo = self.input_utxo(input_index)?;
        Ok(sign_input(&self.tx, input_index, utxo.script_public_key.script(), utxo.satoshis, key.secret_key(), hash_type)?)
    }

    pub fn set_input_script(&mut self, input_index: usize, script: Vec<u8>) -> Result<()> {
        self.entry(input_index)?;
        self.tx.inputs[input_index].signature_script = script;
        Ok(())
    }

    pub fn unlock_p2pkh_input(&mut self, key: &PrivateKey, input_index: usize) -> Result<()> {
        let sig = self.get_tx_format_sig(key, input_index, SIG_HASH_ALL_FORK_ID)?;
        let script = pay_to_pub_key_hash_signature_script(&sig, &key.public_key_bytes())?;
        self.set_input_script(input_index, script)
    }

    /// Signs every P2PKH input with `key`.
    pub fn unlock_p2pkh_inputs(&mut self, key: &PrivateKey) -> Result<()> {
        let indexes: Vec<usize> = self.inputs.iter().enumerate().filter(|(_, entry)| entry.kind == InputKind::P2pkh).map(|(i, _)| i).collect();
        for input_index in indexes {
            self.unlock_p2pkh_input(key, input_index)?;
        }
        Ok(())
    }

    /// Satoshis paid per serialized byte. Fails when the outputs spend more
    /// than the inputs hold.
    pub fn get_fee_rate(&self) -> Result<f64> {
        let (inputs, outputs) = (self.total_input_value(), self.total_output_value());
        if outputs > inputs {
            return Err(Error::NegativeUnspent { inputs, outputs });
        }
        Ok((inputs - outputs) as f64 / self.tx.serialized_size() as f64)
    }
}
