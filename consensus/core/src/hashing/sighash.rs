use sensible_hashes::{Hash, Hasher, HasherBase, TransactionHash};

use crate::tx::Transaction;

use super::{
    BytesWriter, HasherExtensions,
    sighash_type::SigHashType,
    tx::{write_outpoint, write_output},
};

/// Caches the transaction-wide digests shared by the preimages of all inputs.
#[derive(Default)]
pub struct SigHashReusedValues {
    previous_outputs_hash: Option<Hash>,
    sequence_hash: Option<Hash>,
    outputs_hash: Option<Hash>,
}

impl SigHashReusedValues {
    pub fn new() -> Self {
        Self { previous_outputs_hash: None, sequence_hash: None, outputs_hash: None }
    }
}

fn previous_outputs_hash(tx: &Transaction, hash_type: SigHashType, reused_values: &mut SigHashReusedValues) -> Hash {
    if hash_type.is_sighash_anyone_can_pay() {
        return Hash::ZERO;
    }

    if let Some(previous_outputs_hash) = reused_values.previous_outputs_hash {
        previous_outputs_hash
    } else {
        let mut hasher = TransactionHash::default();
        for input in tx.inputs.iter() {
            write_outpoint(&mut hasher, &input.previous_outpoint);
        }
        let previous_outputs_hash = hasher.finalize();
        reused_values.previous_outputs_hash = Some(previous_outputs_hash);
        previous_outputs_hash
    }
}

fn sequence_hash(tx: &Transaction, hash_type: SigHashType, reused_values: &mut SigHashReusedValues) -> Hash {
    if hash_type.is_sighash_single() || hash_type.is_sighash_anyone_can_pay() || hash_type.is_sighash_none() {
        return Hash::ZERO;
    }

    if let Some(sequence_hash) = reused_values.sequence_hash {
        sequence_hash
    } else {
        let mut hasher = TransactionHash::default();
        for input in tx.inputs.iter() {
            hasher.write_u32(input.sequence);
        }
        let sequence_hash = hasher.finalize();
        reused_values.sequence_hash = Some(sequence_hash);
        sequence_hash
    }
}

fn outputs_hash(tx: &Transaction, hash_type: SigHashType, reused_values: &mut SigHashReusedValues, input_index: usize) -> Hash {
    if hash_type.is_sighash_none() {
        return Hash::ZERO;
    }

    if hash_type.is_sighash_single() {
        // If the relevant output exists - return its hash, otherwise return zero-hash
        if input_index >= tx.outputs.len() {
            return Hash::ZERO;
        }

        let mut hasher = TransactionHash::default();
        write_output(&mut hasher, &tx.outputs[input_index]);
        return hasher.finalize();
    }

    // Otherwise, return hash of all outputs. Re-use hash if available.
    if let Some(outputs_hash) = reused_values.outputs_hash {
        outputs_hash
    } else {
        let mut hasher = TransactionHash::default();
        for output in tx.outputs.iter() {
            write_output(&mut hasher, output);
        }
        let outputs_hash = hasher.finalize();
        reused_values.outputs_hash = Some(outputs_hash);
        outputs_hash
    }
}

fn write_preimage<T: HasherBase>(
    hasher: &mut T,
    tx: &Transaction,
    input_index: usize,
    script_code: &[u8],
    value: u64,
    hash_type: SigHashType,
    reused_values: &mut SigHashReusedValues,
) {
    let input = &tx.inputs[input_index];
    hasher
        .write_u32(tx.version)
        .update(previous_outputs_hash(tx, hash_type, reused_values))
        .update(sequence_hash(tx, hash_type, reused_values));
    write_outpoint(hasher, &input.previous_outpoint);
    hasher
        .write_var_bytes(script_code)
        .write_u64(value)
        .write_u32(input.sequence)
        .update(outputs_hash(tx, hash_type, reused_values, input_index))
        .write_u32(tx.lock_time)
        .write_u32(hash_type.to_u8() as u32);
}

/// Returns the fork-id signature preimage of the input at `input_index`.
///
/// `script_code` is the locking script of the output being spent and `value`
/// its amount. Contracts receive this preimage as an unlocking argument so it
/// must match byte for byte what the signature covers.
///
/// Panics if `input_index` is out of range.
pub fn calc_signature_preimage(
    tx: &Transaction,
    input_index: usize,
    script_code: &[u8],
    value: u64,
    hash_type: SigHashType,
    reused_values: &mut SigHashReusedValues,
) -> Vec<u8> {
    let mut writer = BytesWriter::with_capacity(156 + script_code.len());
    write_preimage(&mut writer, tx, input_index, script_code, value, hash_type, reused_values);
    writer.into_bytes()
}

/// Double SHA-256 of the signature preimage, the digest that gets signed.
pub fn calc_signature_hash(
    tx: &Transaction,
    input_index: usize,
    script_code: &[u8],
    value: u64,
    hash_type: SigHashType,
    reused_values: &mut SigHashReusedValues,
) -> Hash {
    let mut hasher = TransactionHash::default();
    write_preimage(&mut hasher, tx, input_index, script_code, value, hash_type, reused_values);
    hasher.finalize()
}
