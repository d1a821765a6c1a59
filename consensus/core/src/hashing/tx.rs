use super::{BytesWriter, HasherExtensions, var_int_size};
use crate::{
    constants::TX_VERSION_HEADER_ID,
    tx::{Transaction, TransactionId, TransactionInput, TransactionOutpoint, TransactionOutput},
};
use sensible_hashes::{Hasher, HasherBase, TransactionHash, sha256};

/// Serializes the transaction into its wire format.
pub fn serialize(tx: &Transaction) -> Vec<u8> {
    let mut writer = BytesWriter::with_capacity(serialized_size(tx));
    write_transaction(&mut writer, tx);
    writer.into_bytes()
}

pub fn serialized_size(tx: &Transaction) -> usize {
    let inputs: usize = tx.inputs.iter().map(|input| 40 + var_int_size(input.signature_script.len() as u64) + input.signature_script.len()).sum();
    let outputs: usize = tx.outputs.iter().map(output_serialized_size).sum();
    8 + var_int_size(tx.inputs.len() as u64) + inputs + var_int_size(tx.outputs.len() as u64) + outputs
}

pub fn output_serialized_size(output: &TransactionOutput) -> usize {
    let len = output.script_public_key.len();
    8 + var_int_size(len as u64) + len
}

/// Not intended for direct use by clients. Instead use `tx.id()`
pub fn id(tx: &Transaction) -> TransactionId {
    if tx.version >= TX_VERSION_HEADER_ID {
        TransactionHash::hash(header(tx))
    } else {
        let mut hasher = TransactionHash::default();
        write_transaction(&mut hasher, tx);
        hasher.finalize()
    }
}

/// Returns the fixed-size transaction header a header-id transaction is
/// identified by: version, lock time, input and output counts followed by the
/// digests of the inputs, the unlocking scripts and the outputs.
///
/// Contracts rebuild an ancestor's id from this header, which is why it is
/// also used as the backbone of the lineage proofs.
pub fn header(tx: &Transaction) -> Vec<u8> {
    let mut writer = BytesWriter::with_capacity(16 + 3 * 32);
    writer
        .write_u32(tx.version)
        .write_u32(tx.lock_time)
        .write_u32(tx.inputs.len() as u32)
        .write_u32(tx.outputs.len() as u32)
        .update(sha256(&input_hash_proof(tx)))
        .update(sha256(&unlocking_scripts_digests(tx)))
        .update(sha256(&output_hash_proof(&tx.outputs)));
    writer.into_bytes()
}

/// Concatenation of every input's outpoint and sequence, 40 bytes per input.
pub fn input_hash_proof(tx: &Transaction) -> Vec<u8> {
    let mut writer = BytesWriter::with_capacity(tx.inputs.len() * 40);
    for input in tx.inputs.iter() {
        write_outpoint(&mut writer, &input.previous_outpoint);
        writer.write_u32(input.sequence);
    }
    writer.into_bytes()
}

/// Concatenation of the SHA-256 digest of every unlocking script.
pub fn unlocking_scripts_digests(tx: &Transaction) -> Vec<u8> {
    tx.inputs.iter().flat_map(|input| sha256(&input.signature_script)).collect()
}

/// Concatenation of every output's value and locking script digest, 40 bytes per output.
pub fn output_hash_proof(outputs: &[TransactionOutput]) -> Vec<u8> {
    let mut writer = BytesWriter::with_capacity(outputs.len() * 40);
    for output in outputs.iter() {
        writer.write_u64(output.value).update(sha256(output.script_public_key.script()));
    }
    writer.into_bytes()
}

fn write_transaction<T: HasherBase>(hasher: &mut T, tx: &Transaction) {
    hasher.write_u32(tx.version).write_len(tx.inputs.len());
    for input in tx.inputs.iter() {
        write_input(hasher, input);
    }

    hasher.write_len(tx.outputs.len());
    for output in tx.outputs.iter() {
        write_output(hasher, output);
    }

    hasher.write_u32(tx.lock_time);
}

#[inline(always)]
fn write_input<T: HasherBase>(hasher: &mut T, input: &TransactionInput) {
    write_outpoint(hasher, &input.previous_outpoint);
    hasher.write_var_bytes(&input.signature_script).write_u32(input.sequence);
}

#[inline(always)]
pub(crate) fn write_outpoint<T: HasherBase>(hasher: &mut T, outpoint: &TransactionOutpoint) {
    hasher.update(outpoint.transaction_id).write_u32(outpoint.index);
}

#[inline(always)]
pub(crate) fn write_output<T: HasherBase>(hasher: &mut T, output: &TransactionOutput) {
    hasher.write_u64(output.value).write_var_bytes(output.script_public_key.script());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        constants::TX_VERSION,
        tx::{ScriptPublicKey, TransactionOutpoint},
    };
    use sensible_hashes::{Hash, sha256d};

    fn sample_tx(version: u32) -> Transaction {
        let input = TransactionInput::new(TransactionOutpoint::new(Hash::from_bytes([7; 32]), 3), vec![0x51, 0x52], 0xffff_fffe);
        let outputs = vec![
            TransactionOutput::new(1000, ScriptPublicKey::new(vec![0x76, 0xa9])),
            TransactionOutput::new(2000, ScriptPublicKey::new(vec![0x00, 0x6a])),
        ];
        Transaction::new(version, vec![input], outputs, 0)
    }

    #[test]
    fn test_header_layout() {
        let tx = sample_tx(TX_VERSION);
        let header = header(&tx);
        assert_eq!(header.len(), 112);
        assert_eq!(&header[..16], &[10, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 2, 0, 0, 0]);

        let mut inputs = vec![7u8; 32];
        inputs.extend(3u32.to_le_bytes());
        inputs.extend(0xffff_fffeu32.to_le_bytes());
        assert_eq!(input_hash_proof(&tx), inputs);
        assert_eq!(&header[16..48], &sha256(&inputs));
        assert_eq!(&header[48..80], &sha256(&sha256(&[0x51, 0x52])));

        let proof = output_hash_proof(&tx.outputs);
        assert_eq!(proof.len(), 80);
        assert_eq!(&proof[..8], &1000u64.to_le_bytes());
        assert_eq!(&proof[8..40], &sha256(&[0x76, 0xa9]));
        assert_eq!(&header[80..], &sha256(&proof));
    }

    #[test]
    fn test_transaction_id_versions() {
        let tx = sample_tx(TX_VERSION);
        assert_eq!(tx.id(), sha256d(&header(&tx)));

        let legacy = sample_tx(1);
        assert_eq!(legacy.id(), sha256d(&serialize(&legacy)));

        // Unlocking scripts contribute to the id either way.
        let mut altered = tx.clone();
        altered.inputs[0].signature_script.push(0x53);
        assert_ne!(altered.id(), tx.id());
    }

    #[test]
    fn test_serialized_size_matches() {
        let mut tx = sample_tx(TX_VERSION);
        tx.outputs.push(TransactionOutput::new(5, ScriptPublicKey::new(vec![0x6a; 300])));
        assert_eq!(serialize(&tx).len(), serialized_size(&tx));
        assert_eq!(Transaction::from_bytes(&serialize(&tx)).unwrap(), tx);
    }
}
