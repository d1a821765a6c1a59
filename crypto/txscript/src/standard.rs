use crate::{
    TxScriptError,
    opcodes::codes::{OpCheckSig, OpData20, OpDup, OpEqualVerify, OpFalse, OpHash160, OpReturn},
    script_builder::{ScriptBuilder, ScriptBuilderResult},
};
use sensible_addresses::{Address, Network};
use sensible_consensus_core::tx::ScriptPublicKey;
use sensible_hashes::{HASH160_SIZE, Hash160};

const P2PKH_SCRIPT_LEN: usize = HASH160_SIZE + 5;

/// Creates a new script to pay a transaction output to a 20-byte pubkey hash.
fn pay_to_pub_key_hash(pub_key_hash: &[u8; HASH160_SIZE]) -> Vec<u8> {
    let mut script = Vec::with_capacity(P2PKH_SCRIPT_LEN);
    script.extend([OpDup, OpHash160, OpData20]);
    script.extend_from_slice(pub_key_hash);
    script.extend([OpEqualVerify, OpCheckSig]);
    script
}

/// Creates a new script to pay a transaction output to the specified address.
pub fn pay_to_address_script(address: &Address) -> ScriptPublicKey {
    ScriptPublicKey::new(pay_to_pub_key_hash(&address.hash_bytes()))
}

pub fn is_pay_to_pub_key_hash(script: &[u8]) -> bool {
    script.len() == P2PKH_SCRIPT_LEN
        && script[..3] == [OpDup, OpHash160, OpData20]
        && script[P2PKH_SCRIPT_LEN - 2..] == [OpEqualVerify, OpCheckSig]
}

/// Returns the address encoded in a pay-to-public-key-hash script.
pub fn extract_script_pub_key_address(script_public_key: &ScriptPublicKey, network: Network) -> Result<Address, TxScriptError> {
    let script = script_public_key.script();
    if !is_pay_to_pub_key_hash(script) {
        return Err(TxScriptError::PubKeyFormat);
    }
    let hash = Hash160::from_slice(&script[3..3 + HASH160_SIZE]).ok_or(TxScriptError::PubKeyFormat)?;
    Ok(Address::new(network, hash))
}

/// Creates an unspendable data carrier script (`OP_FALSE OP_RETURN <chunk>...`).
pub fn op_return_script(chunks: &[&[u8]]) -> ScriptBuilderResult<ScriptPublicKey> {
    let mut builder = ScriptBuilder::new();
    builder.add_ops(&[OpFalse, OpReturn])?;
    for chunk in chunks {
        builder.add_data(chunk)?;
    }
    Ok(ScriptPublicKey::new(builder.drain()))
}

/// Generates the unlocking script of a pay-to-public-key-hash output.
pub fn pay_to_pub_key_hash_signature_script(signature: &[u8], pub_key: &[u8]) -> ScriptBuilderResult<Vec<u8>> {
    Ok(ScriptBuilder::new().add_data(signature)?.add_data(pub_key)?.drain())
}
