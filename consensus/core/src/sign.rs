use crate::{
    hashing::{
        sighash::{SigHashReusedValues, calc_signature_hash},
        sighash_type::SigHashType,
    },
    tx::Transaction,
};
use sensible_addresses::AddressError;
use sensible_hashes::Hash;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error("{0}")]
    Message(String),

    #[error("Secp256k1 -> {0}")]
    Secp256k1Error(#[from] secp256k1::Error),

    #[error("Address -> {0}")]
    AddressError(#[from] AddressError),

    #[error("invalid WIF private key: {0}")]
    InvalidWif(String),

    #[error("input index {0} is out of range")]
    InputIndexOutOfRange(usize),

    #[error("invalid sighash type byte {0:#04x}")]
    InvalidSigHashType(u8),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Signs a digest and returns the DER encoded signature followed by the hash type byte.
///
/// Signatures are ground to a low R value so the result never exceeds 72 bytes.
pub fn sign_digest(digest: Hash, secret_key: &secp256k1::SecretKey, hash_type: SigHashType) -> Vec<u8> {
    let msg = secp256k1::Message::from_digest(digest.as_bytes());
    let sig = secp256k1::SECP256K1.sign_ecdsa_low_r(&msg, secret_key);
    sig.serialize_der().iter().copied().chain([hash_type.to_u8()]).collect()
}

/// Sign a transaction input spending an output locked by `script_code` holding `value`.
pub fn sign_input(
    tx: &Transaction,
    input_index: usize,
    script_code: &[u8],
    value: u64,
    secret_key: &secp256k1::SecretKey,
    hash_type: SigHashType,
) -> Result<Vec<u8>> {
    if input_index >= tx.inputs.len() {
        return Err(Error::InputIndexOutOfRange(input_index));
    }
    let reused_values = &mut SigHashReusedValues::new();
    let hash = calc_signature_hash(tx, input_index, script_code, value, hash_type, reused_values);
    Ok(sign_digest(hash, secret_key, hash_type))
}

/// Verifies a signature (DER followed by the hash type byte) against an input.
pub fn verify_input(
    tx: &Transaction,
    input_index: usize,
    script_code: &[u8],
    value: u64,
    signature: &[u8],
    public_key: &secp256k1::PublicKey,
) -> Result<()> {
    if input_index >= tx.inputs.len() {
        return Err(Error::InputIndexOutOfRange(input_index));
    }
    let (hash_type, der) = signature.split_last().ok_or(Error::Message("empty signature".to_string()))?;
    let hash_type = SigHashType::from_u8(*hash_type).map_err(|_| Error::InvalidSigHashType(*hash_type))?;
    let sig = secp256k1::ecdsa::Signature::from_der(der)?;
    let reused_values = &mut SigHashReusedValues::new();
    let hash = calc_signature_hash(tx, input_index, script_code, value, hash_type, reused_values);
    let msg = secp256k1::Message::from_digest(hash.as_bytes());
    secp256k1::SECP256K1.verify_ecdsa(&msg, &sig, public_key)?;
    Ok(())
}
