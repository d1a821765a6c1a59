use crate::sign::{Error, Result};
use sensible_addresses::{Address, Network};
use sensible_hashes::hash160;
use std::{fmt::Debug, str::FromStr};

const WIF_COMPRESSED_FLAG: u8 = 0x01;

/// A secp256k1 private key bound to a network, as carried by WIF strings.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PrivateKey {
    secret_key: secp256k1::SecretKey,
    network: Network,
    compressed: bool,
}

impl PrivateKey {
    pub fn new(secret_key: secp256k1::SecretKey, network: Network) -> Self {
        Self { secret_key, network, compressed: true }
    }

    pub fn from_bytes(bytes: &[u8], network: Network) -> Result<Self> {
        Ok(Self::new(secp256k1::SecretKey::from_slice(bytes)?, network))
    }

    pub fn random(network: Network) -> Self {
        Self::new(secp256k1::SecretKey::new(&mut secp256k1::rand::thread_rng()), network)
    }

    pub fn from_wif(wif: &str) -> Result<Self> {
        let payload = bs58::decode(wif).with_check(None).into_vec().map_err(|err| Error::InvalidWif(err.to_string()))?;
        let compressed = match payload.len() {
            33 => false,
            34 if payload[33] == WIF_COMPRESSED_FLAG => true,
            len => return Err(Error::InvalidWif(format!("unexpected payload length {len}"))),
        };
        let network = Network::from_wif_version(payload[0])?;
        let secret_key = secp256k1::SecretKey::from_slice(&payload[1..33])?;
        Ok(Self { secret_key, network, compressed })
    }

    pub fn to_wif(&self) -> String {
        let mut payload = Vec::with_capacity(34);
        payload.push(self.network.wif_version());
        payload.extend_from_slice(&self.secret_key.secret_bytes());
        if self.compressed {
            payload.push(WIF_COMPRESSED_FLAG);
        }
        bs58::encode(payload).with_check().into_string()
    }

    pub fn secret_key(&self) -> &secp256k1::SecretKey {
        &self.secret_key
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn public_key(&self) -> secp256k1::PublicKey {
        self.secret_key.public_key(secp256k1::SECP256K1)
    }

    /// Public key in the encoding the key's address commits to.
    pub fn public_key_bytes(&self) -> Vec<u8> {
        if self.compressed { self.public_key().serialize().to_vec() } else { self.public_key().serialize_uncompressed().to_vec() }
    }

    pub fn address(&self) -> Address {
        Address::new(self.network, hash160(&self.public_key_bytes()))
    }
}

impl Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivateKey").field("network", &self.network).field("address", &self.address().to_string()).finish()
    }
}

impl FromStr for PrivateKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_wif(s)
    }
}

/// Address of a serialized public key.
pub fn public_key_address(public_key: &[u8], network: Network) -> Address {
    Address::new(network, hash160(public_key))
}
