use sensible_hashes::{Hash160, HASH160_SIZE};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, PartialEq, Eq, Debug, Clone)]
pub enum AddressError {
    #[error("Invalid network {0}")]
    InvalidNetwork(String),

    #[error("Invalid version byte {0:#04x}")]
    InvalidVersion(u8),

    #[error("Invalid payload length {0}")]
    InvalidLength(usize),

    #[error("Base58 decoding error: {0}")]
    DecodingError(String),
}

#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Debug, Hash, Serialize, Deserialize, Default)]
pub enum Network {
    #[serde(rename = "mainnet")]
    #[default]
    Mainnet,
    #[serde(rename = "testnet")]
    Testnet,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
        }
    }

    /// Version byte prepended to P2PKH payloads.
    pub fn p2pkh_version(&self) -> u8 {
        match self {
            Network::Mainnet => 0x00,
            Network::Testnet => 0x6f,
        }
    }

    /// Version byte prepended to WIF private keys.
    pub fn wif_version(&self) -> u8 {
        match self {
            Network::Mainnet => 0x80,
            Network::Testnet => 0xef,
        }
    }

    pub fn from_p2pkh_version(version: u8) -> Result<Self, AddressError> {
        match version {
            0x00 => Ok(Network::Mainnet),
            0x6f => Ok(Network::Testnet),
            _ => Err(AddressError::InvalidVersion(version)),
        }
    }

    pub fn from_wif_version(version: u8) -> Result<Self, AddressError> {
        match version {
            0x80 => Ok(Network::Mainnet),
            0xef => Ok(Network::Testnet),
            _ => Err(AddressError::InvalidVersion(version)),
        }
    }
}

impl Display for Network {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mainnet" => Ok(Network::Mainnet),
            "testnet" => Ok(Network::Testnet),
            _ => Err(AddressError::InvalidNetwork(s.to_string())),
        }
    }
}

/// Pay-to-public-key-hash address.
///
/// The all-zero hash is reserved as the protocol burn address: nobody holds a
/// key hashing to it, so tokens sent there can only leave through a contract.
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Debug, Hash)]
pub struct Address {
    pub network: Network,
    pub hash: Hash160,
}

impl Address {
    pub fn new(network: Network, hash: Hash160) -> Self {
        Self { network, hash }
    }

    pub fn burn(network: Network) -> Self {
        Self { network, hash: Hash160::ZERO }
    }

    pub fn is_burn(&self) -> bool {
        self.hash.is_zero()
    }

    pub fn hash_bytes(&self) -> [u8; HASH160_SIZE] {
        self.hash.as_bytes()
    }

    pub fn encode(&self) -> String {
        let mut payload = Vec::with_capacity(HASH160_SIZE + 1);
        payload.push(self.network.p2pkh_version());
        payload.extend_from_slice(self.hash.as_ref());
        bs58::encode(payload).with_check().into_string()
    }

    pub fn decode(address: &str) -> Result<Self, AddressError> {
        let payload = bs58::decode(address).with_check(None).into_vec().map_err(|err| AddressError::DecodingError(err.to_string()))?;
        if payload.len() != HASH160_SIZE + 1 {
            return Err(AddressError::InvalidLength(payload.len()));
        }
        let network = Network::from_p2pkh_version(payload[0])?;
        let hash = Hash160::from_slice(&payload[1..]).ok_or(AddressError::InvalidLength(payload.len()))?;
        Ok(Self { network, hash })
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::decode(s)
    }
}

impl TryFrom<&str> for Address {
    type Error = AddressError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Address::decode(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encode())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Address::decode(&s).map_err(serde::de::Error::custom)
    }
}
