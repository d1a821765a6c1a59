//!
//! Data parts of the check contracts.
//!
//! FT transfer-check and unlock-check payload:
//! `receiverCount(4) ‖ receiverAddress(20)* ‖ receiverAmount(8)* ‖ tokenCodeHash(20) ‖ tokenId(20)`
//!
//! NFT unlock-check payload: `nftCodeHash(20) ‖ nftId(20)`
//!

use crate::{
    adapter::{ContractKind, DataPart},
    error::{Error, Result},
    proto,
};
use sensible_hashes::{HASH160_SIZE, Hash160};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Receiver {
    pub address: Hash160,
    pub amount: u64,
}

impl Receiver {
    pub fn new(address: Hash160, amount: u64) -> Self {
        Self { address, amount }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FtCheckDataPart {
    /// Token outputs in output order. Empty when burning.
    pub receivers: Vec<Receiver>,
    pub token_code_hash: Hash160,
    pub token_id: Hash160,
}

impl FtCheckDataPart {
    pub fn total_amount(&self) -> u128 {
        self.receivers.iter().map(|r| r.amount as u128).sum()
    }
}

impl DataPart for FtCheckDataPart {
    fn encode(&self) -> Result<Vec<u8>> {
        let count = self.receivers.len();
        let mut payload = Vec::with_capacity(4 + count * (HASH160_SIZE + 8) + 2 * HASH160_SIZE);
        payload.extend_from_slice(&(count as u32).to_le_bytes());
        for receiver in self.receivers.iter() {
            payload.extend_from_slice(receiver.address.as_ref());
        }
        for receiver in self.receivers.iter() {
            payload.extend_from_slice(&receiver.amount.to_le_bytes());
        }
        payload.extend_from_slice(self.token_code_hash.as_ref());
        payload.extend_from_slice(self.token_id.as_ref());
        Ok(payload)
    }

    fn decode(script: &[u8]) -> Self {
        decode_ft_check(script).unwrap_or_default()
    }

    fn force_protocol_fields(&mut self, _kind: ContractKind) {}
}

fn decode_ft_check(script: &[u8]) -> Option<FtCheckDataPart> {
    let payload = proto::payload(script)?;
    let count = u32::from_le_bytes(payload.get(..4)?.try_into().ok()?) as usize;
    let addresses = 4;
    let amounts = addresses + count.checked_mul(HASH160_SIZE)?;
    let hashes = amounts + count.checked_mul(8)?;
    if payload.len() != hashes + 2 * HASH160_SIZE {
        return None;
    }
    let receivers = (0..count)
        .map(|i| {
            let address = Hash160::from_slice(&payload[addresses + i * HASH160_SIZE..addresses + (i + 1) * HASH160_SIZE])?;
            let amount = u64::from_le_bytes(payload[amounts + i * 8..amounts + (i + 1) * 8].try_into().ok()?);
            Some(Receiver::new(address, amount))
        })
        .collect::<Option<Vec<_>>>()?;
    Some(FtCheckDataPart {
        receivers,
        token_code_hash: Hash160::from_slice(&payload[hashes..hashes + HASH160_SIZE])?,
        token_id: Hash160::from_slice(&payload[hashes + HASH160_SIZE..])?,
    })
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NftCheckDataPart {
    pub nft_code_hash: Hash160,
    pub nft_id: Hash160,
}

impl DataPart for NftCheckDataPart {
    fn encode(&self) -> Result<Vec<u8>> {
        Ok([self.nft_code_hash.as_ref(), self.nft_id.as_ref()].concat())
    }

    fn decode(script: &[u8]) -> Self {
        match proto::payload(script) {
            Some(payload) if payload.len() == 2 * HASH160_SIZE => Self {
                nft_code_hash: Hash160::from_slice(&payload[..HASH160_SIZE]).unwrap_or_default(),
                nft_id: Hash160::from_slice(&payload[HASH160_SIZE..]).unwrap_or_default(),
            },
            _ => Self::default(),
        }
    }

    fn force_protocol_fields(&mut self, _kind: ContractKind) {}
}

/// Builds the receiver list from parallel address and amount lists.
pub fn receivers_from_lists(addresses: &[Hash160], amounts: &[u64]) -> Result<Vec<Receiver>> {
    if addresses.len() != amounts.len() {
        return Err(Error::ReceiverMismatch(addresses.len(), amounts.len()));
    }
    Ok(addresses.iter().zip(amounts).map(|(address, amount)| Receiver::new(*address, *amount)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::build_script;
    use sensible_txscript::opcodes::codes::OpReturn;

    #[test]
    fn test_ft_check_roundtrip() {
        struct Test {
            name: &'static str,
            receivers: usize,
        }

        let tests = vec![
            Test { name: "burn without receivers", receivers: 0 },
            Test { name: "single receiver", receivers: 1 },
            Test { name: "tier 3x100", receivers: 100 },
        ];

        for test in tests {
            let data_part = FtCheckDataPart {
                receivers: (0..test.receivers).map(|i| Receiver::new(Hash160::from_bytes([i as u8; 20]), i as u64 * 10)).collect(),
                token_code_hash: Hash160::from_bytes([0xc0; 20]),
                token_id: Hash160::from_bytes([0x1d; 20]),
            };
            let script = build_script(&[OpReturn], &data_part.encode().unwrap()).unwrap();
            assert_eq!(FtCheckDataPart::decode(&script), data_part, "{}", test.name);
        }
    }

    #[test]
    fn test_ft_check_malformed() {
        let mut payload = FtCheckDataPart { receivers: vec![Receiver::default()], ..Default::default() }.encode().unwrap();
        payload[0] = 2;
        let script = build_script(&[OpReturn], &payload).unwrap();
        assert_eq!(FtCheckDataPart::decode(&script), FtCheckDataPart::default());
        assert_eq!(FtCheckDataPart::decode(&[0x6a]), FtCheckDataPart::default());
    }

    #[test]
    fn test_nft_check_roundtrip() {
        let data_part = NftCheckDataPart { nft_code_hash: Hash160::from_bytes([1; 20]), nft_id: Hash160::from_bytes([2; 20]) };
        let script = build_script(&[OpReturn], &data_part.encode().unwrap()).unwrap();
        assert_eq!(NftCheckDataPart::decode(&script), data_part);
    }

    #[test]
    fn test_receivers_from_lists() {
        let receivers = receivers_from_lists(&[Hash160::ZERO, Hash160::from_bytes([1; 20])], &[5, 6]).unwrap();
        assert_eq!(receivers[1], Receiver::new(Hash160::from_bytes([1; 20]), 6));
        assert_eq!(receivers_from_lists(&[Hash160::ZERO], &[]), Err(Error::ReceiverMismatch(1, 0)));
    }
}
