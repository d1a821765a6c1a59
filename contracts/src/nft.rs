//!
//! Non-fungible token data part.
//!
//! Payload layout (148 bytes):
//! `metaidOutpoint(36) ‖ address(20) ‖ totalSupply(8) ‖ tokenIndex(8) ‖ genesisHash(20) ‖ sensibleID(36) ‖ version(4) ‖ type(4) ‖ flag(12)`
//!

use crate::{
    adapter::{ContractKind, DataPart},
    error::Result,
    proto::{
        self, OUTPOINT_LEN, ProtoType, SensibleId, TYPE_OFFSET, VERSION_OFFSET, outpoint_to_bytes, read_field, read_hash160,
        read_outpoint, read_u32, read_u64, write_header,
    },
};
use sensible_consensus_core::tx::TransactionOutpoint;
use sensible_hashes::{Hash160, hash160};

pub const NFT_PROTO_VERSION: u32 = 1;
pub const NFT_PAYLOAD_LEN: usize = 148;

const SENSIBLE_ID_OFFSET: usize = VERSION_OFFSET + OUTPOINT_LEN;
const GENESIS_HASH_OFFSET: usize = SENSIBLE_ID_OFFSET + 20;
const TOKEN_INDEX_OFFSET: usize = GENESIS_HASH_OFFSET + 8;
const TOTAL_SUPPLY_OFFSET: usize = TOKEN_INDEX_OFFSET + 8;
const NFT_ADDRESS_OFFSET: usize = TOTAL_SUPPLY_OFFSET + 20;
const METAID_OUTPOINT_OFFSET: usize = NFT_ADDRESS_OFFSET + OUTPOINT_LEN;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NftDataPart {
    pub metaid_outpoint: TransactionOutpoint,
    pub nft_address: Hash160,
    pub total_supply: u64,
    /// Index of the token for an NFT, the next index to be issued for a genesis contract.
    pub token_index: u64,
    pub genesis_hash: Hash160,
    pub sensible_id: SensibleId,
    pub proto_version: u32,
    pub proto_type: u32,
}

impl NftDataPart {
    pub fn genesis_id(&self) -> Result<Hash160> {
        Ok(hash160(&self.normalized_payload()?))
    }

    /// Payload with every per-instance field zeroed.
    pub fn normalized_payload(&self) -> Result<Vec<u8>> {
        let mut payload = self.encode()?;
        normalize_payload(&mut payload);
        Ok(payload)
    }
}

/// Zeroes the metaid outpoint, owner, token index and genesis hash. The
/// total supply and sensible id are kept.
fn normalize_payload(payload: &mut [u8]) {
    let end = payload.len();
    payload[end - METAID_OUTPOINT_OFFSET..end - TOTAL_SUPPLY_OFFSET].fill(0);
    payload[end - TOKEN_INDEX_OFFSET..end - SENSIBLE_ID_OFFSET].fill(0);
}

impl DataPart for NftDataPart {
    fn encode(&self) -> Result<Vec<u8>> {
        let mut payload = Vec::with_capacity(NFT_PAYLOAD_LEN);
        payload.extend_from_slice(&outpoint_to_bytes(&self.metaid_outpoint));
        payload.extend_from_slice(self.nft_address.as_ref());
        payload.extend_from_slice(&self.total_supply.to_le_bytes());
        payload.extend_from_slice(&self.token_index.to_le_bytes());
        payload.extend_from_slice(self.genesis_hash.as_ref());
        payload.extend_from_slice(&self.sensible_id.to_bytes());
        write_header(&mut payload, self.proto_version, self.proto_type);
        Ok(payload)
    }

    fn decode(script: &[u8]) -> Self {
        Self {
            metaid_outpoint: read_outpoint(script, METAID_OUTPOINT_OFFSET),
            nft_address: get_nft_address(script),
            total_supply: get_total_supply(script),
            token_index: get_token_index(script),
            genesis_hash: read_hash160(script, GENESIS_HASH_OFFSET),
            sensible_id: query_sensible_id(script),
            proto_version: read_u32(script, VERSION_OFFSET),
            proto_type: read_u32(script, TYPE_OFFSET),
        }
    }

    fn force_protocol_fields(&mut self, kind: ContractKind) {
        self.proto_version = NFT_PROTO_VERSION;
        self.proto_type = ProtoType::Nft.to_u32();
        if kind == ContractKind::NftGenesis {
            self.genesis_hash = Hash160::ZERO;
            self.metaid_outpoint = TransactionOutpoint::default();
        }
    }
}

pub fn get_nft_address(script: &[u8]) -> Hash160 {
    read_hash160(script, NFT_ADDRESS_OFFSET)
}

pub fn get_total_supply(script: &[u8]) -> u64 {
    read_u64(script, TOTAL_SUPPLY_OFFSET)
}

pub fn get_token_index(script: &[u8]) -> u64 {
    read_u64(script, TOKEN_INDEX_OFFSET)
}

pub fn query_sensible_id(script: &[u8]) -> SensibleId {
    read_field(script, SENSIBLE_ID_OFFSET, OUTPOINT_LEN).and_then(SensibleId::from_slice).unwrap_or_default()
}

pub fn query_codehash(script: &[u8]) -> Hash160 {
    proto::query_codehash(script)
}

pub fn query_genesis(script: &[u8]) -> Hash160 {
    if !proto::has_protocol_flag(script) {
        return Hash160::ZERO;
    }
    match proto::payload(script) {
        Some(payload) if payload.len() == NFT_PAYLOAD_LEN => {
            let mut payload = payload.to_vec();
            normalize_payload(&mut payload);
            hash160(&payload)
        }
        _ => Hash160::ZERO,
    }
}

pub fn update_script(script: &[u8], data_part: &NftDataPart) -> Result<Vec<u8>> {
    proto::update_script(script, &data_part.encode()?)
}
