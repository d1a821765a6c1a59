//!
//! Fungible token data part.
//!
//! Payload layout (165 bytes):
//! `name(40) ‖ symbol(20) ‖ decimal(1) ‖ address(20) ‖ amount(8) ‖ genesisHash(20) ‖ sensibleID(36) ‖ version(4) ‖ type(4) ‖ flag(12)`
//!

use crate::{
    adapter::{ContractKind, DataPart},
    error::Result,
    proto::{
        self, OUTPOINT_LEN, ProtoType, SensibleId, TYPE_OFFSET, VERSION_OFFSET, read_field, read_hash160, read_string, read_u32,
        read_u64, write_header, write_padded,
    },
};
use sensible_hashes::{Hash160, hash160};

pub const FT_PROTO_VERSION: u32 = 1;

pub const TOKEN_NAME_LEN: usize = 40;
pub const TOKEN_SYMBOL_LEN: usize = 20;
pub const FT_PAYLOAD_LEN: usize = 165;

// Field positions, as distances from the end of the payload.
const SENSIBLE_ID_OFFSET: usize = VERSION_OFFSET + OUTPOINT_LEN;
const GENESIS_HASH_OFFSET: usize = SENSIBLE_ID_OFFSET + 20;
const TOKEN_AMOUNT_OFFSET: usize = GENESIS_HASH_OFFSET + 8;
const TOKEN_ADDRESS_OFFSET: usize = TOKEN_AMOUNT_OFFSET + 20;
const DECIMAL_OFFSET: usize = TOKEN_ADDRESS_OFFSET + 1;
const TOKEN_SYMBOL_OFFSET: usize = DECIMAL_OFFSET + TOKEN_SYMBOL_LEN;
const TOKEN_NAME_OFFSET: usize = TOKEN_SYMBOL_OFFSET + TOKEN_NAME_LEN;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FtDataPart {
    pub token_name: String,
    pub token_symbol: String,
    pub decimal_num: u8,
    pub token_address: Hash160,
    pub token_amount: u64,
    pub genesis_hash: Hash160,
    pub sensible_id: SensibleId,
    pub proto_version: u32,
    pub proto_type: u32,
}

impl FtDataPart {
    /// Genesis id of the token: `hash160` of the payload with the owner,
    /// amount and genesis hash zeroed.
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

/// Zeroes the per-instance fields of an encoded payload, leaving the fields
/// shared by every contract of one token.
fn normalize_payload(payload: &mut [u8]) {
    let end = payload.len();
    payload[end - TOKEN_ADDRESS_OFFSET..end - GENESIS_HASH_OFFSET + 20].fill(0);
}

impl DataPart for FtDataPart {
    fn encode(&self) -> Result<Vec<u8>> {
        let mut payload = Vec::with_capacity(FT_PAYLOAD_LEN);
        write_padded(&mut payload, "token_name", self.token_name.as_bytes(), TOKEN_NAME_LEN)?;
        write_padded(&mut payload, "token_symbol", self.token_symbol.as_bytes(), TOKEN_SYMBOL_LEN)?;
        payload.push(self.decimal_num);
        payload.extend_from_slice(self.token_address.as_ref());
        payload.extend_from_slice(&self.token_amount.to_le_bytes());
        payload.extend_from_slice(self.genesis_hash.as_ref());
        payload.extend_from_slice(&self.sensible_id.to_bytes());
        write_header(&mut payload, self.proto_version, self.proto_type);
        Ok(payload)
    }

    fn decode(script: &[u8]) -> Self {
        Self {
            token_name: read_string(script, TOKEN_NAME_OFFSET, TOKEN_NAME_LEN),
            token_symbol: read_string(script, TOKEN_SYMBOL_OFFSET, TOKEN_SYMBOL_LEN),
            decimal_num: read_field(script, DECIMAL_OFFSET, 1).map(|b| b[0]).unwrap_or_default(),
            token_address: get_token_address(script),
            token_amount: get_token_amount(script),
            genesis_hash: get_genesis_hash(script),
            sensible_id: query_sensible_id(script),
            proto_version: read_u32(script, VERSION_OFFSET),
            proto_type: read_u32(script, TYPE_OFFSET),
        }
    }

    fn force_protocol_fields(&mut self, kind: ContractKind) {
        self.proto_version = FT_PROTO_VERSION;
        self.proto_type = ProtoType::Ft.to_u32();
        if kind == ContractKind::FtGenesis {
            self.genesis_hash = Hash160::ZERO;
            self.token_amount = 0;
        }
    }
}

pub fn get_token_address(script: &[u8]) -> Hash160 {
    read_hash160(script, TOKEN_ADDRESS_OFFSET)
}

pub fn get_token_amount(script: &[u8]) -> u64 {
    read_u64(script, TOKEN_AMOUNT_OFFSET)
}

pub fn get_genesis_hash(script: &[u8]) -> Hash160 {
    read_hash160(script, GENESIS_HASH_OFFSET)
}

pub fn query_sensible_id(script: &[u8]) -> SensibleId {
    read_field(script, SENSIBLE_ID_OFFSET, OUTPOINT_LEN).and_then(SensibleId::from_slice).unwrap_or_default()
}

pub fn query_codehash(script: &[u8]) -> Hash160 {
    proto::query_codehash(script)
}

/// Genesis id of the token the script belongs to, zero for foreign scripts.
pub fn query_genesis(script: &[u8]) -> Hash160 {
    if !proto::has_protocol_flag(script) {
        return Hash160::ZERO;
    }
    match proto::payload(script) {
        Some(payload) if payload.len() == FT_PAYLOAD_LEN => {
            let mut payload = payload.to_vec();
            normalize_payload(&mut payload);
            hash160(&payload)
        }
        _ => Hash160::ZERO,
    }
}

/// Replaces the data part of an FT script.
pub fn update_script(script: &[u8], data_part: &FtDataPart) -> Result<Vec<u8>> {
    proto::update_script(script, &data_part.encode()?)
}
