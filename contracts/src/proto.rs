//!
//! Framing shared by every protocol locking script.
//!
//! A protocol script is a contract code part (ending in `OP_RETURN`) followed
//! by a data part: a canonical push of the payload, the payload length as
//! 4 little-endian bytes and a one byte data part version. Every protocol
//! payload ends with the header `version ‖ type ‖ flag`, so fields are
//! addressed by their distance from the end of the payload.
//!

use crate::error::{Error, Result};
use sensible_consensus_core::tx::{TransactionId, TransactionOutpoint};
use sensible_hashes::{HASH_SIZE, Hash, Hash160, hash160};
use sensible_txscript::{
    opcodes::codes::{OpPushData1, OpPushData2, OpPushData4},
    script_builder::ScriptBuilder,
};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt::Display, str::FromStr};

/// Magic constant identifying protocol data.
pub const PROTO_FLAG: &[u8; PROTO_FLAG_LEN] = b"metacontract";
pub const PROTO_FLAG_LEN: usize = 12;

/// Length/version suffix appended after the payload push.
pub const DATA_SUFFIX_LEN: usize = 5;
pub const DATA_PART_VERSION: u8 = 0;

// Header field positions, as distances from the end of the payload.
pub const FLAG_OFFSET: usize = PROTO_FLAG_LEN;
pub const TYPE_OFFSET: usize = FLAG_OFFSET + 4;
pub const VERSION_OFFSET: usize = TYPE_OFFSET + 4;
pub const HEADER_LEN: usize = VERSION_OFFSET;

pub const OUTPOINT_LEN: usize = HASH_SIZE + 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ProtoType {
    Ft = 1,
    Unique = 2,
    Nft = 3,
    NftSell = 0x00010001,
}

impl ProtoType {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            1 => Some(ProtoType::Ft),
            2 => Some(ProtoType::Unique),
            3 => Some(ProtoType::Nft),
            0x00010001 => Some(ProtoType::NftSell),
            _ => None,
        }
    }

    pub fn to_u32(self) -> u32 {
        self as u32
    }
}

/// End of the payload region, if the script is long enough to carry a suffix.
fn payload_end(script: &[u8]) -> Option<usize> {
    script.len().checked_sub(DATA_SUFFIX_LEN)
}

fn field(script: &[u8], offset: usize, len: usize) -> Option<&[u8]> {
    let start = payload_end(script)?.checked_sub(offset)?;
    script.get(start..start + len)
}

/// Returns `len` bytes starting `offset` bytes before the end of the payload,
/// or `None` when the script carries no protocol flag or is too short to
/// hold them.
pub fn read_field(script: &[u8], offset: usize, len: usize) -> Option<&[u8]> {
    if !has_protocol_flag(script) {
        return None;
    }
    field(script, offset, len)
}

pub fn read_u32(script: &[u8], offset: usize) -> u32 {
    read_field(script, offset, 4).map(|bytes| u32::from_le_bytes(bytes.try_into().expect("slice of 4 bytes"))).unwrap_or_default()
}

pub fn read_u64(script: &[u8], offset: usize) -> u64 {
    read_field(script, offset, 8).map(|bytes| u64::from_le_bytes(bytes.try_into().expect("slice of 8 bytes"))).unwrap_or_default()
}

pub fn read_hash160(script: &[u8], offset: usize) -> Hash160 {
    read_field(script, offset, 20).and_then(Hash160::from_slice).unwrap_or_default()
}

/// Reads a zero padded UTF-8 string field.
pub fn read_string(script: &[u8], offset: usize, len: usize) -> String {
    read_field(script, offset, len)
        .map(|bytes| {
            let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
            String::from_utf8_lossy(&bytes[..end]).into_owned()
        })
        .unwrap_or_default()
}

pub fn read_outpoint(script: &[u8], offset: usize) -> TransactionOutpoint {
    read_field(script, offset, OUTPOINT_LEN).map(outpoint_from_bytes).unwrap_or_default()
}

pub fn has_protocol_flag(script: &[u8]) -> bool {
    field(script, FLAG_OFFSET, PROTO_FLAG_LEN) == Some(PROTO_FLAG.as_slice())
}

/// Protocol type of the script, zero when absent.
pub fn get_proto_type(script: &[u8]) -> u32 {
    read_u32(script, TYPE_OFFSET)
}

pub fn get_proto_version(script: &[u8]) -> u32 {
    read_u32(script, VERSION_OFFSET)
}

/// Length of the data part (payload push, length and version suffix), or
/// `None` when the script does not end with a well formed data part.
pub fn data_part_len(script: &[u8]) -> Option<usize> {
    let end = payload_end(script)?;
    if script[script.len() - 1] != DATA_PART_VERSION {
        return None;
    }
    let payload_len = u32::from_le_bytes(script[end..end + 4].try_into().ok()?) as usize;
    let prefix_len = ScriptBuilder::push_prefix_size(payload_len);
    let push_start = end.checked_sub(payload_len)?.checked_sub(prefix_len)?;
    let opcode = script[push_start];
    let valid_push = match prefix_len {
        1 => opcode as usize == payload_len,
        2 => opcode == OpPushData1,
        3 => opcode == OpPushData2,
        _ => opcode == OpPushData4,
    };
    valid_push.then_some(script.len() - push_start)
}

/// Immutable code part of a protocol script.
pub fn code_part(script: &[u8]) -> Option<&[u8]> {
    data_part_len(script).map(|len| &script[..script.len() - len])
}

/// Raw payload bytes of the data part.
pub fn payload(script: &[u8]) -> Option<&[u8]> {
    let len = data_part_len(script)?;
    let end = script.len() - DATA_SUFFIX_LEN;
    let payload_len = u32::from_le_bytes(script[end..end + 4].try_into().ok()?) as usize;
    debug_assert!(payload_len < len);
    Some(&script[end - payload_len..end])
}

/// Assembles a locking script from a code part and a payload.
pub fn build_script(code_part: &[u8], payload: &[u8]) -> Result<Vec<u8>> {
    let mut builder = ScriptBuilder::with_prefix(code_part);
    builder.add_data(payload)?.add_raw(&(payload.len() as u32).to_le_bytes())?.add_raw(&[DATA_PART_VERSION])?;
    Ok(builder.drain())
}

/// Replaces the data part of a script, leaving its code part untouched.
pub fn update_script(script: &[u8], payload: &[u8]) -> Result<Vec<u8>> {
    let code_part = code_part(script).ok_or(Error::NotProtocolScript)?;
    build_script(code_part, payload)
}

/// `hash160` of the code part, or of the whole script when it carries no data part.
pub fn query_codehash(script: &[u8]) -> Hash160 {
    hash160(code_part(script).unwrap_or(script))
}

pub fn query_script_hash(script: &[u8]) -> Hash160 {
    hash160(script)
}

pub fn outpoint_to_bytes(outpoint: &TransactionOutpoint) -> [u8; OUTPOINT_LEN] {
    let mut bytes = [0u8; OUTPOINT_LEN];
    bytes[..HASH_SIZE].copy_from_slice(outpoint.transaction_id.as_ref());
    bytes[HASH_SIZE..].copy_from_slice(&outpoint.index.to_le_bytes());
    bytes
}

/// Expects exactly `OUTPOINT_LEN` bytes.
pub fn outpoint_from_bytes(bytes: &[u8]) -> TransactionOutpoint {
    let mut txid = [0u8; HASH_SIZE];
    txid.copy_from_slice(&bytes[..HASH_SIZE]);
    let mut index = [0u8; 4];
    index.copy_from_slice(&bytes[HASH_SIZE..OUTPOINT_LEN]);
    TransactionOutpoint::new(Hash::from_bytes(txid), u32::from_le_bytes(index))
}

/// Writes `value` into a zero padded field of `len` bytes.
pub fn write_padded(payload: &mut Vec<u8>, field: &'static str, value: &[u8], len: usize) -> Result<()> {
    if value.len() > len {
        return Err(Error::FieldTooLong { field, len: value.len(), max: len });
    }
    payload.extend_from_slice(value);
    payload.resize(payload.len() + len - value.len(), 0);
    Ok(())
}

pub fn write_header(payload: &mut Vec<u8>, proto_version: u32, proto_type: u32) {
    payload.extend_from_slice(&proto_version.to_le_bytes());
    payload.extend_from_slice(&proto_type.to_le_bytes());
    payload.extend_from_slice(PROTO_FLAG);
}

/// Anchor of a token lineage: the outpoint of its first genesis contract.
///
/// The all-zero value is the placeholder carried by a genesis contract that
/// has not been confirmed in a transaction yet.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Debug, PartialOrd, Ord)]
pub struct SensibleId {
    pub txid: TransactionId,
    pub index: u32,
}

impl SensibleId {
    pub const ZERO: SensibleId = SensibleId { txid: Hash::ZERO, index: 0 };

    pub fn new(txid: TransactionId, index: u32) -> Self {
        Self { txid, index }
    }

    pub fn is_zero(&self) -> bool {
        self.txid.is_zero() && self.index == 0
    }

    pub fn to_bytes(&self) -> [u8; OUTPOINT_LEN] {
        outpoint_to_bytes(&self.outpoint())
    }

    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        (bytes.len() == OUTPOINT_LEN).then(|| outpoint_from_bytes(bytes).into())
    }

    pub fn outpoint(&self) -> TransactionOutpoint {
        TransactionOutpoint::new(self.txid, self.index)
    }
}

impl From<TransactionOutpoint> for SensibleId {
    fn from(outpoint: TransactionOutpoint) -> Self {
        Self { txid: outpoint.transaction_id, index: outpoint.index }
    }
}

impl Display for SensibleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&hex::encode(self.to_bytes()))
    }
}

impl FromStr for SensibleId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = hex::decode(s)?;
        Self::from_slice(&bytes).ok_or_else(|| Error::InvalidSensibleId(s.to_string()))
    }
}

impl Serialize for SensibleId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for SensibleId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        SensibleId::from_str(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sensible_txscript::opcodes::codes::{OpNop, OpReturn};

    fn sample_payload(len: usize) -> Vec<u8> {
        let mut payload = vec![0xab; len - HEADER_LEN];
        write_header(&mut payload, 1, ProtoType::Ft.to_u32());
        payload
    }

    #[test]
    fn test_framing() {
        struct Test {
            name: &'static str,
            payload_len: usize,
            prefix_len: usize,
        }

        let tests = vec![
            Test { name: "short push", payload_len: 40, prefix_len: 1 },
            Test { name: "push data 1", payload_len: 165, prefix_len: 2 },
            Test { name: "push data 2", payload_len: 300, prefix_len: 3 },
        ];

        let code = vec![OpNop, OpNop, OpReturn];
        for test in tests {
            let payload = sample_payload(test.payload_len);
            let script = build_script(&code, &payload).unwrap();
            assert_eq!(script.len(), code.len() + test.prefix_len + test.payload_len + DATA_SUFFIX_LEN, "{}", test.name);
            assert_eq!(data_part_len(&script), Some(test.prefix_len + test.payload_len + DATA_SUFFIX_LEN), "{}", test.name);
            assert_eq!(code_part(&script), Some(code.as_slice()), "{}", test.name);
            assert_eq!(super::payload(&script), Some(payload.as_slice()), "{}", test.name);
            assert!(has_protocol_flag(&script), "{}", test.name);
            assert_eq!(get_proto_type(&script), 1, "{}", test.name);
            assert_eq!(get_proto_version(&script), 1, "{}", test.name);
            assert_eq!(query_codehash(&script), hash160(&code), "{}", test.name);
        }
    }

    #[test]
    fn test_foreign_scripts() {
        let p2pkh = hex::decode("76a914751e76e8199196d454941c45d1b3a323f1433bd688ac").unwrap();
        for script in [vec![], vec![0x6a], p2pkh.clone()] {
            assert!(!has_protocol_flag(&script));
            assert_eq!(get_proto_type(&script), 0);
            assert_eq!(code_part(&script), None);
            assert_eq!(read_hash160(&script, 100), Hash160::ZERO);
            assert_eq!(read_string(&script, 100, 40), "");
            assert_eq!(update_script(&script, &[1, 2, 3]), Err(Error::NotProtocolScript));
        }
        assert_eq!(query_codehash(&p2pkh), hash160(&p2pkh));

        // protocol shaped scripts whose flag is missing or damaged
        let mut unflagged = vec![0xab; 200];
        unflagged[100..104].copy_from_slice(&1u32.to_le_bytes());
        let mut damaged = build_script(&[OpNop, OpReturn], &sample_payload(165)).unwrap();
        let flag_start = damaged.len() - DATA_SUFFIX_LEN - PROTO_FLAG_LEN;
        damaged[flag_start] ^= 0xff;
        for script in [p2pkh.repeat(10), unflagged, damaged] {
            assert!(!has_protocol_flag(&script));
            assert_eq!(get_proto_type(&script), 0);
            assert_eq!(get_proto_version(&script), 0);
            assert_eq!(read_field(&script, TYPE_OFFSET, 4), None);
            assert_eq!(read_u64(&script, 40), 0);
            assert_eq!(read_outpoint(&script, 60), TransactionOutpoint::default());
        }
    }

    #[test]
    fn test_update_preserves_code_part() {
        let code: Vec<u8> = (0..=255u8).chain([OpReturn]).collect();
        let script = build_script(&code, &sample_payload(148)).unwrap();
        let mut next_payload = sample_payload(148);
        next_payload[..8].copy_from_slice(&[1; 8]);
        let updated = update_script(&script, &next_payload).unwrap();
        assert_eq!(updated.len(), script.len());
        assert_eq!(&updated[..code.len()], code.as_slice());
        assert_eq!(payload(&updated), Some(next_payload.as_slice()));
    }

    #[test]
    fn test_sensible_id() {
        let id = SensibleId::new(Hash::from_bytes([0x11; 32]), 2);
        let s = id.to_string();
        assert_eq!(s.len(), 72);
        assert!(s.ends_with("02000000"));
        assert_eq!(s.parse::<SensibleId>().unwrap(), id);
        assert!(SensibleId::ZERO.is_zero());
        assert!(matches!("00".parse::<SensibleId>(), Err(Error::InvalidSensibleId(_))));
    }

    #[test]
    fn test_write_padded() {
        let mut payload = vec![];
        write_padded(&mut payload, "name", b"abc", 5).unwrap();
        assert_eq!(payload, b"abc\0\0");
        assert_eq!(write_padded(&mut payload, "name", b"abcdef", 5), Err(Error::FieldTooLong { field: "name", len: 6, max: 5 }));
    }
}
