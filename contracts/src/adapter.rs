use crate::{
    check::{FtCheckDataPart, NftCheckDataPart},
    error::{Error, Result},
    ft::FtDataPart,
    nft::NftDataPart,
    proto,
    tier::Tier,
};
use sensible_consensus_core::tx::ScriptPublicKey;
use sensible_hashes::{Hash160, hash160};
use std::{fmt::Debug, fmt::Display, sync::Arc};

/// Every contract template the protocol knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ContractKind {
    FtGenesis,
    FtToken,
    FtTransferCheck(Tier),
    FtUnlockCheck(Tier),
    NftGenesis,
    NftToken,
    NftUnlockCheck,
}

impl Display for ContractKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContractKind::FtGenesis => f.write_str("ft_genesis"),
            ContractKind::FtToken => f.write_str("ft_token"),
            ContractKind::FtTransferCheck(tier) => write!(f, "ft_transfer_check {tier}"),
            ContractKind::FtUnlockCheck(tier) => write!(f, "ft_unlock_check {tier}"),
            ContractKind::NftGenesis => f.write_str("nft_genesis"),
            ContractKind::NftToken => f.write_str("nft_token"),
            ContractKind::NftUnlockCheck => f.write_str("nft_unlock_check"),
        }
    }
}

/// Codec of a contract's data part.
pub trait DataPart: Clone + Debug + Default + PartialEq {
    /// Encodes the payload carried by the data part.
    fn encode(&self) -> Result<Vec<u8>>;

    /// Decodes a full locking script. Missing fields decode to their zero value.
    fn decode(script: &[u8]) -> Self;

    /// Overwrites the fields owned by the protocol itself.
    fn force_protocol_fields(&mut self, kind: ContractKind);
}

/// A contract instance: a shared immutable code part plus a data part.
///
/// Cloning copies the data part and shares the code part. Every mutation
/// goes through [`ContractAdapter::set_formated_data_part`] which re-encodes
/// the whole locking script.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractAdapter<D: DataPart> {
    kind: ContractKind,
    code_part: Arc<[u8]>,
    data_part: D,
    locking_script: Vec<u8>,
}

pub type FtContract = ContractAdapter<FtDataPart>;
pub type NftContract = ContractAdapter<NftDataPart>;
pub type FtCheckContract = ContractAdapter<FtCheckDataPart>;
pub type NftCheckContract = ContractAdapter<NftCheckDataPart>;

impl<D: DataPart> ContractAdapter<D> {
    pub fn new(kind: ContractKind, code_part: Arc<[u8]>, mut data_part: D) -> Result<Self> {
        data_part.force_protocol_fields(kind);
        let locking_script = proto::build_script(&code_part, &data_part.encode()?)?;
        Ok(Self { kind, code_part, data_part, locking_script })
    }

    /// Restores a contract from a locking script produced by the template `code_part`.
    pub fn from_script(kind: ContractKind, code_part: Arc<[u8]>, script: &[u8]) -> Result<Self> {
        if proto::code_part(script) != Some(&code_part[..]) {
            return Err(Error::NotProtocolScript);
        }
        let data_part = D::decode(script);
        Ok(Self { kind, code_part, data_part, locking_script: script.to_vec() })
    }

    /// Applies `update` to a copy of the data part and rebuilds the locking
    /// script. Fields left untouched keep their value; protocol owned fields
    /// are reset. On error the contract is left unchanged.
    pub fn set_formated_data_part(&mut self, update: impl FnOnce(&mut D)) -> Result<()> {
        let mut data_part = self.data_part.clone();
        update(&mut data_part);
        data_part.force_protocol_fields(self.kind);
        self.locking_script = proto::update_script(&self.locking_script, &data_part.encode()?)?;
        self.data_part = data_part;
        Ok(())
    }

    /// Returns a new contract with `update` applied, leaving `self` untouched.
    pub fn with_data_part(&self, update: impl FnOnce(&mut D)) -> Result<Self> {
        let mut next = self.clone();
        next.set_formated_data_part(update)?;
        Ok(next)
    }

    pub fn kind(&self) -> ContractKind {
        self.kind
    }

    pub fn data_part(&self) -> &D {
        &self.data_part
    }

    pub fn code_part(&self) -> &[u8] {
        &self.code_part
    }

    pub fn locking_script(&self) -> &[u8] {
        &self.locking_script
    }

    pub fn script_public_key(&self) -> ScriptPublicKey {
        ScriptPublicKey::from_slice(&self.locking_script)
    }

    pub fn code_hash(&self) -> Hash160 {
        hash160(&self.code_part)
    }

    pub fn script_hash(&self) -> Hash160 {
        hash160(&self.locking_script)
    }
}

impl FtContract {
    pub fn genesis_id(&self) -> Result<Hash160> {
        self.data_part.genesis_id()
    }

    /// Hash of the genesis script with its per-instance fields zeroed. Tokens
    /// issued by this genesis contract store it as their genesis hash.
    pub fn genesis_script_hash(&self) -> Result<Hash160> {
        Ok(hash160(&proto::build_script(&self.code_part, &self.data_part.normalized_payload()?)?))
    }
}

impl NftContract {
    pub fn genesis_id(&self) -> Result<Hash160> {
        self.data_part.genesis_id()
    }

    /// Hash of the genesis script with its per-instance fields zeroed. Tokens
    /// issued by this genesis contract store it as their genesis hash.
    pub fn genesis_script_hash(&self) -> Result<Hash160> {
        Ok(hash160(&proto::build_script(&self.code_part, &self.data_part.normalized_payload()?)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ft::FT_PROTO_VERSION, proto::ProtoType};
    use sensible_txscript::opcodes::codes::{OpNop, OpReturn};

    fn genesis() -> FtContract {
        let data_part = FtDataPart {
            token_name: "TEST_FT".into(),
            token_symbol: "TEST".into(),
            decimal_num: 18,
            token_address: Hash160::from_bytes([1; 20]),
            token_amount: 99,
            genesis_hash: Hash160::from_bytes([2; 20]),
            ..Default::default()
        };
        ContractAdapter::new(ContractKind::FtGenesis, Arc::from(vec![OpNop, OpReturn]), data_part).unwrap()
    }

    #[test]
    fn test_protocol_fields_are_forced() {
        let contract = genesis();
        let data_part = contract.data_part();
        assert_eq!(data_part.proto_version, FT_PROTO_VERSION);
        assert_eq!(data_part.proto_type, ProtoType::Ft.to_u32());
        assert_eq!(data_part.genesis_hash, Hash160::ZERO);
        assert_eq!(data_part.token_amount, 0);
        assert_eq!(FtDataPart::decode(contract.locking_script()), *data_part);

        let mut contract = contract;
        contract.set_formated_data_part(|d| d.proto_type = 7).unwrap();
        assert_eq!(contract.data_part().proto_type, ProtoType::Ft.to_u32());
    }

    #[test]
    fn test_partial_update_and_clone() {
        let contract = genesis();
        let next = contract.with_data_part(|d| d.token_symbol = "NEXT".into()).unwrap();
        assert_eq!(next.data_part().token_name, "TEST_FT");
        assert_eq!(next.data_part().token_symbol, "NEXT");
        assert_eq!(contract.data_part().token_symbol, "TEST");
        assert_eq!(next.code_hash(), contract.code_hash());
        assert_ne!(next.script_hash(), contract.script_hash());
        assert_eq!(&next.locking_script()[..2], contract.code_part());
    }

    #[test]
    fn test_failed_update_leaves_contract_unchanged() {
        let mut contract = genesis();
        let before = contract.clone();
        assert!(contract.set_formated_data_part(|d| d.token_name = "x".repeat(41)).is_err());
        assert_eq!(contract, before);
    }

    #[test]
    fn test_from_script() {
        let contract = genesis();
        let restored = FtContract::from_script(ContractKind::FtGenesis, Arc::from(vec![OpNop, OpReturn]), contract.locking_script()).unwrap();
        assert_eq!(restored, contract);
        assert_eq!(
            FtContract::from_script(ContractKind::FtGenesis, Arc::from(vec![OpReturn]), contract.locking_script()),
            Err(Error::NotProtocolScript)
        );
    }
}
