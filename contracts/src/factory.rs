use crate::{
    adapter::{ContractAdapter, ContractKind, DataPart, FtCheckContract, FtContract, NftCheckContract, NftContract},
    check::{FtCheckDataPart, NftCheckDataPart},
    config::ProtocolConfig,
    error::{Error, Result},
    ft::FtDataPart,
    nft::NftDataPart,
    tier::Tier,
};
use sensible_consensus_core::tx::TransactionOutpoint;
use sensible_hashes::Hash160;

/// Builds contract instances from the templates of a [`ProtocolConfig`].
#[derive(Clone, Copy)]
pub struct ContractFactory<'a> {
    config: &'a ProtocolConfig,
}

impl<'a> ContractFactory<'a> {
    pub fn new(config: &'a ProtocolConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &'a ProtocolConfig {
        self.config
    }

    fn create<D: DataPart>(&self, kind: ContractKind, data_part: D) -> Result<ContractAdapter<D>> {
        ContractAdapter::new(kind, self.config.code_part(kind)?, data_part)
    }

    fn restore<D: DataPart>(&self, kind: ContractKind, script: &[u8]) -> Result<ContractAdapter<D>> {
        ContractAdapter::from_script(kind, self.config.code_part(kind)?, script)
    }

    /// A fresh FT genesis contract, not yet anchored to a sensible id.
    pub fn ft_genesis(&self, token_name: &str, token_symbol: &str, decimal_num: u8, issuer: Hash160) -> Result<FtContract> {
        let data_part = FtDataPart {
            token_name: token_name.to_owned(),
            token_symbol: token_symbol.to_owned(),
            decimal_num,
            token_address: issuer,
            ..Default::default()
        };
        self.create(ContractKind::FtGenesis, data_part)
    }

    pub fn ft_genesis_from_script(&self, script: &[u8]) -> Result<FtContract> {
        self.restore(ContractKind::FtGenesis, script)
    }

    /// A token contract issued by `genesis`, which must already carry its sensible id.
    pub fn ft_token(&self, genesis: &FtContract, receiver: Hash160, amount: u64) -> Result<FtContract> {
        if genesis.data_part().sensible_id.is_zero() {
            return Err(Error::InvalidSensibleId("genesis contract is not anchored".into()));
        }
        let data_part = FtDataPart {
            token_address: receiver,
            token_amount: amount,
            genesis_hash: genesis.genesis_script_hash()?,
            ..genesis.data_part().clone()
        };
        self.create(ContractKind::FtToken, data_part)
    }

    pub fn ft_token_from_script(&self, script: &[u8]) -> Result<FtContract> {
        self.restore(ContractKind::FtToken, script)
    }

    pub fn ft_transfer_check(&self, tier: Tier, data_part: FtCheckDataPart) -> Result<FtCheckContract> {
        self.ft_check(ContractKind::FtTransferCheck(tier), tier, data_part)
    }

    pub fn ft_unlock_check(&self, tier: Tier, data_part: FtCheckDataPart) -> Result<FtCheckContract> {
        self.ft_check(ContractKind::FtUnlockCheck(tier), tier, data_part)
    }

    fn ft_check(&self, kind: ContractKind, tier: Tier, data_part: FtCheckDataPart) -> Result<FtCheckContract> {
        if data_part.receivers.len() > tier.max_outputs {
            return Err(Error::UnsupportedTier { inputs: 0, outputs: data_part.receivers.len() });
        }
        self.create(kind, data_part)
    }

    /// A fresh NFT genesis contract allowing `total_supply` mints.
    pub fn nft_genesis(&self, total_supply: u64, issuer: Hash160) -> Result<NftContract> {
        let data_part = NftDataPart { nft_address: issuer, total_supply, ..Default::default() };
        self.create(ContractKind::NftGenesis, data_part)
    }

    pub fn nft_genesis_from_script(&self, script: &[u8]) -> Result<NftContract> {
        self.restore(ContractKind::NftGenesis, script)
    }

    /// The NFT `genesis` issues next. Its index is the current mint count of the genesis contract.
    pub fn nft_token(&self, genesis: &NftContract, receiver: Hash160, metaid_outpoint: TransactionOutpoint) -> Result<NftContract> {
        if genesis.data_part().sensible_id.is_zero() {
            return Err(Error::InvalidSensibleId("genesis contract is not anchored".into()));
        }
        let data_part = NftDataPart {
            metaid_outpoint,
            nft_address: receiver,
            genesis_hash: genesis.genesis_script_hash()?,
            ..genesis.data_part().clone()
        };
        self.create(ContractKind::NftToken, data_part)
    }

    pub fn nft_token_from_script(&self, script: &[u8]) -> Result<NftContract> {
        self.restore(ContractKind::NftToken, script)
    }

    pub fn nft_unlock_check(&self, data_part: NftCheckDataPart) -> Result<NftCheckContract> {
        self.create(ContractKind::NftUnlockCheck, data_part)
    }
}
