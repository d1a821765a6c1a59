//!
//! Utilities and helpers for unit and integration testing.
//!

mod indexer_mock;
pub use indexer_mock::*;

mod nft;

use crate::{
    api::IndexerApi,
    token::{FtManager, NftManager, SignedTx},
};
use sensible_addresses::{Address, Network};
use sensible_consensus_core::keys::PrivateKey;
use sensible_contracts::{
    config::{ContractTemplates, ProtocolConfig, ProtocolSettings, TierTemplate},
    tier::TIERS,
};
use sensible_txscript::opcodes::codes::OpReturn;
use std::sync::Arc;

pub const PURSE_FUNDS: u64 = 100_000_000;

pub fn init_logger() {
    let _ = sensible_core::log::try_init_logger(None, "info");
}

/// Testnet settings with distinct dummy code parts for every contract template.
pub fn test_settings() -> ProtocolSettings {
    let code = |tag: u8| vec![0x01, tag, 0x75, OpReturn];
    let tiered = |tag: u8| {
        TIERS.iter().enumerate().map(|(i, t)| TierTemplate { max_inputs: t.max_inputs, max_outputs: t.max_outputs, code: code(tag + i as u8) }).collect()
    };
    let templates = ContractTemplates {
        ft_genesis: code(1),
        ft_token: code(2),
        ft_transfer_check: tiered(10),
        ft_unlock_check: tiered(20),
        nft_genesis: code(3),
        nft_token: code(4),
        nft_unlock_check: code(5),
    };
    ProtocolSettings { network: Network::Testnet, templates, ..Default::default() }
}

pub fn test_config() -> ProtocolConfig {
    ProtocolConfig::new(test_settings()).unwrap()
}

pub fn key(seed: u8) -> PrivateKey {
    PrivateKey::from_bytes(&[seed; 32], Network::Testnet).unwrap()
}

/// A mock indexer and a funded purse.
pub struct Fixture {
    pub config: ProtocolConfig,
    pub indexer: Arc<IndexerMock>,
    pub purse: PrivateKey,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: ProtocolConfig) -> Self {
        init_logger();
        let indexer = Arc::new(IndexerMock::new(Network::Testnet));
        let purse = key(1);
        indexer.fund(&purse.address(), PURSE_FUNDS);
        Self { config, indexer, purse }
    }

    pub fn api(&self) -> Arc<dyn IndexerApi> {
        self.indexer.clone()
    }

    pub fn ft(&self) -> FtManager<'_> {
        FtManager::new(&self.config, self.api(), self.purse)
    }

    pub fn nft(&self) -> NftManager<'_> {
        NftManager::new(&self.config, self.api(), self.purse)
    }

    pub fn purse_address(&self) -> Address {
        self.purse.address()
    }

    pub fn assert_fee_rate(&self, tx: &SignedTx) {
        let fee_rate = self.indexer.fee_rate(&tx.txid);
        assert!(fee_rate >= self.config.feeb(), "transaction {} pays {} per byte", tx.txid, fee_rate);
    }
}
