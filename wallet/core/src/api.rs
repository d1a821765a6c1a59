//!
//! Interface of the external indexer the token operations read chain state
//! from and broadcast through.
//!

use crate::result::Result;
use async_trait::async_trait;
use sensible_addresses::Address;
use sensible_consensus_core::tx::{TransactionId, TransactionOutpoint};
use sensible_contracts::proto::SensibleId;
use sensible_hashes::Hash160;
use serde::{Deserialize, Serialize};

/// A plain P2PKH output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnspentOutput {
    pub txid: TransactionId,
    pub output_index: u32,
    pub satoshis: u64,
    pub address: Address,
}

impl UnspentOutput {
    pub fn outpoint(&self) -> TransactionOutpoint {
        TransactionOutpoint::new(self.txid, self.output_index)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FungibleTokenUnspent {
    pub txid: TransactionId,
    pub output_index: u32,
    pub satoshis: u64,
    pub token_address: Address,
    pub token_amount: u64,
}

impl FungibleTokenUnspent {
    pub fn outpoint(&self) -> TransactionOutpoint {
        TransactionOutpoint::new(self.txid, self.output_index)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NonFungibleTokenUnspent {
    pub txid: TransactionId,
    pub output_index: u32,
    pub satoshis: u64,
    pub nft_address: Address,
    pub token_index: u64,
    pub metaid_outpoint: TransactionOutpoint,
}

impl NonFungibleTokenUnspent {
    pub fn outpoint(&self) -> TransactionOutpoint {
        TransactionOutpoint::new(self.txid, self.output_index)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FungibleTokenBalance {
    pub balance: u128,
    pub utxo_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NonFungibleTokenSummary {
    pub codehash: Hash160,
    pub genesis: Hash160,
    pub sensible_id: SensibleId,
    pub count: u64,
}

/// Indexer client. Implementations perform the network requests; the token
/// operations never retry failed calls.
#[async_trait]
pub trait IndexerApi: Send + Sync {
    async fn get_unspents(&self, address: &Address) -> Result<Vec<UnspentOutput>>;

    /// Raw hex of a transaction.
    async fn get_raw_tx_data(&self, txid: &TransactionId) -> Result<String>;

    /// Broadcasts a raw transaction and returns its id.
    async fn broadcast(&self, raw_tx: &str) -> Result<TransactionId>;

    async fn get_fungible_token_unspents(&self, codehash: &Hash160, genesis: &Hash160, address: &Address) -> Result<Vec<FungibleTokenUnspent>>;

    async fn get_non_fungible_token_unspents(
        &self,
        codehash: &Hash160,
        genesis: &Hash160,
        address: &Address,
    ) -> Result<Vec<NonFungibleTokenUnspent>>;

    async fn get_fungible_token_balance(&self, codehash: &Hash160, genesis: &Hash160, address: &Address) -> Result<FungibleTokenBalance>;

    async fn get_non_fungible_token_summary(&self, address: &Address) -> Result<Vec<NonFungibleTokenSummary>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use sensible_hashes::Hash;

    #[test]
    fn test_indexer_json() {
        let txid = Hash::from_bytes([3; 32]);
        let json = format!(
            r#"{{"txid":"{txid}","outputIndex":2,"satoshis":546,"tokenAddress":"1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMH","tokenAmount":1000}}"#
        );
        let unspent: FungibleTokenUnspent = serde_json::from_str(&json).unwrap();
        assert_eq!(unspent.outpoint(), TransactionOutpoint::new(txid, 2));
        assert_eq!(unspent.token_address, Address::decode("1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMH").unwrap());
        assert_eq!(unspent.token_amount, 1000);

        let balance = FungibleTokenBalance { balance: 1500, utxo_count: 3 };
        let json = serde_json::to_value(&balance).unwrap();
        assert_eq!(json["utxoCount"], 3);
        assert_eq!(serde_json::from_value::<FungibleTokenBalance>(json).unwrap(), balance);
    }
}
