//!
//! Request scoped cache of ancestor transactions.
//!

use crate::{api::IndexerApi, error::Error, result::Result};
use futures::future::try_join_all;
use itertools::Itertools;
use log::trace;
use sensible_consensus_core::tx::{Transaction, TransactionId};
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

/// Transactions fetched during one operation, keyed by id. Created per
/// operation and dropped with it, so nothing leaks between operations.
pub struct RawTxCache<'a> {
    api: &'a dyn IndexerApi,
    transactions: HashMap<TransactionId, Arc<Transaction>>,
}

impl<'a> RawTxCache<'a> {
    pub fn new(api: &'a dyn IndexerApi) -> Self {
        Self { api, transactions: HashMap::new() }
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn contains(&self, txid: &TransactionId) -> bool {
        self.transactions.contains_key(txid)
    }

    /// Registers a transaction built locally.
    pub fn insert(&mut self, tx: Transaction) -> Arc<Transaction> {
        let tx = Arc::new(tx);
        self.transactions.insert(tx.id(), tx.clone());
        tx
    }

    pub async fn get(&mut self, txid: &TransactionId) -> Result<Arc<Transaction>> {
        if let Some(tx) = self.transactions.get(txid) {
            return Ok(tx.clone());
        }
        let tx = Arc::new(fetch(self.api, *txid).await?);
        self.transactions.insert(*txid, tx.clone());
        Ok(tx)
    }

    /// Fetches every missing transaction concurrently.
    pub async fn prefetch<I>(&mut self, txids: I) -> Result<()>
    where
        I: IntoIterator<Item = TransactionId>,
    {
        let mut seen = HashSet::new();
        let missing = txids.into_iter().filter(|txid| !self.transactions.contains_key(txid) && seen.insert(*txid)).collect_vec();
        if missing.is_empty() {
            return Ok(());
        }
        trace!("Prefetching {} transactions", missing.len());
        let fetched = try_join_all(missing.into_iter().map(|txid| fetch(self.api, txid))).await?;
        for tx in fetched {
            self.transactions.insert(tx.id(), Arc::new(tx));
        }
        Ok(())
    }
}

async fn fetch(api: &dyn IndexerApi, txid: TransactionId) -> Result<Transaction> {
    let raw = api.get_raw_tx_data(&txid).await?;
    let tx = Transaction::from_hex(&raw)?;
    if tx.id() != txid {
        return Err(Error::Indexer(format!("indexer returned transaction {} for {}", tx.id(), txid)));
    }
    Ok(tx)
}
