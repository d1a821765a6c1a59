use crate::{
    api::{FungibleTokenBalance, FungibleTokenUnspent, IndexerApi, NonFungibleTokenSummary, NonFungibleTokenUnspent, UnspentOutput},
    error::Error,
    result::Result,
};
use async_trait::async_trait;
use itertools::Itertools;
use parking_lot::Mutex;
use sensible_addresses::{Address, Network};
use sensible_consensus_core::{
    constants::{MAX_TX_IN_SEQUENCE_NUM, TX_VERSION},
    sign::verify_input,
    tx::{Transaction, TransactionId, TransactionInput, TransactionOutpoint, TransactionOutput},
};
use sensible_contracts::{
    adapter::DataPart,
    ft::{FT_PAYLOAD_LEN, FtDataPart},
    nft::{NFT_PAYLOAD_LEN, NftDataPart},
    proto::{self, ProtoType},
};
use sensible_hashes::{Hash, Hash160, hash160};
use sensible_txscript::{extract_script_pub_key_address, is_pay_to_pub_key_hash, pay_to_address_script};
use std::collections::{BTreeMap, HashMap};

#[derive(Default)]
struct State {
    transactions: HashMap<TransactionId, Transaction>,
    /// Unspent outputs with their insertion order.
    utxos: HashMap<TransactionOutpoint, (u64, TransactionOutput)>,
    sequence: u64,
    broadcasts: Vec<TransactionId>,
    failing_broadcast: Option<usize>,
    raw_tx_requests: usize,
}

impl State {
    fn insert(&mut self, tx: Transaction) -> TransactionId {
        let txid = tx.id();
        for input in &tx.inputs {
            self.utxos.remove(&input.previous_outpoint);
        }
        for (index, output) in tx.outputs.iter().enumerate() {
            self.sequence += 1;
            self.utxos.insert(TransactionOutpoint::new(txid, index as u32), (self.sequence, output.clone()));
        }
        self.transactions.insert(txid, tx);
        txid
    }

    fn validate(&self, tx: &Transaction) -> Result<()> {
        if self.transactions.contains_key(&tx.id()) {
            return Err(Error::Indexer(format!("transaction {} already known", tx.id())));
        }
        let mut input_value = 0;
        for (index, input) in tx.inputs.iter().enumerate() {
            let (_, prev) = self
                .utxos
                .get(&input.previous_outpoint)
                .ok_or_else(|| Error::Indexer(format!("input {} spends missing or spent output {}", index, input.previous_outpoint)))?;
            input_value += prev.value;
            if is_pay_to_pub_key_hash(prev.script_public_key.script()) {
                verify_p2pkh(tx, index, prev)?;
            }
        }
        if input_value < tx.total_output_value() {
            return Err(Error::Indexer(format!("outputs of {} exceed its inputs", tx.id())));
        }
        Ok(())
    }

    fn unspents(&self) -> impl Iterator<Item = (TransactionOutpoint, &TransactionOutput)> {
        self.utxos.iter().sorted_by_key(|(_, (sequence, _))| *sequence).map(|(outpoint, (_, output))| (*outpoint, output))
    }

    fn ft_outputs(&self) -> impl Iterator<Item = (TransactionOutpoint, &TransactionOutput, Hash160, Hash160, FtDataPart)> {
        self.unspents().filter_map(|(outpoint, output)| {
            let script = output.script_public_key.script();
            if !is_protocol_output(script, ProtoType::Ft, FT_PAYLOAD_LEN) {
                return None;
            }
            let mut data = FtDataPart::decode(script);
            if data.sensible_id.is_zero() {
                data.sensible_id = outpoint.into();
            }
            Some((outpoint, output, proto::query_codehash(script), data.genesis_id().ok()?, data))
        })
    }

    fn nft_outputs(&self) -> impl Iterator<Item = (TransactionOutpoint, &TransactionOutput, Hash160, Hash160, NftDataPart)> {
        self.unspents().filter_map(|(outpoint, output)| {
            let script = output.script_public_key.script();
            if !is_protocol_output(script, ProtoType::Nft, NFT_PAYLOAD_LEN) {
                return None;
            }
            let mut data = NftDataPart::decode(script);
            if data.sensible_id.is_zero() {
                data.sensible_id = outpoint.into();
            }
            Some((outpoint, output, proto::query_codehash(script), data.genesis_id().ok()?, data))
        })
    }
}

fn is_protocol_output(script: &[u8], proto_type: ProtoType, payload_len: usize) -> bool {
    proto::has_protocol_flag(script)
        && proto::get_proto_type(script) == proto_type.to_u32()
        && proto::payload(script).is_some_and(|payload| payload.len() == payload_len)
}

fn split_push(script: &[u8]) -> Option<(&[u8], &[u8])> {
    let (&len, rest) = script.split_first()?;
    (len <= 75 && len as usize <= rest.len()).then(|| rest.split_at(len as usize))
}

fn verify_p2pkh(tx: &Transaction, index: usize, prev: &TransactionOutput) -> Result<()> {
    let invalid = |reason: &str| Error::Indexer(format!("input {} of {}: {}", index, tx.id(), reason));
    let script = &tx.inputs[index].signature_script;
    let (signature, rest) = split_push(script).ok_or_else(|| invalid("missing signature"))?;
    let (public_key, rest) = split_push(rest).ok_or_else(|| invalid("missing public key"))?;
    if !rest.is_empty() {
        return Err(invalid("trailing data"));
    }
    let lock = prev.script_public_key.script();
    if hash160(public_key).as_bytes()[..] != lock[3..23] {
        return Err(invalid("public key does not match the locking script"));
    }
    let public_key = secp256k1::PublicKey::from_slice(public_key).map_err(|err| invalid(&err.to_string()))?;
    verify_input(tx, index, lock, prev.value, signature, &public_key).map_err(|err| invalid(&err.to_string()))
}

/// In-memory indexer: a UTXO set fed by broadcasts, with the protocol
/// outputs indexed by code hash, genesis and owner.
pub struct IndexerMock {
    network: Network,
    state: Mutex<State>,
}

impl IndexerMock {
    pub fn new(network: Network) -> Self {
        Self { network, state: Mutex::new(State::default()) }
    }

    /// Credits `address` with a new output created out of thin air.
    pub fn fund(&self, address: &Address, satoshis: u64) -> UnspentOutput {
        let mut state = self.state.lock();
        let mut source = [0xee; 32];
        source[..8].copy_from_slice(&state.sequence.to_le_bytes());
        let input = TransactionInput::new(TransactionOutpoint::new(Hash::from_bytes(source), 0), vec![], MAX_TX_IN_SEQUENCE_NUM);
        let output = TransactionOutput::new(satoshis, pay_to_address_script(address));
        let txid = state.insert(Transaction::new(TX_VERSION, vec![input], vec![output], 0));
        UnspentOutput { txid, output_index: 0, satoshis, address: *address }
    }

    /// Makes the `nth` broadcast from now fail, counting from zero.
    pub fn fail_broadcast(&self, nth: usize) {
        let mut state = self.state.lock();
        state.failing_broadcast = Some(state.broadcasts.len() + nth);
    }

    pub fn broadcasts(&self) -> Vec<TransactionId> {
        self.state.lock().broadcasts.clone()
    }

    /// Number of raw transactions served so far.
    pub fn raw_tx_requests(&self) -> usize {
        self.state.lock().raw_tx_requests
    }

    pub fn transaction(&self, txid: &TransactionId) -> Option<Transaction> {
        self.state.lock().transactions.get(txid).cloned()
    }

    pub fn is_unspent(&self, outpoint: &TransactionOutpoint) -> bool {
        self.state.lock().utxos.contains_key(outpoint)
    }

    /// Fee paid per byte by a known transaction.
    pub fn fee_rate(&self, txid: &TransactionId) -> f64 {
        let state = self.state.lock();
        let tx = &state.transactions[txid];
        let input_value: u64 = tx
            .inputs
            .iter()
            .map(|input| state.transactions[&input.previous_outpoint.transaction_id].outputs[input.previous_outpoint.index as usize].value)
            .sum();
        (input_value - tx.total_output_value()) as f64 / tx.serialized_size() as f64
    }
}

#[async_trait]
impl IndexerApi for IndexerMock {
    async fn get_unspents(&self, address: &Address) -> Result<Vec<UnspentOutput>> {
        let state = self.state.lock();
        Ok(state
            .unspents()
            .filter(|(_, output)| extract_script_pub_key_address(&output.script_public_key, self.network).is_ok_and(|owner| owner == *address))
            .map(|(outpoint, output)| UnspentOutput {
                txid: outpoint.transaction_id,
                output_index: outpoint.index,
                satoshis: output.value,
                address: *address,
            })
            .collect())
    }

    async fn get_raw_tx_data(&self, txid: &TransactionId) -> Result<String> {
        let mut state = self.state.lock();
        state.raw_tx_requests += 1;
        state.transactions.get(txid).map(Transaction::to_hex).ok_or_else(|| Error::Indexer(format!("unknown transaction {txid}")))
    }

    async fn broadcast(&self, raw_tx: &str) -> Result<TransactionId> {
        let tx = Transaction::from_hex(raw_tx)?;
        let mut state = self.state.lock();
        if state.failing_broadcast == Some(state.broadcasts.len()) {
            state.failing_broadcast = None;
            return Err(Error::Indexer("broadcast rejected".into()));
        }
        state.validate(&tx)?;
        let txid = state.insert(tx);
        state.broadcasts.push(txid);
        Ok(txid)
    }

    async fn get_fungible_token_unspents(&self, codehash: &Hash160, genesis: &Hash160, address: &Address) -> Result<Vec<FungibleTokenUnspent>> {
        let state = self.state.lock();
        Ok(state
            .ft_outputs()
            .filter(|(_, _, code, id, data)| code == codehash && id == genesis && data.token_address == address.hash)
            .map(|(outpoint, output, _, _, data)| FungibleTokenUnspent {
                txid: outpoint.transaction_id,
                output_index: outpoint.index,
                satoshis: output.value,
                token_address: *address,
                token_amount: data.token_amount,
            })
            .collect())
    }

    async fn get_non_fungible_token_unspents(
        &self,
        codehash: &Hash160,
        genesis: &Hash160,
        address: &Address,
    ) -> Result<Vec<NonFungibleTokenUnspent>> {
        let state = self.state.lock();
        Ok(state
            .nft_outputs()
            .filter(|(_, _, code, id, data)| code == codehash && id == genesis && data.nft_address == address.hash)
            .map(|(outpoint, output, _, _, data)| NonFungibleTokenUnspent {
                txid: outpoint.transaction_id,
                output_index: outpoint.index,
                satoshis: output.value,
                nft_address: *address,
                token_index: data.token_index,
                metaid_outpoint: data.metaid_outpoint,
            })
            .collect())
    }

    async fn get_fungible_token_balance(&self, codehash: &Hash160, genesis: &Hash160, address: &Address) -> Result<FungibleTokenBalance> {
        let unspents = self.get_fungible_token_unspents(codehash, genesis, address).await?;
        Ok(FungibleTokenBalance { balance: unspents.iter().map(|utxo| utxo.token_amount as u128).sum(), utxo_count: unspents.len() })
    }

    async fn get_non_fungible_token_summary(&self, address: &Address) -> Result<Vec<NonFungibleTokenSummary>> {
        let state = self.state.lock();
        let mut counts = BTreeMap::new();
        for (_, _, codehash, genesis, data) in state.nft_outputs() {
            if data.nft_address == address.hash && !data.genesis_hash.is_zero() {
                *counts.entry((codehash, genesis, data.sensible_id)).or_insert(0u64) += 1;
            }
        }
        Ok(counts
            .into_iter()
            .map(|((codehash, genesis, sensible_id), count)| NonFungibleTokenSummary { codehash, genesis, sensible_id, count })
            .collect())
    }
}
