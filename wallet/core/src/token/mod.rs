//!
//! Token operations: the FT and NFT managers and the transaction plumbing
//! they share.
//!

pub mod ft;
pub mod nft;

pub use ft::*;
pub use nft::*;

use crate::{
    api::{IndexerApi, UnspentOutput},
    cache::RawTxCache,
    error::Error,
    result::Result,
    tx::{CONTRACT_UNLOCK_SLACK, TxComposer},
    utxo::{FEE_UTXO_LIMIT, SatotxInfo, Utxo, select_fee_utxos},
};
use log::{debug, info, trace, warn};
use sensible_addresses::{Address, Network};
use sensible_consensus_core::{
    hashing::sighash_type::SIG_HASH_ALL_FORK_ID,
    keys::PrivateKey,
    tx::{ScriptPublicKey, Transaction, TransactionId, TransactionOutpoint},
};
use sensible_contracts::{
    ContractFactory, ProtocolConfig,
    error::Error as ContractError,
    proof::{TxInputProof, TxOutputProof, input_proof, output_proof, transaction_digest},
    proto::SensibleId,
};
use sensible_hashes::{Hash, Hash160};
use sensible_txscript::pay_to_address_script;
use std::sync::Arc;

/// Value of each synthetic fee input used when estimating.
pub const ESTIMATE_INPUT_VALUE: u64 = 100_000_000_000_000;

/// Funding output of the check transaction a main transaction is sized
/// against. A single synthetic fee input covers it with room for fees.
const TEMPLATE_FUNDING: u64 = ESTIMATE_INPUT_VALUE / 2;

const DUMMY_SIG_LEN: usize = 72;
const DUMMY_PUB_KEY_LEN: usize = 33;

/// Options shared by every operation that pays fees.
#[derive(Debug, Clone, Default)]
pub struct FeeOptions {
    /// Fee UTXOs to spend. When absent the purse's UTXOs are listed from the indexer.
    pub utxos: Option<Vec<UnspentOutput>>,
    /// Receives the change. Defaults to the purse address.
    pub change_address: Option<Address>,
    /// Chunks of an `OP_FALSE OP_RETURN` output appended after the token outputs.
    pub op_return: Option<Vec<Vec<u8>>>,
    /// Build and sign without broadcasting.
    pub no_broadcast: bool,
}

/// A signed transaction produced by an operation.
#[derive(Debug, Clone)]
pub struct SignedTx {
    pub txid: TransactionId,
    pub tx: Transaction,
}

impl SignedTx {
    pub fn raw_hex(&self) -> String {
        self.tx.to_hex()
    }
}

impl From<TxComposer> for SignedTx {
    fn from(composer: TxComposer) -> Self {
        Self { txid: composer.txid(), tx: composer.into_transaction() }
    }
}

#[derive(Debug, Clone)]
pub struct GenesisResult {
    pub tx: SignedTx,
    /// Code hash of the tokens this genesis issues.
    pub codehash: Hash160,
    pub genesis: Hash160,
    pub sensible_id: SensibleId,
}

/// Result of the operations routed through a check contract: the
/// transaction creating the check contract, then the one spending it.
#[derive(Debug, Clone)]
pub struct CheckedTxResult {
    pub check_tx: SignedTx,
    pub tx: SignedTx,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    Sign,
    Estimate,
}

impl Mode {
    pub fn signer(self, key: &PrivateKey) -> Signer<'_> {
        match self {
            Mode::Sign => Signer::Key(key),
            Mode::Estimate => Signer::Estimate,
        }
    }
}

/// Produces signatures, or placeholders of maximal size when estimating.
#[derive(Clone, Copy)]
pub(crate) enum Signer<'k> {
    Key(&'k PrivateKey),
    Estimate,
}

impl Signer<'_> {
    pub fn public_key(&self) -> Vec<u8> {
        match self {
            Signer::Key(key) => key.public_key_bytes(),
            Signer::Estimate => vec![0; DUMMY_PUB_KEY_LEN],
        }
    }

    pub fn sign(&self, composer: &TxComposer, input_index: usize) -> Result<Vec<u8>> {
        match self {
            Signer::Key(key) => composer.get_tx_format_sig(key, input_index, SIG_HASH_ALL_FORK_ID),
            Signer::Estimate => Ok(vec![0; DUMMY_SIG_LEN]),
        }
    }

    /// Estimates leave P2PKH inputs unsigned; the composer budgets their size.
    pub fn unlock_p2pkh_inputs(&self, composer: &mut TxComposer) -> Result<()> {
        match self {
            Signer::Key(key) => composer.unlock_p2pkh_inputs(key),
            Signer::Estimate => Ok(()),
        }
    }
}

/// Maps contract errors caused by caller supplied values to [`Error::InvalidArgument`].
pub(crate) fn argument_error(err: ContractError) -> Error {
    match err {
        ContractError::FieldTooLong { .. } | ContractError::InvalidSensibleId(_) | ContractError::ReceiverMismatch(..) => {
            Error::InvalidArgument(err.to_string())
        }
        err => err.into(),
    }
}

/// State shared by the token managers.
pub(crate) struct TokenContext<'a> {
    pub config: &'a ProtocolConfig,
    pub api: Arc<dyn IndexerApi>,
    pub purse: PrivateKey,
}

impl<'a> TokenContext<'a> {
    pub fn new(config: &'a ProtocolConfig, api: Arc<dyn IndexerApi>, purse: PrivateKey) -> Self {
        Self { config, api, purse }
    }

    pub fn factory(&self) -> ContractFactory<'a> {
        ContractFactory::new(self.config)
    }

    pub fn network(&self) -> Network {
        self.config.network()
    }

    /// A composer dropping change below the configured dust floor.
    pub fn composer(&self) -> TxComposer {
        TxComposer::new().with_dust_floor(self.config.dust_floor())
    }

    pub fn cache(&self) -> RawTxCache<'_> {
        RawTxCache::new(self.api.as_ref())
    }

    pub fn purse_address(&self) -> Address {
        self.purse.address()
    }

    pub fn change_address(&self, options: &FeeOptions) -> Address {
        options.change_address.unwrap_or_else(|| self.purse_address())
    }

    /// Rejects caller supplied fee UTXOs an operation cannot spend at once.
    pub fn check_fee_options(&self, options: &FeeOptions, capped: bool) -> Result<()> {
        if let Some(utxos) = &options.utxos {
            if capped && utxos.len() > FEE_UTXO_LIMIT {
                return Err(Error::TooManyFeeUtxos { count: utxos.len(), max: FEE_UTXO_LIMIT });
            }
            if let Some(utxo) = utxos.iter().find(|utxo| utxo.address != self.purse_address()) {
                return Err(Error::InvalidArgument(format!("fee UTXO {} is not held by the purse", utxo.outpoint())));
            }
        }
        Ok(())
    }

    /// Fee UTXOs of an operation. `capped` operations spend at most
    /// [`FEE_UTXO_LIMIT`] of them.
    pub async fn fee_utxos(&self, options: &FeeOptions, capped: bool) -> Result<Vec<Utxo>> {
        let (unspents, supplied) = match &options.utxos {
            Some(utxos) => (utxos.clone(), true),
            None => (self.api.get_unspents(&self.purse_address()).await?, false),
        };
        let unspents = if capped { select_fee_utxos(unspents, supplied)? } else { unspents };
        trace!("Spending {} fee UTXOs", unspents.len());
        Ok(unspents.iter().map(Utxo::from).collect())
    }

    /// Stand-ins for `count` fee UTXOs of the purse.
    pub fn synthetic_fee_utxos(&self, count: usize) -> Vec<Utxo> {
        (0..count)
            .map(|i| Utxo::p2pkh(TransactionOutpoint::new(Hash::from_bytes([0xff; 32]), i as u32), self.purse_address(), ESTIMATE_INPUT_VALUE))
            .collect()
    }

    /// Appends the `OP_RETURN` output requested in `options` and returns its
    /// script, empty when none was requested.
    pub fn append_op_return(&self, composer: &mut TxComposer, options: &FeeOptions) -> Result<Vec<u8>> {
        let Some(chunks) = &options.op_return else {
            return Ok(vec![]);
        };
        let chunks: Vec<&[u8]> = chunks.iter().map(Vec::as_slice).collect();
        let index = composer.append_op_return_output(&chunks)?;
        Ok(composer.tx().outputs[index].script_public_key.script().to_vec())
    }

    /// Settles the change output against the size of the unlocking scripts.
    ///
    /// Round one unlocks the contract inputs against a provisional change.
    /// Round two recomputes the change from the measured sizes plus
    /// [`CONTRACT_UNLOCK_SLACK`] per contract input and unlocks again, so the
    /// final contract arguments commit to the final change.
    pub fn converge<F>(&self, composer: &mut TxComposer, change_address: &Address, contract_inputs: usize, mut unlock: F) -> Result<()>
    where
        F: FnMut(&mut TxComposer) -> Result<()>,
    {
        for round in 0..2 {
            composer.clear_change_output();
            let slack = if round == 0 { 0 } else { contract_inputs * CONTRACT_UNLOCK_SLACK };
            composer.append_change_output(change_address, self.config.feeb(), slack)?;
            unlock(composer)?;
            trace!("Round {} change {} size {}", round, composer.change_satoshis(), composer.tx().serialized_size());
        }
        Ok(())
    }

    /// Signs the purse inputs and, when signing for real, enforces the fee rate.
    pub fn finalize(&self, composer: &mut TxComposer, mode: Mode) -> Result<()> {
        mode.signer(&self.purse).unlock_p2pkh_inputs(composer)?;
        if mode == Mode::Sign {
            let actual = composer.get_fee_rate()?;
            let required = self.config.feeb();
            if actual < required {
                return Err(Error::FeeRateTooLow { actual, required });
            }
            debug!("Transaction {} size {} fee rate {:.3}", composer.txid(), composer.tx().serialized_size(), actual);
        }
        Ok(())
    }

    /// Satoshis the fee inputs of an estimated transaction must contribute.
    pub fn required_satoshis(&self, composer: &TxComposer, fee_utxos: &[Utxo]) -> u64 {
        let funded: u64 = fee_utxos.iter().map(|utxo| utxo.satoshis).sum();
        funded.saturating_sub(composer.change_satoshis())
    }

    /// The transaction creating a check contract: output 0 is the check
    /// contract, output 1 funds the transaction spending it.
    pub fn build_check_tx(
        &self,
        fee_utxos: &[Utxo],
        check_script: &ScriptPublicKey,
        funding: u64,
        change_address: &Address,
        mode: Mode,
    ) -> Result<TxComposer> {
        let mut composer = self.composer();
        for utxo in fee_utxos {
            composer.append_p2pkh_input(utxo);
        }
        composer.append_output(check_script.clone(), self.config.dust_threshold(check_script.script().len()))?;
        composer.append_output(pay_to_address_script(&self.purse_address()), funding)?;
        self.converge(&mut composer, change_address, 0, |_| Ok(()))?;
        self.finalize(&mut composer, mode)?;
        Ok(composer)
    }

    /// Builds a check transaction and the transaction spending it.
    ///
    /// `build_main` receives the check transaction, the funding output it
    /// creates, and the mode to sign in. A first pass against a check
    /// transaction of the same shape sizes the funding output.
    pub fn compose_checked<F>(
        &self,
        check_script: &ScriptPublicKey,
        fee_utxos: &[Utxo],
        change_address: &Address,
        mode: Mode,
        build_main: F,
    ) -> Result<(TxComposer, TxComposer)>
    where
        F: Fn(&Transaction, &Utxo, Mode) -> Result<TxComposer>,
    {
        let template = self.build_check_tx(&self.synthetic_fee_utxos(fee_utxos.len()), check_script, TEMPLATE_FUNDING, change_address, Mode::Estimate)?;
        let template_funding = funding_utxo(template.tx(), &self.purse_address())?;
        let estimate = build_main(template.tx(), &template_funding, Mode::Estimate)?;
        let dust_floor = self.config.dust_floor();
        let mut funding = self.required_satoshis(&estimate, std::slice::from_ref(&template_funding));
        // a main transaction without outputs of its own keeps its change output
        if estimate.output_count() == 1 {
            funding += dust_floor;
        }
        let funding = funding.max(dust_floor);
        debug!("Check transaction funds the main transaction with {} satoshis", funding);

        let check = self.build_check_tx(fee_utxos, check_script, funding, change_address, mode)?;
        let main = match mode {
            Mode::Estimate => estimate,
            Mode::Sign => build_main(check.tx(), &funding_utxo(check.tx(), &self.purse_address())?, Mode::Sign)?,
        };
        Ok((check, main))
    }

    pub async fn broadcast(&self, composer: TxComposer, no_broadcast: bool) -> Result<SignedTx> {
        let signed = SignedTx::from(composer);
        if !no_broadcast {
            let txid = self.api.broadcast(&signed.raw_hex()).await?;
            if txid != signed.txid {
                warn!("Indexer reported transaction id {} for {}", txid, signed.txid);
            }
            info!("Broadcast transaction {}", signed.txid);
        }
        Ok(signed)
    }

    /// Broadcasts the check transaction, then the main one. A failure of the
    /// second broadcast is reported with the id of the first.
    pub async fn broadcast_checked(&self, check: TxComposer, main: TxComposer, no_broadcast: bool) -> Result<CheckedTxResult> {
        let check_tx = self.broadcast(check, no_broadcast).await?;
        match self.broadcast(main, no_broadcast).await {
            Ok(tx) => Ok(CheckedTxResult { check_tx, tx }),
            Err(err) => {
                warn!("Check transaction {} broadcast, main transaction failed: {}", check_tx.txid, err);
                Err(Error::PartialBroadcast { check_txid: check_tx.txid, source: Box::new(err) })
            }
        }
    }
}

fn funding_utxo(check_tx: &Transaction, purse: &Address) -> Result<Utxo> {
    let output = check_tx.outputs.get(1).ok_or_else(|| Error::custom("check transaction has no funding output"))?;
    Ok(Utxo::p2pkh(TransactionOutpoint::new(check_tx.id(), 1), *purse, output.value))
}

/// Proof that a token output descends from a previous token state.
pub(crate) struct Backtrace {
    pub header: Vec<u8>,
    pub input_proof: TxInputProof,
    pub prev_output_proof: TxOutputProof,
}

impl Backtrace {
    pub fn new(info: &SatotxInfo) -> Result<Self> {
        Ok(Self {
            header: transaction_digest(&info.tx).header,
            input_proof: input_proof(&info.tx, info.prev_input_index as usize)?,
            prev_output_proof: output_proof(&info.prev_tx, info.prev_output_index as usize)?,
        })
    }
}

/// Locates the input of the transaction creating `outpoint` that spent the
/// previous state of the token.
pub(crate) async fn resolve_satotx_info(
    cache: &mut RawTxCache<'_>,
    outpoint: TransactionOutpoint,
    matcher: &impl Fn(&TransactionOutpoint, &[u8]) -> Option<(Hash160, u64)>,
) -> Result<SatotxInfo> {
    let tx = cache.get(&outpoint.transaction_id).await?;
    if tx.outputs.len() <= outpoint.index as usize {
        return Err(Error::InternalLineageError(format!("transaction {} has no output {}", outpoint.transaction_id, outpoint.index)));
    }
    cache.prefetch(tx.inputs.iter().map(|input| input.previous_outpoint.transaction_id)).await?;

    for (input_index, input) in tx.inputs.iter().enumerate() {
        let prev_outpoint = input.previous_outpoint;
        let prev_tx = cache.get(&prev_outpoint.transaction_id).await?;
        let Some(prev_output) = prev_tx.outputs.get(prev_outpoint.index as usize) else {
            continue;
        };
        if let Some((prev_token_address, prev_token_amount)) = matcher(&prev_outpoint, prev_output.script_public_key.script()) {
            return Ok(SatotxInfo {
                tx: tx.clone(),
                output_index: outpoint.index,
                prev_tx,
                prev_input_index: input_index as u32,
                prev_output_index: prev_outpoint.index,
                prev_token_address,
                prev_token_amount,
            });
        }
    }
    Err(Error::InternalLineageError(format!("no input of {} spends a previous state of the token", outpoint.transaction_id)))
}

/// Like [`resolve_satotx_info`] for a genesis output. The first genesis of
/// a lineage has no contract ancestor and is proven through input 0 of the
/// transaction creating it.
pub(crate) async fn resolve_genesis_satotx_info(
    cache: &mut RawTxCache<'_>,
    outpoint: TransactionOutpoint,
    sensible_id: &SensibleId,
    matcher: &impl Fn(&TransactionOutpoint, &[u8]) -> Option<(Hash160, u64)>,
) -> Result<SatotxInfo> {
    if outpoint != sensible_id.outpoint() {
        return resolve_satotx_info(cache, outpoint, matcher).await;
    }
    let tx = cache.get(&outpoint.transaction_id).await?;
    let input = tx.inputs.first().ok_or_else(|| Error::InternalLineageError(format!("genesis transaction {} has no inputs", outpoint.transaction_id)))?;
    let prev_outpoint = input.previous_outpoint;
    let prev_tx = cache.get(&prev_outpoint.transaction_id).await?;
    Ok(SatotxInfo {
        tx,
        output_index: outpoint.index,
        prev_tx,
        prev_input_index: 0,
        prev_output_index: prev_outpoint.index,
        prev_token_address: Hash160::ZERO,
        prev_token_amount: 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{Fixture, key};

    fn context(fixture: &Fixture) -> TokenContext<'_> {
        TokenContext::new(&fixture.config, fixture.api(), fixture.purse)
    }

    #[tokio::test]
    async fn test_finalize_enforces_fee_rate() {
        let fixture = Fixture::new();
        let ctx = context(&fixture);
        let fee_utxos = ctx.fee_utxos(&FeeOptions::default(), true).await.unwrap();
        let funds = fee_utxos[0].satoshis;

        // every satoshi of the input is paid out, leaving no fee
        let mut composer = ctx.composer();
        composer.append_p2pkh_input(&fee_utxos[0]);
        composer.append_output(pay_to_address_script(&key(2).address()), funds).unwrap();
        let result = ctx.finalize(&mut composer.clone(), Mode::Sign);
        assert!(matches!(result, Err(Error::FeeRateTooLow { actual, .. }) if actual == 0.0));
        ctx.finalize(&mut composer, Mode::Estimate).unwrap();

        let mut composer = ctx.composer();
        composer.append_p2pkh_input(&fee_utxos[0]);
        composer.append_output(pay_to_address_script(&key(2).address()), funds + 1).unwrap();
        assert!(matches!(ctx.finalize(&mut composer, Mode::Sign), Err(Error::NegativeUnspent { .. })));
    }

    #[tokio::test]
    async fn test_compose_checked() {
        let fixture = Fixture::new();
        let ctx = context(&fixture);
        let purse = ctx.purse_address();
        let check_script = pay_to_address_script(&key(5).address());
        let build_main = |_: &Transaction, funding: &Utxo, mode: Mode| -> Result<TxComposer> {
            let mut composer = ctx.composer();
            composer.append_p2pkh_input(funding);
            composer.append_output(pay_to_address_script(&key(6).address()), 5_000)?;
            ctx.converge(&mut composer, &purse, 0, |_| Ok(()))?;
            ctx.finalize(&mut composer, mode)?;
            Ok(composer)
        };

        // a single stand-in fee input covers the estimate
        let fee_utxos = ctx.synthetic_fee_utxos(1);
        let (check, main) = ctx.compose_checked(&check_script, &fee_utxos, &purse, Mode::Estimate, build_main).unwrap();
        assert!(ctx.required_satoshis(&check, &fee_utxos) > 5_000);
        assert_eq!(main.tx().outputs[0].value, 5_000);

        let fee_utxos = ctx.fee_utxos(&FeeOptions::default(), true).await.unwrap();
        let (check, main) = ctx.compose_checked(&check_script, &fee_utxos, &purse, Mode::Sign, build_main).unwrap();
        assert_eq!(check.tx().outputs[0].script_public_key, check_script);
        assert_eq!(main.tx().inputs[0].previous_outpoint, TransactionOutpoint::new(check.txid(), 1));
        assert_eq!(main.tx().outputs[0].value, 5_000);
        assert!(main.get_fee_rate().unwrap() >= fixture.config.feeb());
        assert!(check.get_fee_rate().unwrap() >= fixture.config.feeb());
    }

    #[tokio::test]
    async fn test_lineage_errors() {
        let fixture = Fixture::new();
        let params = FtGenesisParams { token_name: "TEST_FT".into(), token_symbol: "TEST".into(), decimal_num: 8, genesis_key: key(1) };
        let genesis = fixture.ft().genesis(params, FeeOptions::default()).await.unwrap();
        let never = |_: &TransactionOutpoint, _: &[u8]| -> Option<(Hash160, u64)> { None };

        struct Test {
            name: &'static str,
            outpoint: TransactionOutpoint,
        }
        let tests = [
            Test { name: "missing output", outpoint: TransactionOutpoint::new(genesis.tx.txid, 9) },
            Test { name: "no token ancestor", outpoint: TransactionOutpoint::new(genesis.tx.txid, 0) },
        ];
        for test in tests {
            let mut cache = RawTxCache::new(fixture.indexer.as_ref());
            let result = resolve_satotx_info(&mut cache, test.outpoint, &never).await;
            assert!(matches!(result, Err(Error::InternalLineageError(_))), "{}", test.name);
        }
    }
}
