use super::{
    Backtrace, CheckedTxResult, FeeOptions, GenesisResult, Mode, SignedTx, TokenContext, argument_error, resolve_genesis_satotx_info,
    resolve_satotx_info,
};
use crate::{
    api::{FungibleTokenBalance, FungibleTokenUnspent, IndexerApi},
    cache::RawTxCache,
    error::Error,
    result::Result,
    tx::TxComposer,
    utxo::{FtUtxo, SatotxInfo, Utxo, select_ft_utxos},
};
use log::{debug, info};
use sensible_addresses::Address;
use sensible_consensus_core::{
    hashing::sighash_type::SIG_HASH_ALL_FORK_ID,
    keys::PrivateKey,
    tx::{Transaction, TransactionId, TransactionOutpoint},
};
use sensible_contracts::{
    ContractKind, ProtocolConfig,
    adapter::{DataPart, FtCheckContract, FtContract},
    calls::{ContractCall, FtGenesisUnlock, FtTokenUnlock, FtTransferCheckUnlock, FtUnlockCheckUnlock, TokenInputArrays, TokenOperation, other_outputs_array},
    check::{FtCheckDataPart, Receiver},
    ft::{self, FtDataPart},
    proof::{input_proof, output_proof, transaction_digest},
    proto::SensibleId,
    tier::{TIERS, select_tier},
};
use sensible_hashes::Hash160;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct FtGenesisParams {
    pub token_name: String,
    pub token_symbol: String,
    pub decimal_num: u8,
    /// Issuer of the token; the only key allowed to mint.
    pub genesis_key: PrivateKey,
}

#[derive(Debug, Clone)]
pub struct FtMintParams {
    pub sensible_id: SensibleId,
    pub genesis_key: PrivateKey,
    pub receiver: Address,
    pub token_amount: u64,
    /// When false the genesis contract is spent without successor and the
    /// supply becomes fixed.
    pub allow_increase_mints: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenReceiver {
    pub address: Address,
    pub amount: u64,
}

impl TokenReceiver {
    pub fn new(address: Address, amount: u64) -> Self {
        Self { address, amount }
    }
}

#[derive(Debug, Clone)]
pub struct FtTransferParams {
    pub codehash: Hash160,
    pub genesis: Hash160,
    pub sender_key: PrivateKey,
    pub receivers: Vec<TokenReceiver>,
    /// Token UTXOs to spend. When absent they are listed from the indexer.
    pub ft_utxos: Option<Vec<FungibleTokenUnspent>>,
}

#[derive(Debug, Clone)]
pub struct FtMergeParams {
    pub codehash: Hash160,
    pub genesis: Hash160,
    pub owner_key: PrivateKey,
    pub ft_utxos: Option<Vec<FungibleTokenUnspent>>,
}

#[derive(Debug, Clone)]
pub struct FtBurnParams {
    pub codehash: Hash160,
    pub genesis: Hash160,
    /// Token UTXOs held by the burn address. When absent they are listed from the indexer.
    pub ft_utxos: Option<Vec<FungibleTokenUnspent>>,
}

#[derive(Debug, Clone)]
pub struct FtMintResult {
    pub tx: SignedTx,
    pub token_output_index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenesisInfo {
    pub codehash: Hash160,
    pub genesis: Hash160,
    pub sensible_id: SensibleId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Transfer,
    Burn,
}

/// Token inputs and outputs of a transaction spent through a check contract.
struct RoutePlan {
    route: Route,
    ft_utxos: Vec<FtUtxo>,
    receivers: Vec<Receiver>,
    check: FtCheckContract,
}

/// The current genesis UTXO of a token, anchored to its sensible id.
struct GenesisUtxo {
    utxo: Utxo,
    contract: FtContract,
    satotx_info: SatotxInfo,
}

/// Fungible token operations.
pub struct FtManager<'a> {
    ctx: TokenContext<'a>,
}

impl<'a> FtManager<'a> {
    /// `purse` pays every fee and receives the change by default.
    pub fn new(config: &'a ProtocolConfig, api: Arc<dyn IndexerApi>, purse: PrivateKey) -> Self {
        Self { ctx: TokenContext::new(config, api, purse) }
    }

    pub async fn genesis(&self, params: FtGenesisParams, options: FeeOptions) -> Result<GenesisResult> {
        self.ctx.check_fee_options(&options, false)?;
        let contract = self.genesis_contract(&params)?;
        let fee_utxos = self.ctx.fee_utxos(&options, false).await?;
        let composer = self.build_genesis(&contract, &fee_utxos, &options, Mode::Sign)?;
        let info = self.anchored_info(&contract, SensibleId::new(composer.txid(), 0))?;
        let tx = self.ctx.broadcast(composer, options.no_broadcast).await?;
        info!("Token {} created, sensible id {}", info.genesis, info.sensible_id);
        Ok(GenesisResult { tx, codehash: info.codehash, genesis: info.genesis, sensible_id: info.sensible_id })
    }

    pub async fn estimate_genesis(&self, params: &FtGenesisParams, options: &FeeOptions, fee_utxo_count: usize) -> Result<u64> {
        let contract = self.genesis_contract(params)?;
        let fee_utxos = self.ctx.synthetic_fee_utxos(fee_utxo_count);
        let composer = self.build_genesis(&contract, &fee_utxos, options, Mode::Estimate)?;
        Ok(self.ctx.required_satoshis(&composer, &fee_utxos))
    }

    pub async fn mint(&self, params: FtMintParams, options: FeeOptions) -> Result<FtMintResult> {
        self.ctx.check_fee_options(&options, false)?;
        check_mint(&params)?;
        let mut cache = self.ctx.cache();
        let genesis = self.find_genesis(&mut cache, &params).await?;
        let fee_utxos = self.ctx.fee_utxos(&options, false).await?;
        let (composer, token_output_index) = self.build_mint(&genesis, &params, &fee_utxos, &options, Mode::Sign)?;
        let tx = self.ctx.broadcast(composer, options.no_broadcast).await?;
        info!("Minted {} of token {} in {}", params.token_amount, genesis.contract.genesis_id()?, tx.txid);
        Ok(FtMintResult { tx, token_output_index })
    }

    pub async fn estimate_mint(&self, params: &FtMintParams, options: &FeeOptions, fee_utxo_count: usize) -> Result<u64> {
        check_mint(params)?;
        let mut cache = self.ctx.cache();
        let genesis = self.find_genesis(&mut cache, params).await?;
        let fee_utxos = self.ctx.synthetic_fee_utxos(fee_utxo_count);
        let (composer, _) = self.build_mint(&genesis, params, &fee_utxos, options, Mode::Estimate)?;
        Ok(self.ctx.required_satoshis(&composer, &fee_utxos))
    }

    pub async fn transfer(&self, params: FtTransferParams, options: FeeOptions) -> Result<CheckedTxResult> {
        self.ctx.check_fee_options(&options, true)?;
        check_transfer(self.ctx.config, &params)?;
        let mut cache = self.ctx.cache();
        let plan = self.transfer_plan(&mut cache, &params).await?;
        let fee_utxos = self.ctx.fee_utxos(&options, true).await?;
        let (check, main) = self.route(&plan, Some(&params.sender_key), &fee_utxos, &options, Mode::Sign)?;
        let result = self.ctx.broadcast_checked(check, main, options.no_broadcast).await?;
        info!("Transferred token {} to {} receivers in {}", params.genesis, params.receivers.len(), result.tx.txid);
        Ok(result)
    }

    pub async fn estimate_transfer(&self, params: &FtTransferParams, options: &FeeOptions, fee_utxo_count: usize) -> Result<u64> {
        check_transfer(self.ctx.config, params)?;
        let mut cache = self.ctx.cache();
        let plan = self.transfer_plan(&mut cache, params).await?;
        self.estimate_route(&plan, Some(&params.sender_key), options, fee_utxo_count)
    }

    /// Merges the token UTXOs of the owner into one, at most
    /// [`MAX_TOKEN_INPUTS`](sensible_contracts::tier::MAX_TOKEN_INPUTS) at a time.
    pub async fn merge(&self, params: FtMergeParams, options: FeeOptions) -> Result<CheckedTxResult> {
        self.ctx.check_fee_options(&options, true)?;
        check_token(self.ctx.config, &params.codehash)?;
        let mut cache = self.ctx.cache();
        let plan = self.merge_plan(&mut cache, &params).await?;
        let fee_utxos = self.ctx.fee_utxos(&options, true).await?;
        let (check, main) = self.route(&plan, Some(&params.owner_key), &fee_utxos, &options, Mode::Sign)?;
        let result = self.ctx.broadcast_checked(check, main, options.no_broadcast).await?;
        info!("Merged {} UTXOs of token {} in {}", plan.ft_utxos.len(), params.genesis, result.tx.txid);
        Ok(result)
    }

    pub async fn estimate_merge(&self, params: &FtMergeParams, options: &FeeOptions, fee_utxo_count: usize) -> Result<u64> {
        check_token(self.ctx.config, &params.codehash)?;
        let mut cache = self.ctx.cache();
        let plan = self.merge_plan(&mut cache, params).await?;
        self.estimate_route(&plan, Some(&params.owner_key), options, fee_utxo_count)
    }

    /// Destroys token UTXOs previously sent to the burn address.
    pub async fn burn(&self, params: FtBurnParams, options: FeeOptions) -> Result<CheckedTxResult> {
        self.ctx.check_fee_options(&options, true)?;
        check_burn(self.ctx.config, &params)?;
        let mut cache = self.ctx.cache();
        let plan = self.burn_plan(&mut cache, &params).await?;
        let fee_utxos = self.ctx.fee_utxos(&options, true).await?;
        let (check, main) = self.route(&plan, None, &fee_utxos, &options, Mode::Sign)?;
        let result = self.ctx.broadcast_checked(check, main, options.no_broadcast).await?;
        info!("Burnt {} UTXOs of token {} in {}", plan.ft_utxos.len(), params.genesis, result.tx.txid);
        Ok(result)
    }

    pub async fn estimate_burn(&self, params: &FtBurnParams, options: &FeeOptions, fee_utxo_count: usize) -> Result<u64> {
        check_burn(self.ctx.config, params)?;
        let mut cache = self.ctx.cache();
        let plan = self.burn_plan(&mut cache, params).await?;
        self.estimate_route(&plan, None, options, fee_utxo_count)
    }

    pub async fn get_balance(&self, codehash: &Hash160, genesis: &Hash160, address: &Address) -> Result<FungibleTokenBalance> {
        self.ctx.api.get_fungible_token_balance(codehash, genesis, address).await
    }

    /// Identifiers of the token created by the genesis transaction `txid`.
    pub async fn get_genesis_info(&self, txid: &TransactionId) -> Result<GenesisInfo> {
        let mut cache = self.ctx.cache();
        let tx = cache.get(txid).await?;
        let genesis_codehash = self.ctx.config.code_hash(ContractKind::FtGenesis)?;
        let (index, output) = tx
            .outputs
            .iter()
            .enumerate()
            .find(|(_, output)| ft::query_codehash(output.script_public_key.script()) == genesis_codehash)
            .ok_or_else(|| Error::InvalidArgument(format!("transaction {txid} has no FT genesis output")))?;
        let contract = self.ctx.factory().ft_genesis_from_script(output.script_public_key.script())?;
        let sensible_id = match contract.data_part().sensible_id {
            id if id.is_zero() => SensibleId::new(*txid, index as u32),
            id => id,
        };
        self.anchored_info(&contract, sensible_id)
    }

    fn genesis_contract(&self, params: &FtGenesisParams) -> Result<FtContract> {
        self.ctx
            .factory()
            .ft_genesis(&params.token_name, &params.token_symbol, params.decimal_num, params.genesis_key.address().hash)
            .map_err(argument_error)
    }

    fn anchored_info(&self, contract: &FtContract, sensible_id: SensibleId) -> Result<GenesisInfo> {
        let anchored = anchor(contract, &sensible_id)?;
        Ok(GenesisInfo { codehash: self.ctx.config.code_hash(ContractKind::FtToken)?, genesis: anchored.genesis_id()?, sensible_id })
    }

    fn build_genesis(&self, contract: &FtContract, fee_utxos: &[Utxo], options: &FeeOptions, mode: Mode) -> Result<TxComposer> {
        let mut composer = self.ctx.composer();
        for utxo in fee_utxos {
            composer.append_p2pkh_input(utxo);
        }
        let script = contract.script_public_key();
        let satoshis = self.ctx.config.dust_threshold(script.script().len());
        composer.append_output(script, satoshis)?;
        self.ctx.append_op_return(&mut composer, options)?;
        self.ctx.converge(&mut composer, &self.ctx.change_address(options), 0, |_| Ok(()))?;
        self.ctx.finalize(&mut composer, mode)?;
        Ok(composer)
    }

    async fn find_genesis(&self, cache: &mut RawTxCache<'_>, params: &FtMintParams) -> Result<GenesisUtxo> {
        let factory = self.ctx.factory();
        let sensible_id = params.sensible_id;
        let first_tx = cache.get(&sensible_id.txid).await?;
        let first = first_tx
            .outputs
            .get(sensible_id.index as usize)
            .and_then(|output| factory.ft_genesis_from_script(output.script_public_key.script()).ok())
            .ok_or_else(|| Error::InvalidArgument(format!("sensible id {sensible_id} does not reference an FT genesis output")))?;
        let first = anchor(&first, &sensible_id)?;
        let genesis = first.genesis_id()?;
        if first.data_part().token_address != params.genesis_key.address().hash {
            return Err(Error::InvalidArgument(format!("the genesis key is not the issuer of token {genesis}")));
        }

        let issuer = Address::new(self.ctx.network(), first.data_part().token_address);
        let genesis_codehash = first.code_hash();
        let unspents = self.ctx.api.get_fungible_token_unspents(&genesis_codehash, &genesis, &issuer).await?;
        let unspent = unspents.into_iter().next().ok_or(Error::FixedTokenSupply)?;
        let tx = cache.get(&unspent.txid).await?;
        let utxo = Utxo::from_output(&tx, unspent.output_index)
            .ok_or_else(|| Error::InternalLineageError(format!("genesis UTXO {} does not exist", unspent.outpoint())))?;
        let contract = factory.ft_genesis_from_script(utxo.script_public_key.script()).map_err(|_| Error::FixedTokenSupply)?;
        let contract = anchor(&contract, &sensible_id)?;
        if contract.genesis_id()? != genesis {
            return Err(Error::InternalLineageError(format!("genesis UTXO {} belongs to another token", utxo.outpoint)));
        }

        let matcher = ancestor_matcher(genesis_codehash, self.ctx.config.code_hash(ContractKind::FtToken)?, genesis);
        let satotx_info = resolve_genesis_satotx_info(cache, utxo.outpoint, &sensible_id, &matcher).await?;
        debug!("Minting from genesis UTXO {}", utxo.outpoint);
        Ok(GenesisUtxo { utxo, contract, satotx_info })
    }

    /// Input 0 spends the genesis; outputs are the next genesis (unless the
    /// supply becomes fixed), the token, the optional `OP_RETURN` and change.
    fn build_mint(
        &self,
        genesis: &GenesisUtxo,
        params: &FtMintParams,
        fee_utxos: &[Utxo],
        options: &FeeOptions,
        mode: Mode,
    ) -> Result<(TxComposer, usize)> {
        let config = self.ctx.config;
        let token = self.ctx.factory().ft_token(&genesis.contract, params.receiver.hash, params.token_amount)?;

        let mut composer = self.ctx.composer();
        composer.append_input(&genesis.utxo);
        for utxo in fee_utxos {
            composer.append_p2pkh_input(utxo);
        }

        let mut genesis_satoshis = 0;
        if params.allow_increase_mints {
            let script = genesis.contract.script_public_key();
            genesis_satoshis = config.dust_threshold(script.script().len());
            composer.append_output(script, genesis_satoshis)?;
        }
        let token_script = token.script_public_key();
        let token_satoshis = config.dust_threshold(token_script.script().len());
        let token_output_index = composer.append_output(token_script, token_satoshis)?;
        let op_return_script = self.ctx.append_op_return(&mut composer, options)?;

        let info = &genesis.satotx_info;
        let genesis_tx_header = transaction_digest(&info.tx).header;
        let genesis_tx_input_proof = input_proof(&info.tx, info.prev_input_index as usize)?;
        let prev_genesis_tx_output_proof = output_proof(&info.prev_tx, info.prev_output_index as usize)?;
        let issuer = mode.signer(&params.genesis_key);
        let change_address = self.ctx.change_address(options);

        self.ctx.converge(&mut composer, &change_address, 1, |composer| {
            let call = FtGenesisUnlock {
                preimage: composer.get_input_preimage(0, SIG_HASH_ALL_FORK_ID)?,
                pub_key: issuer.public_key(),
                sig: issuer.sign(composer, 0)?,
                token_script: token.locking_script().to_vec(),
                genesis_tx_header: genesis_tx_header.clone(),
                prev_input_index: info.prev_input_index,
                genesis_tx_input_proof: genesis_tx_input_proof.clone(),
                prev_genesis_tx_output_proof: prev_genesis_tx_output_proof.clone(),
                genesis_satoshis,
                token_satoshis,
                change_address: change_address.hash,
                change_satoshis: composer.change_satoshis(),
                op_return_script: op_return_script.clone(),
            };
            composer.set_input_script(0, call.to_unlocking_script()?)
        })?;
        self.ctx.finalize(&mut composer, mode)?;
        Ok((composer, token_output_index))
    }

    async fn transfer_plan(&self, cache: &mut RawTxCache<'_>, params: &FtTransferParams) -> Result<RoutePlan> {
        let sender = params.sender_key.address();
        let needed: u128 = params.receivers.iter().map(|receiver| receiver.amount as u128).sum();
        let unspents = match &params.ft_utxos {
            Some(utxos) => utxos.clone(),
            None => self.ctx.api.get_fungible_token_unspents(&params.codehash, &params.genesis, &sender).await?,
        };
        let selected = select_ft_utxos(unspents, needed, false)?;

        let total: u128 = selected.iter().map(|utxo| utxo.token_amount as u128).sum();
        let mut receivers: Vec<Receiver> = params.receivers.iter().map(|receiver| Receiver::new(receiver.address.hash, receiver.amount)).collect();
        if total > needed {
            let change = u64::try_from(total - needed).map_err(|_| Error::InvalidArgument("token change exceeds 64 bits".into()))?;
            receivers.push(Receiver::new(sender.hash, change));
        }
        let plan = self.plan(cache, Route::Transfer, &params.codehash, &params.genesis, &selected, receivers).await?;
        check_owner(&plan, &sender)?;
        Ok(plan)
    }

    async fn merge_plan(&self, cache: &mut RawTxCache<'_>, params: &FtMergeParams) -> Result<RoutePlan> {
        let owner = params.owner_key.address();
        let unspents = match &params.ft_utxos {
            Some(utxos) => utxos.clone(),
            None => self.ctx.api.get_fungible_token_unspents(&params.codehash, &params.genesis, &owner).await?,
        };
        let selected = select_ft_utxos(unspents, 0, true)?;
        if selected.is_empty() {
            return Err(Error::InvalidArgument(format!("{} holds no UTXO of token {}", owner, params.genesis)));
        }
        let total: u128 = selected.iter().map(|utxo| utxo.token_amount as u128).sum();
        let amount = u64::try_from(total).map_err(|_| Error::InvalidArgument("merged amount exceeds 64 bits".into()))?;
        let plan = self.plan(cache, Route::Transfer, &params.codehash, &params.genesis, &selected, vec![Receiver::new(owner.hash, amount)]).await?;
        check_owner(&plan, &owner)?;
        Ok(plan)
    }

    async fn burn_plan(&self, cache: &mut RawTxCache<'_>, params: &FtBurnParams) -> Result<RoutePlan> {
        let unspents = match &params.ft_utxos {
            Some(utxos) => utxos.clone(),
            None => {
                let burn = Address::burn(self.ctx.network());
                self.ctx.api.get_fungible_token_unspents(&params.codehash, &params.genesis, &burn).await?
            }
        };
        let selected = select_ft_utxos(unspents, 0, true)?;
        if selected.is_empty() {
            return Err(Error::InvalidArgument(format!("no UTXO of token {} to burn", params.genesis)));
        }
        let plan = self.plan(cache, Route::Burn, &params.codehash, &params.genesis, &selected, vec![]).await?;
        if let Some(ft_utxo) = plan.ft_utxos.iter().find(|ft_utxo| !ft_utxo.token_address.is_burn()) {
            return Err(Error::CannotBurnNonZeroAddress(ft_utxo.outpoint()));
        }
        Ok(plan)
    }

    async fn plan(
        &self,
        cache: &mut RawTxCache<'_>,
        route: Route,
        codehash: &Hash160,
        genesis: &Hash160,
        selected: &[FungibleTokenUnspent],
        receivers: Vec<Receiver>,
    ) -> Result<RoutePlan> {
        let ft_utxos = self.resolve_ft_utxos(cache, codehash, genesis, selected).await?;
        if route == Route::Transfer {
            let inputs: u128 = ft_utxos.iter().map(|ft_utxo| ft_utxo.token_amount as u128).sum();
            let outputs: u128 = receivers.iter().map(|receiver| receiver.amount as u128).sum();
            if inputs != outputs {
                return Err(Error::TokenConservation { inputs, outputs });
            }
        }

        let tier = select_tier(ft_utxos.len(), receivers.len()).ok_or(Error::TooManyTokenUtxos(ft_utxos.len()))?;
        debug!("Spending {} token UTXOs to {} outputs through the {} check", ft_utxos.len(), receivers.len(), tier);
        let data_part = FtCheckDataPart { receivers: receivers.clone(), token_code_hash: *codehash, token_id: *genesis };
        let factory = self.ctx.factory();
        let check = match route {
            Route::Transfer => factory.ft_transfer_check(tier, data_part)?,
            Route::Burn => factory.ft_unlock_check(tier, data_part)?,
        };
        Ok(RoutePlan { route, ft_utxos, receivers, check })
    }

    async fn resolve_ft_utxos(
        &self,
        cache: &mut RawTxCache<'_>,
        codehash: &Hash160,
        genesis: &Hash160,
        unspents: &[FungibleTokenUnspent],
    ) -> Result<Vec<FtUtxo>> {
        cache.prefetch(unspents.iter().map(|unspent| unspent.txid)).await?;
        let matcher = ancestor_matcher(self.ctx.config.code_hash(ContractKind::FtGenesis)?, *codehash, *genesis);
        let mut ft_utxos = Vec::with_capacity(unspents.len());
        for unspent in unspents {
            let tx = cache.get(&unspent.txid).await?;
            let utxo = Utxo::from_output(&tx, unspent.output_index)
                .ok_or_else(|| Error::InvalidArgument(format!("UTXO {} does not exist", unspent.outpoint())))?;
            let script = utxo.script_public_key.script();
            if ft::query_codehash(script) != *codehash || ft::query_genesis(script) != *genesis {
                return Err(Error::InvalidArgument(format!("UTXO {} is not an output of token {}", utxo.outpoint, genesis)));
            }
            let token_address = Address::new(self.ctx.network(), ft::get_token_address(script));
            let token_amount = ft::get_token_amount(script);
            let satotx_info = resolve_satotx_info(cache, utxo.outpoint, &matcher).await?;
            ft_utxos.push(FtUtxo { utxo, token_address, token_amount, satotx_info });
        }
        Ok(ft_utxos)
    }

    fn route(
        &self,
        plan: &RoutePlan,
        owner: Option<&PrivateKey>,
        fee_utxos: &[Utxo],
        options: &FeeOptions,
        mode: Mode,
    ) -> Result<(TxComposer, TxComposer)> {
        let change_address = self.ctx.change_address(options);
        self.ctx.compose_checked(&plan.check.script_public_key(), fee_utxos, &change_address, mode, |check_tx, funding, mode| {
            self.build_routed(plan, check_tx, funding, owner, options, mode)
        })
    }

    fn estimate_route(&self, plan: &RoutePlan, owner: Option<&PrivateKey>, options: &FeeOptions, fee_utxo_count: usize) -> Result<u64> {
        let fee_utxos = self.ctx.synthetic_fee_utxos(fee_utxo_count);
        let (check, _) = self.route(plan, owner, &fee_utxos, options, Mode::Estimate)?;
        Ok(self.ctx.required_satoshis(&check, &fee_utxos))
    }

    /// Inputs are the token UTXOs, the funding output of the check
    /// transaction, then the check contract. Outputs are the new token
    /// states, the optional `OP_RETURN` and change.
    fn build_routed(
        &self,
        plan: &RoutePlan,
        check_tx: &Transaction,
        funding: &Utxo,
        owner: Option<&PrivateKey>,
        options: &FeeOptions,
        mode: Mode,
    ) -> Result<TxComposer> {
        let config = self.ctx.config;
        let first = plan.ft_utxos.first().ok_or_else(|| Error::custom("no token inputs"))?;
        let token_template = self.ctx.factory().ft_token_from_script(first.utxo.script_public_key.script())?;

        let mut composer = self.ctx.composer();
        for ft_utxo in &plan.ft_utxos {
            composer.append_input(&ft_utxo.utxo);
        }
        composer.append_p2pkh_input(funding);
        let check_utxo = Utxo::from_output(check_tx, 0).ok_or_else(|| Error::custom("check transaction has no check output"))?;
        let check_index = composer.append_input(&check_utxo);

        let mut receiver_satoshi_array = Vec::with_capacity(plan.receivers.len() * 8);
        for receiver in &plan.receivers {
            let token = token_template.with_data_part(|data| {
                data.token_address = receiver.address;
                data.token_amount = receiver.amount;
            })?;
            let script = token.script_public_key();
            let satoshis = config.dust_threshold(script.script().len());
            composer.append_output(script, satoshis)?;
            receiver_satoshi_array.extend(satoshis.to_le_bytes());
        }
        let op_return_script = self.ctx.append_op_return(&mut composer, options)?;
        let change_address = self.ctx.change_address(options);

        let contract_tx_output_proof = output_proof(check_tx, 0)?;
        let mut token_inputs = TokenInputArrays::default();
        let mut backtraces = Vec::with_capacity(plan.ft_utxos.len());
        for ft_utxo in &plan.ft_utxos {
            let info = &ft_utxo.satotx_info;
            token_inputs.push(&output_proof(&info.tx, info.output_index as usize)?, &ft_utxo.token_address.hash, ft_utxo.token_amount);
            backtraces.push(Backtrace::new(info)?);
        }
        let token_input_index_array: Vec<u8> = (0..plan.ft_utxos.len() as u32).flat_map(u32::to_le_bytes).collect();
        let token_script = first.utxo.script_public_key.script().to_vec();
        let owner = owner.map(|key| mode.signer(key));

        self.ctx.converge(&mut composer, &change_address, plan.ft_utxos.len() + 1, |composer| {
            let prevouts = composer.prevouts();
            for (input_index, (ft_utxo, backtrace)) in plan.ft_utxos.iter().zip(&backtraces).enumerate() {
                let (sender_pub_key, sender_sig, operation) = match &owner {
                    Some(signer) => (signer.public_key(), signer.sign(composer, input_index)?, TokenOperation::Transfer),
                    None => (vec![], vec![], TokenOperation::UnlockFromContract),
                };
                let call = FtTokenUnlock {
                    preimage: composer.get_input_preimage(input_index, SIG_HASH_ALL_FORK_ID)?,
                    prevouts: prevouts.clone(),
                    prev_token_input_index: ft_utxo.satotx_info.prev_input_index,
                    prev_token_address: ft_utxo.satotx_info.prev_token_address,
                    prev_token_amount: ft_utxo.satotx_info.prev_token_amount,
                    token_tx_header: backtrace.header.clone(),
                    token_tx_input_proof: backtrace.input_proof.clone(),
                    prev_token_tx_output_proof: backtrace.prev_output_proof.clone(),
                    sender_pub_key,
                    sender_sig,
                    contract_input_index: check_index as u32,
                    contract_tx_output_proof: contract_tx_output_proof.clone(),
                    operation,
                };
                composer.set_input_script(input_index, call.to_unlocking_script()?)?;
            }

            let preimage = composer.get_input_preimage(check_index, SIG_HASH_ALL_FORK_ID)?;
            let script = match plan.route {
                Route::Transfer => FtTransferCheckUnlock {
                    preimage,
                    prevouts,
                    token_script: token_script.clone(),
                    token_inputs: token_inputs.clone(),
                    receiver_satoshi_array: receiver_satoshi_array.clone(),
                    change_satoshis: composer.change_satoshis(),
                    change_address: change_address.hash,
                    op_return_script: op_return_script.clone(),
                }
                .to_unlocking_script()?,
                Route::Burn => FtUnlockCheckUnlock {
                    preimage,
                    prevouts,
                    token_script: token_script.clone(),
                    token_input_index_array: token_input_index_array.clone(),
                    token_inputs: token_inputs.clone(),
                    n_outputs: composer.output_count() as u32,
                    token_output_index_array: vec![],
                    token_output_satoshi_array: vec![],
                    other_output_array: other_outputs_array(&composer.tx().outputs),
                }
                .to_unlocking_script()?,
            };
            composer.set_input_script(check_index, script)
        })?;
        self.ctx.finalize(&mut composer, mode)?;
        Ok(composer)
    }
}

/// Sets the sensible id of a first genesis contract, or checks it matches.
fn anchor(contract: &FtContract, sensible_id: &SensibleId) -> Result<FtContract> {
    let current = contract.data_part().sensible_id;
    if current.is_zero() {
        return Ok(contract.with_data_part(|data| data.sensible_id = *sensible_id)?);
    }
    if current != *sensible_id {
        return Err(Error::InvalidArgument(format!("genesis contract is anchored to {current}, not {sensible_id}")));
    }
    Ok(contract.clone())
}

/// Recognizes the previous state of a token of `genesis`: an earlier token
/// output, or the genesis contract that minted it.
fn ancestor_matcher(genesis_codehash: Hash160, codehash: Hash160, genesis: Hash160) -> impl Fn(&TransactionOutpoint, &[u8]) -> Option<(Hash160, u64)> {
    move |outpoint, script| {
        let code = ft::query_codehash(script);
        if code == codehash && ft::query_genesis(script) == genesis {
            return Some((ft::get_token_address(script), ft::get_token_amount(script)));
        }
        if code == genesis_codehash {
            let mut data = FtDataPart::decode(script);
            if data.sensible_id.is_zero() {
                data.sensible_id = SensibleId::from(*outpoint);
            }
            if data.genesis_id().ok() == Some(genesis) {
                return Some((data.token_address, 0));
            }
        }
        None
    }
}

fn check_token(config: &ProtocolConfig, codehash: &Hash160) -> Result<()> {
    match config.kind_of(codehash) {
        Some(ContractKind::FtToken) => Ok(()),
        _ => Err(Error::InvalidArgument(format!("{codehash} is not the code hash of a fungible token"))),
    }
}

fn check_mint(params: &FtMintParams) -> Result<()> {
    if params.token_amount == 0 {
        return Err(Error::InvalidArgument("mint amount must be positive".into()));
    }
    if params.sensible_id.is_zero() {
        return Err(Error::InvalidArgument("sensible id is required".into()));
    }
    Ok(())
}

fn check_transfer(config: &ProtocolConfig, params: &FtTransferParams) -> Result<()> {
    check_token(config, &params.codehash)?;
    if params.receivers.is_empty() {
        return Err(Error::InvalidArgument("no receivers".into()));
    }
    if let Some(receiver) = params.receivers.iter().find(|receiver| receiver.amount == 0) {
        return Err(Error::InvalidArgument(format!("amount sent to {} must be positive", receiver.address)));
    }
    // one output is kept for the sender's token change
    let max_receivers = TIERS.iter().map(|tier| tier.max_outputs).max().unwrap_or_default() - 1;
    if params.receivers.len() > max_receivers {
        return Err(Error::InvalidArgument(format!("{} receivers, at most {} are supported", params.receivers.len(), max_receivers)));
    }
    Ok(())
}

fn check_burn(config: &ProtocolConfig, params: &FtBurnParams) -> Result<()> {
    check_token(config, &params.codehash)?;
    if let Some(utxo) = params.ft_utxos.iter().flatten().find(|utxo| !utxo.token_address.is_burn()) {
        return Err(Error::CannotBurnNonZeroAddress(utxo.outpoint()));
    }
    Ok(())
}

fn check_owner(plan: &RoutePlan, owner: &Address) -> Result<()> {
    match plan.ft_utxos.iter().find(|ft_utxo| ft_utxo.token_address.hash != owner.hash) {
        Some(ft_utxo) => Err(Error::InvalidArgument(format!("token UTXO {} is not held by {}", ft_utxo.outpoint(), owner))),
        None => Ok(()),
    }
}
