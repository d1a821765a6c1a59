use super::{
    Backtrace, CheckedTxResult, FeeOptions, GenesisResult, Mode, SignedTx, TokenContext, resolve_genesis_satotx_info, resolve_satotx_info,
};
use crate::{
    api::{IndexerApi, NonFungibleTokenSummary, NonFungibleTokenUnspent},
    cache::RawTxCache,
    error::Error,
    result::Result,
    tx::TxComposer,
    utxo::{NftUtxo, SatotxInfo, Utxo},
};
use log::{debug, info};
use sensible_addresses::Address;
use sensible_consensus_core::{
    hashing::sighash_type::SIG_HASH_ALL_FORK_ID,
    keys::PrivateKey,
    tx::{Transaction, TransactionOutpoint},
};
use sensible_contracts::{
    ContractKind, ProtocolConfig,
    adapter::{DataPart, NftCheckContract, NftContract},
    calls::{ContractCall, NftGenesisUnlock, NftTokenUnlock, NftUnlockCheckUnlock, TokenOperation, other_outputs_array},
    check::NftCheckDataPart,
    nft::{self, NftDataPart},
    proof::{TxOutputProof, output_proof},
    proto::SensibleId,
};
use sensible_hashes::Hash160;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct NftGenesisParams {
    pub total_supply: u64,
    pub genesis_key: PrivateKey,
}

#[derive(Debug, Clone)]
pub struct NftMintParams {
    pub sensible_id: SensibleId,
    pub genesis_key: PrivateKey,
    pub receiver: Address,
    /// Outpoint of the metadata the token points to.
    pub metaid_outpoint: TransactionOutpoint,
}

#[derive(Debug, Clone)]
pub struct NftTransferParams {
    pub codehash: Hash160,
    pub genesis: Hash160,
    pub token_index: u64,
    pub sender_key: PrivateKey,
    pub receiver: Address,
}

#[derive(Debug, Clone)]
pub struct NftBurnParams {
    pub codehash: Hash160,
    pub genesis: Hash160,
    pub token_index: u64,
    /// The token to burn. When absent it is looked up at the burn address.
    pub nft_utxo: Option<NonFungibleTokenUnspent>,
}

#[derive(Debug, Clone)]
pub struct NftMintResult {
    pub tx: SignedTx,
    pub token_index: u64,
    pub token_output_index: usize,
}

struct GenesisUtxo {
    utxo: Utxo,
    contract: NftContract,
    satotx_info: SatotxInfo,
}

/// Non-fungible token operations.
pub struct NftManager<'a> {
    ctx: TokenContext<'a>,
}

impl<'a> NftManager<'a> {
    /// `purse` pays every fee and receives the change by default.
    pub fn new(config: &'a ProtocolConfig, api: Arc<dyn IndexerApi>, purse: PrivateKey) -> Self {
        Self { ctx: TokenContext::new(config, api, purse) }
    }

    pub async fn genesis(&self, params: NftGenesisParams, options: FeeOptions) -> Result<GenesisResult> {
        self.ctx.check_fee_options(&options, false)?;
        check_supply(&params)?;
        let contract = self.ctx.factory().nft_genesis(params.total_supply, params.genesis_key.address().hash)?;
        let fee_utxos = self.ctx.fee_utxos(&options, false).await?;
        let composer = self.build_genesis(&contract, &fee_utxos, &options, Mode::Sign)?;
        let sensible_id = SensibleId::new(composer.txid(), 0);
        let genesis = anchor(&contract, &sensible_id)?.genesis_id()?;
        let tx = self.ctx.broadcast(composer, options.no_broadcast).await?;
        info!("NFT collection {} of {} created, sensible id {}", genesis, params.total_supply, sensible_id);
        Ok(GenesisResult { tx, codehash: self.ctx.config.code_hash(ContractKind::NftToken)?, genesis, sensible_id })
    }

    pub async fn estimate_genesis(&self, params: &NftGenesisParams, options: &FeeOptions, fee_utxo_count: usize) -> Result<u64> {
        check_supply(params)?;
        let contract = self.ctx.factory().nft_genesis(params.total_supply, params.genesis_key.address().hash)?;
        let fee_utxos = self.ctx.synthetic_fee_utxos(fee_utxo_count);
        let composer = self.build_genesis(&contract, &fee_utxos, options, Mode::Estimate)?;
        Ok(self.ctx.required_satoshis(&composer, &fee_utxos))
    }

    /// Issues the next token of the collection.
    pub async fn mint(&self, params: NftMintParams, options: FeeOptions) -> Result<NftMintResult> {
        self.ctx.check_fee_options(&options, false)?;
        let mut cache = self.ctx.cache();
        let genesis = self.find_genesis(&mut cache, &params).await?;
        let fee_utxos = self.ctx.fee_utxos(&options, false).await?;
        let (composer, token_output_index) = self.build_mint(&genesis, &params, &fee_utxos, &options, Mode::Sign)?;
        let token_index = genesis.contract.data_part().token_index;
        let tx = self.ctx.broadcast(composer, options.no_broadcast).await?;
        info!("Minted NFT #{} to {} in {}", token_index, params.receiver, tx.txid);
        Ok(NftMintResult { tx, token_index, token_output_index })
    }

    pub async fn estimate_mint(&self, params: &NftMintParams, options: &FeeOptions, fee_utxo_count: usize) -> Result<u64> {
        let mut cache = self.ctx.cache();
        let genesis = self.find_genesis(&mut cache, params).await?;
        let fee_utxos = self.ctx.synthetic_fee_utxos(fee_utxo_count);
        let (composer, _) = self.build_mint(&genesis, params, &fee_utxos, options, Mode::Estimate)?;
        Ok(self.ctx.required_satoshis(&composer, &fee_utxos))
    }

    /// Sends one token to a new owner. No check contract is involved.
    pub async fn transfer(&self, params: NftTransferParams, options: FeeOptions) -> Result<SignedTx> {
        self.ctx.check_fee_options(&options, true)?;
        check_token(self.ctx.config, &params.codehash)?;
        let mut cache = self.ctx.cache();
        let nft_utxo = self.owned_nft(&mut cache, &params).await?;
        let fee_utxos = self.ctx.fee_utxos(&options, true).await?;
        let composer = self.build_transfer(&nft_utxo, &params, &fee_utxos, &options, Mode::Sign)?;
        let tx = self.ctx.broadcast(composer, options.no_broadcast).await?;
        info!("Transferred NFT #{} to {} in {}", params.token_index, params.receiver, tx.txid);
        Ok(tx)
    }

    pub async fn estimate_transfer(&self, params: &NftTransferParams, options: &FeeOptions, fee_utxo_count: usize) -> Result<u64> {
        check_token(self.ctx.config, &params.codehash)?;
        let mut cache = self.ctx.cache();
        let nft_utxo = self.owned_nft(&mut cache, params).await?;
        let fee_utxos = self.ctx.synthetic_fee_utxos(fee_utxo_count);
        let composer = self.build_transfer(&nft_utxo, params, &fee_utxos, options, Mode::Estimate)?;
        Ok(self.ctx.required_satoshis(&composer, &fee_utxos))
    }

    /// Destroys a token previously sent to the burn address.
    pub async fn burn(&self, params: NftBurnParams, options: FeeOptions) -> Result<CheckedTxResult> {
        self.ctx.check_fee_options(&options, true)?;
        check_burn(self.ctx.config, &params)?;
        let mut cache = self.ctx.cache();
        let (nft_utxo, check) = self.burn_plan(&mut cache, &params).await?;
        let fee_utxos = self.ctx.fee_utxos(&options, true).await?;
        let (check_tx, main) = self.route_burn(&nft_utxo, &check, &fee_utxos, &options, Mode::Sign)?;
        let result = self.ctx.broadcast_checked(check_tx, main, options.no_broadcast).await?;
        info!("Burnt NFT #{} of {} in {}", params.token_index, params.genesis, result.tx.txid);
        Ok(result)
    }

    pub async fn estimate_burn(&self, params: &NftBurnParams, options: &FeeOptions, fee_utxo_count: usize) -> Result<u64> {
        check_burn(self.ctx.config, params)?;
        let mut cache = self.ctx.cache();
        let (nft_utxo, check) = self.burn_plan(&mut cache, params).await?;
        let fee_utxos = self.ctx.synthetic_fee_utxos(fee_utxo_count);
        let (check_tx, _) = self.route_burn(&nft_utxo, &check, &fee_utxos, options, Mode::Estimate)?;
        Ok(self.ctx.required_satoshis(&check_tx, &fee_utxos))
    }

    /// Collections held by `address` and how many tokens of each it owns.
    pub async fn get_summary(&self, address: &Address) -> Result<Vec<NonFungibleTokenSummary>> {
        self.ctx.api.get_non_fungible_token_summary(address).await
    }

    fn build_genesis(&self, contract: &NftContract, fee_utxos: &[Utxo], options: &FeeOptions, mode: Mode) -> Result<TxComposer> {
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

    async fn find_genesis(&self, cache: &mut RawTxCache<'_>, params: &NftMintParams) -> Result<GenesisUtxo> {
        let factory = self.ctx.factory();
        let sensible_id = params.sensible_id;
        let first_tx = cache.get(&sensible_id.txid).await?;
        let first = first_tx
            .outputs
            .get(sensible_id.index as usize)
            .and_then(|output| factory.nft_genesis_from_script(output.script_public_key.script()).ok())
            .ok_or_else(|| Error::InvalidArgument(format!("sensible id {sensible_id} does not reference an NFT genesis output")))?;
        let first = anchor(&first, &sensible_id)?;
        let genesis = first.genesis_id()?;
        if first.data_part().nft_address != params.genesis_key.address().hash {
            return Err(Error::InvalidArgument(format!("the genesis key is not the issuer of collection {genesis}")));
        }

        let issuer = Address::new(self.ctx.network(), first.data_part().nft_address);
        let genesis_codehash = first.code_hash();
        let unspents = self.ctx.api.get_non_fungible_token_unspents(&genesis_codehash, &genesis, &issuer).await?;
        let unspent = unspents.into_iter().next().ok_or(Error::FixedTokenSupply)?;
        let tx = cache.get(&unspent.txid).await?;
        let utxo = Utxo::from_output(&tx, unspent.output_index)
            .ok_or_else(|| Error::InternalLineageError(format!("genesis UTXO {} does not exist", unspent.outpoint())))?;
        let contract = factory.nft_genesis_from_script(utxo.script_public_key.script()).map_err(|_| Error::FixedTokenSupply)?;
        let contract = anchor(&contract, &sensible_id)?;
        if contract.genesis_id()? != genesis {
            return Err(Error::InternalLineageError(format!("genesis UTXO {} belongs to another collection", utxo.outpoint)));
        }
        let data = contract.data_part();
        if data.token_index >= data.total_supply {
            return Err(Error::FixedTokenSupply);
        }

        let matcher = ancestor_matcher(genesis_codehash, self.ctx.config.code_hash(ContractKind::NftToken)?, genesis, None);
        let satotx_info = resolve_genesis_satotx_info(cache, utxo.outpoint, &sensible_id, &matcher).await?;
        debug!("Minting NFT #{} of {} from genesis UTXO {}", data.token_index, data.total_supply, utxo.outpoint);
        Ok(GenesisUtxo { utxo, contract, satotx_info })
    }

    /// Input 0 spends the genesis; outputs are the next genesis (omitted
    /// once the last token is issued), the token, the optional `OP_RETURN`
    /// and change.
    fn build_mint(
        &self,
        genesis: &GenesisUtxo,
        params: &NftMintParams,
        fee_utxos: &[Utxo],
        options: &FeeOptions,
        mode: Mode,
    ) -> Result<(TxComposer, usize)> {
        let config = self.ctx.config;
        let data = genesis.contract.data_part();
        let token = self.ctx.factory().nft_token(&genesis.contract, params.receiver.hash, params.metaid_outpoint)?;

        let mut composer = self.ctx.composer();
        composer.append_input(&genesis.utxo);
        for utxo in fee_utxos {
            composer.append_p2pkh_input(utxo);
        }

        let mut genesis_satoshis = 0;
        if data.token_index + 1 < data.total_supply {
            let next = genesis.contract.with_data_part(|data| data.token_index += 1)?;
            let script = next.script_public_key();
            genesis_satoshis = config.dust_threshold(script.script().len());
            composer.append_output(script, genesis_satoshis)?;
        }
        let nft_script = token.script_public_key();
        let nft_satoshis = config.dust_threshold(nft_script.script().len());
        let token_output_index = composer.append_output(nft_script, nft_satoshis)?;
        let op_return_script = self.ctx.append_op_return(&mut composer, options)?;

        let info = &genesis.satotx_info;
        let backtrace = Backtrace::new(info)?;
        let issuer = mode.signer(&params.genesis_key);
        let change_address = self.ctx.change_address(options);

        self.ctx.converge(&mut composer, &change_address, 1, |composer| {
            let call = NftGenesisUnlock {
                preimage: composer.get_input_preimage(0, SIG_HASH_ALL_FORK_ID)?,
                pub_key: issuer.public_key(),
                sig: issuer.sign(composer, 0)?,
                nft_script: token.locking_script().to_vec(),
                genesis_tx_header: backtrace.header.clone(),
                prev_input_index: info.prev_input_index,
                genesis_tx_input_proof: backtrace.input_proof.clone(),
                prev_genesis_tx_output_proof: backtrace.prev_output_proof.clone(),
                genesis_satoshis,
                nft_satoshis,
                change_address: change_address.hash,
                change_satoshis: composer.change_satoshis(),
                op_return_script: op_return_script.clone(),
            };
            composer.set_input_script(0, call.to_unlocking_script()?)
        })?;
        self.ctx.finalize(&mut composer, mode)?;
        Ok((composer, token_output_index))
    }

    async fn owned_nft(&self, cache: &mut RawTxCache<'_>, params: &NftTransferParams) -> Result<NftUtxo> {
        let sender = params.sender_key.address();
        let unspents = self.ctx.api.get_non_fungible_token_unspents(&params.codehash, &params.genesis, &sender).await?;
        let unspent = unspents
            .into_iter()
            .find(|unspent| unspent.token_index == params.token_index)
            .ok_or_else(|| Error::InvalidArgument(format!("{} does not hold NFT #{} of {}", sender, params.token_index, params.genesis)))?;
        let nft_utxo = self.resolve_nft_utxo(cache, &params.codehash, &params.genesis, &unspent).await?;
        if nft_utxo.nft_address.hash != sender.hash {
            return Err(Error::InvalidArgument(format!("NFT UTXO {} is not held by {}", nft_utxo.utxo.outpoint, sender)));
        }
        Ok(nft_utxo)
    }

    async fn resolve_nft_utxo(
        &self,
        cache: &mut RawTxCache<'_>,
        codehash: &Hash160,
        genesis: &Hash160,
        unspent: &NonFungibleTokenUnspent,
    ) -> Result<NftUtxo> {
        let tx = cache.get(&unspent.txid).await?;
        let utxo = Utxo::from_output(&tx, unspent.output_index)
            .ok_or_else(|| Error::InvalidArgument(format!("UTXO {} does not exist", unspent.outpoint())))?;
        let script = utxo.script_public_key.script();
        if nft::query_codehash(script) != *codehash || nft::query_genesis(script) != *genesis {
            return Err(Error::InvalidArgument(format!("UTXO {} is not a token of collection {}", utxo.outpoint, genesis)));
        }
        let nft_address = Address::new(self.ctx.network(), nft::get_nft_address(script));
        let token_index = nft::get_token_index(script);
        let matcher = ancestor_matcher(self.ctx.config.code_hash(ContractKind::NftGenesis)?, *codehash, *genesis, Some(token_index));
        let satotx_info = resolve_satotx_info(cache, utxo.outpoint, &matcher).await?;
        Ok(NftUtxo { utxo, nft_address, token_index, satotx_info })
    }

    /// Input 0 is the token; outputs are the token at its new owner, the
    /// optional `OP_RETURN` and change.
    fn build_transfer(
        &self,
        nft_utxo: &NftUtxo,
        params: &NftTransferParams,
        fee_utxos: &[Utxo],
        options: &FeeOptions,
        mode: Mode,
    ) -> Result<TxComposer> {
        let token = self.ctx.factory().nft_token_from_script(nft_utxo.utxo.script_public_key.script())?;
        let next = token.with_data_part(|data| data.nft_address = params.receiver.hash)?;

        let mut composer = self.ctx.composer();
        composer.append_input(&nft_utxo.utxo);
        for utxo in fee_utxos {
            composer.append_p2pkh_input(utxo);
        }
        let script = next.script_public_key();
        let nft_output_satoshis = self.ctx.config.dust_threshold(script.script().len());
        composer.append_output(script, nft_output_satoshis)?;
        let op_return_script = self.ctx.append_op_return(&mut composer, options)?;

        let info = &nft_utxo.satotx_info;
        let backtrace = Backtrace::new(info)?;
        let sender = mode.signer(&params.sender_key);
        let change_address = self.ctx.change_address(options);

        self.ctx.converge(&mut composer, &change_address, 1, |composer| {
            let call = NftTokenUnlock {
                preimage: composer.get_input_preimage(0, SIG_HASH_ALL_FORK_ID)?,
                prevouts: composer.prevouts(),
                prev_nft_input_index: info.prev_input_index,
                prev_nft_address: info.prev_token_address,
                nft_tx_header: backtrace.header.clone(),
                nft_tx_input_proof: backtrace.input_proof.clone(),
                prev_nft_tx_output_proof: backtrace.prev_output_proof.clone(),
                sender_pub_key: sender.public_key(),
                sender_sig: sender.sign(composer, 0)?,
                receiver_address: params.receiver.hash,
                nft_output_satoshis,
                op_return_script: op_return_script.clone(),
                change_address: change_address.hash,
                change_satoshis: composer.change_satoshis(),
                contract_input_index: 0,
                contract_tx_output_proof: TxOutputProof::empty(),
                operation: TokenOperation::Transfer,
            };
            composer.set_input_script(0, call.to_unlocking_script()?)
        })?;
        self.ctx.finalize(&mut composer, mode)?;
        Ok(composer)
    }

    async fn burn_plan(&self, cache: &mut RawTxCache<'_>, params: &NftBurnParams) -> Result<(NftUtxo, NftCheckContract)> {
        let unspent = match &params.nft_utxo {
            Some(unspent) => unspent.clone(),
            None => {
                let burn = Address::burn(self.ctx.network());
                let unspents = self.ctx.api.get_non_fungible_token_unspents(&params.codehash, &params.genesis, &burn).await?;
                unspents
                    .into_iter()
                    .find(|unspent| unspent.token_index == params.token_index)
                    .ok_or_else(|| Error::InvalidArgument(format!("NFT #{} of {} is not at the burn address", params.token_index, params.genesis)))?
            }
        };
        let nft_utxo = self.resolve_nft_utxo(cache, &params.codehash, &params.genesis, &unspent).await?;
        if !nft_utxo.nft_address.is_burn() {
            return Err(Error::CannotBurnNonZeroAddress(nft_utxo.utxo.outpoint));
        }
        let check = self.ctx.factory().nft_unlock_check(NftCheckDataPart { nft_code_hash: params.codehash, nft_id: params.genesis })?;
        Ok((nft_utxo, check))
    }

    fn route_burn(
        &self,
        nft_utxo: &NftUtxo,
        check: &NftCheckContract,
        fee_utxos: &[Utxo],
        options: &FeeOptions,
        mode: Mode,
    ) -> Result<(TxComposer, TxComposer)> {
        let change_address = self.ctx.change_address(options);
        self.ctx.compose_checked(&check.script_public_key(), fee_utxos, &change_address, mode, |check_tx, funding, mode| {
            self.build_burn(nft_utxo, check_tx, funding, options, mode)
        })
    }

    /// Inputs are the token, the funding output of the check transaction,
    /// then the check contract. Outputs are the optional `OP_RETURN` and change.
    fn build_burn(&self, nft_utxo: &NftUtxo, check_tx: &Transaction, funding: &Utxo, options: &FeeOptions, mode: Mode) -> Result<TxComposer> {
        let mut composer = self.ctx.composer();
        composer.append_input(&nft_utxo.utxo);
        composer.append_p2pkh_input(funding);
        let check_utxo = Utxo::from_output(check_tx, 0).ok_or_else(|| Error::custom("check transaction has no check output"))?;
        let check_index = composer.append_input(&check_utxo);
        let op_return_script = self.ctx.append_op_return(&mut composer, options)?;

        let info = &nft_utxo.satotx_info;
        let backtrace = Backtrace::new(info)?;
        let nft_output = output_proof(&info.tx, info.output_index as usize)?;
        let contract_tx_output_proof = output_proof(check_tx, 0)?;
        let change_address = self.ctx.change_address(options);
        let nft_script = nft_utxo.utxo.script_public_key.script().to_vec();

        self.ctx.converge(&mut composer, &change_address, 2, |composer| {
            let prevouts = composer.prevouts();
            let call = NftTokenUnlock {
                preimage: composer.get_input_preimage(0, SIG_HASH_ALL_FORK_ID)?,
                prevouts: prevouts.clone(),
                prev_nft_input_index: info.prev_input_index,
                prev_nft_address: info.prev_token_address,
                nft_tx_header: backtrace.header.clone(),
                nft_tx_input_proof: backtrace.input_proof.clone(),
                prev_nft_tx_output_proof: backtrace.prev_output_proof.clone(),
                sender_pub_key: vec![],
                sender_sig: vec![],
                receiver_address: Hash160::ZERO,
                nft_output_satoshis: 0,
                op_return_script: op_return_script.clone(),
                change_address: change_address.hash,
                change_satoshis: composer.change_satoshis(),
                contract_input_index: check_index as u32,
                contract_tx_output_proof: contract_tx_output_proof.clone(),
                operation: TokenOperation::UnlockFromContract,
            };
            composer.set_input_script(0, call.to_unlocking_script()?)?;

            let call = NftUnlockCheckUnlock {
                preimage: composer.get_input_preimage(check_index, SIG_HASH_ALL_FORK_ID)?,
                prevouts,
                nft_input_index: 0,
                nft_script: nft_script.clone(),
                nft_tx_header: nft_output.tx_header.clone(),
                nft_tx_hash_proof: nft_output.hash_proof.clone(),
                nft_tx_satoshi_bytes: nft_output.satoshi_bytes.clone(),
                n_outputs: composer.output_count() as u32,
                nft_output_index: -1,
                nft_output_address: Hash160::ZERO,
                nft_output_satoshis: 0,
                other_output_array: other_outputs_array(&composer.tx().outputs),
            };
            composer.set_input_script(check_index, call.to_unlocking_script()?)
        })?;
        self.ctx.finalize(&mut composer, mode)?;
        Ok(composer)
    }
}

fn anchor(contract: &NftContract, sensible_id: &SensibleId) -> Result<NftContract> {
    let current = contract.data_part().sensible_id;
    if current.is_zero() {
        return Ok(contract.with_data_part(|data| data.sensible_id = *sensible_id)?);
    }
    if current != *sensible_id {
        return Err(Error::InvalidArgument(format!("genesis contract is anchored to {current}, not {sensible_id}")));
    }
    Ok(contract.clone())
}

/// Recognizes the previous state of a token of `genesis`: the same token
/// in an earlier output, or the genesis contract that issued it. Genesis
/// states match any index when `token_index` is `None`.
fn ancestor_matcher(
    genesis_codehash: Hash160,
    codehash: Hash160,
    genesis: Hash160,
    token_index: Option<u64>,
) -> impl Fn(&TransactionOutpoint, &[u8]) -> Option<(Hash160, u64)> {
    move |outpoint, script| {
        let code = nft::query_codehash(script);
        if code == codehash && nft::query_genesis(script) == genesis && Some(nft::get_token_index(script)) == token_index {
            return Some((nft::get_nft_address(script), 0));
        }
        if code == genesis_codehash {
            let mut data = NftDataPart::decode(script);
            if data.sensible_id.is_zero() {
                data.sensible_id = SensibleId::from(*outpoint);
            }
            if data.genesis_id().ok() == Some(genesis) && token_index.is_none_or(|index| index == data.token_index) {
                return Some((data.nft_address, 0));
            }
        }
        None
    }
}

fn check_token(config: &ProtocolConfig, codehash: &Hash160) -> Result<()> {
    match config.kind_of(codehash) {
        Some(ContractKind::NftToken) => Ok(()),
        _ => Err(Error::InvalidArgument(format!("{codehash} is not the code hash of a non-fungible token"))),
    }
}

fn check_supply(params: &NftGenesisParams) -> Result<()> {
    if params.total_supply == 0 {
        return Err(Error::InvalidArgument("total supply must be positive".into()));
    }
    Ok(())
}

fn check_burn(config: &ProtocolConfig, params: &NftBurnParams) -> Result<()> {
    check_token(config, &params.codehash)?;
    match &params.nft_utxo {
        Some(unspent) if !unspent.nft_address.is_burn() => Err(Error::CannotBurnNonZeroAddress(unspent.outpoint())),
        Some(unspent) if unspent.token_index != params.token_index => {
            Err(Error::InvalidArgument(format!("UTXO {} holds NFT #{}, not #{}", unspent.outpoint(), unspent.token_index, params.token_index)))
        }
        _ => Ok(()),
    }
}
