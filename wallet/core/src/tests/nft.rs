use super::*;
use crate::{
    error::Error,
    token::{FeeOptions, GenesisResult, NftBurnParams, NftGenesisParams, NftMintParams, NftTransferParams},
    tx::DUST_FLOOR,
};
use sensible_consensus_core::tx::TransactionOutpoint;
use sensible_contracts::{ContractKind, nft};
use sensible_hashes::Hash;

fn mint_params(genesis: &GenesisResult, receiver: Address) -> NftMintParams {
    NftMintParams {
        sensible_id: genesis.sensible_id,
        genesis_key: key(1),
        receiver,
        metaid_outpoint: TransactionOutpoint::new(Hash::from_bytes([7; 32]), 1),
    }
}

async fn collection(fixture: &Fixture, total_supply: u64) -> GenesisResult {
    let params = NftGenesisParams { total_supply, genesis_key: key(1) };
    fixture.nft().genesis(params, FeeOptions::default()).await.unwrap()
}

#[tokio::test]
async fn test_mint_until_supply_is_exhausted() {
    let fixture = Fixture::new();
    let nft = fixture.nft();
    let alice = key(2).address();
    let genesis = collection(&fixture, 46).await;
    fixture.assert_fee_rate(&genesis.tx);
    assert_eq!(genesis.codehash, fixture.config.code_hash(ContractKind::NftToken).unwrap());

    for index in 0..46 {
        let minted = nft.mint(mint_params(&genesis, alice), FeeOptions::default()).await.unwrap();
        fixture.assert_fee_rate(&minted.tx);
        assert_eq!(minted.token_index, index);
        // the last token no longer re-emits the genesis contract
        let expected_output = if index == 45 { 0 } else { 1 };
        assert_eq!(minted.token_output_index, expected_output, "token {index}");

        let script = minted.tx.tx.outputs[minted.token_output_index].script_public_key.script();
        assert_eq!(nft::get_token_index(script), index);
        assert_eq!(nft::get_nft_address(script), alice.hash);
        assert_eq!(nft::query_genesis(script), genesis.genesis);
    }
    let result = nft.mint(mint_params(&genesis, alice), FeeOptions::default()).await;
    assert!(matches!(result, Err(Error::FixedTokenSupply)));

    let summary = nft.get_summary(&alice).await.unwrap();
    assert_eq!(summary.len(), 1);
    assert_eq!((summary[0].codehash, summary[0].genesis, summary[0].count), (genesis.codehash, genesis.genesis, 46));
    assert_eq!(summary[0].sensible_id, genesis.sensible_id);
}

#[tokio::test]
async fn test_genesis_and_mint_rejections() {
    let fixture = Fixture::new();
    let nft = fixture.nft();

    let params = NftGenesisParams { total_supply: 0, genesis_key: key(1) };
    assert!(matches!(nft.genesis(params, FeeOptions::default()).await, Err(Error::InvalidArgument(_))));

    let genesis = collection(&fixture, 10).await;
    let params = NftMintParams { genesis_key: key(9), ..mint_params(&genesis, key(2).address()) };
    assert!(matches!(nft.mint(params, FeeOptions::default()).await, Err(Error::InvalidArgument(_))));
}

#[tokio::test]
async fn test_transfer() {
    let fixture = Fixture::new();
    let nft = fixture.nft();
    let (alice, bob) = (key(2), key(3).address());
    let genesis = collection(&fixture, 5).await;
    nft.mint(mint_params(&genesis, alice.address()), FeeOptions::default()).await.unwrap();
    nft.mint(mint_params(&genesis, alice.address()), FeeOptions::default()).await.unwrap();

    let params = NftTransferParams { codehash: genesis.codehash, genesis: genesis.genesis, token_index: 1, sender_key: alice, receiver: bob };
    let tx = nft.transfer(params.clone(), FeeOptions::default()).await.unwrap();
    fixture.assert_fee_rate(&tx);
    let script = tx.tx.outputs[0].script_public_key.script();
    assert_eq!(nft::get_nft_address(script), bob.hash);
    assert_eq!(nft::get_token_index(script), 1);

    let held = fixture.indexer.get_non_fungible_token_unspents(&genesis.codehash, &genesis.genesis, &bob).await.unwrap();
    assert_eq!(held.iter().map(|unspent| unspent.token_index).collect::<Vec<_>>(), vec![1]);
    assert_eq!(held[0].metaid_outpoint, mint_params(&genesis, bob).metaid_outpoint);
    assert_eq!(nft.get_summary(&alice.address()).await.unwrap()[0].count, 1);

    // the token was already sent
    assert!(matches!(nft.transfer(params.clone(), FeeOptions::default()).await, Err(Error::InvalidArgument(_))));

    let params = NftTransferParams { sender_key: key(3), receiver: alice.address(), ..params };
    let needed = nft.estimate_transfer(&params, &FeeOptions::default(), 1).await.unwrap();
    let utxo = fixture.indexer.fund(&fixture.purse_address(), needed);
    let tx = nft.transfer(params, FeeOptions { utxos: Some(vec![utxo]), ..Default::default() }).await.unwrap();
    fixture.assert_fee_rate(&tx);
    assert_eq!(nft.get_summary(&alice.address()).await.unwrap()[0].count, 2);
}

#[tokio::test]
async fn test_burn() {
    let fixture = Fixture::new();
    let nft = fixture.nft();
    let alice = key(2);
    let burn = Address::burn(Network::Testnet);
    let genesis = collection(&fixture, 5).await;
    nft.mint(mint_params(&genesis, alice.address()), FeeOptions::default()).await.unwrap();

    let held = fixture.indexer.get_non_fungible_token_unspents(&genesis.codehash, &genesis.genesis, &alice.address()).await.unwrap();
    let params = NftBurnParams { codehash: genesis.codehash, genesis: genesis.genesis, token_index: 0, nft_utxo: Some(held[0].clone()) };
    let result = nft.burn(params, FeeOptions::default()).await;
    assert!(matches!(result, Err(Error::CannotBurnNonZeroAddress(outpoint)) if outpoint == held[0].outpoint()));

    let params = NftBurnParams { codehash: genesis.codehash, genesis: genesis.genesis, token_index: 0, nft_utxo: None };
    assert!(matches!(nft.burn(params.clone(), FeeOptions::default()).await, Err(Error::InvalidArgument(_))));

    let transfer = NftTransferParams { codehash: genesis.codehash, genesis: genesis.genesis, token_index: 0, sender_key: alice, receiver: burn };
    nft.transfer(transfer, FeeOptions::default()).await.unwrap();

    let needed = nft.estimate_burn(&params, &FeeOptions::default(), 1).await.unwrap();
    assert!(needed > DUST_FLOOR);
    let result = nft.burn(params, FeeOptions::default()).await.unwrap();
    fixture.assert_fee_rate(&result.check_tx);
    fixture.assert_fee_rate(&result.tx);

    let check_code = fixture.config.code_part(ContractKind::NftUnlockCheck).unwrap();
    assert!(result.check_tx.tx.outputs[0].script_public_key.script().starts_with(&check_code));
    let tx = &result.tx.tx;
    assert_eq!(tx.inputs.len(), 3);
    assert_eq!(tx.inputs[1].previous_outpoint, TransactionOutpoint::new(result.check_tx.txid, 1));
    assert_eq!(tx.inputs[2].previous_outpoint, TransactionOutpoint::new(result.check_tx.txid, 0));
    assert_eq!(tx.outputs.len(), 1);
    assert!(fixture.indexer.get_non_fungible_token_unspents(&genesis.codehash, &genesis.genesis, &burn).await.unwrap().is_empty());
}
