use crate::{
    api::{FungibleTokenUnspent, UnspentOutput},
    error::Error,
    result::Result,
};
use itertools::Itertools;
use sensible_contracts::tier::MAX_TOKEN_INPUTS;
use std::cmp::Reverse;

/// Most P2PKH inputs an operation spending token contracts may use.
pub const FEE_UTXO_LIMIT: usize = 3;

/// Picks the fee paying outputs of an operation. Outputs supplied by the
/// caller are used as given; outputs listed by the indexer are narrowed to
/// the largest ones.
pub fn select_fee_utxos(utxos: Vec<UnspentOutput>, supplied: bool) -> Result<Vec<UnspentOutput>> {
    if supplied {
        if utxos.len() > FEE_UTXO_LIMIT {
            return Err(Error::TooManyFeeUtxos { count: utxos.len(), max: FEE_UTXO_LIMIT });
        }
        return Ok(utxos);
    }
    Ok(utxos.into_iter().sorted_by_key(|utxo| Reverse(utxo.satoshis)).take(FEE_UTXO_LIMIT).collect())
}

/// Picks token outputs covering `needed`, in the order received. A merge
/// takes every output up to the largest tier.
pub fn select_ft_utxos(utxos: Vec<FungibleTokenUnspent>, needed: u128, merge: bool) -> Result<Vec<FungibleTokenUnspent>> {
    if merge {
        return Ok(utxos.into_iter().take(MAX_TOKEN_INPUTS).collect());
    }

    let available: u128 = utxos.iter().map(|utxo| utxo.token_amount as u128).sum();
    if available < needed {
        return Err(Error::InsufficientToken { needed, available });
    }

    let mut selected = Vec::new();
    let mut total = 0u128;
    for utxo in utxos {
        if total >= needed && !selected.is_empty() {
            break;
        }
        total += utxo.token_amount as u128;
        selected.push(utxo);
    }
    if selected.len() > MAX_TOKEN_INPUTS {
        return Err(Error::TooManyTokenUtxos(selected.len()));
    }
    Ok(selected)
}
