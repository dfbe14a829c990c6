//! Coin selection strategies.

use crate::ledger::types::{TxBuildError, TxBuildResult, Utxo};

/// Chooses which wallet outputs fund a transaction.
///
/// Implementations may return several inputs; the builder always produces a
/// single change output back to the wallet.
pub trait CoinSelector: Send + Sync {
    fn select(&self, utxos: &[Utxo]) -> TxBuildResult<Vec<Utxo>>;

    fn name(&self) -> &'static str;
}

/// Spend the first listed output.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstAvailable;

impl CoinSelector for FirstAvailable {
    fn select(&self, utxos: &[Utxo]) -> TxBuildResult<Vec<Utxo>> {
        utxos
            .first()
            .cloned()
            .map(|utxo| vec![utxo])
            .ok_or_else(|| TxBuildError::InsufficientFunds("wallet has no UTxOs".to_string()))
    }

    fn name(&self) -> &'static str {
        "first_available"
    }
}

/// Spend the single largest output.
#[derive(Debug, Clone, Copy, Default)]
pub struct LargestFirst;

impl CoinSelector for LargestFirst {
    fn select(&self, utxos: &[Utxo]) -> TxBuildResult<Vec<Utxo>> {
        utxos
            .iter()
            .max_by_key(|u| u.amount)
            .cloned()
            .map(|utxo| vec![utxo])
            .ok_or_else(|| TxBuildError::InsufficientFunds("wallet has no UTxOs".to_string()))
    }

    fn name(&self) -> &'static str {
        "largest_first"
    }
}
