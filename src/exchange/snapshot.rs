use crate::exchange::AccountSource;
use crate::models::{BalanceSnapshot, PositionInfo};
use crate::Result;
use tracing::warn;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AccountSnapshot {
    pub spot: BalanceSnapshot,
    pub derivatives: BalanceSnapshot,
    pub positions: Vec<PositionInfo>,
}

/// Fetches every part of an account. A failed part is logged and left empty.
pub fn collect_snapshot<S: AccountSource + ?Sized>(label: &str, source: &S) -> AccountSnapshot {
    AccountSnapshot {
        spot: or_empty(label, "spot balances", source.fetch_spot_balances()),
        derivatives: or_empty(
            label,
            "derivative balances",
            source.fetch_derivative_balances(),
        ),
        positions: or_empty(label, "open positions", source.fetch_open_positions()),
    }
}

fn or_empty<T: Default>(label: &str, what: &str, result: Result<T>) -> T {
    match result {
        Ok(value) => value,
        Err(err) => {
            warn!(account = %label, error = %err.message, "fetch {what} failed");
            T::default()
        }
    }
}
