pub mod binance;
pub mod snapshot;

use crate::models::{BalanceSnapshot, PositionInfo};
use crate::Result;
use rust_decimal::Decimal;

/// Spot conversion rate between two assets.
pub trait PriceOracle {
    fn fetch_price(&self, base: &str, quote: &str) -> Result<Decimal>;
}

/// One authenticated account. Each call may fail independently.
pub trait AccountSource: PriceOracle {
    fn fetch_spot_balances(&self) -> Result<BalanceSnapshot>;
    fn fetch_derivative_balances(&self) -> Result<BalanceSnapshot>;
    fn fetch_open_positions(&self) -> Result<Vec<PositionInfo>>;
}
