use crate::exchange::PriceOracle;
use crate::models::{round2, BalanceSnapshot, ConvertedBalance, PositionInfo};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Outcome of valuing one asset in the quote currency.
#[derive(Clone, Debug, PartialEq)]
pub enum Conversion {
    Priced(Decimal),
    Skipped(String),
}

/// Copies `base`, then applies `overlay` on top. Overlay entries win for
/// shared symbols. Non-positive quantities are dropped from both sides.
pub fn merge_balances(base: &BalanceSnapshot, overlay: &BalanceSnapshot) -> BalanceSnapshot {
    let mut merged: BalanceSnapshot = base
        .iter()
        .filter(|(_, quantity)| **quantity > Decimal::ZERO)
        .map(|(asset, quantity)| (asset.clone(), *quantity))
        .collect();
    for (asset, quantity) in overlay {
        if *quantity > Decimal::ZERO {
            merged.insert(asset.clone(), *quantity);
        }
    }
    merged
}

/// Keys open positions by base asset, stripping the quote suffix from the
/// pair symbol. Zero-size positions are dropped and PnL is rounded to cents.
/// Later entries for the same asset replace earlier ones.
pub fn positions_by_asset(positions: &[PositionInfo], quote: &str) -> BTreeMap<String, Decimal> {
    let mut result = BTreeMap::new();
    for position in positions {
        if position.position_amt.is_zero() {
            continue;
        }
        let asset = position
            .symbol
            .strip_suffix(quote)
            .filter(|asset| !asset.is_empty())
            .unwrap_or(&position.symbol);
        result.insert(asset.to_string(), round2(position.unrealized_pnl));
    }
    result
}

pub fn convert_asset<O: PriceOracle + ?Sized>(
    asset: &str,
    quantity: Decimal,
    quote: &str,
    oracle: &O,
) -> Conversion {
    if asset == quote {
        return Conversion::Priced(quantity);
    }
    match oracle.fetch_price(asset, quote) {
        Ok(price) => match quantity.checked_mul(price) {
            Some(value) => Conversion::Priced(value),
            None => Conversion::Skipped(format!("{asset} value overflows at price {price}")),
        },
        Err(err) => Conversion::Skipped(err.message),
    }
}

/// Values an account in `quote`.
///
/// Each asset value is rounded to cents before it is added to the total, so
/// the total is the sum of the rounded values. Assets whose price cannot be
/// fetched are left out. Position PnL is added to the total and to the
/// matching asset entry, creating the entry when the asset has no balance.
pub fn normalize<O: PriceOracle + ?Sized>(
    spot: &BalanceSnapshot,
    derivatives: &BalanceSnapshot,
    positions: &BTreeMap<String, Decimal>,
    quote: &str,
    oracle: &O,
) -> ConvertedBalance {
    let merged = merge_balances(spot, derivatives);

    let mut assets = BTreeMap::new();
    let mut total = Decimal::ZERO;
    for (asset, quantity) in &merged {
        match convert_asset(asset, *quantity, quote, oracle) {
            Conversion::Priced(value) => {
                let value = round2(value);
                debug!(asset = %asset, quantity = %quantity, value = %value, "asset converted");
                assets.insert(asset.clone(), value);
                total += value;
            }
            Conversion::Skipped(reason) => {
                warn!(asset = %asset, reason = %reason, "price lookup failed, asset skipped");
            }
        }
    }

    let mut unrealized_pnl = Decimal::ZERO;
    for (asset, pnl) in positions {
        unrealized_pnl += *pnl;
        total += *pnl;
        let entry = assets.entry(asset.clone()).or_insert(Decimal::ZERO);
        *entry = round2(*entry + *pnl);
    }

    ConvertedBalance {
        assets,
        total: round2(total),
        unrealized_pnl: round2(unrealized_pnl),
    }
}
