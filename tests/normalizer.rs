use coinboard::core::normalizer::{convert_asset, merge_balances, normalize, positions_by_asset};
use coinboard::core::Conversion;
use coinboard::exchange::PriceOracle;
use coinboard::models::{BalanceSnapshot, PositionInfo};
use coinboard::{Error, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Default)]
struct FixedPrices {
    prices: HashMap<String, Decimal>,
    calls: AtomicUsize,
    asked: std::sync::Mutex<Vec<String>>,
}

impl FixedPrices {
    fn with(prices: &[(&str, Decimal)]) -> Self {
        Self {
            prices: prices
                .iter()
                .map(|(asset, price)| (asset.to_string(), *price))
                .collect(),
            ..Self::default()
        }
    }
}

impl PriceOracle for FixedPrices {
    fn fetch_price(&self, base: &str, quote: &str) -> Result<Decimal> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.asked.lock().expect("lock").push(base.to_string());
        self.prices
            .get(base)
            .copied()
            .ok_or_else(|| Error::new(format!("no pair {base}{quote}")))
    }
}

fn snapshot(entries: &[(&str, Decimal)]) -> BalanceSnapshot {
    entries
        .iter()
        .map(|(asset, quantity)| (asset.to_string(), *quantity))
        .collect()
}

fn pnl(entries: &[(&str, Decimal)]) -> BTreeMap<String, Decimal> {
    entries
        .iter()
        .map(|(asset, value)| (asset.to_string(), *value))
        .collect()
}

#[test]
fn single_spot_asset_is_priced_in_quote() {
    let oracle = FixedPrices::with(&[("BTC", dec!(50000))]);
    let result = normalize(
        &snapshot(&[("BTC", dec!(1.0))]),
        &BalanceSnapshot::new(),
        &BTreeMap::new(),
        "USDT",
        &oracle,
    );

    assert_eq!(result.get("BTC"), Some(dec!(50000.00)));
    assert_eq!(result.get("TOTAL"), Some(dec!(50000.00)));
    assert_eq!(result.get("UnrealizedPNL"), Some(dec!(0.00)));
    assert_eq!(result.assets.len(), 1);
}

#[test]
fn derivative_wallet_overrides_spot_for_same_asset() {
    let oracle = FixedPrices::default();
    let result = normalize(
        &snapshot(&[("USDT", dec!(100.0))]),
        &snapshot(&[("USDT", dec!(50.0))]),
        &BTreeMap::new(),
        "USDT",
        &oracle,
    );

    assert_eq!(result.get("USDT"), Some(dec!(50.00)));
    assert_eq!(result.total, dec!(50.00));
    assert_eq!(result.unrealized_pnl, dec!(0.00));
    assert_eq!(oracle.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn position_pnl_folds_into_existing_asset() {
    let oracle = FixedPrices::with(&[("ETH", dec!(2000))]);
    let positions = positions_by_asset(
        &[PositionInfo {
            symbol: "ETHUSDT".to_string(),
            position_amt: dec!(1),
            unrealized_pnl: dec!(25.5),
        }],
        "USDT",
    );
    let result = normalize(
        &snapshot(&[("ETH", dec!(2.0))]),
        &BalanceSnapshot::new(),
        &positions,
        "USDT",
        &oracle,
    );

    assert_eq!(result.get("ETH"), Some(dec!(4025.50)));
    assert_eq!(result.total, dec!(4025.50));
    assert_eq!(result.unrealized_pnl, dec!(25.50));
}

#[test]
fn position_without_balance_creates_pnl_only_entry() {
    let oracle = FixedPrices::default();
    let result = normalize(
        &snapshot(&[("USDT", dec!(1000))]),
        &BalanceSnapshot::new(),
        &pnl(&[("SOL", dec!(-12.34))]),
        "USDT",
        &oracle,
    );

    assert_eq!(result.get("SOL"), Some(dec!(-12.34)));
    assert_eq!(result.total, dec!(987.66));
    assert_eq!(result.unrealized_pnl, dec!(-12.34));
}

#[test]
fn failed_price_lookup_excludes_asset() {
    let oracle = FixedPrices::with(&[("BTC", dec!(100))]);
    let result = normalize(
        &snapshot(&[("BTC", dec!(2)), ("LDBNB", dec!(5))]),
        &BalanceSnapshot::new(),
        &BTreeMap::new(),
        "USDT",
        &oracle,
    );

    assert_eq!(result.get("LDBNB"), None);
    assert_eq!(result.get("BTC"), Some(dec!(200.00)));
    assert_eq!(result.total, dec!(200.00));
}

#[test]
fn failed_price_lookup_with_position_keeps_only_pnl() {
    let oracle = FixedPrices::default();
    let result = normalize(
        &snapshot(&[("XRP", dec!(300))]),
        &BalanceSnapshot::new(),
        &pnl(&[("XRP", dec!(4.2))]),
        "USDT",
        &oracle,
    );

    assert_eq!(result.get("XRP"), Some(dec!(4.20)));
    assert_eq!(result.total, dec!(4.20));
}

#[test]
fn total_sums_rounded_asset_values() {
    // 0.005 and 0.005 round up to 0.01 each; unrounded they sum to 0.01.
    let oracle = FixedPrices::with(&[("AAA", dec!(0.001)), ("BBB", dec!(0.001))]);
    let result = normalize(
        &snapshot(&[("AAA", dec!(5)), ("BBB", dec!(5))]),
        &BalanceSnapshot::new(),
        &BTreeMap::new(),
        "USDT",
        &oracle,
    );

    assert_eq!(result.get("AAA"), Some(dec!(0.01)));
    assert_eq!(result.get("BBB"), Some(dec!(0.01)));
    assert_eq!(result.total, dec!(0.02));
}

#[test]
fn total_equals_rounded_values_plus_pnl() {
    let oracle = FixedPrices::with(&[("BTC", dec!(43210.987)), ("ETH", dec!(2345.678))]);
    let positions = pnl(&[("BTC", dec!(-100.25)), ("DOGE", dec!(3.10))]);
    let result = normalize(
        &snapshot(&[("BTC", dec!(0.1234)), ("USDT", dec!(10.555))]),
        &snapshot(&[("ETH", dec!(1.5))]),
        &positions,
        "USDT",
        &oracle,
    );

    let rounded: Decimal = [
        dec!(5332.24), // 0.1234 * 43210.987 = 5332.2357958
        dec!(3518.52), // 1.5 * 2345.678 = 3518.517
        dec!(10.56),
    ]
    .iter()
    .sum();
    let pnl_total = dec!(-100.25) + dec!(3.10);
    assert_eq!(result.total, rounded + pnl_total);
    assert_eq!(result.unrealized_pnl, dec!(-97.15));
    assert_eq!(result.get("BTC"), Some(dec!(5231.99)));
    assert_eq!(result.get("DOGE"), Some(dec!(3.10)));
}

#[test]
fn non_positive_quantities_are_dropped() {
    let oracle = FixedPrices::with(&[("BTC", dec!(100)), ("ETH", dec!(10))]);
    let result = normalize(
        &snapshot(&[("BTC", dec!(0)), ("ETH", dec!(1))]),
        &snapshot(&[("BNB", dec!(-3))]),
        &BTreeMap::new(),
        "USDT",
        &oracle,
    );

    assert_eq!(result.assets.keys().collect::<Vec<_>>(), vec!["ETH"]);
    assert_eq!(*oracle.asked.lock().expect("lock"), vec!["ETH".to_string()]);
}

#[test]
fn normalize_is_idempotent() {
    let oracle = FixedPrices::with(&[("BTC", dec!(61234.5)), ("ETH", dec!(3012.25))]);
    let spot = snapshot(&[("BTC", dec!(0.75)), ("USDT", dec!(99.999))]);
    let derivatives = snapshot(&[("ETH", dec!(3))]);
    let positions = pnl(&[("ETH", dec!(1.11))]);

    let first = normalize(&spot, &derivatives, &positions, "USDT", &oracle);
    let second = normalize(&spot, &derivatives, &positions, "USDT", &oracle);
    assert_eq!(first, second);
}

#[test]
fn quote_asset_is_not_priced() {
    let oracle = FixedPrices::default();
    let conversion = convert_asset("USDT", dec!(12.5), "USDT", &oracle);
    assert_eq!(conversion, Conversion::Priced(dec!(12.5)));
    assert_eq!(oracle.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn missing_pair_is_skipped_with_reason() {
    let oracle = FixedPrices::default();
    match convert_asset("FOO", dec!(1), "USDT", &oracle) {
        Conversion::Skipped(reason) => assert!(reason.contains("FOOUSDT")),
        other => panic!("expected skip, got {other:?}"),
    }
}

#[test]
fn merge_copies_base_then_applies_overlay() {
    let merged = merge_balances(
        &snapshot(&[("BTC", dec!(1)), ("USDT", dec!(100))]),
        &snapshot(&[("USDT", dec!(40)), ("BNB", dec!(2))]),
    );
    assert_eq!(merged, snapshot(&[("BNB", dec!(2)), ("BTC", dec!(1)), ("USDT", dec!(40))]));
}

#[test]
fn positions_are_keyed_by_base_asset() {
    let positions = positions_by_asset(
        &[
            PositionInfo {
                symbol: "BTCUSDT".to_string(),
                position_amt: dec!(-0.5),
                unrealized_pnl: dec!(12.345),
            },
            PositionInfo {
                symbol: "ETHUSDT".to_string(),
                position_amt: dec!(0),
                unrealized_pnl: dec!(99),
            },
            PositionInfo {
                symbol: "ETHBTC".to_string(),
                position_amt: dec!(1),
                unrealized_pnl: dec!(1),
            },
        ],
        "USDT",
    );

    assert_eq!(positions.get("BTC"), Some(&dec!(12.35)));
    assert_eq!(positions.get("ETH"), None);
    assert_eq!(positions.get("ETHBTC"), Some(&dec!(1)));
}

#[test]
fn later_position_for_same_asset_wins() {
    let positions = positions_by_asset(
        &[
            PositionInfo {
                symbol: "BTCUSDT".to_string(),
                position_amt: dec!(1),
                unrealized_pnl: dec!(10),
            },
            PositionInfo {
                symbol: "BTCUSDT".to_string(),
                position_amt: dec!(-1),
                unrealized_pnl: dec!(-4),
            },
        ],
        "USDT",
    );
    assert_eq!(positions.get("BTC"), Some(&dec!(-4)));
}
