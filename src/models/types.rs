use crate::{Error, Result};
use chrono::{DateTime, FixedOffset};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::BTreeMap;
use std::fmt;

pub const TOTAL_KEY: &str = "TOTAL";
pub const UNREALIZED_PNL_KEY: &str = "UnrealizedPNL";

/// Asset symbol to quantity, one account at one point in time.
pub type BalanceSnapshot = BTreeMap<String, Decimal>;

/// Rounds to two places, midpoint away from zero.
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[derive(Clone, Debug, PartialEq)]
pub struct AssetAmount {
    pub asset: String,
    pub quantity: Decimal,
}

impl AssetAmount {
    pub fn new(asset: impl Into<String>, quantity: Decimal) -> Result<Self> {
        let asset = asset.into();
        if asset.trim().is_empty() {
            return Err(Error::new("asset symbol must be set"));
        }
        if quantity.is_sign_negative() {
            return Err(Error::new("wallet quantity must be non-negative"));
        }
        Ok(Self { asset, quantity })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PositionInfo {
    pub symbol: String,
    pub position_amt: Decimal,
    pub unrealized_pnl: Decimal,
}

#[derive(Clone, PartialEq, Eq)]
pub struct AccountCredential {
    pub label: String,
    pub api_key: String,
    pub api_secret: String,
}

impl AccountCredential {
    pub fn new(
        label: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Self {
        Self {
            label: label.into(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.api_key.trim().is_empty() && !self.api_secret.trim().is_empty()
    }
}

impl fmt::Debug for AccountCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountCredential")
            .field("label", &self.label)
            .field("api_key", &mask(&self.api_key))
            .field("api_secret", &"***")
            .finish()
    }
}

fn mask(value: &str) -> String {
    let visible: String = value.chars().take(4).collect();
    if value.chars().count() <= 4 {
        "***".to_string()
    } else {
        format!("{visible}***")
    }
}

/// Quote-currency valuation of one account.
///
/// `assets` holds one rounded value per asset. `total` and `unrealized_pnl`
/// back the synthetic `TOTAL` and `UnrealizedPNL` keys of the mapping view.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConvertedBalance {
    pub assets: BTreeMap<String, Decimal>,
    pub total: Decimal,
    pub unrealized_pnl: Decimal,
}

impl ConvertedBalance {
    pub fn get(&self, key: &str) -> Option<Decimal> {
        match key {
            TOTAL_KEY => Some(self.total),
            UNREALIZED_PNL_KEY => Some(self.unrealized_pnl),
            _ => self.assets.get(key).copied(),
        }
    }

    /// Every entry of the mapping view: assets in symbol order, then `TOTAL`,
    /// then `UnrealizedPNL`.
    pub fn entries(&self) -> Vec<(&str, Decimal)> {
        let mut entries: Vec<(&str, Decimal)> = self
            .assets
            .iter()
            .map(|(asset, value)| (asset.as_str(), *value))
            .collect();
        entries.push((TOTAL_KEY, self.total));
        entries.push((UNREALIZED_PNL_KEY, self.unrealized_pnl));
        entries
    }
}

impl Serialize for ConvertedBalance {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let entries = self.entries();
        let mut map = serializer.serialize_map(Some(entries.len()))?;
        for (key, value) in entries {
            map.serialize_entry(key, &value)?;
        }
        map.end()
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct AccountReport {
    pub label: String,
    pub balance: ConvertedBalance,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct Report {
    pub generated_at: DateTime<FixedOffset>,
    pub timezone_label: String,
    pub quote_asset: String,
    pub accounts: Vec<AccountReport>,
    pub grand_total: Decimal,
}
