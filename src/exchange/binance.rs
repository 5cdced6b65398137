use crate::exchange::{AccountSource, PriceOracle};
use crate::models::{AccountCredential, AssetAmount, BalanceSnapshot, PositionInfo};
use crate::{Error, Result};
use hmac::{Hmac, Mac};
use reqwest::blocking::Client;
use reqwest::Method;
use rust_decimal::Decimal;
use serde_json::Value;
use sha2::Sha256;
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone, Debug)]
pub struct BinanceConfig {
    pub spot_base_url: String,
    pub futures_base_url: String,
    pub recv_window: u64,
    pub timeout_secs: u64,
}

/// Spot and USD-M futures views of one Binance account.
pub struct BinanceAccount {
    client: Client,
    config: BinanceConfig,
    api_key: String,
    api_secret: String,
}

impl BinanceAccount {
    pub fn new(config: BinanceConfig, credential: &AccountCredential) -> Result<Self> {
        if config.spot_base_url.trim().is_empty() {
            return Err(Error::new("spot_base_url must be set"));
        }
        if config.futures_base_url.trim().is_empty() {
            return Err(Error::new("futures_base_url must be set"));
        }
        if credential.api_key.trim().is_empty() {
            return Err(Error::new("api_key must be set"));
        }
        if credential.api_secret.trim().is_empty() {
            return Err(Error::new("api_secret must be set"));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|err| Error::new(format!("http client build failed: {err}")))?;
        Ok(Self {
            client,
            config,
            api_key: credential.api_key.clone(),
            api_secret: credential.api_secret.clone(),
        })
    }

    fn timestamp_ms() -> Result<u64> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| Error::new("system time before unix epoch"))?;
        Ok(now.as_millis() as u64)
    }

    pub fn hmac_sha256_hex(secret: &str, message: &str) -> Result<String> {
        let mut mac =
            HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| Error::new("invalid key"))?;
        mac.update(message.as_bytes());
        let result = mac.finalize().into_bytes();
        Ok(bytes_to_hex(&result))
    }

    fn signed_get(&self, base_url: &str, path: &str) -> Result<Value> {
        let mut params = vec![("timestamp".to_string(), Self::timestamp_ms()?.to_string())];
        if self.config.recv_window > 0 {
            params.push(("recvWindow".to_string(), self.config.recv_window.to_string()));
        }
        let query = build_query_string(&params);
        let signature = Self::hmac_sha256_hex(&self.api_secret, &query)?;
        let url = format!("{base_url}{path}?{query}&signature={signature}");

        let response = self
            .client
            .request(Method::GET, url)
            .header("X-MBX-APIKEY", self.api_key.as_str())
            .send()
            .map_err(|err| Error::new(format!("http request failed: {err}")))?;
        read_json(response)
    }

    fn public_get(&self, path: &str, params: Vec<(String, String)>) -> Result<Value> {
        let query = build_query_string(&params);
        let url = if query.is_empty() {
            format!("{}{}", self.config.spot_base_url, path)
        } else {
            format!("{}{}?{}", self.config.spot_base_url, path, query)
        };
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| Error::new(format!("http request failed: {err}")))?;
        read_json(response)
    }
}

impl PriceOracle for BinanceAccount {
    fn fetch_price(&self, base: &str, quote: &str) -> Result<Decimal> {
        let params = vec![("symbol".to_string(), format!("{base}{quote}"))];
        let json = self.public_get("/api/v3/ticker/price", params)?;
        parse_ticker_price(&json)
    }
}

impl AccountSource for BinanceAccount {
    fn fetch_spot_balances(&self) -> Result<BalanceSnapshot> {
        let json = self.signed_get(&self.config.spot_base_url, "/api/v3/account")?;
        parse_spot_balances(&json)
    }

    fn fetch_derivative_balances(&self) -> Result<BalanceSnapshot> {
        let json = self.signed_get(&self.config.futures_base_url, "/fapi/v2/account")?;
        parse_futures_wallet(&json)
    }

    fn fetch_open_positions(&self) -> Result<Vec<PositionInfo>> {
        let json = self.signed_get(&self.config.futures_base_url, "/fapi/v2/positionRisk")?;
        parse_position_risk(&json)
    }
}

/// `/api/v3/account`: positive `free` amounts keyed by asset.
pub fn parse_spot_balances(json: &Value) -> Result<BalanceSnapshot> {
    let balances = json
        .get("balances")
        .and_then(|value| value.as_array())
        .ok_or_else(|| Error::new("balances missing"))?;
    let mut amounts = Vec::with_capacity(balances.len());
    for balance in balances {
        let asset = balance
            .get("asset")
            .and_then(|value| value.as_str())
            .unwrap_or("");
        let free = field_decimal(balance, "free")?;
        amounts.push((asset, free));
    }
    Ok(collect_positive(amounts))
}

/// `/fapi/v2/account`: positive `walletBalance` amounts keyed by asset.
pub fn parse_futures_wallet(json: &Value) -> Result<BalanceSnapshot> {
    let assets = json
        .get("assets")
        .and_then(|value| value.as_array())
        .ok_or_else(|| Error::new("assets missing"))?;
    let mut amounts = Vec::with_capacity(assets.len());
    for item in assets {
        let asset = item
            .get("asset")
            .and_then(|value| value.as_str())
            .unwrap_or("");
        let wallet_balance = field_decimal(item, "walletBalance")?;
        amounts.push((asset, wallet_balance));
    }
    Ok(collect_positive(amounts))
}

pub fn parse_position_risk(json: &Value) -> Result<Vec<PositionInfo>> {
    let array = json
        .as_array()
        .ok_or_else(|| Error::new("positionRisk should be array"))?;
    let mut result = Vec::with_capacity(array.len());
    for item in array {
        let symbol = item
            .get("symbol")
            .and_then(|value| value.as_str())
            .unwrap_or("")
            .to_string();
        if symbol.is_empty() {
            continue;
        }
        result.push(PositionInfo {
            symbol,
            position_amt: field_decimal(item, "positionAmt")?,
            unrealized_pnl: field_decimal(item, "unRealizedProfit")?,
        });
    }
    Ok(result)
}

pub fn parse_ticker_price(json: &Value) -> Result<Decimal> {
    let price = json
        .get("price")
        .ok_or_else(|| Error::new("ticker price missing"))?;
    value_to_decimal(price)
}

fn collect_positive(amounts: Vec<(&str, Decimal)>) -> BalanceSnapshot {
    amounts
        .into_iter()
        .filter(|(_, quantity)| *quantity > Decimal::ZERO)
        .filter_map(|(asset, quantity)| AssetAmount::new(asset, quantity).ok())
        .map(|amount| (amount.asset, amount.quantity))
        .collect()
}

fn read_json(response: reqwest::blocking::Response) -> Result<Value> {
    if !response.status().is_success() {
        return Err(Error::new(format!(
            "binance response status: {}",
            response.status()
        )));
    }
    response
        .json::<Value>()
        .map_err(|err| Error::new(format!("json parse failed: {err}")))
}

fn build_query_string(params: &[(String, String)]) -> String {
    params
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<String>>()
        .join("&")
}

fn bytes_to_hex(bytes: &[u8]) -> String {
    let mut output = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        output.push_str(&format!("{:02x}", byte));
    }
    output
}

fn field_decimal(item: &Value, key: &str) -> Result<Decimal> {
    match item.get(key) {
        Some(value) => value_to_decimal(value).map_err(|err| Error::new(format!("{key}: {err}"))),
        None => Ok(Decimal::ZERO),
    }
}

fn value_to_decimal(value: &Value) -> Result<Decimal> {
    match value {
        Value::String(text) => Decimal::from_str(text.trim())
            .or_else(|_| Decimal::from_scientific(text.trim()))
            .map_err(|err| Error::new(format!("invalid decimal: {err}"))),
        Value::Number(number) => {
            let text = number.to_string();
            Decimal::from_str(&text)
                .or_else(|_| Decimal::from_scientific(&text))
                .map_err(|err| Error::new(format!("invalid decimal: {err}")))
        }
        _ => Err(Error::new("unexpected value type for decimal")),
    }
}
