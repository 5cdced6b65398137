use crate::models::AccountCredential;
use crate::{Error, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::Path;

const DEFAULT_ACCOUNT_COUNT: usize = 3;

#[derive(Clone, Debug)]
pub struct TimezoneConfig {
    pub offset_hours: i32,
    pub label: String,
}

#[derive(Clone, Debug)]
pub struct ExchangeConfig {
    pub spot_base_url: String,
    pub futures_base_url: String,
    pub recv_window: u64,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ReportConfig {
    pub max_workers: usize,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub addr: String,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub quote_asset: String,
    pub timezone: TimezoneConfig,
    pub exchange: ExchangeConfig,
    pub report: ReportConfig,
    pub server: ServerConfig,
    pub accounts: Vec<AccountCredential>,
}

#[derive(Clone, Debug, Deserialize)]
struct TimezoneConfigFile {
    offset_hours: Option<i32>,
    label: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
struct ExchangeConfigFile {
    spot_base_url: Option<String>,
    futures_base_url: Option<String>,
    recv_window: Option<u64>,
    timeout_secs: Option<u64>,
}

#[derive(Clone, Debug, Deserialize)]
struct ReportConfigFile {
    max_workers: Option<usize>,
}

#[derive(Clone, Debug, Deserialize)]
struct ServerConfigFile {
    addr: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
struct AccountConfigFile {
    label: Option<String>,
    api_key: Option<String>,
    api_secret: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
struct ConfigFile {
    quote_asset: Option<String>,
    timezone: Option<TimezoneConfigFile>,
    exchange: Option<ExchangeConfigFile>,
    report: Option<ReportConfigFile>,
    server: Option<ServerConfigFile>,
    accounts: Option<Vec<AccountConfigFile>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            quote_asset: "USDT".to_string(),
            timezone: TimezoneConfig {
                offset_hours: 9,
                label: "KST".to_string(),
            },
            exchange: ExchangeConfig {
                spot_base_url: "https://api.binance.com".to_string(),
                futures_base_url: "https://fapi.binance.com".to_string(),
                recv_window: 5000,
                timeout_secs: 10,
            },
            report: ReportConfig { max_workers: 4 },
            server: ServerConfig {
                addr: "0.0.0.0:5000".to_string(),
            },
            accounts: Vec::new(),
        }
    }
}

impl Config {
    /// Reads `path` when it exists, then applies environment overrides and
    /// validates the result.
    pub fn load(path: &str) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            let content = fs::read_to_string(path)
                .map_err(|err| Error::new(format!("failed to read config: {err}")))?;
            Config::from_toml(&content)?
        } else {
            Config::default()
        };
        config.fill_default_accounts();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(content)
            .map_err(|err| Error::new(format!("failed to parse config: {err}")))?;
        Ok(Config::from_file(file))
    }

    fn from_file(file: ConfigFile) -> Self {
        let mut config = Config::default();

        if let Some(quote_asset) = file.quote_asset {
            config.quote_asset = quote_asset;
        }

        if let Some(timezone) = file.timezone {
            if let Some(value) = timezone.offset_hours {
                config.timezone.offset_hours = value;
            }
            if let Some(value) = timezone.label {
                config.timezone.label = value;
            }
        }

        if let Some(exchange) = file.exchange {
            if let Some(value) = exchange.spot_base_url {
                config.exchange.spot_base_url = value;
            }
            if let Some(value) = exchange.futures_base_url {
                config.exchange.futures_base_url = value;
            }
            if let Some(value) = exchange.recv_window {
                config.exchange.recv_window = value;
            }
            if let Some(value) = exchange.timeout_secs {
                config.exchange.timeout_secs = value;
            }
        }

        if let Some(report) = file.report {
            if let Some(value) = report.max_workers {
                config.report.max_workers = value;
            }
        }

        if let Some(server) = file.server {
            if let Some(value) = server.addr {
                config.server.addr = value;
            }
        }

        if let Some(accounts) = file.accounts {
            config.accounts = accounts
                .into_iter()
                .enumerate()
                .map(|(index, account)| {
                    AccountCredential::new(
                        account.label.unwrap_or_else(|| default_label(index + 1)),
                        account.api_key.unwrap_or_default(),
                        account.api_secret.unwrap_or_default(),
                    )
                })
                .collect();
        }

        config
    }

    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(value) = read_string_env("COINBOARD_QUOTE_ASSET")? {
            self.quote_asset = value;
        }
        if let Some(value) = read_i32_env("COINBOARD_TZ_OFFSET_HOURS")? {
            self.timezone.offset_hours = value;
        }
        if let Some(value) = read_string_env("COINBOARD_TZ_LABEL")? {
            self.timezone.label = value;
        }
        if let Some(value) = read_string_env("COINBOARD_SPOT_BASE_URL")? {
            self.exchange.spot_base_url = value;
        }
        if let Some(value) = read_string_env("COINBOARD_FUTURES_BASE_URL")? {
            self.exchange.futures_base_url = value;
        }
        if let Some(value) = read_u64_env("COINBOARD_RECV_WINDOW")? {
            self.exchange.recv_window = value;
        }
        if let Some(value) = read_u64_env("COINBOARD_TIMEOUT_SECS")? {
            self.exchange.timeout_secs = value;
        }
        if let Some(value) = read_u64_env("COINBOARD_MAX_WORKERS")? {
            self.report.max_workers = value as usize;
        }
        if let Some(port) = read_u64_env("PORT")? {
            self.server.addr = replace_port(&self.server.addr, port);
        }
        if let Some(value) = read_string_env("COINBOARD_ADDR")? {
            self.server.addr = value;
        }
        self.apply_credential_env()
    }

    /// `BINANCE_API_KEY_<n>` / `BINANCE_SECRET_KEY_<n>` fill account `n`,
    /// padding the list with empty `Binance_<k>` accounts when it is shorter.
    /// Numbers `1..=DEFAULT_ACCOUNT_COUNT` are always read, gaps included;
    /// past that, scanning stops at the first `n` with neither variable set.
    fn apply_credential_env(&mut self) -> Result<()> {
        let mut number = 1;
        loop {
            let api_key = read_string_env(&format!("BINANCE_API_KEY_{number}"))?;
            let api_secret = read_string_env(&format!("BINANCE_SECRET_KEY_{number}"))?;
            if api_key.is_none() && api_secret.is_none() {
                if number >= DEFAULT_ACCOUNT_COUNT {
                    break;
                }
                number += 1;
                continue;
            }
            while self.accounts.len() < number {
                let next = self.accounts.len() + 1;
                self.accounts
                    .push(AccountCredential::new(default_label(next), "", ""));
            }
            let account = &mut self.accounts[number - 1];
            if let Some(value) = api_key {
                account.api_key = value;
            }
            if let Some(value) = api_secret {
                account.api_secret = value;
            }
            number += 1;
        }
        Ok(())
    }

    fn fill_default_accounts(&mut self) {
        if self.accounts.is_empty() {
            self.accounts = (1..=DEFAULT_ACCOUNT_COUNT)
                .map(|number| AccountCredential::new(default_label(number), "", ""))
                .collect();
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.quote_asset.trim().is_empty() {
            return Err(Error::new("quote_asset must be set"));
        }
        if !(-14..=14).contains(&self.timezone.offset_hours) {
            return Err(Error::new("timezone.offset_hours must be in [-14, 14]"));
        }
        if self.exchange.spot_base_url.trim().is_empty() {
            return Err(Error::new("exchange.spot_base_url must be set"));
        }
        if self.exchange.futures_base_url.trim().is_empty() {
            return Err(Error::new("exchange.futures_base_url must be set"));
        }
        if self.report.max_workers == 0 {
            return Err(Error::new("report.max_workers must be positive"));
        }
        if self.server.addr.trim().is_empty() {
            return Err(Error::new("server.addr must be set"));
        }

        let mut labels = HashSet::new();
        for account in &self.accounts {
            if account.label.trim().is_empty() {
                return Err(Error::new("account label must be set"));
            }
            if !labels.insert(account.label.as_str()) {
                return Err(Error::new(format!(
                    "duplicate account label: {}",
                    account.label
                )));
            }
        }

        Ok(())
    }
}

fn default_label(number: usize) -> String {
    format!("Binance_{number}")
}

fn replace_port(addr: &str, port: u64) -> String {
    match addr.rsplit_once(':') {
        Some((host, _)) => format!("{host}:{port}"),
        None => format!("{addr}:{port}"),
    }
}

fn read_string_env(key: &str) -> Result<Option<String>> {
    match env::var(key) {
        Ok(value) => Ok(Some(value)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(Error::new(format!("failed to read {key}: {err}"))),
    }
}

fn read_u64_env(key: &str) -> Result<Option<u64>> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|err| Error::new(format!("{key} must be u64: {err}"))),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(Error::new(format!("failed to read {key}: {err}"))),
    }
}

fn read_i32_env(key: &str) -> Result<Option<i32>> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse::<i32>()
            .map(Some)
            .map_err(|err| Error::new(format!("{key} must be i32: {err}"))),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(Error::new(format!("failed to read {key}: {err}"))),
    }
}
