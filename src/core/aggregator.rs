use crate::config::Config;
use crate::core::normalizer::{normalize, positions_by_asset};
use crate::exchange::binance::{BinanceAccount, BinanceConfig};
use crate::exchange::snapshot::collect_snapshot;
use crate::exchange::AccountSource;
use crate::models::{AccountCredential, AccountReport, ConvertedBalance, Report};
use crate::{Error, Result};
use chrono::{DateTime, FixedOffset, Utc};
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Instant;
use tracing::{info, warn};

#[derive(Clone, Debug)]
pub struct ReportSettings {
    pub quote_asset: String,
    pub timezone: FixedOffset,
    pub timezone_label: String,
    pub max_workers: usize,
}

impl ReportSettings {
    pub fn from_config(config: &Config) -> Result<Self> {
        let timezone = FixedOffset::east_opt(config.timezone.offset_hours * 3600)
            .ok_or_else(|| Error::new("timezone.offset_hours out of range"))?;
        Ok(Self {
            quote_asset: config.quote_asset.clone(),
            timezone,
            timezone_label: config.timezone.label.clone(),
            max_workers: config.report.max_workers,
        })
    }

    pub fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.timezone)
    }
}

/// Values one account. An account whose source cannot be built reports as
/// empty.
pub fn account_balance<S, F>(
    credential: &AccountCredential,
    quote: &str,
    connect: &F,
) -> ConvertedBalance
where
    S: AccountSource,
    F: Fn(&AccountCredential) -> Result<S>,
{
    let source = match connect(credential) {
        Ok(source) => source,
        Err(err) => {
            warn!(account = %credential.label, error = %err.message, "account source unavailable");
            return ConvertedBalance::default();
        }
    };
    let snapshot = collect_snapshot(&credential.label, &source);
    let positions = positions_by_asset(&snapshot.positions, quote);
    normalize(
        &snapshot.spot,
        &snapshot.derivatives,
        &positions,
        quote,
        &source,
    )
}

/// Builds the combined report, valuing up to `max_workers` accounts at once.
/// Accounts keep their configured order.
pub fn build_report<S, F>(
    accounts: &[AccountCredential],
    settings: &ReportSettings,
    connect: F,
) -> Report
where
    S: AccountSource,
    F: Fn(&AccountCredential) -> Result<S> + Sync,
{
    let started = Instant::now();
    let workers = settings.max_workers.clamp(1, accounts.len().max(1));
    let next = AtomicUsize::new(0);
    let next = &next;
    let connect = &connect;
    let mut slots: Vec<Option<ConvertedBalance>> = vec![None; accounts.len()];

    thread::scope(|scope| {
        let mut handles = Vec::with_capacity(workers);
        for _ in 0..workers {
            handles.push(scope.spawn(move || {
                let mut done = Vec::new();
                loop {
                    let index = next.fetch_add(1, Ordering::Relaxed);
                    let Some(credential) = accounts.get(index) else {
                        break;
                    };
                    let balance = account_balance(credential, &settings.quote_asset, connect);
                    done.push((index, balance));
                }
                done
            }));
        }
        for handle in handles {
            match handle.join() {
                Ok(done) => {
                    for (index, balance) in done {
                        slots[index] = Some(balance);
                    }
                }
                Err(_) => warn!("report worker panicked"),
            }
        }
    });

    let accounts: Vec<AccountReport> = accounts
        .iter()
        .zip(slots)
        .map(|(credential, balance)| AccountReport {
            label: credential.label.clone(),
            balance: balance.unwrap_or_default(),
        })
        .collect();
    let grand_total = grand_total(&accounts);

    info!(
        accounts = accounts.len(),
        grand_total = %grand_total,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "report built"
    );

    Report {
        generated_at: settings.now(),
        timezone_label: settings.timezone_label.clone(),
        quote_asset: settings.quote_asset.clone(),
        accounts,
        grand_total,
    }
}

pub fn grand_total(accounts: &[AccountReport]) -> Decimal {
    accounts.iter().map(|account| account.balance.total).sum()
}

/// Builds a report for every configured account against Binance.
pub fn build_binance_report(config: &Config) -> Result<Report> {
    let settings = ReportSettings::from_config(config)?;
    let exchange = BinanceConfig {
        spot_base_url: config.exchange.spot_base_url.clone(),
        futures_base_url: config.exchange.futures_base_url.clone(),
        recv_window: config.exchange.recv_window,
        timeout_secs: config.exchange.timeout_secs,
    };
    Ok(build_report(&config.accounts, &settings, |credential| {
        BinanceAccount::new(exchange.clone(), credential)
    }))
}
