use crate::models::{round2, AccountReport, Report, TOTAL_KEY};
use crate::{Error, Result};
use rust_decimal::Decimal;
use std::str::FromStr;

const RULE: &str = "-----------------------";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReportFormat {
    Html,
    Text,
    Json,
}

impl FromStr for ReportFormat {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "html" => Ok(ReportFormat::Html),
            "text" | "plain" => Ok(ReportFormat::Text),
            "json" => Ok(ReportFormat::Json),
            _ => Err(Error::new("format must be html, text, or json")),
        }
    }
}

pub fn render(report: &Report, format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Html => Ok(render_html(report)),
        ReportFormat::Text => Ok(render_text(report)),
        ReportFormat::Json => render_json(report),
    }
}

/// Two decimals with thousands separators, e.g. `1,234,567.89`.
pub fn format_amount(value: Decimal) -> String {
    let text = format!("{:.2}", round2(value).abs());
    let (whole, fraction) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (index, digit) in whole.chars().enumerate() {
        if index > 0 && (whole.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if value.is_sign_negative() && !round2(value).is_zero() {
        "-"
    } else {
        ""
    };
    format!("{sign}{grouped}.{fraction}")
}

pub fn render_html(report: &Report) -> String {
    let quote = escape_html(&report.quote_asset);
    let mut body = format!(
        "<b>{RULE}<br>MY TOTAL COIN ASSET at {}<br> Coin Total : {} ({quote})</b><br><br>",
        escape_html(&header_time(report)),
        format_amount(report.grand_total),
    );
    for account in &report.accounts {
        body.push_str(&format!(
            "<b>{} Balance: TOTAL: {} ({quote})</b><br>",
            escape_html(&account.label),
            format_amount(account.balance.total),
        ));
        for (key, value) in listed_entries(account) {
            body.push_str(&format!(
                "{}: {} ({quote})<br>",
                escape_html(key),
                format_amount(value)
            ));
        }
        body.push_str("<br>");
    }
    format!("<html><body>{body}</body></html>")
}

pub fn render_text(report: &Report) -> String {
    let quote = &report.quote_asset;
    let mut lines = vec![
        RULE.to_string(),
        format!("MY TOTAL COIN ASSET at {}", header_time(report)),
        format!("Coin Total : {} ({quote})", format_amount(report.grand_total)),
        String::new(),
    ];
    for account in &report.accounts {
        lines.push(format!(
            "{} Balance: TOTAL: {} ({quote})",
            account.label,
            format_amount(account.balance.total)
        ));
        for (key, value) in listed_entries(account) {
            lines.push(format!("  {key}: {} ({quote})", format_amount(value)));
        }
        lines.push(String::new());
    }
    lines.join("\n")
}

pub fn render_json(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report)
        .map_err(|err| Error::new(format!("json serialization failed: {err}")))
}

fn header_time(report: &Report) -> String {
    let time = report.generated_at.format("%Y-%m-%d %H:%M").to_string();
    if report.timezone_label.is_empty() {
        time
    } else {
        format!("{time} {}", report.timezone_label)
    }
}

fn listed_entries(account: &AccountReport) -> impl Iterator<Item = (&str, Decimal)> {
    account
        .balance
        .entries()
        .into_iter()
        .filter(|(key, _)| *key != TOTAL_KEY)
}

fn escape_html(text: &str) -> String {
    let mut output = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            '"' => output.push_str("&quot;"),
            '\'' => output.push_str("&#39;"),
            _ => output.push(ch),
        }
    }
    output
}
