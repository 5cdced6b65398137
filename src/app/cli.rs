use crate::app::render::{render, ReportFormat};
use crate::app::server;
use crate::config::Config;
use crate::core::build_binance_report;
use crate::{Error, Result};
use std::env;
use tracing::info;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Serve,
    Report,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CliArgs {
    pub command: Command,
    pub config_path: String,
    pub addr_override: Option<String>,
    pub format: ReportFormat,
    pub show_help: bool,
}

pub fn run() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let cli = parse_args(&args)?;

    if cli.show_help {
        print_usage();
        return Ok(());
    }

    let mut config = Config::load(&cli.config_path)?;
    if let Some(addr) = cli.addr_override {
        config.server.addr = addr;
    }
    config.validate()?;
    info!(
        accounts = config.accounts.len(),
        quote = %config.quote_asset,
        "config loaded"
    );

    match cli.command {
        Command::Serve => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .map_err(|err| Error::new(format!("runtime build failed: {err}")))?;
            runtime.block_on(server::run(config))
        }
        Command::Report => {
            let report = build_binance_report(&config)?;
            println!("{}", render(&report, cli.format)?);
            Ok(())
        }
    }
}

pub fn parse_args(args: &[String]) -> Result<CliArgs> {
    let mut command = Command::Serve;
    let mut config_path = "config.toml".to_string();
    let mut addr_override = None;
    let mut format = ReportFormat::Text;
    let mut show_help = false;

    let mut index = 1;
    while index < args.len() {
        match args[index].as_str() {
            "serve" if index == 1 => {
                command = Command::Serve;
                index += 1;
            }
            "report" if index == 1 => {
                command = Command::Report;
                index += 1;
            }
            "--help" | "-h" => {
                show_help = true;
                index += 1;
            }
            "--config" | "-c" => {
                let value = args
                    .get(index + 1)
                    .ok_or_else(|| Error::new("missing value for --config"))?;
                config_path = value.to_string();
                index += 2;
            }
            "--addr" => {
                let value = args
                    .get(index + 1)
                    .ok_or_else(|| Error::new("missing value for --addr"))?;
                addr_override = Some(value.to_string());
                index += 2;
            }
            "--format" | "-f" => {
                let value = args
                    .get(index + 1)
                    .ok_or_else(|| Error::new("missing value for --format"))?;
                format = value.parse()?;
                index += 2;
            }
            unknown => {
                return Err(Error::new(format!("unknown argument: {unknown}")));
            }
        }
    }

    Ok(CliArgs {
        command,
        config_path,
        addr_override,
        format,
        show_help,
    })
}

fn print_usage() {
    println!("usage: coinboard [serve|report] [--config <path>] [--addr <host:port>] [--format <fmt>]");
    println!("  serve          Serve the report over HTTP (default)");
    println!("  report         Print one report to stdout");
    println!("  -c, --config   Path to config.toml (default: config.toml, optional)");
    println!("      --addr     Bind address for serve (default: 0.0.0.0:5000)");
    println!("  -f, --format   Report format for report (html|text|json, default: text)");
    println!("  -h, --help     Show this help");
}
