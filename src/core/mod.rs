pub mod aggregator;
pub mod normalizer;

pub use aggregator::{build_binance_report, build_report, ReportSettings};
pub use normalizer::{merge_balances, normalize, positions_by_asset, Conversion};
