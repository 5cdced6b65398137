pub mod types;

pub use types::{
    round2, AccountCredential, AccountReport, AssetAmount, BalanceSnapshot, ConvertedBalance,
    PositionInfo, Report, TOTAL_KEY, UNREALIZED_PNL_KEY,
};
