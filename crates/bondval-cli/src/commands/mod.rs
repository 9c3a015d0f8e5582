pub mod fixed_income;
pub mod market_risk;
pub mod time_value;

use bondval_core::{RateQuote, RateStyle};
use clap::ValueEnum;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;

use crate::input;

/// How bare rate flags are quoted
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum RateStyleArg {
    /// 8.6 means 8.6%
    Percent,
    /// 0.086 means 8.6%
    Decimal,
    /// Values starting with "0." are decimals, anything else is a percentage
    #[default]
    Infer,
}

impl From<RateStyleArg> for RateStyle {
    fn from(arg: RateStyleArg) -> Self {
        match arg {
            RateStyleArg::Percent => RateStyle::Percent,
            RateStyleArg::Decimal => RateStyle::Decimal,
            RateStyleArg::Infer => RateStyle::Infer,
        }
    }
}

/// Attach a quoting style to a raw rate flag.
pub fn quote(value: Decimal, style: RateStyleArg) -> RateQuote {
    RateQuote::with_style(value, style.into())
}

/// Resolve a command's input: the `--input` file wins, then explicit flags,
/// then JSON piped on stdin. `from_flags` returns `None` when no flags were given.
pub fn resolve_input<T: DeserializeOwned>(
    path: &Option<String>,
    from_flags: impl FnOnce() -> Result<Option<T>, Box<dyn std::error::Error>>,
    missing: &str,
) -> Result<T, Box<dyn std::error::Error>> {
    if let Some(ref p) = path {
        return input::file::read_json(p);
    }
    if let Some(parsed) = from_flags()? {
        return Ok(parsed);
    }
    input::stdin::read_stdin_json()?.ok_or_else(|| missing.to_string().into())
}
