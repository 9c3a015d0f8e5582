use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use bondval_core::fixed_income::bonds::{self, BondValuationInput};
use bondval_core::CompoundingFrequency;

use super::{quote, resolve_input, RateStyleArg};

/// Arguments for bond valuation
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct BondArgs {
    /// Par / face value
    #[arg(long, default_value = "1000")]
    pub par: Decimal,

    /// Annual coupon rate (see --rate-style)
    #[arg(long)]
    pub coupon_rate: Option<Decimal>,

    /// Market discount rate per period (see --rate-style)
    #[arg(long)]
    pub market_rate: Option<Decimal>,

    /// Number of compounding periods to maturity
    #[arg(long)]
    pub periods: Option<u32>,

    /// annual, semiannual, quarterly or monthly
    #[arg(long, default_value = "annual")]
    pub compounding: String,

    /// How the rate flags are quoted
    #[arg(long, value_enum, default_value_t = RateStyleArg::Infer)]
    pub rate_style: RateStyleArg,

    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_bond(args: BondArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let bond_input: BondValuationInput = resolve_input(
        &args.input,
        || bond_from_flags(&args),
        "Provide --coupon-rate, --market-rate and --periods, --input file or pipe JSON via stdin",
    )?;
    let result = bonds::value_bond(&bond_input)?;
    Ok(serde_json::to_value(result)?)
}

fn bond_from_flags(
    args: &BondArgs,
) -> Result<Option<BondValuationInput>, Box<dyn std::error::Error>> {
    if args.coupon_rate.is_none() && args.market_rate.is_none() && args.periods.is_none() {
        return Ok(None);
    }
    let compounding: CompoundingFrequency = args.compounding.parse()?;
    Ok(Some(BondValuationInput {
        par_value: args.par,
        coupon_rate: quote(
            args.coupon_rate.ok_or("--coupon-rate is required")?,
            args.rate_style,
        ),
        market_rate: quote(
            args.market_rate.ok_or("--market-rate is required")?,
            args.rate_style,
        ),
        n_periods: args.periods.ok_or("--periods is required")?,
        compounding,
    }))
}
