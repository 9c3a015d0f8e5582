use clap::Args;
use rust_decimal::Decimal;
use serde_json::{json, Value};

use bondval_core::time_value::{self, AnnuityInput};
use bondval_core::CompoundingFrequency;

use super::{quote, resolve_input, RateStyleArg};

/// Arguments for annuity valuation
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct AnnuityArgs {
    /// Level payment per period
    #[arg(long)]
    pub amount: Option<Decimal>,

    /// Periodic rate (see --rate-style)
    #[arg(long)]
    pub rate: Option<Decimal>,

    /// Number of payments
    #[arg(long)]
    pub periods: Option<u32>,

    /// How --rate is quoted
    #[arg(long, value_enum, default_value_t = RateStyleArg::Infer)]
    pub rate_style: RateStyleArg,

    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_annuity(args: AnnuityArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let annuity_input: AnnuityInput = resolve_input(
        &args.input,
        || annuity_from_flags(&args),
        "Provide --amount, --rate and --periods, --input file or pipe JSON via stdin",
    )?;
    let result = time_value::calculate_annuity(&annuity_input)?;
    Ok(serde_json::to_value(result)?)
}

fn annuity_from_flags(
    args: &AnnuityArgs,
) -> Result<Option<AnnuityInput>, Box<dyn std::error::Error>> {
    if args.amount.is_none() && args.rate.is_none() && args.periods.is_none() {
        return Ok(None);
    }
    Ok(Some(AnnuityInput {
        amount: args.amount.ok_or("--amount is required")?,
        rate: quote(args.rate.ok_or("--rate is required")?, args.rate_style),
        n_periods: args.periods.ok_or("--periods is required")?,
    }))
}

/// Arguments for a single discount factor
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct DiscountFactorArgs {
    /// Periodic rate (see --rate-style)
    #[arg(long)]
    pub rate: Decimal,

    /// Number of periods
    #[arg(long)]
    pub periods: u32,

    /// How --rate is quoted
    #[arg(long, value_enum, default_value_t = RateStyleArg::Infer)]
    pub rate_style: RateStyleArg,
}

pub fn run_discount_factor(args: DiscountFactorArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let rate = quote(args.rate, args.rate_style).rate();
    let df = time_value::discount_factor(rate, args.periods)?;
    Ok(json!({
        "result": {
            "rate": rate,
            "n_periods": args.periods,
            "discount_factor": df,
        }
    }))
}

/// Arguments for the periodic coupon payment
#[derive(Args)]
pub struct PaymentArgs {
    /// Par / face value
    #[arg(long, default_value = "1000")]
    pub par: Decimal,

    /// Annual coupon rate (see --rate-style)
    #[arg(long)]
    pub coupon_rate: Decimal,

    /// annual, semiannual, quarterly or monthly
    #[arg(long, default_value = "annual")]
    pub frequency: String,

    /// How --coupon-rate is quoted
    #[arg(long, value_enum, default_value_t = RateStyleArg::Infer)]
    pub rate_style: RateStyleArg,
}

pub fn run_payment(args: PaymentArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let frequency: CompoundingFrequency = args.frequency.parse()?;
    let coupon = quote(args.coupon_rate, args.rate_style).rate();
    let pmt = time_value::payment(args.par, coupon, frequency)?;
    Ok(json!({
        "result": {
            "coupon_payment": pmt,
            "coupon_rate": coupon,
            "frequency": frequency,
            "periods_per_year": frequency.periods_per_year(),
        }
    }))
}

/// Arguments for legacy rate normalisation
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct NormalizeRateArgs {
    /// Rate as typed, e.g. 8.6 or 0.086
    pub value: Decimal,
}

pub fn run_normalize_rate(args: NormalizeRateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let rate = time_value::normalize_rate(args.value);
    Ok(json!({
        "result": {
            "input": args.value,
            "rate": rate,
            "read_as_percent": rate.as_decimal() != args.value,
        }
    }))
}

/// Arguments for the compound return rate between two values
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct ReturnRateArgs {
    /// Starting value
    #[arg(long)]
    pub pv: Decimal,

    /// Ending value
    #[arg(long)]
    pub fv: Decimal,

    /// Holding period in years
    #[arg(long)]
    pub years: Decimal,
}

pub fn run_return_rate(args: ReturnRateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let rate = time_value::compound_return_rate(args.pv, args.fv, args.years)?;
    Ok(json!({
        "result": {
            "compound_return_rate": rate,
            "years": args.years,
        }
    }))
}
