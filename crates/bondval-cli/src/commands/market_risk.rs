use chrono::NaiveDate;
use clap::Args;
use rust_decimal::Decimal;
use serde_json::{json, Value};

use bondval_core::market_risk::prices::{
    parse_flexible_date, DailyPrice, InMemoryPriceHistory, PriceHistoryProvider,
};
use bondval_core::market_risk::var::{self, ReturnSeries, VarInput};

use super::resolve_input;
use crate::input;

/// Arguments for turning a price history into daily returns
#[derive(Args)]
pub struct ReturnsArgs {
    /// CSV price history (Date,...,Adj Close,...); reads stdin if omitted
    #[arg(long)]
    pub prices: Option<String>,

    /// Ticker label for the series
    #[arg(long, default_value = "TICKER")]
    pub ticker: String,

    /// First date to include (YYYY-MM-DD or MM/DD/YYYY)
    #[arg(long)]
    pub start: Option<String>,

    /// Last date to include (YYYY-MM-DD or MM/DD/YYYY)
    #[arg(long)]
    pub end: Option<String>,
}

pub fn run_returns(args: ReturnsArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let prices = load_prices(&args.prices, &args.ticker, &args.start, &args.end)?;
    let returns = var::simple_returns(&prices)?;
    Ok(json!({
        "ticker": args.ticker.to_uppercase(),
        "observations": returns.len(),
        "results": returns,
    }))
}

/// Arguments for single-series value at risk
#[derive(Args)]
pub struct VarArgs {
    /// CSV price history to derive returns from
    #[arg(long, conflicts_with = "returns")]
    pub prices: Option<String>,

    /// Comma-separated periodic returns, e.g. 0.01,-0.02,0.005
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub returns: Option<Vec<Decimal>>,

    /// Confidence level
    #[arg(long, default_value = "0.95")]
    pub confidence: Decimal,

    /// Holding period in days
    #[arg(long, default_value = "1")]
    pub holding_days: u32,

    /// Position size
    #[arg(long, default_value = "1000000")]
    pub investment: Decimal,

    /// First date to include when reading --prices
    #[arg(long)]
    pub start: Option<String>,

    /// Last date to include when reading --prices
    #[arg(long)]
    pub end: Option<String>,

    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_var(args: VarArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let var_input: VarInput = resolve_input(
        &args.input,
        || var_from_flags(&args),
        "Provide --returns, --prices, --input file or pipe JSON via stdin",
    )?;
    let result = var::value_at_risk(&var_input)?;
    Ok(serde_json::to_value(result)?)
}

fn var_from_flags(args: &VarArgs) -> Result<Option<VarInput>, Box<dyn std::error::Error>> {
    let series = if let Some(returns) = args.returns.clone() {
        ReturnSeries::Returns(returns)
    } else if args.prices.is_some() {
        ReturnSeries::Prices(load_prices(&args.prices, "TICKER", &args.start, &args.end)?)
    } else {
        return Ok(None);
    };
    Ok(Some(VarInput {
        series,
        confidence_level: args.confidence,
        holding_period_days: args.holding_days,
        investment: args.investment,
    }))
}

/// Read a CSV price history from a file (or stdin) and clip it to the
/// requested date window.
fn load_prices(
    path: &Option<String>,
    ticker: &str,
    start: &Option<String>,
    end: &Option<String>,
) -> Result<Vec<DailyPrice>, Box<dyn std::error::Error>> {
    let text = match path {
        Some(p) => input::file::read_text(p)?,
        None => input::stdin::read_stdin_text()?
            .ok_or("--prices <file.csv> or a CSV on stdin is required")?,
    };

    let mut history = InMemoryPriceHistory::new();
    let rows = history.load_csv(ticker, &text)?;
    tracing::info!(ticker, rows, "price history loaded");

    let start = match start {
        Some(s) => parse_flexible_date(s)?,
        None => NaiveDate::MIN,
    };
    let end = match end {
        Some(s) => parse_flexible_date(s)?,
        None => NaiveDate::MAX,
    };
    Ok(history.fetch_daily_prices(ticker, start, end)?)
}
