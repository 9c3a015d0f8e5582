mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use commands::fixed_income::BondArgs;
use commands::market_risk::{ReturnsArgs, VarArgs};
use commands::time_value::{
    AnnuityArgs, DiscountFactorArgs, NormalizeRateArgs, PaymentArgs, ReturnRateArgs,
};

/// Time-value-of-money and bond valuation with decimal precision
#[derive(Parser)]
#[command(
    name = "bondval",
    version,
    about = "Time-value-of-money and bond valuation with decimal precision",
    long_about = "A CLI for annuity, discount factor and bond price calculations \
                  in 128-bit decimal arithmetic, plus daily return and \
                  value-at-risk analytics over price-history CSV files."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log debug detail to stderr (RUST_LOG overrides)
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Price a fixed-coupon bond from its coupon and market rates
    Bond(BondArgs),
    /// Future and present value of ordinary annuities and annuities due
    Annuity(AnnuityArgs),
    /// Single-sum discount factor 1 / (1 + i)^n
    DiscountFactor(DiscountFactorArgs),
    /// Coupon payment per period for a par value and annual coupon rate
    Payment(PaymentArgs),
    /// Show how a rate figure is read (percent or decimal)
    NormalizeRate(NormalizeRateArgs),
    /// Compound annual return between a present and future value
    ReturnRate(ReturnRateArgs),
    /// Daily simple returns from a price-history CSV
    Returns(ReturnsArgs),
    /// Parametric and historical value at risk
    Var(VarArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("bondval={default_level},bondval_core={default_level}"))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Bond(args) => commands::fixed_income::run_bond(args),
        Commands::Annuity(args) => commands::time_value::run_annuity(args),
        Commands::DiscountFactor(args) => commands::time_value::run_discount_factor(args),
        Commands::Payment(args) => commands::time_value::run_payment(args),
        Commands::NormalizeRate(args) => commands::time_value::run_normalize_rate(args),
        Commands::ReturnRate(args) => commands::time_value::run_return_rate(args),
        Commands::Returns(args) => commands::market_risk::run_returns(args),
        Commands::Var(args) => commands::market_risk::run_var(args),
        Commands::Version => {
            println!("bondval {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
