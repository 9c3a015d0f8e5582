use chrono::NaiveDate;
use rust_decimal::prelude::*;
use rust_decimal::MathematicalOps;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};
use std::time::Instant;
use tracing::debug;

use super::prices::DailyPrice;
use crate::error::BondvalError;
use crate::time_value::{try_add, try_div, try_mul, try_sub};
use crate::types::{with_metadata, ComputationOutput, Money};
use crate::BondvalResult;

/// Return from one close to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyReturn {
    /// Date of the later close
    pub date: NaiveDate,
    /// `p[t] / p[t-1] - 1`
    pub simple_return: Decimal,
}

/// Where the return series comes from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnSeries {
    /// Periodic returns as decimals
    Returns(Vec<Decimal>),
    /// Adjusted closes, oldest first; converted with [`simple_returns`]
    Prices(Vec<DailyPrice>),
}

/// Input for single-series value at risk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarInput {
    pub series: ReturnSeries,
    /// Confidence level, e.g. 0.95 or 0.99
    pub confidence_level: Decimal,
    /// Holding period in days (default 1)
    #[serde(default = "default_holding_period")]
    pub holding_period_days: u32,
    /// Position size the VaR is expressed against
    pub investment: Money,
}

/// Output of the VaR calculation. Loss figures are positive numbers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarOutput {
    pub observations: usize,
    pub mean_return: Decimal,
    pub std_dev: Decimal,
    /// Standard normal quantile for the confidence level
    pub z_score: Decimal,
    /// Parametric VaR as a fraction of the investment
    pub parametric_var_pct: Decimal,
    pub parametric_var: Money,
    /// Historical-simulation VaR as a fraction of the investment
    pub historical_var_pct: Decimal,
    pub historical_var: Money,
}

fn default_holding_period() -> u32 {
    1
}

/// Simple returns between consecutive closes. `prices` must be in strictly
/// increasing date order.
pub fn simple_returns(prices: &[DailyPrice]) -> BondvalResult<Vec<DailyReturn>> {
    prices
        .windows(2)
        .map(|w| {
            let (prev, curr) = (w[0], w[1]);
            if curr.date <= prev.date {
                return Err(BondvalError::InvalidInput {
                    field: "prices".into(),
                    reason: format!("Dates out of order at {}", curr.date),
                });
            }
            if prev.adjusted_close.is_zero() {
                return Err(BondvalError::DivisionByZero {
                    context: format!("simple return on {} (prior close is zero)", curr.date),
                });
            }
            Ok(DailyReturn {
                date: curr.date,
                simple_return: try_div(curr.adjusted_close, prev.adjusted_close, "prices")?
                    - Decimal::ONE,
            })
        })
        .collect()
}

/// Parametric (normal) and historical VaR for one return series.
pub fn value_at_risk(input: &VarInput) -> BondvalResult<ComputationOutput<VarOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if input.confidence_level <= Decimal::ZERO || input.confidence_level >= Decimal::ONE {
        return Err(BondvalError::InvalidInput {
            field: "confidence_level".into(),
            reason: "Confidence level must be between 0 and 1 (exclusive)".into(),
        });
    }
    if input.holding_period_days == 0 {
        return Err(BondvalError::InvalidInput {
            field: "holding_period_days".into(),
            reason: "Holding period must be at least one day".into(),
        });
    }

    let returns: Vec<Decimal> = match &input.series {
        ReturnSeries::Returns(r) => r.clone(),
        ReturnSeries::Prices(p) => simple_returns(p)?
            .into_iter()
            .map(|r| r.simple_return)
            .collect(),
    };

    let n = returns.len();
    if n < 2 {
        return Err(BondvalError::InsufficientData(
            "At least 2 return observations required for VaR".into(),
        ));
    }

    let n_dec = Decimal::from(n as u64);
    let total = returns
        .iter()
        .try_fold(Decimal::ZERO, |acc, r| try_add(acc, *r, "returns"))?;
    let mean = try_div(total, n_dec, "returns")?;
    let squared_deviations = returns.iter().try_fold(Decimal::ZERO, |acc, r| {
        let dev = try_sub(*r, mean, "returns")?;
        try_add(acc, try_mul(dev, dev, "returns")?, "returns")
    })?;
    let variance = try_div(squared_deviations, Decimal::from((n - 1) as u64), "returns")?;
    let std_dev = variance.sqrt().unwrap_or(Decimal::ZERO);

    let z_score = normal_quantile(input.confidence_level)?;
    let h = Decimal::from(input.holding_period_days);
    let sqrt_h = h.sqrt().unwrap_or(Decimal::ONE);

    let parametric_var_pct = try_sub(
        try_mul(try_mul(z_score, std_dev, "returns")?, sqrt_h, "holding_period_days")?,
        try_mul(mean, h, "holding_period_days")?,
        "returns",
    )?;

    let mut sorted = returns;
    sorted.sort();
    let tail_index = ((Decimal::ONE - input.confidence_level) * n_dec)
        .floor()
        .to_usize()
        .unwrap_or(0)
        .min(n - 1);
    let historical_var_pct = try_mul(-sorted[tail_index], sqrt_h, "holding_period_days")?;
    if historical_var_pct < Decimal::ZERO {
        warnings.push("No losses at the chosen percentile; historical VaR is negative".into());
    }
    if n < 30 {
        warnings.push(format!("Only {n} observations; VaR estimates are unstable"));
    }

    debug!(
        observations = n,
        %mean,
        %std_dev,
        %z_score,
        "value at risk inputs"
    );

    let output = VarOutput {
        observations: n,
        mean_return: mean,
        std_dev,
        z_score,
        parametric_var_pct,
        parametric_var: try_mul(input.investment, parametric_var_pct, "investment")?,
        historical_var_pct,
        historical_var: try_mul(input.investment, historical_var_pct, "investment")?,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Value at Risk (parametric normal and historical simulation, sqrt-of-time scaling)",
        &serde_json::json!({
            "observations": n,
            "confidence_level": input.confidence_level.to_string(),
            "holding_period_days": input.holding_period_days,
            "investment": input.investment.to_string(),
        }),
        warnings,
        elapsed,
        output,
    ))
}

/// Inverse standard normal CDF at `confidence`, rounded to 6 dp.
fn normal_quantile(confidence: Decimal) -> BondvalResult<Decimal> {
    let p = confidence.to_f64().ok_or_else(|| BondvalError::InvalidInput {
        field: "confidence_level".into(),
        reason: format!("{confidence} cannot be represented as f64"),
    })?;
    let normal = Normal::new(0.0, 1.0).map_err(|e| BondvalError::InvalidInput {
        field: "confidence_level".into(),
        reason: format!("Invalid Normal parameters: {e}"),
    })?;
    let z = normal.inverse_cdf(p);
    Decimal::from_f64(z)
        .map(|d| d.round_dp(6))
        .ok_or_else(|| BondvalError::InvalidInput {
            field: "confidence_level".into(),
            reason: format!("z-score {z} is not finite"),
        })
}
