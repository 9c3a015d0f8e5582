use rust_decimal::prelude::*;
use rust_decimal::MathematicalOps;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use crate::error::BondvalError;
use crate::types::{
    with_metadata, CompoundingFrequency, ComputationOutput, Money, Periods, Rate, RateQuote,
};
use crate::BondvalResult;

/// Decimal places kept by the annuity formulas.
pub const ANNUITY_DP: u32 = 4;

// ---------------------------------------------------------------------------
// Rate normalisation
// ---------------------------------------------------------------------------

/// Legacy rate normalisation: anything whose textual form does not start with
/// `"0."` is read as a percentage and divided by 100.
///
/// `0.08` stays `0.08` and `8.0` becomes `0.08`, so re-normalising an output of
/// this function is a no-op for rates below 100%. A decimal rate of 100% or more
/// (e.g. `1.5`) is indistinguishable from a small percentage and comes back as
/// `0.015`. Prefer [`Rate::from_decimal`] / [`Rate::from_percent`].
///
/// The text form of a `Decimal` never uses exponent notation, so tiny decimal
/// rates such as `0.00001` keep their `0.` prefix and are not divided again.
pub fn normalize_rate(value: Decimal) -> Rate {
    if value.to_string().starts_with("0.") {
        Rate::from_decimal(value)
    } else {
        debug!(%value, "rate not in 0.x form, treating as percent");
        Rate::from_percent(value)
    }
}

// ---------------------------------------------------------------------------
// Primitives
// ---------------------------------------------------------------------------

/// Periodic coupon amount: `par * coupon_rate / periods_per_year`.
pub fn payment(
    par: Money,
    coupon_rate: Rate,
    frequency: CompoundingFrequency,
) -> BondvalResult<Money> {
    let annual = try_mul(par, coupon_rate.as_decimal(), "par_value")?;
    try_div(annual, Decimal::from(frequency.periods_per_year()), "par_value")
}

/// Present-value multiplier `1 / (1 + rate)^n`. Exactly one when `n == 0`.
pub fn discount_factor(rate: Rate, n_periods: Periods) -> BondvalResult<Decimal> {
    if n_periods == 0 {
        return Ok(Decimal::ONE);
    }
    let growth = growth_factor(rate, n_periods)?;
    if growth.is_zero() {
        return Err(BondvalError::DivisionByZero {
            context: format!("discount factor for {n_periods} periods at {rate}"),
        });
    }
    try_div(Decimal::ONE, growth, "n_periods")
}

/// Future value of an ordinary annuity (payment at period end), 4 dp.
pub fn fv_ordinary_annuity(amount: Money, rate: Rate, n_periods: Periods) -> BondvalResult<Money> {
    let factor = fv_annuity_factor(rate, n_periods)?;
    Ok(round_annuity(try_mul(amount, factor, "amount")?))
}

/// Present value of an ordinary annuity (payment at period end), 4 dp.
pub fn pv_ordinary_annuity(amount: Money, rate: Rate, n_periods: Periods) -> BondvalResult<Money> {
    let factor = pv_annuity_factor(rate, n_periods)?;
    Ok(round_annuity(try_mul(amount, factor, "amount")?))
}

/// Future value of an annuity due (payment at period start), 4 dp.
pub fn fv_annuity_due(amount: Money, rate: Rate, n_periods: Periods) -> BondvalResult<Money> {
    let factor = fv_annuity_factor(rate, n_periods)?;
    let ordinary = try_mul(amount, factor, "amount")?;
    Ok(round_annuity(try_mul(ordinary, Decimal::ONE + rate.as_decimal(), "amount")?))
}

/// Present value of an annuity due (payment at period start), 4 dp.
pub fn pv_annuity_due(amount: Money, rate: Rate, n_periods: Periods) -> BondvalResult<Money> {
    let factor = pv_annuity_factor(rate, n_periods)?;
    let ordinary = try_mul(amount, factor, "amount")?;
    Ok(round_annuity(try_mul(ordinary, Decimal::ONE + rate.as_decimal(), "amount")?))
}

/// Compound annual growth rate that takes `pv` to `fv` over `years`:
/// `(fv / pv)^(1 / years) - 1`.
pub fn compound_return_rate(pv: Money, fv: Money, years: Decimal) -> BondvalResult<Rate> {
    if pv.is_zero() {
        return Err(BondvalError::DivisionByZero {
            context: "compound return rate (present value is zero)".into(),
        });
    }
    if years <= Decimal::ZERO {
        return Err(BondvalError::InvalidInput {
            field: "years".into(),
            reason: "Holding period must be positive".into(),
        });
    }
    let ratio = try_div(fv, pv, "fv")?;
    if ratio < Decimal::ZERO {
        return Err(BondvalError::InvalidInput {
            field: "fv".into(),
            reason: "Present and future values must have the same sign".into(),
        });
    }
    let grown = ratio
        .checked_powd(try_div(Decimal::ONE, years, "years")?)
        .ok_or_else(|| BondvalError::InvalidInput {
            field: "years".into(),
            reason: format!("({ratio})^(1/{years}) is outside decimal range"),
        })?;
    Ok(Rate::from_decimal(grown - Decimal::ONE))
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// Input for a full annuity table at one rate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnuityInput {
    /// Level payment per period
    pub amount: Money,
    /// Periodic rate
    pub rate: RateQuote,
    /// Number of payments
    pub n_periods: Periods,
}

/// Ordinary and due annuity values for the same cash flows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnuityOutput {
    /// Rate actually used, as a decimal fraction
    pub rate: Rate,
    pub fv_ordinary_annuity: Money,
    pub pv_ordinary_annuity: Money,
    pub fv_annuity_due: Money,
    pub pv_annuity_due: Money,
    /// `1 / (1 + rate)^n`
    pub discount_factor: Decimal,
}

/// Value an annuity four ways (ordinary/due, present/future).
pub fn calculate_annuity(input: &AnnuityInput) -> BondvalResult<ComputationOutput<AnnuityOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let rate = input.rate.rate();
    warnings.extend(rate_warnings(&input.rate));
    if rate.is_zero() {
        warnings.push("Zero rate: annuity values use the amount * n limit".into());
    }

    let output = AnnuityOutput {
        rate,
        fv_ordinary_annuity: fv_ordinary_annuity(input.amount, rate, input.n_periods)?,
        pv_ordinary_annuity: pv_ordinary_annuity(input.amount, rate, input.n_periods)?,
        fv_annuity_due: fv_annuity_due(input.amount, rate, input.n_periods)?,
        pv_annuity_due: pv_annuity_due(input.amount, rate, input.n_periods)?,
        discount_factor: discount_factor(rate, input.n_periods)?,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Level annuity valuation (ordinary and due), rounded to 4 dp",
        input,
        warnings,
        elapsed,
        output,
    ))
}

/// Warnings about how a quoted rate was interpreted.
pub(crate) fn rate_warnings(quote: &RateQuote) -> Vec<String> {
    match *quote {
        RateQuote::Inferred(raw) => {
            let rate = quote.rate();
            if rate.as_decimal() != raw {
                vec![format!("Rate {raw} read as a percentage ({rate})")]
            } else {
                Vec::new()
            }
        }
        _ => Vec::new(),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// `(1 + rate)^n`, rejecting rates at or below -100% and overflow.
fn growth_factor(rate: Rate, n_periods: Periods) -> BondvalResult<Decimal> {
    let one_plus_r = Decimal::ONE + rate.as_decimal();
    if one_plus_r <= Decimal::ZERO {
        return Err(BondvalError::InvalidInput {
            field: "rate".into(),
            reason: "Rate must be greater than -100%".into(),
        });
    }
    one_plus_r
        .checked_powu(u64::from(n_periods))
        .ok_or_else(|| BondvalError::InvalidInput {
            field: "n_periods".into(),
            reason: format!("(1 + {rate})^{n_periods} is outside decimal range"),
        })
}

/// `((1+i)^n - 1) / i`, or `n` at a zero rate.
fn fv_annuity_factor(rate: Rate, n_periods: Periods) -> BondvalResult<Decimal> {
    if rate.is_zero() {
        return Ok(Decimal::from(n_periods));
    }
    let growth = growth_factor(rate, n_periods)?;
    try_div(growth - Decimal::ONE, rate.as_decimal(), "rate")
}

/// `(1 - (1+i)^-n) / i`, or `n` at a zero rate.
fn pv_annuity_factor(rate: Rate, n_periods: Periods) -> BondvalResult<Decimal> {
    if rate.is_zero() {
        return Ok(Decimal::from(n_periods));
    }
    let discount = discount_factor(rate, n_periods)?;
    try_div(Decimal::ONE - discount, rate.as_decimal(), "rate")
}

/// `a * b`, reporting overflow as invalid `field` input.
pub(crate) fn try_mul(a: Decimal, b: Decimal, field: &str) -> BondvalResult<Decimal> {
    a.checked_mul(b)
        .ok_or_else(|| out_of_range(field, format!("{a} * {b}")))
}

/// `a / b`, reporting overflow as invalid `field` input.
pub(crate) fn try_div(a: Decimal, b: Decimal, field: &str) -> BondvalResult<Decimal> {
    if b.is_zero() {
        return Err(BondvalError::DivisionByZero {
            context: format!("{a} / 0 ({field})"),
        });
    }
    a.checked_div(b)
        .ok_or_else(|| out_of_range(field, format!("{a} / {b}")))
}

/// `a + b`, reporting overflow as invalid `field` input.
pub(crate) fn try_add(a: Decimal, b: Decimal, field: &str) -> BondvalResult<Decimal> {
    a.checked_add(b)
        .ok_or_else(|| out_of_range(field, format!("{a} + {b}")))
}

/// `a - b`, reporting overflow as invalid `field` input.
pub(crate) fn try_sub(a: Decimal, b: Decimal, field: &str) -> BondvalResult<Decimal> {
    a.checked_sub(b)
        .ok_or_else(|| out_of_range(field, format!("{a} - {b}")))
}

fn out_of_range(field: &str, expr: String) -> BondvalError {
    BondvalError::InvalidInput {
        field: field.into(),
        reason: format!("{expr} is outside decimal range"),
    }
}

fn round_annuity(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(ANNUITY_DP, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn five_pct() -> Rate {
        Rate::from_decimal(dec!(0.05))
    }

    #[test]
    fn test_reference_annuity_values() {
        assert_eq!(fv_ordinary_annuity(dec!(1000), five_pct(), 5).unwrap(), dec!(5525.6313));
        assert_eq!(pv_ordinary_annuity(dec!(1000), five_pct(), 5).unwrap(), dec!(4329.4767));
        assert_eq!(fv_annuity_due(dec!(1000), five_pct(), 5).unwrap(), dec!(5801.9128));
        assert_eq!(pv_annuity_due(dec!(1000), five_pct(), 5).unwrap(), dec!(4545.9505));
    }

    #[test]
    fn test_midpoint_rounds_away_from_zero() {
        // 1000 * (1.05^5 - 1) / 0.05 = 5525.63125 exactly
        assert_eq!(round_annuity(dec!(5525.63125)), dec!(5525.6313));
        assert_eq!(round_annuity(dec!(-5525.63125)), dec!(-5525.6313));
    }

    #[test]
    fn test_discount_factor_zero_periods() {
        for r in [dec!(0), dec!(0.05), dec!(0.99), dec!(-0.5)] {
            assert_eq!(discount_factor(Rate::from_decimal(r), 0).unwrap(), Decimal::ONE);
        }
    }

    #[test]
    fn test_discount_factor_basic() {
        let df = discount_factor(Rate::from_decimal(dec!(0.10)), 2).unwrap();
        assert!((df - dec!(0.826446281)).abs() < dec!(0.000000001));
    }

    #[test]
    fn test_zero_rate_limit() {
        let zero = Rate::ZERO;
        assert_eq!(fv_ordinary_annuity(dec!(250), zero, 8).unwrap(), dec!(2000));
        assert_eq!(pv_ordinary_annuity(dec!(250), zero, 8).unwrap(), dec!(2000));
        assert_eq!(fv_annuity_due(dec!(250), zero, 8).unwrap(), dec!(2000));
        assert_eq!(pv_annuity_due(dec!(250), zero, 8).unwrap(), dec!(2000));
        assert_eq!(discount_factor(zero, 8).unwrap(), Decimal::ONE);
    }

    #[test]
    fn test_rate_at_minus_100_pct_rejected() {
        let r = Rate::from_decimal(dec!(-1));
        assert!(matches!(
            pv_ordinary_annuity(dec!(100), r, 3),
            Err(BondvalError::InvalidInput { .. })
        ));
        assert!(discount_factor(r, 1).is_err());
    }

    #[test]
    fn test_overflow_is_an_error_not_a_panic() {
        let r = Rate::from_decimal(dec!(9));
        assert!(matches!(
            fv_ordinary_annuity(dec!(1), r, 500),
            Err(BondvalError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_product_overflow_is_an_error_not_a_panic() {
        // 10^27 fits, 1000 * 10^27 does not
        let huge = Rate::from_decimal(dec!(9));
        for result in [
            fv_ordinary_annuity(dec!(1000), huge, 27),
            fv_annuity_due(dec!(1000), huge, 27),
        ] {
            assert!(matches!(result, Err(BondvalError::InvalidInput { .. })));
        }

        // 0.1^27 leaves a large reciprocal discount
        let collapse = Rate::from_decimal(dec!(-0.9));
        for result in [
            pv_ordinary_annuity(dec!(1000), collapse, 27),
            pv_annuity_due(dec!(1000), collapse, 27),
        ] {
            assert!(matches!(result, Err(BondvalError::InvalidInput { .. })));
        }
    }

    #[test]
    fn test_payment_overflow_is_an_error() {
        let err = payment(Decimal::MAX, Rate::from_decimal(dec!(2)), CompoundingFrequency::Annual)
            .unwrap_err();
        assert!(matches!(err, BondvalError::InvalidInput { .. }));
    }

    #[test]
    fn test_payment_by_frequency() {
        let coupon = Rate::from_percent(dec!(8.6));
        assert_eq!(payment(dec!(1000), coupon, CompoundingFrequency::Annual).unwrap(), dec!(86));
        assert_eq!(payment(dec!(1000), coupon, CompoundingFrequency::Semiannual).unwrap(), dec!(43));
        assert_eq!(payment(dec!(1000), coupon, CompoundingFrequency::Quarterly).unwrap(), dec!(21.5));
        assert_eq!(payment(dec!(1200), coupon, CompoundingFrequency::Monthly).unwrap(), dec!(8.6));
    }

    #[test]
    fn test_normalize_rate_forms() {
        assert_eq!(normalize_rate(dec!(0.08)).as_decimal(), dec!(0.08));
        assert_eq!(normalize_rate(dec!(8.0)).as_decimal(), dec!(0.08));
        assert_eq!(normalize_rate(dec!(8.6)).as_decimal(), dec!(0.086));
        assert_eq!(normalize_rate(dec!(0)).as_decimal(), dec!(0));
    }

    #[test]
    fn test_normalize_rate_twice() {
        for raw in [dec!(0.08), dec!(8.0), dec!(0.5), dec!(50)] {
            let once = normalize_rate(raw);
            let twice = normalize_rate(once.as_decimal());
            assert_eq!(once, twice, "re-normalising {raw} changed the rate");
        }
        // 0.5 starts with "0." and is kept as 50%, not re-divided to 0.005
        assert_eq!(normalize_rate(dec!(0.5)).as_decimal(), dec!(0.5));
    }

    #[test]
    fn test_normalize_rate_large_decimal_is_misread() {
        // A 150% rate written as a decimal cannot be told apart from 1.5%
        assert_eq!(normalize_rate(dec!(1.5)).as_decimal(), dec!(0.015));
        assert_eq!(Rate::from_decimal(dec!(1.5)).as_decimal(), dec!(1.5));
    }

    #[test]
    fn test_normalize_rate_negative_passes_through() {
        assert_eq!(normalize_rate(dec!(-0.05)).as_decimal(), dec!(-0.0005));
        assert_eq!(normalize_rate(dec!(-5)).as_decimal(), dec!(-0.05));
    }

    #[test]
    fn test_compound_return_rate() {
        let r = compound_return_rate(dec!(100), dec!(121), dec!(2)).unwrap();
        assert!((r.as_decimal() - dec!(0.10)).abs() < dec!(0.000001));
    }

    #[test]
    fn test_compound_return_rate_errors() {
        assert!(matches!(
            compound_return_rate(dec!(0), dec!(121), dec!(2)),
            Err(BondvalError::DivisionByZero { .. })
        ));
        assert!(compound_return_rate(dec!(100), dec!(121), dec!(0)).is_err());
        assert!(compound_return_rate(dec!(100), dec!(-121), dec!(2)).is_err());
    }

    #[test]
    fn test_calculate_annuity_envelope() {
        let input = AnnuityInput {
            amount: dec!(1000),
            rate: RateQuote::Inferred(dec!(5)),
            n_periods: 5,
        };
        let out = calculate_annuity(&input).unwrap();
        assert_eq!(out.result.rate.as_decimal(), dec!(0.05));
        assert_eq!(out.result.pv_annuity_due, dec!(4545.9505));
        assert_eq!(out.warnings.len(), 1);
        assert!(out.warnings[0].contains("percentage"));
    }
}
