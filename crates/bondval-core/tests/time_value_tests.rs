use bondval_core::time_value::{
    calculate_annuity, discount_factor, fv_annuity_due, fv_ordinary_annuity, normalize_rate,
    payment, pv_annuity_due, pv_ordinary_annuity, AnnuityInput,
};
use bondval_core::{BondvalError, CompoundingFrequency, Rate, RateQuote};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// ===========================================================================
// Reference annuity values
// ===========================================================================

#[test]
fn test_annuity_reference_table() {
    // 1000 per period, 5%, 5 periods
    let amt = dec!(1000);
    let i = Rate::from_decimal(dec!(0.05));
    assert_eq!(fv_ordinary_annuity(amt, i, 5).unwrap(), dec!(5525.6313));
    assert_eq!(pv_ordinary_annuity(amt, i, 5).unwrap(), dec!(4329.4767));
    assert_eq!(fv_annuity_due(amt, i, 5).unwrap(), dec!(5801.9128));
    assert_eq!(pv_annuity_due(amt, i, 5).unwrap(), dec!(4545.9505));
}

#[test]
fn test_annuity_reference_table_from_inferred_rate() {
    // 0.05 starts with "0." so inference keeps it as a decimal
    let i = normalize_rate(dec!(0.05));
    assert_eq!(fv_ordinary_annuity(dec!(1000), i, 5).unwrap(), dec!(5525.6313));
    // 5 does not, so it is read as 5%
    let i = normalize_rate(dec!(5));
    assert_eq!(pv_annuity_due(dec!(1000), i, 5).unwrap(), dec!(4545.9505));
}

// ===========================================================================
// Due = ordinary * (1 + i)
// ===========================================================================

fn grid() -> Vec<(Decimal, Decimal, u32)> {
    let mut cases = Vec::new();
    for amt in [dec!(1), dec!(250), dec!(1000), dec!(12345.67)] {
        for i in [dec!(0.001), dec!(0.03), dec!(0.05), dec!(0.125), dec!(0.4)] {
            for n in [1, 5, 12, 30] {
                cases.push((amt, i, n));
            }
        }
    }
    cases
}

#[test]
fn test_fv_annuity_due_is_ordinary_times_one_plus_i() {
    for (amt, i, n) in grid() {
        let r = Rate::from_decimal(i);
        let due = fv_annuity_due(amt, r, n).unwrap();
        let ord = fv_ordinary_annuity(amt, r, n).unwrap();
        let diff = (due - ord * (Decimal::ONE + i)).abs();
        assert!(
            diff < dec!(0.001),
            "FV due {} vs ordinary*(1+i) {} for ({}, {}, {})",
            due,
            ord * (Decimal::ONE + i),
            amt,
            i,
            n
        );
    }
}

#[test]
fn test_pv_annuity_due_is_ordinary_times_one_plus_i() {
    for (amt, i, n) in grid() {
        let r = Rate::from_decimal(i);
        let due = pv_annuity_due(amt, r, n).unwrap();
        let ord = pv_ordinary_annuity(amt, r, n).unwrap();
        let diff = (due - ord * (Decimal::ONE + i)).abs();
        assert!(
            diff < dec!(0.001),
            "PV due {} vs ordinary*(1+i) {} for ({}, {}, {})",
            due,
            ord * (Decimal::ONE + i),
            amt,
            i,
            n
        );
    }
}

#[test]
fn test_pv_is_fv_discounted() {
    let r = Rate::from_decimal(dec!(0.07));
    let fv = fv_ordinary_annuity(dec!(500), r, 12).unwrap();
    let pv = pv_ordinary_annuity(dec!(500), r, 12).unwrap();
    let discounted = fv * discount_factor(r, 12).unwrap();
    assert!((pv - discounted).abs() < dec!(0.001));
}

// ===========================================================================
// Discount factor
// ===========================================================================

#[test]
fn test_discount_factor_zero_periods_is_one() {
    for raw in [dec!(0), dec!(0.01), dec!(0.08), dec!(8), dec!(35)] {
        let r = normalize_rate(raw);
        assert_eq!(discount_factor(r, 0).unwrap(), Decimal::ONE);
    }
}

#[test]
fn test_discount_factor_decreases_with_time() {
    let r = Rate::from_percent(dec!(6));
    let mut last = Decimal::ONE;
    for n in 1..=20 {
        let df = discount_factor(r, n).unwrap();
        assert!(df < last, "df({n}) = {df} should be below {last}");
        last = df;
    }
}

// ===========================================================================
// Zero-rate guard
// ===========================================================================

#[test]
fn test_zero_rate_annuities_use_linear_limit() {
    let zero = Rate::from_decimal(dec!(0));
    assert_eq!(fv_ordinary_annuity(dec!(100), zero, 7).unwrap(), dec!(700));
    assert_eq!(pv_ordinary_annuity(dec!(100), zero, 7).unwrap(), dec!(700));
    assert_eq!(fv_annuity_due(dec!(100), zero, 7).unwrap(), dec!(700));
    assert_eq!(pv_annuity_due(dec!(100), zero, 7).unwrap(), dec!(700));
}

#[test]
fn test_zero_rate_limit_is_continuous() {
    // A tiny positive rate lands close to the zero-rate limit
    let tiny = Rate::from_decimal(dec!(0.0000001));
    let pv = pv_ordinary_annuity(dec!(100), tiny, 7).unwrap();
    assert!((pv - dec!(700)).abs() < dec!(0.01));
}

// ===========================================================================
// Rate normalisation
// ===========================================================================

#[test]
fn test_normalize_rate_idempotent_on_decimals() {
    let once = normalize_rate(dec!(0.08));
    assert_eq!(once.as_decimal(), dec!(0.08));
    assert_eq!(normalize_rate(once.as_decimal()), once);
}

#[test]
fn test_normalize_rate_half_is_not_redivided() {
    // 0.5 is 50%, and stays 50% however often it is normalised
    let r = normalize_rate(normalize_rate(dec!(0.5)).as_decimal());
    assert_eq!(r.as_decimal(), dec!(0.5));
}

#[test]
fn test_normalize_rate_tiny_decimal_kept() {
    // printed as "0.00001", never "1e-5"
    let tiny = dec!(0.00001);
    assert_eq!(tiny.to_string(), "0.00001");
    assert_eq!(normalize_rate(tiny), Rate::from_decimal(tiny));
}

#[test]
fn test_normalize_rate_percent_then_decimal() {
    let once = normalize_rate(dec!(8.0));
    let twice = normalize_rate(once.as_decimal());
    assert_eq!(once.as_decimal(), dec!(0.08));
    assert_eq!(twice, once);
}

#[test]
fn test_normalize_rate_documented_hazard() {
    // Decimal rates of 100% or more are misread as percentages.
    assert_eq!(normalize_rate(dec!(1.5)).as_decimal(), dec!(0.015));
    assert_eq!(normalize_rate(dec!(1)).as_decimal(), dec!(0.01));
    // Explicit constructors avoid it.
    assert_eq!(Rate::from_decimal(dec!(1.5)).as_decimal(), dec!(1.5));
    assert_eq!(
        RateQuote::Decimal(dec!(1.5)).rate(),
        Rate::from_percent(dec!(150))
    );
}

// ===========================================================================
// Payment and errors
// ===========================================================================

#[test]
fn test_payment_from_frequency_label() {
    let freq: CompoundingFrequency = "quarterly".parse().unwrap();
    let pmt = payment(dec!(1000), Rate::from_percent(dec!(6)), freq).unwrap();
    assert_eq!(pmt, dec!(15));
}

#[test]
fn test_payment_unknown_frequency_label() {
    let err = "daily".parse::<CompoundingFrequency>().unwrap_err();
    assert!(matches!(err, BondvalError::UnknownFrequency(_)));
    assert!(err.to_string().contains("daily"));
}

#[test]
fn test_rate_below_minus_100_pct_is_invalid() {
    let r = Rate::from_decimal(dec!(-1.5));
    assert!(matches!(
        fv_annuity_due(dec!(100), r, 4),
        Err(BondvalError::InvalidInput { .. })
    ));
}

#[test]
fn test_calculate_annuity_zero_rate_warns() {
    let input = AnnuityInput {
        amount: dec!(100),
        rate: RateQuote::Decimal(dec!(0)),
        n_periods: 3,
    };
    let out = calculate_annuity(&input).unwrap();
    assert_eq!(out.result.fv_annuity_due, dec!(300));
    assert_eq!(out.result.discount_factor, Decimal::ONE);
    assert!(out.warnings.iter().any(|w| w.contains("Zero rate")));
}
