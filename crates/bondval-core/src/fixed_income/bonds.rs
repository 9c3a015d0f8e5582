//! Level-coupon bond valuation.
//!
//! A bond's value is the present value of its coupon stream (an ordinary
//! annuity at the market rate) plus the present value of its redemption at par.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, warn};

use crate::error::BondvalError;
use crate::time_value::{
    discount_factor, payment, pv_ordinary_annuity, rate_warnings, try_add, try_mul,
};
use crate::types::{
    with_metadata, CompoundingFrequency, ComputationOutput, Money, Periods, Rate, RateQuote,
};
use crate::BondvalResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Immutable bond terms. Construct with [`Bond::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Bond {
    par_value: Money,
    coupon_rate: Rate,
    market_rate: Rate,
    n_periods: Periods,
    compounding: CompoundingFrequency,
}

/// Breakdown of a bond's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BondValuation {
    /// Coupon paid each period
    pub coupon_payment: Money,
    /// PV of the coupon stream
    pub coupons_pv: Money,
    /// PV of par repaid at maturity
    pub redemption_pv: Money,
    /// `coupons_pv + redemption_pv`, unrounded
    pub value: Money,
}

/// Where the bond prices relative to par.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BondPricing {
    Premium,
    Par,
    Discount,
}

/// Input parameters for bond valuation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BondValuationInput {
    /// Par / face value (typically 1000)
    pub par_value: Money,
    /// Annual coupon rate
    pub coupon_rate: RateQuote,
    /// Market discount rate, applied per period
    pub market_rate: RateQuote,
    /// Number of compounding periods to maturity
    pub n_periods: Periods,
    /// Coupon frequency; defaults to annual
    #[serde(default)]
    pub compounding: CompoundingFrequency,
}

/// Output of bond valuation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BondValuationOutput {
    /// Coupon rate used, as a decimal fraction
    pub coupon_rate: Rate,
    /// Market rate used, as a decimal fraction
    pub market_rate: Rate,
    pub coupon_payment: Money,
    pub coupons_pv: Money,
    pub redemption_pv: Money,
    pub bond_value: Money,
    /// `bond_value - par_value`
    pub premium_discount: Money,
    pub pricing: BondPricing,
}

// ---------------------------------------------------------------------------
// Bond
// ---------------------------------------------------------------------------

impl Bond {
    pub fn new(
        par_value: Money,
        coupon_rate: Rate,
        market_rate: Rate,
        n_periods: Periods,
        compounding: CompoundingFrequency,
    ) -> BondvalResult<Self> {
        if par_value <= Decimal::ZERO {
            return Err(BondvalError::InvalidInput {
                field: "par_value".into(),
                reason: "Par value must be positive".into(),
            });
        }
        if coupon_rate.as_decimal() < Decimal::ZERO {
            return Err(BondvalError::InvalidInput {
                field: "coupon_rate".into(),
                reason: "Coupon rate cannot be negative".into(),
            });
        }
        if market_rate.as_decimal() <= dec!(-1) {
            return Err(BondvalError::InvalidInput {
                field: "market_rate".into(),
                reason: "Market rate must be greater than -100%".into(),
            });
        }
        Ok(Bond {
            par_value,
            coupon_rate,
            market_rate,
            n_periods,
            compounding,
        })
    }

    pub fn par_value(&self) -> Money {
        self.par_value
    }

    pub fn coupon_rate(&self) -> Rate {
        self.coupon_rate
    }

    pub fn market_rate(&self) -> Rate {
        self.market_rate
    }

    pub fn n_periods(&self) -> Periods {
        self.n_periods
    }

    pub fn compounding(&self) -> CompoundingFrequency {
        self.compounding
    }

    /// Shorthand for [`compute_value`].
    pub fn value(&self) -> BondvalResult<Money> {
        compute_value(self)
    }
}

impl TryFrom<&BondValuationInput> for Bond {
    type Error = BondvalError;

    fn try_from(input: &BondValuationInput) -> Result<Self, Self::Error> {
        Bond::new(
            input.par_value,
            input.coupon_rate.rate(),
            input.market_rate.rate(),
            input.n_periods,
            input.compounding,
        )
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Fair value of `bond`: PV of coupons plus PV of redemption.
///
/// The coupon annuity factor is rounded to 4 dp by [`pv_ordinary_annuity`];
/// the sum itself is left at full precision.
pub fn compute_value(bond: &Bond) -> BondvalResult<Money> {
    Ok(value_breakdown(bond)?.value)
}

/// [`compute_value`] with its components.
pub fn value_breakdown(bond: &Bond) -> BondvalResult<BondValuation> {
    let coupon_payment = payment(bond.par_value, bond.coupon_rate, bond.compounding)?;
    let annuity_factor = pv_ordinary_annuity(Decimal::ONE, bond.market_rate, bond.n_periods)?;
    let coupons_pv = try_mul(coupon_payment, annuity_factor, "coupon_rate")?;
    let df = discount_factor(bond.market_rate, bond.n_periods)?;
    let redemption_pv = try_mul(bond.par_value, df, "par_value")?;

    debug!(
        %coupon_payment,
        %annuity_factor,
        %redemption_pv,
        "bond valuation components"
    );

    Ok(BondValuation {
        coupon_payment,
        coupons_pv,
        redemption_pv,
        value: try_add(coupons_pv, redemption_pv, "par_value")?,
    })
}

/// Value a bond and wrap the breakdown in the standard output envelope.
pub fn value_bond(
    input: &BondValuationInput,
) -> BondvalResult<ComputationOutput<BondValuationOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let bond = Bond::try_from(input)?;
    warnings.extend(rate_warnings(&input.coupon_rate));
    warnings.extend(rate_warnings(&input.market_rate));
    if bond.n_periods == 0 {
        warnings.push("Zero periods to maturity: value equals par".into());
    }
    for w in &warnings {
        warn!("{w}");
    }

    let valuation = value_breakdown(&bond)?;
    let premium_discount = valuation.value - bond.par_value;
    let pricing = classify(premium_discount);

    let output = BondValuationOutput {
        coupon_rate: bond.coupon_rate,
        market_rate: bond.market_rate,
        coupon_payment: valuation.coupon_payment,
        coupons_pv: valuation.coupons_pv,
        redemption_pv: valuation.redemption_pv,
        bond_value: valuation.value,
        premium_discount,
        pricing,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Bond valuation: PV of level coupons (ordinary annuity) + PV of par",
        input,
        warnings,
        elapsed,
        output,
    ))
}

/// Premium/par/discount, judged to the cent.
fn classify(premium_discount: Money) -> BondPricing {
    let cents = premium_discount.round_dp(2);
    if cents.is_zero() {
        BondPricing::Par
    } else if cents > Decimal::ZERO {
        BondPricing::Premium
    } else {
        BondPricing::Discount
    }
}

// ---------------------------------------------------------------------------
// Memoisation
// ---------------------------------------------------------------------------

/// Caches [`value_breakdown`] results keyed by the full bond terms.
#[derive(Debug, Default)]
pub struct BondValuationCache {
    entries: HashMap<Bond, BondValuation>,
    hits: u64,
    misses: u64,
}

impl BondValuationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached valuation of `bond`, computing it on first request.
    /// Errors are not cached.
    pub fn value_of(&mut self, bond: &Bond) -> BondvalResult<BondValuation> {
        if let Some(hit) = self.entries.get(bond) {
            self.hits += 1;
            return Ok(*hit);
        }
        let valuation = value_breakdown(bond)?;
        self.misses += 1;
        self.entries.insert(*bond, valuation);
        Ok(valuation)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
