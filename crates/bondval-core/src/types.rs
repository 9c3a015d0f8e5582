use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::BondvalError;

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Period counts (years, coupons, compounding periods)
pub type Periods = u32;

/// An interest, coupon or discount rate, always held as a decimal fraction
/// (0.05 = 5%).
///
/// Construct it with [`Rate::from_decimal`] or [`Rate::from_percent`] when the
/// caller knows the quoting convention. [`Rate::infer`] keeps the legacy
/// "does it start with `0.`" heuristic for inputs of unknown provenance.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Rate(Decimal);

impl Rate {
    pub const ZERO: Rate = Rate(Decimal::ZERO);

    /// A rate already expressed as a decimal fraction (0.086 = 8.6%).
    pub fn from_decimal(value: Decimal) -> Self {
        Rate(value)
    }

    /// A rate quoted as a percentage (8.6 = 8.6%).
    pub fn from_percent(value: Decimal) -> Self {
        Rate(value / dec!(100))
    }

    /// Guess the quoting convention from the textual form of `value`.
    /// See [`crate::time_value::normalize_rate`].
    pub fn infer(value: Decimal) -> Self {
        crate::time_value::normalize_rate(value)
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    pub fn as_percent(&self) -> Decimal {
        self.0 * dec!(100)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.as_percent().normalize())
    }
}

/// How a rate was quoted on the way in. Used by JSON inputs:
/// `{"percent": "8.6"}`, `{"decimal": "0.086"}` or `{"inferred": "8.6"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateQuote {
    Percent(Decimal),
    Decimal(Decimal),
    Inferred(Decimal),
}

impl RateQuote {
    /// Build a quote from a raw number and a style label.
    pub fn with_style(value: Decimal, style: RateStyle) -> Self {
        match style {
            RateStyle::Percent => RateQuote::Percent(value),
            RateStyle::Decimal => RateQuote::Decimal(value),
            RateStyle::Infer => RateQuote::Inferred(value),
        }
    }

    pub fn rate(&self) -> Rate {
        match *self {
            RateQuote::Percent(v) => Rate::from_percent(v),
            RateQuote::Decimal(v) => Rate::from_decimal(v),
            RateQuote::Inferred(v) => Rate::infer(v),
        }
    }
}

impl From<RateQuote> for Rate {
    fn from(quote: RateQuote) -> Self {
        quote.rate()
    }
}

/// Quoting convention for bare numbers arriving from flags or files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateStyle {
    Percent,
    Decimal,
    #[default]
    Infer,
}

/// Number of compounding (coupon) periods per year.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum CompoundingFrequency {
    #[default]
    Annual,
    Semiannual,
    Quarterly,
    Monthly,
}

impl CompoundingFrequency {
    pub const ALL: [CompoundingFrequency; 4] = [
        CompoundingFrequency::Annual,
        CompoundingFrequency::Semiannual,
        CompoundingFrequency::Quarterly,
        CompoundingFrequency::Monthly,
    ];

    pub fn periods_per_year(&self) -> u32 {
        match self {
            CompoundingFrequency::Annual => 1,
            CompoundingFrequency::Semiannual => 2,
            CompoundingFrequency::Quarterly => 4,
            CompoundingFrequency::Monthly => 12,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CompoundingFrequency::Annual => "annual",
            CompoundingFrequency::Semiannual => "semiannual",
            CompoundingFrequency::Quarterly => "quarterly",
            CompoundingFrequency::Monthly => "monthly",
        }
    }
}

impl fmt::Display for CompoundingFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for CompoundingFrequency {
    type Err = BondvalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        CompoundingFrequency::ALL
            .into_iter()
            .find(|f| f.label() == wanted)
            .ok_or_else(|| BondvalError::UnknownFrequency(s.to_string()))
    }
}

impl TryFrom<String> for CompoundingFrequency {
    type Error = BondvalError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}
