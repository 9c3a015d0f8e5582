pub mod error;
pub mod time_value;
pub mod types;

#[cfg(feature = "fixed_income")]
pub mod fixed_income;

#[cfg(feature = "market_risk")]
pub mod market_risk;

pub use error::BondvalError;
pub use types::*;

/// Standard result type for all bondval operations
pub type BondvalResult<T> = Result<T, BondvalError>;
