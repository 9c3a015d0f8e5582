use thiserror::Error;

#[derive(Debug, Error)]
pub enum BondvalError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Unknown compounding frequency '{0}' (expected annual, semiannual, quarterly or monthly)")]
    UnknownFrequency(String),

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Date error: {0}")]
    DateError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for BondvalError {
    fn from(e: serde_json::Error) -> Self {
        BondvalError::SerializationError(e.to_string())
    }
}

#[cfg(feature = "market_risk")]
impl From<csv::Error> for BondvalError {
    fn from(e: csv::Error) -> Self {
        BondvalError::SerializationError(e.to_string())
    }
}
