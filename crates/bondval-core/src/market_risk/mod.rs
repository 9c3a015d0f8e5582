//! Daily price histories, simple returns and single-series value at risk.

pub mod prices;
pub mod var;
