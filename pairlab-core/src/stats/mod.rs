//! Statistics for the pair screen: OLS, ADF, MacKinnon p-values, Engle–Granger.

pub mod adf;
pub mod coint;
pub mod mackinnon;
pub mod ols;

pub use adf::{adf_statistic, adf_test, AdfResult, AdfStatistic, Deterministic};
pub use coint::{engle_granger, EngleGranger, MIN_OBSERVATIONS};
pub use mackinnon::mackinnon_p;

use thiserror::Error;

/// Why a numeric test could not run on its input.
///
/// Always local to one series or pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NumericError {
    #[error("series lengths differ ({left} vs {right})")]
    LengthMismatch { left: usize, right: usize },

    #[error("series too short ({len} observations, need {min})")]
    TooShort { len: usize, min: usize },

    #[error("series contains missing or non-finite values")]
    NonFinite,

    #[error("series has zero variance")]
    ZeroVariance,

    #[error("regression design is singular")]
    Singular,
}
