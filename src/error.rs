use thiserror::Error;

/// The taxonomy is deliberately narrow: well-formed input never fails, so
/// only caller contract violations are representable.
#[derive(Error, Debug)]
pub enum BilltrendError {
    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("Invalid month: {0} (expected 1-12)")]
    InvalidMonth(u32),

    #[error("Invalid month range: {0}-{1}")]
    InvalidMonthRange(u32, u32),

    #[error("Forecast window must cover at least one month")]
    EmptyWindow,
}

pub type Result<T> = std::result::Result<T, BilltrendError>;
