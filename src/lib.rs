//! Statistics aggregation and expense forecasting for recurring household
//! service bills.
//!
//! The crate is a pure computation layer: callers supply a read-only
//! collection of [`BillRecord`]s together with explicit parameters (a period
//! filter, a prediction config, a reference date) and get back fresh value
//! structures for the presentation layer. Nothing here touches storage, the
//! system clock, or global state, so every call is reproducible.

pub mod aggregation;
pub mod error;
pub mod forecast;
pub mod models;

pub use error::{BilltrendError, Result};
pub use models::{BillRecord, MonthSelection, PeriodFilter, PredictionConfig, ServiceCategory};
