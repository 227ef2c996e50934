use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{BilltrendError, Result};

// ---------------------------------------------------------------------------
// Service categories
// ---------------------------------------------------------------------------

/// The fixed set of household services a bill can belong to.
///
/// Adding a category means adding a variant and extending [`ServiceCategory::ALL`];
/// every exhaustive match in the crate is then flagged by the compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceCategory {
    Electricity,
    Water,
    Gas,
    Internet,
}

impl ServiceCategory {
    /// Canonical enumeration order. Zero-filled breakdowns and ranking
    /// tie-breaks follow this order.
    pub const ALL: [ServiceCategory; 4] = [
        ServiceCategory::Electricity,
        ServiceCategory::Water,
        ServiceCategory::Gas,
        ServiceCategory::Internet,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ServiceCategory::Electricity => "electricity",
            ServiceCategory::Water => "water",
            ServiceCategory::Gas => "gas",
            ServiceCategory::Internet => "internet",
        }
    }
}

impl fmt::Display for ServiceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ServiceCategory {
    type Err = BilltrendError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "electricity" => Ok(ServiceCategory::Electricity),
            "water" => Ok(ServiceCategory::Water),
            "gas" => Ok(ServiceCategory::Gas),
            "internet" => Ok(ServiceCategory::Internet),
            other => Err(BilltrendError::UnknownCategory(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Bill records
// ---------------------------------------------------------------------------

/// One recurring service charge as stored by the persistence layer.
///
/// The engine treats these as read-only values; amounts are non-negative by
/// caller contract. The optional fields are part of the stored record shape
/// but play no role in any computation beyond `amount`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillRecord {
    pub category: ServiceCategory,
    pub amount: f64,
    pub due_date: NaiveDate,
    pub month: u32,
    pub year: i32,
    pub paid: bool,
    pub created_at: NaiveDate,
    #[serde(default)]
    pub previous_balance: Option<f64>,
    #[serde(default)]
    pub consumption: Option<f64>,
    #[serde(default)]
    pub extra_charges: Option<f64>,
    #[serde(default)]
    pub discount: Option<f64>,
}

impl BillRecord {
    /// Build an unpaid record with the optional fields empty.
    pub fn new(
        category: ServiceCategory,
        amount: f64,
        year: i32,
        month: u32,
        due_date: NaiveDate,
    ) -> Result<Self> {
        check_month(month)?;
        Ok(Self {
            category,
            amount,
            due_date,
            month,
            year,
            paid: false,
            created_at: due_date,
            previous_balance: None,
            consumption: None,
            extra_charges: None,
            discount: None,
        })
    }
}

pub(crate) fn check_month(month: u32) -> Result<()> {
    if (1..=12).contains(&month) {
        Ok(())
    } else {
        Err(BilltrendError::InvalidMonth(month))
    }
}

// ---------------------------------------------------------------------------
// Period filters
// ---------------------------------------------------------------------------

/// Which months of the filter year are selected. Exact month and month range
/// are mutually exclusive by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonthSelection {
    WholeYear,
    Exact(u32),
    Range(u32, u32),
}

/// Selection rule over bill records: a year, optionally narrowed to one
/// month or an inclusive month range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeriodFilter {
    pub year: i32,
    pub months: MonthSelection,
}

impl PeriodFilter {
    pub fn whole_year(year: i32) -> Self {
        Self {
            year,
            months: MonthSelection::WholeYear,
        }
    }

    pub fn month(year: i32, month: u32) -> Result<Self> {
        check_month(month)?;
        Ok(Self {
            year,
            months: MonthSelection::Exact(month),
        })
    }

    pub fn month_range(year: i32, start: u32, end: u32) -> Result<Self> {
        check_month(start)?;
        check_month(end)?;
        if start > end {
            return Err(BilltrendError::InvalidMonthRange(start, end));
        }
        Ok(Self {
            year,
            months: MonthSelection::Range(start, end),
        })
    }

    pub fn matches(&self, bill: &BillRecord) -> bool {
        if bill.year != self.year {
            return false;
        }
        match self.months {
            MonthSelection::WholeYear => true,
            MonthSelection::Exact(month) => bill.month == month,
            MonthSelection::Range(start, end) => bill.month >= start && bill.month <= end,
        }
    }
}

// ---------------------------------------------------------------------------
// Prediction configuration
// ---------------------------------------------------------------------------

/// Per-call forecasting knobs. `Default` is the engine baseline; callers
/// pass their own explicitly, nothing is remembered between calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionConfig {
    #[serde(default = "default_historical_months")]
    pub historical_months: u32,
    #[serde(default = "default_use_seasonality")]
    pub use_seasonality: bool,
    #[serde(default)]
    pub adjust_for_inflation: bool,
    #[serde(default)]
    pub annual_inflation_rate: Option<f64>,
}

fn default_historical_months() -> u32 {
    12
}

fn default_use_seasonality() -> bool {
    true
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            historical_months: default_historical_months(),
            use_seasonality: default_use_seasonality(),
            adjust_for_inflation: false,
            annual_inflation_rate: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn test_category_labels_roundtrip() {
        for category in ServiceCategory::ALL {
            let parsed: ServiceCategory = category.to_string().parse().unwrap();
            assert_eq!(parsed, category);
        }
    }

    #[test]
    fn test_category_parse_is_case_insensitive() {
        assert_eq!(
            "Electricity".parse::<ServiceCategory>().unwrap(),
            ServiceCategory::Electricity
        );
        assert_eq!(
            "GAS".parse::<ServiceCategory>().unwrap(),
            ServiceCategory::Gas
        );
    }

    #[test]
    fn test_category_parse_rejects_unknown() {
        let err = "cable".parse::<ServiceCategory>().unwrap_err();
        assert!(err.to_string().contains("Unknown category"), "got: {err}");
    }

    #[test]
    fn test_category_serde_uses_lowercase() {
        let json = serde_json::to_string(&ServiceCategory::Internet).unwrap();
        assert_eq!(json, "\"internet\"");
    }

    #[test]
    fn test_bill_record_new_rejects_bad_month() {
        let result = BillRecord::new(ServiceCategory::Water, 10.0, 2024, 13, date(2024, 1, 10));
        assert!(result.is_err());
    }

    #[test]
    fn test_period_filter_month_validation() {
        assert!(PeriodFilter::month(2024, 0).is_err());
        assert!(PeriodFilter::month(2024, 13).is_err());
        assert!(PeriodFilter::month(2024, 6).is_ok());
    }

    #[test]
    fn test_period_filter_range_validation() {
        assert!(PeriodFilter::month_range(2024, 4, 2).is_err());
        assert!(PeriodFilter::month_range(2024, 1, 13).is_err());
        assert!(PeriodFilter::month_range(2024, 2, 2).is_ok());
    }

    #[test]
    fn test_period_filter_matches() {
        let bill = BillRecord::new(ServiceCategory::Gas, 42.0, 2024, 5, date(2024, 5, 15)).unwrap();

        assert!(PeriodFilter::whole_year(2024).matches(&bill));
        assert!(!PeriodFilter::whole_year(2023).matches(&bill));
        assert!(PeriodFilter::month(2024, 5).unwrap().matches(&bill));
        assert!(!PeriodFilter::month(2024, 6).unwrap().matches(&bill));
        assert!(PeriodFilter::month_range(2024, 3, 7).unwrap().matches(&bill));
        assert!(!PeriodFilter::month_range(2024, 6, 9).unwrap().matches(&bill));
    }

    #[test]
    fn test_prediction_config_baseline() {
        let config = PredictionConfig::default();
        assert_eq!(config.historical_months, 12);
        assert!(config.use_seasonality);
        assert!(!config.adjust_for_inflation);
        assert!(config.annual_inflation_rate.is_none());
    }

    #[test]
    fn test_prediction_config_merges_with_defaults() {
        let json = r#"{"historical_months": 6, "adjust_for_inflation": true}"#;
        let config: PredictionConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.historical_months, 6);
        assert!(config.use_seasonality);
        assert!(config.adjust_for_inflation);
        assert!(config.annual_inflation_rate.is_none());
    }
}
