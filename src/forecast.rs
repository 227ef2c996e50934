use std::collections::HashSet;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::aggregation::filter_by_period;
use crate::error::{BilltrendError, Result};
use crate::models::{
    BillRecord, MonthSelection, PeriodFilter, PredictionConfig, ServiceCategory,
};

// ---------------------------------------------------------------------------
// Historical window
// ---------------------------------------------------------------------------

/// One bill inside the rolling historical window, in chronological order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalDataPoint {
    pub year: i32,
    pub month: u32,
    pub category: ServiceCategory,
    pub amount: f64,
}

/// Shift a (year, month) pair by a signed number of months.
fn shift_month(year: i32, month: u32, offset: i32) -> (i32, u32) {
    let index = year * 12 + month as i32 - 1 + offset;
    (index.div_euclid(12), (index.rem_euclid(12) + 1) as u32)
}

/// Bills whose (year, month) falls within the `months_back` calendar months
/// strictly before the reference month, oldest first. The reference month
/// itself is excluded; the reference date is always caller-supplied.
pub fn extract_historical_window(
    bills: &[BillRecord],
    reference: NaiveDate,
    months_back: u32,
) -> Vec<HistoricalDataPoint> {
    let mut points = Vec::new();
    for offset in (1..=months_back as i32).rev() {
        let (year, month) = shift_month(reference.year(), reference.month(), -offset);
        let filter = PeriodFilter {
            year,
            months: MonthSelection::Exact(month),
        };
        for bill in filter_by_period(bills, &filter) {
            points.push(HistoricalDataPoint {
                year: bill.year,
                month: bill.month,
                category: bill.category,
                amount: bill.amount,
            });
        }
    }
    points
}

// ---------------------------------------------------------------------------
// Descriptive statistics and regression
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendStatistics {
    pub mean: f64,
    pub median: f64,
    /// Population standard deviation.
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub slope: f64,
    pub intercept: f64,
}

/// Descriptive statistics plus a least-squares line over (index, amount).
/// Below two points the regression degrades to a flat line at the mean.
pub fn compute_trend_statistics(amounts: &[f64]) -> TrendStatistics {
    if amounts.is_empty() {
        return TrendStatistics::default();
    }

    let n = amounts.len() as f64;
    let mean = amounts.iter().sum::<f64>() / n;

    let mut sorted = amounts.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    let median = if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    };

    let variance = amounts.iter().map(|a| (a - mean).powi(2)).sum::<f64>() / n;

    let (slope, intercept) = if amounts.len() < 2 {
        (0.0, mean)
    } else {
        let sum_x: f64 = (0..amounts.len()).map(|i| i as f64).sum();
        let sum_y: f64 = amounts.iter().sum();
        let sum_xy: f64 = amounts.iter().enumerate().map(|(i, a)| i as f64 * a).sum();
        let sum_xx: f64 = (0..amounts.len()).map(|i| (i as f64) * (i as f64)).sum();
        let slope = (n * sum_xy - sum_x * sum_y) / (n * sum_xx - sum_x * sum_x);
        let intercept = (sum_y - slope * sum_x) / n;
        (slope, intercept)
    };

    TrendStatistics {
        mean,
        median,
        std_dev: variance.sqrt(),
        min: sorted[0],
        max: sorted[sorted.len() - 1],
        slope,
        intercept,
    }
}

/// Mean amount in `target_month` relative to the mean over all points.
/// `1.0` when the target month is unrepresented or the overall mean is zero.
pub fn seasonal_factor(points: &[HistoricalDataPoint], target_month: u32) -> f64 {
    if points.is_empty() {
        return 1.0;
    }
    let target: Vec<f64> = points
        .iter()
        .filter(|p| p.month == target_month)
        .map(|p| p.amount)
        .collect();
    if target.is_empty() {
        return 1.0;
    }
    let overall_mean = points.iter().map(|p| p.amount).sum::<f64>() / points.len() as f64;
    if overall_mean == 0.0 {
        return 1.0;
    }
    let target_mean = target.iter().sum::<f64>() / target.len() as f64;
    target_mean / overall_mean
}

/// Blend of history coverage (60%) and amount stability (40%). A zero mean
/// counts as a coefficient of variation of 1, i.e. no stability credit.
pub fn confidence_score(points: &[HistoricalDataPoint], stats: &TrendStatistics) -> f64 {
    let coverage = (points.len() as f64 / 12.0).min(1.0);
    let variation = if stats.mean == 0.0 {
        1.0
    } else {
        stats.std_dev / stats.mean
    };
    0.6 * coverage + 0.4 * (1.0 - variation).max(0.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Ascending,
    Descending,
    Stable,
}

/// A slope is only a trend once it clears 5% of the mean per step.
pub fn classify_trend(stats: &TrendStatistics) -> Trend {
    let threshold = 0.05 * stats.mean;
    if stats.slope > threshold {
        Trend::Ascending
    } else if stats.slope < -threshold {
        Trend::Descending
    } else {
        Trend::Stable
    }
}

// ---------------------------------------------------------------------------
// Category prediction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServicePrediction {
    pub category: ServiceCategory,
    pub predicted_amount: f64,
    pub confidence: f64,
    pub trend: Trend,
    pub percent_variation_from_mean: f64,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn predict_category(
    category: ServiceCategory,
    window: &[HistoricalDataPoint],
    target_month: u32,
    config: &PredictionConfig,
) -> ServicePrediction {
    let points: Vec<HistoricalDataPoint> = window
        .iter()
        .filter(|p| p.category == category)
        .cloned()
        .collect();

    if points.is_empty() {
        return ServicePrediction {
            category,
            predicted_amount: 0.0,
            confidence: 0.0,
            trend: Trend::Stable,
            percent_variation_from_mean: 0.0,
        };
    }

    let amounts: Vec<f64> = points.iter().map(|p| p.amount).collect();
    let stats = compute_trend_statistics(&amounts);
    let count = amounts.len();

    let mut predicted = stats.mean;
    if count >= 3 {
        let projected = stats.slope * count as f64 + stats.intercept;
        predicted = (stats.mean + projected) / 2.0;
    }
    if config.use_seasonality && count >= 6 {
        predicted *= seasonal_factor(&points, target_month);
    }
    if config.adjust_for_inflation {
        let rate = config.annual_inflation_rate.unwrap_or(0.0);
        predicted *= 1.0 + rate / 12.0;
    }
    let predicted = round2(predicted.max(0.0));

    ServicePrediction {
        category,
        predicted_amount: predicted,
        confidence: confidence_score(&points, &stats),
        trend: classify_trend(&stats),
        percent_variation_from_mean: if stats.mean == 0.0 {
            0.0
        } else {
            (predicted - stats.mean) / stats.mean * 100.0
        },
    }
}

// ---------------------------------------------------------------------------
// Monthly predictions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyPrediction {
    pub month: u32,
    pub year: i32,
    pub total_predicted: f64,
    /// One entry per category, in enumeration order.
    pub predictions: Vec<ServicePrediction>,
    /// Arithmetic mean of the per-category confidences.
    pub overall_confidence: f64,
    /// Distinct historical months actually backing the forecast.
    pub based_on_months: u32,
}

fn build_prediction(
    window: &[HistoricalDataPoint],
    year: i32,
    month: u32,
    config: &PredictionConfig,
) -> MonthlyPrediction {
    let predictions: Vec<ServicePrediction> = ServiceCategory::ALL
        .iter()
        .map(|&category| predict_category(category, window, month, config))
        .collect();

    let total_predicted = predictions.iter().map(|p| p.predicted_amount).sum();
    let overall_confidence =
        predictions.iter().map(|p| p.confidence).sum::<f64>() / predictions.len() as f64;

    let distinct_months: HashSet<(i32, u32)> =
        window.iter().map(|p| (p.year, p.month)).collect();
    let based_on_months = config.historical_months.min(distinct_months.len() as u32);

    MonthlyPrediction {
        month,
        year,
        total_predicted,
        predictions,
        overall_confidence,
        based_on_months,
    }
}

/// Predict the calendar month of `reference` — the first month the
/// historical window does not cover.
pub fn predict_next_month(
    bills: &[BillRecord],
    reference: NaiveDate,
    config: &PredictionConfig,
) -> Result<MonthlyPrediction> {
    if config.historical_months == 0 {
        return Err(BilltrendError::EmptyWindow);
    }
    let window = extract_historical_window(bills, reference, config.historical_months);
    debug!(
        reference = %reference,
        window = window.len(),
        "predicting next month"
    );
    Ok(build_prediction(
        &window,
        reference.year(),
        reference.month(),
        config,
    ))
}

/// Predict `horizon` consecutive months starting at the reference month.
/// Every month is derived from the window anchored at the original
/// reference; predictions never feed back into the history.
pub fn predict_multiple_months(
    bills: &[BillRecord],
    reference: NaiveDate,
    horizon: u32,
    config: &PredictionConfig,
) -> Result<Vec<MonthlyPrediction>> {
    if config.historical_months == 0 {
        return Err(BilltrendError::EmptyWindow);
    }
    let window = extract_historical_window(bills, reference, config.historical_months);
    debug!(
        reference = %reference,
        horizon,
        window = window.len(),
        "predicting multiple months"
    );
    Ok((0..horizon as i32)
        .map(|offset| {
            let (year, month) = shift_month(reference.year(), reference.month(), offset);
            build_prediction(&window, year, month, config)
        })
        .collect())
}

// ---------------------------------------------------------------------------
// Pattern analysis
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variability {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternAnalysis {
    pub has_seasonal_pattern: bool,
    pub peak_months: Vec<u32>,
    pub low_months: Vec<u32>,
    pub variability: Variability,
}

impl PatternAnalysis {
    fn inconclusive() -> Self {
        Self {
            has_seasonal_pattern: false,
            peak_months: Vec::new(),
            low_months: Vec::new(),
            variability: Variability::Low,
        }
    }
}

/// Buckets bills by calendar month and looks for months that sit more than
/// half a standard deviation away from the overall monthly mean. Needs at
/// least 6 distinct months of data to say anything.
pub fn analyze_patterns(
    bills: &[BillRecord],
    category: Option<ServiceCategory>,
) -> PatternAnalysis {
    let matching: Vec<&BillRecord> = bills
        .iter()
        .filter(|b| category.map_or(true, |c| b.category == c))
        .collect();

    let mut buckets: Vec<Vec<f64>> = vec![Vec::new(); 12];
    for bill in &matching {
        buckets[bill.month as usize - 1].push(bill.amount);
    }

    let monthly_averages: Vec<(u32, f64)> = buckets
        .iter()
        .enumerate()
        .filter(|(_, amounts)| !amounts.is_empty())
        .map(|(i, amounts)| {
            (
                i as u32 + 1,
                amounts.iter().sum::<f64>() / amounts.len() as f64,
            )
        })
        .collect();

    if monthly_averages.len() < 6 {
        return PatternAnalysis::inconclusive();
    }

    let n = monthly_averages.len() as f64;
    let mean = monthly_averages.iter().map(|(_, a)| a).sum::<f64>() / n;
    let variance = monthly_averages
        .iter()
        .map(|(_, a)| (a - mean).powi(2))
        .sum::<f64>()
        / n;
    let std_dev = variance.sqrt();

    let peak_months: Vec<u32> = monthly_averages
        .iter()
        .filter(|(_, a)| *a > mean + 0.5 * std_dev)
        .map(|(m, _)| *m)
        .collect();
    let low_months: Vec<u32> = monthly_averages
        .iter()
        .filter(|(_, a)| *a < mean - 0.5 * std_dev)
        .map(|(m, _)| *m)
        .collect();

    let variation = if mean == 0.0 { 0.0 } else { std_dev / mean };
    let variability = if variation > 0.3 {
        Variability::High
    } else if variation > 0.15 {
        Variability::Medium
    } else {
        Variability::Low
    };

    PatternAnalysis {
        has_seasonal_pattern: !peak_months.is_empty() || !low_months.is_empty(),
        peak_months,
        low_months,
        variability,
    }
}
