use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::models::{check_month, BillRecord, PeriodFilter, ServiceCategory};

// ---------------------------------------------------------------------------
// Primitives
// ---------------------------------------------------------------------------

/// Sum of all bill amounts; `0.0` for an empty collection.
pub fn total_expenses(bills: &[BillRecord]) -> f64 {
    bills.iter().map(|b| b.amount).sum()
}

/// A category map with every category of the fixed set present at `0.0`.
pub fn zeroed_category_totals() -> BTreeMap<ServiceCategory, f64> {
    ServiceCategory::ALL.iter().map(|&c| (c, 0.0)).collect()
}

/// Amounts summed per category. Categories absent from the input stay at `0.0`.
pub fn expenses_by_category(bills: &[BillRecord]) -> BTreeMap<ServiceCategory, f64> {
    let mut totals = zeroed_category_totals();
    for bill in bills {
        *totals.entry(bill.category).or_insert(0.0) += bill.amount;
    }
    totals
}

/// Bills matching the filter, in input order. The input is left untouched.
pub fn filter_by_period(bills: &[BillRecord], filter: &PeriodFilter) -> Vec<BillRecord> {
    bills.iter().filter(|b| filter.matches(b)).cloned().collect()
}

fn month_total(bills: &[BillRecord], year: i32, month: u32) -> f64 {
    bills
        .iter()
        .filter(|b| b.year == year && b.month == month)
        .map(|b| b.amount)
        .sum()
}

fn previous_month(year: i32, month: u32) -> (i32, u32) {
    if month == 1 {
        (year - 1, 12)
    } else {
        (year, month - 1)
    }
}

fn percent_change(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        0.0
    } else {
        (current - previous) / previous * 100.0
    }
}

// ---------------------------------------------------------------------------
// Monthly statistics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyStatistics {
    pub month: u32,
    pub year: i32,
    pub total_expenses: f64,
    pub expenses_by_category: BTreeMap<ServiceCategory, f64>,
    /// Trailing 12-month average ending at this month; months with a zero
    /// total do not dilute it.
    pub monthly_average: f64,
    pub previous_month_delta_percent: f64,
}

pub fn monthly_statistics(bills: &[BillRecord], year: i32, month: u32) -> Result<MonthlyStatistics> {
    check_month(month)?;
    debug!(year, month, bills = bills.len(), "computing monthly statistics");

    let current = filter_by_period(bills, &PeriodFilter::month(year, month)?);
    let total = total_expenses(&current);

    let mut trailing = Vec::new();
    let (mut y, mut m) = (year, month);
    for _ in 0..12 {
        let t = month_total(bills, y, m);
        if t > 0.0 {
            trailing.push(t);
        }
        (y, m) = previous_month(y, m);
    }
    let monthly_average = if trailing.is_empty() {
        0.0
    } else {
        trailing.iter().sum::<f64>() / trailing.len() as f64
    };

    let (prev_year, prev_month) = previous_month(year, month);
    let previous_total = month_total(bills, prev_year, prev_month);

    Ok(MonthlyStatistics {
        month,
        year,
        total_expenses: total,
        expenses_by_category: expenses_by_category(&current),
        monthly_average,
        previous_month_delta_percent: percent_change(total, previous_total),
    })
}

// ---------------------------------------------------------------------------
// Annual statistics
// ---------------------------------------------------------------------------

/// One point of a 12-month trend series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonthTotal {
    pub month: u32,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnualStatistics {
    pub year: i32,
    pub total_annual: f64,
    pub monthly_average: f64,
    pub expenses_by_category: BTreeMap<ServiceCategory, f64>,
    /// Selected among months with a positive total; `{month: 1, total: 0}`
    /// when the whole year is empty.
    pub max_month: MonthTotal,
    pub min_month: MonthTotal,
    /// Always 12 entries, January through December.
    pub monthly_trend: Vec<MonthTotal>,
}

pub fn annual_statistics(bills: &[BillRecord], year: i32) -> AnnualStatistics {
    debug!(year, bills = bills.len(), "computing annual statistics");

    let year_bills = filter_by_period(bills, &PeriodFilter::whole_year(year));
    let total_annual = total_expenses(&year_bills);

    let monthly_trend: Vec<MonthTotal> = (1..=12)
        .map(|month| MonthTotal {
            month,
            total: month_total(&year_bills, year, month),
        })
        .collect();

    // Earliest month wins on ties.
    let mut max_month = MonthTotal { month: 1, total: 0.0 };
    let mut min_month = MonthTotal { month: 1, total: 0.0 };
    let mut seen_positive = false;
    for point in &monthly_trend {
        if point.total <= 0.0 {
            continue;
        }
        if !seen_positive {
            max_month = *point;
            min_month = *point;
            seen_positive = true;
        } else {
            if point.total > max_month.total {
                max_month = *point;
            }
            if point.total < min_month.total {
                min_month = *point;
            }
        }
    }

    AnnualStatistics {
        year,
        total_annual,
        monthly_average: total_annual / 12.0,
        expenses_by_category: expenses_by_category(&year_bills),
        max_month,
        min_month,
        monthly_trend,
    }
}

// ---------------------------------------------------------------------------
// Year-over-year comparison
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryComparison {
    pub category: ServiceCategory,
    pub total: f64,
    pub previous_total: f64,
    pub absolute_change: f64,
    pub percent_change: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearComparison {
    pub year: i32,
    pub previous_year: i32,
    pub total: f64,
    pub previous_total: f64,
    pub absolute_change: f64,
    /// `0` when the previous year's total is `0`.
    pub percent_change: f64,
    pub by_category: Vec<CategoryComparison>,
}

pub fn year_over_year_comparison(
    bills: &[BillRecord],
    year: i32,
    previous_year: i32,
) -> YearComparison {
    let current = filter_by_period(bills, &PeriodFilter::whole_year(year));
    let previous = filter_by_period(bills, &PeriodFilter::whole_year(previous_year));

    let total = total_expenses(&current);
    let previous_total = total_expenses(&previous);
    let current_by_category = expenses_by_category(&current);
    let previous_by_category = expenses_by_category(&previous);

    let by_category = ServiceCategory::ALL
        .iter()
        .map(|&category| {
            let t = current_by_category[&category];
            let p = previous_by_category[&category];
            CategoryComparison {
                category,
                total: t,
                previous_total: p,
                absolute_change: t - p,
                percent_change: percent_change(t, p),
            }
        })
        .collect();

    YearComparison {
        year,
        previous_year,
        total,
        previous_total,
        absolute_change: total - previous_total,
        percent_change: percent_change(total, previous_total),
        by_category,
    }
}

// ---------------------------------------------------------------------------
// Service ranking
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRankingEntry {
    pub category: ServiceCategory,
    pub total: f64,
    pub percent_of_grand_total: f64,
    pub bill_count: usize,
    pub average_amount: f64,
}

/// One entry per category (zero-total categories included), descending by
/// total. The sort is stable, so ties keep the fixed enumeration order.
pub fn service_ranking(bills: &[BillRecord]) -> Vec<ServiceRankingEntry> {
    let grand_total = total_expenses(bills);

    let mut entries: Vec<ServiceRankingEntry> = ServiceCategory::ALL
        .iter()
        .map(|&category| {
            let mut total = 0.0;
            let mut bill_count = 0usize;
            for bill in bills.iter().filter(|b| b.category == category) {
                total += bill.amount;
                bill_count += 1;
            }
            ServiceRankingEntry {
                category,
                total,
                percent_of_grand_total: if grand_total == 0.0 {
                    0.0
                } else {
                    total / grand_total * 100.0
                },
                bill_count,
                average_amount: if bill_count == 0 {
                    0.0
                } else {
                    total / bill_count as f64
                },
            }
        })
        .collect();

    entries.sort_by(|a, b| b.total.total_cmp(&a.total));
    entries
}

// ---------------------------------------------------------------------------
// Quick summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuickSummary {
    pub paid_count: usize,
    pub pending_count: usize,
    /// `None` when every category total is zero.
    pub top_category: Option<ServiceCategory>,
    /// Grand total divided by the number of distinct (year, month) pairs.
    pub monthly_average: f64,
}

pub fn quick_summary(bills: &[BillRecord]) -> QuickSummary {
    let paid_count = bills.iter().filter(|b| b.paid).count();
    let pending_count = bills.len() - paid_count;

    let ranking = service_ranking(bills);
    let top_category = ranking
        .first()
        .filter(|entry| entry.total > 0.0)
        .map(|entry| entry.category);

    let distinct_months: HashSet<(i32, u32)> = bills.iter().map(|b| (b.year, b.month)).collect();
    let monthly_average = if distinct_months.is_empty() {
        0.0
    } else {
        total_expenses(bills) / distinct_months.len() as f64
    };

    QuickSummary {
        paid_count,
        pending_count,
        top_category,
        monthly_average,
    }
}
