//! Monthly and yearly tally summaries.
//!
//! A summary lists every employee passed in (tallies of other usernames are
//! ignored), zero-filled when nothing was recorded, plus a total row.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::tally::{OvertimeTally, SalesTally};

/// `sales / tries` as a percentage with one decimal, `-` when there were no tries.
pub fn success_rate_label(tries: i64, sales: i64) -> String {
    if tries > 0 {
        format!("{:.1} %", sales as f64 / tries as f64 * 100.0)
    } else {
        "-".to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesRow {
    pub username: String,
    pub tries: i64,
    pub sales: i64,
    pub success_rate: Option<f64>,
    pub success_rate_label: String,
}

impl SalesRow {
    fn new(username: String, tries: i64, sales: i64) -> Self {
        Self {
            username,
            tries,
            sales,
            success_rate: (tries > 0).then(|| sales as f64 / tries as f64 * 100.0),
            success_rate_label: success_rate_label(tries, sales),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesSummary {
    pub year: i32,
    /// `None` for a yearly summary.
    pub month: Option<u32>,
    pub rows: Vec<SalesRow>,
    pub total: SalesRow,
}

impl SalesSummary {
    /// Sum `tallies` per employee. Pass one month's tallies for a monthly
    /// summary or the whole year's for a yearly one.
    pub fn build(year: i32, month: Option<u32>, employees: &[String], tallies: &[SalesTally]) -> Self {
        let mut sums: HashMap<&str, (i64, i64)> = HashMap::new();
        for t in tallies {
            let slot = sums.entry(t.username.as_str()).or_insert((0, 0));
            slot.0 += t.tries;
            slot.1 += t.sales;
        }

        let mut names: Vec<&String> = employees.iter().collect();
        names.sort();
        names.dedup();

        let rows: Vec<SalesRow> = names
            .into_iter()
            .map(|name| {
                let (tries, sales) = sums.get(name.as_str()).copied().unwrap_or((0, 0));
                SalesRow::new(name.clone(), tries, sales)
            })
            .collect();

        let tries = rows.iter().map(|r| r.tries).sum();
        let sales = rows.iter().map(|r| r.sales).sum();
        Self {
            year,
            month,
            total: SalesRow::new("total".to_string(), tries, sales),
            rows,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OvertimeRow {
    pub username: String,
    pub classic: i64,
    pub deluxe: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OvertimeSummary {
    pub year: i32,
    pub month: Option<u32>,
    pub rows: Vec<OvertimeRow>,
    pub total: OvertimeRow,
}

impl OvertimeSummary {
    pub fn build(year: i32, month: Option<u32>, employees: &[String], tallies: &[OvertimeTally]) -> Self {
        let mut sums: HashMap<&str, (i64, i64)> = HashMap::new();
        for t in tallies {
            let slot = sums.entry(t.username.as_str()).or_insert((0, 0));
            slot.0 += t.classic;
            slot.1 += t.deluxe;
        }

        let mut names: Vec<&String> = employees.iter().collect();
        names.sort();
        names.dedup();

        let rows: Vec<OvertimeRow> = names
            .into_iter()
            .map(|name| {
                let (classic, deluxe) = sums.get(name.as_str()).copied().unwrap_or((0, 0));
                OvertimeRow {
                    username: name.clone(),
                    classic,
                    deluxe,
                }
            })
            .collect();

        Self {
            year,
            month,
            total: OvertimeRow {
                username: "total".to_string(),
                classic: rows.iter().map(|r| r.classic).sum(),
                deluxe: rows.iter().map(|r| r.deluxe).sum(),
            },
            rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::period::Period;

    fn sales(user: &str, month: u32, tries: i64, sold: i64) -> SalesTally {
        SalesTally {
            username: user.to_string(),
            period: Period::new(2024, month).unwrap(),
            tries,
            sales: sold,
        }
    }

    #[test]
    fn rate_label_has_one_decimal_or_dash() {
        assert_eq!(success_rate_label(3, 1), "33.3 %");
        assert_eq!(success_rate_label(4, 4), "100.0 %");
        assert_eq!(success_rate_label(0, 0), "-");
    }

    #[test]
    fn yearly_summary_sums_months_and_zero_fills() {
        let employees = vec!["petr".to_string(), "jana".to_string(), "eva".to_string()];
        let tallies = vec![
            sales("jana", 1, 10, 4),
            sales("jana", 2, 10, 1),
            sales("petr", 2, 4, 2),
            sales("admin", 2, 99, 99),
        ];

        let s = SalesSummary::build(2024, None, &employees, &tallies);
        let names: Vec<&str> = s.rows.iter().map(|r| r.username.as_str()).collect();
        assert_eq!(names, vec!["eva", "jana", "petr"]);
        assert_eq!(s.rows[0].success_rate_label, "-");
        assert_eq!(s.rows[0].success_rate, None);
        assert_eq!((s.rows[1].tries, s.rows[1].sales), (20, 5));
        assert_eq!(s.rows[1].success_rate_label, "25.0 %");
        assert_eq!((s.total.tries, s.total.sales), (24, 7));
        assert_eq!(s.total.success_rate_label, "29.2 %");
    }

    #[test]
    fn overtime_summary_totals() {
        let employees = vec!["jana".to_string(), "petr".to_string()];
        let tallies = vec![
            OvertimeTally {
                username: "jana".to_string(),
                period: Period::new(2024, 5).unwrap(),
                classic: 3,
                deluxe: 1,
            },
            OvertimeTally {
                username: "petr".to_string(),
                period: Period::new(2024, 5).unwrap(),
                classic: 2,
                deluxe: 0,
            },
        ];

        let s = OvertimeSummary::build(2024, Some(5), &employees, &tallies);
        assert_eq!(s.month, Some(5));
        assert_eq!(s.rows.len(), 2);
        assert_eq!((s.total.classic, s.total.deluxe), (5, 1));
    }
}
