//! Dataset consistency checks.
//!
//! Checks report and never reject. Every warning rides along on the built
//! view and is logged once per build under the `validate` domain.

use serde::Serialize;
use std::fmt;

use crate::model::{Amount, Dataset};

/// A dataset inconsistency. None of these stop a view from being built.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DatasetWarning {
    OverdueExceedsTotal { total: Amount, overdue: Amount },
    NegativeAmount { field: String, value: Amount },
    NetFlowMismatch { period: String, explicit: Amount, derived: Amount },
    VendorShareSum { sum: f64, tolerance: f64 },
    PercentOutOfRange { field: String, value: f64 },
    UnrecognizedLabel { field: String, value: String },
    /// A derived amount fell outside the `Amount` range and was saturated.
    AmountOverflow { field: String },
}

impl DatasetWarning {
    pub fn kind(&self) -> &'static str {
        match self {
            DatasetWarning::OverdueExceedsTotal { .. } => "overdue_exceeds_total",
            DatasetWarning::NegativeAmount { .. } => "negative_amount",
            DatasetWarning::NetFlowMismatch { .. } => "net_flow_mismatch",
            DatasetWarning::VendorShareSum { .. } => "vendor_share_sum",
            DatasetWarning::PercentOutOfRange { .. } => "percent_out_of_range",
            DatasetWarning::UnrecognizedLabel { .. } => "unrecognized_label",
            DatasetWarning::AmountOverflow { .. } => "amount_overflow",
        }
    }
}

impl fmt::Display for DatasetWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetWarning::OverdueExceedsTotal { total, overdue } => {
                write!(f, "overdue amount {} exceeds total due {}", overdue, total)
            }
            DatasetWarning::NegativeAmount { field, value } => {
                write!(f, "{} is negative ({})", field, value)
            }
            DatasetWarning::NetFlowMismatch { period, explicit, derived } => write!(
                f,
                "{}: explicit net flow {} disagrees with inflow - outflow = {}",
                period, explicit, derived
            ),
            DatasetWarning::VendorShareSum { sum, tolerance } => write!(
                f,
                "vendor percentages sum to {:.2}, more than {} away from 100",
                sum, tolerance
            ),
            DatasetWarning::PercentOutOfRange { field, value } => {
                write!(f, "{} = {} is outside [0, 100]", field, value)
            }
            DatasetWarning::UnrecognizedLabel { field, value } => {
                write!(f, "{} has unrecognized label {:?}", field, value)
            }
            DatasetWarning::AmountOverflow { field } => {
                write!(f, "{} overflows the amount range and was saturated", field)
            }
        }
    }
}

fn check_amount(out: &mut Vec<DatasetWarning>, field: String, value: Amount) {
    if value < 0 {
        out.push(DatasetWarning::NegativeAmount { field, value });
    }
}

fn check_percent(out: &mut Vec<DatasetWarning>, field: String, value: f64) {
    if !(0.0..=100.0).contains(&value) {
        out.push(DatasetWarning::PercentOutOfRange { field, value });
    }
}

/// Collect every shape problem in `ds`. An empty result means the dataset
/// meets all the documented record invariants.
pub fn check_dataset(ds: &Dataset, pct_tolerance: f64) -> Vec<DatasetWarning> {
    let mut out = Vec::new();

    let s = &ds.summary;
    for (field, value) in [
        ("summary.totalAmountDue", s.total_amount_due),
        ("summary.overdueAmount", s.overdue_amount),
        ("summary.cashPosition", s.cash_position),
        ("summary.workingCapital", s.working_capital),
    ] {
        check_amount(&mut out, field.to_string(), value);
    }
    if s.overdue_amount > s.total_amount_due {
        out.push(DatasetWarning::OverdueExceedsTotal {
            total: s.total_amount_due,
            overdue: s.overdue_amount,
        });
    }
    if s.total_amount_due.checked_sub(s.overdue_amount).is_none() {
        out.push(DatasetWarning::AmountOverflow {
            field: "summary.currentAmountDue".to_string(),
        });
    }
    if !s.risk_score.is_recognized() {
        out.push(DatasetWarning::UnrecognizedLabel {
            field: "summary.riskScore".to_string(),
            value: s.risk_score.to_string(),
        });
    }

    for k in &ds.kpis {
        if !k.status.is_recognized() {
            out.push(DatasetWarning::UnrecognizedLabel {
                field: format!("kpi[{}].status", k.title),
                value: k.status.to_string(),
            });
        }
    }

    for p in &ds.cash_flow {
        check_amount(&mut out, format!("cashFlow[{}].inflow", p.period), p.inflow);
        check_amount(&mut out, format!("cashFlow[{}].outflow", p.period), p.outflow);
        match (p.net_flow, p.checked_net_flow()) {
            (_, None) => out.push(DatasetWarning::AmountOverflow {
                field: format!("cashFlow[{}].netFlow", p.period),
            }),
            (Some(explicit), Some(derived)) if explicit != derived => {
                out.push(DatasetWarning::NetFlowMismatch {
                    period: p.period.clone(),
                    explicit,
                    derived,
                });
            }
            _ => {}
        }
    }

    for r in &ds.risks {
        check_percent(&mut out, format!("risk[{}].score", r.category), r.score as f64);
        if !r.status.is_recognized() {
            out.push(DatasetWarning::UnrecognizedLabel {
                field: format!("risk[{}].status", r.category),
                value: r.status.to_string(),
            });
        }
    }

    for v in &ds.vendors {
        check_amount(&mut out, format!("vendor[{}].amount", v.name), v.amount);
        check_percent(&mut out, format!("vendor[{}].percentage", v.name), v.percentage);
        if !v.risk_score.is_recognized() {
            out.push(DatasetWarning::UnrecognizedLabel {
                field: format!("vendor[{}].riskScore", v.name),
                value: v.risk_score.to_string(),
            });
        }
    }
    if !ds.vendors.is_empty() {
        let sum: f64 = ds.vendors.iter().map(|v| v.percentage).sum();
        if (sum - 100.0).abs() > pct_tolerance {
            out.push(DatasetWarning::VendorShareSum {
                sum,
                tolerance: pct_tolerance,
            });
        }
    }

    for t in &ds.treasury {
        check_amount(&mut out, format!("treasury[{}].balance", t.account), t.balance);
        check_percent(
            &mut out,
            format!("treasury[{}].utilization", t.account),
            t.utilization as f64,
        );
    }

    out
}
