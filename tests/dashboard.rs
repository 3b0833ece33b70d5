//! End-to-end checks of the dashboard core against the reference snapshot.

use apdash::classify::{classify_risk, classify_status, RiskLevel, SeverityStyle};
use apdash::format::format_currency;
use apdash::model::{CashFlowPeriod, Dataset};
use apdash::validate::DatasetWarning;
use apdash::view::{build_view, NetFlowPolicy, NetFlowSource, OverduePolicy, ViewBuilder, ViewConfig};

// ---------------------------------------------------------------------------
// Currency formatting
// ---------------------------------------------------------------------------
#[test]
fn currency_strings_match_display_convention() {
    assert_eq!(format_currency(0, "USD"), "$0");
    assert_eq!(format_currency(19217, "USD"), "$19,217");
    let gbp = format_currency(29808, "GBP");
    assert!(gbp.starts_with('£'));
    assert!(gbp.ends_with("29,808"));
    assert_ne!(gbp, format_currency(29808, "USD"));
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------
#[test]
fn status_and_risk_tables_are_total() {
    let statuses = ["excellent", "good", "warning", "risk"].map(classify_status);
    for (i, a) in statuses.iter().enumerate() {
        for b in &statuses[i + 1..] {
            assert_ne!(a, b);
        }
    }
    assert_eq!(classify_status("unknown-value"), SeverityStyle::NEUTRAL);

    let risks = ["Low", "Medium", "High"].map(classify_risk);
    assert_ne!(risks[0], risks[1]);
    assert_ne!(risks[1], risks[2]);
    assert_ne!(risks[0], risks[2]);
    assert_eq!(classify_risk("Catastrophic"), SeverityStyle::NEUTRAL);
}

// ---------------------------------------------------------------------------
// Summary derivation
// ---------------------------------------------------------------------------
#[test]
fn current_amount_due_is_total_minus_overdue() {
    let view = ViewBuilder::default().build(&Dataset::reference());
    assert_eq!(view.summary.total_amount_due, 19217);
    assert_eq!(view.summary.overdue_amount, 14616);
    assert_eq!(view.summary.current_amount_due, 4601);
}

#[test]
fn overdue_above_total_never_goes_negative_by_default() {
    let mut ds = Dataset::reference();
    ds.summary.total_amount_due = 1000;
    ds.summary.overdue_amount = 1500;

    let view = ViewBuilder::default().build(&ds);
    assert_eq!(view.summary.current_amount_due, 0);
    assert!(view.summary.inconsistent);

    let cfg = ViewConfig {
        overdue_policy: OverduePolicy::Propagate,
        ..ViewConfig::default()
    };
    let view = build_view(&ds, &cfg);
    assert_eq!(view.summary.current_amount_due, -500);
    assert!(view.summary.inconsistent);
}

// ---------------------------------------------------------------------------
// Cash flow
// ---------------------------------------------------------------------------
#[test]
fn net_flow_derived_from_components_when_missing() {
    let mut ds = Dataset::reference();
    ds.cash_flow = vec![CashFlowPeriod {
        period: "Week 2".to_string(),
        outflow: 3850,
        inflow: 5200,
        net_flow: None,
    }];
    let view = ViewBuilder::default().build(&ds);
    assert_eq!(view.cash_flow.periods[0].net_flow, 1350);
    assert_eq!(view.cash_flow.periods[0].net_flow_source, NetFlowSource::Derived);
    assert_eq!(view.cash_flow.totals.net_flow, 1350);
}

#[test]
fn explicit_net_flow_trusted_unless_recompute() {
    let mut ds = Dataset::reference();
    ds.cash_flow[3].net_flow = Some(0);

    let trusted = ViewBuilder::default().build(&ds);
    assert_eq!(trusted.cash_flow.periods[3].net_flow, 0);
    assert!(trusted.warnings.contains(&DatasetWarning::NetFlowMismatch {
        period: "Week 4".to_string(),
        explicit: 0,
        derived: 1850,
    }));

    let cfg = ViewConfig {
        net_flow_policy: NetFlowPolicy::Recompute,
        ..ViewConfig::default()
    };
    let recomputed = build_view(&ds, &cfg);
    assert_eq!(recomputed.cash_flow.periods[3].net_flow, 1850);
}

// ---------------------------------------------------------------------------
// Idempotence and passthrough
// ---------------------------------------------------------------------------
#[test]
fn building_twice_yields_identical_views() {
    let ds = Dataset::reference();
    let builder = ViewBuilder::new(ViewConfig::default());
    let first = builder.build(&ds);
    let second = builder.build(&ds);
    assert_eq!(first, second);
    assert_eq!(first.fingerprint(), second.fingerprint());
    assert_eq!(ds, Dataset::reference());
}

#[test]
fn vendor_percentages_pass_through_unnormalized() {
    let mut ds = Dataset::reference();
    // 19.4 + 18.8 + 18.1 + 15.3 + 11.7 + 16.7 = 100.0
    ds.vendors[5].percentage = 16.7;
    let view = ViewBuilder::default().build(&ds);

    let sum: f64 = view.vendors.iter().map(|v| v.percentage).sum();
    assert!((sum - 100.0).abs() < 0.5);
    for (src, out) in ds.vendors.iter().zip(&view.vendors) {
        assert_eq!(src.percentage, out.percentage);
    }
    assert!(view.warnings.is_empty(), "unexpected: {:?}", view.warnings);
}

#[test]
fn short_vendor_share_is_a_warning_not_a_rewrite() {
    let ds = Dataset::reference();
    let view = ViewBuilder::default().build(&ds);
    assert_eq!(view.vendors[5].percentage, 10.3);
    assert!(matches!(view.warnings.as_slice(), [DatasetWarning::VendorShareSum { .. }]));
}

// ---------------------------------------------------------------------------
// Open label domain
// ---------------------------------------------------------------------------
#[test]
fn unknown_labels_degrade_to_neutral_style() {
    let json = r#"{
        "summary": {"totalAmountDue": 10, "overdueAmount": 5, "cashPosition": 100,
                    "riskScore": "Elevated", "workingCapital": 50},
        "kpis": [{"title": "Approval Lag", "value": "3.1", "unit": "days",
                  "trend": "down", "change": "-0.4%", "status": "stellar"}],
        "cashFlow": [],
        "risks": [],
        "vendors": [],
        "treasury": []
    }"#;
    let ds: Dataset = serde_json::from_str(json).unwrap();
    let view = ViewBuilder::default().build(&ds);

    assert_eq!(view.summary.risk_style, SeverityStyle::NEUTRAL);
    assert_eq!(view.summary.risk_score, RiskLevel::parse("Elevated"));
    assert_eq!(view.kpis[0].style, SeverityStyle::NEUTRAL);
    assert_eq!(view.warnings.len(), 2);
    assert_eq!(view.summary.current_amount_due, 5);
}

// ---------------------------------------------------------------------------
// Serialized view shape
// ---------------------------------------------------------------------------
#[test]
fn view_serializes_for_renderers() {
    let view = ViewBuilder::default().build(&Dataset::reference());
    let v = serde_json::to_value(&view).unwrap();
    assert_eq!(v["summary"]["currentAmountDue"], 4601);
    assert_eq!(v["summary"]["currentDisplay"], "$4,601");
    assert_eq!(v["kpis"][3]["style"]["text"]["tone"], "emerald");
    assert_eq!(v["risks"][1]["barTone"], "emerald");
    assert_eq!(v["treasury"][1]["balanceDisplay"], "£29,808");
    assert_eq!(v["cashFlow"]["periods"][1]["netFlowSource"], "explicit");
    assert_eq!(v["warnings"][0]["kind"], "vendor_share_sum");
}

// ---------------------------------------------------------------------------
// Extreme amounts
// ---------------------------------------------------------------------------
#[test]
fn totals_past_the_amount_range_saturate_and_warn() {
    let json = r#"{
        "summary": {"totalAmountDue": 10, "overdueAmount": 5, "cashPosition": 100,
                    "riskScore": "Low", "workingCapital": 50},
        "kpis": [],
        "cashFlow": [
            {"period": "Q1", "outflow": 0, "inflow": 4611686018427387904},
            {"period": "Q2", "outflow": 0, "inflow": 4611686018427387904}
        ],
        "risks": [],
        "vendors": [],
        "treasury": []
    }"#;
    let ds: Dataset = serde_json::from_str(json).unwrap();
    let view = ViewBuilder::default().build(&ds);

    assert_eq!(view.cash_flow.totals.inflow, i64::MAX);
    assert_eq!(view.cash_flow.totals.net_flow, i64::MAX);
    assert_eq!(view.cash_flow.periods[1].net_flow, 4611686018427387904);

    let v = serde_json::to_value(&view.warnings).unwrap();
    let overflowed: Vec<&str> = v
        .as_array()
        .unwrap()
        .iter()
        .filter(|w| w["kind"] == "amount_overflow")
        .filter_map(|w| w["field"].as_str())
        .collect();
    assert_eq!(overflowed, ["cashFlow.totals.inflow", "cashFlow.totals.netFlow"]);
}
