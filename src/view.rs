//! Derived view: everything a renderer needs, resolved from one `Dataset`.
//!
//! The builder reads the dataset and returns a fresh `DashboardView`. It
//! holds no state between builds, so building twice yields equal output.

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::str::FromStr;

use crate::classify::{KpiStatus, RiskLevel, SeverityStyle, Tone};
use crate::format::{format_currency, format_percent, DEFAULT_CURRENCY};
use crate::logging::{log_audit, log_config_fallback, log_dataset_warning, log_view_built};
use crate::model::{
    Amount, Dataset, KpiMetric, Relationship, RiskCategory, TreasuryAccount, Trend, Vendor,
};
use crate::validate::{check_dataset, DatasetWarning};

// =============================================================================
// Configuration
// =============================================================================

/// What to show as "current" when overdue exceeds the total due.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OverduePolicy {
    /// Floor the current amount at zero.
    Clamp,
    /// Show the negative figure and flag the summary.
    Propagate,
}

impl FromStr for OverduePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "clamp" => Ok(OverduePolicy::Clamp),
            "propagate" => Ok(OverduePolicy::Propagate),
            other => Err(anyhow!("unknown overdue policy {:?} (expected clamp|propagate)", other)),
        }
    }
}

/// Which net flow wins when a period carries an explicit figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NetFlowPolicy {
    /// Use the explicit figure as-is; derive only when it is absent.
    TrustExplicit,
    /// Always use inflow - outflow.
    Recompute,
}

impl FromStr for NetFlowPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trust" | "trust_explicit" => Ok(NetFlowPolicy::TrustExplicit),
            "recompute" => Ok(NetFlowPolicy::Recompute),
            other => Err(anyhow!("unknown net flow policy {:?} (expected trust|recompute)", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewConfig {
    /// Currency for amounts that carry no code of their own.
    pub currency: String,
    pub overdue_policy: OverduePolicy,
    pub net_flow_policy: NetFlowPolicy,
    /// Allowed distance of the vendor percentage sum from 100.
    pub pct_tolerance: f64,
    pub refresh_delay_ms: u64,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            currency: DEFAULT_CURRENCY.to_string(),
            overdue_policy: OverduePolicy::Clamp,
            net_flow_policy: NetFlowPolicy::TrustExplicit,
            pct_tolerance: 0.5,
            refresh_delay_ms: 1000,
        }
    }
}

fn parse_key<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow!("{}", e))
            .with_context(|| format!("invalid {}={:?}", key, raw)),
        None => Ok(default),
    }
}

fn valid_tolerance(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

fn lenient_key<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + Copy,
    T::Err: std::fmt::Display,
{
    parse_key(lookup, key, default).unwrap_or_else(|err| {
        log_config_fallback(key, &lookup(key).unwrap_or_default(), &format!("{:#}", err));
        default
    })
}

impl ViewConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Lenient: every unset or unparseable key keeps its default, and bad
    /// values are logged.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let d = Self::default();
        let mut pct_tolerance = lenient_key(&lookup, "DASH_PCT_TOLERANCE", d.pct_tolerance);
        if !valid_tolerance(pct_tolerance) {
            log_config_fallback(
                "DASH_PCT_TOLERANCE",
                &pct_tolerance.to_string(),
                "must be a finite, non-negative number",
            );
            pct_tolerance = d.pct_tolerance;
        }
        Self {
            currency: lookup("DASH_CURRENCY")
                .map(|c| c.trim().to_ascii_uppercase())
                .filter(|c| !c.is_empty())
                .unwrap_or(d.currency),
            overdue_policy: lenient_key(&lookup, "DASH_OVERDUE_POLICY", d.overdue_policy),
            net_flow_policy: lenient_key(&lookup, "DASH_NETFLOW_POLICY", d.net_flow_policy),
            pct_tolerance,
            refresh_delay_ms: lenient_key(&lookup, "DASH_REFRESH_MS", d.refresh_delay_ms),
        }
    }

    /// Strict: the first unparseable key is an error.
    pub fn try_from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let d = Self::default();
        let currency = lookup("DASH_CURRENCY")
            .map(|c| c.trim().to_ascii_uppercase())
            .filter(|c| !c.is_empty())
            .unwrap_or(d.currency);
        let pct_tolerance: f64 = parse_key(&lookup, "DASH_PCT_TOLERANCE", d.pct_tolerance)?;
        if !valid_tolerance(pct_tolerance) {
            return Err(anyhow!("DASH_PCT_TOLERANCE must be a finite, non-negative number"));
        }
        Ok(Self {
            currency,
            overdue_policy: parse_key(&lookup, "DASH_OVERDUE_POLICY", d.overdue_policy)?,
            net_flow_policy: parse_key(&lookup, "DASH_NETFLOW_POLICY", d.net_flow_policy)?,
            pct_tolerance,
            refresh_delay_ms: parse_key(&lookup, "DASH_REFRESH_MS", d.refresh_delay_ms)?,
        })
    }
}

// =============================================================================
// View model
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryView {
    pub total_amount_due: Amount,
    pub overdue_amount: Amount,
    pub current_amount_due: Amount,
    /// Set when overdue exceeded the total due in the source.
    pub inconsistent: bool,
    pub cash_position: Amount,
    pub working_capital: Amount,
    pub risk_score: RiskLevel,
    pub risk_style: SeverityStyle,
    pub total_display: String,
    pub overdue_display: String,
    pub current_display: String,
    pub cash_position_display: String,
    pub working_capital_display: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiView {
    pub title: String,
    pub value: String,
    pub unit: String,
    pub trend: Trend,
    pub change: String,
    pub status: KpiStatus,
    pub style: SeverityStyle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NetFlowSource {
    Explicit,
    Derived,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CashFlowPeriodView {
    pub period: String,
    pub inflow: Amount,
    pub outflow: Amount,
    pub net_flow: Amount,
    pub net_flow_source: NetFlowSource,
    pub inflow_display: String,
    pub outflow_display: String,
    pub net_flow_display: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CashFlowTotals {
    pub inflow: Amount,
    pub outflow: Amount,
    pub net_flow: Amount,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CashFlowView {
    pub periods: Vec<CashFlowPeriodView>,
    pub totals: CashFlowTotals,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskView {
    pub category: String,
    pub score: u8,
    pub status: RiskLevel,
    pub description: String,
    pub style: SeverityStyle,
    pub bar_tone: Tone,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorView {
    pub name: String,
    pub amount: Amount,
    pub percentage: f64,
    pub risk_score: RiskLevel,
    pub payment_terms: String,
    pub relationship: Relationship,
    pub style: SeverityStyle,
    pub amount_display: String,
    pub share_display: String,
    pub relationship_label: String,
    pub risk_label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreasuryView {
    pub account: String,
    pub balance: Amount,
    pub currency: String,
    pub account_type: String,
    pub utilization: u8,
    pub balance_display: String,
    pub type_label: String,
    pub utilization_display: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub summary: SummaryView,
    pub kpis: Vec<KpiView>,
    pub cash_flow: CashFlowView,
    pub risks: Vec<RiskView>,
    pub vendors: Vec<VendorView>,
    pub treasury: Vec<TreasuryView>,
    pub warnings: Vec<DatasetWarning>,
}

impl DashboardView {
    /// SHA-256 over the serialized view, hex encoded.
    pub fn fingerprint(&self) -> String {
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        hex::encode(Sha256::digest(&bytes))
    }
}

// =============================================================================
// Builder
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct ViewBuilder {
    cfg: ViewConfig,
}

impl ViewBuilder {
    pub fn new(cfg: ViewConfig) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &ViewConfig {
        &self.cfg
    }

    pub fn build(&self, ds: &Dataset) -> DashboardView {
        let mut warnings = check_dataset(ds, self.cfg.pct_tolerance);
        let cash_flow = self.cash_flow(ds, &mut warnings);
        for w in &warnings {
            log_dataset_warning(w.kind(), &w.to_string());
        }

        let view = DashboardView {
            summary: self.summary(ds),
            kpis: ds.kpis.iter().map(kpi_view).collect(),
            cash_flow,
            risks: ds.risks.iter().map(risk_view).collect(),
            vendors: ds.vendors.iter().map(|v| self.vendor(v)).collect(),
            treasury: ds.treasury.iter().map(treasury_view).collect(),
            warnings,
        };

        log_view_built(
            view.kpis.len(),
            view.cash_flow.periods.len(),
            view.vendors.len(),
            view.treasury.len(),
            view.warnings.len(),
            ds.vendors.iter().map(|v| v.percentage).sum(),
        );
        log_audit("view_fingerprint", &view.fingerprint());
        view
    }

    fn money(&self, amount: Amount) -> String {
        format_currency(amount, &self.cfg.currency)
    }

    fn summary(&self, ds: &Dataset) -> SummaryView {
        let s = &ds.summary;
        let (current, inconsistent) = current_amount_due(
            s.total_amount_due,
            s.overdue_amount,
            self.cfg.overdue_policy,
        );
        SummaryView {
            total_amount_due: s.total_amount_due,
            overdue_amount: s.overdue_amount,
            current_amount_due: current,
            inconsistent,
            cash_position: s.cash_position,
            working_capital: s.working_capital,
            risk_score: s.risk_score.clone(),
            risk_style: s.risk_score.severity(),
            total_display: self.money(s.total_amount_due),
            overdue_display: self.money(s.overdue_amount),
            current_display: self.money(current),
            cash_position_display: self.money(s.cash_position),
            working_capital_display: self.money(s.working_capital),
        }
    }

    fn cash_flow(&self, ds: &Dataset, warnings: &mut Vec<DatasetWarning>) -> CashFlowView {
        let mut totals = CashFlowTotals::default();
        let mut overflowed = [false; 3];
        let periods = ds
            .cash_flow
            .iter()
            .map(|p| {
                let (net_flow, source) = match (self.cfg.net_flow_policy, p.net_flow) {
                    (NetFlowPolicy::TrustExplicit, Some(explicit)) => {
                        (explicit, NetFlowSource::Explicit)
                    }
                    _ => (p.derived_net_flow(), NetFlowSource::Derived),
                };
                overflowed[0] |= accumulate(&mut totals.inflow, p.inflow);
                overflowed[1] |= accumulate(&mut totals.outflow, p.outflow);
                overflowed[2] |= accumulate(&mut totals.net_flow, net_flow);
                CashFlowPeriodView {
                    period: p.period.clone(),
                    inflow: p.inflow,
                    outflow: p.outflow,
                    net_flow,
                    net_flow_source: source,
                    inflow_display: self.money(p.inflow),
                    outflow_display: self.money(p.outflow),
                    net_flow_display: self.money(net_flow),
                }
            })
            .collect();

        let fields = ["cashFlow.totals.inflow", "cashFlow.totals.outflow", "cashFlow.totals.netFlow"];
        for (field, hit) in fields.iter().zip(overflowed) {
            if hit {
                warnings.push(DatasetWarning::AmountOverflow {
                    field: field.to_string(),
                });
            }
        }
        CashFlowView { periods, totals }
    }

    fn vendor(&self, v: &Vendor) -> VendorView {
        VendorView {
            name: v.name.clone(),
            amount: v.amount,
            percentage: v.percentage,
            risk_score: v.risk_score.clone(),
            payment_terms: v.payment_terms.clone(),
            relationship: v.relationship,
            style: v.risk_score.severity(),
            amount_display: self.money(v.amount),
            share_display: format!("{} of total", format_percent(v.percentage)),
            relationship_label: format!("{} Partner", v.relationship.as_str()),
            risk_label: format!("{} Risk", v.risk_score),
        }
    }
}

/// Add `value` into a running total, saturating at the `Amount` bounds.
/// Returns true when the exact sum did not fit.
fn accumulate(total: &mut Amount, value: Amount) -> bool {
    match total.checked_add(value) {
        Some(sum) => {
            *total = sum;
            false
        }
        None => {
            *total = total.saturating_add(value);
            true
        }
    }
}

/// Current payables and whether the source was inconsistent.
pub fn current_amount_due(total: Amount, overdue: Amount, policy: OverduePolicy) -> (Amount, bool) {
    let raw = total.saturating_sub(overdue);
    let inconsistent = overdue > total;
    match policy {
        OverduePolicy::Clamp => (raw.max(0), inconsistent),
        OverduePolicy::Propagate => (raw, inconsistent),
    }
}

fn kpi_view(k: &KpiMetric) -> KpiView {
    KpiView {
        title: k.title.clone(),
        value: k.value.clone(),
        unit: k.unit.clone(),
        trend: k.trend,
        change: k.change.clone(),
        status: k.status.clone(),
        style: k.status.severity(),
    }
}

fn risk_view(r: &RiskCategory) -> RiskView {
    RiskView {
        category: r.category.clone(),
        score: r.score,
        status: r.status.clone(),
        description: r.description.clone(),
        style: r.status.severity(),
        bar_tone: r.status.bar_tone(),
    }
}

fn treasury_view(t: &TreasuryAccount) -> TreasuryView {
    TreasuryView {
        account: t.account.clone(),
        balance: t.balance,
        currency: t.currency.clone(),
        account_type: t.account_type.clone(),
        utilization: t.utilization,
        balance_display: format_currency(t.balance, &t.currency),
        type_label: format!("{} Account", t.account_type),
        utilization_display: format!("{} utilized", format_percent(t.utilization as f64)),
    }
}

/// Build with an explicit configuration.
pub fn build_view(ds: &Dataset, cfg: &ViewConfig) -> DashboardView {
    ViewBuilder::new(cfg.clone()).build(ds)
}
