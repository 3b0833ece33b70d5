//! Dashboard dataset: the records a single snapshot is built from.
//!
//! Amounts are whole currency units. Percentages are in `[0, 100]`.
//! Records carry no display tokens; colours and icons are looked up by the
//! presentation layer.

use serde::{Deserialize, Serialize};

use crate::classify::{KpiStatus, RiskLevel};

pub type Amount = i64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutiveSummary {
    pub total_amount_due: Amount,
    pub overdue_amount: Amount,
    pub cash_position: Amount,
    pub risk_score: RiskLevel,
    pub working_capital: Amount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiMetric {
    pub title: String,
    /// Pre-computed figure, kept as authored.
    pub value: String,
    pub unit: String,
    pub trend: Trend,
    /// Signed percentage label such as `+2.1%`.
    pub change: String,
    pub status: KpiStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashFlowPeriod {
    pub period: String,
    pub outflow: Amount,
    pub inflow: Amount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub net_flow: Option<Amount>,
}

impl CashFlowPeriod {
    /// `inflow - outflow`, or `None` when the difference does not fit.
    pub fn checked_net_flow(&self) -> Option<Amount> {
        self.inflow.checked_sub(self.outflow)
    }

    /// `inflow - outflow`, saturating at the `Amount` bounds.
    pub fn derived_net_flow(&self) -> Amount {
        self.inflow.saturating_sub(self.outflow)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskCategory {
    pub category: String,
    pub score: u8,
    pub status: RiskLevel,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Relationship {
    Strategic,
    Preferred,
    Standard,
}

impl Relationship {
    pub fn as_str(&self) -> &'static str {
        match self {
            Relationship::Strategic => "Strategic",
            Relationship::Preferred => "Preferred",
            Relationship::Standard => "Standard",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vendor {
    pub name: String,
    pub amount: Amount,
    pub percentage: f64,
    pub risk_score: RiskLevel,
    pub payment_terms: String,
    pub relationship: Relationship,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreasuryAccount {
    pub account: String,
    pub balance: Amount,
    /// ISO 4217 code the balance is denominated in.
    pub currency: String,
    #[serde(rename = "type")]
    pub account_type: String,
    pub utilization: u8,
}

/// One dashboard snapshot. Built once and passed by reference to whatever
/// consumes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub summary: ExecutiveSummary,
    pub kpis: Vec<KpiMetric>,
    pub cash_flow: Vec<CashFlowPeriod>,
    pub risks: Vec<RiskCategory>,
    pub vendors: Vec<Vendor>,
    pub treasury: Vec<TreasuryAccount>,
}

fn kpi(title: &str, value: &str, unit: &str, trend: Trend, change: &str, status: &str) -> KpiMetric {
    KpiMetric {
        title: title.to_string(),
        value: value.to_string(),
        unit: unit.to_string(),
        trend,
        change: change.to_string(),
        status: KpiStatus::parse(status),
    }
}

fn period(label: &str, outflow: Amount, inflow: Amount, net_flow: Amount) -> CashFlowPeriod {
    CashFlowPeriod {
        period: label.to_string(),
        outflow,
        inflow,
        net_flow: Some(net_flow),
    }
}

fn risk(category: &str, score: u8, status: &str, description: &str) -> RiskCategory {
    RiskCategory {
        category: category.to_string(),
        score,
        status: RiskLevel::parse(status),
        description: description.to_string(),
    }
}

fn vendor(
    name: &str,
    amount: Amount,
    percentage: f64,
    risk_score: &str,
    payment_terms: &str,
    relationship: Relationship,
) -> Vendor {
    Vendor {
        name: name.to_string(),
        amount,
        percentage,
        risk_score: RiskLevel::parse(risk_score),
        payment_terms: payment_terms.to_string(),
        relationship,
    }
}

fn account(name: &str, balance: Amount, currency: &str, account_type: &str, utilization: u8) -> TreasuryAccount {
    TreasuryAccount {
        account: name.to_string(),
        balance,
        currency: currency.to_string(),
        account_type: account_type.to_string(),
        utilization,
    }
}

impl Dataset {
    /// The curated reference snapshot the dashboard ships with.
    pub fn reference() -> Self {
        Self {
            summary: ExecutiveSummary {
                total_amount_due: 19217,
                overdue_amount: 14616,
                cash_position: 231212,
                risk_score: RiskLevel::Medium,
                working_capital: 187595,
            },
            kpis: vec![
                kpi("Days Payable Outstanding", "45.2", "days", Trend::Up, "+2.1%", "warning"),
                kpi("Payment Velocity", "12.3", "days avg", Trend::Down, "-1.8%", "good"),
                kpi("Vendor Concentration", "37.6", "%", Trend::Up, "+4.2%", "risk"),
                kpi("Cash Conversion Cycle", "28.7", "days", Trend::Down, "-3.5%", "excellent"),
            ],
            cash_flow: vec![
                period("Week 1", 4200, 2800, -1400),
                period("Week 2", 3850, 5200, 1350),
                period("Week 3", 5100, 3200, -1900),
                period("Week 4", 2950, 4800, 1850),
            ],
            risks: vec![
                risk("Concentration Risk", 75, "Medium", "Top 3 vendors represent 56.3% of payables"),
                risk("Liquidity Risk", 20, "Low", "Strong cash position with 45 days coverage"),
                risk("Operational Risk", 45, "Medium", "24% of vendors have extended payment terms"),
                risk("Currency Risk", 35, "Low", "Multi-currency exposure well hedged"),
            ],
            vendors: vec![
                vendor("Innovative Tech", 3728, 19.4, "Low", "Net 30", Relationship::Strategic),
                vendor("TechAdvantage Software", 3616, 18.8, "Medium", "Net 45", Relationship::Preferred),
                vendor("Coastal Shipping", 3473, 18.1, "Low", "Net 15", Relationship::Standard),
                vendor("Green Gardens", 2944, 15.3, "Medium", "Net 30", Relationship::Strategic),
                vendor("City Construction", 2256, 11.7, "High", "Net 60", Relationship::Standard),
                vendor("Urban Apparel", 1985, 10.3, "Low", "Net 30", Relationship::Preferred),
            ],
            treasury: vec![
                account("Operating Account (USD)", 102315, "USD", "Primary", 68),
                account("Foreign Exchange (GBP)", 29808, "GBP", "FX Hedge", 45),
                account("Trade Finance (CAD)", 56123, "CAD", "Trade", 72),
                account("Reserve Fund (AUD)", 42966, "AUD", "Reserve", 23),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_shape() {
        let ds = Dataset::reference();
        assert_eq!(ds.kpis.len(), 4);
        assert_eq!(ds.cash_flow.len(), 4);
        assert_eq!(ds.risks.len(), 4);
        assert_eq!(ds.vendors.len(), 6);
        assert_eq!(ds.treasury.len(), 4);
        assert!(ds.summary.overdue_amount <= ds.summary.total_amount_due);
    }

    #[test]
    fn test_reference_net_flows_agree() {
        for p in Dataset::reference().cash_flow {
            assert_eq!(p.net_flow, Some(p.derived_net_flow()), "{}", p.period);
        }
    }

    #[test]
    fn test_json_field_names() {
        let ds = Dataset::reference();
        let v = serde_json::to_value(&ds).unwrap();
        assert_eq!(v["summary"]["totalAmountDue"], 19217);
        assert_eq!(v["treasury"][1]["type"], "FX Hedge");
        assert_eq!(v["vendors"][0]["riskScore"], "Low");
        assert_eq!(v["kpis"][0]["trend"], "up");
    }

    #[test]
    fn test_net_flow_optional_in_json() {
        let p: CashFlowPeriod =
            serde_json::from_str(r#"{"period":"Week 9","outflow":3850,"inflow":5200}"#).unwrap();
        assert_eq!(p.net_flow, None);
        assert_eq!(p.derived_net_flow(), 1350);
    }

    #[test]
    fn test_derived_net_flow_saturates() {
        let p = CashFlowPeriod {
            period: "Week 1".to_string(),
            outflow: i64::MAX,
            inflow: -10,
            net_flow: None,
        };
        assert_eq!(p.checked_net_flow(), None);
        assert_eq!(p.derived_net_flow(), i64::MIN);
    }
}
