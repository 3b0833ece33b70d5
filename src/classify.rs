//! Severity classification for KPI statuses and risk tiers.
//!
//! Both label sets are open: anything the dataset author writes is accepted,
//! and labels outside the known tiers resolve to the neutral style.

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Tones and styles
// =============================================================================

/// Abstract colour family. The presentation layer decides what each one
/// looks like.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Emerald,
    Green,
    Amber,
    Red,
    Gray,
}

impl Tone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Emerald => "emerald",
            Tone::Green => "green",
            Tone::Amber => "amber",
            Tone::Red => "red",
            Tone::Gray => "gray",
        }
    }
}

/// A tone at a given opacity (percent).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shade {
    pub tone: Tone,
    pub alpha: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeverityStyle {
    pub text: Shade,
    pub background: Shade,
    pub border: Shade,
}

impl SeverityStyle {
    pub const TEXT_ALPHA: u8 = 100;
    pub const BACKGROUND_ALPHA: u8 = 10;
    pub const BORDER_ALPHA: u8 = 30;

    pub const NEUTRAL: SeverityStyle = SeverityStyle::of(Tone::Gray);

    pub const fn of(tone: Tone) -> Self {
        Self {
            text: Shade { tone, alpha: Self::TEXT_ALPHA },
            background: Shade { tone, alpha: Self::BACKGROUND_ALPHA },
            border: Shade { tone, alpha: Self::BORDER_ALPHA },
        }
    }

    pub fn is_neutral(&self) -> bool {
        *self == Self::NEUTRAL
    }
}

// =============================================================================
// KPI status
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum KpiStatus {
    Excellent,
    Good,
    Warning,
    Risk,
    Unrecognized(String),
}

impl KpiStatus {
    pub fn parse(label: &str) -> Self {
        match label {
            "excellent" => KpiStatus::Excellent,
            "good" => KpiStatus::Good,
            "warning" => KpiStatus::Warning,
            "risk" => KpiStatus::Risk,
            other => KpiStatus::Unrecognized(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            KpiStatus::Excellent => "excellent",
            KpiStatus::Good => "good",
            KpiStatus::Warning => "warning",
            KpiStatus::Risk => "risk",
            KpiStatus::Unrecognized(s) => s,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, KpiStatus::Unrecognized(_))
    }

    pub fn severity(&self) -> SeverityStyle {
        match self {
            KpiStatus::Excellent => SeverityStyle::of(Tone::Emerald),
            KpiStatus::Good => SeverityStyle::of(Tone::Green),
            KpiStatus::Warning => SeverityStyle::of(Tone::Amber),
            KpiStatus::Risk => SeverityStyle::of(Tone::Red),
            KpiStatus::Unrecognized(_) => SeverityStyle::NEUTRAL,
        }
    }
}

impl From<String> for KpiStatus {
    fn from(s: String) -> Self {
        KpiStatus::parse(&s)
    }
}

impl From<&str> for KpiStatus {
    fn from(s: &str) -> Self {
        KpiStatus::parse(s)
    }
}

impl From<KpiStatus> for String {
    fn from(s: KpiStatus) -> Self {
        s.as_str().to_string()
    }
}

impl fmt::Display for KpiStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Risk tier
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Unrecognized(String),
}

impl RiskLevel {
    pub fn parse(label: &str) -> Self {
        match label {
            "Low" => RiskLevel::Low,
            "Medium" => RiskLevel::Medium,
            "High" => RiskLevel::High,
            other => RiskLevel::Unrecognized(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
            RiskLevel::Unrecognized(s) => s,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, RiskLevel::Unrecognized(_))
    }

    pub fn severity(&self) -> SeverityStyle {
        match self {
            RiskLevel::Low => SeverityStyle::of(Tone::Green),
            RiskLevel::Medium => SeverityStyle::of(Tone::Amber),
            RiskLevel::High => SeverityStyle::of(Tone::Red),
            RiskLevel::Unrecognized(_) => SeverityStyle::NEUTRAL,
        }
    }

    /// Fill tone for a risk score bar. Anything below High/Medium, including
    /// unknown tiers, draws as healthy.
    pub fn bar_tone(&self) -> Tone {
        match self {
            RiskLevel::High => Tone::Red,
            RiskLevel::Medium => Tone::Amber,
            _ => Tone::Emerald,
        }
    }
}

impl From<String> for RiskLevel {
    fn from(s: String) -> Self {
        RiskLevel::parse(&s)
    }
}

impl From<&str> for RiskLevel {
    fn from(s: &str) -> Self {
        RiskLevel::parse(s)
    }
}

impl From<RiskLevel> for String {
    fn from(r: RiskLevel) -> Self {
        r.as_str().to_string()
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Entry points
// =============================================================================

/// Style for a KPI status label. Never fails.
pub fn classify_status(status: &str) -> SeverityStyle {
    KpiStatus::parse(status).severity()
}

/// Style for a risk tier label. Never fails.
pub fn classify_risk(risk: &str) -> SeverityStyle {
    RiskLevel::parse(risk).severity()
}

/// Series palette for vendor and treasury swatches, looked up by position.
pub const SERIES_PALETTE: [&str; 6] = [
    "#3b82f6", "#6366f1", "#8b5cf6", "#06b6d4", "#10b981", "#f59e0b",
];

pub fn series_color(index: usize) -> &'static str {
    SERIES_PALETTE[index % SERIES_PALETTE.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_tiers_pairwise_distinct() {
        let styles: Vec<SeverityStyle> = ["excellent", "good", "warning", "risk"]
            .iter()
            .map(|s| classify_status(s))
            .collect();
        for i in 0..styles.len() {
            assert!(!styles[i].is_neutral());
            for j in (i + 1)..styles.len() {
                assert_ne!(styles[i], styles[j], "tiers {} and {} collide", i, j);
            }
        }
    }

    #[test]
    fn test_unknown_status_is_neutral() {
        assert_eq!(classify_status("unknown-value"), SeverityStyle::NEUTRAL);
        assert_eq!(classify_status(""), SeverityStyle::NEUTRAL);
        // labels are case sensitive
        assert_eq!(classify_status("Excellent"), SeverityStyle::NEUTRAL);
    }

    #[test]
    fn test_risk_tiers_pairwise_distinct() {
        let low = classify_risk("Low");
        let medium = classify_risk("Medium");
        let high = classify_risk("High");
        assert_ne!(low, medium);
        assert_ne!(low, high);
        assert_ne!(medium, high);
        assert!(!low.is_neutral() && !medium.is_neutral() && !high.is_neutral());
    }

    #[test]
    fn test_unknown_risk_is_neutral() {
        assert_eq!(classify_risk("Severe"), SeverityStyle::NEUTRAL);
        assert_eq!(classify_risk("low"), SeverityStyle::NEUTRAL);
    }

    #[test]
    fn test_risk_and_status_tables_are_independent() {
        assert_eq!(classify_risk("Low").text.tone, Tone::Green);
        assert_eq!(classify_status("excellent").text.tone, Tone::Emerald);
        assert_ne!(classify_risk("Low"), classify_status("excellent"));
    }

    #[test]
    fn test_style_alphas() {
        let s = SeverityStyle::of(Tone::Red);
        assert_eq!(s.text.alpha, 100);
        assert_eq!(s.background.alpha, 10);
        assert_eq!(s.border.alpha, 30);
    }

    #[test]
    fn test_bar_tone() {
        assert_eq!(RiskLevel::High.bar_tone(), Tone::Red);
        assert_eq!(RiskLevel::Medium.bar_tone(), Tone::Amber);
        assert_eq!(RiskLevel::Low.bar_tone(), Tone::Emerald);
        assert_eq!(RiskLevel::parse("??").bar_tone(), Tone::Emerald);
    }

    #[test]
    fn test_serde_keeps_unrecognized_label() {
        let s: KpiStatus = serde_json::from_str("\"stellar\"").unwrap();
        assert_eq!(s, KpiStatus::Unrecognized("stellar".to_string()));
        assert_eq!(serde_json::to_string(&s).unwrap(), "\"stellar\"");
        let r: RiskLevel = serde_json::from_str("\"Medium\"").unwrap();
        assert_eq!(r, RiskLevel::Medium);
    }

    #[test]
    fn test_series_color_wraps() {
        assert_eq!(series_color(0), "#3b82f6");
        assert_eq!(series_color(6), "#3b82f6");
    }
}
