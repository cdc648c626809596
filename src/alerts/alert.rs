use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Severity::Critical => "critical",
            Severity::Warning => "warning",
            Severity::Info => "info",
        })
    }
}

/// One rule violation. Never mutated after it is emitted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Deterministic per rule and equipment (e.g. `batt_crit_house`)
    pub id: String,
    pub severity: Severity,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Receives alerts synchronously, in subscription order
pub trait AlertSubscriber: Send + Sync {
    fn on_alert(&self, alert: &Alert);
}

impl<F> AlertSubscriber for F
where
    F: Fn(&Alert) + Send + Sync,
{
    fn on_alert(&self, alert: &Alert) {
        self(alert)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_alert_wire_format() {
        let alert = Alert {
            id: "shallow".to_string(),
            severity: Severity::Warning,
            message: "SHALLOW WATER: 1.8m".to_string(),
            timestamp: Utc.with_ymd_and_hms(2026, 5, 2, 8, 30, 0).unwrap(),
        };

        let value = serde_json::to_value(&alert).unwrap();
        assert_eq!(value["id"], "shallow");
        assert_eq!(value["severity"], "warning");
        assert_eq!(value["timestamp"], "2026-05-02T08:30:00Z");

        let back: Alert = serde_json::from_value(value).unwrap();
        assert_eq!(back, alert);
    }
}
