//! Data models for outbound alerts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How urgent an alert is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Requires immediate attention.
    High,
    /// Should be looked at soon.
    Medium,
    /// Worth knowing.
    Low,
    /// Informational status.
    Info,
}

impl Severity {
    /// The embed color code used for this severity.
    pub fn color(&self) -> u32 {
        match self {
            Severity::High => 0xE74C3C,
            Severity::Medium => 0xF39C12,
            Severity::Low => 0x3498DB,
            Severity::Info => 0x2ECC71,
        }
    }
}

/// A named value shown in an alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertField {
    /// Field label.
    pub name: String,
    /// Field value.
    pub value: String,
    /// Whether the field may be rendered side by side with others.
    #[serde(default)]
    pub inline: bool,
}

impl AlertField {
    /// Creates an inline field.
    pub fn inline(name: impl Into<String>, value: impl ToString) -> Self {
        Self { name: name.into(), value: value.to_string(), inline: true }
    }

    /// Creates a full-width field.
    pub fn block(name: impl Into<String>, value: impl ToString) -> Self {
        Self { name: name.into(), value: value.to_string(), inline: false }
    }
}

/// A structured alert delivered to the notification channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Short headline.
    pub title: String,
    /// Longer explanation.
    pub description: String,
    /// Severity of the alert.
    pub severity: Severity,
    /// Named values.
    pub fields: Vec<AlertField>,
    /// When the alert was raised.
    pub timestamp: DateTime<Utc>,
}

impl Alert {
    /// Creates an alert stamped with the current time.
    pub fn new(title: impl Into<String>, description: impl Into<String>, severity: Severity) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity,
            fields: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    /// Appends a field.
    pub fn with_field(mut self, field: AlertField) -> Self {
        self.fields.push(field);
        self
    }

    /// The numeric color code of the alert.
    pub fn color(&self) -> u32 {
        self.severity.color()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_builder() {
        let alert = Alert::new("No activity", "Nothing worked", Severity::High)
            .with_field(AlertField::inline("Jobs", 3))
            .with_field(AlertField::block("Window", "91-100"));
        assert_eq!(alert.fields.len(), 2);
        assert!(alert.fields[0].inline);
        assert!(!alert.fields[1].inline);
        assert_eq!(alert.fields[0].value, "3");
        assert_eq!(alert.color(), 0xE74C3C);
    }

    #[test]
    fn test_severity_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Severity::High).unwrap(), "\"high\"");
    }
}
