//! Builds the embed-style JSON body posted to the alert webhook.

use serde::Serialize;

use crate::models::Alert;

/// The body of a webhook delivery.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbedPayload {
    /// A single embed per alert.
    pub embeds: Vec<Embed>,
}

/// One rich message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Embed {
    /// Headline.
    pub title: String,
    /// Body text.
    pub description: String,
    /// Sidebar color, derived from the severity.
    pub color: u32,
    /// Named values.
    pub fields: Vec<EmbedField>,
    /// RFC 3339 time of the alert.
    pub timestamp: String,
}

/// A named value inside an embed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbedField {
    /// Label.
    pub name: String,
    /// Value.
    pub value: String,
    /// Whether the field may share a row with its neighbours.
    pub inline: bool,
}

impl From<&Alert> for EmbedPayload {
    fn from(alert: &Alert) -> Self {
        let fields = alert
            .fields
            .iter()
            .map(|field| EmbedField {
                name: field.name.clone(),
                value: field.value.clone(),
                inline: field.inline,
            })
            .collect();

        EmbedPayload {
            embeds: vec![Embed {
                title: alert.title.clone(),
                description: alert.description.clone(),
                color: alert.color(),
                fields,
                timestamp: alert.timestamp.to_rfc3339(),
            }],
        }
    }
}
