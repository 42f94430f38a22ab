//! Chat transcript records and the text rendering of query results

use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::api::models::{Channel, Deal, QueryResponse, Role, StructuredData};

/// One transcript entry. Lives only in memory.
#[derive(Debug, Clone)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub query_result: Option<QueryResponse>,
    pub processing_time: Option<Duration>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role: Role::User,
            content: content.into(),
            timestamp: Utc::now(),
            query_result: None,
            processing_time: None,
        }
    }

    /// Assistant reply built from a query response
    pub fn assistant(response: QueryResponse, processing_time: Duration) -> Self {
        let content = response
            .result
            .clone()
            .or_else(|| response.error.clone())
            .unwrap_or_default();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role: Role::Assistant,
            content,
            timestamp: Utc::now(),
            query_result: Some(response),
            processing_time: Some(processing_time),
        }
    }

    /// Local time of day, `HH:MM`
    pub fn time_label(&self) -> String {
        self.timestamp
            .with_timezone(&chrono::Local)
            .format("%H:%M")
            .to_string()
    }

    /// Lines to display for this message. Assistant messages with structured
    /// data render that data; everything else renders the text content.
    pub fn render_lines(&self) -> Vec<String> {
        if self.role == Role::Assistant {
            if let Some(structured) = self
                .query_result
                .as_ref()
                .and_then(QueryResponse::structured_data)
            {
                if let Some(lines) = render_structured(&structured) {
                    return lines;
                }
            }
        }
        self.content.lines().map(str::to_string).collect()
    }
}

/// `None` when the payload carries no renderable structure
fn render_structured(data: &StructuredData) -> Option<Vec<String>> {
    match data {
        StructuredData::Deals { items } => {
            let mut lines = vec!["HubSpot Deals Found:".to_string()];
            for deal in items {
                lines.extend(format_deal(deal));
                lines.push(String::new());
            }
            Some(lines)
        }
        StructuredData::Channels { items } => {
            let mut lines = vec!["Slack Channels:".to_string()];
            lines.extend(items.iter().flat_map(format_channel));
            Some(lines)
        }
        StructuredData::Text { .. } => None,
    }
}

pub fn format_deal(deal: &Deal) -> Vec<String> {
    let mut lines = vec![
        format!(
            "📈 {}",
            deal.dealname.as_deref().unwrap_or("Unnamed Deal")
        ),
        format!("💰 Amount: ${}", group_thousands(deal.amount_value())),
        format!(
            "📊 Stage: {}",
            deal.dealstage.as_deref().unwrap_or("Not set")
        ),
    ];
    if let Some(close) = &deal.closedate {
        lines.push(format!("📅 Close Date: {}", format_date(close)));
    }
    lines
}

pub fn format_channel(channel: &Channel) -> Vec<String> {
    let name = if channel.name.is_empty() {
        "unnamed"
    } else {
        channel.name.as_str()
    };
    let mut lines = vec![format!("#{}", name)];
    if let Some(purpose) = channel.purpose.as_ref().filter(|p| !p.value.is_empty()) {
        lines.push(format!("    {}", purpose.value));
    }
    lines
}

/// Date portion of an RFC 3339 timestamp, or the input unchanged
fn format_date(raw: &str) -> String {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|_| raw.to_string())
}

/// `1234567.5` -> `1,234,567.5`; up to three fractional digits are kept
fn group_thousands(value: f64) -> String {
    let rendered = format!("{:.3}", value.abs());
    let (int_part, frac_part) = rendered.split_once('.').unwrap_or((rendered.as_str(), ""));
    let frac_part = frac_part.trim_end_matches('0');

    let mut grouped = String::new();
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 { "-" } else { "" };
    if frac_part.is_empty() {
        format!("{}{}", sign, grouped)
    } else {
        format!("{}{}.{}", sign, grouped, frac_part)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::ChannelPurpose;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0.0), "0");
        assert_eq!(group_thousands(999.0), "999");
        assert_eq!(group_thousands(1000.0), "1,000");
        assert_eq!(group_thousands(1234567.5), "1,234,567.5");
        assert_eq!(group_thousands(-2500.25), "-2,500.25");
    }

    #[test]
    fn test_deal_defaults() {
        let lines = format_deal(&Deal::default());
        assert_eq!(
            lines,
            vec![
                "📈 Unnamed Deal".to_string(),
                "💰 Amount: $0".to_string(),
                "📊 Stage: Not set".to_string(),
            ]
        );
    }

    #[test]
    fn test_deal_close_date() {
        let deal = Deal {
            dealname: Some("Acme".to_string()),
            amount: Some(json!("12000")),
            dealstage: Some("closedwon".to_string()),
            closedate: Some("2024-03-01T00:00:00Z".to_string()),
        };
        let lines = format_deal(&deal);
        assert_eq!(lines[1], "💰 Amount: $12,000");
        assert_eq!(lines[3], "📅 Close Date: 2024-03-01");
    }

    #[test]
    fn test_channel_purpose_indented() {
        let channel = Channel {
            name: "general".to_string(),
            purpose: Some(ChannelPurpose {
                value: "Company-wide".to_string(),
            }),
        };
        assert_eq!(
            format_channel(&channel),
            vec!["#general".to_string(), "    Company-wide".to_string()]
        );
    }

    #[test]
    fn test_nameless_channel_still_listed() {
        assert_eq!(format_channel(&Channel::default()), vec!["#unnamed".to_string()]);
    }

    #[test]
    fn test_assistant_renders_extracted_channels() {
        let response: QueryResponse = serde_json::from_value(json!({
            "result": "raw text",
            "extracted_data": {
                "slack": {"data_type": "channels", "data": [{"name": "ops"}]}
            }
        }))
        .unwrap();
        let message = Message::assistant(response, Duration::from_millis(40));
        assert_eq!(
            message.render_lines(),
            vec!["Slack Channels:".to_string(), "#ops".to_string()]
        );
    }

    #[test]
    fn test_assistant_falls_back_to_text() {
        let response = QueryResponse {
            result: Some("line one\nline two".to_string()),
            ..Default::default()
        };
        let message = Message::assistant(response, Duration::ZERO);
        assert_eq!(message.render_lines(), vec!["line one", "line two"]);
    }

    #[test]
    fn test_user_message_ignores_structure() {
        let message = Message::user("list my deals");
        assert_eq!(message.role, Role::User);
        assert_eq!(message.render_lines(), vec!["list my deals"]);
    }

    #[test]
    fn test_assistant_uses_error_when_no_result() {
        let response = QueryResponse {
            error: Some("agent crashed".to_string()),
            success: Some(false),
            ..Default::default()
        };
        assert_eq!(
            Message::assistant(response, Duration::ZERO).content,
            "agent crashed"
        );
    }
}
