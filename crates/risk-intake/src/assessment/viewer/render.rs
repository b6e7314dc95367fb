use serde::Serialize;
use serde_json::{Map, Value};

use crate::assessment::domain::RiskLevel;

/// Shown for null, empty, and non-finite values.
pub const PLACEHOLDER: &str = "—";

/// Containers nested deeper than this are summarized instead of expanded.
pub const MAX_RENDER_DEPTH: usize = 2;

/// Magnitude from which integer digits are grouped with `,`.
///
/// Four-digit values (years, lot numbers) print without separators.
pub const GROUPING_THRESHOLD: f64 = 10_000.0;

const FRACTION_DIGITS: usize = 3;

/// Display tree for an untyped document value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RenderNode {
    Primitive { text: String },
    List { items: Vec<RenderNode> },
    Keyed { entries: Vec<RenderEntry> },
    Summary { text: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderEntry {
    pub key: String,
    pub node: RenderNode,
}

impl RenderNode {
    pub fn text(text: impl Into<String>) -> Self {
        RenderNode::Primitive { text: text.into() }
    }

    /// Flat text form, used where only one line fits (CSV cells, logs).
    pub fn to_inline(&self) -> String {
        match self {
            RenderNode::Primitive { text } | RenderNode::Summary { text } => text.clone(),
            RenderNode::List { items } => items
                .iter()
                .map(RenderNode::to_inline)
                .collect::<Vec<_>>()
                .join(", "),
            RenderNode::Keyed { entries } => entries
                .iter()
                .map(|entry| format!("{}: {}", entry.key, entry.node.to_inline()))
                .collect::<Vec<_>>()
                .join("; "),
        }
    }
}

pub fn render_value(value: &Value) -> RenderNode {
    render_at(value, 0)
}

pub fn render_fields(fields: &Map<String, Value>) -> Vec<RenderEntry> {
    fields
        .iter()
        .map(|(key, value)| RenderEntry {
            key: key.clone(),
            node: render_value(value),
        })
        .collect()
}

fn render_at(value: &Value, depth: usize) -> RenderNode {
    match value {
        Value::Array(items) if items.is_empty() => RenderNode::text(PLACEHOLDER),
        Value::Object(map) if map.is_empty() => RenderNode::text(PLACEHOLDER),
        Value::Array(items) if items.iter().all(is_primitive) => RenderNode::text(
            items
                .iter()
                .map(format_primitive)
                .collect::<Vec<_>>()
                .join(", "),
        ),
        Value::Array(items) if depth >= MAX_RENDER_DEPTH => RenderNode::Summary {
            text: count_label(items.len(), "item"),
        },
        Value::Object(map) if depth >= MAX_RENDER_DEPTH => RenderNode::Summary {
            text: count_label(map.len(), "field"),
        },
        Value::Array(items) => RenderNode::List {
            items: items.iter().map(|item| render_at(item, depth + 1)).collect(),
        },
        Value::Object(map) => RenderNode::Keyed {
            entries: map
                .iter()
                .map(|(key, value)| RenderEntry {
                    key: key.clone(),
                    node: render_at(value, depth + 1),
                })
                .collect(),
        },
        primitive => RenderNode::text(format_primitive(primitive)),
    }
}

fn is_primitive(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}

fn count_label(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("1 {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

/// Format a scalar; containers are only summarized here.
pub fn format_primitive(value: &Value) -> String {
    match value {
        Value::Null => PLACEHOLDER.to_string(),
        Value::Bool(true) => "Yes".to_string(),
        Value::Bool(false) => "No".to_string(),
        Value::Number(number) => number
            .as_f64()
            .map(format_number)
            .unwrap_or_else(|| number.to_string()),
        Value::String(text) if text.trim().is_empty() => PLACEHOLDER.to_string(),
        Value::String(text) => text.clone(),
        Value::Array(items) => count_label(items.len(), "item"),
        Value::Object(map) => count_label(map.len(), "field"),
    }
}

/// Up to three fraction digits, trailing zeros dropped, thousands grouped past the threshold.
pub fn format_number(value: f64) -> String {
    if !value.is_finite() {
        return PLACEHOLDER.to_string();
    }

    let fixed = format!("{:.*}", FRACTION_DIGITS, value.abs());
    let (integer, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let fraction = fraction.trim_end_matches('0');

    let integer = if value.abs() >= GROUPING_THRESHOLD {
        group_thousands(integer)
    } else {
        integer.to_string()
    };

    let is_zero = integer == "0" && fraction.is_empty();
    let sign = if value.is_sign_negative() && !is_zero {
        "-"
    } else {
        ""
    };

    if fraction.is_empty() {
        format!("{sign}{integer}")
    } else {
        format!("{sign}{integer}.{fraction}")
    }
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped
}

/// Fixed-precision number for table columns; placeholder when absent.
pub fn format_fixed(value: Option<f64>, digits: usize) -> String {
    match value {
        Some(value) if value.is_finite() => format!("{value:.digits$}"),
        _ => PLACEHOLDER.to_string(),
    }
}

/// Stored risk labels as shown to users; MEDIUM reads as MODERATE.
pub fn display_risk_label(raw: &str) -> String {
    let trimmed = raw.trim();
    match serde_json::from_value::<RiskLevel>(Value::String(trimmed.to_ascii_uppercase())) {
        Ok(level) => level.display_label().to_string(),
        Err(_) if trimmed.is_empty() => PLACEHOLDER.to_string(),
        Err(_) => trimmed.to_string(),
    }
}
