use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::llm::WebCitation;

pub const FALLBACK_SUMMARY: &str = "The analysis was generated but the format could not be \
    processed automatically. The raw output is available in the server logs.";
pub const FALLBACK_SECTION: &str = "Processing Error";

/// The model-supplied portion of a report. Every field tolerates absence
/// so a partially-shaped response still types.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportBody {
    pub executive_summary: String,
    pub regional_analysis: Vec<RegionalSection>,
    pub product_breakdown: String,
    pub trends: String,
    pub opportunities: String,
    pub chart_data: Vec<ChartPoint>,
    pub trade_data: Vec<TradeRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionalSection {
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub stats: Vec<RegionStat>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionStat {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub value: StatValue,
}

/// Stat values arrive as either prose ("1.2M Tons") or plain numbers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatValue {
    Number(f64),
    Text(String),
    Other(Value),
}

impl Default for StatValue {
    fn default() -> Self {
        StatValue::Text(String::new())
    }
}

/// One point of the report's chart series. Unrecognized keys are kept in
/// `extra` so additional model-provided series survive the round trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartPoint {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "Import", default, skip_serializing_if = "Option::is_none")]
    pub import: Option<f64>,
    #[serde(rename = "Export", default, skip_serializing_if = "Option::is_none")]
    pub export: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeRecord {
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub hs_code: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub destination: String,
    #[serde(default)]
    pub port_of_loading: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub quantity: f64,
    #[serde(rename = "totalValueUSD", default)]
    pub total_value_usd: f64,
    #[serde(rename = "pricePerUnitUSD", default)]
    pub price_per_unit_usd: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub title: String,
    pub uri: String,
}

/// The finished report handed to the renderer. `sources` and
/// `generated_at` are attached locally, never taken from the model body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchReport {
    #[serde(flatten)]
    pub body: ReportBody,
    pub sources: Vec<Source>,
    pub generated_at: DateTime<Utc>,
}

pub struct ParseOutcome {
    pub body: ReportBody,
    /// True when the raw text could not be parsed and the fallback body
    /// was substituted.
    pub recovered: bool,
}

/// Strip code-fence markup the model sometimes adds despite the "no
/// markdown" instruction, or slice the outermost object out of
/// surrounding prose.
pub fn extract_json(content: &str) -> String {
    if let Some(start) = content.find("```json")
        && let Some(end) = content[start + 7..].find("```")
    {
        return content[start + 7..start + 7 + end].trim().to_string();
    }
    if let Some(start) = content.find("```")
        && let Some(end) = content[start + 3..].find("```")
    {
        let inner = content[start + 3..start + 3 + end].trim();
        if inner.starts_with('{') {
            return inner.to_string();
        }
    }
    if let Some(start) = content.find('{')
        && let Some(end) = content.rfind('}')
    {
        return content[start..=end].to_string();
    }
    content.to_string()
}

/// Parse the cleaned response text into a typed report body. A response
/// that cannot be parsed degrades to the fallback body instead of failing
/// the acquisition; the raw text is logged for diagnosis.
pub fn parse_report_body(raw: &str) -> ParseOutcome {
    let cleaned = extract_json(raw);

    let value: Value = match serde_json::from_str(&cleaned) {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(
                error = %err,
                raw_output = %raw,
                "research response was not valid JSON, substituting fallback report"
            );
            return ParseOutcome {
                body: fallback_body(),
                recovered: true,
            };
        }
    };

    let value = sanitize_report_value(value);

    match serde_json::from_value::<ReportBody>(value) {
        Ok(body) => ParseOutcome {
            body,
            recovered: false,
        },
        Err(err) => {
            tracing::warn!(
                error = %err,
                raw_output = %raw,
                "research response did not match the report shape, substituting fallback report"
            );
            ParseOutcome {
                body: fallback_body(),
                recovered: true,
            }
        }
    }
}

/// The fixed placeholder substituted when the response cannot be parsed.
/// Satisfies every report invariant so rendering never crashes.
pub fn fallback_body() -> ReportBody {
    ReportBody {
        executive_summary: FALLBACK_SUMMARY.to_string(),
        product_breakdown: FALLBACK_SECTION.to_string(),
        trends: FALLBACK_SECTION.to_string(),
        opportunities: FALLBACK_SECTION.to_string(),
        ..ReportBody::default()
    }
}

/// Coerce the numeric-bearing fields in place, before typing. Trade rows
/// always end up with finite numbers; chart points are only touched on
/// keys they actually carry, and unrecognized keys pass through.
fn sanitize_report_value(mut value: Value) -> Value {
    if let Some(rows) = value.get_mut("tradeData").and_then(Value::as_array_mut) {
        for row in rows {
            if let Some(obj) = row.as_object_mut() {
                for key in ["quantity", "totalValueUSD", "pricePerUnitUSD"] {
                    let coerced = coerce_finite(obj.get(key));
                    obj.insert(key.to_string(), Value::from(coerced));
                }
            }
        }
    }

    if let Some(points) = value.get_mut("chartData").and_then(Value::as_array_mut) {
        for point in points {
            if let Some(obj) = point.as_object_mut() {
                for key in ["Import", "Export", "value"] {
                    if obj.contains_key(key) {
                        let coerced = coerce_finite(obj.get(key));
                        obj.insert(key.to_string(), Value::from(coerced));
                    }
                }
            }
        }
    }

    value
}

/// Number → itself, numeric string → parsed value, anything else → 0.
fn coerce_finite(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().filter(|v| v.is_finite()).unwrap_or(0.0),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Keep the first citation for each URI, preserving arrival order, and
/// convert to report sources.
pub fn dedup_sources(citations: Vec<WebCitation>) -> Vec<Source> {
    let mut seen = HashSet::new();
    citations
        .into_iter()
        .filter(|citation| seen.insert(citation.uri.clone()))
        .map(|citation| Source {
            title: citation.title,
            uri: citation.uri,
        })
        .collect()
}
