use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::error::AnalysisError;
use crate::util::text::{normalize_token, split_legacy_stat_key, LegacyStat};

use super::types::{AnalysisResult, PreviewRow, Sample, SummaryStats};

pub const PREVIEW_ROW_LIMIT: usize = 10;
const ERROR_BODY_LIMIT: usize = 300;

fn malformed(message: impl Into<String>) -> AnalysisError {
    AnalysisError::MalformedResponse(message.into())
}

/// Looks a key up under its snake_case and camelCase spellings.
fn field<'a>(obj: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names
        .iter()
        .find_map(|name| obj.get(*name))
        .filter(|v| !v.is_null())
}

fn as_count(value: &Value, key: &str) -> Result<u64, AnalysisError> {
    value
        .as_u64()
        .ok_or_else(|| malformed(format!("{key} must be a non-negative integer, got {value}")))
}

fn as_number(value: &Value, key: &str) -> Result<f64, AnalysisError> {
    value
        .as_f64()
        .ok_or_else(|| malformed(format!("{key} must be a number, got {value}")))
}

fn as_object<'a>(value: &'a Value, key: &str) -> Result<&'a Map<String, Value>, AnalysisError> {
    value
        .as_object()
        .ok_or_else(|| malformed(format!("{key} must be an object")))
}

fn as_array<'a>(value: &'a Value, key: &str) -> Result<&'a Vec<Value>, AnalysisError> {
    value
        .as_array()
        .ok_or_else(|| malformed(format!("{key} must be an array")))
}

/// Parses a success body from the analysis service.
///
/// Accepts the `{"message", "file_id", "data": {...}}` envelope or a bare
/// payload, in either the current or the legacy (`total_count`/`averages`)
/// shape.
pub fn parse_analysis_response(raw: &str) -> Result<AnalysisResult, AnalysisError> {
    let root: Value =
        serde_json::from_str(raw).map_err(|e| malformed(format!("body is not valid JSON: {e}")))?;
    let root = root
        .as_object()
        .ok_or_else(|| malformed("body must be a JSON object"))?;

    if root.get("success").and_then(Value::as_bool) == Some(false) {
        return Err(AnalysisError::Service {
            status: 200,
            message: summarize_error_object(root)
                .unwrap_or_else(|| "analysis reported failure".to_string()),
        });
    }

    let payload = match root.get("data") {
        Some(data) => as_object(data, "data")?,
        None => root,
    };

    if field(payload, &["record_count", "recordCount"]).is_some()
        || field(payload, &["summary_stats", "summaryStats"]).is_some()
    {
        parse_current(payload)
    } else if field(payload, &["total_count", "averages"]).is_some() {
        parse_legacy(payload)
    } else {
        Err(malformed("missing required key record_count"))
    }
}

fn parse_current(payload: &Map<String, Value>) -> Result<AnalysisResult, AnalysisError> {
    let record_count = field(payload, &["record_count", "recordCount"])
        .ok_or_else(|| malformed("missing required key record_count"))
        .and_then(|v| as_count(v, "record_count"))?;

    let stats_value = field(payload, &["summary_stats", "summaryStats"])
        .ok_or_else(|| malformed("missing required key summary_stats"))?;
    let mut summary_stats = IndexMap::new();
    for (quantity, entry) in as_object(stats_value, "summary_stats")? {
        summary_stats.insert(quantity.clone(), parse_stats_entry(quantity, entry)?);
    }

    Ok(AnalysisResult {
        record_count,
        summary_stats,
        category_distribution: parse_distribution(
            payload,
            &["category_distribution", "categoryDistribution"],
        )?,
        time_series: parse_time_series(payload)?,
        row_preview: parse_preview(payload, &["row_preview", "rowPreview"])?,
    })
}

fn parse_stats_entry(quantity: &str, entry: &Value) -> Result<SummaryStats, AnalysisError> {
    let key = format!("summary_stats.{quantity}");
    let obj = as_object(entry, &key)?;
    let number = |name: &str| -> Result<f64, AnalysisError> {
        let path = format!("{key}.{name}");
        obj.get(name)
            .filter(|v| !v.is_null())
            .ok_or_else(|| malformed(format!("missing required key {path}")))
            .and_then(|v| as_number(v, &path))
    };
    let stddev = match field(obj, &["stddev", "std"]) {
        Some(v) => Some(as_number(v, &format!("{key}.stddev"))?),
        None => None,
    };
    Ok(SummaryStats {
        average: number("average")?,
        min: number("min")?,
        max: number("max")?,
        median: number("median")?,
        stddev,
    })
}

fn parse_distribution(
    payload: &Map<String, Value>,
    names: &[&str],
) -> Result<IndexMap<String, u64>, AnalysisError> {
    let mut out = IndexMap::new();
    let Some(value) = field(payload, names) else {
        return Ok(out);
    };
    for (label, count) in as_object(value, names[0])? {
        out.insert(
            label.clone(),
            as_count(count, &format!("{}.{label}", names[0]))?,
        );
    }
    Ok(out)
}

fn parse_time_series(payload: &Map<String, Value>) -> Result<Vec<Sample>, AnalysisError> {
    let Some(value) = field(payload, &["time_series", "timeSeries"]) else {
        return Ok(Vec::new());
    };
    let mut samples = Vec::new();
    for (index, record) in as_array(value, "time_series")?.iter().enumerate() {
        let key = format!("time_series[{index}]");
        let mut sample = Sample::new();
        for (quantity, v) in as_object(record, &key)? {
            // Gaps in the source data arrive as null.
            if v.is_null() {
                continue;
            }
            sample.insert(quantity.clone(), as_number(v, &format!("{key}.{quantity}"))?);
        }
        samples.push(sample);
    }
    Ok(samples)
}

fn parse_preview(
    payload: &Map<String, Value>,
    names: &[&str],
) -> Result<Vec<PreviewRow>, AnalysisError> {
    let Some(value) = field(payload, names) else {
        return Ok(Vec::new());
    };
    as_array(value, names[0])?
        .iter()
        .take(PREVIEW_ROW_LIMIT)
        .enumerate()
        .map(|(index, row)| {
            as_object(row, &format!("{}[{index}]", names[0])).map(|obj| {
                obj.iter()
                    .map(|(column, cell)| (column.clone(), cell.clone()))
                    .collect::<PreviewRow>()
            })
        })
        .collect()
}

#[derive(Default)]
struct LegacyStats {
    // Key suffix as sent, e.g. `flowrate` for `avg_flowrate`.
    suffix: String,
    average: Option<f64>,
    stddev: Option<f64>,
    min: Option<f64>,
    max: Option<f64>,
    median: Option<f64>,
}

impl LegacyStats {
    fn into_summary(self) -> Result<SummaryStats, AnalysisError> {
        match (self.average, self.min, self.max, self.median) {
            (Some(average), Some(min), Some(max), Some(median)) => Ok(SummaryStats {
                average,
                min,
                max,
                median,
                stddev: self.stddev,
            }),
            _ => {
                let missing = [
                    ("avg", self.average),
                    ("min", self.min),
                    ("max", self.max),
                    ("median", self.median),
                ]
                .iter()
                .filter(|(_, v)| v.is_none())
                .map(|(stat, _)| format!("averages.{stat}_{}", self.suffix))
                .collect::<Vec<_>>();
                Err(malformed(format!("missing required key {}", missing.join(", "))))
            }
        }
    }
}

fn legacy_suffix(key: &str) -> String {
    normalize_token(key)
        .split_once('_')
        .map(|(_, suffix)| suffix.to_string())
        .unwrap_or_default()
}

fn parse_legacy(payload: &Map<String, Value>) -> Result<AnalysisResult, AnalysisError> {
    let record_count = payload
        .get("total_count")
        .ok_or_else(|| malformed("missing required key total_count"))
        .and_then(|v| as_count(v, "total_count"))?;

    let mut partial: IndexMap<String, LegacyStats> = IndexMap::new();
    if let Some(averages) = field(payload, &["averages"]) {
        for (key, value) in as_object(averages, "averages")? {
            let Some((stat, quantity)) = split_legacy_stat_key(key) else {
                continue;
            };
            if value.is_null() {
                continue;
            }
            let number = as_number(value, &format!("averages.{key}"))?;
            let entry = partial.entry(quantity).or_default();
            if entry.suffix.is_empty() {
                entry.suffix = legacy_suffix(key);
            }
            match stat {
                LegacyStat::Average => entry.average = Some(number),
                LegacyStat::StdDev => entry.stddev = Some(number),
                LegacyStat::Min => entry.min = Some(number),
                LegacyStat::Max => entry.max = Some(number),
                LegacyStat::Median => entry.median = Some(number),
            }
        }
    }

    let mut summary_stats = IndexMap::new();
    for (quantity, stats) in partial {
        summary_stats.insert(quantity, stats.into_summary()?);
    }

    Ok(AnalysisResult {
        record_count,
        summary_stats,
        category_distribution: parse_distribution(payload, &["distribution"])?,
        time_series: Vec::new(),
        row_preview: parse_preview(payload, &["preview"])?,
    })
}

fn summarize_error_object(obj: &Map<String, Value>) -> Option<String> {
    let text = |name: &str| {
        obj.get(name).and_then(|v| match v {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Null | Value::String(_) => None,
            other => Some(other.to_string()),
        })
    };
    match (text("message"), text("error").or_else(|| text("detail"))) {
        (Some(message), Some(error)) => Some(format!("{message}: {error}")),
        (Some(message), None) => Some(message),
        (None, Some(error)) => Some(error),
        (None, None) => None,
    }
}

/// Condenses a non-success response body into one line for the user.
pub fn summarize_error_body(raw: &str) -> String {
    if let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(raw) {
        if let Some(summary) = summarize_error_object(&obj) {
            return summary;
        }
    }
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return "no response body".to_string();
    }
    if trimmed.chars().count() > ERROR_BODY_LIMIT {
        let mut cut = trimmed.chars().take(ERROR_BODY_LIMIT).collect::<String>();
        cut.push('…');
        return cut;
    }
    trimmed.to_string()
}
