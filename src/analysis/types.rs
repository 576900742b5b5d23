use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryStats {
    pub average: f64,
    pub min: f64,
    pub max: f64,
    pub median: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stddev: Option<f64>,
}

/// One record of the uploaded dataset, keyed by quantity name.
pub type Sample = IndexMap<String, f64>;

/// One raw row of the uploaded dataset, in original column order.
pub type PreviewRow = IndexMap<String, Value>;

/// Statistics computed by the analysis service for one upload.
///
/// Immutable once received; every mapping keeps the order the service sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub record_count: u64,
    pub summary_stats: IndexMap<String, SummaryStats>,
    pub category_distribution: IndexMap<String, u64>,
    pub time_series: Vec<Sample>,
    pub row_preview: Vec<PreviewRow>,
}

impl AnalysisResult {
    pub fn empty() -> Self {
        Self {
            record_count: 0,
            summary_stats: IndexMap::new(),
            category_distribution: IndexMap::new(),
            time_series: Vec::new(),
            row_preview: Vec::new(),
        }
    }
}
