use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::analysis::types::PreviewRow;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Kpi {
    pub label: String,
    pub unit: String,
    pub average: f64,
    pub min: f64,
    pub max: f64,
    pub median: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stddev: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionPoint {
    pub label: String,
    pub value: u64,
}

/// One scatter point; `None` marks a record missing that quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrelationPoint {
    pub x: Option<f64>,
    pub y: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TablePreview {
    pub columns: Vec<String>,
    pub rows: Vec<PreviewRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewModel {
    pub record_count: u64,
    pub kpis: Vec<Kpi>,
    pub distribution_series: Vec<DistributionPoint>,
    pub time_series_by_quantity: IndexMap<String, Vec<Option<f64>>>,
    pub correlation_pairs: Vec<CorrelationPoint>,
    pub preview: TablePreview,
}

/// Which two quantities feed the correlation chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewOptions {
    pub correlation_x: String,
    pub correlation_y: String,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            correlation_x: "Flowrate".to_string(),
            correlation_y: "Pressure".to_string(),
        }
    }
}
