use indexmap::IndexMap;

use crate::analysis::types::AnalysisResult;

use super::types::{CorrelationPoint, DistributionPoint, Kpi, TablePreview, ViewModel, ViewOptions};

const QUANTITY_UNITS: &[(&str, &str)] = &[
    ("Flowrate", "m³/h"),
    ("Pressure", "bar"),
    ("Temperature", "°C"),
];

pub fn unit_for(quantity: &str) -> &'static str {
    QUANTITY_UNITS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(quantity))
        .map(|(_, unit)| *unit)
        .unwrap_or("")
}

pub fn build_view_model(result: &AnalysisResult) -> ViewModel {
    build_view_model_with(result, &ViewOptions::default())
}

/// Pure and deterministic: the same result always yields the same view,
/// with values passed through unrounded.
pub fn build_view_model_with(result: &AnalysisResult, options: &ViewOptions) -> ViewModel {
    let kpis = result
        .summary_stats
        .iter()
        .map(|(quantity, stats)| Kpi {
            label: quantity.clone(),
            unit: unit_for(quantity).to_string(),
            average: stats.average,
            min: stats.min,
            max: stats.max,
            median: stats.median,
            stddev: stats.stddev,
        })
        .collect();

    let distribution_series = result
        .category_distribution
        .iter()
        .map(|(label, value)| DistributionPoint {
            label: label.clone(),
            value: *value,
        })
        .collect();

    let time_series_by_quantity = series_by_quantity(result);
    let correlation_pairs = correlation_pairs(&time_series_by_quantity, options);

    ViewModel {
        record_count: result.record_count,
        kpis,
        distribution_series,
        time_series_by_quantity,
        correlation_pairs,
        preview: table_preview(result),
    }
}

fn series_by_quantity(result: &AnalysisResult) -> IndexMap<String, Vec<Option<f64>>> {
    let mut quantities: Vec<&String> = Vec::new();
    for sample in &result.time_series {
        for quantity in sample.keys() {
            if !quantities.contains(&quantity) {
                quantities.push(quantity);
            }
        }
    }

    quantities
        .into_iter()
        .map(|quantity| {
            let values = result
                .time_series
                .iter()
                .map(|sample| sample.get(quantity).copied())
                .collect::<Vec<Option<f64>>>();
            (quantity.clone(), values)
        })
        .collect()
}

fn correlation_pairs(
    series: &IndexMap<String, Vec<Option<f64>>>,
    options: &ViewOptions,
) -> Vec<CorrelationPoint> {
    let (Some(xs), Some(ys)) = (
        series.get(&options.correlation_x),
        series.get(&options.correlation_y),
    ) else {
        return Vec::new();
    };
    xs.iter()
        .zip(ys)
        .map(|(x, y)| CorrelationPoint { x: *x, y: *y })
        .collect()
}

fn table_preview(result: &AnalysisResult) -> TablePreview {
    let columns = result
        .row_preview
        .first()
        .map(|row| row.keys().cloned().collect())
        .unwrap_or_default();
    TablePreview {
        columns,
        rows: result.row_preview.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::parse::parse_analysis_response;
    use crate::analysis::types::Sample;

    fn sample(pairs: &[(&str, f64)]) -> Sample {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn full_result() -> AnalysisResult {
        parse_analysis_response(
            r#"{
                "record_count": 3,
                "summary_stats": {
                    "Temperature": {"average": 120.5, "min": 100, "max": 140, "median": 121, "stddev": 15.25},
                    "Flowrate": {"average": 42.5, "min": 10, "max": 90, "median": 40}
                },
                "category_distribution": {"Valve": 1, "Pump": 2},
                "time_series": [
                    {"Flowrate": 10, "Pressure": 4.2, "Temperature": 100},
                    {"Flowrate": 90, "Temperature": 140},
                    {"Pressure": 7.1, "Flowrate": 27.5, "Temperature": 121.5}
                ],
                "row_preview": [
                    {"Equipment Name": "Pump-1", "Type": "Pump", "Flowrate": 10},
                    {"Equipment Name": "Valve-1", "Type": "Valve", "Flowrate": 90, "Extra": "x"}
                ]
            }"#,
        )
        .expect("parse")
    }

    #[test]
    fn kpis_follow_summary_order_with_units() {
        let view = build_view_model(&full_result());
        let labels = view.kpis.iter().map(|k| k.label.as_str()).collect::<Vec<_>>();
        assert_eq!(labels, vec!["Temperature", "Flowrate"]);
        assert_eq!(view.kpis[0].unit, "°C");
        assert_eq!(view.kpis[0].stddev, Some(15.25));
        assert_eq!(view.kpis[1].unit, "m³/h");
        assert_eq!(view.kpis[1].average, 42.5);
        assert_eq!(view.record_count, 3);
    }

    #[test]
    fn distribution_is_one_to_one_in_insertion_order() {
        let view = build_view_model(&full_result());
        assert_eq!(
            view.distribution_series,
            vec![
                DistributionPoint {
                    label: "Valve".to_string(),
                    value: 1
                },
                DistributionPoint {
                    label: "Pump".to_string(),
                    value: 2
                },
            ]
        );
    }

    #[test]
    fn series_stay_index_aligned_with_gaps() {
        let view = build_view_model(&full_result());
        let quantities = view.time_series_by_quantity.keys().cloned().collect::<Vec<_>>();
        assert_eq!(quantities, vec!["Flowrate", "Pressure", "Temperature"]);
        for values in view.time_series_by_quantity.values() {
            assert_eq!(values.len(), 3);
        }
        assert_eq!(
            view.time_series_by_quantity["Pressure"],
            vec![Some(4.2), None, Some(7.1)]
        );
        assert_eq!(
            view.correlation_pairs,
            vec![
                CorrelationPoint {
                    x: Some(10.0),
                    y: Some(4.2)
                },
                CorrelationPoint {
                    x: Some(90.0),
                    y: None
                },
                CorrelationPoint {
                    x: Some(27.5),
                    y: Some(7.1)
                },
            ]
        );
    }

    #[test]
    fn custom_correlation_pair() {
        let options = ViewOptions {
            correlation_x: "Temperature".to_string(),
            correlation_y: "Flowrate".to_string(),
        };
        let view = build_view_model_with(&full_result(), &options);
        assert_eq!(view.correlation_pairs[1].x, Some(140.0));
        assert_eq!(view.correlation_pairs[1].y, Some(90.0));
    }

    #[test]
    fn missing_correlation_quantity_yields_no_pairs() {
        let mut result = AnalysisResult::empty();
        result.time_series = vec![sample(&[("Flowrate", 1.0)]), sample(&[("Flowrate", 2.0)])];
        let view = build_view_model(&result);
        assert_eq!(view.time_series_by_quantity["Flowrate"].len(), 2);
        assert!(view.correlation_pairs.is_empty());
    }

    #[test]
    fn empty_time_series_is_not_an_error() {
        let mut result = full_result();
        result.time_series.clear();
        let view = build_view_model(&result);
        assert!(view.time_series_by_quantity.is_empty());
        assert!(view.correlation_pairs.is_empty());
        assert_eq!(view.kpis.len(), 2);
    }

    #[test]
    fn columns_come_from_first_row_only() {
        let view = build_view_model(&full_result());
        assert_eq!(view.preview.columns, vec!["Equipment Name", "Type", "Flowrate"]);
        assert_eq!(view.preview.rows.len(), 2);

        let mut result = full_result();
        result.row_preview.clear();
        let view = build_view_model(&result);
        assert!(view.preview.columns.is_empty());
        assert!(view.preview.rows.is_empty());
    }

    #[test]
    fn building_twice_is_identical() {
        let result = full_result();
        let first = build_view_model(&result);
        let second = build_view_model(&result);
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).expect("json"),
            serde_json::to_string(&second).expect("json")
        );
    }

    #[test]
    fn unknown_quantities_have_no_unit() {
        assert_eq!(unit_for("pressure"), "bar");
        assert_eq!(unit_for("Viscosity"), "");
    }
}
