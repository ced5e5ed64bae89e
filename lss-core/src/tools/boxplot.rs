//! Boxplot multi-series comparison (key `boxplot`, shape `MultipleTimeSeries`).

use super::{DataShape, Tool, ToolCategory, ToolConfig, ToolInput, ToolResult, ValidationOutcome};
use serde::Serialize;
use serde_json::json;

pub const DEFAULT_OUTLIER_FACTOR: f64 = 1.5;

#[derive(Debug, Clone, Serialize)]
pub struct Outlier {
    pub value: f64,
    pub side: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeriesOutcome {
    pub name: String,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    pub mean: f64,
    pub std: f64,
    pub n: usize,
    pub iqr: f64,
    pub outliers: Vec<Outlier>,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct Comparison {
    pub most_variable: Option<String>,
    pub most_outliers: Option<String>,
    pub max_median_series: Option<String>,
    pub min_median_series: Option<String>,
    pub median_range: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BoxplotOutcome {
    pub series: Vec<SeriesOutcome>,
    pub comparison: Comparison,
    pub insights: Vec<String>,
}

/// Linear-interpolation quartile (R-7 / numpy default method) on an
/// already-sorted slice.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let h = (n as f64 - 1.0) * q;
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo])
    }
}

fn series_stats(name: &str, values: &[f64], outlier_factor: f64) -> Result<SeriesOutcome, String> {
    if values.is_empty() {
        return Err(format!("series '{name}' has no data points"));
    }
    let n = values.len();
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());

    let q1 = quantile(&sorted, 0.25);
    let median = quantile(&sorted, 0.5);
    let q3 = quantile(&sorted, 0.75);
    let iqr = q3 - q1;
    let lower_fence = q1 - outlier_factor * iqr;
    let upper_fence = q3 + outlier_factor * iqr;

    let mean = values.iter().sum::<f64>() / n as f64;
    let std = if n >= 2 {
        (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n as f64 - 1.0)).sqrt()
    } else {
        0.0
    };

    let outliers: Vec<Outlier> = sorted
        .iter()
        .filter_map(|&v| {
            if v < lower_fence {
                Some(Outlier { value: v, side: "low" })
            } else if v > upper_fence {
                Some(Outlier { value: v, side: "high" })
            } else {
                None
            }
        })
        .collect();

    Ok(SeriesOutcome {
        name: name.to_string(),
        min: sorted[0],
        q1,
        median,
        q3,
        max: sorted[n - 1],
        mean,
        std,
        n,
        iqr,
        outliers,
    })
}

pub fn compute(series: &[(String, Vec<f64>)], outlier_factor: f64) -> Result<BoxplotOutcome, String> {
    if series.is_empty() {
        return Err("Boxplot requires at least one series".to_string());
    }

    let mut outcomes = Vec::with_capacity(series.len());
    for (name, values) in series {
        outcomes.push(series_stats(name, values, outlier_factor)?);
    }

    let most_variable = outcomes
        .iter()
        .max_by(|a, b| a.std.partial_cmp(&b.std).unwrap())
        .map(|s| s.name.clone());
    let most_outliers = outcomes
        .iter()
        .max_by_key(|s| s.outliers.len())
        .map(|s| s.name.clone());
    let max_median = outcomes.iter().max_by(|a, b| a.median.partial_cmp(&b.median).unwrap());
    let min_median = outcomes.iter().min_by(|a, b| a.median.partial_cmp(&b.median).unwrap());
    let median_range = match (max_median, min_median) {
        (Some(a), Some(b)) => (a.median - b.median).abs(),
        _ => 0.0,
    };

    let min_std = outcomes.iter().map(|s| s.std).fold(f64::INFINITY, f64::min);
    let stable_series = outcomes
        .iter()
        .find(|s| s.outliers.is_empty() && s.std <= min_std * 1.5)
        .map(|s| s.name.clone());

    let comparison = Comparison {
        most_variable: most_variable.clone(),
        most_outliers: most_outliers.clone(),
        max_median_series: max_median.map(|s| s.name.clone()),
        min_median_series: min_median.map(|s| s.name.clone()),
        median_range,
    };

    let mut insights = Vec::new();
    if let Some(name) = &most_variable {
        insights.push(format!("{name} shows the most variability"));
    }
    if let Some(name) = &most_outliers {
        insights.push(format!("{name} has the most outliers"));
    }
    insights.push(format!("median range across series: {median_range:.2}"));
    if let Some(name) = &stable_series {
        insights.push(format!("{name} is the most stable series (no outliers, low variability)"));
    }

    Ok(BoxplotOutcome { series: outcomes, comparison, insights })
}

pub struct BoxplotTool;

impl Tool for BoxplotTool {
    fn key(&self) -> &'static str {
        "boxplot"
    }

    fn name(&self) -> &'static str {
        "Boxplot Comparison"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Descriptive
    }

    fn required_data_shape(&self) -> DataShape {
        DataShape::MultipleTimeSeries
    }

    fn validate(&self, data: &ToolInput, _config: &ToolConfig) -> ValidationOutcome {
        match data {
            ToolInput::MultipleTimeSeries(series) if !series.is_empty() => ValidationOutcome::ok(),
            ToolInput::MultipleTimeSeries(_) => {
                ValidationOutcome::fail(vec!["Boxplot requires at least one series".to_string()])
            }
            _ => ValidationOutcome::fail(vec!["boxplot requires a MultipleTimeSeries input".to_string()]),
        }
    }

    fn run(&self, data: &ToolInput, config: &ToolConfig) -> ToolResult {
        let series = match data {
            ToolInput::MultipleTimeSeries(series) => series,
            _ => return ToolResult::failure(vec!["boxplot requires a MultipleTimeSeries input".to_string()]),
        };
        let outlier_factor = config.get_f64("outlier_factor").unwrap_or(DEFAULT_OUTLIER_FACTOR);

        let outcome = match compute(series, outlier_factor) {
            Ok(outcome) => outcome,
            Err(err) => return ToolResult::failure(vec![err]),
        };

        let plot_series: Vec<_> = outcome
            .series
            .iter()
            .map(|s| {
                json!({
                    "name": s.name,
                    "min": s.min,
                    "q1": s.q1,
                    "median": s.median,
                    "q3": s.q3,
                    "max": s.max,
                    "outliers": s.outliers.iter().map(|o| o.value).collect::<Vec<_>>(),
                })
            })
            .collect();

        let plot_data = json!({ "type": "boxplot", "series": plot_series });

        let mut metrics = std::collections::HashMap::new();
        metrics.insert("median_range".to_string(), outcome.comparison.median_range);

        ToolResult {
            success: true,
            result: serde_json::to_value(&outcome).unwrap_or_default(),
            plot_data,
            metrics,
            warnings: Vec::new(),
            errors: Vec::new(),
            insights: outcome.insights,
        }
    }
}
