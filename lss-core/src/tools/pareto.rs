//! Pareto / ABC classification (key `pareto`, shape `CategoricalCounts`).

use super::{DataShape, Tool, ToolCategory, ToolConfig, ToolInput, ToolResult, ValidationOutcome};
use serde::Serialize;
use serde_json::json;

#[derive(Debug, Clone, Serialize)]
pub struct ParetoRow {
    pub category: String,
    pub count: u64,
    pub cumulative_count: u64,
    pub cumulative_pct: f64,
    pub class: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParetoOutcome {
    pub rows: Vec<ParetoRow>,
    pub total_count: u64,
    pub total_categories: usize,
    pub key_few_count: usize,
    pub key_few_percentage: f64,
    pub key_few_contribution: f64,
    pub insights: Vec<String>,
}

pub const DEFAULT_THRESHOLD: f64 = 0.8;
const CLASS_B_BOUNDARY_PCT: f64 = 95.0;

pub fn compute(mut categories: Vec<(String, u64)>, threshold: f64) -> Result<ParetoOutcome, String> {
    if categories.is_empty() {
        return Err("Pareto requires at least one category".to_string());
    }

    let total_count: u64 = categories.iter().map(|(_, c)| c).sum();
    if total_count == 0 {
        return Err("Pareto requires a non-zero total count".to_string());
    }

    // stable sort: ties keep their input order (§4.3.2)
    categories.sort_by(|a, b| b.1.cmp(&a.1));

    let threshold_pct = threshold * 100.0;
    let mut rows = Vec::with_capacity(categories.len());
    let mut running = 0u64;
    let mut key_few_count = 0usize;
    let mut key_few_boundary_found = false;
    let mut key_few_contribution = 0.0;

    for (category, count) in categories {
        running += count;
        let cumulative_pct = running as f64 / total_count as f64 * 100.0;
        if !key_few_boundary_found {
            key_few_count += 1;
            key_few_contribution = cumulative_pct;
            if cumulative_pct >= threshold_pct {
                key_few_boundary_found = true;
            }
        }
        rows.push(ParetoRow {
            category,
            count,
            cumulative_count: running,
            cumulative_pct,
            class: "A", // placeholder, fixed up below once key_few_count is final
        });
    }
    // A = the key-few prefix; B = next categories up to 95% cumulative; C = remainder.
    for row in rows.iter_mut().take(key_few_count) {
        row.class = "A";
    }
    for row in rows.iter_mut().skip(key_few_count) {
        row.class = if row.cumulative_pct <= CLASS_B_BOUNDARY_PCT { "B" } else { "C" };
    }

    let total_categories = rows.len();
    let key_few_percentage = key_few_count as f64 / total_categories as f64 * 100.0;

    let mut insights = Vec::new();
    insights.push(format!(
        "{key_few_count} of {total_categories} categories ({key_few_percentage:.1}%) account for {key_few_contribution:.1}% of occurrences"
    ));
    for row in rows.iter().take(3) {
        insights.push(format!("{}: {} occurrences ({:.1}% cumulative)", row.category, row.count, row.cumulative_pct));
    }

    Ok(ParetoOutcome {
        rows,
        total_count,
        total_categories,
        key_few_count,
        key_few_percentage,
        key_few_contribution,
        insights,
    })
}

pub struct ParetoTool;

impl Tool for ParetoTool {
    fn key(&self) -> &'static str {
        "pareto"
    }

    fn name(&self) -> &'static str {
        "Pareto Analysis"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Diagnostic
    }

    fn required_data_shape(&self) -> DataShape {
        DataShape::CategoricalCounts
    }

    fn validate(&self, data: &ToolInput, _config: &ToolConfig) -> ValidationOutcome {
        match data {
            ToolInput::CategoricalCounts(rows) if !rows.is_empty() => ValidationOutcome::ok(),
            ToolInput::CategoricalCounts(_) => {
                ValidationOutcome::fail(vec!["Pareto requires at least one category".to_string()])
            }
            _ => ValidationOutcome::fail(vec!["pareto requires a CategoricalCounts input".to_string()]),
        }
    }

    fn run(&self, data: &ToolInput, config: &ToolConfig) -> ToolResult {
        let rows = match data {
            ToolInput::CategoricalCounts(rows) => rows.clone(),
            _ => return ToolResult::failure(vec!["pareto requires a CategoricalCounts input".to_string()]),
        };
        let threshold = config.get_f64("threshold").unwrap_or(DEFAULT_THRESHOLD);

        let outcome = match compute(rows, threshold) {
            Ok(outcome) => outcome,
            Err(err) => return ToolResult::failure(vec![err]),
        };

        let categories: Vec<&str> = outcome.rows.iter().map(|r| r.category.as_str()).collect();
        let counts: Vec<u64> = outcome.rows.iter().map(|r| r.count).collect();
        let cumulative: Vec<f64> = outcome.rows.iter().map(|r| r.cumulative_pct).collect();
        let colors: Vec<&str> = outcome
            .rows
            .iter()
            .map(|r| match r.class {
                "A" => "#d9534f",
                "B" => "#f0ad4e",
                _ => "#5bc0de",
            })
            .collect();

        let plot_data = json!({
            "type": "pareto",
            "categories": categories,
            "counts": counts,
            "cumulative": cumulative,
            "threshold_line": threshold * 100.0,
            "colors": colors,
        });

        let mut metrics = std::collections::HashMap::new();
        metrics.insert("key_few_contribution".to_string(), outcome.key_few_contribution);
        metrics.insert("key_few_percentage".to_string(), outcome.key_few_percentage);

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

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> Vec<(String, u64)> {
        vec![
            ("A".to_string(), 45),
            ("B".to_string(), 28),
            ("C".to_string(), 22),
            ("D".to_string(), 18),
            ("E".to_string(), 15),
        ]
    }

    #[test]
    fn cumulative_percentages_match_expected() {
        let outcome = compute(rows(), 0.8).unwrap();
        let expected = [37.5, 60.8, 79.2, 94.2, 100.0];
        for (row, exp) in outcome.rows.iter().zip(expected) {
            assert!((row.cumulative_pct - exp).abs() < 0.1, "{} vs {}", row.cumulative_pct, exp);
        }
        assert_eq!(outcome.key_few_count, 4);
        assert!((outcome.key_few_contribution - 94.2).abs() < 0.1);
    }

    #[test]
    fn sum_of_counts_equals_total() {
        let outcome = compute(rows(), 0.8).unwrap();
        let sum: u64 = outcome.rows.iter().map(|r| r.count).sum();
        assert_eq!(sum, outcome.total_count);
        assert!((outcome.rows.last().unwrap().cumulative_pct - 100.0).abs() < 1e-6);
    }

    #[test]
    fn zero_categories_is_insufficient_data() {
        assert!(compute(Vec::new(), 0.8).is_err());
    }

    #[test]
    fn single_category_is_key_few_at_100_pct() {
        let outcome = compute(vec![("solo".to_string(), 10)], 0.8).unwrap();
        assert_eq!(outcome.key_few_count, 1);
        assert!((outcome.key_few_contribution - 100.0).abs() < 1e-6);
    }
}
