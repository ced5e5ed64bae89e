//! SPC / Cpk (key `spc`, shape `TimeSeries`).

use super::{DataShape, Tool, ToolCategory, ToolConfig, ToolInput, ToolResult, ValidationOutcome};
use serde::Serialize;
use serde_json::json;

#[derive(Debug, Clone, Serialize)]
pub struct Violation {
    pub index: usize,
    pub value: f64,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub rule: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct SpcOutcome {
    pub mean: f64,
    pub std: f64,
    pub mr_bar: f64,
    pub ucl: f64,
    pub lcl: f64,
    pub cp: Option<f64>,
    pub cpu: Option<f64>,
    pub cpl: Option<f64>,
    pub cpk: Option<f64>,
    pub target: Option<f64>,
    pub violations: Vec<Violation>,
    pub process_status: &'static str,
    pub insights: Vec<String>,
}

/// The moving-range-to-sigma constant for a subgroup size of 2 (3/d2,
/// d2(2) = 1.128). Hard-coded per the source's own convention, not
/// derived (§9).
const MOVING_RANGE_CONSTANT: f64 = 2.66;

pub fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation, divisor `n - 1`. Callers with `n < 2`
/// never reach here (guarded by `InsufficientData`).
pub fn sample_std(values: &[f64], mean: f64) -> f64 {
    let n = values.len() as f64;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    variance.sqrt()
}

fn cpk_grade(cpk: f64) -> &'static str {
    if cpk >= 1.33 {
        "优秀"
    } else if cpk >= 1.0 {
        "良好"
    } else if cpk >= 0.67 {
        "勉强"
    } else {
        "不足"
    }
}

pub fn compute(values: &[f64], usl: Option<f64>, lsl: Option<f64>, target: Option<f64>) -> Result<SpcOutcome, String> {
    if values.len() < 2 {
        return Err("SPC requires at least 2 data points".to_string());
    }

    let n = values.len();
    let mean_v = mean(values);
    let std_v = sample_std(values, mean_v);

    let mr: Vec<f64> = values.windows(2).map(|w| (w[1] - w[0]).abs()).collect();
    let mr_bar = mr.iter().sum::<f64>() / mr.len() as f64;

    let ucl = mean_v + MOVING_RANGE_CONSTANT * mr_bar;
    let lcl = mean_v - MOVING_RANGE_CONSTANT * mr_bar;

    let cp = match (usl, lsl) {
        (Some(u), Some(l)) if std_v > 0.0 => Some((u - l) / (6.0 * std_v)),
        _ => None,
    };
    let cpu = usl.filter(|_| std_v > 0.0).map(|u| (u - mean_v) / (3.0 * std_v));
    let cpl = lsl.filter(|_| std_v > 0.0).map(|l| (mean_v - l) / (3.0 * std_v));
    let cpk = match (cpu, cpl) {
        (Some(u), Some(l)) => Some(u.min(l)),
        (Some(u), None) => Some(u),
        (None, Some(l)) => Some(l),
        (None, None) => None,
    };

    let mut violations = Vec::new();
    for (i, &v) in values.iter().enumerate() {
        if v > ucl || v < lcl {
            violations.push(Violation { index: i, value: v, kind: "control_limit", rule: "Out of control limit" });
        }
        if let Some(u) = usl {
            if v > u {
                violations.push(Violation { index: i, value: v, kind: "USL", rule: "USL" });
            }
        }
        if let Some(l) = lsl {
            if v < l {
                violations.push(Violation { index: i, value: v, kind: "LSL", rule: "LSL" });
            }
        }
    }

    let three_sigma_breach = std_v > 0.0 && values.iter().any(|v| (v - mean_v).abs() > 3.0 * std_v);
    let process_status = if three_sigma_breach || !violations.is_empty() {
        "失控"
    } else if cpk.map_or(false, |c| c < 1.33) {
        "警告"
    } else {
        "受控"
    };

    let mut insights = Vec::new();
    if let Some(c) = cpk {
        insights.push(format!("Cpk = {:.2} ({})", c, cpk_grade(c)));
    }
    insights.push(format!("{n} data points analysed"));
    insights.push(format!("{} violation(s) detected", violations.len()));
    if let Some(worst) = violations.iter().max_by(|a, b| {
        (a.value - mean_v).abs().partial_cmp(&(b.value - mean_v).abs()).unwrap()
    }) {
        insights.push(format!(
            "largest deviation at index {} (value {:.2})",
            worst.index, worst.value
        ));
    }

    Ok(SpcOutcome {
        mean: mean_v,
        std: std_v,
        mr_bar,
        ucl,
        lcl,
        cp,
        cpu,
        cpl,
        cpk,
        target,
        violations,
        process_status,
        insights,
    })
}

pub struct SpcTool;

impl Tool for SpcTool {
    fn key(&self) -> &'static str {
        "spc"
    }

    fn name(&self) -> &'static str {
        "Statistical Process Control"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Diagnostic
    }

    fn required_data_shape(&self) -> DataShape {
        DataShape::TimeSeries
    }

    fn validate(&self, data: &ToolInput, _config: &ToolConfig) -> ValidationOutcome {
        match data {
            ToolInput::TimeSeries(values) if values.len() >= 2 => ValidationOutcome::ok(),
            ToolInput::TimeSeries(_) => {
                ValidationOutcome::fail(vec!["SPC requires at least 2 data points".to_string()])
            }
            _ => ValidationOutcome::fail(vec!["spc requires a TimeSeries input".to_string()]),
        }
    }

    fn run(&self, data: &ToolInput, config: &ToolConfig) -> ToolResult {
        let values = match data {
            ToolInput::TimeSeries(values) => values,
            _ => return ToolResult::failure(vec!["spc requires a TimeSeries input".to_string()]),
        };

        let usl = config.get_f64("usl");
        let lsl = config.get_f64("lsl");
        let target = config.get_f64("target");

        let outcome = match compute(values, usl, lsl, target) {
            Ok(outcome) => outcome,
            Err(err) => return ToolResult::failure(vec![err]),
        };

        let plot_data = json!({
            "type": "spc",
            "values": values,
            "ucl": outcome.ucl,
            "lcl": outcome.lcl,
            "target": target,
            "usl": usl,
            "lsl": lsl,
            "violations": outcome.violations,
        });

        let mut metrics = std::collections::HashMap::new();
        metrics.insert("mean".to_string(), outcome.mean);
        metrics.insert("std".to_string(), outcome.std);
        if let Some(cpk) = outcome.cpk {
            metrics.insert("cpk".to_string(), cpk);
        }

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

    #[test]
    fn single_batch_in_control() {
        let values = vec![85.0, 85.5, 86.0, 84.8, 85.2, 85.6, 85.1, 85.4, 85.3, 85.7];
        let outcome = compute(&values, Some(90.0), Some(80.0), Some(85.0)).unwrap();
        assert!((outcome.mean - 85.36).abs() < 0.01);
        assert!((outcome.std - 0.367).abs() < 0.01);
        assert!(outcome.violations.is_empty());
        assert_eq!(outcome.process_status, "受控");
        assert!(outcome.cpk.unwrap() > 4.0);
        assert!(outcome.insights.len() >= 2);
    }

    #[test]
    fn usl_breach_flags_out_of_control() {
        let values = vec![85.0, 86.0, 85.5, 87.0, 85.8, 84.5, 86.2, 85.9, 90.2, 86.0];
        let outcome = compute(&values, Some(90.0), Some(80.0), Some(85.0)).unwrap();
        let breach = outcome.violations.iter().find(|v| v.index == 8).unwrap();
        assert_eq!(breach.value, 90.2);
        assert_eq!(breach.kind, "USL");
        assert_eq!(outcome.process_status, "失控");
        assert!(outcome.insights.iter().any(|i| i.contains('8')));
    }

    #[test]
    fn constant_values_yield_zero_spread_and_in_control() {
        let values = vec![85.0; 5];
        let outcome = compute(&values, None, None, None).unwrap();
        assert_eq!(outcome.std, 0.0);
        assert_eq!(outcome.mr_bar, 0.0);
        assert_eq!(outcome.ucl, outcome.mean);
        assert_eq!(outcome.lcl, outcome.mean);
        assert!(outcome.cp.is_none());
        assert!(outcome.cpk.is_none());
        assert_eq!(outcome.process_status, "受控");
    }

    #[test]
    fn single_point_is_rejected() {
        assert!(compute(&[85.0], None, None, None).is_err());
    }

    #[test]
    fn two_points_compute_valid_limits() {
        let outcome = compute(&[85.0, 86.0], None, None, None).unwrap();
        assert!(outcome.mr_bar > 0.0);
        assert!(outcome.ucl > outcome.lcl);
    }
}
