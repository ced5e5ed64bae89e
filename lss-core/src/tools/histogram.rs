//! Histogram + normality test (key `histogram`, shape `TimeSeries`).

use super::{DataShape, Tool, ToolCategory, ToolConfig, ToolInput, ToolResult, ValidationOutcome};
use serde::Serialize;
use serde_json::json;

pub const DEFAULT_BINS: u64 = 10;
const SHAPIRO_MIN_N: usize = 3;
const SHAPIRO_MAX_N: usize = 5000;

#[derive(Debug, Clone, Serialize)]
pub struct HistogramOutcome {
    pub mean: f64,
    pub std: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    pub n: usize,
    pub bin_boundaries: Vec<f64>,
    pub bin_counts: Vec<u64>,
    pub skewness: f64,
    pub kurtosis: f64,
    pub p_value: Option<f64>,
    pub is_normal: Option<bool>,
    pub distribution_label: &'static str,
    pub warnings: Vec<String>,
    pub insights: Vec<String>,
}

fn median_of(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    }
}

fn moments(values: &[f64], mean: f64, std: f64) -> (f64, f64) {
    let n = values.len() as f64;
    if std == 0.0 {
        return (0.0, 0.0);
    }
    let m3 = values.iter().map(|v| (v - mean).powi(3)).sum::<f64>() / n;
    let m4 = values.iter().map(|v| (v - mean).powi(4)).sum::<f64>() / n;
    let skewness = m3 / std.powi(3);
    let kurtosis = m4 / std.powi(4) - 3.0;
    (skewness, kurtosis)
}

fn distribution_label(is_normal: Option<bool>, skewness: f64, kurtosis: f64) -> &'static str {
    if is_normal == Some(true) {
        return "正态";
    }
    if skewness.abs() < 1.0 && kurtosis.abs() < 2.0 {
        return "近似正态";
    }
    if skewness > 0.0 {
        "右偏"
    } else if skewness < 0.0 {
        "左偏"
    } else {
        "不规则"
    }
}

/// Standard normal CDF via the Abramowitz & Stegun 7.1.26 erf
/// approximation (max error ~1.5e-7).
fn erf(x: f64) -> f64 {
    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();
    let a1 = 0.254829592;
    let a2 = -0.284496736;
    let a3 = 1.421413741;
    let a4 = -1.453152027;
    let a5 = 1.061405429;
    let p = 0.3275911;
    let t = 1.0 / (1.0 + p * x);
    let y = 1.0 - (((((a5 * t + a4) * t) + a3) * t + a2) * t + a1) * t * (-x * x).exp();
    sign * y
}

fn norm_cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf(x / std::f64::consts::SQRT_2))
}

/// Inverse standard normal CDF via the Beasley-Springer-Moro rational
/// approximation (Moro, 1995). Accurate to ~1e-9 for the mid-range
/// probabilities Shapiro-Wilk's order-statistic weights need.
fn norm_inv(p: f64) -> f64 {
    let a = [
        -3.969683028665376e+01,
        2.209460984245205e+02,
        -2.759285104469687e+02,
        1.383577518672690e+02,
        -3.066479806614716e+01,
        2.506628277459239e+00,
    ];
    let b = [
        -5.447609879822406e+01,
        1.615858368580409e+02,
        -1.556989798598866e+02,
        6.680131188771972e+01,
        -1.328068155288572e+01,
    ];
    let c = [
        -7.784894002430293e-03,
        -3.223964580411365e-01,
        -2.400758277161838e+00,
        -2.549732539343734e+00,
        4.374664141464968e+00,
        2.938163982698783e+00,
    ];
    let d = [
        7.784695709041462e-03,
        3.224671290700398e-01,
        2.445134137142996e+00,
        3.754408661907416e+00,
    ];
    let p_low = 0.02425;
    let p_high = 1.0 - p_low;

    if p < p_low {
        let q = (-2.0 * p.ln()).sqrt();
        (((((c[0] * q + c[1]) * q + c[2]) * q + c[3]) * q + c[4]) * q + c[5])
            / ((((d[0] * q + d[1]) * q + d[2]) * q + d[3]) * q + 1.0)
    } else if p <= p_high {
        let q = p - 0.5;
        let r = q * q;
        (((((a[0] * r + a[1]) * r + a[2]) * r + a[3]) * r + a[4]) * r + a[5]) * q
            / (((((b[0] * r + b[1]) * r + b[2]) * r + b[3]) * r + b[4]) * r + 1.0)
    } else {
        let q = (-2.0 * (1.0 - p).ln()).sqrt();
        -(((((c[0] * q + c[1]) * q + c[2]) * q + c[3]) * q + c[4]) * q + c[5])
            / ((((d[0] * q + d[1]) * q + d[2]) * q + d[3]) * q + 1.0)
    }
}

/// Shapiro-Wilk normality test via the Royston (1995) approximation
/// (AS R94): builds the expected normal order-statistic weights from
/// `norm_inv`, computes the W statistic, then maps W to a p-value
/// through Royston's normalising transform.
fn shapiro_wilk_p_value(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    let n_f = n as f64;

    let m: Vec<f64> = (1..=n).map(|i| norm_inv((i as f64 - 0.375) / (n_f + 0.25))).collect();
    let m_sq_sum: f64 = m.iter().map(|v| v * v).sum();
    let m_norm = m_sq_sum.sqrt();

    let u = 1.0 / n_f.sqrt();
    let mut weights: Vec<f64> = m.iter().map(|v| v / m_norm).collect();

    // Royston's tail corrections for the two most extreme order statistics.
    let a_n = -2.706056 * u.powi(5) + 4.434685 * u.powi(4) - 2.071190 * u.powi(3)
        - 0.147981 * u.powi(2)
        + 0.221157 * u
        + m[n - 1] / m_norm;
    let a_n1 = -3.582633 * u.powi(5) + 5.682633 * u.powi(4) - 1.752461 * u.powi(3)
        - 0.293762 * u.powi(2)
        + 0.042981 * u
        + m[n - 2] / m_norm;

    if n >= 6 {
        let phi = (m_sq_sum - 2.0 * m[n - 1].powi(2) - 2.0 * m[n - 2].powi(2))
            / (1.0 - 2.0 * a_n.powi(2) - 2.0 * a_n1.powi(2));
        let phi = phi.sqrt();
        weights[n - 1] = a_n;
        weights[0] = -a_n;
        weights[n - 2] = a_n1;
        weights[1] = -a_n1;
        for w in weights.iter_mut().take(n - 2).skip(2) {
            *w /= phi;
        }
    } else {
        weights[n - 1] = a_n;
        weights[0] = -a_n;
    }

    let mean_v = sorted.iter().sum::<f64>() / n_f;
    let ss: f64 = sorted.iter().map(|v| (v - mean_v).powi(2)).sum();
    if ss == 0.0 {
        return 1.0;
    }
    let b: f64 = weights.iter().zip(sorted.iter()).map(|(w, v)| w * v).sum();
    let w_stat = (b * b / ss).clamp(0.0, 1.0);

    // Royston's two regimes for the W -> p-value normalising transform.
    let (mu, sigma) = if n <= 11 {
        let mu = 0.5440 - 0.39978 * n_f + 0.025054 * n_f.powi(2) - 0.0006714 * n_f.powi(3);
        let sigma = (1.3822 - 0.77857 * n_f + 0.062767 * n_f.powi(2) - 0.0020322 * n_f.powi(3)).exp();
        (mu, sigma)
    } else {
        let ln_n = n_f.ln();
        let mu = -1.5861 - 0.31082 * ln_n - 0.083751 * ln_n.powi(2) + 0.0038915 * ln_n.powi(3);
        let sigma = (-0.4803 - 0.082676 * ln_n + 0.0030302 * ln_n.powi(2)).exp();
        (mu, sigma)
    };

    let z = ((1.0 - w_stat).ln() - mu) / sigma;
    (1.0 - norm_cdf(z)).clamp(0.0, 1.0)
}

pub fn compute(
    values: &[f64],
    bins: u64,
    usl: Option<f64>,
    lsl: Option<f64>,
) -> Result<HistogramOutcome, String> {
    if values.is_empty() {
        return Err("Histogram requires at least 1 data point".to_string());
    }
    let n = values.len();
    let bins = bins.max(1) as usize;

    let mean_v = values.iter().sum::<f64>() / n as f64;
    let std_v = if n >= 2 {
        (values.iter().map(|v| (v - mean_v).powi(2)).sum::<f64>() / (n as f64 - 1.0)).sqrt()
    } else {
        0.0
    };
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let median = median_of(&sorted);
    let min = sorted[0];
    let max = sorted[n - 1];

    let width = (max - min) / bins as f64;
    let mut bin_boundaries = Vec::with_capacity(bins + 1);
    let mut bin_counts = vec![0u64; bins];
    if width == 0.0 {
        bin_boundaries.push(min);
        bin_boundaries.push(max);
        bin_counts = vec![n as u64];
    } else {
        for i in 0..=bins {
            bin_boundaries.push(min + width * i as f64);
        }
        for &v in values {
            let mut idx = ((v - min) / width).floor() as isize;
            if idx as usize >= bins {
                idx = bins as isize - 1; // last bin is closed on the right
            }
            if idx < 0 {
                idx = 0;
            }
            bin_counts[idx as usize] += 1;
        }
    }

    let (skewness, kurtosis) = moments(values, mean_v, std_v);

    let (p_value, is_normal) = if (SHAPIRO_MIN_N..=SHAPIRO_MAX_N).contains(&n) {
        let p = shapiro_wilk_p_value(&sorted);
        (Some(p), Some(p >= 0.05))
    } else {
        (None, None)
    };

    let distribution_label = distribution_label(is_normal, skewness, kurtosis);

    let mut warnings = Vec::new();
    if let Some(u) = usl {
        if max > u {
            warnings.push(format!("max {max:.2} exceeds USL {u:.2}"));
        }
    }
    if let Some(l) = lsl {
        if min < l {
            warnings.push(format!("min {min:.2} is below LSL {l:.2}"));
        }
    }
    if is_normal == Some(false) {
        warnings.push("distribution is not normal".to_string());
    }

    let mut insights = vec![format!("n={n}, mean={mean_v:.2}, std={std_v:.2}"), format!("distribution: {distribution_label}")];
    if let Some(p) = p_value {
        insights.push(format!("Shapiro-Wilk p = {p:.4}"));
    }

    Ok(HistogramOutcome {
        mean: mean_v,
        std: std_v,
        median,
        min,
        max,
        n,
        bin_boundaries,
        bin_counts,
        skewness,
        kurtosis,
        p_value,
        is_normal,
        distribution_label,
        warnings,
        insights,
    })
}

pub struct HistogramTool;

impl Tool for HistogramTool {
    fn key(&self) -> &'static str {
        "histogram"
    }

    fn name(&self) -> &'static str {
        "Histogram & Normality"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Descriptive
    }

    fn required_data_shape(&self) -> DataShape {
        DataShape::TimeSeries
    }

    fn validate(&self, data: &ToolInput, _config: &ToolConfig) -> ValidationOutcome {
        match data {
            ToolInput::TimeSeries(values) if !values.is_empty() => ValidationOutcome::ok(),
            ToolInput::TimeSeries(_) => {
                ValidationOutcome::fail(vec!["Histogram requires at least 1 data point".to_string()])
            }
            _ => ValidationOutcome::fail(vec!["histogram requires a TimeSeries input".to_string()]),
        }
    }

    fn run(&self, data: &ToolInput, config: &ToolConfig) -> ToolResult {
        let values = match data {
            ToolInput::TimeSeries(values) => values,
            _ => return ToolResult::failure(vec!["histogram requires a TimeSeries input".to_string()]),
        };
        let bins = config.get_u64("bins").unwrap_or(DEFAULT_BINS);
        let usl = config.get_f64("usl");
        let lsl = config.get_f64("lsl");

        let outcome = match compute(values, bins, usl, lsl) {
            Ok(outcome) => outcome,
            Err(err) => return ToolResult::failure(vec![err]),
        };

        let plot_data = json!({
            "type": "histogram",
            "bins": outcome.bin_boundaries,
            "counts": outcome.bin_counts,
            "lines": {
                "mean": { "x": outcome.mean, "label": "Mean" },
                "median": { "x": outcome.median, "label": "Median" },
                "usl": usl,
                "lsl": lsl,
            },
        });

        let mut metrics = std::collections::HashMap::new();
        metrics.insert("mean".to_string(), outcome.mean);
        metrics.insert("std".to_string(), outcome.std);
        if let Some(p) = outcome.p_value {
            metrics.insert("p_value".to_string(), p);
        }

        ToolResult {
            success: true,
            result: serde_json::to_value(&outcome).unwrap_or_default(),
            plot_data,
            metrics,
            warnings: outcome.warnings.clone(),
            errors: Vec::new(),
            insights: outcome.insights,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bin_counts_sum_to_n() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
        let outcome = compute(&values, 10, None, None).unwrap();
        assert_eq!(outcome.bin_boundaries.len(), 11);
        assert_eq!(outcome.bin_counts.iter().sum::<u64>(), 10);
    }

    #[test]
    fn constant_input_yields_single_bin() {
        let values = vec![5.0; 6];
        let outcome = compute(&values, 10, None, None).unwrap();
        assert_eq!(outcome.bin_counts.iter().sum::<u64>(), 6);
        assert!(outcome.bin_counts.iter().filter(|&&c| c > 0).count() == 1);
    }

    #[test]
    fn small_n_has_no_normality_verdict() {
        let values = vec![1.0, 2.0];
        let outcome = compute(&values, 5, None, None).unwrap();
        assert!(outcome.p_value.is_none());
        assert!(outcome.is_normal.is_none());
    }

    #[test]
    fn normal_looking_sample_gets_a_p_value() {
        let values = vec![
            85.1, 85.4, 84.9, 85.0, 85.3, 84.8, 85.2, 85.0, 85.1, 84.9, 85.2, 85.0,
        ];
        let outcome = compute(&values, 10, None, None).unwrap();
        assert!(outcome.p_value.is_some());
        let p = outcome.p_value.unwrap();
        assert!((0.0..=1.0).contains(&p));
    }
}
