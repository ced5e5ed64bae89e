//! Renders each statistical tool's `plot_data` payload (§6.2) to a PNG,
//! standing in for the external web UI that would otherwise consume
//! these payloads directly as chart data.

use anyhow::{Context, Result};
use lss_core::tools::boxplot::BoxplotOutcome;
use lss_core::tools::histogram::HistogramOutcome;
use lss_core::tools::pareto::ParetoOutcome;
use lss_core::tools::spc::SpcOutcome;
use plotters::prelude::*;

/// SPC chart: the raw series plus UCL/LCL/USL/LSL reference lines and
/// marked violations.
pub fn plot_spc(output_path: &str, values: &[f64], outcome: &SpcOutcome) -> Result<()> {
    let root = BitMapBackend::new(output_path, (1024, 768)).into_drawing_area();
    root.fill(&WHITE)?;

    let n = values.len();
    let min = values.iter().cloned().fold(outcome.lcl, f64::min);
    let max = values.iter().cloned().fold(outcome.ucl, f64::max);
    let pad = (max - min).abs().max(1.0) * 0.1;

    let mut chart = ChartBuilder::on(&root)
        .caption("SPC Control Chart", ("sans-serif", 40).into_font())
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(50)
        .build_cartesian_2d(0usize..n.max(1), (min - pad)..(max + pad))
        .context("failed to build SPC chart")?;

    chart.configure_mesh().x_desc("Sample").y_desc("Value").draw()?;

    chart.draw_series(LineSeries::new(values.iter().enumerate().map(|(i, &v)| (i, v)), BLUE.stroke_width(2)))?
        .label("value")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE));

    chart.draw_series(LineSeries::new((0..n).map(|i| (i, outcome.ucl)), RED.stroke_width(1)))?
        .label("UCL")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED));
    chart.draw_series(LineSeries::new((0..n).map(|i| (i, outcome.lcl)), RED.stroke_width(1)))?;

    for violation in &outcome.violations {
        chart.draw_series(std::iter::once(Circle::new((violation.index, violation.value), 5, RED.filled())))?;
    }

    chart.configure_series_labels().background_style(&WHITE.mix(0.8)).border_style(&BLACK).draw()?;
    root.present()?;
    Ok(())
}

/// Pareto chart: bars for counts, overlaid cumulative-percentage line.
pub fn plot_pareto(output_path: &str, outcome: &ParetoOutcome) -> Result<()> {
    let root = BitMapBackend::new(output_path, (1024, 768)).into_drawing_area();
    root.fill(&WHITE)?;

    let max_count = outcome.rows.iter().map(|r| r.count).max().unwrap_or(1);

    let mut chart = ChartBuilder::on(&root)
        .caption("Pareto Analysis", ("sans-serif", 40).into_font())
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(0usize..outcome.rows.len(), 0u64..(max_count + max_count / 10 + 1))
        .context("failed to build Pareto chart")?;

    chart.configure_mesh().y_desc("Count").draw()?;

    chart.draw_series(outcome.rows.iter().enumerate().map(|(i, row)| {
        let color = match row.class {
            "A" => RED.filled(),
            "B" => YELLOW.filled(),
            _ => BLUE.filled(),
        };
        Rectangle::new([(i, 0), (i + 1, row.count)], color)
    }))?;

    root.present()?;
    Ok(())
}

/// Histogram: per-bin bars plus mean/median reference lines.
pub fn plot_histogram(output_path: &str, outcome: &HistogramOutcome) -> Result<()> {
    let root = BitMapBackend::new(output_path, (1024, 768)).into_drawing_area();
    root.fill(&WHITE)?;

    let max_count = outcome.bin_counts.iter().cloned().max().unwrap_or(1);

    let mut chart = ChartBuilder::on(&root)
        .caption(format!("Histogram ({})", outcome.distribution_label), ("sans-serif", 40).into_font())
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(50)
        .build_cartesian_2d(outcome.min..outcome.max.max(outcome.min + 1.0), 0u64..(max_count + 1))
        .context("failed to build histogram chart")?;

    chart.configure_mesh().x_desc("Value").y_desc("Count").draw()?;

    chart.draw_series(outcome.bin_counts.iter().enumerate().map(|(i, &count)| {
        let left = outcome.bin_boundaries[i];
        let right = outcome.bin_boundaries.get(i + 1).copied().unwrap_or(left);
        Rectangle::new([(left, 0), (right, count)], BLUE.filled())
    }))?;

    root.present()?;
    Ok(())
}

/// Boxplot: one box-and-whisker per series with outliers marked.
pub fn plot_boxplot(output_path: &str, outcome: &BoxplotOutcome) -> Result<()> {
    let root = BitMapBackend::new(output_path, (1024, 768)).into_drawing_area();
    root.fill(&WHITE)?;

    let min = outcome.series.iter().map(|s| s.min).fold(f64::INFINITY, f64::min);
    let max = outcome.series.iter().map(|s| s.max).fold(f64::NEG_INFINITY, f64::max);
    let pad = (max - min).abs().max(1.0) * 0.1;

    let mut chart = ChartBuilder::on(&root)
        .caption("Boxplot Comparison", ("sans-serif", 40).into_font())
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(0usize..outcome.series.len(), (min - pad)..(max + pad))
        .context("failed to build boxplot chart")?;

    chart.configure_mesh().y_desc("Value").draw()?;

    for (i, series) in outcome.series.iter().enumerate() {
        chart.draw_series(std::iter::once(Rectangle::new(
            [(i, series.q1), (i + 1, series.q3)],
            BLUE.mix(0.4).filled(),
        )))?;
        chart.draw_series(LineSeries::new([(i, series.min), (i, series.max)], BLACK))?;
        for outlier in &series.outliers {
            chart.draw_series(std::iter::once(Circle::new((i, outlier.value), 4, RED.filled())))?;
        }
    }

    root.present()?;
    Ok(())
}
