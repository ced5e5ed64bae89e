use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use lss_core::providers::DEFAULT_LIMIT;
use lss_core::store::InMemoryStore;
use lss_core::tools::{ToolConfig, ToolInput};

mod bootstrap;
mod operations;
mod plotting;

#[derive(Parser)]
#[command(name = "lss-app", about = "Local driver for the manufacturing analysis service")]
struct Cli {
    /// Directory holding the YAML knowledge base (1_nodes, 2_edges, ...)
    #[arg(long, default_value = "./data/knowledge_base")]
    knowledge_base: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run an analysis over one dimension and print the formatted report.
    Analyze {
        #[arg(value_enum)]
        dimension: Dimension,
        key: String,
    },
    /// Generate today's per-role instructions from a fixed set of dimension keys.
    GenerateOrders {
        #[arg(long, value_delimiter = ',')]
        batches: Vec<String>,
    },
    /// Print the current-state map-colouring view.
    MonitorLatest,
    /// Run one tool through the Tool Framework registry (§6.1 "Tools")
    /// and print its result envelope.
    RunTool {
        tool: String,
        node_code: String,
        param_code: String,
    },
    /// Run the SPC tool directly on one (node, param) and render a PNG chart.
    PlotSpc {
        node_code: String,
        param_code: String,
        #[arg(long, default_value = "./data/runs/spc.png")]
        out: String,
    },
    /// Run the Histogram tool on one (node, param) and render a PNG chart.
    PlotHistogram {
        node_code: String,
        param_code: String,
        #[arg(long, default_value_t = 10)]
        bins: u64,
        #[arg(long, default_value = "./data/runs/histogram.png")]
        out: String,
    },
    /// Run the Boxplot tool comparing one parameter across several nodes.
    PlotBoxplot {
        param_code: String,
        #[arg(long, value_delimiter = ',')]
        node_codes: Vec<String>,
        #[arg(long, default_value_t = 1.5)]
        outlier_factor: f64,
        #[arg(long, default_value = "./data/runs/boxplot.png")]
        out: String,
    },
    /// Run the Pareto tool over SPC violation counts across a workshop's
    /// units and render a PNG chart.
    PlotPareto {
        block_code: String,
        #[arg(long)]
        threshold: Option<f64>,
        #[arg(long, default_value = "./data/runs/pareto.png")]
        out: String,
    },
}

#[derive(Clone, clap::ValueEnum)]
enum Dimension {
    Batch,
    Process,
    Workshop,
    Person,
    Time,
}

impl Dimension {
    fn as_str(&self) -> &'static str {
        match self {
            Dimension::Batch => "batch",
            Dimension::Process => "process",
            Dimension::Workshop => "workshop",
            Dimension::Person => "person",
            Dimension::Time => "time",
        }
    }
}

fn ensure_parent_dir(path: &str) -> Result<()> {
    if let Some(parent) = std::path::Path::new(path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn main() -> Result<()> {
    println!("--- LSS Analysis Service ---");

    let cli = Cli::parse();
    let store = InMemoryStore::new();
    bootstrap::load(&store, &cli.knowledge_base).context("Failed to load knowledge base")?;

    match cli.command {
        Command::Analyze { dimension, key } => {
            let report = operations::analyze(&store, dimension.as_str(), &key)?;
            for paragraph in lss_core::report::format_report(&report) {
                println!("{paragraph}");
            }
        }
        Command::GenerateOrders { batches } => {
            let target_date = Utc::now().date_naive();
            let keys: Vec<(&str, &str)> = batches.iter().map(|b| ("batch", b.as_str())).collect();
            let created = operations::generate_daily_orders(&store, target_date, &keys)?;
            println!("Generated {created} instruction(s) for {target_date}");
        }
        Command::MonitorLatest => {
            for entry in operations::monitor_latest(&store) {
                println!("{}: {:?}", entry.node_code, entry.status);
            }
        }
        Command::RunTool { tool, node_code, param_code } => {
            let ctx = lss_core::providers::by_process(&store, &node_code, Some(&param_code), DEFAULT_LIMIT)?;
            let group = ctx
                .groups()
                .find(|g| g.node_code == node_code && g.param_code == param_code)
                .context("no measurements for that node/parameter")?;
            let values: Vec<f64> = group.measurements.iter().map(|m| m.value).collect();

            let mut config = ToolConfig::new();
            if let Some(p) = &group.param {
                if let Some(usl) = p.usl {
                    config = config.with("usl", usl);
                }
                if let Some(lsl) = p.lsl {
                    config = config.with("lsl", lsl);
                }
                if let Some(target) = p.target {
                    config = config.with("target", target);
                }
            }

            let result = operations::run_tool(&tool, ToolInput::TimeSeries(values), config)?;
            println!("success = {}", result.success);
            for insight in &result.insights {
                println!("- {insight}");
            }
            for err in &result.errors {
                println!("! {err}");
            }
        }
        Command::PlotSpc { node_code, param_code, out } => {
            let ctx = lss_core::providers::by_process(&store, &node_code, Some(&param_code), DEFAULT_LIMIT)?;
            let group = ctx
                .groups()
                .find(|g| g.node_code == node_code && g.param_code == param_code)
                .context("no measurements for that node/parameter")?;
            let values: Vec<f64> = group.measurements.iter().map(|m| m.value).collect();
            let (usl, lsl, target) = group.param.as_ref().map(|p| (p.usl, p.lsl, p.target)).unwrap_or((None, None, None));
            let outcome = lss_core::tools::spc::compute(&values, usl, lsl, target).map_err(|e| anyhow::anyhow!(e))?;
            ensure_parent_dir(&out)?;
            plotting::plot_spc(&out, &values, &outcome)?;
            println!("Wrote SPC chart to '{out}' (process_status = {})", outcome.process_status);
        }
        Command::PlotHistogram { node_code, param_code, bins, out } => {
            let ctx = lss_core::providers::by_process(&store, &node_code, Some(&param_code), DEFAULT_LIMIT)?;
            let group = ctx
                .groups()
                .find(|g| g.node_code == node_code && g.param_code == param_code)
                .context("no measurements for that node/parameter")?;
            let values: Vec<f64> = group.measurements.iter().map(|m| m.value).collect();
            let (usl, lsl) = group.param.as_ref().map(|p| (p.usl, p.lsl)).unwrap_or((None, None));
            let outcome = lss_core::tools::histogram::compute(&values, bins, usl, lsl).map_err(|e| anyhow::anyhow!(e))?;
            ensure_parent_dir(&out)?;
            plotting::plot_histogram(&out, &outcome)?;
            println!("Wrote histogram chart to '{out}' ({})", outcome.distribution_label);
        }
        Command::PlotBoxplot { param_code, node_codes, outlier_factor, out } => {
            let mut series = Vec::new();
            for node_code in &node_codes {
                let ctx = lss_core::providers::by_process(&store, node_code, Some(&param_code), DEFAULT_LIMIT)?;
                let values: Vec<f64> = ctx
                    .groups()
                    .find(|g| &g.node_code == node_code && g.param_code == param_code)
                    .map(|g| g.measurements.iter().map(|m| m.value).collect())
                    .unwrap_or_default();
                series.push((node_code.clone(), values));
            }
            let outcome = lss_core::tools::boxplot::compute(&series, outlier_factor).map_err(|e| anyhow::anyhow!(e))?;
            ensure_parent_dir(&out)?;
            plotting::plot_boxplot(&out, &outcome)?;
            println!("Wrote boxplot chart to '{out}' (most_variable = {:?})", outcome.comparison.most_variable);
        }
        Command::PlotPareto { block_code, threshold, out } => {
            let ctx = lss_core::providers::by_workshop(&store, &block_code, DEFAULT_LIMIT)?;
            let mut categories: Vec<(String, u64)> = Vec::new();
            for group in ctx.groups() {
                let values: Vec<f64> = group.measurements.iter().map(|m| m.value).collect();
                if values.len() < 2 {
                    continue;
                }
                let (usl, lsl, target) = group.param.as_ref().map(|p| (p.usl, p.lsl, p.target)).unwrap_or((None, None, None));
                let outcome = lss_core::tools::spc::compute(&values, usl, lsl, target).map_err(|e| anyhow::anyhow!(e))?;
                categories.push((group.node_code.clone(), outcome.violations.len() as u64));
            }
            let threshold = threshold.unwrap_or(lss_core::tools::pareto::DEFAULT_THRESHOLD);
            let outcome = lss_core::tools::pareto::compute(categories, threshold).map_err(|e| anyhow::anyhow!(e))?;
            ensure_parent_dir(&out)?;
            plotting::plot_pareto(&out, &outcome)?;
            println!("Wrote Pareto chart to '{out}' ({} key-few categories)", outcome.key_few_count);
        }
    }

    Ok(())
}
