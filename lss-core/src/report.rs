//! C9 — Report Formatter: deterministic rendering of an `AnalysisReport`
//! into an ordered list of paragraphs. No side effects; callers decide
//! whether/where to print.

use crate::orchestrator::AnalysisReport;

pub fn format_report(report: &AnalysisReport) -> Vec<String> {
    let mut paragraphs = Vec::new();

    paragraphs.push(format!("[{:?}] {} — {}", report.status, report.dimension, report.key));

    for issue in &report.critical_issues {
        paragraphs.push(format!(
            "ISSUE {} / {} — severity {:?}, Cpk={:?}, mean={:.2}",
            issue.node_code, issue.param_code, issue.severity, issue.spc.cpk, issue.spc.mean
        ));
    }

    if !report.warnings.is_empty() {
        paragraphs.push(format!("{} parameter group(s) in warning state", report.warnings.len()));
    }

    for insight in &report.insights {
        paragraphs.push(insight.clone());
    }

    paragraphs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::Severity;

    #[test]
    fn headline_leads_and_insights_trail() {
        let report = AnalysisReport {
            dimension: "workshop".to_string(),
            key: "BLOCK_E".to_string(),
            status: Severity::Normal,
            critical_issues: vec![],
            warnings: vec![],
            insights: vec!["overall status: Normal".to_string()],
            metadata: Default::default(),
            quick_actions: vec![],
        };
        let paragraphs = format_report(&report);
        assert!(paragraphs[0].contains("workshop"));
        assert!(paragraphs.last().unwrap().contains("Normal"));
    }

    #[test]
    fn empty_report_still_renders_headline() {
        let report = AnalysisReport {
            dimension: "batch".to_string(),
            key: "BATCH_001".to_string(),
            status: Severity::Normal,
            critical_issues: vec![],
            warnings: vec![],
            insights: vec![],
            metadata: Default::default(),
            quick_actions: vec![],
        };
        assert_eq!(format_report(&report).len(), 1);
    }
}
