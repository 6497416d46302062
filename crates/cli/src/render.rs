use salesbrief_core::domain::research::ResearchCategory;
use salesbrief_core::domain::sales::{format_usd, GroupStats, SalesSummary};
use salesbrief_core::pipeline::PipelineOutput;
use std::fmt::Write;

fn bullets(out: &mut String, items: &[String]) {
    for item in items {
        let _ = writeln!(out, "- {item}");
    }
    out.push('\n');
}

fn group_table(out: &mut String, label: &str, groups: &[(&str, &GroupStats)]) {
    let _ = writeln!(out, "| {label} | Sales | Share | Transactions |");
    let _ = writeln!(out, "|---|---:|---:|---:|");
    for (name, stats) in groups {
        let _ = writeln!(
            out,
            "| {name} | {} | {:.1}% | {} |",
            format_usd(stats.total_sales),
            stats.market_share_percent,
            stats.transaction_count
        );
    }
    out.push('\n');
}

fn sales_overview(out: &mut String, summary: &SalesSummary) {
    let _ = writeln!(out, "## Sales Overview\n");
    let _ = writeln!(
        out,
        "Total sales {} across {} transactions.\n",
        format_usd(summary.total_sales),
        summary.transaction_count
    );
    group_table(out, "Product", &summary.ranked_products());
    group_table(out, "Region", &summary.ranked_regions());
}

/// Markdown rendering of a finished run, report sections first.
pub fn markdown(output: &PipelineOutput) -> String {
    let report = &output.report;
    let mut out = String::new();

    let _ = writeln!(out, "# Executive Report: {}\n", output.company);
    let _ = writeln!(
        out,
        "Prepared for the {} on {}. Report ID `{}`.\n",
        output.role,
        output.generated_at.format("%Y-%m-%d %H:%M UTC"),
        output.report_id
    );

    let _ = writeln!(out, "## Executive Summary\n\n{}\n", report.executive_summary);

    let _ = writeln!(out, "## Key Findings\n");
    bullets(&mut out, &report.key_findings);

    let _ = writeln!(out, "## Strategic Recommendations\n");
    for (i, rec) in report.strategic_recommendations.iter().enumerate() {
        let _ = writeln!(out, "{}. **{}**", i + 1, rec.recommendation);
        let _ = writeln!(
            out,
            "   - Category: {} | Priority: {} | Timeline: {}",
            rec.category, rec.priority, rec.timeline
        );
        let _ = writeln!(out, "   - Expected impact: {}", rec.expected_impact);
    }
    out.push('\n');

    let _ = writeln!(out, "## Risk Assessment\n\n{}\n", report.risk_assessment);

    if !report.next_steps.is_empty() {
        let _ = writeln!(out, "## Next Steps\n");
        bullets(&mut out, &report.next_steps);
    }

    sales_overview(&mut out, &output.summary);

    let sources: Vec<&str> = ResearchCategory::ALL
        .into_iter()
        .flat_map(|c| output.research.category(c))
        .filter_map(|s| s.source_url.as_deref())
        .collect();
    if !sources.is_empty() {
        let _ = writeln!(out, "## Research Sources\n");
        for url in sources {
            let _ = writeln!(out, "- <{url}>");
        }
        out.push('\n');
    }

    if !output.warnings.is_empty() {
        let _ = writeln!(out, "## Notes\n");
        bullets(&mut out, &output.warnings);
    }

    out
}
