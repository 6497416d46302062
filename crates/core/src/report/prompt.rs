use crate::domain::report::ExecutiveRole;
use crate::domain::research::{IndustryResearch, ResearchCategory};
use crate::domain::sales::{format_usd, GroupStats, SalesSummary};
use crate::llm::StructuredPrompt;
use serde_json::json;
use std::fmt::Write;

pub const REPORT_SCHEMA_NAME: &str = "emit_executive_report";
const REPORT_SCHEMA_DESCRIPTION: &str = "Emit the final executive report as structured JSON";

/// Rows listed per breakdown table; the remainder is summarized in one line.
const MAX_GROUP_ROWS: usize = 25;
/// Snippets listed per research category.
const MAX_SNIPPETS_PER_CATEGORY: usize = 5;

fn write_groups(out: &mut String, ranked: &[(&str, &GroupStats)], share_label: &str) {
    for (name, stats) in ranked.iter().take(MAX_GROUP_ROWS) {
        let _ = writeln!(
            out,
            "- {name}: {} ({:.2}% {share_label}, {} transactions)",
            format_usd(stats.total_sales),
            stats.market_share_percent,
            stats.transaction_count
        );
    }
    if ranked.len() > MAX_GROUP_ROWS {
        let rest: f64 = ranked[MAX_GROUP_ROWS..]
            .iter()
            .map(|(_, s)| s.total_sales)
            .sum();
        let _ = writeln!(
            out,
            "- ... {} more totalling {}",
            ranked.len() - MAX_GROUP_ROWS,
            format_usd(rest)
        );
    }
}

pub fn sales_summary_section(summary: &SalesSummary, company: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Sales Data Summary for {company}:");
    let _ = writeln!(out);
    let _ = writeln!(out, "TOTAL SALES: {}", format_usd(summary.total_sales));
    let _ = writeln!(out, "TRANSACTIONS: {}", summary.transaction_count);
    let _ = writeln!(out);
    let _ = writeln!(out, "PRODUCT PERFORMANCE:");
    write_groups(&mut out, &summary.ranked_products(), "market share");
    let _ = writeln!(out);
    let _ = writeln!(out, "REGIONAL PERFORMANCE:");
    write_groups(&mut out, &summary.ranked_regions(), "of total");
    let _ = writeln!(out);
    let _ = writeln!(out, "KEY INSIGHTS:");
    for insight in &summary.key_insights {
        let _ = writeln!(out, "- {insight}");
    }
    out
}

/// Only non-empty categories are included.
pub fn research_section(research: &IndustryResearch, company: &str) -> String {
    if research.is_empty() {
        return format!(
            "INDUSTRY RESEARCH:\nNo external industry research is available for {company}. \
             Base the analysis on the sales data only and do not invent market facts.\n"
        );
    }

    let mut out = String::new();
    let _ = writeln!(out, "Industry Research for {company}:");
    for category in ResearchCategory::ALL {
        let snippets = research.category(category);
        if snippets.is_empty() {
            continue;
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "{}:", category.heading());
        for s in snippets.iter().take(MAX_SNIPPETS_PER_CATEGORY) {
            match (s.title.is_empty(), s.snippet.is_empty()) {
                (false, false) => {
                    let _ = write!(out, "- {}: {}", s.title, s.snippet);
                }
                (true, _) => {
                    let _ = write!(out, "- {}", s.snippet);
                }
                (false, true) => {
                    let _ = write!(out, "- {}", s.title);
                }
            }
            if let Some(url) = &s.source_url {
                let _ = write!(out, " (source: {url})");
            }
            out.push('\n');
        }
    }
    out
}

pub fn system_prompt(role: ExecutiveRole) -> String {
    format!(
        "You are an expert business analyst creating an executive briefing for a {focus}.\n\
\n\
Your task is to analyze sales data and industry research to provide:\n\
1. A concise executive summary (2-3 paragraphs)\n\
2. Key findings (3-5 items)\n\
3. Strategic recommendations with category, priority, timeline, and expected impact\n\
4. Risk assessment\n\
5. Next steps\n\
\n\
Tailor your analysis and recommendations specifically for the {label} perspective.\n\
Be data-driven, actionable, and strategic. Only cite figures present in the provided data.\n\
\n\
Return ONLY a JSON object matching this schema. No markdown, no prose outside the JSON.\n\
{{\n\
  \"executive_summary\": \"string\",\n\
  \"key_findings\": [\"string\"],\n\
  \"strategic_recommendations\": [\n\
    {{\n\
      \"category\": \"Strategic | Operational | Financial | Marketing\",\n\
      \"priority\": \"High | Medium | Low\",\n\
      \"timeline\": \"Immediate | Short-term | Long-term\",\n\
      \"expected_impact\": \"string\",\n\
      \"recommendation\": \"string\"\n\
    }}\n\
  ],\n\
  \"risk_assessment\": \"string\",\n\
  \"next_steps\": [\"string\"]\n\
}}",
        focus = role.focus(),
        label = role.label(),
    )
}

pub fn user_prompt(company: &str, data_summary: &str, research_summary: &str) -> String {
    format!(
        "Please analyze the following information for {company} and create a comprehensive executive briefing:\n\n\
{data_summary}\n\
{research_summary}\n\
Based on this sales data and industry research, provide strategic insights and actionable \
recommendations tailored for the executive role specified in the system prompt."
    )
}

pub fn report_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "additionalProperties": false,
        "required": [
            "executive_summary",
            "key_findings",
            "strategic_recommendations",
            "risk_assessment",
            "next_steps"
        ],
        "properties": {
            "executive_summary": {"type": "string"},
            "key_findings": {"type": "array", "minItems": 1, "items": {"type": "string"}},
            "strategic_recommendations": {
                "type": "array",
                "minItems": 1,
                "items": {
                    "type": "object",
                    "additionalProperties": false,
                    "required": ["category", "priority", "timeline", "expected_impact", "recommendation"],
                    "properties": {
                        "category": {"type": "string"},
                        "priority": {"type": "string", "enum": ["High", "Medium", "Low"]},
                        "timeline": {"type": "string"},
                        "expected_impact": {"type": "string"},
                        "recommendation": {"type": "string"}
                    }
                }
            },
            "risk_assessment": {"type": "string"},
            "next_steps": {"type": "array", "items": {"type": "string"}}
        }
    })
}

pub fn build_prompt(
    company: &str,
    role: ExecutiveRole,
    summary: &SalesSummary,
    research: &IndustryResearch,
) -> StructuredPrompt {
    let data = sales_summary_section(summary, company);
    let research = research_section(research, company);
    StructuredPrompt {
        system: system_prompt(role),
        user: user_prompt(company, &data, &research),
        schema_name: REPORT_SCHEMA_NAME,
        schema_description: REPORT_SCHEMA_DESCRIPTION,
        schema: report_schema(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::research::ResearchSnippet;
    use crate::ingest::SalesAggregator;

    fn summary() -> SalesSummary {
        SalesAggregator::default()
            .process("product,region,sales\niPhone,NA,1500000\nMacBook,EU,800000\niPad,Asia,600000\n")
            .unwrap()
    }

    fn snippet(title: &str) -> ResearchSnippet {
        ResearchSnippet {
            title: title.to_string(),
            snippet: "details".to_string(),
            source_url: Some("https://example.com".to_string()),
        }
    }

    #[test]
    fn sales_section_lists_ranked_groups_and_insights() {
        let text = sales_summary_section(&summary(), "Apple Inc.");
        assert!(text.contains("TOTAL SALES: $2,900,000.00"));
        let iphone = text.find("- iPhone: $1,500,000.00 (51.72% market share").unwrap();
        let ipad = text.find("- iPad:").unwrap();
        assert!(iphone < ipad);
        assert!(text.contains("KEY INSIGHTS:\n- Top performing product: iPhone"));
    }

    #[test]
    fn research_section_skips_empty_categories() {
        let research = IndustryResearch {
            industry_news: vec![snippet("Chip supply eases")],
            ..IndustryResearch::default()
        };
        let text = research_section(&research, "Apple Inc.");
        assert!(text.contains("INDUSTRY NEWS:\n- Chip supply eases: details (source: https://example.com)"));
        assert!(!text.contains("COMPANY TRENDS"));
        assert!(!text.contains("COMPETITIVE LANDSCAPE"));
    }

    #[test]
    fn research_section_caps_snippets() {
        let research = IndustryResearch {
            company_trends: (0..12).map(|i| snippet(&format!("t{i}"))).collect(),
            ..IndustryResearch::default()
        };
        let text = research_section(&research, "Apple Inc.");
        assert_eq!(text.matches("- t").count(), MAX_SNIPPETS_PER_CATEGORY);
    }

    #[test]
    fn empty_research_says_so() {
        let text = research_section(&IndustryResearch::empty(), "Apple Inc.");
        assert!(text.contains("No external industry research is available"));
    }

    #[test]
    fn prompt_is_deterministic_and_role_specific() {
        let s = summary();
        let r = IndustryResearch::empty();
        let a = build_prompt("Apple Inc.", ExecutiveRole::Cfo, &s, &r);
        let b = build_prompt("Apple Inc.", ExecutiveRole::Cfo, &s, &r);
        assert_eq!(a.system, b.system);
        assert_eq!(a.user, b.user);
        assert!(a.system.contains("chief financial officer"));
        assert!(a.system.contains("CFO perspective"));
        assert!(a.user.contains("for Apple Inc."));
        assert_eq!(a.schema["required"][0], "executive_summary");
    }
}
