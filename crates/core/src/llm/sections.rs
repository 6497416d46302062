//! Parser for the plain-text report layout some models fall back to:
//!
//! ```text
//! EXECUTIVE SUMMARY:
//! ...
//! KEY FINDINGS:
//! • ...
//! STRATEGIC RECOMMENDATIONS:
//! Expand services bundles
//! Category: Strategic
//! Priority: High
//! Timeline: Short-term
//! Expected Impact: ...
//! RISK ASSESSMENT:
//! ...
//! NEXT STEPS:
//! • ...
//! ```

use crate::domain::contract::{LlmExecutiveReport, LlmRecommendation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Summary,
    Findings,
    Recommendations,
    Risk,
    Steps,
}

const HEADINGS: [(&str, Section); 5] = [
    ("EXECUTIVE SUMMARY", Section::Summary),
    ("KEY FINDINGS", Section::Findings),
    ("STRATEGIC RECOMMENDATIONS", Section::Recommendations),
    ("RISK ASSESSMENT", Section::Risk),
    ("NEXT STEPS", Section::Steps),
];

/// Strips markdown decoration (`#`, `*`) around a line.
fn undecorate(line: &str) -> &str {
    line.trim()
        .trim_start_matches('#')
        .trim()
        .trim_matches('*')
        .trim()
}

/// Returns the section and any text following the heading on the same line.
fn heading(line: &str) -> Option<(Section, &str)> {
    let line = undecorate(line);
    for (name, section) in HEADINGS {
        let Some(prefix) = line.get(..name.len()) else {
            continue;
        };
        if prefix.eq_ignore_ascii_case(name) {
            let rest = &line[name.len()..];
            if let Some(rest) = rest.strip_prefix(':').or(rest.is_empty().then_some("")) {
                return Some((section, undecorate(rest)));
            }
        }
    }
    None
}

fn bullet(line: &str) -> Option<&str> {
    let line = line.trim();
    for marker in ["•", "-", "*"] {
        if let Some(rest) = line.strip_prefix(marker) {
            return Some(rest.trim());
        }
    }
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        if let Some(rest) = line[digits..].strip_prefix('.').or(line[digits..].strip_prefix(')')) {
            return Some(rest.trim());
        }
    }
    None
}

fn field<'a>(line: &'a str, name: &str) -> Option<&'a str> {
    let line = undecorate(bullet(line).unwrap_or(line));
    let (key, value) = line.split_once(':')?;
    key.trim_matches('*')
        .trim()
        .eq_ignore_ascii_case(name)
        .then(|| value.trim().trim_matches(|c: char| matches!(c, '*' | '[' | ']')).trim())
}

/// Recommendation title line, with `[Recommendation 1]` / `1.` / `Recommendation 1:` wrappers removed.
fn recommendation_title(line: &str) -> &str {
    let line = undecorate(bullet(line).unwrap_or(line));
    let line = line.trim_start_matches('[').trim_end_matches(']').trim();
    if let Some(rest) = line.strip_prefix("Recommendation") {
        let rest = rest.trim_start_matches(|c: char| c.is_ascii_digit() || c == ' ');
        return rest.trim_start_matches(':').trim();
    }
    line
}

fn last_or_new(recs: &mut Vec<LlmRecommendation>) -> &mut LlmRecommendation {
    if recs.is_empty() {
        recs.push(LlmRecommendation::default());
    }
    let last = recs.len() - 1;
    &mut recs[last]
}

fn push_paragraph(buf: &mut Option<String>, text: &str) {
    if text.is_empty() {
        return;
    }
    let out = buf.get_or_insert_with(String::new);
    if !out.is_empty() {
        out.push(' ');
    }
    out.push_str(text);
}

pub fn parse_sections(text: &str) -> Option<LlmExecutiveReport> {
    let mut current: Option<Section> = None;
    let mut saw_heading = false;

    let mut summary: Option<String> = None;
    let mut findings: Option<Vec<String>> = None;
    let mut recommendations: Option<Vec<LlmRecommendation>> = None;
    let mut risk: Option<String> = None;
    let mut steps: Option<Vec<String>> = None;

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        if let Some((section, rest)) = heading(line) {
            saw_heading = true;
            current = Some(section);
            match section {
                Section::Summary => push_paragraph(&mut summary, rest),
                Section::Findings => {
                    findings.get_or_insert_with(Vec::new);
                }
                Section::Recommendations => {
                    recommendations.get_or_insert_with(Vec::new);
                }
                Section::Risk => push_paragraph(&mut risk, rest),
                Section::Steps => {
                    steps.get_or_insert_with(Vec::new);
                }
            }
            continue;
        }

        match current {
            None => {}
            Some(Section::Summary) => push_paragraph(&mut summary, line),
            Some(Section::Risk) => push_paragraph(&mut risk, line),
            Some(Section::Findings) => {
                if let Some(item) = bullet(line) {
                    findings.get_or_insert_with(Vec::new).push(item.to_string());
                }
            }
            Some(Section::Steps) => {
                if let Some(item) = bullet(line) {
                    steps.get_or_insert_with(Vec::new).push(item.to_string());
                }
            }
            Some(Section::Recommendations) => {
                let recs = recommendations.get_or_insert_with(Vec::new);
                if let Some(v) = field(line, "Category") {
                    last_or_new(recs).category = Some(v.to_string());
                } else if let Some(v) = field(line, "Priority") {
                    last_or_new(recs).priority = Some(v.to_string());
                } else if let Some(v) = field(line, "Timeline") {
                    last_or_new(recs).timeline = Some(v.to_string());
                } else if let Some(v) = field(line, "Expected Impact") {
                    last_or_new(recs).expected_impact = Some(v.to_string());
                } else if let Some(v) = field(line, "Recommendation") {
                    last_or_new(recs).recommendation = Some(v.to_string());
                } else {
                    let title = recommendation_title(line);
                    if title.is_empty() {
                        // Bare "[Recommendation 2]" marker: the text follows on later lines.
                        recs.push(LlmRecommendation::default());
                    } else {
                        let fill_last = recs
                            .last()
                            .is_some_and(|r| r.recommendation.is_none() && r.category.is_none());
                        if fill_last {
                            last_or_new(recs).recommendation = Some(title.to_string());
                        } else {
                            recs.push(LlmRecommendation {
                                recommendation: Some(title.to_string()),
                                ..LlmRecommendation::default()
                            });
                        }
                    }
                }
            }
        }
    }

    if !saw_heading {
        return None;
    }

    Some(LlmExecutiveReport {
        executive_summary: summary,
        key_findings: findings,
        strategic_recommendations: recommendations,
        risk_assessment: risk,
        next_steps: steps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::report::Priority;
    use crate::error::{kind_of, ErrorKind};

    const SAMPLE: &str = "\
EXECUTIVE SUMMARY:
Apple's sales are led by iPhone.
North America remains the largest region.

KEY FINDINGS:
• iPhone represents 51.7% of sales
• Three regions contribute revenue

STRATEGIC RECOMMENDATIONS:
[Recommendation 1]
Diversify revenue toward services
Category: Strategic
Priority: High
Timeline: Short-term
Expected Impact: Lower dependence on a single product

2. Expand iPad education bundles in Asia
Category: Marketing
Priority: Medium
Timeline: Long-term
Expected Impact: Regional growth

RISK ASSESSMENT:
Product concentration is the main exposure.

NEXT STEPS:
• Review services pricing
• Brief regional leads
";

    #[test]
    fn parses_full_sectioned_report() {
        let raw = parse_sections(SAMPLE).unwrap();
        let report = raw.validate_and_into_report().unwrap();
        assert_eq!(
            report.executive_summary,
            "Apple's sales are led by iPhone. North America remains the largest region."
        );
        assert_eq!(report.key_findings.len(), 2);
        assert_eq!(report.strategic_recommendations.len(), 2);
        assert_eq!(
            report.strategic_recommendations[0].recommendation,
            "Diversify revenue toward services"
        );
        assert_eq!(report.strategic_recommendations[1].priority, Priority::Medium);
        assert_eq!(
            report.strategic_recommendations[1].recommendation,
            "Expand iPad education bundles in Asia"
        );
        assert_eq!(report.risk_assessment, "Product concentration is the main exposure.");
        assert_eq!(report.next_steps, vec!["Review services pricing", "Brief regional leads"]);
    }

    #[test]
    fn accepts_markdown_headings() {
        let text = "## EXECUTIVE SUMMARY: Strong quarter.\n**KEY FINDINGS:**\n- Growth\n";
        let raw = parse_sections(text).unwrap();
        assert_eq!(raw.executive_summary.as_deref(), Some("Strong quarter."));
        assert_eq!(raw.key_findings, Some(vec!["Growth".to_string()]));
    }

    #[test]
    fn accepts_title_case_headings_and_bracketed_fields() {
        let text = "\
Executive Summary:
Services offset hardware softness.

Key Findings:
- Services grew fastest

Strategic Recommendations:
[Recommendation 1]
Bundle services with new devices
Category: [Marketing]
Priority: [High]
Timeline: [Short-term]
Expected Impact: [Higher attach rate]

Risk Assessment:
Hardware cycles remain uneven.

Next Steps:
- Price the bundle
";
        let report = parse_sections(text)
            .unwrap()
            .validate_and_into_report()
            .unwrap();
        assert_eq!(report.executive_summary, "Services offset hardware softness.");
        let rec = &report.strategic_recommendations[0];
        assert_eq!(rec.recommendation, "Bundle services with new devices");
        assert_eq!(rec.priority, Priority::High);
        assert_eq!(rec.category, "Marketing");
        assert_eq!(rec.expected_impact, "Higher attach rate");
        assert_eq!(report.next_steps, vec!["Price the bundle"]);
    }

    #[test]
    fn incomplete_recommendation_is_not_dropped() {
        let text = "EXECUTIVE SUMMARY:\nok\nKEY FINDINGS:\n• a\nSTRATEGIC RECOMMENDATIONS:\nDo a thing\nPriority: High\n";
        let err = parse_sections(text)
            .unwrap()
            .validate_and_into_report()
            .unwrap_err();
        assert_eq!(kind_of(&err), Some(ErrorKind::SynthesisParse));
    }

    #[test]
    fn missing_summary_section_fails() {
        let text = "KEY FINDINGS:\n• a\n";
        let err = parse_sections(text)
            .unwrap()
            .validate_and_into_report()
            .unwrap_err();
        assert_eq!(kind_of(&err), Some(ErrorKind::SynthesisParse));
    }

    #[test]
    fn plain_prose_is_not_a_sectioned_report() {
        assert!(parse_sections("Sorry, I can't do that.").is_none());
    }
}
