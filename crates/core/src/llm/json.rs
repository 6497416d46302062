use crate::domain::contract::LlmExecutiveReport;
use crate::domain::report::ExecutiveReport;
use crate::error::PipelineError;
use crate::llm::sections;

pub fn extract_json(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.starts_with("```") {
        // Remove Markdown fences (```json ... ``` or ``` ... ```).
        let mut inner = trimmed;
        if let Some(after_first) = inner.splitn(2, '\n').nth(1) {
            inner = after_first;
        }
        if let Some(end) = inner.rfind("```") {
            inner = &inner[..end];
        }
        return Some(inner.trim().to_string());
    }

    // Best-effort extraction: first '{' to last '}'.
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(trimmed[start..=end].trim().to_string())
}

/// Maps model output onto the report. JSON is expected; the sectioned plain-text layout
/// (`EXECUTIVE SUMMARY:` ...) is accepted as a fallback.
pub fn parse_report(text: &str) -> anyhow::Result<ExecutiveReport> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(PipelineError::synthesis_parse("model returned an empty response").into());
    }

    let looks_like_json = trimmed.starts_with('{') || trimmed.starts_with("```");
    let raw = match (looks_like_json, sections::parse_sections(trimmed)) {
        (false, Some(from_sections)) => from_sections,
        _ => {
            let json_str = extract_json(trimmed).ok_or_else(|| {
                PipelineError::synthesis_parse(
                    "model output is neither JSON nor the sectioned report format",
                )
            })?;
            serde_json::from_str::<LlmExecutiveReport>(&json_str).map_err(|e| {
                PipelineError::synthesis_parse(format!(
                    "model output is not valid JSON for the report schema: {e}"
                ))
            })?
        }
    };

    raw.validate_and_into_report()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{kind_of, ErrorKind};
    use serde_json::json;

    fn valid_report_json() -> String {
        json!({
            "executive_summary": "Revenue is concentrated in iPhone.",
            "key_findings": ["iPhone is 52% of sales"],
            "strategic_recommendations": [{
                "category": "Financial",
                "priority": "Medium",
                "timeline": "Long-term",
                "expected_impact": "More resilient revenue mix",
                "recommendation": "Grow services attach rate"
            }],
            "risk_assessment": "",
            "next_steps": []
        })
        .to_string()
    }

    #[test]
    fn extract_json_handles_fenced_blocks() {
        let body = "{\"a\":1}";
        let fenced = format!("```json\n{body}\n```\n");
        assert_eq!(extract_json(&fenced), Some(body.to_string()));
    }

    #[test]
    fn extract_json_falls_back_to_braces() {
        let s = "prefix {\"a\":1} suffix";
        assert_eq!(extract_json(s), Some("{\"a\":1}".to_string()));
    }

    #[test]
    fn parse_report_accepts_valid_json() {
        let report = parse_report(&valid_report_json()).unwrap();
        assert_eq!(report.key_findings.len(), 1);
        assert_eq!(report.strategic_recommendations[0].category, "Financial");
    }

    #[test]
    fn parse_report_accepts_fenced_json() {
        let fenced = format!("```json\n{}\n```", valid_report_json());
        assert!(parse_report(&fenced).is_ok());
    }

    #[test]
    fn parse_report_rejects_garbage() {
        for text in ["", "I cannot help with that.", "{not json}"] {
            let err = parse_report(text).unwrap_err();
            assert_eq!(kind_of(&err), Some(ErrorKind::SynthesisParse), "input={text:?}");
        }
    }

    #[test]
    fn parse_report_rejects_wrong_types() {
        let text = json!({
            "executive_summary": "ok",
            "key_findings": "should be a list",
            "strategic_recommendations": []
        })
        .to_string();
        let err = parse_report(&text).unwrap_err();
        assert_eq!(kind_of(&err), Some(ErrorKind::SynthesisParse));
    }
}
