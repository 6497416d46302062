use crate::domain::report::{ExecutiveReport, Priority, Recommendation};
use crate::error::PipelineError;
use serde::{Deserialize, Serialize};

/// Report as emitted by the model. Every field is optional here so that absence is reported as a
/// parse error naming the field instead of a generic serde message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmExecutiveReport {
    pub executive_summary: Option<String>,
    pub key_findings: Option<Vec<String>>,
    pub strategic_recommendations: Option<Vec<LlmRecommendation>>,
    #[serde(default)]
    pub risk_assessment: Option<String>,
    #[serde(default)]
    pub next_steps: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmRecommendation {
    pub category: Option<String>,
    pub priority: Option<String>,
    pub timeline: Option<String>,
    pub expected_impact: Option<String>,
    pub recommendation: Option<String>,
}

fn parse_err(detail: String) -> anyhow::Error {
    PipelineError::synthesis_parse(detail).into()
}

fn validation_err(detail: String) -> anyhow::Error {
    PipelineError::synthesis_validation(detail).into()
}

fn trimmed_lines(lines: Vec<String>) -> Vec<String> {
    lines
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl LlmExecutiveReport {
    pub fn validate_and_into_report(self) -> anyhow::Result<ExecutiveReport> {
        let executive_summary = self
            .executive_summary
            .ok_or_else(|| parse_err("missing required field executive_summary".to_string()))?;
        let key_findings = self
            .key_findings
            .ok_or_else(|| parse_err("missing required field key_findings".to_string()))?;
        let raw_recommendations = self.strategic_recommendations.ok_or_else(|| {
            parse_err("missing required field strategic_recommendations".to_string())
        })?;

        let mut recommendations = Vec::with_capacity(raw_recommendations.len());
        for (idx, rec) in raw_recommendations.into_iter().enumerate() {
            recommendations.push(rec.validate_and_into_recommendation(idx + 1)?);
        }

        let executive_summary = executive_summary.trim().to_string();
        if executive_summary.is_empty() {
            return Err(validation_err("executive_summary must be non-empty".to_string()));
        }

        let key_findings = trimmed_lines(key_findings);
        if key_findings.is_empty() {
            return Err(validation_err(
                "key_findings must contain at least one entry".to_string(),
            ));
        }

        if recommendations.is_empty() {
            return Err(validation_err(
                "strategic_recommendations must contain at least one entry".to_string(),
            ));
        }

        Ok(ExecutiveReport {
            executive_summary,
            key_findings,
            strategic_recommendations: recommendations,
            risk_assessment: self
                .risk_assessment
                .map(|s| s.trim().to_string())
                .unwrap_or_default(),
            next_steps: trimmed_lines(self.next_steps.unwrap_or_default()),
        })
    }
}

impl LlmRecommendation {
    fn validate_and_into_recommendation(self, position: usize) -> anyhow::Result<Recommendation> {
        let field = |value: Option<String>, name: &str| -> anyhow::Result<String> {
            let value = value.ok_or_else(|| {
                parse_err(format!("recommendation #{position} is missing field {name}"))
            })?;
            let value = value.trim().to_string();
            if value.is_empty() {
                return Err(validation_err(format!(
                    "recommendation #{position} has an empty {name}"
                )));
            }
            Ok(value)
        };

        let recommendation = field(self.recommendation, "recommendation")?;
        let category = field(self.category, "category")?;
        let timeline = field(self.timeline, "timeline")?;
        let expected_impact = field(self.expected_impact, "expected_impact")?;
        let priority = field(self.priority, "priority")?
            .parse::<Priority>()
            .map_err(|e| parse_err(format!("recommendation #{position}: {e}")))?;

        Ok(Recommendation {
            category,
            priority,
            timeline,
            expected_impact,
            recommendation,
        })
    }
}
