pub mod prompt;

use crate::config::Settings;
use crate::domain::report::{ExecutiveReport, ExecutiveRole};
use crate::domain::research::IndustryResearch;
use crate::domain::sales::SalesSummary;
use crate::error::PipelineError;
use crate::llm::error::is_transient;
use crate::llm::{json, LlmClient, StructuredPrompt};
use std::sync::Arc;
use std::time::Duration;

/// One initial attempt plus one retry on transient transport failure.
const MAX_ATTEMPTS: u32 = 2;
const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// Turns a summary plus research into an `ExecutiveReport` via one model call.
#[derive(Clone)]
pub struct ReportSynthesizer {
    llm: Arc<dyn LlmClient>,
    attempt_timeout: Option<Duration>,
    retry_backoff: Duration,
}

impl ReportSynthesizer {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self {
            llm,
            attempt_timeout: None,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
        }
    }

    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let llm = crate::llm::client_from_settings(settings)?;
        Ok(Self::new(llm).with_attempt_timeout(settings.llm_timeout))
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = Some(timeout);
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    pub async fn generate(
        &self,
        company: &str,
        role: ExecutiveRole,
        summary: &SalesSummary,
        research: &IndustryResearch,
    ) -> anyhow::Result<ExecutiveReport> {
        let prompt = prompt::build_prompt(company, role, summary, research);
        let text = self.call_with_retry(&prompt).await?;

        let report = json::parse_report(&text).inspect_err(|err| {
            tracing::error!(
                provider = ?self.llm.provider(),
                %role,
                error = %err,
                response_chars = text.len(),
                "model output rejected"
            );
        })?;

        tracing::info!(
            provider = ?self.llm.provider(),
            %role,
            findings = report.key_findings.len(),
            recommendations = report.strategic_recommendations.len(),
            "executive report synthesized"
        );
        Ok(report)
    }

    async fn call_once(&self, prompt: &StructuredPrompt) -> (anyhow::Result<String>, bool) {
        match self.attempt_timeout {
            Some(limit) => {
                match tokio::time::timeout(limit, self.llm.generate_structured(prompt)).await {
                    Ok(res) => (res, false),
                    Err(_) => (
                        Err(anyhow::anyhow!("model call timed out after {limit:?}")),
                        true,
                    ),
                }
            }
            None => (self.llm.generate_structured(prompt).await, false),
        }
    }

    async fn call_with_retry(&self, prompt: &StructuredPrompt) -> anyhow::Result<String> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let (res, timed_out) = self.call_once(prompt).await;
            let err = match res {
                Ok(text) => return Ok(text),
                Err(err) => err,
            };

            let transient = timed_out || is_transient(&err);
            if !transient || attempt >= MAX_ATTEMPTS {
                return Err(PipelineError::synthesis_unavailable(format!(
                    "{:?} call failed after {attempt} attempt(s): {err:#}",
                    self.llm.provider()
                ))
                .into());
            }

            tracing::warn!(
                attempt,
                backoff = ?self.retry_backoff,
                provider = ?self.llm.provider(),
                error = %err,
                "model call failed with a transient error; retrying"
            );
            tokio::time::sleep(self.retry_backoff).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{kind_of, ErrorKind};
    use crate::ingest::SalesAggregator;
    use crate::llm::error::LlmDiagnosticsError;
    use crate::llm::Provider;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    enum Step {
        Reply(String),
        Unavailable,
        BadRequest,
        Hang,
    }

    struct ScriptedLlm {
        steps: Mutex<Vec<Step>>,
        calls: AtomicU32,
        last_prompt: Mutex<Option<StructuredPrompt>>,
    }

    impl ScriptedLlm {
        fn new(mut steps: Vec<Step>) -> Arc<Self> {
            steps.reverse();
            Arc::new(Self {
                steps: Mutex::new(steps),
                calls: AtomicU32::new(0),
                last_prompt: Mutex::new(None),
            })
        }
    }

    #[async_trait::async_trait]
    impl LlmClient for ScriptedLlm {
        fn provider(&self) -> Provider {
            Provider::Anthropic
        }

        async fn generate_structured(&self, prompt: &StructuredPrompt) -> anyhow::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_prompt.lock().unwrap() = Some(prompt.clone());
            let step = self.steps.lock().unwrap().pop().expect("unexpected model call");
            match step {
                Step::Reply(text) => Ok(text),
                Step::Unavailable => Err(LlmDiagnosticsError::http(
                    Provider::Anthropic,
                    reqwest::StatusCode::SERVICE_UNAVAILABLE,
                    "overloaded".to_string(),
                )
                .into()),
                Step::BadRequest => Err(LlmDiagnosticsError::http(
                    Provider::Anthropic,
                    reqwest::StatusCode::BAD_REQUEST,
                    "bad".to_string(),
                )
                .into()),
                Step::Hang => {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Ok(String::new())
                }
            }
        }
    }

    fn good_reply() -> String {
        json!({
            "executive_summary": "iPhone drives the quarter.",
            "key_findings": ["iPhone is 51.7% of sales"],
            "strategic_recommendations": [{
                "category": "Strategic",
                "priority": "High",
                "timeline": "Short-term",
                "expected_impact": "Reduced concentration",
                "recommendation": "Grow Mac and iPad share"
            }],
            "risk_assessment": "High product concentration.",
            "next_steps": ["Set diversification targets"]
        })
        .to_string()
    }

    fn summary() -> SalesSummary {
        SalesAggregator::default()
            .process("product,region,sales\niPhone,NA,1500000\nMacBook,EU,800000\niPad,Asia,600000\n")
            .unwrap()
    }

    fn synth(llm: Arc<ScriptedLlm>) -> ReportSynthesizer {
        ReportSynthesizer::new(llm).with_retry_backoff(Duration::from_millis(1))
    }

    async fn run(synth: &ReportSynthesizer) -> anyhow::Result<ExecutiveReport> {
        synth
            .generate("Apple Inc.", ExecutiveRole::Ceo, &summary(), &IndustryResearch::empty())
            .await
    }

    #[tokio::test]
    async fn generates_report_in_one_call() {
        let llm = ScriptedLlm::new(vec![Step::Reply(good_reply())]);
        let report = run(&synth(llm.clone())).await.unwrap();
        assert_eq!(report.executive_summary, "iPhone drives the quarter.");
        assert_eq!(llm.calls.load(Ordering::SeqCst), 1);

        let prompt = llm.last_prompt.lock().unwrap().clone().unwrap();
        assert!(prompt.system.contains("chief executive officer"));
        assert!(prompt.user.contains("TOTAL SALES: $2,900,000.00"));
        assert_eq!(prompt.schema_name, prompt::REPORT_SCHEMA_NAME);
    }

    #[tokio::test]
    async fn retries_once_on_transient_failure() {
        let llm = ScriptedLlm::new(vec![Step::Unavailable, Step::Reply(good_reply())]);
        assert!(run(&synth(llm.clone())).await.is_ok());
        assert_eq!(llm.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn gives_up_after_second_transient_failure() {
        let llm = ScriptedLlm::new(vec![Step::Unavailable, Step::Unavailable]);
        let err = run(&synth(llm.clone())).await.unwrap_err();
        assert_eq!(kind_of(&err), Some(ErrorKind::SynthesisUnavailable));
        assert_eq!(llm.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn does_not_retry_client_errors() {
        let llm = ScriptedLlm::new(vec![Step::BadRequest]);
        let err = run(&synth(llm.clone())).await.unwrap_err();
        assert_eq!(kind_of(&err), Some(ErrorKind::SynthesisUnavailable));
        assert_eq!(llm.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn does_not_retry_invalid_output() {
        let mut reply: serde_json::Value = serde_json::from_str(&good_reply()).unwrap();
        reply["executive_summary"] = json!("");
        let llm = ScriptedLlm::new(vec![Step::Reply(reply.to_string())]);
        let err = run(&synth(llm.clone())).await.unwrap_err();
        assert_eq!(kind_of(&err), Some(ErrorKind::SynthesisValidation));
        assert_eq!(llm.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_summary_never_yields_a_report() {
        let mut reply: serde_json::Value = serde_json::from_str(&good_reply()).unwrap();
        reply.as_object_mut().unwrap().remove("executive_summary");
        let llm = ScriptedLlm::new(vec![Step::Reply(reply.to_string())]);
        let err = run(&synth(llm)).await.unwrap_err();
        assert_eq!(kind_of(&err), Some(ErrorKind::SynthesisParse));
    }

    #[tokio::test(start_paused = true)]
    async fn timed_out_attempt_is_retried() {
        let llm = ScriptedLlm::new(vec![Step::Hang, Step::Reply(good_reply())]);
        let synth = synth(llm.clone()).with_attempt_timeout(Duration::from_secs(5));
        assert!(run(&synth).await.is_ok());
        assert_eq!(llm.calls.load(Ordering::SeqCst), 2);
    }
}
