use crate::config::Settings;
use crate::domain::report::{ExecutiveReport, ExecutiveRole};
use crate::domain::research::IndustryResearch;
use crate::domain::sales::SalesSummary;
use crate::ingest::SalesAggregator;
use crate::report::ReportSynthesizer;
use crate::research::tavily::TavilyClient;
use crate::research::ResearchClient;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

const DEFAULT_RESEARCH_TIMEOUT: Duration = Duration::from_secs(20);

/// Everything produced for one request. Only built once every stage has finished.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutput {
    pub report_id: Uuid,
    pub company: String,
    pub role: ExecutiveRole,
    pub generated_at: DateTime<Utc>,
    pub summary: SalesSummary,
    pub research: IndustryResearch,
    pub report: ExecutiveReport,
    /// Non-fatal problems, e.g. research that had to be skipped.
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub skip_research: bool,
}

/// Aggregation, then best-effort enrichment, then synthesis. Holds no request data between runs.
#[derive(Clone)]
pub struct ReportPipeline {
    company: String,
    aggregator: SalesAggregator,
    research: Option<ResearchClient>,
    research_timeout: Duration,
    synthesizer: ReportSynthesizer,
}

impl ReportPipeline {
    pub fn new(company: impl Into<String>, synthesizer: ReportSynthesizer) -> Self {
        Self {
            company: company.into(),
            aggregator: SalesAggregator::default(),
            research: None,
            research_timeout: DEFAULT_RESEARCH_TIMEOUT,
            synthesizer,
        }
    }

    /// Requires a model credential. Research is wired only when a Tavily key is configured.
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let synthesizer = ReportSynthesizer::from_settings(settings)?;
        let mut pipeline = Self::new(settings.company_name.clone(), synthesizer)
            .with_research_timeout(settings.search_timeout);

        if settings.tavily_api_key.is_some() {
            let tavily = TavilyClient::from_settings(settings)?;
            pipeline = pipeline.with_research(ResearchClient::new(Arc::new(tavily)));
        } else {
            tracing::warn!("TAVILY_API_KEY not set; industry research will be skipped");
        }
        Ok(pipeline)
    }

    pub fn with_research(mut self, research: ResearchClient) -> Self {
        self.research = Some(research);
        self
    }

    pub fn with_research_timeout(mut self, timeout: Duration) -> Self {
        self.research_timeout = timeout;
        self
    }

    pub fn with_aggregator(mut self, aggregator: SalesAggregator) -> Self {
        self.aggregator = aggregator;
        self
    }

    pub fn company(&self) -> &str {
        &self.company
    }

    pub fn has_research(&self) -> bool {
        self.research.is_some()
    }

    /// Never fails: any enrichment problem becomes the empty bundle plus a warning.
    pub async fn enrich(&self, summary: &SalesSummary) -> (IndustryResearch, Option<String>) {
        let Some(research) = &self.research else {
            return (
                IndustryResearch::empty(),
                Some("Industry research skipped: no search provider configured".to_string()),
            );
        };

        let products = summary.product_names();
        let outcome =
            tokio::time::timeout(self.research_timeout, research.search(&self.company, &products))
                .await;

        let err = match outcome {
            Ok(Ok(found)) => return (found, None),
            Ok(Err(err)) => format!("{err:#}"),
            Err(_) => format!("timed out after {:?}", self.research_timeout),
        };

        tracing::warn!(
            provider = research.provider_name(),
            error = %err,
            "industry research unavailable; continuing with sales data only"
        );
        (
            IndustryResearch::empty(),
            Some(format!(
                "Industry research unavailable ({err}); continuing with sales data only"
            )),
        )
    }

    pub async fn run(
        &self,
        raw_table: &str,
        role: ExecutiveRole,
        opts: RunOptions,
    ) -> anyhow::Result<PipelineOutput> {
        let report_id = Uuid::new_v4();
        tracing::info!(%report_id, %role, company = %self.company, "report run started");

        let summary = self.aggregator.process(raw_table)?;

        let mut warnings = Vec::new();
        let research = if opts.skip_research {
            warnings.push("Industry research skipped at caller request".to_string());
            IndustryResearch::empty()
        } else {
            let (research, warning) = self.enrich(&summary).await;
            warnings.extend(warning);
            research
        };

        let report = self
            .synthesizer
            .generate(&self.company, role, &summary, &research)
            .await?;

        tracing::info!(
            %report_id,
            %role,
            research_snippets = research.len(),
            warnings = warnings.len(),
            "report run completed"
        );

        Ok(PipelineOutput {
            report_id,
            company: self.company.clone(),
            role,
            generated_at: Utc::now(),
            summary,
            research,
            report,
            warnings,
        })
    }
}
