pub mod tavily;

use crate::domain::research::{IndustryResearch, ResearchCategory, ResearchSnippet};
use crate::error::{kind_of, ErrorKind, PipelineError};
use std::sync::Arc;

/// At most this many products get their own trend query.
pub const MAX_PRODUCT_QUERIES: usize = 5;
/// Snippet text is cut to this many characters.
pub const MAX_SNIPPET_CHARS: usize = 400;

/// One raw result from a search provider. All fields are opaque text.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub title: String,
    pub snippet: String,
    pub url: String,
}

#[async_trait::async_trait]
pub trait SearchClient: Send + Sync {
    fn provider_name(&self) -> &'static str;

    /// A `PipelineError` of kind `ResearchUnavailable` signals that no further query can succeed
    /// (e.g. a rejected credential); any other error only affects this query.
    async fn search(&self, query: &str) -> anyhow::Result<Vec<SearchHit>>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedQuery {
    pub category: ResearchCategory,
    pub query: String,
}

/// Query set for one company: company trends, up to `MAX_PRODUCT_QUERIES` product trends,
/// industry news and competitive landscape.
pub fn plan_queries(company: &str, products: &[String]) -> Vec<PlannedQuery> {
    let mut out = vec![PlannedQuery {
        category: ResearchCategory::CompanyTrends,
        query: format!("{company} latest business performance and growth trends"),
    }];

    let mut seen = Vec::new();
    for product in products {
        let product = product.trim();
        if product.is_empty() || seen.contains(&product) {
            continue;
        }
        if seen.len() == MAX_PRODUCT_QUERIES {
            break;
        }
        seen.push(product);
        out.push(PlannedQuery {
            category: ResearchCategory::ProductTrends,
            query: format!("{company} {product} market trends and consumer demand"),
        });
    }

    out.push(PlannedQuery {
        category: ResearchCategory::IndustryNews,
        query: format!("{company} industry news and market outlook"),
    });
    out.push(PlannedQuery {
        category: ResearchCategory::CompetitiveLandscape,
        query: format!("{company} competitors market share competitive landscape"),
    });
    out
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate_chars(s: String, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", s[..idx].trim_end()),
        None => s,
    }
}

/// Turns a raw hit into a snippet; `None` when it carries no text at all.
pub fn normalize_hit(hit: SearchHit) -> Option<ResearchSnippet> {
    let title = collapse_whitespace(&hit.title);
    let snippet = truncate_chars(collapse_whitespace(&hit.snippet), MAX_SNIPPET_CHARS);
    if title.is_empty() && snippet.is_empty() {
        return None;
    }
    let url = hit.url.trim();
    Some(ResearchSnippet {
        title,
        snippet,
        source_url: (!url.is_empty()).then(|| url.to_string()),
    })
}

/// Research enrichment: fans out the planned queries concurrently and buckets results by the
/// category of the query that produced them.
#[derive(Clone)]
pub struct ResearchClient {
    search: Arc<dyn SearchClient>,
}

impl ResearchClient {
    pub fn new(search: Arc<dyn SearchClient>) -> Self {
        Self { search }
    }

    pub fn provider_name(&self) -> &'static str {
        self.search.provider_name()
    }

    pub async fn search(&self, company: &str, products: &[String]) -> anyhow::Result<IndustryResearch> {
        let company = company.trim();
        if company.is_empty() {
            return Err(PipelineError::research_unavailable("company name is empty").into());
        }

        let planned = plan_queries(company, products);
        let pending = planned.iter().map(|q| self.search.search(&q.query));
        let results = futures::future::join_all(pending).await;

        let mut research = IndustryResearch::empty();
        let mut failures = 0usize;
        let mut last_error: Option<anyhow::Error> = None;

        for (q, result) in planned.iter().zip(results) {
            match result {
                Ok(hits) => {
                    let bucket = research.category_mut(q.category);
                    bucket.extend(hits.into_iter().filter_map(normalize_hit));
                }
                Err(err) => {
                    if kind_of(&err) == Some(ErrorKind::ResearchUnavailable) {
                        return Err(err);
                    }
                    failures += 1;
                    tracing::warn!(
                        provider = self.search.provider_name(),
                        category = ?q.category,
                        query = %q.query,
                        error = %err,
                        "research query failed; leaving results out"
                    );
                    last_error = Some(err);
                }
            }
        }

        if failures == planned.len() {
            let detail = match last_error {
                Some(err) => format!("all {failures} research queries failed; last error: {err:#}"),
                None => "no research queries were issued".to_string(),
            };
            return Err(PipelineError::research_unavailable(detail).into());
        }

        tracing::info!(
            provider = self.search.provider_name(),
            queries = planned.len(),
            failures,
            company_trends = research.company_trends.len(),
            product_trends = research.product_trends.len(),
            industry_news = research.industry_news.len(),
            competitive_landscape = research.competitive_landscape.len(),
            "research enrichment completed"
        );
        Ok(research)
    }
}
