use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResearchCategory {
    CompanyTrends,
    ProductTrends,
    IndustryNews,
    CompetitiveLandscape,
}

impl ResearchCategory {
    pub const ALL: [ResearchCategory; 4] = [
        ResearchCategory::CompanyTrends,
        ResearchCategory::ProductTrends,
        ResearchCategory::IndustryNews,
        ResearchCategory::CompetitiveLandscape,
    ];

    pub fn heading(self) -> &'static str {
        match self {
            ResearchCategory::CompanyTrends => "COMPANY TRENDS",
            ResearchCategory::ProductTrends => "PRODUCT TRENDS",
            ResearchCategory::IndustryNews => "INDUSTRY NEWS",
            ResearchCategory::CompetitiveLandscape => "COMPETITIVE LANDSCAPE",
        }
    }
}

/// A short, normalized piece of research text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchSnippet {
    pub title: String,
    pub snippet: String,
    pub source_url: Option<String>,
}

/// Optional enrichment bundle. `Default` is the all-empty fallback.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndustryResearch {
    pub company_trends: Vec<ResearchSnippet>,
    pub product_trends: Vec<ResearchSnippet>,
    pub industry_news: Vec<ResearchSnippet>,
    pub competitive_landscape: Vec<ResearchSnippet>,
}

impl IndustryResearch {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        ResearchCategory::ALL
            .iter()
            .all(|c| self.category(*c).is_empty())
    }

    pub fn category(&self, category: ResearchCategory) -> &[ResearchSnippet] {
        match category {
            ResearchCategory::CompanyTrends => &self.company_trends,
            ResearchCategory::ProductTrends => &self.product_trends,
            ResearchCategory::IndustryNews => &self.industry_news,
            ResearchCategory::CompetitiveLandscape => &self.competitive_landscape,
        }
    }

    pub fn category_mut(&mut self, category: ResearchCategory) -> &mut Vec<ResearchSnippet> {
        match category {
            ResearchCategory::CompanyTrends => &mut self.company_trends,
            ResearchCategory::ProductTrends => &mut self.product_trends,
            ResearchCategory::IndustryNews => &mut self.industry_news,
            ResearchCategory::CompetitiveLandscape => &mut self.competitive_landscape,
        }
    }

    pub fn len(&self) -> usize {
        ResearchCategory::ALL
            .iter()
            .map(|c| self.category(*c).len())
            .sum()
    }
}
