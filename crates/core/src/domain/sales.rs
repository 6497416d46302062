use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One parsed sales transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesRecord {
    pub product: String,
    pub region: String,
    pub sales: f64,
}

/// Aggregate for one product or one region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupStats {
    pub total_sales: f64,
    /// Share of the summary's `total_sales`, 0..=100. Stored unrounded.
    pub market_share_percent: f64,
    pub transaction_count: usize,
    pub average_sales: f64,
    /// Sample standard deviation; `None` for single-row groups.
    pub sales_volatility: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesSummary {
    pub total_sales: f64,
    pub transaction_count: usize,
    pub product_summary: BTreeMap<String, GroupStats>,
    pub region_summary: BTreeMap<String, GroupStats>,
    pub key_insights: Vec<String>,
}

impl SalesSummary {
    /// Groups ordered by total sales, largest first; ties broken by name.
    pub fn ranked(groups: &BTreeMap<String, GroupStats>) -> Vec<(&str, &GroupStats)> {
        let mut out: Vec<(&str, &GroupStats)> =
            groups.iter().map(|(k, v)| (k.as_str(), v)).collect();
        out.sort_by(|a, b| {
            b.1.total_sales
                .partial_cmp(&a.1.total_sales)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(b.0))
        });
        out
    }

    pub fn ranked_products(&self) -> Vec<(&str, &GroupStats)> {
        Self::ranked(&self.product_summary)
    }

    pub fn ranked_regions(&self) -> Vec<(&str, &GroupStats)> {
        Self::ranked(&self.region_summary)
    }

    /// Product names by total sales, largest first.
    pub fn product_names(&self) -> Vec<String> {
        self.ranked_products()
            .into_iter()
            .map(|(name, _)| name.to_string())
            .collect()
    }
}

/// `$1,234,567.89` style rendering used in insights and prompts.
pub fn format_usd(amount: f64) -> String {
    let fixed = format!("{:.2}", amount.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let digits: Vec<char> = int_part.chars().collect();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.iter().enumerate() {
        if i != 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(*c);
    }

    let sign = if amount < 0.0 { "-" } else { "" };
    format!("{sign}${grouped}.{frac_part}")
}
