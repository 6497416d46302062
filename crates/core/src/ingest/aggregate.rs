use crate::domain::sales::{format_usd, GroupStats, SalesRecord, SalesSummary};
use crate::error::PipelineError;
use std::collections::BTreeMap;

/// A group above this share of total sales is flagged as a concentration risk.
pub const CONCENTRATION_THRESHOLD_PERCENT: f64 = 50.0;

/// Sums in ascending order so the result does not depend on input row order.
fn stable_sum(values: &mut [f64]) -> f64 {
    values.sort_by(|a, b| a.total_cmp(b));
    values.iter().sum()
}

fn group_stats(mut values: Vec<f64>, total_sales: f64) -> GroupStats {
    let count = values.len();
    let group_total = stable_sum(&mut values);
    let mean = group_total / count as f64;

    let sales_volatility = (count > 1).then(|| {
        let squared: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
        (squared / (count - 1) as f64).sqrt()
    });

    GroupStats {
        total_sales: group_total,
        market_share_percent: 100.0 * group_total / total_sales,
        transaction_count: count,
        average_sales: mean,
        sales_volatility,
    }
}

fn group_by<F>(records: &[SalesRecord], key: F, total_sales: f64) -> BTreeMap<String, GroupStats>
where
    F: Fn(&SalesRecord) -> &str,
{
    let mut buckets: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for r in records {
        buckets.entry(key(r).to_string()).or_default().push(r.sales);
    }

    buckets
        .into_iter()
        .map(|(k, values)| (k, group_stats(values, total_sales)))
        .collect()
}

pub fn summarize(records: &[SalesRecord]) -> anyhow::Result<SalesSummary> {
    if records.is_empty() {
        return Err(PipelineError::data_validation("no sales records to aggregate").into());
    }

    let mut all: Vec<f64> = records.iter().map(|r| r.sales).collect();
    let total_sales = stable_sum(&mut all);
    if !total_sales.is_finite() {
        return Err(PipelineError::data_validation(
            "total sales overflows a 64-bit float; market share is undefined",
        )
        .into());
    }
    if total_sales <= 0.0 {
        return Err(PipelineError::data_validation(
            "total sales is zero; market share is undefined",
        )
        .into());
    }

    let product_summary = group_by(records, |r| r.product.as_str(), total_sales);
    let region_summary = group_by(records, |r| r.region.as_str(), total_sales);
    let key_insights = key_insights(&product_summary, &region_summary, records.len());

    Ok(SalesSummary {
        total_sales,
        transaction_count: records.len(),
        product_summary,
        region_summary,
        key_insights,
    })
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{n} {one}")
    } else {
        format!("{n} {many}")
    }
}

/// Deterministic insights over the aggregates. No I/O.
pub fn key_insights(
    products: &BTreeMap<String, GroupStats>,
    regions: &BTreeMap<String, GroupStats>,
    transaction_count: usize,
) -> Vec<String> {
    let ranked_products = SalesSummary::ranked(products);
    let ranked_regions = SalesSummary::ranked(regions);
    let mut out = Vec::new();

    if let Some((name, stats)) = ranked_products.first() {
        out.push(format!(
            "Top performing product: {name} with {} in sales",
            format_usd(stats.total_sales)
        ));
    }
    if let Some((name, stats)) = ranked_regions.first() {
        out.push(format!(
            "Top performing region: {name} with {} in sales",
            format_usd(stats.total_sales)
        ));
    }

    out.push(format!(
        "Portfolio consists of {}",
        plural(products.len(), "product", "products")
    ));
    out.push(format!(
        "Operating in {}",
        plural(regions.len(), "region", "regions")
    ));
    out.push(format!(
        "Analyzed {}",
        plural(transaction_count, "transaction", "transactions")
    ));

    for (name, stats) in &ranked_products {
        if stats.market_share_percent > CONCENTRATION_THRESHOLD_PERCENT {
            out.push(format!(
                "High product concentration risk: {name} represents {:.2}% of total sales",
                stats.market_share_percent
            ));
        }
    }
    for (name, stats) in &ranked_regions {
        if stats.market_share_percent > CONCENTRATION_THRESHOLD_PERCENT {
            out.push(format!(
                "High regional concentration risk: {name} represents {:.2}% of total sales",
                stats.market_share_percent
            ));
        }
    }

    out
}
