pub mod aggregate;
pub mod csv;

use crate::domain::sales::SalesSummary;
use std::io::Read;

pub use self::csv::CsvOptions;

/// Entry point of the aggregation stage: raw table in, `SalesSummary` out.
#[derive(Debug, Clone, Default)]
pub struct SalesAggregator {
    options: CsvOptions,
}

impl SalesAggregator {
    pub fn new(options: CsvOptions) -> Self {
        Self { options }
    }

    pub fn process(&self, raw_table: &str) -> anyhow::Result<SalesSummary> {
        self.process_reader(raw_table.as_bytes())
    }

    pub fn process_reader<R: Read>(&self, reader: R) -> anyhow::Result<SalesSummary> {
        let records = self::csv::parse_records(reader, &self.options)?;
        let summary = aggregate::summarize(&records)?;
        tracing::info!(
            rows = records.len(),
            products = summary.product_summary.len(),
            regions = summary.region_summary.len(),
            total_sales = summary.total_sales,
            "aggregated sales records"
        );
        Ok(summary)
    }
}
