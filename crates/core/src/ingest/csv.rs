use crate::domain::sales::SalesRecord;
use crate::error::PipelineError;
use std::io::Read;

/// Accepted spellings of the sales column, in priority order.
const SALES_COLUMN_ALIASES: [&str; 5] = [
    "sales",
    "revenue_millions_usd",
    "revenue",
    "total_sales",
    "amount",
];

#[derive(Debug, Clone)]
pub struct CsvOptions {
    pub delimiter: u8,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

fn invalid(detail: String) -> anyhow::Error {
    PipelineError::data_validation(detail).into()
}

pub fn normalize_column(name: &str) -> String {
    name.trim()
        .trim_start_matches('\u{feff}')
        .to_lowercase()
        .replace(' ', "_")
}

#[derive(Debug, Clone, Copy)]
struct Columns {
    product: usize,
    region: usize,
    sales: usize,
}

fn locate_columns(headers: &[String]) -> anyhow::Result<Columns> {
    let find = |name: &str| headers.iter().position(|h| h == name);

    let sales = SALES_COLUMN_ALIASES.iter().find_map(|alias| find(alias));
    let product = find("product");
    let region = find("region");

    let mut missing = Vec::new();
    if product.is_none() {
        missing.push("product");
    }
    if region.is_none() {
        missing.push("region");
    }
    if sales.is_none() {
        missing.push("sales");
    }

    match (product, region, sales) {
        (Some(product), Some(region), Some(sales)) => Ok(Columns {
            product,
            region,
            sales,
        }),
        _ => Err(invalid(format!(
            "missing required columns: {missing:?}. Available columns: {headers:?}"
        ))),
    }
}

/// Parses a sales amount. A leading `$` and `,` thousands separators are tolerated.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .trim_start_matches('$')
        .chars()
        .filter(|c| *c != ',')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parses every row or none: one malformed row fails the whole input.
pub fn parse_records<R: Read>(reader: R, opts: &CsvOptions) -> anyhow::Result<Vec<SalesRecord>> {
    let mut rdr = ::csv::ReaderBuilder::new()
        .delimiter(opts.delimiter)
        .has_headers(true)
        .trim(::csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| invalid(format!("failed to read header row: {e}")))?
        .iter()
        .map(normalize_column)
        .collect();
    let cols = locate_columns(&headers)?;

    let mut out = Vec::new();
    for (idx, row) in rdr.records().enumerate() {
        let row_no = idx + 1;
        let row = row.map_err(|e| invalid(format!("row {row_no}: malformed record: {e}")))?;

        let product = row.get(cols.product).unwrap_or("").trim();
        if product.is_empty() {
            return Err(invalid(format!("row {row_no}: product must be non-empty")));
        }
        let region = row.get(cols.region).unwrap_or("").trim();
        if region.is_empty() {
            return Err(invalid(format!("row {row_no}: region must be non-empty")));
        }

        let raw_sales = row.get(cols.sales).unwrap_or("");
        let sales = parse_amount(raw_sales).ok_or_else(|| {
            invalid(format!("row {row_no}: sales value {raw_sales:?} is not numeric"))
        })?;
        if sales < 0.0 {
            return Err(invalid(format!(
                "row {row_no}: sales must be non-negative (got {sales})"
            )));
        }

        out.push(SalesRecord {
            product: product.to_string(),
            region: region.to_string(),
            sales,
        });
    }

    if out.is_empty() {
        return Err(invalid("input contains no data rows".to_string()));
    }

    tracing::debug!(rows = out.len(), "parsed sales records");
    Ok(out)
}
