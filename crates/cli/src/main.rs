use anyhow::Context;
use clap::{Parser, ValueEnum};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use salesbrief_core::domain::report::ExecutiveRole;
use salesbrief_core::ingest::{CsvOptions, SalesAggregator};
use salesbrief_core::pipeline::{ReportPipeline, RunOptions};

mod render;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Markdown,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "salesbrief", about = "Turn a sales table into an executive report")]
struct Args {
    /// Sales table with product, region and sales columns. `-` reads stdin.
    #[arg(long)]
    input: PathBuf,

    /// Executive audience, e.g. CEO, CFO, "Head of Sales".
    #[arg(long, default_value = "CEO")]
    role: String,

    /// Skip the industry research step.
    #[arg(long)]
    no_research: bool,

    #[arg(long, value_enum, default_value_t = OutputFormat::Markdown)]
    format: OutputFormat,

    /// Field delimiter of the input table.
    #[arg(long, default_value_t = ',')]
    delimiter: char,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = salesbrief_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let role: ExecutiveRole = args.role.parse().map_err(anyhow::Error::msg)?;
    let delimiter = delimiter_byte(args.delimiter)?;
    let raw_table = read_input(&args.input)?;

    let pipeline = ReportPipeline::from_settings(&settings)?
        .with_aggregator(SalesAggregator::new(CsvOptions { delimiter }));
    let opts = RunOptions {
        skip_research: args.no_research,
    };

    let output = match pipeline.run(&raw_table, role, opts).await {
        Ok(output) => output,
        Err(err) => {
            sentry_anyhow::capture_anyhow(&err);
            tracing::error!(%role, error = %format!("{err:#}"), "report run failed");
            return Err(err);
        }
    };

    for warning in &output.warnings {
        tracing::warn!(report_id = %output.report_id, "{warning}");
    }

    match args.format {
        OutputFormat::Markdown => print!("{}", render::markdown(&output)),
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&output).context("failed to encode report as JSON")?
        ),
    }
    Ok(())
}

fn delimiter_byte(c: char) -> anyhow::Result<u8> {
    u8::try_from(c)
        .ok()
        .filter(u8::is_ascii)
        .with_context(|| format!("delimiter must be a single ASCII character, got {c:?}"))
}

fn read_input(path: &Path) -> anyhow::Result<String> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read sales table from stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(path)
        .with_context(|| format!("failed to read sales table {}", path.display()))
}

fn init_sentry(settings: &salesbrief_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_cli_flags() {
        let args = Args::try_parse_from([
            "salesbrief",
            "--input",
            "sales.csv",
            "--role",
            "head of sales",
            "--no-research",
            "--format",
            "json",
            "--delimiter",
            ";",
        ])
        .unwrap();
        assert_eq!(args.format, OutputFormat::Json);
        assert!(args.no_research);
        assert_eq!(args.role.parse::<ExecutiveRole>(), Ok(ExecutiveRole::HeadOfSales));
        assert_eq!(delimiter_byte(args.delimiter).unwrap(), b';');
    }

    #[test]
    fn defaults_to_markdown_for_ceo() {
        let args = Args::try_parse_from(["salesbrief", "--input", "-"]).unwrap();
        assert_eq!(args.format, OutputFormat::Markdown);
        assert_eq!(args.role, "CEO");
        assert_eq!(args.delimiter, ',');
    }

    #[test]
    fn rejects_non_ascii_delimiter() {
        assert!(delimiter_byte('§').is_err());
        assert_eq!(delimiter_byte('\t').unwrap(), b'\t');
    }
}
