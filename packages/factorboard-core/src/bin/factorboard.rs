//! Factorboard CLI - Command line interface for basket performance and risk.
//!
//! Every command prints one JSON `ApiResponse` on stdout. Logs go to stderr.

use anyhow::Context;
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use factorboard_core::{
    analysis::{INTENSITY_DECIMALS, PERCENT_DECIMALS},
    analyze_basket, analyze_risk, analytics::rebase_to, builtin_baskets, get_basket,
    risk_universe, AnalysisConfig, ApiResponse, Category, DateRange, Instrument, JsonFileSource,
    Period, PriceCache, PriceStore,
};
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "factorboard")]
#[command(about = "Factorboard CLI - ETF basket performance and risk analytics")]
#[command(version)]
struct Cli {
    /// Config file (defaults to FACTORBOARD_CONFIG or the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List built-in baskets
    Baskets,
    /// Rebased performance, period returns and benchmark comparison
    Performance {
        /// Basket id (factor, region, sector)
        #[arg(short, long)]
        basket: String,
        /// JSON price snapshot
        #[arg(short, long)]
        prices: PathBuf,
        /// Last date of the display range (defaults to today)
        #[arg(short, long)]
        end: Option<NaiveDate>,
        /// Return-table as-of date
        #[arg(long)]
        as_of: Option<NaiveDate>,
        /// Rebasing anchor date
        #[arg(long)]
        anchor: Option<NaiveDate>,
        /// Benchmark symbol overriding the basket's own
        #[arg(long)]
        benchmark: Option<String>,
        /// Order rows around the benchmark for this period (e.g. YTD)
        #[arg(long)]
        order_by: Option<Period>,
    },
    /// Correlation matrix and rolling returns
    Risk {
        /// JSON price snapshot
        #[arg(short, long)]
        prices: PathBuf,
        /// Symbols to include (comma-separated, defaults to every basket instrument)
        #[arg(short, long)]
        symbols: Option<String>,
        /// Last date of the display range (defaults to today)
        #[arg(short, long)]
        end: Option<NaiveDate>,
    },
    /// Rebase a single instrument
    Rebase {
        /// JSON price snapshot
        #[arg(short, long)]
        prices: PathBuf,
        /// Symbol to rebase
        #[arg(short, long)]
        symbol: String,
        /// Anchor date
        #[arg(short, long)]
        anchor: NaiveDate,
    },
}

fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let result = load_config(cli.config.as_deref()).and_then(|config| match cli.command {
        Commands::Baskets => handle_baskets(),
        Commands::Performance {
            basket,
            prices,
            end,
            as_of,
            anchor,
            benchmark,
            order_by,
        } => {
            let mut config = config;
            if as_of.is_some() {
                config.as_of = as_of;
            }
            if anchor.is_some() {
                config.anchor_date = anchor;
            }
            if let Some(symbol) = benchmark {
                config.benchmarks.insert(basket.to_lowercase(), symbol);
            }
            handle_performance(&config, &basket, &prices, end, order_by)
        }
        Commands::Risk { prices, symbols, end } => handle_risk(&config, &prices, symbols, end),
        Commands::Rebase {
            prices,
            symbol,
            anchor,
        } => handle_rebase(&config, &prices, &symbol, anchor),
    });

    let output = result.unwrap_or_else(|e| {
        tracing::error!("{:#}", e);
        render(&ApiResponse::<()>::err(format!("{:#}", e)))
    });

    println!("{}", output);
}

fn load_config(path: Option<&Path>) -> anyhow::Result<AnalysisConfig> {
    let path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(AnalysisConfig::default_path);
    AnalysisConfig::load(&path).with_context(|| format!("loading config from {}", path.display()))
}

fn render<T: serde::Serialize>(response: &ApiResponse<T>) -> String {
    serde_json::to_string_pretty(response)
        .unwrap_or_else(|e| format!("{{\"ok\":false,\"error\":\"{}\"}}", e))
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Load `symbols` over the configured history ending at `end`.
fn load_store(
    config: &AnalysisConfig,
    prices: &Path,
    symbols: &[&str],
    end: NaiveDate,
) -> anyhow::Result<(PriceStore, Vec<String>)> {
    let source = JsonFileSource::open(prices)
        .with_context(|| format!("reading price snapshot {}", prices.display()))?;
    let mut cache = PriceCache::new();
    let history = DateRange::trailing_years(end, config.history_years);

    Ok(PriceStore::populate(&source, &mut cache, symbols, history, today())?)
}

fn handle_baskets() -> anyhow::Result<String> {
    Ok(render(&ApiResponse::ok(json!({
        "baskets": builtin_baskets(),
    }))))
}

fn handle_performance(
    config: &AnalysisConfig,
    basket_id: &str,
    prices: &Path,
    end: Option<NaiveDate>,
    order_by: Option<Period>,
) -> anyhow::Result<String> {
    let basket = get_basket(basket_id)?;
    let basket = match config.benchmark_for(&basket.id) {
        Some(symbol) => basket.with_benchmark(symbol),
        None => basket.clone(),
    };

    let symbols: Vec<&str> = basket
        .members
        .iter()
        .chain(std::iter::once(&basket.benchmark))
        .map(|i| i.symbol.as_str())
        .collect();

    let end = end.unwrap_or_else(today);
    let (store, mut warnings) = load_store(config, prices, &symbols, end)?;
    let range = DateRange::trailing_years(end, config.performance_years);

    let report = analyze_basket(&store, &basket, config, range)?;
    warnings.extend(report.warnings.iter().cloned());

    let ordered = order_by.map(|period| {
        let intensity = report.comparison.excess_intensity(period);
        let rows: Vec<_> = report
            .comparison
            .ordered_around_benchmark(period)
            .into_iter()
            .map(|row| {
                let shade = intensity
                    .iter()
                    .find(|(symbol, _)| symbol == row.symbol())
                    .map(|(_, cell)| cell.rounded(INTENSITY_DECIMALS));
                json!({
                    "symbol": row.symbol(),
                    "name": row.instrument.name,
                    "is_benchmark": row.is_benchmark,
                    "return": row.ret(period).rounded(PERCENT_DECIMALS),
                    "excess": row.excess(period).rounded(PERCENT_DECIMALS),
                    "intensity": shade,
                })
            })
            .collect();
        json!({ "period": period, "rows": rows })
    });

    Ok(render(
        &ApiResponse::ok(json!({
            "report": report.rounded(),
            "ordered": ordered,
        }))
        .with_warnings(warnings),
    ))
}

fn handle_risk(
    config: &AnalysisConfig,
    prices: &Path,
    symbols: Option<String>,
    end: Option<NaiveDate>,
) -> anyhow::Result<String> {
    let universe = risk_universe();
    let instruments: Vec<Instrument> = match symbols {
        Some(list) => list
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                let symbol = s.to_uppercase();
                universe
                    .iter()
                    .find(|i| i.symbol == symbol)
                    .cloned()
                    .unwrap_or_else(|| Instrument::new(&symbol, &symbol, Category::Benchmark))
            })
            .collect(),
        None => universe,
    };

    let symbols: Vec<&str> = instruments.iter().map(|i| i.symbol.as_str()).collect();
    let end = end.unwrap_or_else(today);
    let (store, mut warnings) = load_store(config, prices, &symbols, end)?;
    let range = DateRange::trailing_years(end, config.risk_years);

    let report = analyze_risk(&store, &instruments, config, range)?;
    warnings.extend(report.warnings.iter().cloned());

    Ok(render(&ApiResponse::ok(report.rounded()).with_warnings(warnings)))
}

fn handle_rebase(
    config: &AnalysisConfig,
    prices: &Path,
    symbol: &str,
    anchor: NaiveDate,
) -> anyhow::Result<String> {
    let (store, warnings) = load_store(config, prices, &[symbol], today())?;
    let series = store
        .get(symbol)
        .with_context(|| format!("no prices for {}", symbol.to_uppercase()))?;

    let rebased = rebase_to(series, anchor, config.rebase_base)?;
    Ok(render(&ApiResponse::ok(rebased).with_warnings(warnings)))
}
