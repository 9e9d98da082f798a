//! Gateway Conformance - Main Entry Point
//!
//! Runs conformance checks against a live gateway. Configuration comes from
//! the environment (see `conformance_infrastructure::config`) and the
//! command-line flags override it.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use conformance_application::{CaseOutcome, RunConfig, RunSuite, Suite, SuiteReport};
use conformance_application::config::parse_url;
use conformance_domain::{ByteRange, ByteRanges, MultiRangePolicy, RangeOracle, RequestSpec, TestCase};
use conformance_infrastructure::{ReqwestHttpClient, load_config};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "gateway-conformance")]
#[command(about = "HTTP gateway conformance runner", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check range request handling for one resource
    Range(RangeArgs),
}

#[derive(Args)]
struct RangeArgs {
    /// Request path, relative to the gateway URL
    #[arg(long)]
    path: String,

    /// File holding the exact bytes the resource should serve
    #[arg(long)]
    fixture: PathBuf,

    /// Byte range such as `0-99`, `500-` or `-100`; repeat for multi-range
    #[arg(long = "range", required = true, allow_hyphen_values = true)]
    ranges: Vec<ByteRange>,

    /// How a multi-range request may be answered
    #[arg(long, value_enum, default_value_t = PolicyArg::AcceptFirst)]
    multi_range: PolicyArg,

    /// Gateway URL (overrides GATEWAY_URL)
    #[arg(long)]
    gateway_url: Option<String>,

    /// Subdomain gateway URL (overrides SUBDOMAIN_GATEWAY_URL)
    #[arg(long)]
    subdomain_gateway_url: Option<String>,

    /// Request `<label>.<subdomain gateway host>` instead of the path gateway
    #[arg(long)]
    subdomain: Option<String>,

    /// Per-request timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Number of cases run at once
    #[arg(long)]
    max_concurrency: Option<usize>,

    /// Hint shown when a case fails
    #[arg(long)]
    hint: Option<String>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PolicyArg {
    /// Only the first range must be honored
    AcceptFirst,
    /// Every range must be served as multipart
    RequireAll,
}

impl From<PolicyArg> for MultiRangePolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::AcceptFirst => Self::AcceptFirstRangeOnly,
            PolicyArg::RequireAll => Self::RequireAllRanges,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let report = match cli.command {
        Commands::Range(args) => run_range(args).await?,
    };

    Ok(if report.all_passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn run_range(args: RangeArgs) -> anyhow::Result<SuiteReport> {
    let config = resolve_config(&args)?;
    let content = tokio::fs::read(&args.fixture)
        .await
        .with_context(|| format!("reading fixture {}", args.fixture.display()))?;
    let ranges = ByteRanges::new(args.ranges.iter().copied())?;

    let mut request = RequestSpec::get(&args.path);
    if let Some(label) = &args.subdomain {
        request = request.subdomain(label);
    }
    let mut base = TestCase::new(format!("GET {}", args.path)).request(request);
    if let Some(hint) = &args.hint {
        base = base.hint(hint);
    }

    let cases = RangeOracle::new(args.multi_range.into())
        .base_with_range_cases(&base, &ranges, &content)
        .context("building range cases")?;

    tracing::info!(
        gateway = %config.gateway_url,
        ranges = %ranges.header_value(),
        fixture_bytes = content.len(),
        "Starting range checks"
    );

    let client = Arc::new(ReqwestHttpClient::from_config(&config)?);
    let report = RunSuite::new(client, config)
        .execute(Suite::new().cases(cases))
        .await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(report)
}

fn resolve_config(args: &RangeArgs) -> anyhow::Result<RunConfig> {
    let mut config = load_config()?;
    if let Some(url) = &args.gateway_url {
        config.gateway_url = parse_url("--gateway-url", url)?;
    }
    if let Some(url) = &args.subdomain_gateway_url {
        config = config.with_subdomain_url(parse_url("--subdomain-gateway-url", url)?);
    }
    if let Some(timeout_ms) = args.timeout_ms {
        config = config.with_timeout_ms(timeout_ms);
    }
    if let Some(max_concurrency) = args.max_concurrency {
        config = config.with_max_concurrency(max_concurrency);
    }
    config.validate()?;
    Ok(config)
}

fn print_report(report: &SuiteReport) {
    for outcome in &report.outcomes {
        println!("{}", render_outcome(outcome));
    }
    println!(
        "\n{} passed, {} failed, {} total ({} ms)",
        report.passed, report.failed, report.total, report.duration_ms
    );
}

fn render_outcome(outcome: &CaseOutcome) -> String {
    if outcome.passed {
        return format!("PASS {} ({} ms)", outcome.name, outcome.duration_ms);
    }
    let mut line = format!("FAIL {}", outcome.name);
    if let Some(diagnostic) = &outcome.diagnostic {
        for part in diagnostic.lines() {
            line.push_str("\n    ");
            line.push_str(part);
        }
    }
    line
}
