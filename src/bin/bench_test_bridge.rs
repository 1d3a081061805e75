use bench_test_bridge::demo::{self, DemoCase};
use bench_test_bridge::harness::{BenchConfig, Profile};
use bench_test_bridge::schema::{BenchmarkReport, RunMeta, SuiteReport};
use bench_test_bridge::{
    BenchmarkCatalog, CountingAllocator, OutputSink, StdoutSink, TestInvocationAdapter, TraceSink,
};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[global_allocator]
static GLOBAL: CountingAllocator = CountingAllocator;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ProfileArg {
    Quick,
    Full,
}

impl From<ProfileArg> for Profile {
    fn from(v: ProfileArg) -> Self {
        match v {
            ProfileArg::Quick => Profile::Quick,
            ProfileArg::Full => Profile::Full,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the demo benchmark cases and their declared metrics.
    List,

    /// Run the demo suite through the test adapter.
    Run {
        /// Only run cases whose name contains this substring.
        #[arg(long)]
        filter: Option<String>,
    },
}

#[derive(Parser, Debug)]
#[command(name = "bench-test-bridge")]
#[command(about = "Runs the demo benchmark suite as tests and writes a JSON report")]
struct Args {
    #[arg(long, value_enum, default_value_t = ProfileArg::Quick, global = true)]
    profile: ProfileArg,

    #[arg(long, default_value_t = 0, global = true)]
    seed: u64,

    /// Where to write the JSON report. If omitted, prints to stdout.
    #[arg(long, global = true)]
    out: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

fn now_unix() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn git_sha_short() -> Option<String> {
    std::env::var("GIT_SHA")
        .ok()
        .or_else(|| std::env::var("GITHUB_SHA").ok())
        .map(|s| s.chars().take(12).collect())
}

fn list(cfg: &BenchConfig) {
    let catalog = BenchmarkCatalog::for_class::<demo::MapPopulationBenchmarks>();
    for case in demo::cases(cfg) {
        let metrics = catalog
            .resolve(case.method)
            .map(|d| {
                d.tracked_metrics()
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_else(|e| e.to_string());
        println!("{:<60} {metrics}", case.name);
    }
}

fn run_case(adapter: &TestInvocationAdapter, case: &DemoCase) -> BenchmarkReport {
    eprintln!("=== {}", case.name);
    match case.run(adapter) {
        Ok(record) => {
            let report = BenchmarkReport::from_record(&case.name, &record);
            match &record.verdict {
                Ok(summary) => eprintln!(
                    "PASS {} ({:.3}s, {}/{} assertions)",
                    case.name,
                    summary.time.as_secs_f64(),
                    summary.total - summary.failed,
                    summary.total
                ),
                Err(e) => eprintln!("FAIL {}: {e}", case.name),
            }
            report
        }
        Err(e) => {
            eprintln!("FAIL {}: {e}", case.name);
            BenchmarkReport::from_error(&case.name, case.method, &e)
        }
    }
}

fn main() -> io::Result<ExitCode> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let cfg = BenchConfig {
        profile: args.profile.into(),
        seed: args.seed,
    };

    let filter = match &args.cmd {
        Command::List => {
            list(&cfg);
            return Ok(ExitCode::SUCCESS);
        }
        Command::Run { filter } => filter.clone(),
    };

    // Reports go to stdout only when stdout is not carrying the JSON.
    let sink: Arc<dyn OutputSink> = if args.out.is_some() {
        Arc::new(StdoutSink)
    } else {
        Arc::new(TraceSink)
    };
    let adapter = TestInvocationAdapter::new(cfg.clone(), sink);
    let benchmarks: Vec<BenchmarkReport> = demo::cases(&cfg)
        .iter()
        .filter(|c| filter.as_deref().map_or(true, |f| c.name.contains(f)))
        .map(|c| run_case(&adapter, c))
        .collect();

    let report = SuiteReport {
        run: RunMeta {
            schema_version: 1,
            bridge_version: env!("CARGO_PKG_VERSION").to_string(),
            profile: cfg.profile.as_str().to_string(),
            seed: cfg.seed,
            timestamp_unix: now_unix(),
            git_sha: git_sha_short(),
        },
        benchmarks,
    };

    let json = serde_json::to_string_pretty(&report).map_err(io::Error::other)?;
    if let Some(out) = args.out {
        fs::write(out, json)?;
    } else {
        println!("{json}");
    }

    let failed = report.failed();
    eprintln!("{} case(s), {failed} failed", report.benchmarks.len());
    Ok(if failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
