mod display;

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand, ValueEnum};
use reviewlens_ai::{
    DecisionEngine, GatewayConfig, GeminiGateway, GenerationError, ReviewAnalyzer, TextGenerator,
    API_BASE_ENV, API_KEY_ENV, DEFAULT_API_BASE, DEFAULT_MAX_RETRIES, DEFAULT_MODEL,
    DEFAULT_TIMEOUT, MAX_RETRIES_ENV, MODEL_ENV, TIMEOUT_ENV,
};
use reviewlens_core::{validate, AnalysisResult, ReviewBatch, SchemaKind};
use reviewlens_store::{DuckSubstrate, FileSubstrate, MemorySubstrate, StateStore};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "reviewlens", version, about = "Customer review analysis and escalation tracking")]
struct Cli {
    #[command(flatten)]
    llm: LlmArgs,

    #[command(flatten)]
    storage: StorageArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct LlmArgs {
    /// Gemini API key. Without it analysis is heuristic-only and decisions are unavailable.
    #[arg(long, env = API_KEY_ENV, hide_env_values = true, global = true)]
    api_key: Option<String>,

    #[arg(long, env = MODEL_ENV, default_value = DEFAULT_MODEL, global = true)]
    model: String,

    #[arg(long, env = API_BASE_ENV, default_value = DEFAULT_API_BASE, global = true)]
    api_base: String,

    /// Per-call LLM timeout.
    #[arg(long, env = TIMEOUT_ENV, default_value_t = DEFAULT_TIMEOUT.as_secs(), global = true)]
    timeout_secs: u64,

    /// Extra analysis attempts after the first LLM failure.
    #[arg(long, env = MAX_RETRIES_ENV, default_value_t = DEFAULT_MAX_RETRIES, global = true)]
    max_retries: u32,
}

#[derive(Args)]
struct StorageArgs {
    #[arg(long, value_enum, default_value_t = Backend::File, global = true)]
    backend: Backend,

    #[arg(long, env = "REVIEWLENS_DATA_DIR", default_value = "data", global = true)]
    data_dir: PathBuf,
}

#[derive(Clone, Copy, ValueEnum)]
enum Backend {
    /// JSON state file and JSON-lines log under <data-dir>/state
    File,
    /// DuckDB database at <data-dir>/reviewlens.duckdb
    Duckdb,
    /// Volatile, for trying things out
    Memory,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Analyze reviews (one per line) from a file or stdin
    Analyze {
        /// Read reviews from this file instead of stdin
        #[arg(long, short)]
        input: Option<PathBuf>,

        /// Also classify and escalate, updating system state
        #[arg(long)]
        decide: bool,

        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Classify and escalate a saved analysis (JSON from `analyze --format json`)
    Decide {
        #[arg(long)]
        analysis: PathBuf,

        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Show accumulated issue counts and escalation status
    State {
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Show the decision log
    Log {
        /// Only the most recent N entries
        #[arg(long)]
        limit: Option<usize>,

        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    tracing::debug!("reviewlens v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Analyze {
            input,
            decide,
            format,
        } => {
            let gateway = build_gateway(&cli.llm)?;
            let analyzer = build_analyzer(gateway.as_ref(), decide, cli.llm.max_retries)?;

            let text = read_input(input.as_deref())?;
            let batch = ReviewBatch::from_text(&text);
            if batch.is_empty() {
                bail!("no reviews to analyze");
            }

            let analysis = analyzer.analyze_batch(&batch).await;

            if !decide {
                match format {
                    Format::Json => println!("{}", serde_json::to_string_pretty(&analysis)?),
                    Format::Text => print!("{}", display::render_analysis(&analysis)),
                }
                return Ok(());
            }

            let gateway = gateway.ok_or(GenerationError::MissingCredential)?;
            let engine = DecisionEngine::new(gateway, Arc::new(open_store(&cli.storage)?));
            let outcome = engine.decide(&analysis).await?;
            match format {
                Format::Json => {
                    let out = serde_json::json!({
                        "analysis": analysis,
                        "decision": outcome.decision,
                        "state": outcome.state,
                    });
                    println!("{}", serde_json::to_string_pretty(&out)?);
                }
                Format::Text => {
                    print!("{}", display::render_analysis(&analysis));
                    print!("{}", display::render_decision(&outcome));
                }
            }
        }

        Command::Decide { analysis, format } => {
            let gateway = build_gateway(&cli.llm)?.ok_or(GenerationError::MissingCredential)?;
            let analysis = load_analysis(&analysis)?;
            let engine = DecisionEngine::new(gateway, Arc::new(open_store(&cli.storage)?));
            let outcome = engine.decide(&analysis).await?;
            match format {
                Format::Json => {
                    let out = serde_json::json!({
                        "decision": outcome.decision,
                        "state": outcome.state,
                    });
                    println!("{}", serde_json::to_string_pretty(&out)?);
                }
                Format::Text => print!("{}", display::render_decision(&outcome)),
            }
        }

        Command::State { format } => {
            let state = open_store(&cli.storage)?.snapshot()?;
            match format {
                Format::Json => println!("{}", serde_json::to_string_pretty(&state)?),
                Format::Text => print!("{}", display::render_state(&state)),
            }
        }

        Command::Log { limit, format } => {
            let mut entries = open_store(&cli.storage)?.decision_log()?;
            if let Some(n) = limit {
                let skip = entries.len().saturating_sub(n);
                entries.drain(..skip);
            }
            match format {
                Format::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
                Format::Text => print!("{}", display::render_log(&entries)),
            }
        }
    }

    Ok(())
}

/// The LLM gateway, or `None` when no API key is configured.
fn build_gateway(args: &LlmArgs) -> anyhow::Result<Option<Arc<dyn TextGenerator>>> {
    let Some(api_key) = args.api_key.as_deref().filter(|k| !k.trim().is_empty()) else {
        return Ok(None);
    };
    let config = GatewayConfig {
        api_key: api_key.to_string(),
        model: args.model.clone(),
        api_base: args.api_base.clone(),
        timeout: Duration::from_secs(args.timeout_secs),
    };
    let gateway = GeminiGateway::new(config).context("configuring LLM gateway")?;
    Ok(Some(Arc::new(gateway)))
}

/// Phase-1 analyzer over `gateway`. Without a gateway it is heuristic-only,
/// unless a decision is to follow, which fails before any input is read.
fn build_analyzer(
    gateway: Option<&Arc<dyn TextGenerator>>,
    decide: bool,
    max_retries: u32,
) -> Result<ReviewAnalyzer, GenerationError> {
    let analyzer = match gateway {
        Some(g) => ReviewAnalyzer::new(Arc::clone(g)),
        None if decide => return Err(GenerationError::MissingCredential),
        None => {
            warn!("no API key configured, analysis will use the heuristic fallback");
            ReviewAnalyzer::heuristic_only()
        }
    };
    Ok(analyzer.with_max_retries(max_retries))
}

fn open_store(args: &StorageArgs) -> anyhow::Result<StateStore> {
    let store = match args.backend {
        Backend::File => {
            let dir = args.data_dir.join("state");
            StateStore::new(
                FileSubstrate::open(&dir)
                    .with_context(|| format!("opening state directory {}", dir.display()))?,
            )
        }
        Backend::Duckdb => {
            let path = args.data_dir.join("reviewlens.duckdb");
            StateStore::new(
                DuckSubstrate::open_persistent(&path)
                    .with_context(|| format!("opening {}", path.display()))?,
            )
        }
        Backend::Memory => StateStore::new(MemorySubstrate::new()),
    };
    Ok(store)
}

fn read_input(path: Option<&Path>) -> anyhow::Result<String> {
    match path {
        Some(p) => std::fs::read_to_string(p).with_context(|| format!("reading {}", p.display())),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading reviews from stdin")?;
            Ok(buf)
        }
    }
}

/// Load a saved analysis and re-check it against the analysis schema.
fn load_analysis(path: &Path) -> anyhow::Result<AnalysisResult> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let analysis: AnalysisResult =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
    validate(analysis.to_payload(), SchemaKind::Analysis)
        .with_context(|| format!("{} is not a valid analysis", path.display()))?;
    Ok(analysis)
}
