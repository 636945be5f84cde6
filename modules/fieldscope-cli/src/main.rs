// CLI / Entry Point (spec.md §4.12, §6): resolves the lens identifier by
// precedence, constructs the request, drives orchestration, and formats the
// report. Argument parsing, report pretty-printing, and logging sinks are
// themselves out of scope for the *core* (spec.md §1) — this crate is where
// they live, in the teacher's `main.rs` style (tracing + clap + anyhow at
// the process boundary).

mod http_adapter;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use fieldscope_common::{Config, IngestionRequest, RequestMode};
use fieldscope_engine::adapters::{registry, AdapterKind, ContentAdapter};
use fieldscope_engine::{build_report, ExecutionContext, Orchestrator};
use fieldscope_lens::{resolve_lens_id, LensContract};
use fieldscope_store::Store;
use tracing_subscriber::EnvFilter;

use http_adapter::HttpJsonAdapter;

/// Lens used only when `--allow-default-lens` is passed and no other
/// source (CLI flag, `LENS_ID`, config `default_lens`) resolved one. Must
/// exist under the configured lens search path; ships as a fixture lens
/// under `modules/fieldscope-lens/lenses/`.
const DEV_FALLBACK_LENS_ID: &str = "padel";

#[derive(Parser)]
#[command(name = "fieldscope", about = "Lens-driven entity ingestion engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one ingestion request: plan adapters, execute phases, dedup,
    /// optionally persist, and print the report.
    Run {
        /// Free-text query the planner and adapters operate over.
        query: String,

        /// Explicit lens id, overriding `LENS_ID` and config `default_lens`.
        #[arg(long)]
        lens: Option<String>,

        /// Request mode.
        #[arg(long, value_enum, default_value = "discover-many")]
        mode: ModeArg,

        /// Bypass the planner and execute a single named adapter
        /// (diagnostic path). Unknown name exits with code 1.
        #[arg(long)]
        connector: Option<String>,

        /// Persist accepted entities (raw ingestion, extracted entity,
        /// final entity upsert). Without this flag the run is a dry run.
        #[arg(long)]
        persist: bool,

        /// Permit the dev/test-only fallback lens when no other lens
        /// source resolved an id.
        #[arg(long)]
        allow_default_lens: bool,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum ModeArg {
    DiscoverMany,
    ResolveOne,
}

impl From<ModeArg> for RequestMode {
    fn from(value: ModeArg) -> Self {
        match value {
            ModeArg::DiscoverMany => RequestMode::DiscoverMany,
            ModeArg::ResolveOne => RequestMode::ResolveOne,
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let runtime = tokio::runtime::Runtime::new().expect("failed to start tokio runtime");
    match runtime.block_on(run()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let Commands::Run { query, lens, mode, connector, persist, allow_default_lens } = cli.command;

    let config = Config::from_env();
    config.log_redacted();

    let registry = registry::default_registry();
    let known_adapters: Vec<&str> = registry.keys().map(|k| k.name()).collect();

    let lens_id = resolve_lens_id(
        lens.as_deref(),
        std::env::var("LENS_ID").ok().as_deref(),
        config.default_lens.as_deref(),
        allow_default_lens.then_some(DEV_FALLBACK_LENS_ID),
    )
    .ok_or_else(|| anyhow::anyhow!("no lens id resolved: pass --lens, set LENS_ID, configure default_lens, or pass --allow-default-lens"))?;

    let search_path = PathBuf::from(&config.lens_search_path);
    let lens_contract = LensContract::load(&lens_id, &search_path, &known_adapters)?;
    tracing::info!(lens_id = %lens_contract.lens_id, lens_hash = %lens_contract.lens_hash, "lens loaded");

    let store = Store::connect(&config.database_url, config.data_root.clone()).await?;
    store.migrate().await?;

    let ctx = ExecutionContext::new(lens_contract);
    let request_mode: RequestMode = mode.into();
    let request = IngestionRequest {
        query: query.clone(),
        mode: request_mode,
        min_confidence: ctx.lens_contract.confidence_threshold().unwrap_or(0.6),
        target_entity_count: match request_mode {
            RequestMode::ResolveOne => 1,
            RequestMode::DiscoverMany => 20,
        },
        budget_usd: config.daily_budget_usd,
    };

    let query_features = fieldscope_engine::query_features::extract(&query, ctx.lens_contract.query_keywords());

    let plan = if let Some(connector_name) = &connector {
        single_connector_plan(connector_name, &registry)?
    } else {
        fieldscope_engine::planner::select(&query, request_mode, query_features, &ctx.lens_contract, &registry)
    };

    let (adapters, missing): (BTreeMap<AdapterKind, Arc<dyn ContentAdapter>>, Vec<String>) = build_adapters(&plan);

    let run_id = store.start_run(&query, &ctx.lens_id, mode_label(request_mode)).await?;

    let orchestrator = Orchestrator::new(adapters, store.clone());
    let state = orchestrator.run(&request, &plan).await;

    let persistence = if persist {
        Some(fieldscope_engine::persist::persist_accepted_entities(
            &store,
            &ctx,
            &state,
            &fieldscope_engine::extract::NullLlmExtractor,
        )
        .await)
    } else {
        None
    };

    let report = build_report(&query, &state, persistence, missing);
    let report_json = fieldscope_engine::report::to_json(&report);
    store.finish_run(run_id, &report_json).await?;

    println!("{}", serde_json::to_string_pretty(&report_json)?);
    Ok(())
}

fn mode_label(mode: RequestMode) -> &'static str {
    match mode {
        RequestMode::ResolveOne => "resolve_one",
        RequestMode::DiscoverMany => "discover_many",
    }
}

/// `--connector <name>` diagnostic path: a one-adapter plan bypassing the
/// planner entirely. Unknown name is a configuration error (exit code 1).
fn single_connector_plan(
    name: &str,
    registry: &BTreeMap<AdapterKind, fieldscope_engine::adapters::AdapterSpec>,
) -> anyhow::Result<fieldscope_engine::planner::ExecutionPlan> {
    let spec = registry
        .values()
        .find(|spec| spec.kind.name() == name)
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("unknown connector `{name}`"))?;

    Ok(fieldscope_engine::planner::ExecutionPlan {
        adapters: vec![fieldscope_engine::planner::PlannedAdapter { spec, depends_on: Vec::new() }],
    })
}

/// Build one `HttpJsonAdapter` per planned adapter kind whose connection
/// details (`<KIND>_URL` env var) are present. Kinds with no configured URL
/// are reported as warnings rather than registered — the orchestrator
/// already treats an unregistered adapter as a non-fatal "not executed"
/// outcome (see `orchestrator::run_one`).
fn build_adapters(
    plan: &fieldscope_engine::planner::ExecutionPlan,
) -> (BTreeMap<AdapterKind, Arc<dyn ContentAdapter>>, Vec<String>) {
    let mut adapters: BTreeMap<AdapterKind, Arc<dyn ContentAdapter>> = BTreeMap::new();
    let mut warnings = Vec::new();

    for planned in &plan.adapters {
        let kind = planned.spec.kind;
        let name = kind.name();
        let env_prefix = name.to_uppercase();
        let url_var = format!("{env_prefix}_URL");

        match std::env::var(&url_var) {
            Ok(url_template) => {
                let mut adapter = HttpJsonAdapter::new(name, url_template);
                if let Ok(api_key) = std::env::var(format!("{env_prefix}_API_KEY")) {
                    adapter = adapter.with_api_key_header("X-API-Key", api_key);
                }
                adapters.insert(kind, Arc::new(adapter));
            }
            Err(_) => {
                warnings.push(format!("no {url_var} configured; {name} will not execute"));
            }
        }
    }

    (adapters, warnings)
}
