use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use vdl_config::{load_config, Config};
use vdl_tree::{ChaseOptions, Inspector, InspectorOptions, NodeId, Scope, TreeHandle};

mod backend;
mod render;
mod session;

use backend::{ScriptedBackend, TracingOpenNodes};
use session::Session;

/// How long to wait for outstanding chases after each expand.
const SETTLE_TIMEOUT: Duration = Duration::from_secs(5);

/// Replay a scripted debugger session and print the resulting variable tree.
#[derive(Debug, Default, PartialEq, Eq, Parser)]
#[command(name = "vdlview", version)]
struct Args {
    /// Session file with locals, watches and canned chase replies.
    session: PathBuf,
    /// Expand the node with this key after the session's own expansions.
    #[arg(long, value_name = "KEY")]
    expand: Vec<String>,
    /// Assign VALUE to the node with key KEY.
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_assignment)]
    assign: Vec<(String, String)>,
    /// Print the tree as JSON.
    #[arg(long)]
    json: bool,
}

fn parse_assignment(spec: &str) -> Result<(String, String), String> {
    spec.split_once('=')
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got `{spec}`"))
}

fn init_tracing(config: &Config) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log.level.as_filter()));
    match &config.log.file {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::sync::Mutex::new(file))
                .with_ansi(false)
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

/// Look a key up in the locals first, then in the watches.
async fn find_node(handle: &TreeHandle, key: &str) -> Result<Option<NodeId>> {
    if let Some(node) = handle.find_by_key(Scope::Locals, key).await? {
        return Ok(Some(node));
    }
    Ok(handle.find_by_key(Scope::Watches, key).await?)
}

/// Wait until no chase is outstanding.
async fn settle(handle: &TreeHandle) -> Result<()> {
    let wait = async {
        while handle.snapshot().await?.pending_chases > 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        Ok::<_, anyhow::Error>(())
    };
    tokio::time::timeout(SETTLE_TIMEOUT, wait)
        .await
        .context("chases did not complete in time")?
}

async fn run_session(args: Args, config: Config) -> Result<String> {
    let session = Session::load(&args.session)?;
    let options = InspectorOptions {
        chase: ChaseOptions {
            inherited_members: config.chase.inherited_members,
            dynamic_type: config.chase.dynamic_type,
        },
        clean_pointer_names: config.tree.clean_pointer_names,
    };
    let backend = ScriptedBackend::new(
        session
            .chases
            .iter()
            .map(|chase| (chase.expr.clone(), chase.outcome())),
    );
    let (handle, task) = vdl_tree::spawn(
        Inspector::new(Box::new(TracingOpenNodes), options),
        Box::new(backend),
    );

    handle.set_locals(session.locals.iter().map(|l| l.to_item()).collect())?;
    for watch in &session.watches {
        handle.set_watch(watch.id, watch.to_item())?;
    }

    for key in session.expand.iter().chain(&args.expand) {
        let Some(node) = find_node(&handle, key).await? else {
            warn!(key = %key, "no node with this key");
            continue;
        };
        handle.expand(node)?;
        settle(&handle).await?;
    }

    for (key, value) in &args.assign {
        let Some(node) = find_node(&handle, key).await? else {
            warn!(key = %key, "no node with this key");
            continue;
        };
        handle
            .assign(node, value.as_str())
            .await
            .with_context(|| format!("failed to assign {key}"))?;
    }

    let snapshot = handle.snapshot().await?;
    handle.shutdown()?;
    task.await.context("tree owner task failed")?;
    info!(locals = snapshot.locals.len(), watches = snapshot.watches.len(), "session done");

    if args.json {
        Ok(serde_json::to_string_pretty(&snapshot)?)
    } else {
        Ok(render::render_snapshot(&snapshot))
    }
}

fn run(args: Args) -> Result<()> {
    let project_dir = env::current_dir().ok();
    let loaded = match vdl_config::default_config_dir() {
        Some(dir) => load_config(&dir, project_dir.as_deref()),
        None => Ok(Config::default()),
    };
    let (config, config_error) = match loaded {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };
    init_tracing(&config)?;
    if let Some(e) = config_error {
        error!("config load failed, using defaults: {}", e);
    }

    let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    let output = runtime.block_on(run_session(args, config))?;
    print!("{output}");
    Ok(())
}

fn main() {
    if let Err(e) = run(Args::parse()) {
        eprintln!("vdlview: {:#}", e);
        std::process::exit(1);
    }
}
