use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use godot_mcp::api;
use godot_mcp::bridge::DispatchBridge;
use godot_mcp::host::HeadlessHost;
use godot_mcp::paths;
use godot_mcp::registry::{Catalog, HandlerRegistry};
use godot_mcp::runtime::HostLoop;
use godot_mcp::session::SessionTable;
use godot_mcp::settings::{self, BridgeSettings};
use godot_mcp::state::ServerState;
use godot_mcp::value::NullPolicy;

#[derive(Parser)]
#[command(name = "godot-mcp", about = "Godot editor command bridge server", version)]
struct Args {
    /// Project directory (contains project.godot)
    #[arg(long)]
    project: Option<PathBuf>,

    /// Port to listen on (0 = any free port)
    #[arg(long)]
    port: Option<u16>,

    /// Address to bind
    #[arg(long)]
    bind: Option<String>,

    /// Config directory override
    #[arg(long)]
    config_dir: Option<PathBuf>,

    /// Per-call timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Keep wire nulls as nil instead of empty strings
    #[arg(long)]
    keep_nulls: bool,

    /// Persist the effective settings before starting
    #[arg(long)]
    save_settings: bool,
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("godot_mcp=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn effective_settings(args: &Args, config_dir: &std::path::Path) -> BridgeSettings {
    let mut settings = settings::load_settings(config_dir).unwrap_or_default();
    if let Some(project) = &args.project {
        settings.project_dir = Some(project.clone());
    }
    if let Some(port) = args.port {
        settings.port = port;
    }
    if let Some(bind) = &args.bind {
        settings.bind_address.clone_from(bind);
    }
    if let Some(timeout) = args.timeout_ms {
        settings.call_timeout_ms = timeout;
    }
    if args.keep_nulls {
        settings.null_policy = NullPolicy::Nil;
    }
    settings
}

async fn run(args: Args) -> Result<(), String> {
    let config_dir = args.config_dir.clone().unwrap_or_else(paths::config_dir);
    let settings = effective_settings(&args, &config_dir);
    if args.save_settings {
        settings::save_settings(&config_dir, &settings)
            .map_err(|e| format!("Failed to save settings: {e}"))?;
    }

    let project_dir = match &settings.project_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().map_err(|e| format!("No working directory: {e}"))?,
    };
    let host = HeadlessHost::open(&project_dir)
        .map_err(|e| format!("Cannot open project {}: {e}", project_dir.display()))?;

    let catalog = Arc::new(Catalog::new());
    let (bridge, pump) = DispatchBridge::new(Arc::new(SessionTable::new()));
    let registry = HandlerRegistry::new(Arc::clone(&catalog));
    let host_thread = HostLoop::new(host, registry, pump, settings.tick_interval())
        .spawn()
        .map_err(|e| format!("Failed to start host thread: {e}"))?;

    let addr = settings
        .socket_addr()
        .map_err(|e| format!("Invalid bind address: {e}"))?;
    let state = Arc::new(ServerState::new(
        catalog,
        bridge.clone(),
        settings,
        project_dir.clone(),
    ));
    let (port, server) = api::start_api_server(Arc::clone(&state), addr).await?;

    // Port file lets local tools find the server
    let port_file = paths::port_file_path(&config_dir);
    if let Err(e) = std::fs::create_dir_all(&config_dir)
        .and_then(|()| std::fs::write(&port_file, port.to_string()))
    {
        warn!(path = %port_file.display(), error = %e, "could not write port file");
    }
    info!(
        project = %project_dir.display(),
        url = %format!("http://{}:{port}", addr.ip()),
        "godot_mcp ready"
    );

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
    }
    info!("shutting down");
    bridge.shutdown();
    server.abort();
    let joined = tokio::task::spawn_blocking(move || host_thread.join()).await;
    if !matches!(joined, Ok(Ok(_))) {
        warn!("host thread did not stop cleanly");
    }
    let _ = std::fs::remove_file(&port_file);
    Ok(())
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(e) = run(Args::parse()).await {
        error!("{e}");
        process::exit(1);
    }
}
