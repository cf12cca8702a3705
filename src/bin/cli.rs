// CLI binary — panicking on unrecoverable errors is standard for CLI tools.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::unreachable, clippy::indexing_slicing)]

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::{Map, Value};
use tracing_subscriber::EnvFilter;

use godot_mcp::api::CORRELATION_HEADER;
use godot_mcp::bridge::DispatchBridge;
use godot_mcp::command::SessionId;
use godot_mcp::host::HeadlessHost;
use godot_mcp::paths;
use godot_mcp::registry::{Catalog, CommandFamily, HandlerRegistry};
use godot_mcp::runtime::HostLoop;
use godot_mcp::session::SessionTable;
use godot_mcp::settings;
use godot_mcp::state::ServerState;
use godot_mcp::tools::{self, ToolCallResult};

// ── CLI argument parsing ─────────────────────────────────────────

#[derive(Parser)]
#[command(name = "godot-mcp-cli", about = "Godot MCP headless CLI", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Project directory for in-process calls (default: settings, then cwd)
    #[arg(long, global = true)]
    project: Option<PathBuf>,

    /// Talk to a running server instead, e.g. http://127.0.0.1:8765
    #[arg(long, global = true)]
    remote: Option<String>,

    /// Session to run calls in
    #[arg(long, global = true)]
    session: Option<String>,

    /// Output raw JSON instead of formatted text
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List available tools with their input schemas
    Tools,
    /// Call a tool by name
    Call {
        name: String,
        /// Arguments as a JSON object
        #[arg(long, default_value = "{}")]
        args: String,
        /// Correlation id to tag the call with
        #[arg(long)]
        correlation: Option<String>,
    },
    /// Server status (requires --remote)
    Status,
}

fn parse_args(raw: &str) -> Map<String, Value> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => map,
        Ok(_) => {
            eprintln!("Error: --args must be a JSON object");
            process::exit(2);
        }
        Err(e) => {
            eprintln!("Error: --args is not valid JSON: {e}");
            process::exit(2);
        }
    }
}

// ── Output formatting ────────────────────────────────────────────

fn print_tools(catalog: &Catalog, raw_json: bool) {
    if raw_json {
        println!("{}", serde_json::to_string_pretty(&catalog.to_json()).unwrap_or_default());
        return;
    }
    for family in CommandFamily::all() {
        println!("{} ({})", family.slug(), family.description());
        for tool in catalog.family(*family) {
            let required = tool.required().join(", ");
            println!("  {:<24} {}", tool.name, tool.description);
            if !required.is_empty() {
                println!("  {:<24} requires: {required}", "");
            }
        }
    }
}

fn print_call(result: &ToolCallResult, raw_json: bool) {
    if raw_json {
        println!("{}", serde_json::to_string_pretty(result).unwrap_or_default());
    } else if let Some(block) = result.content.first() {
        if result.is_error {
            eprintln!("Error: {}", block.text);
        } else {
            println!("{}", block.text);
        }
    }
    if result.is_error {
        process::exit(1);
    }
}

// ── In-process mode ──────────────────────────────────────────────

fn call_local(cli: &Cli, name: &str, args: &Map<String, Value>, correlation: Option<&str>) {
    let config_dir = paths::config_dir();
    let mut settings = settings::load_settings(&config_dir).unwrap_or_default();
    if let Some(project) = &cli.project {
        settings.project_dir = Some(project.clone());
    }
    let project_dir = settings
        .project_dir
        .clone()
        .unwrap_or_else(|| std::env::current_dir().expect("no working directory"));
    let host = HeadlessHost::open(&project_dir).unwrap_or_else(|e| {
        eprintln!("Failed to open project '{}': {e}", project_dir.display());
        process::exit(1);
    });

    let catalog = Arc::new(Catalog::new());
    let (bridge, pump) = DispatchBridge::new(Arc::new(SessionTable::new()));
    let registry = HandlerRegistry::new(Arc::clone(&catalog));
    let host_thread = HostLoop::new(host, registry, pump, settings.tick_interval())
        .spawn()
        .expect("failed to start host thread");
    let state = ServerState::new(catalog, bridge, settings, project_dir);

    if cli.session.is_some() {
        eprintln!("Note: --session only applies with --remote; using the default session");
    }
    let session = SessionId::default_session();

    let runtime = tokio::runtime::Runtime::new().expect("failed to start tokio runtime");
    let result = runtime.block_on(tools::call_tool(&state, name, session, correlation, args));
    state.bridge.shutdown();
    host_thread.join().expect("host thread panicked");

    print_call(&ToolCallResult::from(result), cli.json);
}

// ── Remote mode ──────────────────────────────────────────────────

fn remote_get(base: &str, path: &str) -> Value {
    let url = format!("{}{path}", base.trim_end_matches('/'));
    reqwest::blocking::get(&url)
        .and_then(reqwest::blocking::Response::json)
        .unwrap_or_else(|e| {
            eprintln!("Request to {url} failed: {e}");
            process::exit(1);
        })
}

fn call_remote(cli: &Cli, base: &str, name: &str, args: &Map<String, Value>, correlation: Option<&str>) {
    let mut url = format!("{}/api/tools/{name}", base.trim_end_matches('/'));
    if let Some(session) = cli.session.as_deref() {
        url.push_str(&format!("?session={session}"));
    }
    let client = reqwest::blocking::Client::new();
    let mut request = client.post(&url).json(args);
    if let Some(cid) = correlation {
        request = request.header(CORRELATION_HEADER, cid);
    }
    let body: Value = request
        .send()
        .and_then(reqwest::blocking::Response::json)
        .unwrap_or_else(|e| {
            eprintln!("Request to {url} failed: {e}");
            process::exit(1);
        });

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    }
    if body["ok"].as_bool() == Some(true) {
        if !cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&body["data"]["result"]).unwrap_or_default()
            );
        }
    } else {
        if !cli.json {
            let kind = body["kind"].as_str().unwrap_or("Error");
            let message = body["error"].as_str().unwrap_or("request failed");
            eprintln!("Error: {kind}: {message}");
        }
        process::exit(1);
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Tools => match cli.remote.as_deref() {
            Some(base) => {
                let body = remote_get(base, "/api/tools");
                println!("{}", serde_json::to_string_pretty(&body["data"]).unwrap_or_default());
            }
            None => print_tools(&Catalog::new(), cli.json),
        },
        Commands::Call {
            name,
            args,
            correlation,
        } => {
            let args = parse_args(args);
            match cli.remote.as_deref() {
                Some(base) => call_remote(&cli, base, name, &args, correlation.as_deref()),
                None => call_local(&cli, name, &args, correlation.as_deref()),
            }
        }
        Commands::Status => {
            let Some(base) = cli.remote.as_deref() else {
                eprintln!("Error: status requires --remote");
                process::exit(2);
            };
            let body = remote_get(base, "/api/status");
            println!("{}", serde_json::to_string_pretty(&body["data"]).unwrap_or_default());
        }
    }
}
