//! layerstack demo: run the seven-layer stack over loopback TCP.
//!
//! Default mode runs both ends in one process: a server thread accepts the
//! connection and echoes every request body back under an "OK" tag, while
//! the client sends a batch of generated requests and verifies each echo.
//! `--role server` / `--role client` split the two ends across processes.

mod config;
mod harness;
mod message_gen;

use config::{Config, Role};
use harness::{run_client, run_server, ShutdownToken};
use std::net::TcpListener;
use std::process::ExitCode;
use std::thread;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = match Config::from_args(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            eprintln!("try --help");
            return ExitCode::FAILURE;
        }
    };

    if config.print_config {
        config.print();
    }
    info!(seed = config.seed, "run is reproducible with --seed");

    let result = match config.role {
        Role::Demo => run_demo(&config),
        Role::Server => run_server_role(&config),
        Role::Client => run_client_role(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// Both ends in one process: server thread + client, then shutdown.
fn run_demo(config: &Config) -> Result<(), String> {
    let listener = TcpListener::bind((config.host.as_str(), config.port))
        .map_err(|e| format!("bind failed: {e}"))?;
    let port = listener
        .local_addr()
        .map_err(|e| format!("local_addr failed: {e}"))?
        .port();

    let token = ShutdownToken::new();
    let server_token = token.clone();
    let server_config = config.clone();
    let server = thread::spawn(move || run_server(listener, &server_config, &server_token));

    let client_result = run_client(config, port);

    // Stop accepting; the in-flight connection worker finishes on its own.
    token.trigger();
    let server_result = server
        .join()
        .map_err(|_| "server thread panicked".to_string())?;

    let metrics = client_result.map_err(|e| format!("client failed: {e}"))?;
    server_result.map_err(|e| format!("server failed: {e}"))?;

    println!("{}", metrics.report());
    Ok(())
}

fn run_server_role(config: &Config) -> Result<(), String> {
    let listener = TcpListener::bind((config.host.as_str(), config.port))
        .map_err(|e| format!("bind failed: {e}"))?;
    let token = ShutdownToken::new();
    run_server(listener, config, &token).map_err(|e| format!("server failed: {e}"))
}

fn run_client_role(config: &Config) -> Result<(), String> {
    let metrics = run_client(config, config.port).map_err(|e| format!("client failed: {e}"))?;
    println!("{}", metrics.report());
    Ok(())
}
