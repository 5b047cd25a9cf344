//! Release API - Entry Point
//!
//! Serves the release step log, deploy webhooks and release upgrades for
//! Helm-managed applications.

use std::collections::HashMap;
use std::env;

use release_api::app::options::AppOptions;
use release_api::app::run::run;
use release_api::filesys::file::File;
use release_api::logs::{init_logging, LogOptions};
use release_api::storage::settings::{Settings, DEFAULT_SETTINGS_PATH};
use release_api::utils::version_info;

use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut cli_args: HashMap<String, String> = HashMap::new();

    for arg in args.iter().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            // Handle --key=value format
            let clean_key = key.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), value.to_string());
        } else if arg.starts_with("--") {
            // Handle standalone flags like --version
            let clean_key = arg.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), "true".to_string());
        }
    }

    // Print version and exit
    let version = version_info();
    if cli_args.contains_key("version") {
        match serde_json::to_string_pretty(&version) {
            Ok(json) => println!("{}", json),
            Err(_) => println!("{}", version.version),
        }
        return;
    }

    // Retrieve the settings file
    let settings_path = cli_args
        .get("config")
        .cloned()
        .unwrap_or_else(|| DEFAULT_SETTINGS_PATH.to_string());
    let settings = match Settings::load(&File::new(&settings_path)).await {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Unable to read settings file {}: {}", settings_path, e);
            return;
        }
    };

    // Initialize logging
    let log_options = LogOptions {
        log_level: settings.log_level.clone(),
        log_dir: settings.log_dir.clone(),
        json_format: settings.log_json,
        ..Default::default()
    };
    let _log_guard = match init_logging(log_options) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            None
        }
    };

    // Run the server
    let options = AppOptions::from_settings(&settings);
    info!(
        "Running release API {} on {}:{} (helm gateway: {}, ci bridge: {})",
        version.version,
        options.server.host,
        options.server.port,
        options.helm_gateway.base_url,
        options.ci.base_url
    );
    if let Err(e) = run(options, await_shutdown_signal()).await {
        error!("Failed to run the release API: {e}");
    }
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let (mut sigterm, mut sigint) =
            match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
                _ => {
                    error!("Failed to install signal handlers, falling back to Ctrl+C");
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down...");
            }
            _ = sigint.recv() => {
                info!("SIGINT received, shutting down...");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl+C received, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("Ctrl+C received, shutting down...");
    }
}
