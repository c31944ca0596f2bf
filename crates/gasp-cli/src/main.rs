//! `gasp` – demo binary for the gasp state-synchronization engine.
//!
//! 1. Loads `~/.gasp/config.toml` (writing the defaults on first run) and
//!    applies `GASP_*` environment overrides.
//! 2. Serves the demo form at the configured view path, with the WebSocket
//!    channel at `/gaspws`.
//! 3. Stops accepting connections on **Ctrl-C**.

mod config;
mod demo;

use std::sync::Arc;

use colored::Colorize;
use gasp_types::GaspError;
use tokio::sync::Notify;
use tracing::warn;

use config::Config;

fn main() {
    // ── Structured logging ────────────────────────────────────────────────
    // RUST_LOG selects the filter (default "info"); GASP_LOG_FORMAT=json
    // switches to newline-delimited JSON.
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    if std::env::var("GASP_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .compact()
            .init();
    }

    print_banner();

    let cfg = load_config();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            println!("{}: {}", "Failed to start async runtime".red(), e);
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(serve(cfg)) {
        println!("{}: {}", "Server error".red(), e);
        std::process::exit(1);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Config
// ─────────────────────────────────────────────────────────────────────────────

fn load_config() -> Config {
    match config::load() {
        Ok(Some(cfg)) => {
            println!(
                "  Config loaded from {}",
                config::config_path().display().to_string().bold()
            );
            cfg
        }
        Ok(None) => {
            match config::save(&Config::default()) {
                Ok(()) => println!(
                    "  {} Default config written to {}",
                    "✓".green().bold(),
                    config::config_path().display().to_string().bold()
                ),
                Err(e) => println!("{}: {}", "Error saving config".red(), e),
            }
            with_env(Config::default())
        }
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            with_env(Config::default())
        }
    }
}

fn with_env(mut cfg: Config) -> Config {
    config::apply_env_overrides(&mut cfg);
    cfg
}

// ─────────────────────────────────────────────────────────────────────────────
// Serve
// ─────────────────────────────────────────────────────────────────────────────

async fn serve(cfg: Config) -> Result<(), GaspError> {
    let mut server = demo::build(&cfg)?;
    let errors = server.take_errors();
    let bound = server.bind().await?;
    let addr = bound.local_addr()?;

    let view = if cfg.view_path.trim().starts_with('/') {
        cfg.view_path.trim().to_string()
    } else {
        format!("/{}", cfg.view_path.trim())
    };
    println!();
    println!("  Demo form at {}", format!("http://{addr}{view}").bold().cyan());
    println!("  Press {} to stop.\n", "Ctrl-C".bold());

    if let Some(mut errors) = errors {
        tokio::spawn(async move {
            while let Some(err) = errors.recv().await {
                println!("  {} {}", "!".yellow().bold(), err.to_string().dimmed());
            }
        });
    }

    let shutdown = Arc::new(Notify::new());
    let on_ctrlc = Arc::clone(&shutdown);
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – shutting down …".yellow().bold());
        on_ctrlc.notify_one();
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; stop the process another way");
    }

    bound.serve_until(async move { shutdown.notified().await }).await;
    println!("{}", "  ✓ Stopped accepting connections.".green());
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("{}", r#"   ____ _____ __________ "#.bold().cyan());
    println!("{}", r#"  / __ `/ __ `/ ___/ __ \"#.bold().cyan());
    println!("{}", r#" / /_/ / /_/ (__  ) /_/ /"#.bold().cyan());
    println!("{}", r#" \__, /\__,_/____/ .___/ "#.bold().cyan());
    println!("{}", r#"/____/           /_/     "#.bold().cyan());
    println!();
    println!(
        "  {} {}",
        "gasp".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Live control state synchronization");
    println!();
}
