use clap::Parser;
use pulse_core::{Credentials, PulseConfig};
use tokio::sync::broadcast;
use tracing_subscriber::{fmt, EnvFilter};

use pulse_server::http::HttpState;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "pulse.toml")]
    config: String,

    #[arg(long)]
    health: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (dev convenience; production uses real env vars)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Init logging
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    // Load config
    let config = match PulseConfig::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", args.config, e);
            std::process::exit(1);
        }
    };

    // Probe credentials. Missing ones are warnings, not fatal: affected
    // endpoints answer 500 and name the variables.
    let credentials = Credentials::from_env();
    for name in credentials.missing_model() {
        tracing::warn!("{} is not set; analysis and chat will report it until it is", name);
    }
    for name in credentials.missing_store() {
        tracing::warn!("{} is not set; the library store is unreachable until it is", name);
    }

    let state = match HttpState::new(config, credentials) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to build API clients: {}", e);
            std::process::exit(1);
        }
    };

    if args.health {
        match &state.store {
            Some(store) => match store.count_posts().await {
                Ok(n) => println!("✅ store reachable: {} posts", n),
                Err(e) => {
                    println!("❌ store check failed: {}", e);
                    std::process::exit(1);
                }
            },
            None => {
                println!(
                    "❌ store unconfigured: set {}",
                    state.credentials.missing_store().join(", ")
                );
                std::process::exit(1);
            }
        }

        println!("✅ MarketerPulse health check passed");
        return Ok(());
    }

    let (tx, _rx) = broadcast::channel(1);
    let shutdown_tx = tx.clone();

    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to listen for Ctrl+C");
        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(());
    });

    pulse_server::http::start_http_server(state, tx.subscribe()).await?;

    Ok(())
}
