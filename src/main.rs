//! Gatehouse - network identity and access-control service

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gatehouse::{
    config::Args,
    crypto,
    db::{self, Driver},
    index::{spawn_index_task, SearchIndex},
    resolver::Resolver,
    server::{self, AppState},
    token::{self, TokenConfig},
    tree::Manager,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("gatehouse={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  Gatehouse - identity service");
    info!("======================================");
    info!("Listen: {}", args.listen);
    info!("Storage driver: {}", args.db_backend);
    info!("Crypto engine: {}", args.crypto_backend);
    info!("Token backend: {}", args.token_backend);
    info!(
        "Mode: {}{}",
        if args.insecure { "INSECURE" } else { "TLS" },
        if args.read_only { " (read-only)" } else { "" }
    );
    info!("======================================");

    gatehouse::register_builtins();
    gatehouse::startup::do_callbacks();

    // Storage, crypto, and token collaborators are all selected by name.
    let driver_opts = db::DriverOptions {
        data_dir: args.data_dir.clone(),
    };
    let database = match db::new(&args.db_backend, &driver_opts) {
        Ok(d) => d,
        Err(e) => {
            error!(
                "Unknown storage driver '{}' (available: {:?}): {}",
                args.db_backend,
                db::backend_list(),
                e
            );
            std::process::exit(1);
        }
    };

    let secret_engine = match crypto::new(&args.crypto_backend) {
        Ok(c) => c,
        Err(e) => {
            error!("Crypto engine init failed: {}", e);
            std::process::exit(1);
        }
    };

    let token_config = TokenConfig {
        secret: args.jwt_secret().unwrap_or_default(),
        lifetime_secs: args.token_lifetime_secs,
    };
    let token_service = match token::new(&args.token_backend, &token_config) {
        Ok(t) => t,
        Err(e) => {
            error!("Token backend init failed: {}", e);
            std::process::exit(1);
        }
    };
    let token_cache = match token::new_cache(&args.token_cache) {
        Ok(c) => c,
        Err(e) => {
            error!("Token cache init failed: {}", e);
            std::process::exit(1);
        }
    };

    // The manager materializes hooks and chains once; a failed required
    // chain check is fatal before the listener ever opens.
    let manager = match Manager::new(database.clone(), secret_engine) {
        Ok(m) => Arc::new(m),
        Err(e) => {
            error!("Processing engine init failed: {}", e);
            std::process::exit(1);
        }
    };

    // Search index follows the storage event stream.
    let index = Arc::new(SearchIndex::new());
    let _index_task = spawn_index_task(index.clone(), database.clone(), database.subscribe_events());

    // One-shot bootstrap, then latch either way.
    match args.bootstrap_parts() {
        Some((id, secret)) if !args.read_only => {
            manager.make_bootstrap(&id, &secret).await;
        }
        Some(_) => {
            warn!("Bootstrap requested on a read-only instance, ignoring");
            manager.disable_bootstrap();
        }
        None => manager.disable_bootstrap(),
    }

    let resolver = Arc::new(Resolver::new(database));

    let state = Arc::new(AppState {
        args: args.clone(),
        manager,
        resolver,
        index,
        token: token_service,
        token_cache,
    });

    if let Err(e) = server::run(state).await {
        error!("Server error: {:?}", e);
        std::process::exit(1);
    }

    Ok(())
}
