//! fincore executable: config load, logger init, pool connect, schema
//! apply, HTTP serve. Grounded on `ckb-bin`'s `run_app` — a process
//! entry point that's a thin function returning an exit code, not
//! panicking its way through startup.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use fincore_config::{Cli, Config};
use fincore_coordinator::Coordinator;
use fincore_db::Gateway;

/// The executable main entry. Never panics on a startup error — it logs
/// and returns a nonzero exit code instead, same as `ckb-bin::run_app`.
pub fn run() {
    std::process::exit(match run_app() {
        Ok(()) => 0,
        Err(code) => code,
    });
}

fn run_app() -> i32 {
    fincore_logger::init();

    let cli = Cli::parse();
    let config = match Config::load(&cli) {
        Ok(config) => config,
        Err(e) => {
            log::error!(target: "fincore_bin", "configuration error: {e}");
            return 1;
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            log::error!(target: "fincore_bin", "failed to start the async runtime: {e}");
            return 1;
        }
    };

    match runtime.block_on(serve(config)) {
        Ok(()) => 0,
        Err(e) => {
            log::error!(target: "fincore_bin", "{e}");
            1
        }
    }
}

async fn serve(config: Config) -> Result<(), String> {
    let bind_address: SocketAddr = config
        .bind_address
        .parse()
        .map_err(|e| format!("invalid bind address {:?}: {e}", config.bind_address))?;

    let gateway = Gateway::connect(&config.database_url, config.db_pool_size)
        .await
        .map_err(|e| format!("failed to connect to the database: {e}"))?;
    gateway.apply_schema().await.map_err(|e| format!("failed to apply schema: {e}"))?;

    let coordinator = Arc::new(Coordinator::new(gateway));
    let config = Arc::new(config);
    let app = fincore_api::router(fincore_api::AppState::new(coordinator, Arc::clone(&config)));

    let listener = tokio::net::TcpListener::bind(bind_address)
        .await
        .map_err(|e| format!("failed to bind {bind_address}: {e}"))?;
    log::info!(target: "fincore_bin", "listening on {bind_address}");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .map_err(|e| format!("server error: {e}"))
}
