//! Wires argument parsing, logging and the axum server together, matching
//! the teacher's `autopilot::start`/`run_with` split: a thin `main.rs` calls
//! [`start`], which is also the entry point integration tests drive
//! directly instead of spawning a subprocess.

use {
    crate::{api, cli, config, observability::DropCounters},
    clap::Parser,
    std::sync::Arc,
    tokio::sync::oneshot,
    tracing_subscriber::{prelude::*, EnvFilter},
};

pub async fn start(args: impl IntoIterator<Item = String>) {
    run(args, None).await;
}

/// `bind` reports the address actually bound once the listener is ready,
/// letting tests bind to an ephemeral port (`0.0.0.0:0`) and discover it.
pub async fn run(args: impl IntoIterator<Item = String>, bind: Option<oneshot::Sender<std::net::SocketAddr>>) {
    let args = cli::Args::parse_from(args);
    let drop_counters = DropCounters::default();
    init_tracing(drop_counters.clone());

    let config = match config::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(%err, "failed to load configuration");
            std::process::exit(1);
        }
    };
    tracing::info!(?config, "starting solver");

    let pathfinder_config = pathfinder::Config {
        max_hops: config.max_hops,
        intermediary_tokens: config.intermediary_tokens.clone(),
        gas_base: config.gas_base,
        gas_per_extra_hop: config.gas_per_extra_hop,
        // Overridden per request with the auction's own gas price; this
        // template value is never used directly.
        gas_price: eth::GasPrice(alloy_primitives::U256::ZERO),
    };
    let aggregator = oracle::Aggregator::new(
        Vec::new(),
        config.oracle_timeout,
        config.oracle_coverage_threshold,
        config.oracle_batch_concurrency,
    );
    let driver = Arc::new(solver_core::Driver::new(Arc::new(aggregator), pathfinder_config, config.deadline));

    let state = api::AppState { driver, deadline: config.deadline, drop_counters };
    let app = api::router(state);

    let listen_addr = args.bind_addr.unwrap_or(config.listen_addr);
    let listener = match tokio::net::TcpListener::bind(listen_addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(%err, %listen_addr, "failed to bind");
            std::process::exit(1);
        }
    };
    let actual_addr = listener.local_addr().expect("bound listener has a local address");
    tracing::info!(addr = %actual_addr, "serving solver");
    if let Some(bind) = bind {
        let _ = bind.send(actual_addr);
    }

    if let Err(err) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(%err, "server error");
        std::process::exit(1);
    }
}

fn init_tracing(drop_counters: DropCounters) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(drop_counters)
        .try_init();
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};
    let mut interrupt = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");
    let mut terminate = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    tokio::select! {
        _ = interrupt.recv() => (),
        _ = terminate.recv() => (),
    };
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
