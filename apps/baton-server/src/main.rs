use std::net::SocketAddr;

use anyhow::Context;
use clap::Parser;

use baton_config::Config;

#[derive(Debug, Parser)]
#[command(name = "baton-server", about = "Planner/executor/verifier tool runner")]
struct Args {
    /// Listen port
    #[arg(long, env = "PORT", default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();
    let mut config = Config::from_env();
    config.port = args.port;

    let state = baton_server::build_state(&config);
    let app = baton_server::build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("bind server listener failed")?;
    tracing::info!(%addr, "baton-server listening");
    axum::serve(listener, app)
        .await
        .context("server terminated with error")
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}
