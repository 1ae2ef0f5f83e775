use std::{net::SocketAddr, path::PathBuf, time::Duration};

use axum::http::Method;
use clap::Parser;
use miette::{IntoDiagnostic, Result};
use server::{api, info_for, AppState, SessionStore};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Serves the chat widget and its JSON API")]
struct Args {
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:3000")]
    bind: SocketAddr,
    /// Built frontend (trunk output) served for every non-API path.
    #[arg(long, env = "FRONTEND_DIST", default_value = "frontend/dist")]
    static_dir: PathBuf,
    /// Sessions unused for this many seconds are dropped.
    #[arg(long, env = "SESSION_IDLE_SECS", default_value_t = 3600)]
    session_idle_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = chatbot::Config::from_env()?;
    let controller = chatbot::build_controller(&config)?;

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(Any)
        .allow_origin(Any);

    let state = AppState::new(controller, info_for(&config));
    tokio::spawn(expire_sessions(
        state.sessions.clone(),
        Duration::from_secs(args.session_idle_secs),
    ));

    let app = api(state)
        .fallback_service(ServeDir::new(&args.static_dir))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    info!(
        addr = %args.bind,
        mode = config.mode.as_str(),
        static_dir = %args.static_dir.display(),
        "listening"
    );

    axum::Server::bind(&args.bind)
        .serve(app.into_make_service())
        .with_graceful_shutdown(async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("shutting down"),
                Err(error) => warn!(%error, "could not listen for ctrl-c"),
            }
        })
        .await
        .into_diagnostic()?;

    Ok(())
}

async fn expire_sessions(sessions: SessionStore, max_idle: Duration) {
    let mut tick = tokio::time::interval(Duration::from_secs(60));
    loop {
        tick.tick().await;
        let expired = sessions.expire_idle(max_idle);
        if expired > 0 {
            info!(expired, live = sessions.len(), "idle sessions dropped");
        }
    }
}
