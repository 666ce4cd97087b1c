//! `correlog run` — start the demo service.
//!
//! Installs JSON (or pretty) logging for the service, builds the router
//! with the correlation layer, and serves until Ctrl+C / SIGTERM.

use std::net::SocketAddr;
use std::sync::Arc;

use crate::cli::RunArgs;
use crate::error::CorrelogError;
use crate::logging::{self, LoggingConfig};
use crate::server::{self, AppState};

pub async fn execute(args: RunArgs) -> Result<(), CorrelogError> {
    let config = LoggingConfig {
        service: args.service.clone(),
        level: args.log_level,
        format: logging::resolve_format(args.pretty, args.json),
    };
    logging::init(&config)?;

    let state = Arc::new(AppState::new(args.service.clone(), args.upstream.clone()));
    let router = server::build_router(state, args.max_body);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(
        addr = %addr,
        upstream = args.upstream.as_ref().map(url::Url::as_str),
        "{} started",
        args.service
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(server::shutdown_signal())
        .await?;

    tracing::info!("{} stopped", args.service);
    Ok(())
}
