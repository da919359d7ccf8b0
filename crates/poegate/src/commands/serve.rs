//! `poegate serve`: run the webhook server until a shutdown signal.

use std::sync::Arc;

use poegate_config::{config_path, load_config};
use poegate_core::{PowerController, UnifiActuator};
use tracing::{info, warn};

use poegate::server::{AppState, build_router};

use crate::cli::{GlobalOpts, ServeArgs};
use crate::error::CliError;

pub async fn handle(args: ServeArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let path = config_path(global.config.as_deref());
    let mut file = load_config(&path)?;
    if let Some(host) = args.host {
        file.webhook.host = host;
    }
    if let Some(port) = args.port {
        file.webhook.port = port;
    }
    let settings = file.resolve()?;
    let addr = settings.server.bind_addr()?;

    let actuator = UnifiActuator::from_config(&settings.switch)?;
    match actuator.device().await {
        Ok(device) => info!(device = %device.name, model = %device.model, "switch reachable"),
        Err(e) => warn!(error = %e, "switch lookup failed; serving anyway"),
    }

    let port_count = settings.registry.len();
    let controller =
        PowerController::new(settings.registry, settings.scheduler, Arc::new(actuator));
    controller.start().await;

    if settings.server.auth_token.is_none() {
        warn!("no webhook.auth_token configured; requests are not authenticated");
    }
    let state = AppState::new(controller.clone(), settings.server.auth_token);
    let app = build_router(state, settings.server.request_timeout);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| CliError::Bind { addr, source })?;
    info!(%addr, ports = port_count, config = %path.display(), "webhook server listening");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    controller.shutdown().await;
    info!("server shut down");
    served.map_err(CliError::from)
}

/// Resolves on Ctrl-C or, on unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("shutdown signal received");
}
