//! `pitu serve`: run the gateway until interrupted.

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use pitu_bus::LocalBus;
use pitu_core::Gateway;

use crate::cli::{GlobalOpts, ServeArgs};
use crate::commands::load_config;
use crate::error::CliError;

pub async fn handle(args: ServeArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut cfg = load_config(global)?;
    if let Some(listen) = args.listen {
        cfg.bridge.listen = listen;
    }
    let gateway_config = pitu_config::to_gateway_config(&cfg, !args.no_poller)?;

    let bus = LocalBus::new();
    let cancel = CancellationToken::new();
    let gateway = Gateway::start(bus.clone(), &gateway_config, cancel.clone()).await?;

    tokio::spawn(async move {
        shutdown_signal().await;
        info!("shutdown requested");
        cancel.cancel();
    });

    let outcome = gateway.wait().await;
    bus.close();
    outcome.map_err(CliError::from)
}

/// Resolve on Ctrl-C, or SIGTERM where available.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
