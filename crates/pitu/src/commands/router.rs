//! `pitu router`: one-off router operations using the configured
//! credentials.

use std::time::Duration;

use pitu_core::RedactionRuleSet;
use pitu_router::{RouterClient, TransportConfig};

use crate::cli::{GlobalOpts, RouterArgs, RouterCommand};
use crate::commands::load_config;
use crate::error::CliError;

pub async fn handle(args: RouterArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = load_config(global)?;
    let url = pitu_config::router_url(&cfg.router)?;
    let password = pitu_config::resolve_router_password(&cfg.router)?;

    let transport =
        TransportConfig::default().with_timeout(Duration::from_secs(cfg.router.timeout_secs));
    let client = RouterClient::new(url, &transport)?;
    client.login(&password).await?;

    match args.command {
        RouterCommand::Status { json } => {
            let status = client.status().await?;
            if json {
                let sanitized = RedactionRuleSet::router_telemetry().sanitize(status.as_json())?;
                println!("{}", serde_json::to_string_pretty(&sanitized)?);
            } else {
                let link = status.wwan_connection().unwrap_or("unknown");
                println!("router: {}", client.base_url());
                println!("link:   {link}");
            }
        }
        RouterCommand::Reconnect => {
            client.reconnect().await?;
            println!("reconnect requested");
        }
    }
    Ok(())
}
