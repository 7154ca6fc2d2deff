//! The `chexgate serve` command.

use crate::server::{self, AppState};
use chexgate_core::{Config, Gateway};
use clap::Args;

/// Arguments for the `serve` command.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Bind address (overrides `server.host`)
    #[arg(long)]
    pub host: Option<String>,

    /// Bind port (overrides `server.port` and `PORT`)
    #[arg(short, long)]
    pub port: Option<u16>,
}

/// Apply CLI overrides to the loaded config.
fn apply_overrides(config: &mut Config, args: &ServeArgs) {
    if let Some(host) = &args.host {
        config.server.host = host.clone();
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
}

/// Execute the serve command.
pub async fn execute(args: ServeArgs, mut config: Config) -> anyhow::Result<()> {
    apply_overrides(&mut config, &args);

    let gateway = Gateway::new(config)?;
    gateway.verify().await?;

    let config = gateway.config();
    tracing::info!(
        classifier = %config.classifier.endpoint,
        model = %config.chat.model,
        max_parallel = config.orchestrator.max_parallel,
        "Gateway ready"
    );

    let state = AppState {
        orchestrator: gateway.orchestrator(),
    };
    let router = server::build_router(state, &config.server);
    server::serve(router, &config.server.host, config.server.port).await
}
