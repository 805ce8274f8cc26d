use anyhow::Context;
use clap::Parser;
use pingball_server::admin::{run_admin, AdminConsole};
use pingball_server::config::ServerConfig;
use pingball_server::status::status_router;
use pingball_shared::config::DEFAULT_PORT;
use tokio::io::BufReader;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "pingball-server", about = "Relay server for networked pingball boards")]
struct Args {
    /// TCP port boards connect to
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Serve the registry as JSON on this port (GET /status)
    #[arg(long)]
    status_port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = ServerConfig {
        listen_addr: format!("0.0.0.0:{}", args.port),
        status_addr: args.status_port.map(|p| format!("0.0.0.0:{p}")),
        ..ServerConfig::default()
    };

    if let Err(e) = config.validate() {
        anyhow::bail!("Invalid server configuration: {e}");
    }

    let listener = TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("could not listen on {}", config.listen_addr))?;
    let handle = pingball_server::start(listener, &config)?;
    tracing::info!("Pingball server listening on {}", handle.local_addr);

    let console = AdminConsole::new()?;
    tokio::spawn(run_admin(
        BufReader::new(tokio::io::stdin()),
        console,
        handle.router_tx.clone(),
        handle.snapshot_rx.clone(),
    ));

    if let Some(status_addr) = &config.status_addr {
        let status_listener = TcpListener::bind(status_addr)
            .await
            .with_context(|| format!("could not listen on {status_addr}"))?;
        tracing::info!("Status endpoint on http://{status_addr}/status");
        let app = status_router(handle.snapshot_rx.clone());
        tokio::spawn(async move {
            if let Err(e) = axum::serve(status_listener, app).await {
                tracing::error!("status server failed: {e}");
            }
        });
    }

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("failed to wait for ctrl-c")?;
            tracing::info!("Shutting down");
        }
        result = handle.accept_task => {
            result.context("accept loop ended")?;
        }
    }
    Ok(())
}
