use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use pingball_client::config::ClientConfig;
use pingball_client::connection::ServerConnection;
use pingball_client::parser::load_board;
use pingball_client::render::render;
use pingball_client::session::{pacing_delay, Session};
use pingball_shared::config::DEFAULT_PORT;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "pingball-client", about = "Play a Pingball board, alone or on a server")]
struct Args {
    /// Server host; omit for local play
    #[arg(long)]
    host: Option<String>,

    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Print the board every N ticks (a tick is at most 1 ms)
    #[arg(long, default_value_t = 50)]
    render_every: u32,

    /// Board file to load
    file: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = ClientConfig {
        host: args.host,
        port: args.port,
        board_file: args.file,
        render_every: args.render_every,
    };
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid client configuration: {e}"))?;

    let board = load_board(&config.board_file)?;
    tracing::info!(board = board.name(), "loaded {}", config.board_file.display());

    let (mut session, connection) = match config.server_addr() {
        Some(addr) => {
            let (connection, inbox) = ServerConnection::connect(addr.clone(), board.name())
                .with_context(|| format!("joining {addr}"))?;
            (Session::new(board, inbox), Some(connection))
        }
        None => (Session::local(board), None),
    };

    let mut stdout = std::io::stdout().lock();
    let mut ticks: u64 = 0;
    let started = Instant::now();
    loop {
        let outcome = session.tick()?;
        if let Some(connection) = &connection {
            for msg in outcome.outbound {
                connection.send(msg);
            }
        }

        ticks += 1;
        if ticks % u64::from(config.render_every) == 0 {
            write!(stdout, "{}", render(session.board()))?;
            stdout.flush()?;
        }
        if let Some(wait) = pacing_delay(session.board().clock(), started.elapsed()) {
            std::thread::sleep(wait);
        }
    }
}
