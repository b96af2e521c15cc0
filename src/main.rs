use std::time::Duration;

use buzzer_station::{buzzer, engine::Engine, logging, systems};
use tokio::{net::TcpListener, sync::mpsc};

const DEFAULT_LISTEN_ADDRESS: &str = "0.0.0.0:9753";
const COMMAND_BUFFER_SIZE: usize = 16;
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init(&logging::LogFiles::from_env());

    let (presses, presses_rx) = mpsc::unbounded_channel();
    let scoreboard = systems::scoreboard::System::start();
    let swarm = systems::swarm::System::start(presses);
    let engine = Engine::new(swarm.clone(), scoreboard);

    let address = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_LISTEN_ADDRESS.to_owned());
    let listener = TcpListener::bind(&address).await?;
    println!("Server listening on: {}", listener.local_addr()?);

    tokio::spawn(async move {
        loop {
            let (conn, peer) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(err) => {
                    tracing::error!("failed to accept a connection: {}", err);
                    // e.g. out of file descriptors, give connections a chance to close
                    tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                    continue;
                }
            };

            tracing::debug!(target: logging::BUZZER_LOG, "connection from {}", peer);
            let swarm = swarm.clone();
            tokio::spawn(async move {
                match buzzer::handle(conn, swarm).await {
                    Ok(()) => {}
                    Err(err) if err.is_protocol_violation() => tracing::warn!(
                        target: logging::BUZZER_LOG,
                        "protocol violation from {}: {}",
                        peer,
                        err
                    ),
                    Err(err) => tracing::info!(
                        target: logging::BUZZER_LOG,
                        "connection from {} closed: {}",
                        peer,
                        err
                    ),
                }
            });
        }
    });

    // a plain thread, so a pending read never holds up shutdown
    let (lines, lines_rx) = mpsc::channel(COMMAND_BUFFER_SIZE);
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    tracing::error!("failed to read the command line: {}", err);
                    break;
                }
            };

            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if lines.blocking_send(line.to_owned()).is_err() {
                break;
            }
        }
    });

    println!("Type ? for help");
    tokio::select! {
        _ = engine.run(lines_rx, presses_rx) => {}
        result = tokio::signal::ctrl_c() => result?,
    }

    println!("Shutting down");
    Ok(())
}
