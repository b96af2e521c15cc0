//! Stands in for a real buzzer during development.
//!
//! Usage: `fake-buzzer <buzzer id, e.g. R3> [station address]`
//!
//! Every line typed on stdin is sent as a button press.

use std::time::Duration;

use anyhow::Context;
use buzzer_station::{
    engine::command::{parse_args, ArgKind},
    protocol::{
        message::EXPECTED_VERSION, Deserialize, DeserializeError, Message, Mode, Serialize,
    },
};
use tokio::{
    io::{AsyncWriteExt, BufReader, BufWriter},
    net::{tcp::OwnedWriteHalf, TcpStream},
    sync::mpsc,
};
use tracing_subscriber::EnvFilter;

const DEFAULT_STATION_ADDRESS: &str = "127.0.0.1:9753";
const HEARTBEAT_PERIOD: Duration = Duration::from_secs(1);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let id = args
        .next()
        .context("usage: fake-buzzer <buzzer id> [station address]")?;
    let id = parse_args(&id, &[ArgKind::Buzzer])?
        .buzzer(0)
        .context("not a buzzer id")?;
    let address = args
        .next()
        .unwrap_or_else(|| DEFAULT_STATION_ADDRESS.to_owned());

    let stream = TcpStream::connect(&address)
        .await
        .with_context(|| format!("failed to connect to {}", address))?;
    tracing::info!("connected to {} as {}", address, id);

    let (reader, writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut writer = BufWriter::new(writer);

    send(&mut writer, Message::Version(EXPECTED_VERSION)).await?;
    send(&mut writer, Message::Identify(id)).await?;

    let (presses, mut presses_rx) = mpsc::channel(16);
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            if line.is_err() || presses.blocking_send(()).is_err() {
                break;
            }
        }
    });

    let talk = async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_PERIOD);
        loop {
            let message = tokio::select! {
                _ = heartbeat.tick() => Message::Heartbeat,
                press = presses_rx.recv() => match press {
                    Some(()) => Message::ButtonPress,
                    None => return anyhow::Ok(()),
                },
            };

            send(&mut writer, message).await?;
        }
    };

    let listen = async move {
        loop {
            match Mode::deserialize(&mut reader).await {
                Ok(mode) => tracing::info!("led: {}, buzzer: {}", mode.led, mode.buzzer),
                Err(DeserializeError::NotAMode(byte)) => {
                    tracing::warn!("unexpected byte from the station: 0x{:02X}", byte)
                }
                Err(DeserializeError::Io(err)) => {
                    return Err::<(), _>(anyhow::Error::from(err).context("station went away"))
                }
            }
        }
    };

    tokio::select! {
        result = talk => result,
        result = listen => result,
    }
}

async fn send(writer: &mut BufWriter<OwnedWriteHalf>, message: Message) -> anyhow::Result<()> {
    message.serialize(writer).await?;
    writer.flush().await?;

    Ok(())
}
