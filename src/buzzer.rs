use std::sync::atomic::{self, AtomicU64};

use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter},
    sync::{mpsc, watch},
};

use crate::{
    id::BuzzerId,
    logging::BUZZER_LOG,
    protocol::{
        message::EXPECTED_VERSION, Deserialize, DeserializeError, Message, Mode, Serialize,
        SerializeError,
    },
    systems::swarm,
};

static NEW_CONNECTION_ID: AtomicU64 = AtomicU64::new(0);

/// Tells apart successive connections made by the same buzzer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

#[derive(thiserror::Error, Debug)]
pub enum ConnectionError {
    #[error("{0}")]
    Deserialize(#[from] DeserializeError),

    #[error("{0}")]
    Serialize(#[from] SerializeError),

    #[error("{0}")]
    Io(#[from] tokio::io::Error),

    #[error("expected {expected} during handshake, got 0x{:02X}", .got.encode())]
    Handshake {
        expected: &'static str,
        got: Message,
    },

    #[error("disconnected by the station")]
    Closed,
}

impl ConnectionError {
    /// Whether the peer broke the protocol, as opposed to just going away
    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, Self::Handshake { .. })
    }
}

/// The swarm's handle on a live buzzer connection
#[derive(Debug)]
pub struct BuzzerHandle {
    id: BuzzerId,
    connection: ConnectionId,
    version: u8,
    outgoing: mpsc::UnboundedSender<Mode>,
    closed: watch::Sender<bool>,
}

impl BuzzerHandle {
    /// Creates a handle along with the receiving ends the connection task listens on
    pub(crate) fn new(
        id: BuzzerId,
        version: u8,
    ) -> (Self, mpsc::UnboundedReceiver<Mode>, watch::Receiver<bool>) {
        let (outgoing, outgoing_rx) = mpsc::unbounded_channel();
        let (closed, closed_rx) = watch::channel(false);

        let handle = Self {
            id,
            connection: ConnectionId(NEW_CONNECTION_ID.fetch_add(1, atomic::Ordering::SeqCst)),
            version,
            outgoing,
            closed,
        };

        (handle, outgoing_rx, closed_rx)
    }

    pub fn id(&self) -> BuzzerId {
        self.id
    }

    pub fn connection(&self) -> ConnectionId {
        self.connection
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    /// Queues a mode change, never waits on the network
    pub fn set_mode(&self, mode: Mode) {
        if self.outgoing.send(mode).is_err() {
            tracing::debug!("dropped mode {:?} for closed connection to {}", mode, self.id);
        }
    }

    /// Closes the connection, the swarm is told once the connection task winds down
    pub fn disconnect(&self) {
        self.closed.send_replace(true);
    }
}

/// Runs a single buzzer connection until it closes
///
/// the handshake must complete before the buzzer is registered with the swarm;
/// after that, incoming messages and outgoing modes are handled concurrently
/// until either side fails or the swarm asks for a disconnect.
pub async fn handle<S>(stream: S, swarm: swarm::Handler) -> Result<(), ConnectionError>
where
    S: AsyncRead + AsyncWrite + Send + Unpin,
{
    let (reader, writer) = tokio::io::split(stream);
    let mut reader = BufReader::new(reader);
    let writer = BufWriter::new(writer);

    let (id, version) = handshake(&mut reader).await?;
    if version == EXPECTED_VERSION {
        tracing::info!(target: BUZZER_LOG, "found buzzer {} (v:{})", id, version);
    } else {
        tracing::warn!(
            target: BUZZER_LOG,
            "found buzzer {} with unexpected version {}",
            id,
            version
        );
    }

    let (handle, outgoing, closed) = BuzzerHandle::new(id, version);
    let connection = handle.connection();
    swarm.new_buzzer(handle).await;

    let result = tokio::select! {
        result = from_buzzer(&mut reader, id, &swarm) => result,
        result = to_buzzer(writer, outgoing) => result,
        _ = closed_by_station(closed) => Err(ConnectionError::Closed),
    };

    swarm.disconnected(id, connection).await;

    result
}

async fn handshake<R>(reader: &mut R) -> Result<(BuzzerId, u8), ConnectionError>
where
    R: AsyncReadExt + Unpin + Send,
{
    let version = match Message::deserialize(reader).await? {
        Message::Version(version) => version,
        got => {
            return Err(ConnectionError::Handshake {
                expected: "version",
                got,
            })
        }
    };

    let id = match Message::deserialize(reader).await? {
        Message::Identify(id) => id,
        got => {
            return Err(ConnectionError::Handshake {
                expected: "id",
                got,
            })
        }
    };

    Ok((id, version))
}

// handle incoming messages from the buzzer
async fn from_buzzer<R>(
    reader: &mut R,
    id: BuzzerId,
    swarm: &swarm::Handler,
) -> Result<(), ConnectionError>
where
    R: AsyncReadExt + Unpin + Send,
{
    loop {
        let message = Message::deserialize(reader).await?;

        // any message at all shows the buzzer is alive
        swarm.received(id).await;

        match message {
            Message::Heartbeat => {}
            Message::ButtonPress => {
                tracing::debug!("button press from {}", id);
                swarm.button_press(id).await;
            }
            Message::Error => {
                tracing::warn!(target: BUZZER_LOG, "buzzer {} reported an error", id)
            }
            other => tracing::warn!(
                "unrecognised message 0x{:02X} received from {}",
                other.encode(),
                id
            ),
        }
    }
}

// also resolves if the swarm dropped the handle
async fn closed_by_station(mut closed: watch::Receiver<bool>) {
    let _ = closed.wait_for(|closed| *closed).await;
}

// forward queued modes to the buzzer, one at a time
async fn to_buzzer<W>(
    mut writer: W,
    mut outgoing: mpsc::UnboundedReceiver<Mode>,
) -> Result<(), ConnectionError>
where
    W: AsyncWriteExt + Unpin + Send,
{
    while let Some(mode) = outgoing.recv().await {
        mode.serialize(&mut writer).await?;
        writer.flush().await?;
    }

    // the swarm let go of this connection
    Err(ConnectionError::Closed)
}

#[cfg(test)]
mod tests {
    use std::{
        io,
        pin::Pin,
        task::{Context, Poll},
        time::Duration,
    };

    use tokio::{
        io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, DuplexStream, ReadBuf},
        sync::mpsc,
    };

    use super::{handle, BuzzerHandle, ConnectionError};
    use crate::{
        id::{BuzzerId, Team},
        protocol::{Message, Mode},
        systems::swarm,
    };

    #[tokio::test]
    async fn handshake_then_traffic() {
        let (presses, mut pressed) = mpsc::unbounded_channel();
        let swarm = swarm::System::start(presses);

        let (station_side, mut buzzer) = tokio::io::duplex(64);
        let connection = tokio::spawn(handle(station_side, swarm.clone()));

        buzzer.write_all(b"\x04\x85\x31\x30").await.unwrap();
        assert_eq!(pressed.recv().await, Some(BuzzerId::new(Team::BLUE, 5)));

        // the buzzer is now known and reachable
        assert!(swarm.set_mode(BuzzerId::from_raw(5), Mode::LED).await);
        assert_eq!(buzzer.read_u8().await.unwrap(), 0x21);

        let stats = swarm.stats().await;
        assert_eq!(stats.rows.len(), 1);
        assert!(stats.rows[0].online);

        // an unknown byte is logged, not fatal
        buzzer.write_all(b"\x22\x30").await.unwrap();
        assert_eq!(pressed.recv().await, Some(BuzzerId::new(Team::BLUE, 5)));

        drop(buzzer);
        let err = connection.await.unwrap().unwrap_err();
        assert!(matches!(err, ConnectionError::Deserialize(_)));
        assert!(!err.is_protocol_violation());

        let stats = swarm.stats().await;
        assert!(!stats.rows[0].online);
        assert!(!swarm.set_mode(BuzzerId::from_raw(5), Mode::LED).await);
    }

    #[tokio::test]
    async fn out_of_order_handshake() {
        let (presses, _pressed) = mpsc::unbounded_channel();
        let swarm = swarm::System::start(presses);

        let (station_side, mut buzzer) = tokio::io::duplex(64);
        let connection = tokio::spawn(handle(station_side, swarm.clone()));

        buzzer.write_all(b"\x85\x04").await.unwrap();
        let err = connection.await.unwrap().unwrap_err();
        assert!(err.is_protocol_violation());
        assert!(matches!(
            err,
            ConnectionError::Handshake {
                expected: "version",
                got: Message::Identify(_)
            }
        ));

        let (station_side, mut buzzer) = tokio::io::duplex(64);
        let connection = tokio::spawn(handle(station_side, swarm.clone()));

        buzzer.write_all(b"\x04\x30").await.unwrap();
        assert!(matches!(
            connection.await.unwrap(),
            Err(ConnectionError::Handshake {
                expected: "id",
                got: Message::ButtonPress
            })
        ));

        // neither attempt was registered
        assert!(swarm.stats().await.rows.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn silent_buzzer_is_dropped() {
        let (presses, _pressed) = mpsc::unbounded_channel();
        let swarm = swarm::System::start(presses);

        let (station_side, mut buzzer) = tokio::io::duplex(64);
        let connection = tokio::spawn(handle(station_side, swarm.clone()));
        buzzer.write_all(b"\x04\x92").await.unwrap();

        tokio::time::sleep(Duration::from_secs(7)).await;

        // the station closed its side
        let mut rest = vec![];
        assert_eq!(buzzer.read_to_end(&mut rest).await.unwrap(), 0);
        assert!(matches!(
            connection.await.unwrap(),
            Err(ConnectionError::Closed)
        ));
        assert!(!swarm.stats().await.rows[0].online);
    }

    // a socket whose directions can be closed independently
    struct HalfClosable {
        incoming: DuplexStream,
        outgoing: DuplexStream,
    }

    impl AsyncRead for HalfClosable {
        fn poll_read(
            self: Pin<&mut Self>,
            cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            Pin::new(&mut self.get_mut().incoming).poll_read(cx, buf)
        }
    }

    impl AsyncWrite for HalfClosable {
        fn poll_write(
            self: Pin<&mut Self>,
            cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            Pin::new(&mut self.get_mut().outgoing).poll_write(cx, buf)
        }

        fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Pin::new(&mut self.get_mut().outgoing).poll_flush(cx)
        }

        fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Pin::new(&mut self.get_mut().outgoing).poll_shutdown(cx)
        }
    }

    #[tokio::test]
    async fn modes_arrive_in_order_until_writing_fails() {
        let (presses, mut pressed) = mpsc::unbounded_channel();
        let swarm = swarm::System::start(presses);

        let (incoming, mut to_station) = tokio::io::duplex(64);
        let (outgoing, mut from_station) = tokio::io::duplex(64);
        let connection = tokio::spawn(handle(HalfClosable { incoming, outgoing }, swarm.clone()));

        let id = BuzzerId::new(Team::YELLOW, 1);
        to_station.write_all(b"\x04\xb1\x30").await.unwrap();
        assert_eq!(pressed.recv().await, Some(id));

        for mode in [Mode::ON, Mode::LED, Mode::OFF, Mode::new(false, true)] {
            assert!(swarm.set_mode(id, mode).await);
        }
        let mut sent = [0; 4];
        from_station.read_exact(&mut sent).await.unwrap();
        assert_eq!(sent, [0x23, 0x21, 0x20, 0x22]);

        // the buzzer stops listening but keeps its sending side open
        drop(from_station);
        assert!(swarm.set_mode(id, Mode::ON).await);
        assert!(matches!(
            connection.await.unwrap(),
            Err(ConnectionError::Io(_) | ConnectionError::Serialize(_))
        ));

        assert!(!swarm.stats().await.rows[0].online);
        assert!(!swarm.set_mode(id, Mode::ON).await);
        drop(to_station);
    }

    #[test]
    fn handle_disconnect_is_idempotent() {
        let (handle, _outgoing, closed) = BuzzerHandle::new(BuzzerId::from_raw(0x10), 4);
        assert!(!*closed.borrow());

        handle.disconnect();
        handle.disconnect();
        assert!(*closed.borrow());
    }
}
