//! Registry and health monitor for every buzzer the station has seen.
//!
//! A record is created the first time a buzzer completes its handshake and is
//! kept for the life of the process, so slow-message stats survive power cycles.
//! Stats are kept both for the current connection session and in total, which
//! makes it possible to tell whether a power cycle fixed a misbehaving buzzer.

use std::{collections::BTreeMap, fmt, time::Duration};

use tokio::{
    sync::{mpsc, oneshot},
    time::Instant,
};

use crate::{
    buzzer::{BuzzerHandle, ConnectionId},
    id::BuzzerId,
    logging::BUZZER_LOG,
    protocol::Mode,
};

// every connection reports every byte it receives through here,
// so the buffer needs to absorb bursts from the whole swarm
const SYSTEM_BUFFER_SIZE: usize = 1000;

const HEALTH_CHECK_PERIOD: Duration = Duration::from_secs(1);
const SILENCE_LIMIT: Duration = Duration::from_secs(5);
const SLOW_2S: Duration = Duration::from_secs(2);
const SLOW_3S: Duration = Duration::from_secs(3);

#[derive(Debug)]
enum InternalMessage {
    NewBuzzer(BuzzerHandle),
    Disconnected(BuzzerId, ConnectionId),
    Received(BuzzerId),
    ButtonPress(BuzzerId),
    SetMode(BuzzerId, Mode, oneshot::Sender<bool>),
    SetModeAll(Mode),
    Mute(BuzzerId, bool),
    UnmuteAll,
    Stats(oneshot::Sender<StatsReport>),
}

/// Counts of messages that arrived later than expected
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SlowCounts {
    pub session_2s: u32,
    pub session_3s: u32,
    pub total_2s: u32,
    pub total_3s: u32,
}

impl std::ops::AddAssign for SlowCounts {
    fn add_assign(&mut self, other: Self) {
        self.session_2s += other.session_2s;
        self.session_3s += other.session_3s;
        self.total_2s += other.total_2s;
        self.total_3s += other.total_3s;
    }
}

#[derive(Debug)]
struct Record {
    // None while the buzzer is disconnected
    buzzer: Option<BuzzerHandle>,
    muted: bool,
    last_message: Instant,
    slow: SlowCounts,
}

impl Record {
    fn online(&self) -> bool {
        self.buzzer.is_some()
    }

    /// Sends a mode to the buzzer if it's connected, honouring the mute flag
    fn send(&self, mode: Mode) -> bool {
        let Some(buzzer) = &self.buzzer else {
            return false;
        };

        buzzer.set_mode(if self.muted { mode.muted() } else { mode });
        true
    }
}

pub struct System {
    records: BTreeMap<BuzzerId, Record>,
    presses: mpsc::UnboundedSender<BuzzerId>,
}

impl System {
    /// Starts a new swarm
    ///
    /// button presses from every buzzer are forwarded to `presses`.
    /// returns an handler that can be used to control the swarm
    ///
    /// note: this function needs to be called from inside a tokio runtime context
    pub fn start(presses: mpsc::UnboundedSender<BuzzerId>) -> Handler {
        let (tx, mut rx) = mpsc::channel(SYSTEM_BUFFER_SIZE);

        let mut this = Self::new(presses);
        tokio::spawn(async move {
            let mut health_check = tokio::time::interval(HEALTH_CHECK_PERIOD);

            loop {
                tokio::select! {
                    message = rx.recv() => match message {
                        Some(message) => this.handle_message(message, Instant::now()),
                        // every handler is gone
                        None => break,
                    },
                    _ = health_check.tick() => this.check_health(Instant::now()),
                }
            }
        });

        Handler { sender: tx }
    }

    fn new(presses: mpsc::UnboundedSender<BuzzerId>) -> Self {
        Self {
            records: BTreeMap::default(),
            presses,
        }
    }

    fn handle_message(&mut self, message: InternalMessage, now: Instant) {
        match message {
            InternalMessage::NewBuzzer(buzzer) => self.new_buzzer(buzzer, now),
            InternalMessage::Disconnected(id, connection) => self.disconnected(id, connection),
            InternalMessage::Received(id) => self.received(id, now),
            InternalMessage::ButtonPress(id) => {
                // the engine going away means we're shutting down
                let _ = self.presses.send(id);
            }
            InternalMessage::SetMode(id, mode, response) => {
                let _ = response.send(self.set_mode(id, mode));
            }
            InternalMessage::SetModeAll(mode) => self.set_mode_all(mode),
            InternalMessage::Mute(id, muted) => self.mute(id, muted),
            InternalMessage::UnmuteAll => self.unmute_all(),
            InternalMessage::Stats(response) => {
                let _ = response.send(self.stats());
            }
        }
    }

    fn new_buzzer(&mut self, buzzer: BuzzerHandle, now: Instant) {
        let id = buzzer.id();

        if self.records.contains_key(&id) {
            tracing::info!(target: BUZZER_LOG, "buzzer {} reconnected", id);
        } else {
            tracing::info!(target: BUZZER_LOG, "buzzer {} connected for the first time", id);
        }

        let record = self.records.entry(id).or_insert_with(|| Record {
            buzzer: None,
            muted: false,
            last_message: now,
            slow: SlowCounts::default(),
        });

        if let Some(old) = record.buzzer.replace(buzzer) {
            tracing::warn!(
                target: BUZZER_LOG,
                "buzzer {} connected again before its last connection closed, dropping the old one",
                id
            );
            old.disconnect();
        }

        record.last_message = now;
        record.slow.session_2s = 0;
        record.slow.session_3s = 0;
    }

    fn disconnected(&mut self, id: BuzzerId, connection: ConnectionId) {
        let Some(record) = self.records.get_mut(&id) else {
            return;
        };

        // a newer connection may have already taken its place
        if record.buzzer.as_ref().map(BuzzerHandle::connection) != Some(connection) {
            return;
        }

        record.buzzer = None;
        tracing::info!(target: BUZZER_LOG, "buzzer {} disconnected", id);
    }

    fn received(&mut self, id: BuzzerId, now: Instant) {
        let Some(record) = self.records.get_mut(&id) else {
            return;
        };

        let gap = now.saturating_duration_since(record.last_message);
        record.last_message = now;

        if gap > SLOW_3S {
            record.slow.session_3s += 1;
            record.slow.total_3s += 1;
        } else if gap > SLOW_2S {
            record.slow.session_2s += 1;
            record.slow.total_2s += 1;
        } else {
            return;
        }

        tracing::info!(target: BUZZER_LOG, "slow message from {}: {:?}", id, gap);
    }

    fn set_mode(&self, id: BuzzerId, mode: Mode) -> bool {
        self.records
            .get(&id)
            .map_or(false, |record| record.send(mode))
    }

    fn set_mode_all(&self, mode: Mode) {
        for record in self.records.values() {
            record.send(mode);
        }
    }

    fn mute(&mut self, id: BuzzerId, muted: bool) {
        let Some(record) = self.records.get_mut(&id) else {
            tracing::warn!("can't change mute on unknown buzzer {}", id);
            return;
        };

        record.muted = muted;
        if muted {
            tracing::info!(target: BUZZER_LOG, "buzzer {} muted", id);
        } else {
            tracing::info!(target: BUZZER_LOG, "buzzer {} unmuted", id);
        }
    }

    fn unmute_all(&mut self) {
        for record in self.records.values_mut() {
            record.muted = false;
        }

        tracing::info!(target: BUZZER_LOG, "all buzzers unmuted");
    }

    // drop every connection we haven't heard from in a while
    fn check_health(&self, now: Instant) {
        for (id, record) in self.records.iter() {
            let Some(buzzer) = &record.buzzer else {
                continue;
            };

            let silence = now.saturating_duration_since(record.last_message);
            if silence > SILENCE_LIMIT {
                tracing::warn!(
                    target: BUZZER_LOG,
                    "buzzer {} quiet for {:?}, disconnecting",
                    id,
                    silence
                );

                // the record is updated once the connection reports back
                buzzer.disconnect();
            }
        }
    }

    fn stats(&self) -> StatsReport {
        StatsReport {
            rows: self
                .records
                .iter()
                .map(|(&id, record)| StatsRow {
                    id,
                    online: record.online(),
                    muted: record.muted,
                    slow: record.slow,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsRow {
    pub id: BuzzerId,
    pub online: bool,
    pub muted: bool,
    pub slow: SlowCounts,
}

/// Snapshot of every known buzzer, in id order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsReport {
    pub rows: Vec<StatsRow>,
}

impl fmt::Display for StatsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "             >2s >3s (>2s >3s)")?;

        let mut online = 0;
        let mut sum = SlowCounts::default();
        for row in self.rows.iter() {
            let slow = row.slow;
            writeln!(
                f,
                "{:>3}: {} {:3} {:3} ({:3} {:3}){}",
                row.id.to_string(),
                if row.online { "OK     " } else { "Missing" },
                slow.session_2s,
                slow.session_3s,
                slow.total_2s,
                slow.total_3s,
                if row.muted { " muted" } else { "" },
            )?;

            online += row.online as usize;
            sum += slow;
        }

        write!(
            f,
            "Sum: {:2} OK   {:3} {:3} ({:3} {:3})",
            online, sum.session_2s, sum.session_3s, sum.total_2s, sum.total_3s
        )
    }
}

#[derive(Debug, Clone)]
pub struct Handler {
    sender: mpsc::Sender<InternalMessage>,
}

impl Handler {
    async fn send(&self, message: InternalMessage) {
        self.sender
            .send(message)
            .await
            .expect("the swarm should live as long as the handler does");
    }

    /// Reports a buzzer that completed its handshake
    pub async fn new_buzzer(&self, buzzer: BuzzerHandle) {
        self.send(InternalMessage::NewBuzzer(buzzer)).await
    }

    /// Reports a closed connection
    ///
    /// ignored if the buzzer has since reconnected on another connection
    pub async fn disconnected(&self, id: BuzzerId, connection: ConnectionId) {
        self.send(InternalMessage::Disconnected(id, connection))
            .await
    }

    /// Reports that a message has been received from a buzzer
    pub async fn received(&self, id: BuzzerId) {
        self.send(InternalMessage::Received(id)).await
    }

    pub async fn button_press(&self, id: BuzzerId) {
        self.send(InternalMessage::ButtonPress(id)).await
    }

    /// Sends a mode to a single buzzer
    ///
    /// returns false if the buzzer is unknown or currently disconnected
    pub async fn set_mode(&self, id: BuzzerId, mode: Mode) -> bool {
        let (tx, rx) = oneshot::channel();
        self.send(InternalMessage::SetMode(id, mode, tx)).await;

        rx.await
            .expect("the swarm should live as long as the handler does")
    }

    /// Sends a mode to every connected buzzer, without waiting for it to happen
    pub async fn set_mode_all(&self, mode: Mode) {
        self.send(InternalMessage::SetModeAll(mode)).await
    }

    pub async fn mute(&self, id: BuzzerId) {
        self.send(InternalMessage::Mute(id, true)).await
    }

    pub async fn unmute(&self, id: BuzzerId) {
        self.send(InternalMessage::Mute(id, false)).await
    }

    pub async fn unmute_all(&self) {
        self.send(InternalMessage::UnmuteAll).await
    }

    pub async fn stats(&self) -> StatsReport {
        let (tx, rx) = oneshot::channel();
        self.send(InternalMessage::Stats(tx)).await;

        rx.await
            .expect("the swarm should live as long as the handler does")
    }
}
