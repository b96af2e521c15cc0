//! Fixtures shared by the unit tests.

use std::collections::HashMap;

use tokio::sync::{mpsc, watch};

use crate::{
    buzzer::BuzzerHandle,
    engine::Engine,
    id::BuzzerId,
    protocol::Mode,
    systems::{scoreboard, swarm},
};

/// The far end of a connection, as the swarm sees it, without any sockets
pub struct FakeBuzzer {
    outgoing: mpsc::UnboundedReceiver<Mode>,
    closed: watch::Receiver<bool>,
}

impl FakeBuzzer {
    pub fn connect(id: BuzzerId) -> (BuzzerHandle, Self) {
        let (handle, outgoing, closed) = BuzzerHandle::new(id, 4);
        (handle, Self { outgoing, closed })
    }

    /// Every mode sent since the last call
    pub fn modes(&mut self) -> Vec<Mode> {
        let mut modes = vec![];
        while let Ok(mode) = self.outgoing.try_recv() {
            modes.push(mode);
        }

        modes
    }

    pub fn last_mode(&mut self) -> Option<Mode> {
        self.modes().pop()
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }
}

/// A full station with fake buzzers plugged into a real swarm
pub struct Station {
    pub engine: Engine,
    pub swarm: swarm::Handler,
    pub scoreboard: scoreboard::Handler,
    buzzers: HashMap<BuzzerId, FakeBuzzer>,
    _presses: mpsc::UnboundedReceiver<BuzzerId>,
}

impl Station {
    pub async fn new(ids: &[BuzzerId]) -> Self {
        let (presses, presses_rx) = mpsc::unbounded_channel();
        let swarm = swarm::System::start(presses);
        let scoreboard = scoreboard::System::start();

        let mut buzzers = HashMap::new();
        for &id in ids {
            let (handle, buzzer) = FakeBuzzer::connect(id);
            swarm.new_buzzer(handle).await;
            buzzers.insert(id, buzzer);
        }

        Self {
            engine: Engine::new(swarm.clone(), scoreboard.clone()),
            swarm,
            scoreboard,
            buzzers,
            _presses: presses_rx,
        }
    }

    pub fn buzzer(&mut self, id: BuzzerId) -> &mut FakeBuzzer {
        self.buzzers
            .get_mut(&id)
            .expect("the buzzer should have been plugged in")
    }

    /// Waits until the swarm has handled everything sent to it so far
    pub async fn settle(&self) {
        self.swarm.stats().await;
    }
}
