use std::fmt;

use tokio::sync::{mpsc, oneshot};

use crate::{
    id::{Team, TEAM_COUNT},
    logging::SCORE_LOG,
};

// only the engine talks to the scoreboard, and only a handful of times per question
const SYSTEM_BUFFER_SIZE: usize = 64;

enum InternalMessage {
    Add(Team, i32),
    Print,
    Scores(oneshot::Sender<Scores>),
}

/// Points per team, indexed by team slot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Scores(pub [i32; TEAM_COUNT]);

impl Scores {
    pub fn of(&self, team: Team) -> Option<i32> {
        team.slot().map(|slot| self.0[slot])
    }
}

impl fmt::Display for Scores {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Scores:")?;
        for (team, score) in Team::all().zip(self.0) {
            write!(f, "\n{}: {:3}", team, score)?;
        }

        Ok(())
    }
}

pub struct System {
    scores: Scores,
}

impl System {
    /// Starts a new scoreboard
    ///
    /// returns an handler that can be used to control the scoreboard
    ///
    /// note: this function needs to be called from inside a tokio runtime context
    pub fn start() -> Handler {
        let (tx, mut rx) = mpsc::channel(SYSTEM_BUFFER_SIZE);

        let mut this = Self {
            scores: Scores::default(),
        };
        tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                match message {
                    InternalMessage::Add(team, points) => this.add(team, points),
                    InternalMessage::Print => println!("{}", this.scores),
                    InternalMessage::Scores(response) => {
                        let _ = response.send(this.scores);
                    }
                }
            }
        });

        Handler { sender: tx }
    }

    fn add(&mut self, team: Team, points: i32) {
        let Some(slot) = team.slot() else {
            tracing::warn!("can't give points to team {}, it isn't playing", team);
            return;
        };

        self.scores.0[slot] += points;
        tracing::info!(
            target: SCORE_LOG,
            "{:+} to {}, now {}",
            points,
            team,
            self.scores.0[slot]
        );
        println!("{}", self.scores);
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
            .expect("the scoreboard should live as long as the handler does");
    }

    /// Adds (or, with negative points, deducts) points to a team
    pub async fn add(&self, team: Team, points: i32) {
        self.send(InternalMessage::Add(team, points)).await
    }

    /// Prints the current scores
    pub async fn print(&self) {
        self.send(InternalMessage::Print).await
    }

    pub async fn scores(&self) -> Scores {
        let (tx, rx) = oneshot::channel();
        self.send(InternalMessage::Scores(tx)).await;

        rx.await
            .expect("the scoreboard should live as long as the handler does")
    }
}
