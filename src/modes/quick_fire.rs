//! First to buzz gets to answer.
//!
//! Once a player is acknowledged the controller waits for the operator's
//! judgment. Presses from other teams that arrive meanwhile are queued and
//! handled in arrival order if the answer turns out wrong. Each team gets a
//! single buzz per question.

use std::collections::VecDeque;

use crate::{
    engine::{
        command::{ArgKind, Args},
        registry::{Action, ActiveMode, Registration, Registry},
        CommandError, Context,
    },
    id::{BuzzerId, Team, TEAM_COUNT},
    protocol::Mode,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Correct,
    Incorrect,
    Cancel,
}

#[derive(Debug, Default)]
struct Question {
    marks: u8,
    // the player awaiting judgment
    acknowledged: Option<BuzzerId>,
    buzzed: [bool; TEAM_COUNT],
    pending: VecDeque<BuzzerId>,
}

#[derive(Debug, Default)]
pub struct QuickFire {
    question: Question,
}

impl QuickFire {
    pub fn new(registry: &mut Registry) -> Self {
        registry.register(
            'f',
            Registration::new(
                Action::QuickFire(Command::Start),
                "Start a quick fire question",
            )
            .args(&[ArgKind::Marks])
            .modal("quick fire question"),
        );

        Self::default()
    }

    pub async fn execute(
        &mut self,
        context: &mut Context<'_>,
        command: Command,
        args: &Args,
    ) -> Result<(), CommandError> {
        match command {
            Command::Start => {
                let marks = args.marks(0).ok_or(CommandError::ArgumentShape)?;
                self.start(context, marks).await;
            }
            Command::Correct => self.correct(context).await,
            Command::Incorrect => self.incorrect(context).await,
            Command::Cancel => self.cancel(context).await,
        }

        Ok(())
    }

    async fn start(&mut self, context: &mut Context<'_>, marks: u8) {
        self.question = Question {
            marks,
            ..Default::default()
        };

        context.set_mode_all(Mode::OFF).await;

        context.registry.register(
            'q',
            Registration::new(Action::QuickFire(Command::Cancel), "Cancel current question"),
        );
        context.registry.register_buttons(ActiveMode::QuickFire);
        self.print_waiting();
    }

    async fn correct(&mut self, context: &mut Context<'_>) {
        let Some(player) = self.question.acknowledged else {
            tracing::warn!("no player is waiting for judgment");
            return;
        };

        context
            .scoreboard()
            .add(player.team(), self.question.marks as i32)
            .await;
        println!("Player {} won", player);

        self.finish(context).await;
    }

    async fn incorrect(&mut self, context: &mut Context<'_>) {
        let Some(player) = self.question.acknowledged.take() else {
            tracing::warn!("no player is waiting for judgment");
            return;
        };

        context.set_mode(player, Mode::OFF).await;
        context.registry.deregister('y');
        context.registry.deregister('n');

        match self.question.pending.pop_front() {
            Some(next) => self.acknowledge(context, next).await,
            None => self.print_waiting(),
        }
    }

    /// Ends the question without scoring
    pub async fn cancel(&mut self, context: &mut Context<'_>) {
        println!("Question cancelled");
        self.finish(context).await;
    }

    async fn finish(&mut self, context: &mut Context<'_>) {
        context.registry.deregister('q');
        context.registry.deregister_buttons();

        if self.question.acknowledged.take().is_some() {
            context.registry.deregister('y');
            context.registry.deregister('n');
        }

        context.set_mode_all(Mode::OFF).await;
        context.registry.complete_modal();
    }

    pub async fn button(&mut self, context: &mut Context<'_>, id: BuzzerId) {
        let Some(slot) = id.team().slot() else {
            return;
        };

        // a team only gets one go
        if self.question.buzzed[slot] {
            return;
        }

        self.question.buzzed[slot] = true;
        self.acknowledge(context, id).await;
    }

    async fn acknowledge(&mut self, context: &mut Context<'_>, id: BuzzerId) {
        if self.question.acknowledged.is_some() {
            self.question.pending.push_back(id);
            return;
        }

        context.set_mode(id, Mode::ON).await;
        self.question.acknowledged = Some(id);

        context.registry.register(
            'y',
            Registration::new(
                Action::QuickFire(Command::Correct),
                "Player answered correctly",
            ),
        );
        context.registry.register(
            'n',
            Registration::new(
                Action::QuickFire(Command::Incorrect),
                "Player answered incorrectly",
            ),
        );
        println!("Player {} pressed their button", id);
    }

    fn print_waiting(&self) {
        let waiting: String = Team::all()
            .zip(self.question.buzzed)
            .filter(|(_, buzzed)| !buzzed)
            .map(|(team, _)| format!(" {}", team))
            .collect();

        if waiting.is_empty() {
            println!("Every team has had a go, q to cancel");
        } else {
            println!("Waiting for button press from:{}", waiting);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        engine::CommandError,
        id::{BuzzerId, Team},
        protocol::Mode,
        testing::Station,
    };

    #[tokio::test]
    async fn wrong_answers_pass_to_queued_presses_in_order() {
        let b0 = BuzzerId::new(Team::BLUE, 0);
        let g3 = BuzzerId::new(Team::GREEN, 3);
        let r1 = BuzzerId::new(Team::RED, 1);
        let mut station = Station::new(&[b0, g3, r1]).await;

        station.engine.dispatch("f2").await.unwrap();
        assert!(station.engine.registry().get('y').is_none());

        station.engine.button_press(b0).await;
        station.engine.button_press(r1).await;
        station.engine.button_press(g3).await;
        station.settle().await;
        assert_eq!(station.buzzer(b0).modes(), [Mode::OFF, Mode::ON]);
        assert_eq!(station.buzzer(r1).modes(), [Mode::OFF]);
        assert_eq!(station.buzzer(g3).modes(), [Mode::OFF]);
        assert!(station.engine.registry().get('y').is_some());

        // red pressed before green, so red is next
        station.engine.dispatch("n").await.unwrap();
        station.settle().await;
        assert_eq!(station.buzzer(b0).modes(), [Mode::OFF]);
        assert_eq!(station.buzzer(r1).modes(), [Mode::ON]);
        assert_eq!(station.buzzer(g3).modes(), []);

        station.engine.dispatch("n").await.unwrap();
        station.engine.dispatch("y").await.unwrap();
        station.settle().await;
        assert_eq!(station.buzzer(g3).modes(), [Mode::ON, Mode::OFF]);

        assert_eq!(station.scoreboard.scores().await.0, [0, 2, 0, 0]);
        assert_eq!(station.engine.registry().modal(), None);
        assert!(station.engine.registry().get('y').is_none());
        assert!(station.engine.registry().get('n').is_none());
        assert!(station.engine.registry().get('q').is_none());
    }

    #[tokio::test]
    async fn one_buzz_per_team() {
        let b0 = BuzzerId::new(Team::BLUE, 0);
        let b4 = BuzzerId::new(Team::BLUE, 4);
        let y2 = BuzzerId::new(Team::YELLOW, 2);
        let mut station = Station::new(&[b0, b4, y2]).await;

        station.engine.dispatch("f1").await.unwrap();
        station.engine.button_press(b0).await;
        station.engine.dispatch("n").await.unwrap();

        // blue already had its go, from any of its buzzers
        station.engine.button_press(b0).await;
        station.engine.button_press(b4).await;
        station.settle().await;
        assert_eq!(station.buzzer(b0).modes(), [Mode::OFF, Mode::ON, Mode::OFF]);
        assert_eq!(station.buzzer(b4).modes(), [Mode::OFF]);
        assert!(matches!(
            station.engine.dispatch("y").await,
            Err(CommandError::Unrecognised(_))
        ));

        station.engine.button_press(y2).await;
        station.engine.button_press(b0).await;
        station.engine.dispatch("n").await.unwrap();
        station.settle().await;
        assert_eq!(station.buzzer(y2).modes(), [Mode::OFF, Mode::ON, Mode::OFF]);
        assert!(station.engine.registry().get('n').is_none());

        station.engine.dispatch("q").await.unwrap();
        assert_eq!(station.scoreboard.scores().await.0, [0; 4]);
        assert_eq!(station.engine.registry().modal(), None);
    }
}
