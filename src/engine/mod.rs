//! The single point of control.
//!
//! The engine owns the command registry and serializes console commands and
//! button presses through one loop, so quiz modes never run concurrently and
//! need no locking of their own. Quiz modes register the commands and button
//! presses they're interested in for as long as a question runs.

pub mod command;
pub mod registry;
pub mod station;

use tokio::sync::mpsc;

use crate::{
    id::BuzzerId,
    modes::{
        multiple_choice::MultipleChoice,
        quick_fire::QuickFire,
        test_mode::{self, TestMode},
    },
    protocol::Mode,
    systems::{scoreboard, swarm},
};
use command::ParseError;
use registry::{Action, ActiveMode, Registry};

/// Typing this stops the station
pub const EXIT_COMMAND: &str = "quit";

#[derive(thiserror::Error, Debug)]
pub enum CommandError {
    #[error("unrecognised command, ? for help: {0}")]
    Unrecognised(String),

    #[error("bad command {key}: {source}")]
    Arguments { key: char, source: ParseError },

    #[error("can't start {requested}, {open} is in progress")]
    ModalConflict {
        requested: &'static str,
        open: &'static str,
    },

    #[error("arguments don't match the command's declaration")]
    ArgumentShape,
}

/// What a quiz mode gets to work with while handling a command or a button press
pub struct Context<'a> {
    pub registry: &'a mut Registry,
    swarm: &'a swarm::Handler,
    scoreboard: &'a scoreboard::Handler,
}

impl Context<'_> {
    /// Sends a mode to a single buzzer
    ///
    /// returns false if the buzzer is unknown or currently disconnected
    pub async fn set_mode(&self, id: BuzzerId, mode: Mode) -> bool {
        self.swarm.set_mode(id, mode).await
    }

    pub async fn set_mode_all(&self, mode: Mode) {
        self.swarm.set_mode_all(mode).await
    }

    pub fn swarm(&self) -> &swarm::Handler {
        self.swarm
    }

    pub fn scoreboard(&self) -> &scoreboard::Handler {
        self.scoreboard
    }
}

pub struct Engine {
    registry: Registry,
    swarm: swarm::Handler,
    scoreboard: scoreboard::Handler,
    test_mode: TestMode,
    multiple_choice: MultipleChoice,
    quick_fire: QuickFire,
}

impl Engine {
    pub fn new(swarm: swarm::Handler, scoreboard: scoreboard::Handler) -> Self {
        let mut registry = Registry::default();
        station::register(&mut registry);

        let test_mode = TestMode::new(&mut registry);
        let multiple_choice = MultipleChoice::new(&mut registry);
        let quick_fire = QuickFire::new(&mut registry);

        Self {
            registry,
            swarm,
            scoreboard,
            test_mode,
            multiple_choice,
            quick_fire,
        }
    }

    /// Processes commands and button presses, one at a time, until told to quit
    /// or the command line closes
    pub async fn run(
        mut self,
        mut lines: mpsc::Receiver<String>,
        mut presses: mpsc::UnboundedReceiver<BuzzerId>,
    ) {
        loop {
            tokio::select! {
                line = lines.recv() => {
                    let Some(line) = line else {
                        break;
                    };

                    if line == EXIT_COMMAND {
                        break;
                    }

                    if let Err(err) = self.dispatch(&line).await {
                        tracing::warn!("{}", err);
                    }
                }
                Some(id) = presses.recv() => self.button_press(id).await,
            }
        }
    }

    /// Runs a single command line
    pub async fn dispatch(&mut self, line: &str) -> Result<(), CommandError> {
        let mut chars = line.chars();
        let registration = chars
            .next()
            .and_then(|key| self.registry.get(key).map(|registration| (key, registration)));
        let Some((key, registration)) = registration else {
            return Err(CommandError::Unrecognised(line.to_owned()));
        };
        let registration = registration.clone();

        let args = command::parse_args(chars.as_str(), registration.args)
            .map_err(|source| CommandError::Arguments { key, source })?;

        if let Some(description) = registration.modal {
            self.registry.begin_modal(description)?;
        }

        if registration.action == Action::Station(station::Command::ForceClear) {
            self.exit_active_mode().await;
        }

        let mut context = Context {
            registry: &mut self.registry,
            swarm: &self.swarm,
            scoreboard: &self.scoreboard,
        };

        match registration.action {
            Action::Station(command) => station::execute(&mut context, command, &args).await,
            Action::Test(command) => {
                self.test_mode.execute(&mut context, command).await;
                Ok(())
            }
            Action::MultipleChoice(command) => {
                self.multiple_choice
                    .execute(&mut context, command, &args)
                    .await
            }
            Action::QuickFire(command) => self.quick_fire.execute(&mut context, command, &args).await,
        }
    }

    /// Delivers a button press to whichever mode is active right now
    pub async fn button_press(&mut self, id: BuzzerId) {
        let mut context = Context {
            registry: &mut self.registry,
            swarm: &self.swarm,
            scoreboard: &self.scoreboard,
        };

        match context.registry.buttons() {
            Some(ActiveMode::Test) => self.test_mode.button(&context, id).await,
            Some(ActiveMode::MultipleChoice) => self.multiple_choice.button(&context, id).await,
            Some(ActiveMode::QuickFire) => self.quick_fire.button(&mut context, id).await,
            None => tracing::debug!("ignoring press from {}, nothing is listening", id),
        }
    }

    // stops whichever mode has the buttons through its own exit path,
    // so none of its temporary commands outlive it
    async fn exit_active_mode(&mut self) {
        let mut context = Context {
            registry: &mut self.registry,
            swarm: &self.swarm,
            scoreboard: &self.scoreboard,
        };

        let Some(active) = context.registry.buttons() else {
            return;
        };
        tracing::warn!("forcibly stopping {:?}", active);

        match active {
            ActiveMode::Test => {
                self.test_mode
                    .execute(&mut context, test_mode::Command::Exit)
                    .await
            }
            ActiveMode::MultipleChoice => self.multiple_choice.cancel(&mut context).await,
            ActiveMode::QuickFire => self.quick_fire.cancel(&mut context).await,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}
