use std::{collections::BTreeMap, fmt};

use super::{
    command::{self, ArgKind},
    station, CommandError, EXIT_COMMAND,
};
use crate::modes::{multiple_choice, quick_fire, test_mode};

/// What to run when a command is entered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Station(station::Command),
    Test(test_mode::Command),
    MultipleChoice(multiple_choice::Command),
    QuickFire(quick_fire::Command),
}

/// The quiz mode button presses are delivered to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveMode {
    Test,
    MultipleChoice,
    QuickFire,
}

#[derive(Debug, Clone)]
pub struct Registration {
    pub action: Action,
    pub help: &'static str,
    pub args: &'static [ArgKind],
    /// Set for commands that open a session no other modal command may interrupt
    pub modal: Option<&'static str>,
}

impl Registration {
    pub fn new(action: Action, help: &'static str) -> Self {
        Self {
            action,
            help,
            args: &[],
            modal: None,
        }
    }

    pub fn args(mut self, args: &'static [ArgKind]) -> Self {
        self.args = args;
        self
    }

    pub fn modal(mut self, description: &'static str) -> Self {
        self.modal = Some(description);
        self
    }
}

/// Everything the engine currently reacts to
///
/// misuse (registering over an existing entry, removing a missing one) is
/// reported but never fatal, the latest registration always wins.
#[derive(Debug, Default)]
pub struct Registry {
    commands: BTreeMap<char, Registration>,
    buttons: Option<ActiveMode>,
    modal: Option<&'static str>,
}

impl Registry {
    pub fn register(&mut self, key: char, registration: Registration) {
        if let Some(old) = self.commands.insert(key, registration) {
            tracing::warn!(
                "command {} was already registered ({}), replacing it",
                key,
                old.help
            );
        }
    }

    pub fn deregister(&mut self, key: char) {
        if self.commands.remove(&key).is_none() {
            tracing::warn!("request to deregister undefined command {}", key);
        }
    }

    pub fn get(&self, key: char) -> Option<&Registration> {
        self.commands.get(&key)
    }

    pub fn register_buttons(&mut self, mode: ActiveMode) {
        if let Some(old) = self.buttons.replace(mode) {
            tracing::warn!(
                "clashing button handler, had {:?}, replacing it with {:?}",
                old,
                mode
            );
        }
    }

    pub fn deregister_buttons(&mut self) {
        self.buttons = None;
    }

    pub fn buttons(&self) -> Option<ActiveMode> {
        self.buttons
    }

    /// The modal session currently in progress, if any
    pub fn modal(&self) -> Option<&'static str> {
        self.modal
    }

    pub(super) fn begin_modal(&mut self, requested: &'static str) -> Result<(), CommandError> {
        if let Some(open) = self.modal {
            return Err(CommandError::ModalConflict { requested, open });
        }

        self.modal = Some(requested);
        Ok(())
    }

    /// Ends the current modal session
    pub fn complete_modal(&mut self) {
        if self.modal.take().is_none() {
            tracing::warn!("completed a modal session that wasn't open");
        }
    }

    /// Ends the current modal session no matter who owns it
    pub fn force_clear(&mut self) -> Option<&'static str> {
        self.modal.take()
    }

    pub fn usage(&self) -> Usage<'_> {
        Usage(self)
    }
}

/// Help listing of every registered command, sorted by command character
pub struct Usage<'a>(&'a Registry);

impl fmt::Display for Usage<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Usage:")?;
        write!(f, "  {:<16}  Exit", EXIT_COMMAND)?;

        for (key, registration) in self.0.commands.iter() {
            let shape = format!("{}{}", key, command::usage(registration.args));
            write!(f, "\n  {:<16}  {}", shape, registration.help)?;
        }

        Ok(())
    }
}
