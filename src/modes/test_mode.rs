use std::collections::HashSet;

use crate::{
    engine::{
        registry::{Action, ActiveMode, Registration, Registry},
        Context,
    },
    id::BuzzerId,
    protocol::Mode,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Enter,
    Exit,
}

/// Every press toggles the buzzer's LED and audio, handy for checking the hardware
#[derive(Debug, Default)]
pub struct TestMode {
    lit: HashSet<BuzzerId>,
}

impl TestMode {
    pub fn new(registry: &mut Registry) -> Self {
        registry.register(
            't',
            Registration::new(Action::Test(Command::Enter), "Enter test mode").modal("test mode"),
        );

        Self::default()
    }

    pub async fn execute(&mut self, context: &mut Context<'_>, command: Command) {
        match command {
            Command::Enter => self.enter(context).await,
            Command::Exit => self.exit(context).await,
        }
    }

    async fn enter(&mut self, context: &mut Context<'_>) {
        self.lit.clear();
        context.set_mode_all(Mode::OFF).await;

        context.registry.register(
            'q',
            Registration::new(Action::Test(Command::Exit), "Exit test mode"),
        );
        context.registry.register_buttons(ActiveMode::Test);

        println!("Entering test mode");
    }

    async fn exit(&mut self, context: &mut Context<'_>) {
        context.registry.deregister('q');
        context.registry.deregister_buttons();
        context.set_mode_all(Mode::OFF).await;
        context.registry.complete_modal();

        println!("Leaving test mode");
    }

    pub async fn button(&mut self, context: &Context<'_>, id: BuzzerId) {
        let mode = if self.lit.remove(&id) {
            Mode::OFF
        } else {
            self.lit.insert(id);
            Mode::ON
        };

        context.set_mode(id, mode).await;
    }
}
