use crate::{
    engine::{
        command::{choice_letter, ArgKind, Args, CHOICE_COUNT},
        registry::{Action, ActiveMode, Registration, Registry},
        CommandError, Context,
    },
    id::{BuzzerId, Team, TEAM_COUNT},
    protocol::Mode,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Complete,
    Cancel,
}

#[derive(Debug, Default)]
struct Question {
    answer: u8,
    marks: u8,
    // latest choice of each team, by team slot
    choices: [Option<u8>; TEAM_COUNT],
}

/// Every team picks one of its answer buttons, teams with the right one score
#[derive(Debug, Default)]
pub struct MultipleChoice {
    question: Question,
}

impl MultipleChoice {
    pub fn new(registry: &mut Registry) -> Self {
        registry.register(
            'm',
            Registration::new(
                Action::MultipleChoice(Command::Start),
                "Start a multiple choice question",
            )
            .args(&[ArgKind::Choice, ArgKind::Marks])
            .modal("multiple choice question"),
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
                let answer = args.choice(0).ok_or(CommandError::ArgumentShape)?;
                let marks = args.marks(1).ok_or(CommandError::ArgumentShape)?;
                self.start(context, answer, marks).await;
            }
            Command::Complete => {
                self.complete(context).await;
                self.finish(context).await;
            }
            Command::Cancel => self.cancel(context).await,
        }

        Ok(())
    }

    async fn start(&mut self, context: &mut Context<'_>, answer: u8, marks: u8) {
        self.question = Question {
            answer,
            marks,
            choices: [None; TEAM_COUNT],
        };

        context.set_mode_all(Mode::OFF).await;
        for team in Team::all() {
            for choice in 0..CHOICE_COUNT {
                context.set_mode(BuzzerId::new(team, choice), Mode::LED).await;
            }
        }

        context.registry.register(
            'y',
            Registration::new(
                Action::MultipleChoice(Command::Complete),
                "Complete current question",
            ),
        );
        context.registry.register(
            'q',
            Registration::new(
                Action::MultipleChoice(Command::Cancel),
                "Cancel current question",
            ),
        );
        context.registry.register_buttons(ActiveMode::MultipleChoice);
    }

    async fn complete(&mut self, context: &Context<'_>) {
        let question = &self.question;

        let mut winners = String::new();
        for (team, choice) in Team::all().zip(question.choices) {
            if choice == Some(question.answer) {
                context.scoreboard().add(team, question.marks as i32).await;
                winners.push(' ');
                winners.push(team.letter());
            }
        }

        if winners.is_empty() {
            println!("No teams got it right");
        } else {
            println!("Teams who got it right:{}", winners);
        }
    }

    /// Ends the question without scoring
    pub async fn cancel(&mut self, context: &mut Context<'_>) {
        println!("Question cancelled");
        self.finish(context).await;
    }

    async fn finish(&mut self, context: &mut Context<'_>) {
        context.registry.deregister('y');
        context.registry.deregister('q');
        context.registry.deregister_buttons();
        context.set_mode_all(Mode::OFF).await;
        context.registry.complete_modal();
    }

    pub async fn button(&mut self, context: &Context<'_>, id: BuzzerId) {
        let team = id.team();
        let choice = id.index();
        let Some(slot) = team.slot() else {
            return;
        };

        // not an answer button
        if choice >= CHOICE_COUNT {
            return;
        }

        let previous = self.question.choices[slot].replace(choice);
        match previous {
            Some(previous) if previous == choice => return,
            Some(_) => print!("Team {} changed to {}  ", team, choice_letter(choice)),
            None => print!("Team {} selected {}    ", team, choice_letter(choice)),
        }
        println!("{}", self.choices());

        for index in 0..CHOICE_COUNT {
            let mode = if index == choice { Mode::LED } else { Mode::OFF };
            context.set_mode(BuzzerId::new(team, index), mode).await;
        }
    }

    fn choices(&self) -> String {
        let mut line = String::from("Choices:");
        for (team, choice) in Team::all().zip(self.question.choices) {
            let letter = choice.map_or('-', choice_letter);
            line.push_str(&format!(" {}:{}", team, letter));
        }

        line
    }
}
