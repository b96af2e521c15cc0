//! Commands that are available at all times.

use super::{
    command::{ArgKind, Args},
    registry::{Action, Registration, Registry},
    CommandError, Context,
};
use crate::protocol::Mode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Help,
    ForceClear,
    Stats,
    On,
    Off,
    OffAll,
    Mute,
    Unmute,
    UnmuteAll,
    Award,
    Deduct,
    Scores,
}

pub fn register(registry: &mut Registry) {
    let commands: [(char, Command, &'static str, &'static [ArgKind]); 12] = [
        ('?', Command::Help, "Show usage", &[]),
        ('!', Command::ForceClear, "Force clear a stuck question", &[]),
        ('s', Command::Stats, "Print buzzer stats", &[]),
        ('o', Command::On, "Enable outputs on 1 buzzer", &[ArgKind::Buzzer]),
        ('x', Command::Off, "Disable outputs on 1 buzzer", &[ArgKind::Buzzer]),
        ('X', Command::OffAll, "Disable outputs on all buzzers", &[]),
        ('z', Command::Mute, "Mute 1 buzzer", &[ArgKind::Buzzer]),
        ('u', Command::Unmute, "Unmute 1 buzzer", &[ArgKind::Buzzer]),
        ('U', Command::UnmuteAll, "Unmute all buzzers", &[]),
        ('+', Command::Award, "Give points to a team", &[ArgKind::Team, ArgKind::Marks]),
        ('-', Command::Deduct, "Deduct points from a team", &[ArgKind::Team, ArgKind::Marks]),
        ('p', Command::Scores, "Show team scores", &[]),
    ];

    for (key, command, help, args) in commands {
        registry.register(key, Registration::new(Action::Station(command), help).args(args));
    }
}

pub async fn execute(
    context: &mut Context<'_>,
    command: Command,
    args: &Args,
) -> Result<(), CommandError> {
    match command {
        Command::Help => println!("{}", context.registry.usage()),
        // the engine has already stopped the active mode, if there was one
        Command::ForceClear => match context.registry.force_clear() {
            Some(session) => tracing::warn!("forcibly cleared {}", session),
            None => println!("Nothing left open"),
        },
        Command::Stats => println!("{}", context.swarm().stats().await),
        Command::On => set_mode(context, args, Mode::ON).await?,
        Command::Off => set_mode(context, args, Mode::OFF).await?,
        Command::OffAll => context.set_mode_all(Mode::OFF).await,
        Command::Mute => {
            let id = args.buzzer(0).ok_or(CommandError::ArgumentShape)?;
            context.swarm().mute(id).await
        }
        Command::Unmute => {
            let id = args.buzzer(0).ok_or(CommandError::ArgumentShape)?;
            context.swarm().unmute(id).await
        }
        Command::UnmuteAll => context.swarm().unmute_all().await,
        Command::Award | Command::Deduct => {
            let team = args.team(0).ok_or(CommandError::ArgumentShape)?;
            let marks = args.marks(1).ok_or(CommandError::ArgumentShape)? as i32;
            let points = if command == Command::Deduct { -marks } else { marks };
            context.scoreboard().add(team, points).await
        }
        Command::Scores => context.scoreboard().print().await,
    }

    Ok(())
}

async fn set_mode(context: &Context<'_>, args: &Args, mode: Mode) -> Result<(), CommandError> {
    let id = args.buzzer(0).ok_or(CommandError::ArgumentShape)?;
    if !context.set_mode(id, mode).await {
        println!("Buzzer {} is not connected", id);
    }

    Ok(())
}
