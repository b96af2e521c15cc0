//! Console argument grammar.
//!
//! Arguments are fixed width and follow the command character with no
//! separators, e.g. `mC2` is command `m` with choice `C` and 2 marks, and
//! `oR3` is command `o` with buzzer `R3`.

use std::{fmt, str::Chars};

use crate::id::{BuzzerId, Team};

/// Number of answer buttons each team has in a multiple choice question
pub const CHOICE_COUNT: u8 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    /// A single decimal digit
    Marks,
    /// One of B, G, R or Y
    Team,
    /// One of A to E
    Choice,
    /// A team letter followed by a single digit index
    Buzzer,
}

impl fmt::Display for ArgKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let placeholder = match self {
            Self::Marks => "<marks>",
            Self::Team => "<team>",
            Self::Choice => "<choice>",
            Self::Buzzer => "<buzzer>",
        };

        write!(f, "{}", placeholder)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgValue {
    Marks(u8),
    Team(Team),
    Choice(u8),
    Buzzer(BuzzerId),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("expected {0}, got nothing")]
    Missing(ArgKind),

    #[error("expected {expected}, got \"{got}\"")]
    Invalid { expected: ArgKind, got: char },

    #[error("unexpected \"{0}\" after the arguments")]
    Trailing(String),
}

/// Parsed argument values, in declaration order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Args(Vec<ArgValue>);

impl Args {
    pub fn marks(&self, position: usize) -> Option<u8> {
        match self.0.get(position)? {
            ArgValue::Marks(marks) => Some(*marks),
            _ => None,
        }
    }

    pub fn team(&self, position: usize) -> Option<Team> {
        match self.0.get(position)? {
            ArgValue::Team(team) => Some(*team),
            _ => None,
        }
    }

    pub fn choice(&self, position: usize) -> Option<u8> {
        match self.0.get(position)? {
            ArgValue::Choice(choice) => Some(*choice),
            _ => None,
        }
    }

    pub fn buzzer(&self, position: usize) -> Option<BuzzerId> {
        match self.0.get(position)? {
            ArgValue::Buzzer(id) => Some(*id),
            _ => None,
        }
    }
}

/// Parses everything after the command character against the declared argument kinds
pub fn parse_args(input: &str, kinds: &[ArgKind]) -> Result<Args, ParseError> {
    let mut chars = input.chars();
    let mut values = Vec::with_capacity(kinds.len());

    for &kind in kinds {
        let value = match kind {
            ArgKind::Marks => ArgValue::Marks(digit(&mut chars, kind)?),
            ArgKind::Team => ArgValue::Team(team(&mut chars, kind)?),
            ArgKind::Choice => {
                let got = next(&mut chars, kind)?;
                let choice = (got.to_ascii_uppercase() as u32).wrapping_sub('A' as u32);
                if choice >= CHOICE_COUNT as u32 {
                    return Err(ParseError::Invalid {
                        expected: kind,
                        got,
                    });
                }

                ArgValue::Choice(choice as u8)
            }
            ArgKind::Buzzer => {
                let team = team(&mut chars, kind)?;
                ArgValue::Buzzer(BuzzerId::new(team, digit(&mut chars, kind)?))
            }
        };

        values.push(value);
    }

    let rest = chars.as_str();
    if !rest.is_empty() {
        return Err(ParseError::Trailing(rest.to_owned()));
    }

    Ok(Args(values))
}

/// Renders the argument shape of a command for the usage listing
pub fn usage(kinds: &[ArgKind]) -> String {
    kinds.iter().map(ToString::to_string).collect()
}

pub fn choice_letter(choice: u8) -> char {
    (b'A' + choice) as char
}

fn next(chars: &mut Chars<'_>, kind: ArgKind) -> Result<char, ParseError> {
    chars.next().ok_or(ParseError::Missing(kind))
}

fn digit(chars: &mut Chars<'_>, kind: ArgKind) -> Result<u8, ParseError> {
    let got = next(chars, kind)?;
    got.to_digit(10)
        .map(|digit| digit as u8)
        .ok_or(ParseError::Invalid {
            expected: kind,
            got,
        })
}

fn team(chars: &mut Chars<'_>, kind: ArgKind) -> Result<Team, ParseError> {
    let got = next(chars, kind)?;
    Team::from_letter(got).ok_or(ParseError::Invalid {
        expected: kind,
        got,
    })
}

#[cfg(test)]
mod tests {
    use super::{parse_args, usage, ArgKind, ParseError};
    use crate::id::{BuzzerId, Team};

    #[test]
    fn parse_each_kind() {
        let args = parse_args("c3", &[ArgKind::Choice, ArgKind::Marks]).unwrap();
        assert_eq!(args.choice(0), Some(2));
        assert_eq!(args.marks(1), Some(3));
        assert_eq!(args.marks(0), None);

        let args = parse_args("y7", &[ArgKind::Team, ArgKind::Marks]).unwrap();
        assert_eq!(args.team(0), Some(Team::YELLOW));
        assert_eq!(args.marks(1), Some(7));

        let args = parse_args("R3", &[ArgKind::Buzzer]).unwrap();
        assert_eq!(args.buzzer(0), Some(BuzzerId::new(Team::RED, 3)));

        assert_eq!(parse_args("", &[]).unwrap(), Default::default());
    }

    #[test]
    fn parse_errors() {
        assert_eq!(
            parse_args("", &[ArgKind::Marks]),
            Err(ParseError::Missing(ArgKind::Marks))
        );
        assert_eq!(
            parse_args("F1", &[ArgKind::Choice, ArgKind::Marks]),
            Err(ParseError::Invalid {
                expected: ArgKind::Choice,
                got: 'F'
            })
        );
        assert_eq!(
            parse_args("@1", &[ArgKind::Choice]),
            Err(ParseError::Invalid {
                expected: ArgKind::Choice,
                got: '@'
            })
        );
        assert_eq!(
            parse_args("X1", &[ArgKind::Buzzer]),
            Err(ParseError::Invalid {
                expected: ArgKind::Buzzer,
                got: 'X'
            })
        );
        assert_eq!(
            parse_args("B", &[ArgKind::Buzzer]),
            Err(ParseError::Missing(ArgKind::Buzzer))
        );
        assert_eq!(
            parse_args("12", &[ArgKind::Marks]),
            Err(ParseError::Trailing("2".into()))
        );
        assert_eq!(
            parse_args(" 1", &[ArgKind::Marks]),
            Err(ParseError::Invalid {
                expected: ArgKind::Marks,
                got: ' '
            })
        );
    }

    #[test]
    fn usage_placeholders() {
        assert_eq!(usage(&[ArgKind::Choice, ArgKind::Marks]), "<choice><marks>");
        assert_eq!(usage(&[]), "");
    }
}
