use std::fmt;

/// Number of teams taking part in a quiz
pub const TEAM_COUNT: usize = 4;

const TEAM_LETTERS: [char; 8] = ['B', 'G', 'R', 'Y', 'x', 'x', 'x', 'x'];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Team(u8);

impl Team {
    pub const BLUE: Team = Team(0);
    pub const GREEN: Team = Team(1);
    pub const RED: Team = Team(2);
    pub const YELLOW: Team = Team(3);

    /// All the teams that take part in a quiz, in id order
    pub fn all() -> impl Iterator<Item = Team> {
        (0..TEAM_COUNT as u8).map(Team)
    }

    /// Decodes a (case-insensitive) team letter
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter.to_ascii_uppercase() {
            'B' => Some(Self::BLUE),
            'G' => Some(Self::GREEN),
            'R' => Some(Self::RED),
            'Y' => Some(Self::YELLOW),
            _ => None,
        }
    }

    pub fn letter(self) -> char {
        TEAM_LETTERS[(self.0 & 7) as usize]
    }

    /// Position of the team in per-team tables
    ///
    /// returns None for the reserved teams that never take part in a quiz
    pub fn slot(self) -> Option<usize> {
        let slot = self.0 as usize;
        (slot < TEAM_COUNT).then_some(slot)
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

// bits 4-6 hold the team, bits 0-3 the index within the team
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BuzzerId(u8);

impl BuzzerId {
    pub fn new(team: Team, index: u8) -> Self {
        Self(((team.0 & 7) << 4) | (index & 0x0F))
    }

    pub fn from_raw(raw: u8) -> Self {
        Self(raw & 0x7F)
    }

    pub fn raw(self) -> u8 {
        self.0
    }

    pub fn team(self) -> Team {
        Team((self.0 >> 4) & 7)
    }

    pub fn index(self) -> u8 {
        self.0 & 0x0F
    }
}

impl fmt::Display for BuzzerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.team(), self.index())
    }
}

#[cfg(test)]
mod tests {
    use super::{BuzzerId, Team};

    #[test]
    fn buzzer_id_fields() {
        let id = BuzzerId::new(Team::RED, 3);
        assert_eq!(id.raw(), 0x23);
        assert_eq!(id.team(), Team::RED);
        assert_eq!(id.index(), 3);
        assert_eq!(id.to_string(), "R3");

        let id = BuzzerId::from_raw(0x85);
        assert_eq!(id.raw(), 5);
        assert_eq!(id.to_string(), "B5");

        // reserved teams still print, but have no slot
        let id = BuzzerId::from_raw(0x4A);
        assert_eq!(id.to_string(), "x10");
        assert_eq!(id.team().slot(), None);
    }

    #[test]
    fn team_letters() {
        assert_eq!(Team::from_letter('y'), Some(Team::YELLOW));
        assert_eq!(Team::from_letter('G'), Some(Team::GREEN));
        assert_eq!(Team::from_letter('Q'), None);
        assert_eq!(
            Team::all().map(Team::letter).collect::<String>(),
            "BGRY".to_string()
        );
    }
}
