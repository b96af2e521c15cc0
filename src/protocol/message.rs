use crate::id::BuzzerId;

/// Firmware version every buzzer is expected to report
pub const EXPECTED_VERSION: u8 = 4;

pub mod message_type {
    /// Anything below this value is a version announcement
    pub const VERSION_LIMIT: u8 = 0x20;
    pub const IDENTIFY_FLAG: u8 = 0x80;
    pub const MODE: u8 = 0x20;
    pub const BUTTON_PRESS: u8 = 0x30;
    pub const HEARTBEAT: u8 = 0x31;
    pub const ERROR: u8 = 0x7F;
}

const MODE_LED: u8 = 0x01;
const MODE_BUZZER: u8 = 0x02;

/// A single byte sent from a buzzer to the station
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    Version(u8),
    Identify(BuzzerId),
    ButtonPress,
    Heartbeat,
    Error,
    Unknown(u8),
}

impl Message {
    pub fn decode(byte: u8) -> Self {
        match byte {
            b if b < message_type::VERSION_LIMIT => Self::Version(b),
            b if b & message_type::IDENTIFY_FLAG != 0 => Self::Identify(BuzzerId::from_raw(b)),
            message_type::BUTTON_PRESS => Self::ButtonPress,
            message_type::HEARTBEAT => Self::Heartbeat,
            message_type::ERROR => Self::Error,
            b => Self::Unknown(b),
        }
    }

    pub fn encode(&self) -> u8 {
        match self {
            Self::Version(version) => version & (message_type::VERSION_LIMIT - 1),
            Self::Identify(id) => message_type::IDENTIFY_FLAG | id.raw(),
            Self::ButtonPress => message_type::BUTTON_PRESS,
            Self::Heartbeat => message_type::HEARTBEAT,
            Self::Error => message_type::ERROR,
            Self::Unknown(b) => *b,
        }
    }
}

/// Output state of a buzzer, sent from the station to a buzzer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Mode {
    pub led: bool,
    pub buzzer: bool,
}

impl Mode {
    pub const OFF: Mode = Mode::new(false, false);
    pub const ON: Mode = Mode::new(true, true);
    pub const LED: Mode = Mode::new(true, false);

    pub const fn new(led: bool, buzzer: bool) -> Self {
        Self { led, buzzer }
    }

    /// The same mode with the audio output suppressed
    pub fn muted(self) -> Self {
        Self {
            buzzer: false,
            ..self
        }
    }

    pub fn encode(&self) -> u8 {
        let mut byte = message_type::MODE;
        if self.led {
            byte |= MODE_LED;
        }
        if self.buzzer {
            byte |= MODE_BUZZER;
        }

        byte
    }

    pub fn decode(byte: u8) -> Option<Self> {
        if byte & !(MODE_LED | MODE_BUZZER) != message_type::MODE {
            return None;
        }

        Some(Self::new(byte & MODE_LED != 0, byte & MODE_BUZZER != 0))
    }
}
