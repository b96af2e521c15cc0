//! Quiz mode controllers.
//!
//! Each controller is created once, registers its entry command, and is reused
//! for every question. Entering a mode registers the temporary commands and
//! button handling it needs, finishing one removes them and blanks every buzzer.

pub mod multiple_choice;
pub mod quick_fire;
pub mod test_mode;
