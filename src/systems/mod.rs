//! Long running actors, each owning its state and serving requests one at a time.

pub mod scoreboard;
pub mod swarm;
