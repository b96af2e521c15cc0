pub mod buzzer;
pub mod engine;
pub mod id;
pub mod logging;
pub mod modes;
pub mod protocol;
pub mod systems;

#[cfg(test)]
mod testing;
