//! Click tutorial: an onboarding game that teaches tapping, rubbing, shaking
//! and tilting on a grid of colored dots.
//!
//! [`tutorial`] is the host-independent engine; [`server`] runs it behind a
//! WebSocket, one tutorial per connection.

pub mod config;
pub mod server;
pub mod tutorial;

#[cfg(test)]
mod tests;
