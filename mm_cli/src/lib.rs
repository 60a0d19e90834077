//! Line-oriented command front end for the matchmaker engine.
//!
//! `commands` parses input lines, `config` resolves flags and environment,
//! and `session` runs parsed commands against a `TournamentManager`.

pub mod commands;
pub mod config;
pub mod session;
