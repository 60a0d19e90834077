//! # Matchmaker
//!
//! A tournament matchmaking and scoring engine.
//!
//! Players join tournaments; each round is generated by a pluggable
//! matchmaking strategy (round robin, knockout, Swiss, free-for-all) and each
//! reported result is scored by a pluggable points calculator. Standings are
//! derived from the accumulated per-player stats.
//!
//! ## Architecture
//!
//! - Strategies and calculators are pure: they read data prepared by the
//!   [`tournament::RoundCoordinator`] and never touch storage.
//! - Storage sits behind [`db::TournamentRepository`], with PostgreSQL and
//!   in-memory implementations.
//! - Strategies and calculators are looked up by name in [`registry::Registries`],
//!   populated at startup from built-ins and explicitly installed plugins.
//!
//! ## Core Modules
//!
//! - [`tournament`]: models, round lifecycle, standings and the manager facade
//! - [`strategy`]: matchmaking strategies
//! - [`scoring`]: result validation and points calculators
//! - [`registry`]: name-keyed strategy and calculator registries
//! - [`db`]: storage backends

/// Storage backends and database configuration.
pub mod db;

/// Strategy and calculator registries.
pub mod registry;

/// Result validation and points calculators.
pub mod scoring;

/// Matchmaking strategies.
pub mod strategy;

/// Tournament models, round lifecycle and standings.
pub mod tournament;

pub use registry::{Plugin, Registries};
pub use tournament::{TournamentError, TournamentManager, TournamentResult};
