//! Tournament module: rounds, results and standings.
//!
//! This module provides the scheduling core:
//! - Tournament, player and participation records
//! - Round creation through a registered matchmaking strategy
//! - Result recording and per-player stats
//! - Standings, maintained or replayed from stored results
//!
//! ## Example
//!
//! ```no_run
//! use matchmaker::db::InMemoryRepository;
//! use matchmaker::registry::Registries;
//! use matchmaker::tournament::{MatchResult, RoundConfig, TournamentManager};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = TournamentManager::new(
//!         Arc::new(InMemoryRepository::new()),
//!         Registries::with_builtins(),
//!     );
//!
//!     let tournament = manager.create_tournament("Friday Ladder", None).await?;
//!     for name in ["Ada", "Grace", "Linus", "Ken"] {
//!         let player = manager.create_player(name).await?;
//!         manager.add_player_to_tournament(tournament.id, player.id).await?;
//!     }
//!
//!     let round = manager.create_round(tournament.id, RoundConfig::round_robin()).await?;
//!     for game in &round.matches {
//!         manager
//!             .record_match_result(game.id, MatchResult::winner(game.participants[0]))
//!             .await?;
//!     }
//!
//!     for standing in manager.get_standings(tournament.id).await? {
//!         println!("{}. {} {}", standing.position, standing.player.name, standing.stats.points);
//!     }
//!     Ok(())
//! }
//! ```

pub mod coordinator;
pub mod errors;
pub mod manager;
pub mod models;
pub mod standings;

pub use coordinator::{Admission, RoundCoordinator};
pub use errors::{TournamentError, TournamentResult};
pub use manager::TournamentManager;
pub use models::{
    DEFAULT_CALCULATOR, ExhaustionPolicy, HistoryEntry, Match, MatchId, MatchResult, Metadata,
    Outcome, ParticipationStatus, Player, PlayerId, PlayerStats, RecordedResult, ResultCommit,
    Round, RoundCommit, RoundConfig, RoundId, RoundOptions, RoundState, RoundSummary, Standing,
    StatsDelta, StatsUpdate, Tournament, TournamentId, TournamentPlayer, WaitingEntry,
};
pub use standings::StandingsAggregator;
