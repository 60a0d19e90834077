//! Tournament error types.

use super::models::{MatchId, PlayerId, RoundId, TournamentId};
use thiserror::Error;

/// Tournament errors
#[derive(Debug, Error)]
pub enum TournamentError {
    /// A strategy or calculator cannot handle this match size
    #[error("'{name}' does not support {players_per_match}-player matches")]
    UnsupportedPlayerCount {
        name: String,
        players_per_match: usize,
    },

    /// Active pool smaller than the strategy's minimum
    #[error("Insufficient players in tournament {tournament_id}: need {needed}, have {available}")]
    InsufficientPlayers {
        tournament_id: TournamentId,
        needed: usize,
        available: usize,
    },

    #[error("Unknown strategy: {0}")]
    UnknownStrategy(String),

    #[error("Unknown calculator: {0}")]
    UnknownCalculator(String),

    /// The latest round still has unreported matches
    #[error("Round {ordinal} of tournament {tournament_id} still has pending matches")]
    PendingMatches {
        tournament_id: TournamentId,
        round_id: RoundId,
        ordinal: u32,
    },

    /// No pairing without a rematch exists
    #[error("No pairing without a rematch for round {round_id} of tournament {tournament_id} ({} unpaired)", .unpaired.len())]
    PairingExhausted {
        tournament_id: TournamentId,
        round_id: RoundId,
        unpaired: Vec<PlayerId>,
    },

    #[error("Match not found: {0}")]
    UnknownMatch(MatchId),

    /// A result was already recorded for this match
    #[error("Match {0} already has a result")]
    AlreadyReported(MatchId),

    /// Result inconsistent with the match's participants
    #[error("Malformed result for match {match_id}: {reason}")]
    MalformedResult {
        match_id: MatchId,
        player_id: Option<PlayerId>,
        reason: String,
    },

    /// An elimination tournament has a single survivor
    #[error("Tournament {tournament_id} is complete")]
    TournamentComplete {
        tournament_id: TournamentId,
        champion: Option<PlayerId>,
    },

    #[error("Tournament not found: {0}")]
    TournamentNotFound(TournamentId),

    #[error("Player not found: {0}")]
    PlayerNotFound(PlayerId),

    #[error("Round not found: {0}")]
    RoundNotFound(RoundId),

    #[error("Player {player_id} is already registered in tournament {tournament_id}")]
    AlreadyRegistered {
        tournament_id: TournamentId,
        player_id: PlayerId,
    },

    /// A registry entry was rejected
    #[error("Cannot register '{name}': {reason}")]
    InvalidRegistration { name: String, reason: String },

    /// A strategy produced matches that do not fit the active pool
    #[error("Strategy '{strategy}' produced an invalid round: {reason}")]
    InvalidProposal { strategy: String, reason: String },

    /// Persisted data failed validation on load
    #[error("Corrupt record: {0}")]
    CorruptRecord(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Storage operation timed out after {0:?}")]
    StorageTimeout(std::time::Duration),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TournamentError {
    /// Get a client-safe error message that doesn't leak storage details
    pub fn client_message(&self) -> String {
        match self {
            TournamentError::Database(_) => "Internal storage error".to_string(),
            TournamentError::CorruptRecord(_) => "Stored tournament data is corrupt".to_string(),
            TournamentError::Io(_) => "Unable to read input".to_string(),
            _ => self.to_string(),
        }
    }

    /// Whether retrying the same call later could succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            TournamentError::PendingMatches { .. }
                | TournamentError::Database(_)
                | TournamentError::StorageTimeout(_)
        )
    }
}

/// Result type for tournament operations
pub type TournamentResult<T> = Result<T, TournamentError>;
