//! Tournament data models: players, rounds, matches, results and stats.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use uuid::Uuid;

/// Player ID type
pub type PlayerId = Uuid;

/// Tournament ID type
pub type TournamentId = Uuid;

/// Round ID type
pub type RoundId = Uuid;

/// Match ID type
pub type MatchId = Uuid;

/// Free-form metadata attached to a round proposal
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Per-player stats deltas applied together with a round or a result
pub type StatsUpdate = HashMap<PlayerId, StatsDelta>;

/// Calculator used when a tournament is created without naming one
pub const DEFAULT_CALCULATOR: &str = "standard";

/// A registered player
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Player {
    /// Create a new player with a fresh ID
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            created_at: Utc::now(),
        }
    }
}

/// A tournament and the calculator that scores its matches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tournament {
    pub id: TournamentId,
    pub name: String,
    pub default_calculator: String,
    pub created_at: DateTime<Utc>,
}

impl Tournament {
    /// Create a new tournament scored by `default_calculator`
    pub fn new(name: impl Into<String>, default_calculator: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            default_calculator: default_calculator.into(),
            created_at: Utc::now(),
        }
    }
}

/// Whether a participant is still eligible for pairing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipationStatus {
    /// Eligible for future rounds
    Active,
    /// Knocked out by an elimination strategy
    Eliminated,
}

impl ParticipationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Eliminated => "eliminated",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "eliminated" => Some(Self::Eliminated),
            _ => None,
        }
    }
}

impl fmt::Display for ParticipationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A player's membership in a tournament
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TournamentPlayer {
    pub tournament_id: TournamentId,
    pub player_id: PlayerId,
    pub status: ParticipationStatus,
    pub joined_at: DateTime<Utc>,
}

/// Round lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundState {
    /// No result has been reported yet
    Open,
    /// Some, but not all, results are in
    InProgress,
    /// Every match has a result
    Complete,
}

impl RoundState {
    /// Derive the state of a round from its matches.
    ///
    /// Pre-resolved byes never move a round out of `Open` on their own; a round
    /// with no pending match at all (including one with zero matches) is
    /// `Complete`.
    pub fn from_matches(matches: &[Match]) -> Self {
        if matches.iter().all(Match::is_reported) {
            Self::Complete
        } else if matches.iter().any(|m| !m.auto_bye && m.is_reported()) {
            Self::InProgress
        } else {
            Self::Open
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Complete => "complete",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "open" => Some(Self::Open),
            "in_progress" => Some(Self::InProgress),
            "complete" => Some(Self::Complete),
            _ => None,
        }
    }
}

impl fmt::Display for RoundState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a strategy does when no pairing without a rematch exists
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExhaustionPolicy {
    /// Refuse with `PairingExhausted`
    #[default]
    Fail,
    /// Allow repeat pairings
    Rematch,
}

/// Strategy tuning carried by a round configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoundOptions {
    #[serde(default)]
    pub exhaustion: ExhaustionPolicy,
    /// Resolve a lone unpaired player as an automatic win
    #[serde(default)]
    pub award_byes: bool,
    /// Options understood by plugin strategies
    #[serde(default)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Configuration passed to `create_round`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundConfig {
    pub strategy: String,
    /// Match size; `0` asks free-for-all for the whole pool
    pub players_per_match: usize,
    #[serde(default)]
    pub options: RoundOptions,
}

impl RoundConfig {
    /// Create a configuration for any registered strategy
    pub fn new(strategy: impl Into<String>, players_per_match: usize) -> Self {
        Self {
            strategy: strategy.into(),
            players_per_match,
            options: RoundOptions::default(),
        }
    }

    /// Head-to-head round robin
    pub fn round_robin() -> Self {
        Self::new("roundrobin", 2)
    }

    /// Single elimination with `players_per_match` seats per match
    pub fn knockout(players_per_match: usize) -> Self {
        Self::new("knockout", players_per_match)
    }

    /// Head-to-head Swiss system
    pub fn swiss() -> Self {
        Self::new("swiss", 2)
    }

    /// One match holding the whole active pool
    pub fn free_for_all() -> Self {
        Self::new("freeforall", 0)
    }

    /// A plugin strategy registered under `strategy`
    pub fn custom(strategy: impl Into<String>, players_per_match: usize) -> Self {
        Self::new(strategy, players_per_match)
    }

    pub fn with_exhaustion(mut self, policy: ExhaustionPolicy) -> Self {
        self.options.exhaustion = policy;
        self
    }

    pub fn with_byes(mut self, award_byes: bool) -> Self {
        self.options.award_byes = award_byes;
        self
    }
}

/// One scheduling step within a tournament
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Round {
    pub id: RoundId,
    pub tournament_id: TournamentId,
    /// 1-based position in the tournament
    pub ordinal: u32,
    pub strategy: String,
    pub config: RoundConfig,
    pub state: RoundState,
    pub created_at: DateTime<Utc>,
}

/// A reported match outcome
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub is_draw: bool,
    #[serde(default)]
    pub winner_ids: Vec<PlayerId>,
    /// Placement per participant, 1 is best; ties share a placement
    #[serde(default)]
    pub rankings: BTreeMap<PlayerId, u32>,
}

impl MatchResult {
    /// A decisive result with a single winner
    pub fn winner(player_id: PlayerId) -> Self {
        Self::winners(vec![player_id])
    }

    /// A decisive result with one or more winners
    pub fn winners(winner_ids: Vec<PlayerId>) -> Self {
        Self {
            is_draw: false,
            winner_ids,
            rankings: BTreeMap::new(),
        }
    }

    /// A draw between every participant
    pub fn draw() -> Self {
        Self {
            is_draw: true,
            ..Self::default()
        }
    }

    /// A result given purely as placements
    pub fn ranked(rankings: impl IntoIterator<Item = (PlayerId, u32)>) -> Self {
        Self {
            is_draw: false,
            winner_ids: Vec::new(),
            rankings: rankings.into_iter().collect(),
        }
    }

    /// The pre-resolved result of an automatic bye
    pub fn bye(player_id: PlayerId) -> Self {
        Self {
            is_draw: false,
            winner_ids: vec![player_id],
            rankings: BTreeMap::from([(player_id, 1)]),
        }
    }
}

/// A scheduled grouping of players within a round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub round_id: RoundId,
    pub tournament_id: TournamentId,
    pub participants: Vec<PlayerId>,
    pub players_per_match: usize,
    pub scheduled_at: DateTime<Utc>,
    /// Single-participant match resolved as a win at creation
    pub auto_bye: bool,
    pub result: Option<MatchResult>,
    /// Points credited per participant when the result was recorded
    #[serde(default)]
    pub awarded_points: BTreeMap<PlayerId, f64>,
}

impl Match {
    /// Schedule a match between `participants`
    pub fn new(tournament_id: TournamentId, round_id: RoundId, participants: Vec<PlayerId>) -> Self {
        Self {
            id: Uuid::new_v4(),
            round_id,
            tournament_id,
            players_per_match: participants.len(),
            participants,
            scheduled_at: Utc::now(),
            auto_bye: false,
            result: None,
            awarded_points: BTreeMap::new(),
        }
    }

    /// Schedule an automatic bye, valued as a win in a match of `players_per_match`
    pub fn bye(
        tournament_id: TournamentId,
        round_id: RoundId,
        player_id: PlayerId,
        players_per_match: usize,
    ) -> Self {
        Self {
            players_per_match,
            auto_bye: true,
            result: Some(MatchResult::bye(player_id)),
            ..Self::new(tournament_id, round_id, vec![player_id])
        }
    }

    pub fn is_reported(&self) -> bool {
        self.result.is_some()
    }

    pub fn involves(&self, player_id: PlayerId) -> bool {
        self.participants.contains(&player_id)
    }
}

/// A player parked in a round without a match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitingEntry {
    pub round_id: RoundId,
    pub tournament_id: TournamentId,
    pub player_id: PlayerId,
    pub added_at: DateTime<Utc>,
}

impl WaitingEntry {
    pub fn new(tournament_id: TournamentId, round_id: RoundId, player_id: PlayerId) -> Self {
        Self {
            round_id,
            tournament_id,
            player_id,
            added_at: Utc::now(),
        }
    }
}

/// Participants of an earlier match, used to avoid repeat pairings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub participants: Vec<PlayerId>,
    pub round_ordinal: u32,
}

/// Win/draw/loss classification of a participant in a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Win,
    Draw,
    Loss,
}

/// Aggregate record of one player in one tournament
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub player_id: PlayerId,
    pub tournament_id: TournamentId,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
    pub matches_played: u32,
    pub points: f64,
}

impl PlayerStats {
    /// Zeroed stats for a fresh participant
    pub fn new(tournament_id: TournamentId, player_id: PlayerId) -> Self {
        Self {
            player_id,
            tournament_id,
            ..Self::default()
        }
    }

    pub fn apply(&mut self, delta: &StatsDelta) {
        self.wins += delta.wins;
        self.draws += delta.draws;
        self.losses += delta.losses;
        self.matches_played += delta.matches_played;
        self.points += delta.points;
    }
}

/// Increment to a player's stats for one scored match
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsDelta {
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
    pub matches_played: u32,
    pub points: f64,
}

impl StatsDelta {
    /// The delta for one match that ended with `outcome`
    pub fn for_outcome(outcome: Outcome, points: f64) -> Self {
        Self {
            wins: u32::from(outcome == Outcome::Win),
            draws: u32::from(outcome == Outcome::Draw),
            losses: u32::from(outcome == Outcome::Loss),
            matches_played: 1,
            points,
        }
    }
}

/// Everything persisted atomically when a round is created
#[derive(Debug, Clone)]
pub struct RoundCommit {
    pub round: Round,
    pub matches: Vec<Match>,
    pub waiting: Vec<WaitingEntry>,
    /// Credit for auto-byes
    pub stats: StatsUpdate,
}

/// Everything persisted atomically when a result is recorded
#[derive(Debug, Clone)]
pub struct ResultCommit {
    pub result: MatchResult,
    pub awarded_points: BTreeMap<PlayerId, f64>,
    pub stats: StatsUpdate,
    pub eliminated: Vec<PlayerId>,
}

/// A created round together with what the strategy produced
#[derive(Debug, Clone, Serialize)]
pub struct RoundSummary {
    pub round: Round,
    pub matches: Vec<Match>,
    pub waiting: Vec<PlayerId>,
    pub metadata: Metadata,
}

/// The effect of recording one result
#[derive(Debug, Clone, Serialize)]
pub struct RecordedResult {
    pub match_id: MatchId,
    pub round_id: RoundId,
    pub round_state: RoundState,
    pub awarded_points: BTreeMap<PlayerId, f64>,
    pub eliminated: Vec<PlayerId>,
}

/// One row of a standings table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Standing {
    /// 1-based position
    pub position: usize,
    pub player: Player,
    pub stats: PlayerStats,
}
