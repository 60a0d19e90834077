//! Matchmaking strategies.
//!
//! A strategy reads a [`PairingContext`] prepared by the coordinator (active
//! pool in join order, round configuration, match history, stats and the
//! players carried on the previous round's waiting list) and proposes the
//! matches of one round. Strategies never touch storage; the coordinator
//! persists the [`RoundProposal`] atomically.

pub mod free_for_all;
pub mod knockout;
pub mod round_robin;
pub mod swiss;

pub use free_for_all::FreeForAllStrategy;
pub use knockout::KnockoutStrategy;
pub use round_robin::RoundRobinStrategy;
pub use swiss::SwissStrategy;

use crate::tournament::{
    HistoryEntry, Match, Metadata, PlayerId, PlayerStats, RoundConfig, RoundId, TournamentError,
    TournamentId, TournamentResult,
};
use std::collections::{HashMap, HashSet};

/// Everything a strategy may read when proposing a round
#[derive(Debug, Clone, Copy)]
pub struct PairingContext<'a> {
    pub tournament_id: TournamentId,
    pub round_id: RoundId,
    pub ordinal: u32,
    /// Active players in join order
    pub available: &'a [PlayerId],
    pub config: &'a RoundConfig,
    pub history: &'a [HistoryEntry],
    pub stats: &'a HashMap<PlayerId, PlayerStats>,
    /// Players left waiting at the end of the previous round
    pub carried: &'a [PlayerId],
}

impl PairingContext<'_> {
    pub fn players_per_match(&self) -> usize {
        self.config.players_per_match
    }

    pub fn played_pairs(&self) -> PlayedPairs {
        PlayedPairs::from_history(self.history)
    }

    pub fn points_of(&self, player_id: PlayerId) -> f64 {
        self.stats.get(&player_id).map_or(0.0, |s| s.points)
    }

    /// Schedule a match in this round
    pub fn schedule(&self, participants: Vec<PlayerId>) -> Match {
        Match::new(self.tournament_id, self.round_id, participants)
    }

    /// Schedule an automatic bye in this round
    pub fn bye(&self, player_id: PlayerId) -> Match {
        Match::bye(
            self.tournament_id,
            self.round_id,
            player_id,
            self.players_per_match().max(2),
        )
    }

    pub fn insufficient(&self, needed: usize) -> TournamentError {
        TournamentError::InsufficientPlayers {
            tournament_id: self.tournament_id,
            needed,
            available: self.available.len(),
        }
    }

    pub fn exhausted(&self, unpaired: Vec<PlayerId>) -> TournamentError {
        TournamentError::PairingExhausted {
            tournament_id: self.tournament_id,
            round_id: self.round_id,
            unpaired,
        }
    }
}

/// A strategy's proposal for one round
#[derive(Debug, Clone, Default)]
pub struct RoundProposal {
    pub matches: Vec<Match>,
    pub waiting: Vec<PlayerId>,
    pub metadata: Metadata,
}

/// Unordered pairs of players who already shared a match
#[derive(Debug, Clone, Default)]
pub struct PlayedPairs {
    pairs: HashSet<(PlayerId, PlayerId)>,
}

impl PlayedPairs {
    pub fn from_history(history: &[HistoryEntry]) -> Self {
        let mut played = Self::default();
        for entry in history {
            played.record(&entry.participants);
        }
        played
    }

    /// Mark every pair within `group` as played
    pub fn record(&mut self, group: &[PlayerId]) {
        for (i, a) in group.iter().enumerate() {
            for b in &group[i + 1..] {
                self.pairs.insert(Self::key(*a, *b));
            }
        }
    }

    pub fn contains(&self, a: PlayerId, b: PlayerId) -> bool {
        self.pairs.contains(&Self::key(a, b))
    }

    /// True when no two members of `group` have met
    pub fn is_fresh(&self, group: &[PlayerId]) -> bool {
        group
            .iter()
            .enumerate()
            .all(|(i, a)| group[i + 1..].iter().all(|b| !self.contains(*a, *b)))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    fn key(a: PlayerId, b: PlayerId) -> (PlayerId, PlayerId) {
        if a <= b { (a, b) } else { (b, a) }
    }
}

/// Build as many fresh groups of `size` as a greedy pass in `players` order allows.
///
/// Returns the groups and the players left over, in their original order.
pub fn greedy_groups(
    players: &[PlayerId],
    size: usize,
    played: &PlayedPairs,
) -> (Vec<Vec<PlayerId>>, Vec<PlayerId>) {
    let mut used = vec![false; players.len()];
    let mut groups = Vec::new();

    if size == 0 {
        return (groups, players.to_vec());
    }

    for start in 0..players.len() {
        if used[start] {
            continue;
        }
        let mut group = vec![start];
        for candidate in start + 1..players.len() {
            if group.len() == size {
                break;
            }
            if used[candidate] {
                continue;
            }
            let fits = group
                .iter()
                .all(|member| !played.contains(players[*member], players[candidate]));
            if fits {
                group.push(candidate);
            }
        }
        if group.len() == size {
            for member in &group {
                used[*member] = true;
            }
            groups.push(group.iter().map(|i| players[*i]).collect());
        }
    }

    let leftover = players
        .iter()
        .zip(&used)
        .filter(|(_, used)| !**used)
        .map(|(p, _)| *p)
        .collect();
    (groups, leftover)
}

/// A pairing algorithm for one tournament format
pub trait MatchmakingStrategy: Send + Sync {
    /// Registry name
    fn name(&self) -> &str;

    /// Whether this format can build matches of `n` players
    fn supports_players_per_match(&self, n: usize) -> bool;

    /// Propose the matches of the round described by `ctx`
    fn create_matches(&self, ctx: &PairingContext<'_>) -> TournamentResult<RoundProposal>;

    /// Whether losers leave the active pool when a result is recorded
    fn eliminates_losers(&self) -> bool {
        false
    }

    /// Group players who joined the waiting list of a still-open round.
    ///
    /// The default forms fresh groups of the round's match size in arrival
    /// order; players that cannot be grouped keep waiting.
    fn pair_waiting(&self, ctx: &PairingContext<'_>, waiting: &[PlayerId]) -> Vec<Vec<PlayerId>> {
        let size = ctx.players_per_match().max(2);
        if waiting.len() < size {
            return Vec::new();
        }
        greedy_groups(waiting, size, &ctx.played_pairs()).0
    }
}

/// Fail with `UnsupportedPlayerCount` unless `strategy` accepts the configured match size
pub fn ensure_supported(
    strategy: &dyn MatchmakingStrategy,
    ctx: &PairingContext<'_>,
) -> TournamentResult<()> {
    let n = ctx.players_per_match();
    if strategy.supports_players_per_match(n) {
        Ok(())
    } else {
        Err(TournamentError::UnsupportedPlayerCount {
            name: strategy.name().to_string(),
            players_per_match: n,
        })
    }
}
