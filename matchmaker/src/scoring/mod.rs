//! Match scoring: result validation, outcome derivation and points calculators.
//!
//! A [`PointsCalculator`] turns one participant's share of a [`MatchResult`]
//! into points. The helpers here give every calculator the same reading of a
//! result:
//!
//! - a draw is a [`Outcome::Draw`] for every participant and places everyone 1st
//! - with `winner_ids`, winners win and everyone else loses
//! - with only `rankings`, placement 1 wins and everyone else loses
//!
//! An automatic bye is a win for its single participant, valued as a win in a
//! match of the round's configured size.

pub mod calculators;

pub use calculators::{
    CustomCalculator, PercentageCalculator, PointsTable, RankingCalculator, StandardCalculator,
    ThreePointCalculator,
};

use crate::tournament::{Match, MatchResult, Outcome, PlayerId, TournamentError, TournamentResult};
use std::collections::HashSet;

/// Converts a participant's result into points
pub trait PointsCalculator: Send + Sync {
    /// Registry name
    fn name(&self) -> &str;

    /// Whether matches of `n` players can be scored
    fn supports_players_per_match(&self, _n: usize) -> bool {
        true
    }

    /// Points earned by `player_id` in `game` given `result`.
    ///
    /// Fails with `MalformedResult` when the player did not take part or the
    /// result is inconsistent with the match.
    fn calculate_points(
        &self,
        player_id: PlayerId,
        game: &Match,
        result: &MatchResult,
    ) -> TournamentResult<f64>;
}

/// Check that `result` is consistent with the participants of `game`
pub fn validate_result(game: &Match, result: &MatchResult) -> TournamentResult<()> {
    let malformed = |player_id: Option<PlayerId>, reason: &str| TournamentError::MalformedResult {
        match_id: game.id,
        player_id,
        reason: reason.to_string(),
    };

    let participants: HashSet<PlayerId> = game.participants.iter().copied().collect();
    let size = game.participants.len();

    let mut seen = HashSet::new();
    for winner in &result.winner_ids {
        if !participants.contains(winner) {
            return Err(malformed(Some(*winner), "winner is not a participant"));
        }
        if !seen.insert(*winner) {
            return Err(malformed(Some(*winner), "winner listed more than once"));
        }
    }

    for (player, rank) in &result.rankings {
        if !participants.contains(player) {
            return Err(malformed(Some(*player), "ranked player is not a participant"));
        }
        if *rank == 0 || *rank as usize > size {
            return Err(malformed(Some(*player), "placement out of range"));
        }
    }

    if !result.rankings.is_empty() {
        if let Some(missing) = game.participants.iter().find(|p| !result.rankings.contains_key(p)) {
            return Err(malformed(Some(*missing), "participant has no placement"));
        }
        if !result.rankings.values().any(|rank| *rank == 1) {
            return Err(malformed(None, "nobody is placed first"));
        }
    }

    if result.is_draw {
        if !result.winner_ids.is_empty() {
            return Err(malformed(None, "a draw cannot name winners"));
        }
        if let Some((player, _)) = result.rankings.iter().find(|(_, rank)| **rank != 1) {
            return Err(malformed(Some(*player), "a draw places every participant first"));
        }
        return Ok(());
    }

    if result.winner_ids.is_empty() && result.rankings.is_empty() {
        return Err(malformed(None, "a decisive result needs winners or placements"));
    }

    if !result.winner_ids.is_empty() && !result.rankings.is_empty() {
        for player in &game.participants {
            let won = result.winner_ids.contains(player);
            let first = result.rankings.get(player) == Some(&1);
            if won != first {
                return Err(malformed(
                    Some(*player),
                    "winners must be exactly the players placed first",
                ));
            }
        }
    }

    let winners = if result.winner_ids.is_empty() {
        result.rankings.values().filter(|rank| **rank == 1).count()
    } else {
        result.winner_ids.len()
    };
    if size > 1 && winners == size {
        return Err(malformed(None, "every participant won; report a draw instead"));
    }

    Ok(())
}

/// Classify `player_id`'s share of `result`
pub fn outcome_for(player_id: PlayerId, result: &MatchResult) -> Outcome {
    if result.is_draw {
        Outcome::Draw
    } else if !result.winner_ids.is_empty() {
        if result.winner_ids.contains(&player_id) {
            Outcome::Win
        } else {
            Outcome::Loss
        }
    } else if result.rankings.get(&player_id) == Some(&1) {
        Outcome::Win
    } else {
        Outcome::Loss
    }
}

/// Placement of `player_id`, derived from winners when no rankings are given
pub fn placement_of(player_id: PlayerId, result: &MatchResult) -> u32 {
    if let Some(rank) = result.rankings.get(&player_id) {
        return *rank;
    }
    if result.is_draw || result.winner_ids.contains(&player_id) {
        1
    } else {
        result.winner_ids.len() as u32 + 1
    }
}

/// Fail unless `player_id` took part in `game`
pub(crate) fn ensure_participant(player_id: PlayerId, game: &Match) -> TournamentResult<()> {
    if game.involves(player_id) {
        Ok(())
    } else {
        Err(TournamentError::MalformedResult {
            match_id: game.id,
            player_id: Some(player_id),
            reason: "player is not a participant".to_string(),
        })
    }
}

/// Shared prologue of every built-in calculator
pub(crate) fn check_scorable(
    player_id: PlayerId,
    game: &Match,
    result: &MatchResult,
) -> TournamentResult<()> {
    ensure_participant(player_id, game)?;
    validate_result(game, result)
}
