//! Standings tables.

use std::collections::HashMap;

use super::models::{Match, Player, PlayerId, PlayerStats, Standing, StatsDelta, TournamentId};
use crate::scoring::outcome_for;

/// Orders participants into a standings table
pub struct StandingsAggregator;

impl StandingsAggregator {
    /// Rank `entries` by points, then wins, both descending.
    ///
    /// `entries` must be in join order; players tied on both keep that order.
    pub fn rank(entries: Vec<(Player, PlayerStats)>) -> Vec<Standing> {
        let mut entries = entries;
        entries.sort_by(|(_, a), (_, b)| {
            b.points
                .total_cmp(&a.points)
                .then_with(|| b.wins.cmp(&a.wins))
        });

        entries
            .into_iter()
            .enumerate()
            .map(|(i, (player, stats))| Standing {
                position: i + 1,
                player,
                stats,
            })
            .collect()
    }

    /// Recompute every participant's stats from stored results.
    ///
    /// Uses the points recorded with each result, so the outcome does not
    /// depend on the calculator configured today.
    pub fn replay(
        tournament_id: TournamentId,
        participants: &[PlayerId],
        matches: &[Match],
    ) -> HashMap<PlayerId, PlayerStats> {
        let mut stats: HashMap<PlayerId, PlayerStats> = participants
            .iter()
            .map(|p| (*p, PlayerStats::new(tournament_id, *p)))
            .collect();

        for game in matches {
            let Some(result) = &game.result else {
                continue;
            };
            for player_id in &game.participants {
                let points = game.awarded_points.get(player_id).copied().unwrap_or(0.0);
                let delta = StatsDelta::for_outcome(outcome_for(*player_id, result), points);
                stats
                    .entry(*player_id)
                    .or_insert_with(|| PlayerStats::new(tournament_id, *player_id))
                    .apply(&delta);
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tournament::MatchResult;
    use uuid::Uuid;

    fn entry(name: &str, points: f64, wins: u32) -> (Player, PlayerStats) {
        let player = Player::new(name);
        let mut stats = PlayerStats::new(Uuid::nil(), player.id);
        stats.points = points;
        stats.wins = wins;
        (player, stats)
    }

    fn names(standings: &[Standing]) -> Vec<&str> {
        standings.iter().map(|s| s.player.name.as_str()).collect()
    }

    #[test]
    fn test_points_then_wins() {
        let standings = StandingsAggregator::rank(vec![
            entry("A", 3.0, 1),
            entry("B", 3.0, 2),
            entry("C", 5.0, 0),
        ]);
        assert_eq!(names(&standings), vec!["C", "B", "A"]);
        assert_eq!(standings[0].position, 1);
        assert_eq!(standings[2].position, 3);
    }

    #[test]
    fn test_full_ties_keep_join_order() {
        let standings = StandingsAggregator::rank(vec![
            entry("first", 1.0, 1),
            entry("second", 1.0, 1),
            entry("third", 2.0, 0),
        ]);
        assert_eq!(names(&standings), vec!["third", "first", "second"]);
    }

    #[test]
    fn test_replay_counts_byes_and_skips_pending() {
        let tid = Uuid::new_v4();
        let rid = Uuid::new_v4();
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        let mut played = Match::new(tid, rid, vec![a, b]);
        played.result = Some(MatchResult::draw());
        played.awarded_points = [(a, 0.5), (b, 0.5)].into_iter().collect();

        let mut bye = Match::bye(tid, rid, c, 2);
        bye.awarded_points.insert(c, 1.0);

        let pending = Match::new(tid, rid, vec![a, c]);

        let stats = StandingsAggregator::replay(tid, &[a, b, c], &[played, bye, pending]);
        assert_eq!(stats[&a].draws, 1);
        assert_eq!(stats[&a].matches_played, 1);
        assert_eq!(stats[&b].points, 0.5);
        assert_eq!(stats[&c].wins, 1);
        assert_eq!(stats[&c].points, 1.0);
    }
}
