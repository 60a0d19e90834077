//! Built-in points calculators.

use super::{PointsCalculator, check_scorable, outcome_for, placement_of};
use crate::tournament::{Match, MatchResult, Outcome, PlayerId, TournamentError, TournamentResult};

/// 1 point for a win, 0.5 for a draw, 0 for a loss
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardCalculator;

impl StandardCalculator {
    pub const NAME: &'static str = "standard";
}

impl PointsCalculator for StandardCalculator {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn calculate_points(
        &self,
        player_id: PlayerId,
        game: &Match,
        result: &MatchResult,
    ) -> TournamentResult<f64> {
        check_scorable(player_id, game, result)?;
        Ok(match outcome_for(player_id, result) {
            Outcome::Win => 1.0,
            Outcome::Draw => 0.5,
            Outcome::Loss => 0.0,
        })
    }
}

/// 3 points for a win, 1 for a draw, 0 for a loss
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreePointCalculator;

impl ThreePointCalculator {
    pub const NAME: &'static str = "three_point";
}

impl PointsCalculator for ThreePointCalculator {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn calculate_points(
        &self,
        player_id: PlayerId,
        game: &Match,
        result: &MatchResult,
    ) -> TournamentResult<f64> {
        check_scorable(player_id, game, result)?;
        Ok(match outcome_for(player_id, result) {
            Outcome::Win => 3.0,
            Outcome::Draw => 1.0,
            Outcome::Loss => 0.0,
        })
    }
}

/// `n - (placement - 1)` points in an `n`-player match
#[derive(Debug, Clone, Copy, Default)]
pub struct RankingCalculator;

impl RankingCalculator {
    pub const NAME: &'static str = "ranking";
}

impl PointsCalculator for RankingCalculator {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn calculate_points(
        &self,
        player_id: PlayerId,
        game: &Match,
        result: &MatchResult,
    ) -> TournamentResult<f64> {
        check_scorable(player_id, game, result)?;
        let size = if game.auto_bye {
            game.players_per_match.max(1)
        } else {
            game.participants.len()
        };
        let rank = placement_of(player_id, result) as usize;
        Ok((size + 1).saturating_sub(rank) as f64)
    }
}

/// Share of opponents beaten, with ties counting half, scaled to 100
#[derive(Debug, Clone, Copy, Default)]
pub struct PercentageCalculator;

impl PercentageCalculator {
    pub const NAME: &'static str = "percentage";
}

impl PointsCalculator for PercentageCalculator {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn calculate_points(
        &self,
        player_id: PlayerId,
        game: &Match,
        result: &MatchResult,
    ) -> TournamentResult<f64> {
        check_scorable(player_id, game, result)?;
        if game.auto_bye {
            return Ok(100.0);
        }

        let mine = placement_of(player_id, result);
        let (mut defeated, mut tied, mut opponents) = (0.0, 0.0, 0.0);
        for other in game.participants.iter().filter(|p| **p != player_id) {
            opponents += 1.0;
            let theirs = placement_of(*other, result);
            if theirs > mine {
                defeated += 1.0;
            } else if theirs == mine {
                tied += 1.0;
            }
        }

        if opponents == 0.0 {
            return Ok(100.0);
        }
        Ok((defeated + 0.5 * tied) / opponents * 100.0)
    }
}

/// Points table behind a [`CustomCalculator`]
#[derive(Debug, Clone, PartialEq)]
pub enum PointsTable {
    /// Fixed points per outcome
    Outcomes { win: f64, draw: f64, loss: f64 },
    /// Points by placement; entry 0 is 1st place
    Placements(Vec<f64>),
}

/// A calculator driven by a caller-supplied points table
#[derive(Debug, Clone, PartialEq)]
pub struct CustomCalculator {
    name: String,
    table: PointsTable,
}

impl CustomCalculator {
    /// Name the built-in weighted calculator is registered under
    pub const NAME: &'static str = "custom_weighted";

    pub fn new(name: impl Into<String>, table: PointsTable) -> Self {
        Self {
            name: name.into(),
            table,
        }
    }

    pub fn with_outcomes(name: impl Into<String>, win: f64, draw: f64, loss: f64) -> Self {
        Self::new(name, PointsTable::Outcomes { win, draw, loss })
    }

    pub fn with_placements(name: impl Into<String>, placements: Vec<f64>) -> Self {
        Self::new(name, PointsTable::Placements(placements))
    }

    /// The built-in `custom_weighted` table: 1st 10, 2nd 5, 3rd 2, 4th 1
    pub fn weighted() -> Self {
        Self::with_placements(Self::NAME, vec![10.0, 5.0, 2.0, 1.0])
    }

    pub fn table(&self) -> &PointsTable {
        &self.table
    }
}

impl PointsCalculator for CustomCalculator {
    fn name(&self) -> &str {
        &self.name
    }

    fn supports_players_per_match(&self, n: usize) -> bool {
        match &self.table {
            PointsTable::Outcomes { .. } => true,
            PointsTable::Placements(values) => n <= values.len(),
        }
    }

    fn calculate_points(
        &self,
        player_id: PlayerId,
        game: &Match,
        result: &MatchResult,
    ) -> TournamentResult<f64> {
        check_scorable(player_id, game, result)?;
        match &self.table {
            PointsTable::Outcomes { win, draw, loss } => Ok(match outcome_for(player_id, result) {
                Outcome::Win => *win,
                Outcome::Draw => *draw,
                Outcome::Loss => *loss,
            }),
            PointsTable::Placements(values) => {
                let index = placement_of(player_id, result).saturating_sub(1) as usize;
                values.get(index).copied().ok_or_else(|| {
                    TournamentError::UnsupportedPlayerCount {
                        name: self.name.clone(),
                        players_per_match: game.participants.len(),
                    }
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn game_of(n: usize) -> (Match, Vec<PlayerId>) {
        let players: Vec<PlayerId> = (0..n).map(|_| Uuid::new_v4()).collect();
        (Match::new(Uuid::new_v4(), Uuid::new_v4(), players.clone()), players)
    }

    fn points(calc: &dyn PointsCalculator, game: &Match, result: &MatchResult) -> Vec<f64> {
        game.participants
            .iter()
            .map(|p| calc.calculate_points(*p, game, result).unwrap())
            .collect()
    }

    #[test]
    fn test_standard_points() {
        let (game, p) = game_of(2);
        assert_eq!(points(&StandardCalculator, &game, &MatchResult::winner(p[1])), vec![0.0, 1.0]);
        assert_eq!(points(&StandardCalculator, &game, &MatchResult::draw()), vec![0.5, 0.5]);
    }

    #[test]
    fn test_three_point_points() {
        let (game, p) = game_of(2);
        assert_eq!(points(&ThreePointCalculator, &game, &MatchResult::winner(p[0])), vec![3.0, 0.0]);
        assert_eq!(points(&ThreePointCalculator, &game, &MatchResult::draw()), vec![1.0, 1.0]);
    }

    #[test]
    fn test_ranking_points_with_ties() {
        let (game, p) = game_of(4);
        let result = MatchResult::ranked([(p[0], 1), (p[1], 2), (p[2], 2), (p[3], 4)]);
        assert_eq!(points(&RankingCalculator, &game, &result), vec![4.0, 3.0, 3.0, 1.0]);
    }

    #[test]
    fn test_ranking_points_from_winners_only() {
        let (game, p) = game_of(3);
        assert_eq!(points(&RankingCalculator, &game, &MatchResult::winner(p[2])), vec![2.0, 2.0, 3.0]);
    }

    #[test]
    fn test_percentage_points() {
        let (game, p) = game_of(3);
        let result = MatchResult::ranked([(p[0], 1), (p[1], 2), (p[2], 2)]);
        assert_eq!(points(&PercentageCalculator, &game, &result), vec![100.0, 25.0, 25.0]);
        assert_eq!(points(&PercentageCalculator, &game, &MatchResult::draw()), vec![50.0, 50.0, 50.0]);
    }

    #[test]
    fn test_byes_are_valued_as_wins() {
        let player = Uuid::new_v4();
        let bye = Match::bye(Uuid::new_v4(), Uuid::new_v4(), player, 4);
        let result = MatchResult::bye(player);

        assert_eq!(StandardCalculator.calculate_points(player, &bye, &result).unwrap(), 1.0);
        assert_eq!(ThreePointCalculator.calculate_points(player, &bye, &result).unwrap(), 3.0);
        assert_eq!(RankingCalculator.calculate_points(player, &bye, &result).unwrap(), 4.0);
        assert_eq!(PercentageCalculator.calculate_points(player, &bye, &result).unwrap(), 100.0);
        assert_eq!(CustomCalculator::weighted().calculate_points(player, &bye, &result).unwrap(), 10.0);
    }

    #[test]
    fn test_custom_outcome_table() {
        let calc = CustomCalculator::with_outcomes("league", 2.0, 1.0, -1.0);
        let (game, p) = game_of(2);
        assert_eq!(points(&calc, &game, &MatchResult::winner(p[0])), vec![2.0, -1.0]);
        assert!(calc.supports_players_per_match(8));
    }

    #[test]
    fn test_custom_placement_table_limits_match_size() {
        let calc = CustomCalculator::weighted();
        assert!(calc.supports_players_per_match(4));
        assert!(!calc.supports_players_per_match(5));

        let (game, p) = game_of(4);
        let result = MatchResult::ranked([(p[0], 2), (p[1], 1), (p[2], 4), (p[3], 3)]);
        assert_eq!(points(&calc, &game, &result), vec![5.0, 10.0, 1.0, 2.0]);
    }

    #[test]
    fn test_rejects_non_participant() {
        let (game, p) = game_of(2);
        let err = StandardCalculator
            .calculate_points(Uuid::new_v4(), &game, &MatchResult::winner(p[0]))
            .unwrap_err();
        assert!(matches!(err, TournamentError::MalformedResult { .. }));
    }
}
