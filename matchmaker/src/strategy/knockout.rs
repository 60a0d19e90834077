//! Single elimination.

use super::{MatchmakingStrategy, PairingContext, RoundProposal, ensure_supported};
use crate::tournament::{Metadata, PlayerId, TournamentError, TournamentResult};
use serde_json::json;
use std::collections::HashSet;

/// Players meet `k` at a time in arrival order; losers are eliminated
#[derive(Debug, Clone, Copy, Default)]
pub struct KnockoutStrategy;

impl KnockoutStrategy {
    pub const NAME: &'static str = "knockout";
}

impl MatchmakingStrategy for KnockoutStrategy {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn supports_players_per_match(&self, n: usize) -> bool {
        n >= 2
    }

    fn eliminates_losers(&self) -> bool {
        true
    }

    fn create_matches(&self, ctx: &PairingContext<'_>) -> TournamentResult<RoundProposal> {
        ensure_supported(self, ctx)?;
        let k = ctx.players_per_match();

        if let [champion] = ctx.available {
            return Err(TournamentError::TournamentComplete {
                tournament_id: ctx.tournament_id,
                champion: Some(*champion),
            });
        }
        if ctx.available.len() < k {
            return Err(ctx.insufficient(k));
        }

        // Players who already waited a round go last
        let carried: HashSet<PlayerId> = ctx.carried.iter().copied().collect();
        let (held, fresh): (Vec<PlayerId>, Vec<PlayerId>) =
            ctx.available.iter().copied().partition(|p| carried.contains(p));
        let order: Vec<PlayerId> = fresh.into_iter().chain(held.iter().copied()).collect();

        let full = order.len() / k * k;
        let mut matches: Vec<_> = order[..full]
            .chunks(k)
            .map(|group| ctx.schedule(group.to_vec()))
            .collect();

        let mut waiting = order[full..].to_vec();
        let mut bye = None;
        if let [single] = waiting.as_slice() {
            if carried.contains(single) || ctx.config.options.award_byes {
                bye = Some(*single);
            }
        }
        if let Some(player) = bye {
            waiting.clear();
            matches.push(ctx.bye(player));
        }

        let mut metadata = Metadata::new();
        metadata.insert("carried".into(), json!(held.len()));
        metadata.insert("bye".into(), json!(bye));

        Ok(RoundProposal {
            matches,
            waiting,
            metadata,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::test_support::Fixture;
    use crate::tournament::RoundConfig;

    #[test]
    fn test_odd_pool_leaves_one_waiting() {
        let fixture = Fixture::new(5, RoundConfig::knockout(2));
        let proposal = KnockoutStrategy.create_matches(&fixture.ctx()).unwrap();

        assert_eq!(proposal.matches.len(), 2);
        assert_eq!(proposal.matches[0].participants, fixture.players[0..2].to_vec());
        assert_eq!(proposal.matches[1].participants, fixture.players[2..4].to_vec());
        assert_eq!(proposal.waiting, vec![fixture.players[4]]);
    }

    #[test]
    fn test_carried_player_receives_bye() {
        let mut fixture = Fixture::new(5, RoundConfig::knockout(2));
        let (a, c, e) = (fixture.players[0], fixture.players[2], fixture.players[4]);
        fixture.players = vec![a, c, e];
        fixture.carried = vec![e];

        let proposal = KnockoutStrategy.create_matches(&fixture.ctx()).unwrap();

        assert_eq!(proposal.matches.len(), 2);
        assert_eq!(proposal.matches[0].participants, vec![a, c]);
        assert!(proposal.matches[1].auto_bye);
        assert_eq!(proposal.matches[1].participants, vec![e]);
        assert!(proposal.waiting.is_empty());
    }

    #[test]
    fn test_carried_players_are_seated_last() {
        let mut fixture = Fixture::new(4, RoundConfig::knockout(2));
        fixture.carried = vec![fixture.players[0]];

        let proposal = KnockoutStrategy.create_matches(&fixture.ctx()).unwrap();
        assert_eq!(
            proposal.matches[1].participants,
            vec![fixture.players[3], fixture.players[0]]
        );
    }

    #[test]
    fn test_single_player_completes_tournament() {
        let fixture = Fixture::new(1, RoundConfig::knockout(2));
        let err = KnockoutStrategy.create_matches(&fixture.ctx()).unwrap_err();
        match err {
            TournamentError::TournamentComplete { champion, .. } => {
                assert_eq!(champion, Some(fixture.players[0]))
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_four_player_matches() {
        let fixture = Fixture::new(6, RoundConfig::knockout(4));
        let proposal = KnockoutStrategy.create_matches(&fixture.ctx()).unwrap();
        assert_eq!(proposal.matches.len(), 1);
        assert_eq!(proposal.waiting.len(), 2);

        let fixture = Fixture::new(3, RoundConfig::knockout(4));
        assert!(matches!(
            KnockoutStrategy.create_matches(&fixture.ctx()),
            Err(TournamentError::InsufficientPlayers { needed: 4, .. })
        ));
    }
}
