//! Free-for-all: the whole pool in one match.

use super::{MatchmakingStrategy, PairingContext, RoundProposal, ensure_supported};
use crate::tournament::{Metadata, PlayerId, TournamentResult};
use serde_json::json;

/// One match holding every active player, or the first `n` when capped
#[derive(Debug, Clone, Copy, Default)]
pub struct FreeForAllStrategy;

impl FreeForAllStrategy {
    pub const NAME: &'static str = "freeforall";
}

impl MatchmakingStrategy for FreeForAllStrategy {
    fn name(&self) -> &str {
        Self::NAME
    }

    /// `0` means uncapped
    fn supports_players_per_match(&self, n: usize) -> bool {
        n == 0 || n >= 2
    }

    fn create_matches(&self, ctx: &PairingContext<'_>) -> TournamentResult<RoundProposal> {
        ensure_supported(self, ctx)?;
        if ctx.available.len() < 2 {
            return Err(ctx.insufficient(2));
        }

        let cap = match ctx.players_per_match() {
            0 => ctx.available.len(),
            n => n.min(ctx.available.len()),
        };
        let seated = ctx.available[..cap].to_vec();
        let waiting = ctx.available[cap..].to_vec();

        let mut metadata = Metadata::new();
        metadata.insert("seated".into(), json!(seated.len()));

        Ok(RoundProposal {
            matches: vec![ctx.schedule(seated)],
            waiting,
            metadata,
        })
    }

    /// Late entries form their own match once enough of them accumulate
    fn pair_waiting(&self, ctx: &PairingContext<'_>, waiting: &[PlayerId]) -> Vec<Vec<PlayerId>> {
        match ctx.players_per_match() {
            0 if waiting.len() >= 2 => vec![waiting.to_vec()],
            0 => Vec::new(),
            n => waiting.chunks_exact(n).map(<[PlayerId]>::to_vec).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::test_support::Fixture;
    use crate::tournament::{RoundConfig, TournamentError};

    #[test]
    fn test_whole_pool_in_one_match() {
        let fixture = Fixture::new(7, RoundConfig::free_for_all());
        let proposal = FreeForAllStrategy.create_matches(&fixture.ctx()).unwrap();

        assert_eq!(proposal.matches.len(), 1);
        assert_eq!(proposal.matches[0].participants, fixture.players);
        assert!(proposal.waiting.is_empty());
    }

    #[test]
    fn test_capped_pool() {
        let fixture = Fixture::new(7, RoundConfig::new(FreeForAllStrategy::NAME, 4));
        let proposal = FreeForAllStrategy.create_matches(&fixture.ctx()).unwrap();

        assert_eq!(proposal.matches[0].participants, fixture.players[..4].to_vec());
        assert_eq!(proposal.waiting, fixture.players[4..].to_vec());
    }

    #[test]
    fn test_needs_two_players() {
        let fixture = Fixture::new(1, RoundConfig::free_for_all());
        assert!(matches!(
            FreeForAllStrategy.create_matches(&fixture.ctx()),
            Err(TournamentError::InsufficientPlayers { needed: 2, .. })
        ));
        assert!(!FreeForAllStrategy.supports_players_per_match(1));
    }

    #[test]
    fn test_late_entries_group_by_cap() {
        let fixture = Fixture::new(5, RoundConfig::new(FreeForAllStrategy::NAME, 2));
        let groups = FreeForAllStrategy.pair_waiting(&fixture.ctx(), &fixture.players);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[1], fixture.players[2..4].to_vec());
    }
}
