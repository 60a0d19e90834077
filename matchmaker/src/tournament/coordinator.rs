//! Round lifecycle: creating rounds, recording results and pairing late entries.
//!
//! Every mutating operation holds a per-tournament lock for its whole
//! read-compute-commit span, so two calls against the same tournament never
//! see the same active pool. Different tournaments proceed in parallel.

use chrono::Utc;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::errors::{TournamentError, TournamentResult};
use super::models::{
    Match, MatchId, MatchResult, Outcome, PlayerId, RecordedResult, ResultCommit, Round,
    RoundCommit, RoundConfig, RoundId, RoundState, RoundSummary, StatsDelta, StatsUpdate,
    Tournament, TournamentId, TournamentPlayer, WaitingEntry,
};
use crate::db::TournamentRepository;
use crate::registry::Registries;
use crate::scoring::{PointsCalculator, outcome_for, validate_result};
use crate::strategy::{PairingContext, RoundProposal, ensure_supported};

/// The effect of adding a player to a tournament
#[derive(Debug, Clone, Serialize)]
pub struct Admission {
    pub participant: TournamentPlayer,
    /// Round whose waiting list the player joined, if one was running
    pub waiting_round: Option<RoundId>,
    /// Matches formed from that waiting list right away
    pub matches: Vec<Match>,
}

/// Drives rounds through Open, InProgress and Complete
pub struct RoundCoordinator {
    repository: Arc<dyn TournamentRepository>,
    registries: Arc<Registries>,
    locks: Mutex<HashMap<TournamentId, Arc<Mutex<()>>>>,
}

impl RoundCoordinator {
    pub fn new(repository: Arc<dyn TournamentRepository>, registries: Arc<Registries>) -> Self {
        Self {
            repository,
            registries,
            locks: Mutex::new(HashMap::new()),
        }
    }

    async fn lock(&self, tournament_id: TournamentId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            // Entries only the map still references are idle
            locks.retain(|id, lock| *id == tournament_id || Arc::strong_count(lock) > 1);
            locks.entry(tournament_id).or_default().clone()
        };
        lock.lock_owned().await
    }

    async fn tournament(&self, tournament_id: TournamentId) -> TournamentResult<Tournament> {
        self.repository
            .get_tournament(tournament_id)
            .await?
            .ok_or(TournamentError::TournamentNotFound(tournament_id))
    }

    /// The tournament's calculator, checked against a match of `players` seats
    fn calculator_for(
        &self,
        tournament: &Tournament,
        players: usize,
    ) -> TournamentResult<Box<dyn PointsCalculator>> {
        let calculator = self
            .registries
            .calculators
            .resolve(&tournament.default_calculator)?;
        if !calculator.supports_players_per_match(players) {
            return Err(TournamentError::UnsupportedPlayerCount {
                name: calculator.name().to_string(),
                players_per_match: players,
            });
        }
        Ok(calculator)
    }

    /// Generate and persist the next round of `tournament_id`.
    ///
    /// # Errors
    ///
    /// * `PendingMatches` - the latest round is not complete
    /// * `UnknownStrategy` - bad configuration
    /// * `UnsupportedPlayerCount` - the strategy or the tournament's calculator
    ///   cannot handle a proposed match size
    /// * any strategy error (`InsufficientPlayers`, `PairingExhausted`, `TournamentComplete`)
    ///
    /// Nothing is persisted when an error is returned.
    pub async fn create_round(
        &self,
        tournament_id: TournamentId,
        config: RoundConfig,
    ) -> TournamentResult<RoundSummary> {
        let _guard = self.lock(tournament_id).await;
        let tournament = self.tournament(tournament_id).await?;

        let latest = self.repository.latest_round(tournament_id).await?;
        if let Some(round) = &latest {
            if round.state != RoundState::Complete {
                return Err(TournamentError::PendingMatches {
                    tournament_id,
                    round_id: round.id,
                    ordinal: round.ordinal,
                });
            }
        }

        let strategy = self.registries.strategies.resolve(&config.strategy)?;
        let available = self.repository.active_players(tournament_id).await?;
        let history = self.repository.match_history(tournament_id).await?;
        let stats = self.repository.stats(tournament_id).await?;

        let carried: Vec<PlayerId> = match &latest {
            Some(round) => self
                .repository
                .waiting_players(round.id)
                .await?
                .into_iter()
                .map(|entry| entry.player_id)
                .filter(|p| available.contains(p))
                .collect(),
            None => Vec::new(),
        };

        let round_id = Uuid::new_v4();
        let ordinal = latest.as_ref().map_or(1, |r| r.ordinal + 1);
        let ctx = PairingContext {
            tournament_id,
            round_id,
            ordinal,
            available: &available,
            config: &config,
            history: &history,
            stats: &stats,
            carried: &carried,
        };

        ensure_supported(strategy.as_ref(), &ctx)?;
        let proposal = strategy.create_matches(&ctx)?;
        validate_proposal(strategy.name(), &ctx, &proposal)?;

        let RoundProposal {
            mut matches,
            waiting,
            metadata,
        } = proposal;

        for game in matches.iter().filter(|m| !m.auto_bye) {
            self.calculator_for(&tournament, game.participants.len())?;
        }

        let mut bye_credit = StatsUpdate::new();
        if matches.iter().any(|m| m.auto_bye) {
            let calculator = self.calculator_for(&tournament, config.players_per_match.max(2))?;
            for game in matches.iter_mut().filter(|m| m.auto_bye) {
                let player_id = game.participants[0];
                let result = MatchResult::bye(player_id);
                let points = calculator.calculate_points(player_id, game, &result)?;
                game.awarded_points.insert(player_id, points);
                bye_credit.insert(player_id, StatsDelta::for_outcome(Outcome::Win, points));
            }
        }

        let round = Round {
            id: round_id,
            tournament_id,
            ordinal,
            strategy: strategy.name().to_string(),
            state: RoundState::from_matches(&matches),
            config,
            created_at: Utc::now(),
        };
        let commit = RoundCommit {
            round: round.clone(),
            matches: matches.clone(),
            waiting: waiting
                .iter()
                .map(|p| WaitingEntry::new(tournament_id, round_id, *p))
                .collect(),
            stats: bye_credit,
        };

        if let Err(e) = self.repository.save_round(&commit).await {
            log::warn!("Failed to save round {} of {}: {}", ordinal, tournament_id, e);
            return Err(e);
        }

        log::info!(
            "Created round {} of tournament {} ({}): {} matches, {} waiting",
            ordinal,
            tournament_id,
            round.strategy,
            matches.len(),
            waiting.len()
        );

        Ok(RoundSummary {
            round,
            matches,
            waiting,
            metadata,
        })
    }

    /// Record the result of `match_id` and credit every participant.
    ///
    /// # Errors
    ///
    /// * `UnknownMatch` - no such match
    /// * `AlreadyReported` - the match already has a result
    /// * `MalformedResult` - the result does not fit the participants
    pub async fn record_match_result(
        &self,
        match_id: MatchId,
        result: MatchResult,
    ) -> TournamentResult<RecordedResult> {
        let tournament_id = self
            .repository
            .get_match(match_id)
            .await?
            .ok_or(TournamentError::UnknownMatch(match_id))?
            .tournament_id;
        let _guard = self.lock(tournament_id).await;

        let game = self
            .repository
            .get_match(match_id)
            .await?
            .ok_or(TournamentError::UnknownMatch(match_id))?;
        if game.is_reported() {
            return Err(TournamentError::AlreadyReported(match_id));
        }
        validate_result(&game, &result)?;

        let tournament = self.tournament(tournament_id).await?;
        let round = self
            .repository
            .get_round(game.round_id)
            .await?
            .ok_or(TournamentError::RoundNotFound(game.round_id))?;
        let calculator = self.calculator_for(&tournament, game.participants.len())?;

        let mut awarded_points = BTreeMap::new();
        let mut stats = StatsUpdate::new();
        let mut losers = Vec::new();
        for player_id in &game.participants {
            let points = calculator.calculate_points(*player_id, &game, &result)?;
            let outcome = outcome_for(*player_id, &result);
            if outcome == Outcome::Loss {
                losers.push(*player_id);
            }
            awarded_points.insert(*player_id, points);
            stats.insert(*player_id, StatsDelta::for_outcome(outcome, points));
        }

        let eliminates = self
            .registries
            .strategies
            .get(&round.strategy)
            .is_some_and(|s| s.eliminates_losers());
        let eliminated = if eliminates && !result.is_draw {
            losers
        } else {
            Vec::new()
        };

        let commit = ResultCommit {
            result,
            awarded_points: awarded_points.clone(),
            stats,
            eliminated: eliminated.clone(),
        };
        let round_state = match self.repository.save_match_result(match_id, &commit).await {
            Ok(state) => state,
            Err(e) => {
                log::warn!("Failed to record result of match {}: {}", match_id, e);
                return Err(e);
            }
        };

        log::info!(
            "Recorded match {} in round {} of {} (round now {})",
            match_id,
            round.ordinal,
            tournament_id,
            round_state
        );
        if !eliminated.is_empty() {
            log::info!("Eliminated {} player(s) from {}", eliminated.len(), tournament_id);
        }

        Ok(RecordedResult {
            match_id,
            round_id: round.id,
            round_state,
            awarded_points,
            eliminated,
        })
    }

    /// Group the latest round's waiting players into new matches of that round
    pub async fn pair_waiting_players(&self, tournament_id: TournamentId) -> TournamentResult<Vec<Match>> {
        let _guard = self.lock(tournament_id).await;
        self.tournament(tournament_id).await?;
        self.pair_waiting_locked(tournament_id).await
    }

    /// Register `player_id`, joining the running round's waiting list if there is one
    pub async fn admit_player(
        &self,
        tournament_id: TournamentId,
        player_id: PlayerId,
    ) -> TournamentResult<Admission> {
        let _guard = self.lock(tournament_id).await;

        let waiting_round = self
            .repository
            .latest_round(tournament_id)
            .await?
            .filter(|r| r.state != RoundState::Complete)
            .map(|r| r.id);

        let participant = self
            .repository
            .add_participant(tournament_id, player_id, waiting_round)
            .await?;
        log::info!("Player {} joined tournament {}", player_id, tournament_id);

        let matches = match waiting_round {
            Some(_) => self.pair_waiting_locked(tournament_id).await?,
            None => Vec::new(),
        };

        Ok(Admission {
            participant,
            waiting_round,
            matches,
        })
    }

    async fn pair_waiting_locked(&self, tournament_id: TournamentId) -> TournamentResult<Vec<Match>> {
        let round = match self.repository.latest_round(tournament_id).await? {
            Some(round) if round.state == RoundState::Open => round,
            _ => return Ok(Vec::new()),
        };

        let available = self.repository.active_players(tournament_id).await?;
        let waiting: Vec<PlayerId> = self
            .repository
            .waiting_players(round.id)
            .await?
            .into_iter()
            .map(|entry| entry.player_id)
            .filter(|p| available.contains(p))
            .collect();
        if waiting.is_empty() {
            return Ok(Vec::new());
        }

        let strategy = self.registries.strategies.resolve(&round.strategy)?;
        let history = self.repository.match_history(tournament_id).await?;
        let stats = self.repository.stats(tournament_id).await?;
        let ctx = PairingContext {
            tournament_id,
            round_id: round.id,
            ordinal: round.ordinal,
            available: &available,
            config: &round.config,
            history: &history,
            stats: &stats,
            carried: &[],
        };

        let groups = strategy.pair_waiting(&ctx, &waiting);
        if groups.is_empty() {
            return Ok(Vec::new());
        }
        let tournament = self.tournament(tournament_id).await?;
        for group in &groups {
            self.calculator_for(&tournament, group.len())?;
        }

        let matches: Vec<Match> = groups.into_iter().map(|g| ctx.schedule(g)).collect();
        let consumed: Vec<PlayerId> = matches
            .iter()
            .flat_map(|m| m.participants.iter().copied())
            .collect();
        if let Some(p) = consumed.iter().find(|p| !waiting.contains(p)) {
            return Err(TournamentError::InvalidProposal {
                strategy: strategy.name().to_string(),
                reason: format!("player {} was not waiting", p),
            });
        }

        self.repository
            .append_matches(round.id, &matches, &consumed)
            .await?;
        log::info!(
            "Paired {} waiting player(s) into {} match(es) in round {} of {}",
            consumed.len(),
            matches.len(),
            round.ordinal,
            tournament_id
        );
        Ok(matches)
    }
}

/// Reject proposals that seat unknown players, seat someone twice or
/// pre-resolve anything but a bye
fn validate_proposal(
    strategy: &str,
    ctx: &PairingContext<'_>,
    proposal: &RoundProposal,
) -> TournamentResult<()> {
    let invalid = |reason: String| TournamentError::InvalidProposal {
        strategy: strategy.to_string(),
        reason,
    };

    let available: HashSet<PlayerId> = ctx.available.iter().copied().collect();
    let mut seated = HashSet::new();
    let seats = proposal
        .matches
        .iter()
        .flat_map(|m| m.participants.iter())
        .chain(proposal.waiting.iter());
    for player_id in seats {
        if !available.contains(player_id) {
            return Err(invalid(format!("player {} is not active", player_id)));
        }
        if !seated.insert(*player_id) {
            return Err(invalid(format!("player {} is seated twice", player_id)));
        }
    }

    for game in &proposal.matches {
        if game.round_id != ctx.round_id || game.tournament_id != ctx.tournament_id {
            return Err(invalid(format!("match {} belongs to another round", game.id)));
        }
        if game.participants.is_empty() {
            return Err(invalid(format!("match {} is empty", game.id)));
        }
        if game.auto_bye {
            if game.participants.len() != 1 {
                return Err(invalid(format!("bye {} seats more than one player", game.id)));
            }
        } else if game.is_reported() {
            return Err(invalid(format!("match {} already has a result", game.id)));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryRepository;
    use crate::tournament::{ExhaustionPolicy, Player};

    async fn setup(
        n: usize,
        calculator: &str,
    ) -> (RoundCoordinator, Arc<InMemoryRepository>, Tournament, Vec<PlayerId>) {
        let repository = Arc::new(InMemoryRepository::new());
        let coordinator =
            RoundCoordinator::new(repository.clone(), Arc::new(Registries::with_builtins()));

        let tournament = Tournament::new("Club Night", calculator);
        repository.save_tournament(&tournament).await.unwrap();
        let mut players = Vec::new();
        for i in 0..n {
            let player = Player::new(format!("p{}", i));
            repository.save_player(&player).await.unwrap();
            coordinator.admit_player(tournament.id, player.id).await.unwrap();
            players.push(player.id);
        }
        (coordinator, repository, tournament, players)
    }

    #[tokio::test]
    async fn test_pending_matches_block_next_round() {
        let (coordinator, _, tournament, _) = setup(4, "standard").await;
        let summary = coordinator
            .create_round(tournament.id, RoundConfig::round_robin())
            .await
            .unwrap();
        assert_eq!(summary.round.state, RoundState::Open);

        let err = coordinator
            .create_round(tournament.id, RoundConfig::round_robin())
            .await
            .unwrap_err();
        assert!(matches!(err, TournamentError::PendingMatches { ordinal: 1, .. }));

        let first = &summary.matches[0];
        coordinator
            .record_match_result(first.id, MatchResult::winner(first.participants[0]))
            .await
            .unwrap();
        assert!(coordinator
            .create_round(tournament.id, RoundConfig::round_robin())
            .await
            .is_err());

        let second = &summary.matches[1];
        let recorded = coordinator
            .record_match_result(second.id, MatchResult::draw())
            .await
            .unwrap();
        assert_eq!(recorded.round_state, RoundState::Complete);

        let next = coordinator
            .create_round(tournament.id, RoundConfig::round_robin())
            .await
            .unwrap();
        assert_eq!(next.round.ordinal, 2);
    }

    #[tokio::test]
    async fn test_second_report_is_rejected_without_changes() {
        let (coordinator, repository, tournament, _) = setup(2, "standard").await;
        let summary = coordinator
            .create_round(tournament.id, RoundConfig::round_robin())
            .await
            .unwrap();
        let game = &summary.matches[0];
        let (a, b) = (game.participants[0], game.participants[1]);

        coordinator
            .record_match_result(game.id, MatchResult::winner(a))
            .await
            .unwrap();
        let before = repository.stats(tournament.id).await.unwrap();

        let err = coordinator
            .record_match_result(game.id, MatchResult::winner(b))
            .await
            .unwrap_err();
        assert!(matches!(err, TournamentError::AlreadyReported(id) if id == game.id));
        assert_eq!(repository.stats(tournament.id).await.unwrap(), before);
        assert_eq!(before[&a].points, 1.0);
        assert_eq!(before[&b].losses, 1);
    }

    #[tokio::test]
    async fn test_malformed_result_changes_nothing() {
        let (coordinator, repository, tournament, _) = setup(2, "standard").await;
        let summary = coordinator
            .create_round(tournament.id, RoundConfig::round_robin())
            .await
            .unwrap();
        let game = &summary.matches[0];
        let before = repository.stats(tournament.id).await.unwrap();

        let err = coordinator
            .record_match_result(game.id, MatchResult::winner(Uuid::new_v4()))
            .await
            .unwrap_err();
        assert!(matches!(err, TournamentError::MalformedResult { .. }));

        assert_eq!(repository.stats(tournament.id).await.unwrap(), before);
        let stored = repository.get_match(game.id).await.unwrap().unwrap();
        assert!(stored.result.is_none());
        let round = repository.get_round(summary.round.id).await.unwrap().unwrap();
        assert_eq!(round.state, RoundState::Open);
    }

    #[tokio::test]
    async fn test_unknown_match() {
        let (coordinator, _, _, _) = setup(2, "standard").await;
        let id = Uuid::new_v4();
        assert!(matches!(
            coordinator.record_match_result(id, MatchResult::draw()).await,
            Err(TournamentError::UnknownMatch(missing)) if missing == id
        ));
    }

    #[tokio::test]
    async fn test_failed_round_leaves_nothing() {
        let (coordinator, repository, tournament, _) = setup(1, "standard").await;

        let err = coordinator
            .create_round(tournament.id, RoundConfig::round_robin())
            .await
            .unwrap_err();
        assert!(matches!(err, TournamentError::InsufficientPlayers { .. }));

        let err = coordinator
            .create_round(tournament.id, RoundConfig::new("ladder", 2))
            .await
            .unwrap_err();
        assert!(matches!(err, TournamentError::UnknownStrategy(_)));

        let err = coordinator
            .create_round(tournament.id, RoundConfig::new("swiss", 3))
            .await
            .unwrap_err();
        assert!(matches!(err, TournamentError::UnsupportedPlayerCount { .. }));

        assert!(repository.list_rounds(tournament.id).await.unwrap().is_empty());
        assert!(repository.tournament_matches(tournament.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_bye_credit_committed_with_round() {
        let (coordinator, repository, tournament, _) = setup(3, "three_point").await;
        let summary = coordinator
            .create_round(tournament.id, RoundConfig::swiss().with_byes(true))
            .await
            .unwrap();

        let bye = summary.matches.iter().find(|m| m.auto_bye).unwrap();
        let player = bye.participants[0];
        assert_eq!(bye.awarded_points[&player], 3.0);
        assert_eq!(summary.round.state, RoundState::Open);

        let stats = repository.stats(tournament.id).await.unwrap();
        assert_eq!(stats[&player].wins, 1);
        assert_eq!(stats[&player].points, 3.0);
    }

    #[tokio::test]
    async fn test_late_entry_waits_and_pairs() {
        let (coordinator, repository, tournament, _) = setup(4, "standard").await;
        let summary = coordinator
            .create_round(tournament.id, RoundConfig::round_robin())
            .await
            .unwrap();

        let first = Player::new("late-1");
        let second = Player::new("late-2");
        repository.save_player(&first).await.unwrap();
        repository.save_player(&second).await.unwrap();

        let admission = coordinator.admit_player(tournament.id, first.id).await.unwrap();
        assert_eq!(admission.waiting_round, Some(summary.round.id));
        assert!(admission.matches.is_empty());

        let admission = coordinator.admit_player(tournament.id, second.id).await.unwrap();
        assert_eq!(admission.matches.len(), 1);
        assert_eq!(admission.matches[0].participants, vec![first.id, second.id]);
        assert!(repository.waiting_players(summary.round.id).await.unwrap().is_empty());
        assert_eq!(repository.list_matches(summary.round.id).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_no_pairing_once_round_in_progress() {
        let (coordinator, repository, tournament, _) = setup(5, "standard").await;
        let summary = coordinator
            .create_round(
                tournament.id,
                RoundConfig::round_robin().with_exhaustion(ExhaustionPolicy::Fail),
            )
            .await
            .unwrap();
        assert_eq!(summary.waiting.len(), 1);

        let game = &summary.matches[0];
        coordinator
            .record_match_result(game.id, MatchResult::winner(game.participants[1]))
            .await
            .unwrap();

        let late = Player::new("late");
        repository.save_player(&late).await.unwrap();
        let admission = coordinator.admit_player(tournament.id, late.id).await.unwrap();
        assert!(admission.matches.is_empty());
        assert!(coordinator.pair_waiting_players(tournament.id).await.unwrap().is_empty());
        assert_eq!(repository.waiting_players(summary.round.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_calculator_must_support_match_size() {
        let (coordinator, repository, tournament, _) = setup(5, "custom_weighted").await;
        let err = coordinator
            .create_round(tournament.id, RoundConfig::free_for_all())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TournamentError::UnsupportedPlayerCount { players_per_match: 5, .. }
        ));
        assert!(repository.list_rounds(tournament.id).await.unwrap().is_empty());
        assert!(repository.tournament_matches(tournament.id).await.unwrap().is_empty());
        assert!(repository.stats(tournament.id).await.unwrap().values().all(|s| s.points == 0.0));

        // A calculator that fits lets the same round through
        repository
            .set_default_calculator(tournament.id, "ranking")
            .await
            .unwrap();
        let summary = coordinator
            .create_round(tournament.id, RoundConfig::free_for_all())
            .await
            .unwrap();
        assert_eq!(summary.matches[0].participants.len(), 5);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_calls_are_serialized() {
        let (coordinator, repository, tournament, _) = setup(8, "three_point").await;
        let coordinator = Arc::new(coordinator);
        let summary = coordinator
            .create_round(tournament.id, RoundConfig::round_robin())
            .await
            .unwrap();
        assert_eq!(summary.matches.len(), 4);

        let reports: Vec<_> = summary
            .matches
            .iter()
            .map(|game| {
                let coordinator = coordinator.clone();
                let (match_id, winner) = (game.id, game.participants[0]);
                tokio::spawn(async move {
                    coordinator
                        .record_match_result(match_id, MatchResult::winner(winner))
                        .await
                })
            })
            .collect();
        let mut states = Vec::new();
        for report in reports {
            states.push(report.await.unwrap().unwrap().round_state);
        }
        assert_eq!(states.iter().filter(|s| **s == RoundState::Complete).count(), 1);
        assert_eq!(
            repository.get_round(summary.round.id).await.unwrap().unwrap().state,
            RoundState::Complete
        );

        let stats = repository.stats(tournament.id).await.unwrap();
        assert_eq!(stats.values().map(|s| s.wins).sum::<u32>(), 4);
        assert_eq!(stats.values().map(|s| s.losses).sum::<u32>(), 4);
        assert_eq!(stats.values().map(|s| s.matches_played).sum::<u32>(), 8);
        assert_eq!(stats.values().map(|s| s.points).sum::<f64>(), 12.0);

        let attempts: Vec<_> = (0..2)
            .map(|_| {
                let coordinator = coordinator.clone();
                let tournament_id = tournament.id;
                tokio::spawn(async move {
                    coordinator
                        .create_round(tournament_id, RoundConfig::round_robin())
                        .await
                })
            })
            .collect();
        let (mut created, mut pending) = (0, 0);
        for attempt in attempts {
            match attempt.await.unwrap() {
                Ok(summary) => {
                    assert_eq!(summary.round.ordinal, 2);
                    created += 1;
                }
                Err(TournamentError::PendingMatches { ordinal: 2, .. }) => pending += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!((created, pending), (1, 1));
        assert_eq!(repository.list_rounds(tournament.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_round_completes_when_reported_from_two_coordinators() {
        let (coordinator, repository, tournament, _) = setup(4, "standard").await;
        let other = RoundCoordinator::new(repository.clone(), Arc::new(Registries::with_builtins()));
        let summary = coordinator
            .create_round(tournament.id, RoundConfig::round_robin())
            .await
            .unwrap();
        let (first, second) = (&summary.matches[0], &summary.matches[1]);

        let (a, b) = tokio::join!(
            coordinator.record_match_result(first.id, MatchResult::winner(first.participants[0])),
            other.record_match_result(second.id, MatchResult::draw()),
        );
        let states = [a.unwrap().round_state, b.unwrap().round_state];
        assert!(states.contains(&RoundState::Complete));
        assert_eq!(
            repository.get_round(summary.round.id).await.unwrap().unwrap().state,
            RoundState::Complete
        );

        let next = other
            .create_round(tournament.id, RoundConfig::round_robin())
            .await
            .unwrap();
        assert_eq!(next.round.ordinal, 2);
    }

    #[tokio::test]
    async fn test_idle_locks_are_dropped() {
        let (coordinator, repository, first, _) = setup(2, "standard").await;
        let second = Tournament::new("Second Night", "standard");
        repository.save_tournament(&second).await.unwrap();

        coordinator.pair_waiting_players(second.id).await.unwrap();
        coordinator.pair_waiting_players(first.id).await.unwrap();

        let locks = coordinator.locks.lock().await;
        assert_eq!(locks.len(), 1);
        assert!(locks.contains_key(&first.id));
    }
}
