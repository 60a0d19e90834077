//! In-memory `TournamentRepository` for tests and database-less runs.
//!
//! Every commit validates all of its inputs before touching state, so a
//! failed call leaves nothing behind, matching the transactional behavior of
//! the PostgreSQL repository.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::repository::{TournamentRepository, validate_match};
use crate::tournament::{
    HistoryEntry, Match, MatchId, ParticipationStatus, Player, PlayerId, PlayerStats, ResultCommit,
    Round, RoundCommit, RoundId, RoundState, StatsUpdate, Tournament, TournamentError,
    TournamentId, TournamentPlayer, TournamentResult, WaitingEntry,
};

#[derive(Default)]
struct MemoryState {
    players: Vec<Player>,
    tournaments: Vec<Tournament>,
    /// Join order
    participants: Vec<TournamentPlayer>,
    rounds: Vec<Round>,
    /// Scheduling order
    matches: Vec<Match>,
    waiting: Vec<WaitingEntry>,
    stats: HashMap<(TournamentId, PlayerId), PlayerStats>,
}

impl MemoryState {
    fn has_tournament(&self, tournament_id: TournamentId) -> bool {
        self.tournaments.iter().any(|t| t.id == tournament_id)
    }

    fn check_stats(&self, tournament_id: TournamentId, deltas: &StatsUpdate) -> TournamentResult<()> {
        match deltas
            .keys()
            .find(|p| !self.stats.contains_key(&(tournament_id, **p)))
        {
            Some(player_id) => Err(TournamentError::PlayerNotFound(*player_id)),
            None => Ok(()),
        }
    }

    fn apply_stats(&mut self, tournament_id: TournamentId, deltas: &StatsUpdate) {
        for (player_id, delta) in deltas {
            if let Some(stats) = self.stats.get_mut(&(tournament_id, *player_id)) {
                stats.apply(delta);
            }
        }
    }

    /// Re-derive a round's state from its stored matches
    fn refresh_round_state(&mut self, round_id: RoundId) -> RoundState {
        let matches: Vec<Match> = self
            .matches
            .iter()
            .filter(|m| m.round_id == round_id)
            .cloned()
            .collect();
        let state = RoundState::from_matches(&matches);
        if let Some(round) = self.rounds.iter_mut().find(|r| r.id == round_id) {
            round.state = state;
        }
        state
    }

    fn ordinal_of(&self, round_id: RoundId) -> u32 {
        self.rounds
            .iter()
            .find(|r| r.id == round_id)
            .map_or(0, |r| r.ordinal)
    }
}

/// Repository holding everything in process memory
#[derive(Default)]
pub struct InMemoryRepository {
    state: RwLock<MemoryState>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TournamentRepository for InMemoryRepository {
    async fn save_player(&self, player: &Player) -> TournamentResult<()> {
        self.state.write().await.players.push(player.clone());
        Ok(())
    }

    async fn get_player(&self, player_id: PlayerId) -> TournamentResult<Option<Player>> {
        let state = self.state.read().await;
        Ok(state.players.iter().find(|p| p.id == player_id).cloned())
    }

    async fn list_players(&self) -> TournamentResult<Vec<Player>> {
        let mut players = self.state.read().await.players.clone();
        players.sort_by(|a, b| a.name.cmp(&b.name).then(a.created_at.cmp(&b.created_at)));
        Ok(players)
    }

    async fn save_tournament(&self, tournament: &Tournament) -> TournamentResult<()> {
        self.state.write().await.tournaments.push(tournament.clone());
        Ok(())
    }

    async fn get_tournament(
        &self,
        tournament_id: TournamentId,
    ) -> TournamentResult<Option<Tournament>> {
        let state = self.state.read().await;
        Ok(state.tournaments.iter().find(|t| t.id == tournament_id).cloned())
    }

    async fn list_tournaments(&self) -> TournamentResult<Vec<Tournament>> {
        Ok(self.state.read().await.tournaments.clone())
    }

    async fn set_default_calculator(
        &self,
        tournament_id: TournamentId,
        calculator: &str,
    ) -> TournamentResult<()> {
        let mut state = self.state.write().await;
        let tournament = state
            .tournaments
            .iter_mut()
            .find(|t| t.id == tournament_id)
            .ok_or(TournamentError::TournamentNotFound(tournament_id))?;
        tournament.default_calculator = calculator.to_string();
        Ok(())
    }

    async fn add_participant(
        &self,
        tournament_id: TournamentId,
        player_id: PlayerId,
        late_entry: Option<RoundId>,
    ) -> TournamentResult<TournamentPlayer> {
        let mut state = self.state.write().await;

        if !state.has_tournament(tournament_id) {
            return Err(TournamentError::TournamentNotFound(tournament_id));
        }
        if !state.players.iter().any(|p| p.id == player_id) {
            return Err(TournamentError::PlayerNotFound(player_id));
        }
        if state.stats.contains_key(&(tournament_id, player_id)) {
            return Err(TournamentError::AlreadyRegistered {
                tournament_id,
                player_id,
            });
        }
        if let Some(round_id) = late_entry {
            if !state.rounds.iter().any(|r| r.id == round_id) {
                return Err(TournamentError::RoundNotFound(round_id));
            }
        }

        let participant = TournamentPlayer {
            tournament_id,
            player_id,
            status: ParticipationStatus::Active,
            joined_at: chrono::Utc::now(),
        };
        state.participants.push(participant.clone());
        state
            .stats
            .insert((tournament_id, player_id), PlayerStats::new(tournament_id, player_id));
        if let Some(round_id) = late_entry {
            state
                .waiting
                .push(WaitingEntry::new(tournament_id, round_id, player_id));
        }
        Ok(participant)
    }

    async fn participants(
        &self,
        tournament_id: TournamentId,
    ) -> TournamentResult<Vec<TournamentPlayer>> {
        let state = self.state.read().await;
        Ok(state
            .participants
            .iter()
            .filter(|p| p.tournament_id == tournament_id)
            .cloned()
            .collect())
    }

    async fn active_players(&self, tournament_id: TournamentId) -> TournamentResult<Vec<PlayerId>> {
        let state = self.state.read().await;
        Ok(state
            .participants
            .iter()
            .filter(|p| p.tournament_id == tournament_id && p.status == ParticipationStatus::Active)
            .map(|p| p.player_id)
            .collect())
    }

    async fn set_participation_status(
        &self,
        tournament_id: TournamentId,
        player_id: PlayerId,
        status: ParticipationStatus,
    ) -> TournamentResult<()> {
        let mut state = self.state.write().await;
        let participant = state
            .participants
            .iter_mut()
            .find(|p| p.tournament_id == tournament_id && p.player_id == player_id)
            .ok_or(TournamentError::PlayerNotFound(player_id))?;
        participant.status = status;
        Ok(())
    }

    async fn match_history(
        &self,
        tournament_id: TournamentId,
    ) -> TournamentResult<Vec<HistoryEntry>> {
        let state = self.state.read().await;
        let mut history: Vec<HistoryEntry> = state
            .matches
            .iter()
            .filter(|m| m.tournament_id == tournament_id)
            .map(|m| HistoryEntry {
                participants: m.participants.clone(),
                round_ordinal: state.ordinal_of(m.round_id),
            })
            .collect();
        history.sort_by_key(|h| h.round_ordinal);
        Ok(history)
    }

    async fn stats(
        &self,
        tournament_id: TournamentId,
    ) -> TournamentResult<HashMap<PlayerId, PlayerStats>> {
        let state = self.state.read().await;
        Ok(state
            .stats
            .iter()
            .filter(|((tid, _), _)| *tid == tournament_id)
            .map(|((_, pid), stats)| (*pid, stats.clone()))
            .collect())
    }

    async fn update_stats(
        &self,
        tournament_id: TournamentId,
        deltas: &StatsUpdate,
    ) -> TournamentResult<()> {
        let mut state = self.state.write().await;
        state.check_stats(tournament_id, deltas)?;
        state.apply_stats(tournament_id, deltas);
        Ok(())
    }

    async fn latest_round(&self, tournament_id: TournamentId) -> TournamentResult<Option<Round>> {
        let state = self.state.read().await;
        Ok(state
            .rounds
            .iter()
            .filter(|r| r.tournament_id == tournament_id)
            .max_by_key(|r| r.ordinal)
            .cloned())
    }

    async fn get_round(&self, round_id: RoundId) -> TournamentResult<Option<Round>> {
        let state = self.state.read().await;
        Ok(state.rounds.iter().find(|r| r.id == round_id).cloned())
    }

    async fn list_rounds(&self, tournament_id: TournamentId) -> TournamentResult<Vec<Round>> {
        let state = self.state.read().await;
        let mut rounds: Vec<Round> = state
            .rounds
            .iter()
            .filter(|r| r.tournament_id == tournament_id)
            .cloned()
            .collect();
        rounds.sort_by_key(|r| r.ordinal);
        Ok(rounds)
    }

    async fn get_match(&self, match_id: MatchId) -> TournamentResult<Option<Match>> {
        let state = self.state.read().await;
        Ok(state.matches.iter().find(|m| m.id == match_id).cloned())
    }

    async fn list_matches(&self, round_id: RoundId) -> TournamentResult<Vec<Match>> {
        let state = self.state.read().await;
        Ok(state
            .matches
            .iter()
            .filter(|m| m.round_id == round_id)
            .cloned()
            .collect())
    }

    async fn tournament_matches(&self, tournament_id: TournamentId) -> TournamentResult<Vec<Match>> {
        let state = self.state.read().await;
        let mut matches: Vec<Match> = state
            .matches
            .iter()
            .filter(|m| m.tournament_id == tournament_id)
            .cloned()
            .collect();
        matches.sort_by_key(|m| state.ordinal_of(m.round_id));
        Ok(matches)
    }

    async fn waiting_players(&self, round_id: RoundId) -> TournamentResult<Vec<WaitingEntry>> {
        let state = self.state.read().await;
        Ok(state
            .waiting
            .iter()
            .filter(|w| w.round_id == round_id)
            .cloned()
            .collect())
    }

    async fn save_round(&self, commit: &RoundCommit) -> TournamentResult<()> {
        let mut state = self.state.write().await;
        let round = &commit.round;

        if !state.has_tournament(round.tournament_id) {
            return Err(TournamentError::TournamentNotFound(round.tournament_id));
        }
        if state.rounds.iter().any(|r| {
            r.id == round.id || (r.tournament_id == round.tournament_id && r.ordinal == round.ordinal)
        }) {
            return Err(TournamentError::CorruptRecord(format!(
                "round {} of tournament {} already exists",
                round.ordinal, round.tournament_id
            )));
        }
        for game in &commit.matches {
            validate_match(game)?;
        }
        state.check_stats(round.tournament_id, &commit.stats)?;

        state.rounds.push(round.clone());
        state.matches.extend(commit.matches.iter().cloned());
        state.waiting.extend(commit.waiting.iter().cloned());
        state.apply_stats(round.tournament_id, &commit.stats);
        Ok(())
    }

    async fn save_match_result(
        &self,
        match_id: MatchId,
        commit: &ResultCommit,
    ) -> TournamentResult<RoundState> {
        let mut state = self.state.write().await;

        let index = state
            .matches
            .iter()
            .position(|m| m.id == match_id)
            .ok_or(TournamentError::UnknownMatch(match_id))?;
        let game = &state.matches[index];
        if game.is_reported() {
            return Err(TournamentError::AlreadyReported(match_id));
        }
        let (tournament_id, round_id) = (game.tournament_id, game.round_id);
        state.check_stats(tournament_id, &commit.stats)?;

        let game = &mut state.matches[index];
        game.result = Some(commit.result.clone());
        game.awarded_points = commit.awarded_points.clone();

        state.apply_stats(tournament_id, &commit.stats);
        for participant in state
            .participants
            .iter_mut()
            .filter(|p| p.tournament_id == tournament_id && commit.eliminated.contains(&p.player_id))
        {
            participant.status = ParticipationStatus::Eliminated;
        }
        Ok(state.refresh_round_state(round_id))
    }

    async fn append_matches(
        &self,
        round_id: RoundId,
        matches: &[Match],
        consumed: &[PlayerId],
    ) -> TournamentResult<RoundState> {
        let mut state = self.state.write().await;

        if !state.rounds.iter().any(|r| r.id == round_id) {
            return Err(TournamentError::RoundNotFound(round_id));
        }
        for game in matches {
            validate_match(game)?;
        }

        state.matches.extend(matches.iter().cloned());
        state
            .waiting
            .retain(|w| w.round_id != round_id || !consumed.contains(&w.player_id));
        Ok(state.refresh_round_state(round_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tournament::{MatchResult, Outcome, RoundConfig, StatsDelta};

    async fn seeded(n: usize) -> (InMemoryRepository, Tournament, Vec<PlayerId>) {
        let repo = InMemoryRepository::new();
        let tournament = Tournament::new("Spring Open", "standard");
        repo.save_tournament(&tournament).await.unwrap();

        let mut ids = Vec::new();
        for i in 0..n {
            let player = Player::new(format!("player-{}", i));
            repo.save_player(&player).await.unwrap();
            repo.add_participant(tournament.id, player.id, None).await.unwrap();
            ids.push(player.id);
        }
        (repo, tournament, ids)
    }

    fn round(tournament_id: TournamentId, ordinal: u32) -> Round {
        Round {
            id: uuid::Uuid::new_v4(),
            tournament_id,
            ordinal,
            strategy: "roundrobin".to_string(),
            config: RoundConfig::round_robin(),
            state: RoundState::Open,
            created_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_add_participant_twice_fails() {
        let (repo, tournament, ids) = seeded(1).await;

        let err = repo.add_participant(tournament.id, ids[0], None).await.unwrap_err();
        assert!(matches!(err, TournamentError::AlreadyRegistered { .. }));
        assert_eq!(repo.participants(tournament.id).await.unwrap().len(), 1);
        assert_eq!(repo.stats(tournament.id).await.unwrap()[&ids[0]].matches_played, 0);
    }

    #[tokio::test]
    async fn test_failed_round_commit_leaves_nothing() {
        let (repo, tournament, ids) = seeded(2).await;
        let round = round(tournament.id, 1);
        let game = Match::new(tournament.id, round.id, ids.clone());

        let mut stats = StatsUpdate::new();
        stats.insert(uuid::Uuid::new_v4(), StatsDelta::for_outcome(Outcome::Win, 1.0));
        let commit = RoundCommit {
            round: round.clone(),
            matches: vec![game],
            waiting: Vec::new(),
            stats,
        };

        let err = repo.save_round(&commit).await.unwrap_err();
        assert!(matches!(err, TournamentError::PlayerNotFound(_)));
        assert!(repo.latest_round(tournament.id).await.unwrap().is_none());
        assert!(repo.tournament_matches(tournament.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_result_commit_is_single_shot() {
        let (repo, tournament, ids) = seeded(2).await;
        let round = round(tournament.id, 1);
        let game = Match::new(tournament.id, round.id, ids.clone());
        repo.save_round(&RoundCommit {
            round: round.clone(),
            matches: vec![game.clone()],
            waiting: Vec::new(),
            stats: StatsUpdate::new(),
        })
        .await
        .unwrap();

        let mut stats = StatsUpdate::new();
        stats.insert(ids[0], StatsDelta::for_outcome(Outcome::Win, 1.0));
        stats.insert(ids[1], StatsDelta::for_outcome(Outcome::Loss, 0.0));
        let commit = ResultCommit {
            result: MatchResult::winner(ids[0]),
            awarded_points: [(ids[0], 1.0), (ids[1], 0.0)].into_iter().collect(),
            stats,
            eliminated: vec![ids[1]],
        };

        let round_state = repo.save_match_result(game.id, &commit).await.unwrap();
        assert_eq!(round_state, RoundState::Complete);
        let err = repo.save_match_result(game.id, &commit).await.unwrap_err();
        assert!(matches!(err, TournamentError::AlreadyReported(id) if id == game.id));

        let stats = repo.stats(tournament.id).await.unwrap();
        assert_eq!(stats[&ids[0]].wins, 1);
        assert_eq!(stats[&ids[0]].matches_played, 1);
        assert_eq!(repo.active_players(tournament.id).await.unwrap(), vec![ids[0]]);
        assert_eq!(
            repo.get_round(round.id).await.unwrap().unwrap().state,
            RoundState::Complete
        );
    }

    #[tokio::test]
    async fn test_append_consumes_waiting_entries() {
        let (repo, tournament, ids) = seeded(3).await;
        let round = round(tournament.id, 1);
        repo.save_round(&RoundCommit {
            round: round.clone(),
            matches: vec![Match::new(tournament.id, round.id, vec![ids[0], ids[1]])],
            waiting: vec![WaitingEntry::new(tournament.id, round.id, ids[2])],
            stats: StatsUpdate::new(),
        })
        .await
        .unwrap();

        let late = Player::new("late");
        repo.save_player(&late).await.unwrap();
        repo.add_participant(tournament.id, late.id, Some(round.id)).await.unwrap();
        assert_eq!(repo.waiting_players(round.id).await.unwrap().len(), 2);

        let game = Match::new(tournament.id, round.id, vec![ids[2], late.id]);
        let round_state = repo
            .append_matches(round.id, &[game], &[ids[2], late.id])
            .await
            .unwrap();
        assert_eq!(round_state, RoundState::Open);

        assert!(repo.waiting_players(round.id).await.unwrap().is_empty());
        assert_eq!(repo.list_matches(round.id).await.unwrap().len(), 2);
        assert_eq!(repo.match_history(tournament.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_records() {
        let repo = InMemoryRepository::new();
        let id = uuid::Uuid::new_v4();

        assert!(repo.get_tournament(id).await.unwrap().is_none());
        assert!(matches!(
            repo.set_default_calculator(id, "ranking").await,
            Err(TournamentError::TournamentNotFound(_))
        ));
        assert!(matches!(
            repo.set_participation_status(id, id, ParticipationStatus::Eliminated).await,
            Err(TournamentError::PlayerNotFound(_))
        ));
    }
}
