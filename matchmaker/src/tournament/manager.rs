//! Tournament manager: the entry point used by the CLI and other frontends.

use super::coordinator::{Admission, RoundCoordinator};
use super::errors::{TournamentError, TournamentResult};
use super::models::{
    DEFAULT_CALCULATOR, Match, MatchId, MatchResult, Player, PlayerId, PlayerStats, RecordedResult,
    Round, RoundConfig, RoundId, RoundSummary, Standing, Tournament, TournamentId,
    TournamentPlayer, WaitingEntry,
};
use super::standings::StandingsAggregator;
use crate::db::TournamentRepository;
use crate::registry::Registries;
use std::collections::HashMap;
use std::sync::Arc;

/// Tournament manager
#[derive(Clone)]
pub struct TournamentManager {
    repository: Arc<dyn TournamentRepository>,
    registries: Arc<Registries>,
    coordinator: Arc<RoundCoordinator>,
}

impl TournamentManager {
    /// Create a new tournament manager
    pub fn new(repository: Arc<dyn TournamentRepository>, registries: Registries) -> Self {
        let registries = Arc::new(registries);
        Self {
            coordinator: Arc::new(RoundCoordinator::new(repository.clone(), registries.clone())),
            repository,
            registries,
        }
    }

    pub fn registries(&self) -> &Registries {
        &self.registries
    }

    /// Create a new player
    pub async fn create_player(&self, name: &str) -> TournamentResult<Player> {
        let player = Player::new(name.trim());
        self.repository.save_player(&player).await?;
        log::info!("Created player '{}' ({})", player.name, player.id);
        Ok(player)
    }

    pub async fn list_players(&self) -> TournamentResult<Vec<Player>> {
        self.repository.list_players().await
    }

    pub async fn get_player(&self, player_id: PlayerId) -> TournamentResult<Player> {
        self.repository
            .get_player(player_id)
            .await?
            .ok_or(TournamentError::PlayerNotFound(player_id))
    }

    /// Create a new tournament
    ///
    /// # Arguments
    ///
    /// * `name` - Display name
    /// * `calculator` - Registered calculator scoring its matches, `standard` if `None`
    pub async fn create_tournament(
        &self,
        name: &str,
        calculator: Option<&str>,
    ) -> TournamentResult<Tournament> {
        let calculator = calculator.unwrap_or(DEFAULT_CALCULATOR);
        self.registries.calculators.resolve(calculator)?;

        let tournament = Tournament::new(name.trim(), calculator);
        self.repository.save_tournament(&tournament).await?;
        log::info!(
            "Created tournament '{}' ({}) scored by {}",
            tournament.name,
            tournament.id,
            calculator
        );
        Ok(tournament)
    }

    pub async fn get_tournament(&self, tournament_id: TournamentId) -> TournamentResult<Tournament> {
        self.repository
            .get_tournament(tournament_id)
            .await?
            .ok_or(TournamentError::TournamentNotFound(tournament_id))
    }

    pub async fn list_tournaments(&self) -> TournamentResult<Vec<Tournament>> {
        self.repository.list_tournaments().await
    }

    /// Change the calculator that scores results recorded from now on
    pub async fn set_default_calculator(
        &self,
        tournament_id: TournamentId,
        calculator: &str,
    ) -> TournamentResult<()> {
        self.registries.calculators.resolve(calculator)?;
        self.repository
            .set_default_calculator(tournament_id, calculator)
            .await?;
        log::info!("Tournament {} now scored by {}", tournament_id, calculator);
        Ok(())
    }

    /// Register a player for a tournament.
    ///
    /// A player joining while a round is running waits on that round's
    /// waiting list, and is paired as soon as enough players are waiting.
    pub async fn add_player_to_tournament(
        &self,
        tournament_id: TournamentId,
        player_id: PlayerId,
    ) -> TournamentResult<Admission> {
        self.get_tournament(tournament_id).await?;
        self.get_player(player_id).await?;
        self.coordinator.admit_player(tournament_id, player_id).await
    }

    /// Participants in join order
    pub async fn participants(
        &self,
        tournament_id: TournamentId,
    ) -> TournamentResult<Vec<TournamentPlayer>> {
        self.get_tournament(tournament_id).await?;
        self.repository.participants(tournament_id).await
    }

    pub async fn create_round(
        &self,
        tournament_id: TournamentId,
        config: RoundConfig,
    ) -> TournamentResult<RoundSummary> {
        self.coordinator.create_round(tournament_id, config).await
    }

    pub async fn record_match_result(
        &self,
        match_id: MatchId,
        result: MatchResult,
    ) -> TournamentResult<RecordedResult> {
        self.coordinator.record_match_result(match_id, result).await
    }

    pub async fn pair_waiting_players(
        &self,
        tournament_id: TournamentId,
    ) -> TournamentResult<Vec<Match>> {
        self.coordinator.pair_waiting_players(tournament_id).await
    }

    /// Standings from the maintained stats
    pub async fn get_standings(&self, tournament_id: TournamentId) -> TournamentResult<Vec<Standing>> {
        let stats = self.repository.stats(tournament_id).await?;
        self.standings_from(tournament_id, stats).await
    }

    /// Standings recomputed from every stored result
    pub async fn replay_standings(
        &self,
        tournament_id: TournamentId,
    ) -> TournamentResult<Vec<Standing>> {
        let participants: Vec<PlayerId> = self
            .participants(tournament_id)
            .await?
            .iter()
            .map(|p| p.player_id)
            .collect();
        let matches = self.repository.tournament_matches(tournament_id).await?;
        let stats = StandingsAggregator::replay(tournament_id, &participants, &matches);
        self.standings_from(tournament_id, stats).await
    }

    async fn standings_from(
        &self,
        tournament_id: TournamentId,
        mut stats: HashMap<PlayerId, PlayerStats>,
    ) -> TournamentResult<Vec<Standing>> {
        let participants = self.participants(tournament_id).await?;
        let mut players: HashMap<PlayerId, Player> = self
            .repository
            .list_players()
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let mut entries = Vec::with_capacity(participants.len());
        for participant in participants {
            let id = participant.player_id;
            let player = players.remove(&id).ok_or(TournamentError::PlayerNotFound(id))?;
            let stats = stats
                .remove(&id)
                .unwrap_or_else(|| PlayerStats::new(tournament_id, id));
            entries.push((player, stats));
        }
        Ok(StandingsAggregator::rank(entries))
    }

    /// Rounds by ordinal
    pub async fn list_rounds(&self, tournament_id: TournamentId) -> TournamentResult<Vec<Round>> {
        self.get_tournament(tournament_id).await?;
        self.repository.list_rounds(tournament_id).await
    }

    pub async fn list_matches(&self, round_id: RoundId) -> TournamentResult<Vec<Match>> {
        self.repository
            .get_round(round_id)
            .await?
            .ok_or(TournamentError::RoundNotFound(round_id))?;
        self.repository.list_matches(round_id).await
    }

    pub async fn get_match(&self, match_id: MatchId) -> TournamentResult<Match> {
        self.repository
            .get_match(match_id)
            .await?
            .ok_or(TournamentError::UnknownMatch(match_id))
    }

    pub async fn waiting_players(&self, round_id: RoundId) -> TournamentResult<Vec<WaitingEntry>> {
        self.repository
            .get_round(round_id)
            .await?
            .ok_or(TournamentError::RoundNotFound(round_id))?;
        self.repository.waiting_players(round_id).await
    }

    pub fn list_available_strategies(&self) -> Vec<String> {
        self.registries.strategies.list_names()
    }

    pub fn list_available_calculators(&self) -> Vec<String> {
        self.registries.calculators.list_names()
    }

    /// Strategies able to build matches of `players_per_match` seats
    pub fn get_strategies_for_player_count(&self, players_per_match: usize) -> Vec<String> {
        self.registries.strategies.supporting(players_per_match)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryRepository;
    use uuid::Uuid;

    fn manager() -> TournamentManager {
        TournamentManager::new(Arc::new(InMemoryRepository::new()), Registries::with_builtins())
    }

    #[tokio::test]
    async fn test_create_tournament_validates_calculator() {
        let manager = manager();

        let tournament = manager.create_tournament("Open", None).await.unwrap();
        assert_eq!(tournament.default_calculator, "standard");

        let err = manager.create_tournament("Elo", Some("elo")).await.unwrap_err();
        assert!(matches!(err, TournamentError::UnknownCalculator(name) if name == "elo"));
        assert_eq!(manager.list_tournaments().await.unwrap().len(), 1);

        manager
            .set_default_calculator(tournament.id, "ranking")
            .await
            .unwrap();
        assert_eq!(
            manager.get_tournament(tournament.id).await.unwrap().default_calculator,
            "ranking"
        );
        assert!(manager.set_default_calculator(tournament.id, "elo").await.is_err());
    }

    #[tokio::test]
    async fn test_registration_checks() {
        let manager = manager();
        let tournament = manager.create_tournament("Open", None).await.unwrap();
        let player = manager.create_player("  Ada ").await.unwrap();
        assert_eq!(player.name, "Ada");

        manager
            .add_player_to_tournament(tournament.id, player.id)
            .await
            .unwrap();
        assert!(matches!(
            manager.add_player_to_tournament(tournament.id, player.id).await,
            Err(TournamentError::AlreadyRegistered { .. })
        ));
        assert!(matches!(
            manager.add_player_to_tournament(tournament.id, Uuid::new_v4()).await,
            Err(TournamentError::PlayerNotFound(_))
        ));
        assert!(matches!(
            manager.add_player_to_tournament(Uuid::new_v4(), player.id).await,
            Err(TournamentError::TournamentNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_discovery() {
        let manager = manager();
        assert_eq!(manager.list_available_strategies().len(), 4);
        assert_eq!(manager.list_available_calculators().len(), 5);
        assert_eq!(
            manager.get_strategies_for_player_count(3),
            vec!["roundrobin", "knockout", "freeforall"]
        );
    }

    #[tokio::test]
    async fn test_standings_before_any_round() {
        let manager = manager();
        let tournament = manager.create_tournament("Open", None).await.unwrap();
        for name in ["Ada", "Grace"] {
            let player = manager.create_player(name).await.unwrap();
            manager
                .add_player_to_tournament(tournament.id, player.id)
                .await
                .unwrap();
        }

        let standings = manager.get_standings(tournament.id).await.unwrap();
        assert_eq!(standings.len(), 2);
        assert_eq!(standings[0].player.name, "Ada");
        assert_eq!(standings[0].stats.points, 0.0);
        assert!(matches!(
            manager.get_standings(Uuid::new_v4()).await,
            Err(TournamentError::TournamentNotFound(_))
        ));
    }
}
