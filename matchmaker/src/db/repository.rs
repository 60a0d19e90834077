//! Repository trait definitions for testability and dependency injection.
//!
//! The scheduling core only talks to storage through [`TournamentRepository`].
//! [`PgTournamentRepository`] persists to PostgreSQL; the in-memory double in
//! [`super::memory`] backs tests and the CLI when no database is configured.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool, Row};
use std::collections::{BTreeMap, HashMap, HashSet};

use super::timeouts::{with_query_timeout, with_transaction_timeout};
use crate::scoring::validate_result;
use crate::tournament::{
    HistoryEntry, Match, MatchId, MatchResult, ParticipationStatus, Player, PlayerId, PlayerStats,
    ResultCommit, Round, RoundCommit, RoundConfig, RoundId, RoundState, StatsUpdate, Tournament,
    TournamentError, TournamentId, TournamentPlayer, TournamentResult, WaitingEntry,
};

/// Storage contract of the tournament engine
#[async_trait]
pub trait TournamentRepository: Send + Sync {
    /// Persist a new player
    async fn save_player(&self, player: &Player) -> TournamentResult<()>;

    async fn get_player(&self, player_id: PlayerId) -> TournamentResult<Option<Player>>;

    /// All players ordered by name
    async fn list_players(&self) -> TournamentResult<Vec<Player>>;

    /// Persist a new tournament
    async fn save_tournament(&self, tournament: &Tournament) -> TournamentResult<()>;

    async fn get_tournament(&self, tournament_id: TournamentId)
    -> TournamentResult<Option<Tournament>>;

    /// All tournaments ordered by creation time
    async fn list_tournaments(&self) -> TournamentResult<Vec<Tournament>>;

    async fn set_default_calculator(
        &self,
        tournament_id: TournamentId,
        calculator: &str,
    ) -> TournamentResult<()>;

    /// Register a player with zeroed stats.
    ///
    /// With `late_entry`, the player is also put on that round's waiting list
    /// in the same transaction. Fails with `AlreadyRegistered` on a second join.
    async fn add_participant(
        &self,
        tournament_id: TournamentId,
        player_id: PlayerId,
        late_entry: Option<RoundId>,
    ) -> TournamentResult<TournamentPlayer>;

    /// Participants in join order
    async fn participants(&self, tournament_id: TournamentId)
    -> TournamentResult<Vec<TournamentPlayer>>;

    /// Active participants in join order
    async fn active_players(&self, tournament_id: TournamentId) -> TournamentResult<Vec<PlayerId>>;

    async fn set_participation_status(
        &self,
        tournament_id: TournamentId,
        player_id: PlayerId,
        status: ParticipationStatus,
    ) -> TournamentResult<()>;

    /// Participants of every scheduled match, oldest round first
    async fn match_history(&self, tournament_id: TournamentId)
    -> TournamentResult<Vec<HistoryEntry>>;

    async fn stats(
        &self,
        tournament_id: TournamentId,
    ) -> TournamentResult<HashMap<PlayerId, PlayerStats>>;

    /// Apply stats deltas atomically
    async fn update_stats(
        &self,
        tournament_id: TournamentId,
        deltas: &StatsUpdate,
    ) -> TournamentResult<()>;

    /// Round with the highest ordinal
    async fn latest_round(&self, tournament_id: TournamentId) -> TournamentResult<Option<Round>>;

    async fn get_round(&self, round_id: RoundId) -> TournamentResult<Option<Round>>;

    /// Rounds by ordinal
    async fn list_rounds(&self, tournament_id: TournamentId) -> TournamentResult<Vec<Round>>;

    async fn get_match(&self, match_id: MatchId) -> TournamentResult<Option<Match>>;

    /// Matches of a round in scheduling order
    async fn list_matches(&self, round_id: RoundId) -> TournamentResult<Vec<Match>>;

    /// Every match of a tournament, oldest round first
    async fn tournament_matches(&self, tournament_id: TournamentId) -> TournamentResult<Vec<Match>>;

    /// Waiting entries of a round in arrival order
    async fn waiting_players(&self, round_id: RoundId) -> TournamentResult<Vec<WaitingEntry>>;

    /// Persist a round with its matches, waiting entries and bye credit in one transaction
    async fn save_round(&self, commit: &RoundCommit) -> TournamentResult<()>;

    /// Persist a result with its stats and eliminations in one transaction.
    ///
    /// The round's state is derived from its stored matches inside that
    /// transaction and returned. Fails with `AlreadyReported` if the match
    /// already has a result.
    async fn save_match_result(
        &self,
        match_id: MatchId,
        commit: &ResultCommit,
    ) -> TournamentResult<RoundState>;

    /// Add matches to a round and consume the waiting entries they seat,
    /// returning the round's state afterwards
    async fn append_matches(
        &self,
        round_id: RoundId,
        matches: &[Match],
        consumed: &[PlayerId],
    ) -> TournamentResult<RoundState>;
}

/// Check a loaded match before it reaches the core
pub(crate) fn validate_match(game: &Match) -> TournamentResult<()> {
    let corrupt = |reason: &str| TournamentError::CorruptRecord(format!("match {}: {}", game.id, reason));

    if game.participants.is_empty() {
        return Err(corrupt("no participants"));
    }
    let unique: HashSet<PlayerId> = game.participants.iter().copied().collect();
    if unique.len() != game.participants.len() {
        return Err(corrupt("duplicate participant"));
    }
    if game.auto_bye && game.participants.len() != 1 {
        return Err(corrupt("bye with more than one participant"));
    }
    if let Some(result) = &game.result {
        validate_result(game, result).map_err(|e| corrupt(&e.to_string()))?;
    }
    if game.awarded_points.keys().any(|p| !unique.contains(p)) {
        return Err(corrupt("points awarded to a non-participant"));
    }
    Ok(())
}

/// Default PostgreSQL implementation of `TournamentRepository`
#[derive(Clone)]
pub struct PgTournamentRepository {
    pool: PgPool,
}

impl PgTournamentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn lock_tournament(conn: &mut PgConnection, tournament_id: TournamentId) -> TournamentResult<()> {
        sqlx::query("SELECT id FROM tournaments WHERE id = $1 FOR UPDATE")
            .bind(tournament_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or(TournamentError::TournamentNotFound(tournament_id))?;
        Ok(())
    }

    /// Derive a round's state from its stored matches, the same way as
    /// [`RoundState::from_matches`]
    async fn refresh_round_state(conn: &mut PgConnection, round_id: RoundId) -> TournamentResult<RoundState> {
        let row = sqlx::query(
            "UPDATE rounds SET state = CASE
                 WHEN NOT EXISTS (SELECT 1 FROM matches WHERE round_id = $1 AND result IS NULL)
                     THEN 'complete'
                 WHEN EXISTS (SELECT 1 FROM matches
                              WHERE round_id = $1 AND result IS NOT NULL AND NOT auto_bye)
                     THEN 'in_progress'
                 ELSE 'open'
             END
             WHERE id = $1
             RETURNING state",
        )
        .bind(round_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(TournamentError::RoundNotFound(round_id))?;

        let state: String = row.try_get("state")?;
        RoundState::parse(&state)
            .ok_or_else(|| TournamentError::CorruptRecord(format!("state: '{}'", state)))
    }

    async fn apply_stats(
        conn: &mut PgConnection,
        tournament_id: TournamentId,
        deltas: &StatsUpdate,
    ) -> TournamentResult<()> {
        for (player_id, delta) in deltas {
            let updated = sqlx::query(
                "UPDATE player_stats
                 SET wins = wins + $3, draws = draws + $4, losses = losses + $5,
                     matches_played = matches_played + $6, points = points + $7
                 WHERE tournament_id = $1 AND player_id = $2",
            )
            .bind(tournament_id)
            .bind(player_id)
            .bind(delta.wins as i32)
            .bind(delta.draws as i32)
            .bind(delta.losses as i32)
            .bind(delta.matches_played as i32)
            .bind(delta.points)
            .execute(&mut *conn)
            .await?;

            if updated.rows_affected() == 0 {
                return Err(TournamentError::PlayerNotFound(*player_id));
            }
        }
        Ok(())
    }

    async fn insert_match(conn: &mut PgConnection, game: &Match) -> TournamentResult<()> {
        sqlx::query(
            "INSERT INTO matches (id, round_id, tournament_id, participants, players_per_match,
                                  scheduled_at, auto_bye, result, awarded_points)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(game.id)
        .bind(game.round_id)
        .bind(game.tournament_id)
        .bind(Json(&game.participants))
        .bind(game.players_per_match as i32)
        .bind(game.scheduled_at.naive_utc())
        .bind(game.auto_bye)
        .bind(game.result.as_ref().map(Json))
        .bind(Json(&game.awarded_points))
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    async fn add_participant_tx(
        &self,
        tournament_id: TournamentId,
        player_id: PlayerId,
        late_entry: Option<RoundId>,
    ) -> TournamentResult<TournamentPlayer> {
        let mut tx = self.pool.begin().await?;
        Self::lock_tournament(&mut tx, tournament_id).await?;

        let row = sqlx::query(
            "INSERT INTO tournament_players (tournament_id, player_id, status)
             VALUES ($1, $2, 'active')
             ON CONFLICT (tournament_id, player_id) DO NOTHING
             RETURNING joined_at",
        )
        .bind(tournament_id)
        .bind(player_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(TournamentError::AlreadyRegistered {
            tournament_id,
            player_id,
        })?;

        sqlx::query("INSERT INTO player_stats (tournament_id, player_id) VALUES ($1, $2)")
            .bind(tournament_id)
            .bind(player_id)
            .execute(&mut *tx)
            .await?;

        if let Some(round_id) = late_entry {
            sqlx::query(
                "INSERT INTO waiting_list (round_id, tournament_id, player_id, added_at)
                 VALUES ($1, $2, $3, NOW())",
            )
            .bind(round_id)
            .bind(tournament_id)
            .bind(player_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(TournamentPlayer {
            tournament_id,
            player_id,
            status: ParticipationStatus::Active,
            joined_at: row.try_get::<chrono::NaiveDateTime, _>("joined_at")?.and_utc(),
        })
    }

    async fn save_round_tx(&self, commit: &RoundCommit) -> TournamentResult<()> {
        let round = &commit.round;
        let mut tx = self.pool.begin().await?;
        Self::lock_tournament(&mut tx, round.tournament_id).await?;

        sqlx::query(
            "INSERT INTO rounds (id, tournament_id, ordinal, strategy, config, state, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(round.id)
        .bind(round.tournament_id)
        .bind(round.ordinal as i32)
        .bind(&round.strategy)
        .bind(Json(&round.config))
        .bind(round.state.as_str())
        .bind(round.created_at.naive_utc())
        .execute(&mut *tx)
        .await?;

        for game in &commit.matches {
            Self::insert_match(&mut tx, game).await?;
        }

        for entry in &commit.waiting {
            sqlx::query(
                "INSERT INTO waiting_list (round_id, tournament_id, player_id, added_at)
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(entry.round_id)
            .bind(entry.tournament_id)
            .bind(entry.player_id)
            .bind(entry.added_at.naive_utc())
            .execute(&mut *tx)
            .await?;
        }

        Self::apply_stats(&mut tx, round.tournament_id, &commit.stats).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn save_match_result_tx(
        &self,
        match_id: MatchId,
        commit: &ResultCommit,
    ) -> TournamentResult<RoundState> {
        let mut tx = self.pool.begin().await?;

        let tournament_id: TournamentId =
            sqlx::query("SELECT tournament_id FROM matches WHERE id = $1")
                .bind(match_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(TournamentError::UnknownMatch(match_id))?
                .try_get("tournament_id")?;
        Self::lock_tournament(&mut tx, tournament_id).await?;

        let row = sqlx::query(
            "SELECT round_id, result IS NOT NULL AS reported
             FROM matches WHERE id = $1 FOR UPDATE",
        )
        .bind(match_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(TournamentError::UnknownMatch(match_id))?;

        if row.try_get::<bool, _>("reported")? {
            return Err(TournamentError::AlreadyReported(match_id));
        }
        let round_id: RoundId = row.try_get("round_id")?;

        sqlx::query("UPDATE matches SET result = $2, awarded_points = $3 WHERE id = $1")
            .bind(match_id)
            .bind(Json(&commit.result))
            .bind(Json(&commit.awarded_points))
            .execute(&mut *tx)
            .await?;

        Self::apply_stats(&mut tx, tournament_id, &commit.stats).await?;

        if !commit.eliminated.is_empty() {
            sqlx::query(
                "UPDATE tournament_players SET status = 'eliminated'
                 WHERE tournament_id = $1 AND player_id = ANY($2)",
            )
            .bind(tournament_id)
            .bind(&commit.eliminated)
            .execute(&mut *tx)
            .await?;
        }

        let state = Self::refresh_round_state(&mut tx, round_id).await?;
        tx.commit().await?;
        Ok(state)
    }

    async fn append_matches_tx(
        &self,
        round_id: RoundId,
        matches: &[Match],
        consumed: &[PlayerId],
    ) -> TournamentResult<RoundState> {
        let mut tx = self.pool.begin().await?;

        let tournament_id: TournamentId = sqlx::query("SELECT tournament_id FROM rounds WHERE id = $1")
            .bind(round_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(TournamentError::RoundNotFound(round_id))?
            .try_get("tournament_id")?;
        Self::lock_tournament(&mut tx, tournament_id).await?;

        for game in matches {
            Self::insert_match(&mut tx, game).await?;
        }

        sqlx::query("DELETE FROM waiting_list WHERE round_id = $1 AND player_id = ANY($2)")
            .bind(round_id)
            .bind(consumed)
            .execute(&mut *tx)
            .await?;

        let state = Self::refresh_round_state(&mut tx, round_id).await?;
        tx.commit().await?;
        Ok(state)
    }
}

fn decode_json<T: DeserializeOwned>(row: &PgRow, column: &str) -> TournamentResult<T> {
    let value: serde_json::Value = row.try_get(column)?;
    serde_json::from_value(value)
        .map_err(|e| TournamentError::CorruptRecord(format!("{}: {}", column, e)))
}

fn to_u32(value: i32, column: &str) -> TournamentResult<u32> {
    u32::try_from(value)
        .map_err(|_| TournamentError::CorruptRecord(format!("{}: negative value {}", column, value)))
}

fn player_from_row(row: &PgRow) -> TournamentResult<Player> {
    Ok(Player {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        created_at: row.try_get::<chrono::NaiveDateTime, _>("created_at")?.and_utc(),
    })
}

fn tournament_from_row(row: &PgRow) -> TournamentResult<Tournament> {
    Ok(Tournament {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        default_calculator: row.try_get("default_calculator")?,
        created_at: row.try_get::<chrono::NaiveDateTime, _>("created_at")?.and_utc(),
    })
}

fn participant_from_row(row: &PgRow) -> TournamentResult<TournamentPlayer> {
    let status: String = row.try_get("status")?;
    Ok(TournamentPlayer {
        tournament_id: row.try_get("tournament_id")?,
        player_id: row.try_get("player_id")?,
        status: ParticipationStatus::parse(&status)
            .ok_or_else(|| TournamentError::CorruptRecord(format!("status: '{}'", status)))?,
        joined_at: row.try_get::<chrono::NaiveDateTime, _>("joined_at")?.and_utc(),
    })
}

fn round_from_row(row: &PgRow) -> TournamentResult<Round> {
    let state: String = row.try_get("state")?;
    Ok(Round {
        id: row.try_get("id")?,
        tournament_id: row.try_get("tournament_id")?,
        ordinal: to_u32(row.try_get("ordinal")?, "ordinal")?,
        strategy: row.try_get("strategy")?,
        config: decode_json::<RoundConfig>(row, "config")?,
        state: RoundState::parse(&state)
            .ok_or_else(|| TournamentError::CorruptRecord(format!("state: '{}'", state)))?,
        created_at: row.try_get::<chrono::NaiveDateTime, _>("created_at")?.and_utc(),
    })
}

fn match_from_row(row: &PgRow) -> TournamentResult<Match> {
    let result: Option<serde_json::Value> = row.try_get("result")?;
    let result = result
        .map(serde_json::from_value::<MatchResult>)
        .transpose()
        .map_err(|e| TournamentError::CorruptRecord(format!("result: {}", e)))?;

    let game = Match {
        id: row.try_get("id")?,
        round_id: row.try_get("round_id")?,
        tournament_id: row.try_get("tournament_id")?,
        participants: decode_json::<Vec<PlayerId>>(row, "participants")?,
        players_per_match: to_u32(row.try_get("players_per_match")?, "players_per_match")? as usize,
        scheduled_at: row.try_get::<chrono::NaiveDateTime, _>("scheduled_at")?.and_utc(),
        auto_bye: row.try_get("auto_bye")?,
        result,
        awarded_points: decode_json::<BTreeMap<PlayerId, f64>>(row, "awarded_points")?,
    };
    validate_match(&game)?;
    Ok(game)
}

fn waiting_from_row(row: &PgRow) -> TournamentResult<WaitingEntry> {
    Ok(WaitingEntry {
        round_id: row.try_get("round_id")?,
        tournament_id: row.try_get("tournament_id")?,
        player_id: row.try_get("player_id")?,
        added_at: row.try_get::<chrono::NaiveDateTime, _>("added_at")?.and_utc(),
    })
}

const MATCH_COLUMNS: &str = "m.id, m.round_id, m.tournament_id, m.participants, m.players_per_match,
                             m.scheduled_at, m.auto_bye, m.result, m.awarded_points";

const ROUND_COLUMNS: &str = "id, tournament_id, ordinal, strategy, config, state, created_at";

#[async_trait]
impl TournamentRepository for PgTournamentRepository {
    async fn save_player(&self, player: &Player) -> TournamentResult<()> {
        with_query_timeout(async {
            sqlx::query("INSERT INTO players (id, name, created_at) VALUES ($1, $2, $3)")
                .bind(player.id)
                .bind(&player.name)
                .bind(player.created_at.naive_utc())
                .execute(&self.pool)
                .await?;
            Ok::<_, TournamentError>(())
        })
        .await
    }

    async fn get_player(&self, player_id: PlayerId) -> TournamentResult<Option<Player>> {
        with_query_timeout(async {
            let row = sqlx::query("SELECT id, name, created_at FROM players WHERE id = $1")
                .bind(player_id)
                .fetch_optional(&self.pool)
                .await?;
            row.as_ref().map(player_from_row).transpose()
        })
        .await
    }

    async fn list_players(&self) -> TournamentResult<Vec<Player>> {
        with_query_timeout(async {
            let rows =
                sqlx::query("SELECT id, name, created_at FROM players ORDER BY name, created_at")
                    .fetch_all(&self.pool)
                    .await?;
            rows.iter().map(player_from_row).collect::<TournamentResult<Vec<_>>>()
        })
        .await
    }

    async fn save_tournament(&self, tournament: &Tournament) -> TournamentResult<()> {
        with_query_timeout(async {
            sqlx::query(
                "INSERT INTO tournaments (id, name, default_calculator, created_at) VALUES ($1, $2, $3, $4)",
            )
            .bind(tournament.id)
            .bind(&tournament.name)
            .bind(&tournament.default_calculator)
            .bind(tournament.created_at.naive_utc())
            .execute(&self.pool)
            .await?;
            Ok::<_, TournamentError>(())
        })
        .await
    }

    async fn get_tournament(
        &self,
        tournament_id: TournamentId,
    ) -> TournamentResult<Option<Tournament>> {
        with_query_timeout(async {
            let row = sqlx::query(
                "SELECT id, name, default_calculator, created_at FROM tournaments WHERE id = $1",
            )
            .bind(tournament_id)
            .fetch_optional(&self.pool)
            .await?;
            row.as_ref().map(tournament_from_row).transpose()
        })
        .await
    }

    async fn list_tournaments(&self) -> TournamentResult<Vec<Tournament>> {
        with_query_timeout(async {
            let rows = sqlx::query(
                "SELECT id, name, default_calculator, created_at FROM tournaments ORDER BY created_at",
            )
            .fetch_all(&self.pool)
            .await?;
            rows.iter().map(tournament_from_row).collect::<TournamentResult<Vec<_>>>()
        })
        .await
    }

    async fn set_default_calculator(
        &self,
        tournament_id: TournamentId,
        calculator: &str,
    ) -> TournamentResult<()> {
        with_query_timeout(async {
            let updated =
                sqlx::query("UPDATE tournaments SET default_calculator = $2 WHERE id = $1")
                    .bind(tournament_id)
                    .bind(calculator)
                    .execute(&self.pool)
                    .await?;
            if updated.rows_affected() == 0 {
                return Err(TournamentError::TournamentNotFound(tournament_id));
            }
            Ok(())
        })
        .await
    }

    async fn add_participant(
        &self,
        tournament_id: TournamentId,
        player_id: PlayerId,
        late_entry: Option<RoundId>,
    ) -> TournamentResult<TournamentPlayer> {
        with_transaction_timeout(self.add_participant_tx(tournament_id, player_id, late_entry)).await
    }

    async fn participants(
        &self,
        tournament_id: TournamentId,
    ) -> TournamentResult<Vec<TournamentPlayer>> {
        with_query_timeout(async {
            let rows = sqlx::query(
                "SELECT tournament_id, player_id, status, joined_at FROM tournament_players
                 WHERE tournament_id = $1 ORDER BY join_seq",
            )
            .bind(tournament_id)
            .fetch_all(&self.pool)
            .await?;
            rows.iter().map(participant_from_row).collect::<TournamentResult<Vec<_>>>()
        })
        .await
    }

    async fn active_players(&self, tournament_id: TournamentId) -> TournamentResult<Vec<PlayerId>> {
        with_query_timeout(async {
            let rows = sqlx::query(
                "SELECT player_id FROM tournament_players
                 WHERE tournament_id = $1 AND status = 'active' ORDER BY join_seq",
            )
            .bind(tournament_id)
            .fetch_all(&self.pool)
            .await?;
            let players = rows
                .iter()
                .map(|r| r.try_get("player_id"))
                .collect::<Result<Vec<PlayerId>, _>>()?;
            Ok::<_, TournamentError>(players)
        })
        .await
    }

    async fn set_participation_status(
        &self,
        tournament_id: TournamentId,
        player_id: PlayerId,
        status: ParticipationStatus,
    ) -> TournamentResult<()> {
        with_query_timeout(async {
            let updated = sqlx::query(
                "UPDATE tournament_players SET status = $3 WHERE tournament_id = $1 AND player_id = $2",
            )
            .bind(tournament_id)
            .bind(player_id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await?;
            if updated.rows_affected() == 0 {
                return Err(TournamentError::PlayerNotFound(player_id));
            }
            Ok(())
        })
        .await
    }

    async fn match_history(
        &self,
        tournament_id: TournamentId,
    ) -> TournamentResult<Vec<HistoryEntry>> {
        with_query_timeout(async {
            let rows = sqlx::query(
                "SELECT m.participants, r.ordinal FROM matches m
                 JOIN rounds r ON r.id = m.round_id
                 WHERE m.tournament_id = $1 ORDER BY r.ordinal, m.seq",
            )
            .bind(tournament_id)
            .fetch_all(&self.pool)
            .await?;

            rows.iter()
                .map(|row| {
                    Ok(HistoryEntry {
                        participants: decode_json(row, "participants")?,
                        round_ordinal: to_u32(row.try_get("ordinal")?, "ordinal")?,
                    })
                })
                .collect::<TournamentResult<Vec<_>>>()
        })
        .await
    }

    async fn stats(
        &self,
        tournament_id: TournamentId,
    ) -> TournamentResult<HashMap<PlayerId, PlayerStats>> {
        with_query_timeout(async {
            let rows = sqlx::query(
                "SELECT player_id, wins, draws, losses, matches_played, points FROM player_stats
                 WHERE tournament_id = $1",
            )
            .bind(tournament_id)
            .fetch_all(&self.pool)
            .await?;

            rows.iter()
                .map(|row| {
                    let player_id: PlayerId = row.try_get("player_id")?;
                    let stats = PlayerStats {
                        player_id,
                        tournament_id,
                        wins: to_u32(row.try_get("wins")?, "wins")?,
                        draws: to_u32(row.try_get("draws")?, "draws")?,
                        losses: to_u32(row.try_get("losses")?, "losses")?,
                        matches_played: to_u32(row.try_get("matches_played")?, "matches_played")?,
                        points: row.try_get("points")?,
                    };
                    Ok((player_id, stats))
                })
                .collect::<TournamentResult<HashMap<_, _>>>()
        })
        .await
    }

    async fn update_stats(
        &self,
        tournament_id: TournamentId,
        deltas: &StatsUpdate,
    ) -> TournamentResult<()> {
        with_transaction_timeout(async {
            let mut tx = self.pool.begin().await?;
            Self::apply_stats(&mut tx, tournament_id, deltas).await?;
            tx.commit().await?;
            Ok::<_, TournamentError>(())
        })
        .await
    }

    async fn latest_round(&self, tournament_id: TournamentId) -> TournamentResult<Option<Round>> {
        with_query_timeout(async {
            let row = sqlx::query(&format!(
                "SELECT {} FROM rounds WHERE tournament_id = $1 ORDER BY ordinal DESC LIMIT 1",
                ROUND_COLUMNS
            ))
            .bind(tournament_id)
            .fetch_optional(&self.pool)
            .await?;
            row.as_ref().map(round_from_row).transpose()
        })
        .await
    }

    async fn get_round(&self, round_id: RoundId) -> TournamentResult<Option<Round>> {
        with_query_timeout(async {
            let row = sqlx::query(&format!("SELECT {} FROM rounds WHERE id = $1", ROUND_COLUMNS))
                .bind(round_id)
                .fetch_optional(&self.pool)
                .await?;
            row.as_ref().map(round_from_row).transpose()
        })
        .await
    }

    async fn list_rounds(&self, tournament_id: TournamentId) -> TournamentResult<Vec<Round>> {
        with_query_timeout(async {
            let rows = sqlx::query(&format!(
                "SELECT {} FROM rounds WHERE tournament_id = $1 ORDER BY ordinal",
                ROUND_COLUMNS
            ))
            .bind(tournament_id)
            .fetch_all(&self.pool)
            .await?;
            rows.iter().map(round_from_row).collect::<TournamentResult<Vec<_>>>()
        })
        .await
    }

    async fn get_match(&self, match_id: MatchId) -> TournamentResult<Option<Match>> {
        with_query_timeout(async {
            let row =
                sqlx::query(&format!("SELECT {} FROM matches m WHERE m.id = $1", MATCH_COLUMNS))
                    .bind(match_id)
                    .fetch_optional(&self.pool)
                    .await?;
            row.as_ref().map(match_from_row).transpose()
        })
        .await
    }

    async fn list_matches(&self, round_id: RoundId) -> TournamentResult<Vec<Match>> {
        with_query_timeout(async {
            let rows = sqlx::query(&format!(
                "SELECT {} FROM matches m WHERE m.round_id = $1 ORDER BY m.seq",
                MATCH_COLUMNS
            ))
            .bind(round_id)
            .fetch_all(&self.pool)
            .await?;
            rows.iter().map(match_from_row).collect::<TournamentResult<Vec<_>>>()
        })
        .await
    }

    async fn tournament_matches(&self, tournament_id: TournamentId) -> TournamentResult<Vec<Match>> {
        with_query_timeout(async {
            let rows = sqlx::query(&format!(
                "SELECT {} FROM matches m JOIN rounds r ON r.id = m.round_id
                 WHERE m.tournament_id = $1 ORDER BY r.ordinal, m.seq",
                MATCH_COLUMNS
            ))
            .bind(tournament_id)
            .fetch_all(&self.pool)
            .await?;
            rows.iter().map(match_from_row).collect::<TournamentResult<Vec<_>>>()
        })
        .await
    }

    async fn waiting_players(&self, round_id: RoundId) -> TournamentResult<Vec<WaitingEntry>> {
        with_query_timeout(async {
            let rows = sqlx::query(
                "SELECT round_id, tournament_id, player_id, added_at FROM waiting_list
                 WHERE round_id = $1 ORDER BY seq",
            )
            .bind(round_id)
            .fetch_all(&self.pool)
            .await?;
            rows.iter().map(waiting_from_row).collect::<TournamentResult<Vec<_>>>()
        })
        .await
    }

    async fn save_round(&self, commit: &RoundCommit) -> TournamentResult<()> {
        with_transaction_timeout(self.save_round_tx(commit)).await
    }

    async fn save_match_result(
        &self,
        match_id: MatchId,
        commit: &ResultCommit,
    ) -> TournamentResult<RoundState> {
        with_transaction_timeout(self.save_match_result_tx(match_id, commit)).await
    }

    async fn append_matches(
        &self,
        round_id: RoundId,
        matches: &[Match],
        consumed: &[PlayerId],
    ) -> TournamentResult<RoundState> {
        with_transaction_timeout(self.append_matches_tx(round_id, matches, consumed)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_validate_match_rejects_corrupt_rows() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let mut game = Match::new(Uuid::new_v4(), Uuid::new_v4(), vec![a, b]);
        assert!(validate_match(&game).is_ok());

        game.participants = vec![a, a];
        assert!(matches!(validate_match(&game), Err(TournamentError::CorruptRecord(_))));

        game.participants = vec![a, b];
        game.result = Some(MatchResult::winner(Uuid::new_v4()));
        assert!(matches!(validate_match(&game), Err(TournamentError::CorruptRecord(_))));

        game.result = Some(MatchResult::winner(a));
        game.awarded_points.insert(Uuid::new_v4(), 1.0);
        assert!(matches!(validate_match(&game), Err(TournamentError::CorruptRecord(_))));
    }
}
