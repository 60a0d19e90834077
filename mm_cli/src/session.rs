//! Interactive command session.
//!
//! A [`Session`] reads one command per line, runs it against a
//! [`TournamentManager`] and writes either a human-readable summary or JSON.
//! Blank lines and lines starting with `#` are ignored so command scripts can
//! carry comments.

use crate::commands::{COMMANDS_HELP, Command, ReportedOutcome, parse_command};
use crate::config::CliConfig;
use matchmaker::TournamentError;
use matchmaker::tournament::{
    ExhaustionPolicy, Match, MatchResult, Player, PlayerId, Round, RoundConfig, RoundState,
    Standing, Tournament, TournamentManager,
};
use serde::Serialize;
use std::collections::HashMap;
use std::io::Write;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use uuid::Uuid;

/// Errors that end a command
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Tournament(#[from] TournamentError),

    /// A name or ordinal did not resolve to a stored record
    #[error("{0}")]
    Lookup(String),

    #[error("Output error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Whether the session keeps reading after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Command loop over a tournament manager
pub struct Session<W: Write> {
    manager: TournamentManager,
    config: CliConfig,
    out: W,
}

impl<W: Write> Session<W> {
    pub fn new(manager: TournamentManager, config: CliConfig, out: W) -> Self {
        Self {
            manager,
            config,
            out,
        }
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Run commands from `input` until it ends or `quit` is read
    pub async fn run<R: AsyncBufRead + Unpin>(&mut self, input: R) -> Result<(), SessionError> {
        let mut lines = input.lines();
        while let Some(line) = lines.next_line().await? {
            if self.handle_line(&line).await? == Flow::Quit {
                break;
            }
        }
        self.out.flush()?;
        Ok(())
    }

    /// Run one input line.
    ///
    /// Parse failures and domain errors are reported to the output and the
    /// session continues; only output failures are returned.
    pub async fn handle_line(&mut self, line: &str) -> Result<Flow, SessionError> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(Flow::Continue);
        }

        let command = match parse_command(line) {
            Ok(command) => command,
            Err(e) => {
                writeln!(self.out, "Error: {}", e)?;
                return Ok(Flow::Continue);
            }
        };

        match self.execute(command).await {
            Ok(flow) => Ok(flow),
            Err(SessionError::Tournament(e)) => {
                log::debug!("Command '{}' failed: {:?}", line, e);
                writeln!(self.out, "Error: {}", e.client_message())?;
                Ok(Flow::Continue)
            }
            Err(SessionError::Lookup(message)) => {
                writeln!(self.out, "Error: {}", message)?;
                Ok(Flow::Continue)
            }
            Err(e) => Err(e),
        }
    }

    async fn execute(&mut self, command: Command) -> Result<Flow, SessionError> {
        match command {
            Command::AddPlayer { name } => {
                let player = self.manager.create_player(&name).await?;
                self.emit(&player, |p| format!("Created player {} ({})", p.name, p.id))?;
            }
            Command::ListPlayers => {
                let players = self.manager.list_players().await?;
                self.emit(&players, |players| {
                    lines(players.iter().map(|p| format!("{}  {}", p.id, p.name)))
                })?;
            }
            Command::CreateTournament { name, calculator } => {
                let calculator = calculator.unwrap_or_else(|| self.config.default_calculator.clone());
                let tournament = self
                    .manager
                    .create_tournament(&name, Some(&calculator))
                    .await?;
                self.emit(&tournament, |t| {
                    format!(
                        "Created tournament {} ({}) scored by {}",
                        t.name, t.id, t.default_calculator
                    )
                })?;
            }
            Command::ListTournaments => {
                let tournaments = self.manager.list_tournaments().await?;
                self.emit(&tournaments, |tournaments| {
                    lines(tournaments.iter().map(|t| {
                        format!("{}  {}  [{}]", t.id, t.name, t.default_calculator)
                    }))
                })?;
            }
            Command::Join {
                tournament,
                players,
            } => self.join(&tournament, &players).await?,
            Command::Participants { tournament } => {
                let tournament = self.tournament(&tournament).await?;
                let participants = self.manager.participants(tournament.id).await?;
                let names = self.player_names().await?;
                self.emit(&participants, |participants| {
                    lines(participants.iter().map(|tp| {
                        format!("{}  {}", name_of(&names, tp.player_id), tp.status)
                    }))
                })?;
            }
            Command::SetCalculator {
                tournament,
                calculator,
            } => {
                let tournament = self.tournament(&tournament).await?;
                self.manager
                    .set_default_calculator(tournament.id, &calculator)
                    .await?;
                writeln!(
                    self.out,
                    "Tournament {} now scored by {}",
                    tournament.name, calculator
                )?;
            }
            Command::CreateRound {
                tournament,
                strategy,
                players_per_match,
                byes,
                rematch,
            } => {
                let tournament = self.tournament(&tournament).await?;
                let size = players_per_match.unwrap_or(if strategy == "freeforall" { 0 } else { 2 });
                let exhaustion = if rematch {
                    ExhaustionPolicy::Rematch
                } else {
                    self.config.exhaustion()
                };
                let config = RoundConfig::new(strategy, size)
                    .with_byes(byes)
                    .with_exhaustion(exhaustion);

                let summary = self.manager.create_round(tournament.id, config).await?;
                let names = self.player_names().await?;
                self.emit(&summary, |s| {
                    let mut text = format!(
                        "Round {} ({}): {} match(es)",
                        s.round.ordinal,
                        s.round.strategy,
                        s.matches.len()
                    );
                    for (i, game) in s.matches.iter().enumerate() {
                        text.push('\n');
                        text.push_str(&describe_match(s.round.ordinal, i, game, &names));
                    }
                    if !s.waiting.is_empty() {
                        text.push_str(&format!("\n  waiting: {}", join_names(&names, &s.waiting)));
                    }
                    text
                })?;
            }
            Command::ListRounds { tournament } => {
                let tournament = self.tournament(&tournament).await?;
                let rounds = self.manager.list_rounds(tournament.id).await?;
                self.emit(&rounds, |rounds| {
                    lines(rounds.iter().map(|r| {
                        format!("Round {}  {}  {}", r.ordinal, r.strategy, r.state)
                    }))
                })?;
            }
            Command::ListMatches { tournament, round } => {
                let tournament = self.tournament(&tournament).await?;
                let round = self.round(&tournament, round).await?;
                let matches = self.manager.list_matches(round.id).await?;
                let names = self.player_names().await?;
                self.emit(&matches, |matches| {
                    lines(
                        matches
                            .iter()
                            .enumerate()
                            .map(|(i, game)| describe_match(round.ordinal, i, game, &names)),
                    )
                })?;
            }
            Command::Waiting { tournament, round } => {
                let tournament = self.tournament(&tournament).await?;
                let round = self.round(&tournament, round).await?;
                let waiting = self.manager.waiting_players(round.id).await?;
                let names = self.player_names().await?;
                self.emit(&waiting, |waiting| {
                    lines(waiting.iter().map(|w| name_of(&names, w.player_id)))
                })?;
            }
            Command::PairWaiting { tournament } => {
                let tournament = self.tournament(&tournament).await?;
                let matches = self.manager.pair_waiting_players(tournament.id).await?;
                self.print_new_matches(&tournament, &matches).await?;
            }
            Command::Report {
                tournament,
                round,
                index,
                outcome,
            } => {
                let tournament = self.tournament(&tournament).await?;
                self.report(&tournament, round, index, outcome).await?;
            }
            Command::Standings { tournament, replay } => {
                let tournament = self.tournament(&tournament).await?;
                let standings = if replay {
                    self.manager.replay_standings(tournament.id).await?
                } else {
                    self.manager.get_standings(tournament.id).await?
                };
                self.emit(&standings, |standings| standings_table(standings))?;
            }
            Command::Strategies { players_per_match } => {
                let names = match players_per_match {
                    Some(n) => self.manager.get_strategies_for_player_count(n),
                    None => self.manager.list_available_strategies(),
                };
                self.emit(&names, |names| names.join("\n"))?;
            }
            Command::Calculators => {
                let names = self.manager.list_available_calculators();
                self.emit(&names, |names| names.join("\n"))?;
            }
            Command::Help => write!(self.out, "{COMMANDS_HELP}")?,
            Command::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    async fn join(&mut self, tournament: &str, players: &[String]) -> Result<(), SessionError> {
        let tournament = self.tournament(tournament).await?;
        for reference in players {
            let player = self.player(reference).await?;
            let admission = self
                .manager
                .add_player_to_tournament(tournament.id, player.id)
                .await?;

            if self.config.json {
                self.print_json(&admission)?;
                continue;
            }
            writeln!(self.out, "{} joined {}", player.name, tournament.name)?;
            if admission.waiting_round.is_some() && admission.matches.is_empty() {
                writeln!(self.out, "  {} is waiting for a match", player.name)?;
            }
            self.print_new_matches(&tournament, &admission.matches)
                .await?;
        }
        Ok(())
    }

    async fn report(
        &mut self,
        tournament: &Tournament,
        ordinal: u32,
        index: usize,
        outcome: ReportedOutcome,
    ) -> Result<(), SessionError> {
        let round = self.round(tournament, Some(ordinal)).await?;
        let matches = self.manager.list_matches(round.id).await?;
        let game = index.checked_sub(1).and_then(|i| matches.get(i)).ok_or_else(|| {
            SessionError::Lookup(format!("Round {} has no match {}", ordinal, index))
        })?;

        let result = match outcome {
            ReportedOutcome::Draw => MatchResult::draw(),
            ReportedOutcome::Winners(refs) => {
                let mut winners = Vec::with_capacity(refs.len());
                for reference in &refs {
                    winners.push(self.player(reference).await?.id);
                }
                MatchResult::winners(winners)
            }
            ReportedOutcome::Placements(entries) => {
                let mut placements = Vec::with_capacity(entries.len());
                for (reference, place) in &entries {
                    placements.push((self.player(reference).await?.id, *place));
                }
                MatchResult::ranked(placements)
            }
        };

        let recorded = self.manager.record_match_result(game.id, result).await?;
        let names = self.player_names().await?;
        self.emit(&recorded, |r| {
            let points: Vec<String> = game
                .participants
                .iter()
                .filter_map(|player| {
                    let points = r.awarded_points.get(player)?;
                    Some(format!("{} +{}", name_of(&names, *player), points))
                })
                .collect();
            let mut text = format!("Recorded {}.{}: {}", ordinal, index, points.join(", "));
            if !r.eliminated.is_empty() {
                text.push_str(&format!("\n  eliminated: {}", join_names(&names, &r.eliminated)));
            }
            if r.round_state == RoundState::Complete {
                text.push_str(&format!("\n  round {} complete", ordinal));
            }
            text
        })?;
        Ok(())
    }

    /// Print matches just appended to a round, numbered by their position in it
    async fn print_new_matches(
        &mut self,
        tournament: &Tournament,
        matches: &[Match],
    ) -> Result<(), SessionError> {
        if self.config.json {
            return self.print_json(&matches);
        }
        let Some(first) = matches.first() else {
            return Ok(());
        };

        let rounds = self.manager.list_rounds(tournament.id).await?;
        let ordinal = rounds
            .iter()
            .find(|r| r.id == first.round_id)
            .map(|r| r.ordinal)
            .unwrap_or_default();
        let stored = self.manager.list_matches(first.round_id).await?;
        let names = self.player_names().await?;

        for game in matches {
            let index = stored.iter().position(|m| m.id == game.id).unwrap_or_default();
            writeln!(self.out, "{}", describe_match(ordinal, index, game, &names))?;
        }
        Ok(())
    }

    fn emit<T: Serialize + ?Sized>(
        &mut self,
        value: &T,
        text: impl FnOnce(&T) -> String,
    ) -> Result<(), SessionError> {
        if self.config.json {
            return self.print_json(value);
        }
        let text = text(value);
        if !text.is_empty() {
            writeln!(self.out, "{}", text)?;
        }
        Ok(())
    }

    fn print_json<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), SessionError> {
        serde_json::to_writer_pretty(&mut self.out, value)?;
        writeln!(self.out)?;
        Ok(())
    }

    async fn tournament(&self, reference: &str) -> Result<Tournament, SessionError> {
        if let Ok(id) = Uuid::parse_str(reference) {
            return Ok(self.manager.get_tournament(id).await?);
        }
        let mut found: Vec<Tournament> = self
            .manager
            .list_tournaments()
            .await?
            .into_iter()
            .filter(|t| t.name == reference)
            .collect();
        match found.len() {
            0 => Err(SessionError::Lookup(format!("No tournament named '{}'", reference))),
            1 => Ok(found.remove(0)),
            _ => Err(SessionError::Lookup(format!(
                "Several tournaments are named '{}'; use an ID",
                reference
            ))),
        }
    }

    async fn player(&self, reference: &str) -> Result<Player, SessionError> {
        if let Ok(id) = Uuid::parse_str(reference) {
            return Ok(self.manager.get_player(id).await?);
        }
        let mut found: Vec<Player> = self
            .manager
            .list_players()
            .await?
            .into_iter()
            .filter(|p| p.name == reference)
            .collect();
        match found.len() {
            0 => Err(SessionError::Lookup(format!("No player named '{}'", reference))),
            1 => Ok(found.remove(0)),
            _ => Err(SessionError::Lookup(format!(
                "Several players are named '{}'; use an ID",
                reference
            ))),
        }
    }

    /// The round with `ordinal`, or the latest round
    async fn round(
        &self,
        tournament: &Tournament,
        ordinal: Option<u32>,
    ) -> Result<Round, SessionError> {
        let rounds = self.manager.list_rounds(tournament.id).await?;
        let round = match ordinal {
            Some(ordinal) => rounds.into_iter().find(|r| r.ordinal == ordinal),
            None => rounds.into_iter().last(),
        };
        round.ok_or_else(|| match ordinal {
            Some(ordinal) => {
                SessionError::Lookup(format!("{} has no round {}", tournament.name, ordinal))
            }
            None => SessionError::Lookup(format!("{} has no rounds yet", tournament.name)),
        })
    }

    async fn player_names(&self) -> Result<HashMap<PlayerId, String>, SessionError> {
        Ok(self
            .manager
            .list_players()
            .await?
            .into_iter()
            .map(|p| (p.id, p.name))
            .collect())
    }
}

fn lines(items: impl Iterator<Item = String>) -> String {
    items.collect::<Vec<_>>().join("\n")
}

fn name_of(names: &HashMap<PlayerId, String>, player_id: PlayerId) -> String {
    names
        .get(&player_id)
        .cloned()
        .unwrap_or_else(|| player_id.to_string())
}

fn join_names(names: &HashMap<PlayerId, String>, players: &[PlayerId]) -> String {
    players
        .iter()
        .map(|p| name_of(names, *p))
        .collect::<Vec<_>>()
        .join(", ")
}

/// One line per match: `  R.M  A vs B  [result]`
fn describe_match(
    ordinal: u32,
    index: usize,
    game: &Match,
    names: &HashMap<PlayerId, String>,
) -> String {
    let players = game
        .participants
        .iter()
        .map(|p| name_of(names, *p))
        .collect::<Vec<_>>()
        .join(" vs ");
    let label = format!("  {}.{}  {}", ordinal, index + 1, players);

    match &game.result {
        _ if game.auto_bye => format!("{}  [bye]", label),
        None => format!("{}  [pending]", label),
        Some(result) if result.is_draw => format!("{}  [draw]", label),
        Some(result) if !result.winner_ids.is_empty() => {
            format!("{}  [won by {}]", label, join_names(names, &result.winner_ids))
        }
        Some(result) => {
            let mut placed: Vec<(&PlayerId, &u32)> = result.rankings.iter().collect();
            placed.sort_by_key(|(_, place)| **place);
            let placed: Vec<String> = placed
                .into_iter()
                .map(|(player, place)| format!("{}={}", name_of(names, *player), place))
                .collect();
            format!("{}  [{}]", label, placed.join(" "))
        }
    }
}

fn standings_table(standings: &[Standing]) -> String {
    let width = standings
        .iter()
        .map(|s| s.player.name.len())
        .max()
        .unwrap_or(0)
        .max("Player".len());

    let mut text = format!(
        "{:>3}  {:<width$}  {:>7}  {:>3}  {:>3}  {:>3}  {:>3}",
        "#", "Player", "Points", "W", "D", "L", "MP"
    );
    for s in standings {
        text.push_str(&format!(
            "\n{:>3}  {:<width$}  {:>7.2}  {:>3}  {:>3}  {:>3}  {:>3}",
            s.position,
            s.player.name,
            s.stats.points,
            s.stats.wins,
            s.stats.draws,
            s.stats.losses,
            s.stats.matches_played
        ));
    }
    text
}
