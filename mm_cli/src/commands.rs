//! Line-oriented command parsing.
//!
//! Players and tournaments are referenced by UUID or by exact name. Rounds
//! are referenced by ordinal within a tournament, and matches as
//! `ROUND.MATCH` (both 1-based), e.g. `2.1`.

use std::fmt;

/// Help text printed by the `help` command
pub const COMMANDS_HELP: &str = "\
COMMANDS:
  player NAME                          Create a player
  players                              List players
  tournament NAME [CALCULATOR]         Create a tournament
  tournaments                          List tournaments
  join TOURNAMENT PLAYER...            Add players to a tournament
  participants TOURNAMENT              List participants and their status
  calculator TOURNAMENT NAME           Change the tournament's calculator
  round TOURNAMENT STRATEGY [SIZE] [byes] [rematch]
                                       Create the next round
  rounds TOURNAMENT                    List rounds
  matches TOURNAMENT [ROUND]           List matches of a round [default: latest]
  waiting TOURNAMENT [ROUND]           List waiting players of a round
  pair TOURNAMENT                      Pair waiting players of the open round
  report TOURNAMENT R.M win PLAYER...  Record winners of match M in round R
  report TOURNAMENT R.M draw           Record a draw
  report TOURNAMENT R.M rank PLAYER=PLACE...
                                       Record placements
  standings TOURNAMENT [replay]        Show standings
  strategies [SIZE]                    List strategies [supporting SIZE-player matches]
  calculators                          List calculators
  help                                 Print this help
  quit                                 Exit
";

/// A reported match outcome before player references are resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportedOutcome {
    Winners(Vec<String>),
    Draw,
    Placements(Vec<(String, u32)>),
}

/// A parsed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    AddPlayer {
        name: String,
    },
    ListPlayers,
    CreateTournament {
        name: String,
        calculator: Option<String>,
    },
    ListTournaments,
    Join {
        tournament: String,
        players: Vec<String>,
    },
    Participants {
        tournament: String,
    },
    SetCalculator {
        tournament: String,
        calculator: String,
    },
    CreateRound {
        tournament: String,
        strategy: String,
        players_per_match: Option<usize>,
        byes: bool,
        rematch: bool,
    },
    ListRounds {
        tournament: String,
    },
    ListMatches {
        tournament: String,
        round: Option<u32>,
    },
    Waiting {
        tournament: String,
        round: Option<u32>,
    },
    PairWaiting {
        tournament: String,
    },
    Report {
        tournament: String,
        round: u32,
        index: usize,
        outcome: ReportedOutcome,
    },
    Standings {
        tournament: String,
        replay: bool,
    },
    Strategies {
        players_per_match: Option<usize>,
    },
    Calculators,
    Help,
    Quit,
}

/// Errors that can occur during command parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A required argument is missing.
    MissingArgument { usage: &'static str },
    /// Not a valid non-negative number.
    InvalidNumber(String),
    /// Match reference not of the form `ROUND.MATCH`.
    InvalidMatchRef(String),
    /// Placement not of the form `PLAYER=PLACE`.
    InvalidPlacement(String),
    /// Unknown result kind or round option.
    UnknownOption(String),
    /// Unrecognized command.
    UnrecognizedCommand(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingArgument { usage } => write!(f, "Missing argument. Usage: {}", usage),
            Self::InvalidNumber(value) => {
                write!(f, "Invalid number '{}'. Must be a non-negative integer", value)
            }
            Self::InvalidMatchRef(value) => write!(
                f,
                "Invalid match '{}'. Use ROUND.MATCH (e.g., '2.1' for the first match of round 2)",
                value
            ),
            Self::InvalidPlacement(value) => write!(
                f,
                "Invalid placement '{}'. Use PLAYER=PLACE (e.g., 'alice=1')",
                value
            ),
            Self::UnknownOption(value) => write!(f, "Unknown option '{}'", value),
            Self::UnrecognizedCommand(cmd) => write!(
                f,
                "Unrecognized command '{}'. Type 'help' to see available commands",
                cmd
            ),
        }
    }
}

impl std::error::Error for ParseError {}

/// Parse one input line into a [`Command`].
///
/// # Examples
///
/// ```
/// use mm_cli::commands::{Command, parse_command};
///
/// assert_eq!(parse_command("players"), Ok(Command::ListPlayers));
/// assert!(matches!(
///     parse_command("round spring swiss"),
///     Ok(Command::CreateRound { players_per_match: None, .. })
/// ));
/// ```
pub fn parse_command(input: &str) -> Result<Command, ParseError> {
    let trimmed = input.trim();

    // Try single-word commands first
    match trimmed {
        "players" => return Ok(Command::ListPlayers),
        "tournaments" => return Ok(Command::ListTournaments),
        "calculators" => return Ok(Command::Calculators),
        "help" => return Ok(Command::Help),
        "quit" | "exit" => return Ok(Command::Quit),
        _ => {}
    }

    let parts: Vec<&str> = trimmed.split_ascii_whitespace().collect();
    let arg = |i: usize, usage: &'static str| {
        parts
            .get(i)
            .map(|s| s.to_string())
            .ok_or(ParseError::MissingArgument { usage })
    };

    match parts.first() {
        Some(&"player") => Ok(Command::AddPlayer {
            name: arg(1, "player NAME")?,
        }),
        Some(&"tournament") => Ok(Command::CreateTournament {
            name: arg(1, "tournament NAME [CALCULATOR]")?,
            calculator: parts.get(2).map(|s| s.to_string()),
        }),
        Some(&"join") => {
            let usage = "join TOURNAMENT PLAYER...";
            let tournament = arg(1, usage)?;
            if parts.len() < 3 {
                return Err(ParseError::MissingArgument { usage });
            }
            Ok(Command::Join {
                tournament,
                players: parts[2..].iter().map(|s| s.to_string()).collect(),
            })
        }
        Some(&"participants") => Ok(Command::Participants {
            tournament: arg(1, "participants TOURNAMENT")?,
        }),
        Some(&"calculator") => Ok(Command::SetCalculator {
            tournament: arg(1, "calculator TOURNAMENT NAME")?,
            calculator: arg(2, "calculator TOURNAMENT NAME")?,
        }),
        Some(&"round") => parse_round_command(&parts),
        Some(&"rounds") => Ok(Command::ListRounds {
            tournament: arg(1, "rounds TOURNAMENT")?,
        }),
        Some(&"matches") => Ok(Command::ListMatches {
            tournament: arg(1, "matches TOURNAMENT [ROUND]")?,
            round: parts.get(2).map(|s| parse_number(s)).transpose()?,
        }),
        Some(&"waiting") => Ok(Command::Waiting {
            tournament: arg(1, "waiting TOURNAMENT [ROUND]")?,
            round: parts.get(2).map(|s| parse_number(s)).transpose()?,
        }),
        Some(&"pair") => Ok(Command::PairWaiting {
            tournament: arg(1, "pair TOURNAMENT")?,
        }),
        Some(&"report") => parse_report_command(&parts),
        Some(&"standings") => Ok(Command::Standings {
            tournament: arg(1, "standings TOURNAMENT [replay]")?,
            replay: match parts.get(2) {
                None => false,
                Some(&"replay") => true,
                Some(other) => return Err(ParseError::UnknownOption(other.to_string())),
            },
        }),
        Some(&"strategies") => Ok(Command::Strategies {
            players_per_match: parts.get(1).map(|s| parse_number(s)).transpose()?,
        }),
        _ => Err(ParseError::UnrecognizedCommand(trimmed.to_string())),
    }
}

fn parse_number<T: std::str::FromStr>(value: &str) -> Result<T, ParseError> {
    value
        .parse()
        .map_err(|_| ParseError::InvalidNumber(value.to_string()))
}

/// Parse a round command: "round TOURNAMENT STRATEGY [SIZE] [byes] [rematch]"
fn parse_round_command(parts: &[&str]) -> Result<Command, ParseError> {
    let usage = "round TOURNAMENT STRATEGY [SIZE] [byes] [rematch]";
    let (Some(tournament), Some(strategy)) = (parts.get(1), parts.get(2)) else {
        return Err(ParseError::MissingArgument { usage });
    };

    let mut players_per_match = None;
    let mut byes = false;
    let mut rematch = false;
    for option in &parts[3..] {
        match *option {
            "byes" => byes = true,
            "rematch" => rematch = true,
            value if value.chars().all(|c| c.is_ascii_digit()) && players_per_match.is_none() => {
                players_per_match = Some(parse_number(value)?);
            }
            other => return Err(ParseError::UnknownOption(other.to_string())),
        }
    }

    Ok(Command::CreateRound {
        tournament: tournament.to_string(),
        strategy: strategy.to_string(),
        players_per_match,
        byes,
        rematch,
    })
}

/// Parse a report command: "report TOURNAMENT R.M (win PLAYER... | draw | rank PLAYER=PLACE...)"
fn parse_report_command(parts: &[&str]) -> Result<Command, ParseError> {
    let usage = "report TOURNAMENT R.M (win PLAYER... | draw | rank PLAYER=PLACE...)";
    let (Some(tournament), Some(match_ref), Some(kind)) = (parts.get(1), parts.get(2), parts.get(3))
    else {
        return Err(ParseError::MissingArgument { usage });
    };

    let (round, index) = match_ref
        .split_once('.')
        .and_then(|(r, m)| Some((r.parse::<u32>().ok()?, m.parse::<usize>().ok()?)))
        .filter(|(r, m)| *r > 0 && *m > 0)
        .ok_or_else(|| ParseError::InvalidMatchRef(match_ref.to_string()))?;

    let rest = &parts[4..];
    let outcome = match *kind {
        "draw" => ReportedOutcome::Draw,
        "win" if !rest.is_empty() => {
            ReportedOutcome::Winners(rest.iter().map(|s| s.to_string()).collect())
        }
        "rank" if !rest.is_empty() => ReportedOutcome::Placements(
            rest.iter()
                .map(|entry| {
                    entry
                        .split_once('=')
                        .and_then(|(player, place)| {
                            Some((player.to_string(), place.parse::<u32>().ok()?))
                        })
                        .filter(|(player, _)| !player.is_empty())
                        .ok_or_else(|| ParseError::InvalidPlacement(entry.to_string()))
                })
                .collect::<Result<_, _>>()?,
        ),
        "win" | "rank" => return Err(ParseError::MissingArgument { usage }),
        other => return Err(ParseError::UnknownOption(other.to_string())),
    };

    Ok(Command::Report {
        tournament: tournament.to_string(),
        round,
        index,
        outcome,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // === Single-word command tests ===

    #[test]
    fn test_parse_listing_commands() {
        assert_eq!(parse_command("players"), Ok(Command::ListPlayers));
        assert_eq!(parse_command("  tournaments "), Ok(Command::ListTournaments));
        assert_eq!(parse_command("calculators"), Ok(Command::Calculators));
        assert_eq!(parse_command("exit"), Ok(Command::Quit));
    }

    // === Multi-word command tests ===

    #[test]
    fn test_parse_tournament_with_calculator() {
        assert_eq!(
            parse_command("tournament spring three_point"),
            Ok(Command::CreateTournament {
                name: "spring".to_string(),
                calculator: Some("three_point".to_string()),
            })
        );
    }

    #[test]
    fn test_parse_join_many() {
        assert_eq!(
            parse_command("join spring ada grace"),
            Ok(Command::Join {
                tournament: "spring".to_string(),
                players: vec!["ada".to_string(), "grace".to_string()],
            })
        );
        assert!(matches!(
            parse_command("join spring"),
            Err(ParseError::MissingArgument { .. })
        ));
    }

    #[test]
    fn test_parse_round_options() {
        assert_eq!(
            parse_command("round spring knockout 3 byes"),
            Ok(Command::CreateRound {
                tournament: "spring".to_string(),
                strategy: "knockout".to_string(),
                players_per_match: Some(3),
                byes: true,
                rematch: false,
            })
        );
        assert_eq!(
            parse_command("round spring swiss fast"),
            Err(ParseError::UnknownOption("fast".to_string()))
        );
        assert!(matches!(
            parse_command("round spring"),
            Err(ParseError::MissingArgument { .. })
        ));
    }

    #[test]
    fn test_parse_report_outcomes() {
        assert_eq!(
            parse_command("report spring 2.1 win ada"),
            Ok(Command::Report {
                tournament: "spring".to_string(),
                round: 2,
                index: 1,
                outcome: ReportedOutcome::Winners(vec!["ada".to_string()]),
            })
        );
        assert!(matches!(
            parse_command("report spring 1.2 draw"),
            Ok(Command::Report { outcome: ReportedOutcome::Draw, .. })
        ));
        assert!(matches!(
            parse_command("report spring 1.1 rank ada=2 grace=1"),
            Ok(Command::Report { outcome: ReportedOutcome::Placements(p), .. })
                if p == vec![("ada".to_string(), 2), ("grace".to_string(), 1)]
        ));
    }

    #[test]
    fn test_parse_report_errors() {
        assert_eq!(
            parse_command("report spring 0.1 draw"),
            Err(ParseError::InvalidMatchRef("0.1".to_string()))
        );
        assert_eq!(
            parse_command("report spring 1 draw"),
            Err(ParseError::InvalidMatchRef("1".to_string()))
        );
        assert_eq!(
            parse_command("report spring 1.1 rank ada"),
            Err(ParseError::InvalidPlacement("ada".to_string()))
        );
        assert!(matches!(
            parse_command("report spring 1.1 win"),
            Err(ParseError::MissingArgument { .. })
        ));
        assert_eq!(
            parse_command("report spring 1.1 forfeit"),
            Err(ParseError::UnknownOption("forfeit".to_string()))
        );
    }

    #[test]
    fn test_parse_optional_numbers() {
        assert_eq!(
            parse_command("matches spring 3"),
            Ok(Command::ListMatches {
                tournament: "spring".to_string(),
                round: Some(3),
            })
        );
        assert_eq!(
            parse_command("strategies x"),
            Err(ParseError::InvalidNumber("x".to_string()))
        );
        assert_eq!(
            parse_command("strategies 4"),
            Ok(Command::Strategies { players_per_match: Some(4) })
        );
    }

    #[test]
    fn test_parse_unrecognized() {
        let err = parse_command("deal").unwrap_err();
        assert!(err.to_string().contains("Type 'help'"));
    }
}
