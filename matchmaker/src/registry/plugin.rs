//! Extension point for strategies and calculators defined outside the crate.
//!
//! Compiled-in extensions implement [`Plugin`] and are installed explicitly at
//! startup. Calculators that are only a table of numbers can also be supplied
//! as JSON and loaded with [`CalculatorTablePlugin`]:
//!
//! ```json
//! [
//!   { "name": "league", "win": 2.0, "draw": 1.0, "loss": 0.0 },
//!   { "name": "podium", "placements": [5.0, 3.0, 1.0] }
//! ]
//! ```

use super::Registries;
use crate::scoring::{CustomCalculator, PointsTable};
use crate::tournament::{TournamentError, TournamentResult};
use serde::Deserialize;
use std::path::Path;

/// A bundle of strategies and calculators registered together
pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    /// Add this plugin's entries to `registries`
    fn register(&self, registries: &mut Registries) -> TournamentResult<()>;
}

/// One calculator definition in a calculator table file
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum CalculatorTable {
    Outcomes {
        name: String,
        win: f64,
        draw: f64,
        loss: f64,
    },
    Placements {
        name: String,
        placements: Vec<f64>,
    },
}

impl CalculatorTable {
    pub fn name(&self) -> &str {
        match self {
            Self::Outcomes { name, .. } | Self::Placements { name, .. } => name,
        }
    }

    fn validate(&self) -> TournamentResult<()> {
        let invalid = |reason: &str| TournamentError::InvalidRegistration {
            name: self.name().to_string(),
            reason: reason.to_string(),
        };
        match self {
            Self::Outcomes { win, draw, loss, .. } => {
                if ![win, draw, loss].iter().all(|v| v.is_finite()) {
                    return Err(invalid("points must be finite"));
                }
            }
            Self::Placements { placements, .. } => {
                if placements.is_empty() {
                    return Err(invalid("placement table is empty"));
                }
                if !placements.iter().all(|v| v.is_finite()) {
                    return Err(invalid("points must be finite"));
                }
            }
        }
        Ok(())
    }

    fn to_calculator(&self) -> CustomCalculator {
        match self {
            Self::Outcomes {
                name,
                win,
                draw,
                loss,
            } => CustomCalculator::new(
                name.clone(),
                PointsTable::Outcomes {
                    win: *win,
                    draw: *draw,
                    loss: *loss,
                },
            ),
            Self::Placements { name, placements } => {
                CustomCalculator::with_placements(name.clone(), placements.clone())
            }
        }
    }
}

/// Registers table-driven calculators read from JSON
#[derive(Debug, Clone)]
pub struct CalculatorTablePlugin {
    source: String,
    tables: Vec<CalculatorTable>,
}

impl CalculatorTablePlugin {
    /// Parse a JSON array of calculator tables
    ///
    /// # Arguments
    ///
    /// * `json` - Table definitions
    /// * `source` - Label used in logs and as the plugin name
    pub fn from_json(json: &str, source: impl Into<String>) -> TournamentResult<Self> {
        let tables: Vec<CalculatorTable> = serde_json::from_str(json)?;
        for table in &tables {
            table.validate()?;
        }
        Ok(Self {
            source: source.into(),
            tables,
        })
    }

    /// Read and parse a calculator table file
    pub fn from_file(path: impl AsRef<Path>) -> TournamentResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json, path.display().to_string())
    }

    pub fn tables(&self) -> &[CalculatorTable] {
        &self.tables
    }
}

impl Plugin for CalculatorTablePlugin {
    fn name(&self) -> &str {
        &self.source
    }

    fn register(&self, registries: &mut Registries) -> TournamentResult<()> {
        for table in &self.tables {
            let calculator = table.to_calculator();
            registries
                .calculators
                .register(table.name(), move || Box::new(calculator.clone()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tournament::{Match, MatchResult};
    use uuid::Uuid;

    const TABLES: &str = r#"[
        { "name": "league", "win": 2.0, "draw": 1.0, "loss": 0.0 },
        { "name": "podium", "placements": [5.0, 3.0, 1.0] }
    ]"#;

    #[test]
    fn test_loads_both_table_shapes() {
        let plugin = CalculatorTablePlugin::from_json(TABLES, "tables.json").unwrap();
        assert_eq!(plugin.tables().len(), 2);
        assert!(matches!(plugin.tables()[0], CalculatorTable::Outcomes { .. }));
        assert!(matches!(plugin.tables()[1], CalculatorTable::Placements { .. }));
    }

    #[test]
    fn test_installs_calculators() {
        let mut registries = Registries::with_builtins();
        let plugin = CalculatorTablePlugin::from_json(TABLES, "tables.json").unwrap();
        registries.install(&plugin).unwrap();

        let podium = registries.calculators.resolve("podium").unwrap();
        assert!(podium.supports_players_per_match(3));
        assert!(!podium.supports_players_per_match(4));

        let players: Vec<_> = (0..3).map(|_| Uuid::new_v4()).collect();
        let game = Match::new(Uuid::new_v4(), Uuid::new_v4(), players.clone());
        let result = MatchResult::ranked([(players[0], 3), (players[1], 1), (players[2], 2)]);
        assert_eq!(podium.calculate_points(players[0], &game, &result).unwrap(), 1.0);
        assert_eq!(podium.calculate_points(players[1], &game, &result).unwrap(), 5.0);
    }

    #[test]
    fn test_rejects_clash_with_builtin() {
        let mut registries = Registries::with_builtins();
        let plugin =
            CalculatorTablePlugin::from_json(r#"[{"name":"standard","win":1,"draw":0,"loss":0}]"#, "x")
                .unwrap();
        assert!(matches!(
            registries.install(&plugin),
            Err(TournamentError::InvalidRegistration { .. })
        ));
    }

    #[test]
    fn test_failed_install_registers_nothing() {
        let mut registries = Registries::with_builtins();
        let before = registries.calculators.list_names();
        let plugin = CalculatorTablePlugin::from_json(
            r#"[{"name":"league","win":3,"draw":1,"loss":0},{"name":"ranking","placements":[1]}]"#,
            "mixed.json",
        )
        .unwrap();

        assert!(registries.install(&plugin).is_err());
        assert!(!registries.calculators.contains("league"));
        assert_eq!(registries.calculators.list_names(), before);
    }

    #[test]
    fn test_rejects_bad_tables() {
        assert!(matches!(
            CalculatorTablePlugin::from_json(r#"[{"name":"empty","placements":[]}]"#, "x"),
            Err(TournamentError::InvalidRegistration { .. })
        ));
        assert!(matches!(
            CalculatorTablePlugin::from_json(r#"[{"name":"partial","win":1}]"#, "x"),
            Err(TournamentError::Serialization(_))
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        assert!(matches!(
            CalculatorTablePlugin::from_file("/nonexistent/calculators.json"),
            Err(TournamentError::Io(_))
        ));
    }
}
