//! Name-keyed registries of strategies and calculators.
//!
//! Entries are factories registered at startup: built-ins through
//! [`Registries::with_builtins`], extensions through [`Registries::install`].
//! Registration order is preserved for listing.

pub mod plugin;

pub use plugin::{CalculatorTable, CalculatorTablePlugin, Plugin};

use crate::scoring::{
    CustomCalculator, PercentageCalculator, PointsCalculator, RankingCalculator,
    StandardCalculator, ThreePointCalculator,
};
use crate::strategy::{
    FreeForAllStrategy, KnockoutStrategy, MatchmakingStrategy, RoundRobinStrategy, SwissStrategy,
};
use crate::tournament::{TournamentError, TournamentResult};
use std::sync::Arc;

/// What a registry needs to know about its entries
pub trait Registrable: Send + Sync {
    fn registered_name(&self) -> &str;
    fn supports_players(&self, n: usize) -> bool;
}

impl Registrable for dyn MatchmakingStrategy {
    fn registered_name(&self) -> &str {
        self.name()
    }

    fn supports_players(&self, n: usize) -> bool {
        self.supports_players_per_match(n)
    }
}

impl Registrable for dyn PointsCalculator {
    fn registered_name(&self) -> &str {
        self.name()
    }

    fn supports_players(&self, n: usize) -> bool {
        self.supports_players_per_match(n)
    }
}

/// Builds a fresh instance of a registered entry
pub type Factory<T> = Arc<dyn Fn() -> Box<T> + Send + Sync>;

/// An ordered, name-keyed set of factories
pub struct Registry<T: ?Sized + Registrable> {
    entries: Vec<(String, Factory<T>)>,
}

/// Registry of matchmaking strategies
pub type StrategyRegistry = Registry<dyn MatchmakingStrategy>;

/// Registry of points calculators
pub type CalculatorRegistry = Registry<dyn PointsCalculator>;

impl<T: ?Sized + Registrable> Clone for Registry<T> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<T: ?Sized + Registrable> Default for Registry<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T: ?Sized + Registrable> Registry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `factory` under `name`.
    ///
    /// Fails with `InvalidRegistration` if the name is taken or the factory
    /// builds an entry reporting a different name.
    pub fn register<F>(&mut self, name: &str, factory: F) -> TournamentResult<()>
    where
        F: Fn() -> Box<T> + Send + Sync + 'static,
    {
        let invalid = |reason: &str| TournamentError::InvalidRegistration {
            name: name.to_string(),
            reason: reason.to_string(),
        };

        if name.trim().is_empty() {
            return Err(invalid("name is empty"));
        }
        if self.contains(name) {
            return Err(invalid("name already registered"));
        }
        let sample = factory();
        if sample.registered_name() != name {
            return Err(invalid(&format!(
                "factory builds '{}'",
                sample.registered_name()
            )));
        }

        log::debug!("Registered '{}'", name);
        self.entries.push((name.to_string(), Arc::new(factory)));
        Ok(())
    }

    /// Build the entry registered under `name`
    pub fn get(&self, name: &str) -> Option<Box<T>> {
        self.entries
            .iter()
            .find(|(entry, _)| entry == name)
            .map(|(_, factory)| factory())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(entry, _)| entry == name)
    }

    /// Names in registration order
    pub fn list_names(&self) -> Vec<String> {
        self.entries.iter().map(|(name, _)| name.clone()).collect()
    }

    /// Names of entries that accept `n`-player matches
    pub fn supporting(&self, n: usize) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, factory)| factory().supports_players(n))
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl StrategyRegistry {
    /// Build the strategy registered under `name`, or fail with `UnknownStrategy`
    pub fn resolve(&self, name: &str) -> TournamentResult<Box<dyn MatchmakingStrategy>> {
        self.get(name)
            .ok_or_else(|| TournamentError::UnknownStrategy(name.to_string()))
    }
}

impl CalculatorRegistry {
    /// Build the calculator registered under `name`, or fail with `UnknownCalculator`
    pub fn resolve(&self, name: &str) -> TournamentResult<Box<dyn PointsCalculator>> {
        self.get(name)
            .ok_or_else(|| TournamentError::UnknownCalculator(name.to_string()))
    }
}

/// Strategy and calculator registries populated at startup
#[derive(Clone, Default)]
pub struct Registries {
    pub strategies: StrategyRegistry,
    pub calculators: CalculatorRegistry,
}

impl Registries {
    /// Empty registries
    pub fn new() -> Self {
        Self::default()
    }

    /// Registries holding every built-in strategy and calculator
    pub fn with_builtins() -> Self {
        let mut registries = Self::new();
        registries.register_builtins();
        registries
    }

    fn register_builtins(&mut self) {
        let strategies: [(&str, fn() -> Box<dyn MatchmakingStrategy>); 4] = [
            (RoundRobinStrategy::NAME, || Box::new(RoundRobinStrategy)),
            (KnockoutStrategy::NAME, || Box::new(KnockoutStrategy)),
            (SwissStrategy::NAME, || Box::new(SwissStrategy)),
            (FreeForAllStrategy::NAME, || Box::new(FreeForAllStrategy)),
        ];
        for (name, factory) in strategies {
            if let Err(e) = self.strategies.register(name, factory) {
                log::warn!("Skipping built-in strategy: {}", e);
            }
        }

        let calculators: [(&str, fn() -> Box<dyn PointsCalculator>); 5] = [
            (StandardCalculator::NAME, || Box::new(StandardCalculator)),
            (ThreePointCalculator::NAME, || Box::new(ThreePointCalculator)),
            (RankingCalculator::NAME, || Box::new(RankingCalculator)),
            (PercentageCalculator::NAME, || Box::new(PercentageCalculator)),
            (CustomCalculator::NAME, || Box::new(CustomCalculator::weighted())),
        ];
        for (name, factory) in calculators {
            if let Err(e) = self.calculators.register(name, factory) {
                log::warn!("Skipping built-in calculator: {}", e);
            }
        }
    }

    /// Let `plugin` register its strategies and calculators.
    ///
    /// A failed install leaves the registries unchanged.
    pub fn install(&mut self, plugin: &dyn Plugin) -> TournamentResult<()> {
        let mut staged = self.clone();
        if let Err(e) = plugin.register(&mut staged) {
            log::warn!("Plugin '{}' rejected: {}", plugin.name(), e);
            return Err(e);
        }
        log::info!(
            "Installed plugin '{}' ({} strategies, {} calculators)",
            plugin.name(),
            staged.strategies.len() - self.strategies.len(),
            staged.calculators.len() - self.calculators.len()
        );
        *self = staged;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::{PairingContext, RoundProposal};

    struct Ladder;

    impl MatchmakingStrategy for Ladder {
        fn name(&self) -> &str {
            "ladder"
        }

        fn supports_players_per_match(&self, n: usize) -> bool {
            n == 2
        }

        fn create_matches(&self, _ctx: &PairingContext<'_>) -> TournamentResult<RoundProposal> {
            Ok(RoundProposal::default())
        }
    }

    #[test]
    fn test_builtins_in_registration_order() {
        let registries = Registries::with_builtins();
        assert_eq!(
            registries.strategies.list_names(),
            vec!["roundrobin", "knockout", "swiss", "freeforall"]
        );
        assert_eq!(
            registries.calculators.list_names(),
            vec!["standard", "three_point", "ranking", "percentage", "custom_weighted"]
        );
    }

    #[test]
    fn test_capability_filter() {
        let registries = Registries::with_builtins();
        assert_eq!(
            registries.strategies.supporting(2),
            vec!["roundrobin", "knockout", "swiss", "freeforall"]
        );
        assert_eq!(
            registries.strategies.supporting(4),
            vec!["roundrobin", "knockout", "freeforall"]
        );
        assert_eq!(registries.strategies.supporting(0), vec!["freeforall"]);
        assert!(!registries.calculators.supporting(5).contains(&"custom_weighted".to_string()));
    }

    #[test]
    fn test_rejects_duplicate_and_mismatched_names() {
        let mut registries = Registries::with_builtins();

        let err = registries
            .strategies
            .register("swiss", || Box::new(SwissStrategy))
            .unwrap_err();
        assert!(matches!(err, TournamentError::InvalidRegistration { .. }));

        let err = registries
            .strategies
            .register("elimination", || Box::new(Ladder))
            .unwrap_err();
        assert!(err.to_string().contains("factory builds 'ladder'"));

        registries.strategies.register("ladder", || Box::new(Ladder)).unwrap();
        assert_eq!(registries.strategies.len(), 5);
    }

    #[test]
    fn test_resolve_unknown_names() {
        let registries = Registries::with_builtins();
        assert!(matches!(
            registries.strategies.resolve("ladder"),
            Err(TournamentError::UnknownStrategy(name)) if name == "ladder"
        ));
        assert!(matches!(
            registries.calculators.resolve("elo"),
            Err(TournamentError::UnknownCalculator(_))
        ));
        assert_eq!(registries.calculators.resolve("ranking").unwrap().name(), "ranking");
    }
}
