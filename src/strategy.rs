//! Activation strategies and the registry that resolves them by name.
use std::{collections::HashMap, fmt, sync::Arc};

use crate::{Error, Parameters, Result};

/// Name of the built-in strategy that is always on.
pub const DEFAULT_STRATEGY: &str = "default";
/// Name of the built-in fallback strategy that is always off. It is never stored in the registry.
pub const UNKNOWN_STRATEGY: &str = "unknown";

/// A named predicate over toggle parameters that decides fine-grained enablement (e.g.,
/// percentage rollout or a user allow-list).
///
/// Strategies are shared between all threads evaluating toggles, so they must be `Send + Sync`.
pub trait Strategy: Send + Sync {
    /// Name that toggle definitions use to refer to this strategy.
    fn name(&self) -> &str;

    /// Return `true` if a toggle using this strategy should be on for the given parameters.
    fn is_enabled(&self, parameters: &Parameters) -> bool;
}

/// Built-in strategy that enables toggles unconditionally.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultStrategy;

impl Strategy for DefaultStrategy {
    fn name(&self) -> &str {
        DEFAULT_STRATEGY
    }

    fn is_enabled(&self, _parameters: &Parameters) -> bool {
        true
    }
}

/// Built-in fallback for strategies the registry does not know about. Always off.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnknownStrategy;

impl Strategy for UnknownStrategy {
    fn name(&self) -> &str {
        UNKNOWN_STRATEGY
    }

    fn is_enabled(&self, _parameters: &Parameters) -> bool {
        false
    }
}

/// A strategy backed by a closure.
///
/// ```
/// # use unleash::{FnStrategy, Parameters};
/// let strategy = FnStrategy::new("gradualRollout", |parameters: &Parameters| {
///     parameters.get("percentage").map(String::as_str) == Some("100")
/// });
/// ```
pub struct FnStrategy<F> {
    name: String,
    f: F,
}

impl<F: Fn(&Parameters) -> bool + Send + Sync> FnStrategy<F> {
    pub fn new(name: impl Into<String>, f: F) -> FnStrategy<F> {
        FnStrategy {
            name: name.into(),
            f,
        }
    }
}

impl<F: Fn(&Parameters) -> bool + Send + Sync> Strategy for FnStrategy<F> {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_enabled(&self, parameters: &Parameters) -> bool {
        (self.f)(parameters)
    }
}

impl<F> fmt::Debug for FnStrategy<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnStrategy")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Immutable mapping from strategy names to strategies.
///
/// Built-ins are inserted first, then custom strategies in order; a later strategy replaces an
/// earlier one with the same name. Lookups that miss resolve to [`UnknownStrategy`].
pub struct StrategyRegistry {
    strategies: HashMap<String, Arc<dyn Strategy>>,
    unknown: Arc<dyn Strategy>,
}

impl StrategyRegistry {
    /// Build a registry from built-ins plus `custom` strategies.
    ///
    /// # Errors
    ///
    /// - [`Error::ReservedStrategyName`] if a custom strategy is named `"unknown"`.
    pub fn new(custom: impl IntoIterator<Item = Arc<dyn Strategy>>) -> Result<StrategyRegistry> {
        let mut strategies = builtins();

        for strategy in custom {
            let name = strategy.name().to_owned();
            if name == UNKNOWN_STRATEGY {
                return Err(Error::ReservedStrategyName(name));
            }
            if name == DEFAULT_STRATEGY {
                log::warn!(target: "unleash", "custom strategy overrides the built-in {:?} strategy", DEFAULT_STRATEGY);
            }
            if strategies.insert(name.clone(), strategy).is_some() {
                log::debug!(target: "unleash", strategy = name.as_str(); "strategy registered more than once, last one wins");
            }
        }

        Ok(StrategyRegistry {
            strategies,
            unknown: Arc::new(UnknownStrategy),
        })
    }

    /// Resolve a strategy by name, falling back to [`UnknownStrategy`].
    pub fn resolve(&self, name: &str) -> &dyn Strategy {
        match self.strategies.get(name) {
            Some(strategy) => &**strategy,
            None => &*self.unknown,
        }
    }

    /// Returns `true` if a strategy with this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.strategies.contains_key(name)
    }
}

/// Strategies every registry starts with.
fn builtins() -> HashMap<String, Arc<dyn Strategy>> {
    HashMap::from([(
        DEFAULT_STRATEGY.to_owned(),
        Arc::new(DefaultStrategy) as Arc<dyn Strategy>,
    )])
}

impl Default for StrategyRegistry {
    fn default() -> StrategyRegistry {
        StrategyRegistry {
            strategies: builtins(),
            unknown: Arc::new(UnknownStrategy),
        }
    }
}

impl fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.strategies.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("StrategyRegistry")
            .field("strategies", &names)
            .finish()
    }
}
