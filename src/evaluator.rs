//! Toggle evaluation.
use std::{
    panic::{catch_unwind, AssertUnwindSafe},
    sync::Arc,
};

use crate::{StrategyRegistry, ToggleCache};

/// Resolves toggles through the [`ToggleCache`] and strategies through the [`StrategyRegistry`].
///
/// Evaluation only touches in-memory state: it never blocks on network or disk I/O, and it never
/// fails. Anything unexpected (including a panicking custom strategy) degrades to the caller's
/// default.
#[derive(Clone)]
pub struct Evaluator {
    cache: Arc<ToggleCache>,
    strategies: Arc<StrategyRegistry>,
}

impl Evaluator {
    pub fn new(cache: Arc<ToggleCache>, strategies: Arc<StrategyRegistry>) -> Evaluator {
        Evaluator { cache, strategies }
    }

    /// Returns `true` if toggle `name` is on. Unknown toggles are off.
    pub fn is_enabled(&self, name: &str) -> bool {
        self.is_enabled_or(name, false)
    }

    /// Returns `true` if toggle `name` is on. Unknown toggles evaluate to `default_value`.
    pub fn is_enabled_or(&self, name: &str, default_value: bool) -> bool {
        match catch_unwind(AssertUnwindSafe(|| self.evaluate(name))) {
            Ok(Some(value)) => value,
            Ok(None) => default_value,
            Err(_) => {
                log::warn!(target: "unleash", toggle = name; "panic while evaluating toggle, returning default");
                default_value
            }
        }
    }

    /// Returns `None` if the toggle is not known.
    fn evaluate(&self, name: &str) -> Option<bool> {
        let toggle = self.cache.get(name)?;

        let strategy = self.strategies.resolve(&toggle.strategy_name);
        let enabled = toggle.enabled && strategy.is_enabled(&toggle.parameters);

        log::trace!(target: "unleash",
                    toggle = name,
                    strategy = strategy.name(),
                    enabled;
                    "evaluated a toggle");

        Some(enabled)
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc, Mutex,
        },
    };

    use super::Evaluator;
    use crate::{
        FnStrategy, Parameters, Strategy, StrategyRegistry, Toggle, ToggleCache, ToggleSnapshot,
    };

    fn evaluator(
        toggles: impl IntoIterator<Item = Toggle>,
        strategies: Vec<Arc<dyn Strategy>>,
    ) -> Evaluator {
        Evaluator::new(
            Arc::new(ToggleCache::new(ToggleSnapshot::new(toggles))),
            Arc::new(StrategyRegistry::new(strategies).unwrap()),
        )
    }

    #[test]
    fn enabled_toggle_with_default_strategy() {
        let evaluator = evaluator([Toggle::new("t", true, "default")], vec![]);

        assert!(evaluator.is_enabled("t"));
    }

    #[test]
    fn disabled_toggle_with_default_strategy() {
        let evaluator = evaluator([Toggle::new("t", false, "default")], vec![]);

        assert!(!evaluator.is_enabled("t"));
        assert!(!evaluator.is_enabled_or("t", true));
    }

    #[test]
    fn unknown_strategy_is_off() {
        let evaluator = evaluator([Toggle::new("t", true, "no-such-strategy")], vec![]);

        assert!(!evaluator.is_enabled("t"));
        assert!(!evaluator.is_enabled_or("t", true));
    }

    #[test]
    fn toggle_naming_unknown_is_off() {
        let evaluator = evaluator([Toggle::new("t", true, "unknown")], vec![]);

        assert!(!evaluator.is_enabled("t"));
    }

    #[test]
    fn absent_toggle_returns_default() {
        let evaluator = evaluator([], vec![]);

        assert!(evaluator.is_enabled_or("t", true));
        assert!(!evaluator.is_enabled_or("t", false));
        assert!(!evaluator.is_enabled("t"));
    }

    #[test]
    fn custom_strategy_is_called_once_with_parameters() {
        let calls = Arc::new(Mutex::new(Vec::<Parameters>::new()));
        let strategy = {
            let calls = calls.clone();
            FnStrategy::new("custom", move |parameters: &Parameters| {
                calls.lock().unwrap().push(parameters.clone());
                false
            })
        };

        let parameters = HashMap::from([("userIds".to_owned(), "1,2,3".to_owned())]);
        let evaluator = evaluator(
            [Toggle::new("t", true, "custom").with_parameters(parameters.clone())],
            vec![Arc::new(strategy)],
        );

        assert!(!evaluator.is_enabled("t"));
        assert_eq!(*calls.lock().unwrap(), vec![parameters]);
    }

    #[test]
    fn strategy_is_not_consulted_for_disabled_toggle() {
        let calls = Arc::new(AtomicUsize::new(0));
        let strategy = {
            let calls = calls.clone();
            FnStrategy::new("custom", move |_: &Parameters| {
                calls.fetch_add(1, Ordering::SeqCst);
                true
            })
        };

        let evaluator = evaluator([Toggle::new("t", false, "custom")], vec![Arc::new(strategy)]);

        assert!(!evaluator.is_enabled("t"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn panicking_strategy_returns_default() {
        let strategy = FnStrategy::new("explosive", |_: &Parameters| -> bool {
            panic!("strategy failure")
        });

        let evaluator = evaluator([Toggle::new("t", true, "explosive")], vec![Arc::new(strategy)]);

        assert!(evaluator.is_enabled_or("t", true));
        assert!(!evaluator.is_enabled_or("t", false));
    }

    #[test]
    fn sees_replaced_snapshot() {
        let cache = Arc::new(ToggleCache::default());
        let evaluator = Evaluator::new(cache.clone(), Arc::new(StrategyRegistry::default()));

        assert!(!evaluator.is_enabled("t"));

        cache.replace(Arc::new(ToggleSnapshot::new([Toggle::new(
            "t", true, "default",
        )])));

        assert!(evaluator.is_enabled("t"));
    }
}
