//! Activation strategies and the per-client registry they are resolved from.

use crate::Context;
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};

pub mod builtin;
pub mod rollout;

/// A named predicate deciding whether a feature is active for a request.
///
/// # Examples
///
/// ```rust
/// use std::collections::HashMap;
/// use unleash_client::{Context, Strategy};
///
/// struct ActiveForEmail {}
///
/// impl Strategy for ActiveForEmail {
///     fn name(&self) -> &str {
///         "ActiveForUserWithEmail"
///     }
///
///     fn is_enabled(&self, _: &str, parameters: &HashMap<String, String>, context: &Context) -> bool {
///         match (parameters.get("emails"), context.get_property("email")) {
///             (Some(emails), Some(email)) => emails.split(',').any(|e| e.trim() == email),
///             _ => false,
///         }
///     }
/// }
/// ```
pub trait Strategy: Sync + Send {
    /// The name features reference this strategy by.
    fn name(&self) -> &str;

    /// Evaluates the strategy for `feature` with the constraint's `parameters`.
    fn is_enabled(
        &self,
        feature: &str,
        parameters: &HashMap<String, String>,
        context: &Context,
    ) -> bool;
}

/// Holds the strategies a client can evaluate, keyed by name.
pub struct StrategyRegistry {
    strategies: HashMap<String, Box<dyn Strategy>>,
}

impl StrategyRegistry {
    /// Creates a registry without any strategy.
    pub fn empty() -> Self {
        Self {
            strategies: HashMap::new(),
        }
    }

    /// Creates a registry holding every built-in strategy.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(builtin::DefaultStrategy {}));
        registry.register(Box::new(builtin::UserWithIdStrategy {}));
        registry.register(Box::new(builtin::RemoteAddressStrategy {}));
        registry.register(Box::new(builtin::ApplicationHostnameStrategy::new()));
        registry.register(Box::new(rollout::GradualRolloutRandom {}));
        registry.register(Box::new(rollout::GradualRolloutSessionId {}));
        registry.register(Box::new(rollout::GradualRolloutUserId {}));
        registry
    }

    /// Adds `strategy`, replacing a previously registered one with the same name.
    pub fn register(&mut self, strategy: Box<dyn Strategy>) {
        self.strategies.insert(strategy.name().to_owned(), strategy);
    }

    /// Returns the strategy registered as `name`.
    pub fn get(&self, name: &str) -> Option<&dyn Strategy> {
        self.strategies.get(name).map(|s| s.as_ref())
    }

    /// Returns `true` if a strategy is registered as `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.strategies.contains_key(name)
    }

    /// Number of registered strategies.
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    /// Returns `true` if no strategy is registered.
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl Debug for StrategyRegistry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.strategies.keys().collect();
        names.sort();
        f.debug_struct("StrategyRegistry")
            .field("strategies", &names)
            .finish()
    }
}

/// Splits a comma separated strategy parameter into its trimmed, non-empty items.
pub(crate) fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|item| !item.is_empty())
}

#[cfg(test)]
mod registry_tests {
    use crate::strategy::{split_list, Strategy, StrategyRegistry};
    use crate::Context;
    use std::collections::HashMap;

    struct Never {}

    impl Strategy for Never {
        fn name(&self) -> &str {
            "default"
        }

        fn is_enabled(&self, _: &str, _: &HashMap<String, String>, _: &Context) -> bool {
            false
        }
    }

    #[test]
    fn builtins() {
        let registry = StrategyRegistry::with_builtins();
        assert_eq!(registry.len(), 7);
        for name in [
            "default",
            "userWithId",
            "remoteAddress",
            "applicationHostname",
            "gradualRolloutRandom",
            "gradualRolloutSessionId",
            "gradualRolloutUserId",
        ] {
            assert!(registry.contains(name), "{name} missing");
        }
        assert!(registry.get("unknown").is_none());
    }

    #[test]
    fn override_per_instance() {
        let mut overridden = StrategyRegistry::with_builtins();
        overridden.register(Box::new(Never {}));
        let untouched = StrategyRegistry::with_builtins();

        let params = HashMap::new();
        let ctx = Context::new();
        assert_eq!(overridden.len(), 7);
        assert!(!overridden.get("default").unwrap().is_enabled("f", &params, &ctx));
        assert!(untouched.get("default").unwrap().is_enabled("f", &params, &ctx));
    }

    #[test]
    fn split() {
        let items: Vec<&str> = split_list(" a, b ,,c ,").collect();
        assert_eq!(items, vec!["a", "b", "c"]);
        assert_eq!(split_list("").count(), 0);
    }
}
