use std::collections::BTreeMap;

use crate::error::FactorNotFound;

use super::factors::{Factor, HomeField, OffDefTotal, QbAdjust};

/// Builds a fresh factor instance.
pub type FactorFactory = fn() -> Box<dyn Factor>;

/// Name → factory lookup for pipeline factors.
///
/// Built once at startup via [`FactorRegistry::with_builtin`] and then only
/// read. Registering a name that already exists replaces the previous
/// factory (last writer wins); the replaced factory is returned so callers
/// that care can detect it.
#[derive(Clone, Default)]
pub struct FactorRegistry {
    factories: BTreeMap<String, FactorFactory>,
}

impl FactorRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every factor shipped with the crate.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register("home_field", || -> Box<dyn Factor> { Box::new(HomeField) });
        registry.register("qb_adjust", || -> Box<dyn Factor> { Box::new(QbAdjust) });
        registry.register("off_def_total", || -> Box<dyn Factor> { Box::new(OffDefTotal) });
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, factory: FactorFactory) -> Option<FactorFactory> {
        self.factories.insert(name.into(), factory)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }

    /// Instantiate the factor registered under `name`.
    pub fn resolve(&self, name: &str) -> Result<Box<dyn Factor>, FactorNotFound> {
        match self.factories.get(name) {
            Some(factory) => Ok(factory()),
            None => Err(FactorNotFound {
                name: name.to_string(),
                registered: self.names(),
            }),
        }
    }
}

impl std::fmt::Debug for FactorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FactorRegistry")
            .field("factors", &self.names())
            .finish()
    }
}
