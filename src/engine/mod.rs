//! Box producers. Every extraction tool is reached through [`Engine`] and
//! collected per page by [`EngineRegistry`].

pub mod adapters;
pub mod command;
pub mod renderer;
pub mod words;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::core::model::{EngineBlockSet, NormalizedBox};

pub use adapters::{JsonDumpEngine, StaticEngine};
pub use command::CommandEngine;

pub trait Engine: Send + Sync {
    fn name(&self) -> &str;

    /// Normalized boxes for `page` (0-based). An engine with nothing on the
    /// page returns an empty vector rather than an error.
    fn produce(&self, page: usize) -> Result<Vec<NormalizedBox>>;
}

/// An engine that failed on one page. The page is still scored without it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineFailure {
    pub engine: String,
    pub page: usize,
    pub message: String,
}

#[derive(Default)]
pub struct EngineRegistry {
    engines: Vec<Box<dyn Engine>>,
}

impl EngineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, engine: Box<dyn Engine>) {
        self.engines.push(engine);
    }

    pub fn with(mut self, engine: impl Engine + 'static) -> Self {
        self.register(Box::new(engine));
        self
    }

    pub fn names(&self) -> Vec<String> {
        self.engines.iter().map(|e| e.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.engines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }

    /// Run every engine on `page` in registration order. Failed engines are
    /// reported separately and left out of the block set.
    pub fn collect_page(&self, page: usize) -> (EngineBlockSet, Vec<EngineFailure>) {
        let mut set = EngineBlockSet::new(page);
        let mut failures = Vec::new();
        for engine in &self.engines {
            match engine.produce(page) {
                Ok(boxes) => set.insert(engine.name(), boxes),
                Err(err) => {
                    tracing::warn!(engine = engine.name(), page, error = %err, "engine failed");
                    failures.push(EngineFailure {
                        engine: engine.name().to_string(),
                        page,
                        message: format!("{err:#}"),
                    });
                }
            }
        }
        (set, failures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::normalize::{PageExtent, RawBox};
    use pretty_assertions::assert_eq;

    struct Broken;

    impl Engine for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn produce(&self, page: usize) -> Result<Vec<NormalizedBox>> {
            anyhow::bail!("no output for page {page}")
        }
    }

    #[test]
    fn failing_engine_does_not_stop_the_others() {
        let registry = EngineRegistry::new()
            .with(StaticEngine::new("pymupdf", PageExtent::unit()).page(0, vec![RawBox::new(0.1, 0.1, 0.4, 0.2)]))
            .with(Broken)
            .with(StaticEngine::new("pypdf2", PageExtent::unit()).page(0, vec![RawBox::new(0.1, 0.1, 0.4, 0.2)]));

        let (set, failures) = registry.collect_page(0);
        assert_eq!(set.engine_names().collect::<Vec<_>>(), vec!["pymupdf", "pypdf2"]);
        assert_eq!(
            failures,
            vec![EngineFailure {
                engine: "broken".to_string(),
                page: 0,
                message: "no output for page 0".to_string(),
            }]
        );
    }

    #[test]
    fn names_follow_registration_order() {
        let registry = EngineRegistry::new()
            .with(StaticEngine::new("tesseract", PageExtent::unit()))
            .with(StaticEngine::new("markitdown", PageExtent::unit()));
        assert_eq!(registry.names(), vec!["tesseract", "markitdown"]);
        assert_eq!(registry.len(), 2);
    }
}
