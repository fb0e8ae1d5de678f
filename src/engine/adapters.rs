use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::core::model::NormalizedBox;
use crate::core::normalize::{normalize_page, PageExtent, RawBox};

use super::Engine;

/// Raw boxes held in memory, keyed by page.
#[derive(Debug, Clone)]
pub struct StaticEngine {
    name: String,
    extent: PageExtent,
    pages: BTreeMap<usize, Vec<RawBox>>,
}

impl StaticEngine {
    pub fn new(name: impl Into<String>, extent: PageExtent) -> Self {
        Self {
            name: name.into(),
            extent,
            pages: BTreeMap::new(),
        }
    }

    pub fn page(mut self, page: usize, boxes: Vec<RawBox>) -> Self {
        self.pages.insert(page, boxes);
        self
    }
}

impl Engine for StaticEngine {
    fn name(&self) -> &str {
        &self.name
    }

    fn produce(&self, page: usize) -> Result<Vec<NormalizedBox>> {
        Ok(self
            .pages
            .get(&page)
            .map(|raws| normalize_page(raws, self.extent, page, &self.name))
            .unwrap_or_default())
    }
}

/// Boxes from an engine's JSON dump, either `{"blocks_per_page": {page: [...]}}`
/// or the bare `{page: [...]}` map. Page keys are 0-based.
#[derive(Debug, Clone)]
pub struct JsonDumpEngine {
    inner: StaticEngine,
}

impl JsonDumpEngine {
    pub fn from_json(name: impl Into<String>, json: &str, extent: PageExtent) -> Result<Self> {
        let name = name.into();
        let mut dump: serde_json::Map<String, serde_json::Value> = serde_json::from_str(json)
            .with_context(|| format!("failed to parse box dump for {name}"))?;
        let by_page = match dump.remove("blocks_per_page") {
            Some(inner) => inner,
            None => serde_json::Value::Object(dump),
        };
        let by_page: BTreeMap<String, Vec<RawBox>> = serde_json::from_value(by_page)
            .with_context(|| format!("unexpected box dump layout for {name}"))?;
        let mut pages = BTreeMap::new();
        for (key, boxes) in by_page {
            let page: usize = key
                .trim()
                .parse()
                .with_context(|| format!("invalid page key {key:?} in box dump for {name}"))?;
            pages.insert(page, boxes);
        }
        Ok(Self {
            inner: StaticEngine {
                name,
                extent,
                pages,
            },
        })
    }

    pub fn load(name: impl Into<String>, path: &Path, extent: PageExtent) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("failed to read box dump {}", path.display()))?;
        Self::from_json(name, &json, extent)
    }

    pub fn page_count(&self) -> usize {
        self.inner
            .pages
            .keys()
            .next_back()
            .map(|last| last + 1)
            .unwrap_or(0)
    }
}

impl Engine for JsonDumpEngine {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn produce(&self, page: usize) -> Result<Vec<NormalizedBox>> {
        self.inner.produce(page)
    }
}
