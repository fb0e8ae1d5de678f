//! Word tokens per page, as supplied by a text-extraction collaborator.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::core::model::WordToken;
use crate::core::normalize::{normalize_word, PageExtent, RawBox};

pub trait WordSource: Send + Sync {
    fn words(&self, page: usize) -> Result<Vec<WordToken>>;
}

/// Words for `page`, or none at all when the source is unavailable.
pub fn words_or_empty(source: &dyn WordSource, page: usize) -> Vec<WordToken> {
    match source.words(page) {
        Ok(words) => words,
        Err(err) => {
            tracing::warn!(page, error = %err, "word source unavailable, using no words");
            Vec::new()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StaticWords {
    pages: BTreeMap<usize, Vec<WordToken>>,
}

impl StaticWords {
    pub fn page(mut self, page: usize, words: Vec<WordToken>) -> Self {
        self.pages.insert(page, words);
        self
    }
}

impl WordSource for StaticWords {
    fn words(&self, page: usize) -> Result<Vec<WordToken>> {
        Ok(self.pages.get(&page).cloned().unwrap_or_default())
    }
}

/// Words read from a `{page: [{x0, y0, x1, y1, text}]}` JSON file, in the
/// coordinate space given by `extent`. Array order is the reading order.
#[derive(Debug, Clone)]
pub struct JsonWords {
    pages: BTreeMap<usize, Vec<WordToken>>,
}

impl JsonWords {
    pub fn from_json(json: &str, extent: PageExtent) -> Result<Self> {
        let raw: BTreeMap<String, Vec<RawBox>> =
            serde_json::from_str(json).context("failed to parse word JSON")?;
        let mut pages = BTreeMap::new();
        for (key, raws) in raw {
            let page: usize = key
                .trim()
                .parse()
                .with_context(|| format!("invalid page key {key:?} in word JSON"))?;
            let words = raws
                .iter()
                .enumerate()
                .filter_map(|(idx, raw)| {
                    normalize_word(raw, extent).map(|w| w.at(0, idx as u32))
                })
                .collect();
            pages.insert(page, words);
        }
        Ok(Self { pages })
    }

    pub fn load(path: &Path, extent: PageExtent) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("failed to read words from {}", path.display()))?;
        Self::from_json(&json, extent)
    }
}

impl WordSource for JsonWords {
    fn words(&self, page: usize) -> Result<Vec<WordToken>> {
        Ok(self.pages.get(&page).cloned().unwrap_or_default())
    }
}
