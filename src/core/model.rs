use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::core::geometry::BBox;

/// A text region reported by one engine, in page-relative coordinates.
///
/// Only built through [`NormalizedBox::new`] or the normalizer, both of which
/// refuse degenerate rectangles, so every stored box has positive area.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NormalizedBox {
    pub page: usize,
    #[serde(flatten)]
    pub bbox: BBox,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    #[serde(default)]
    pub source: String,
}

impl NormalizedBox {
    pub fn new(page: usize, bbox: BBox, source: impl Into<String>) -> Option<Self> {
        if bbox.is_degenerate() {
            return None;
        }
        Some(Self {
            page,
            bbox,
            text: None,
            confidence: None,
            source: source.into(),
        })
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        self.text = if text.is_empty() { None } else { Some(text) };
        self
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn text_content(&self) -> &str {
        self.text.as_deref().unwrap_or_default()
    }
}

/// All engines' boxes for one page. Engines keep their insertion order, which
/// is the order the union builder visits them in.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EngineBlockSet {
    pub page: usize,
    pub engines: IndexMap<String, Vec<NormalizedBox>>,
}

impl EngineBlockSet {
    pub fn new(page: usize) -> Self {
        Self {
            page,
            engines: IndexMap::new(),
        }
    }

    pub fn insert(&mut self, engine: impl Into<String>, boxes: Vec<NormalizedBox>) {
        self.engines.insert(engine.into(), boxes);
    }

    pub fn get(&self, engine: &str) -> Option<&[NormalizedBox]> {
        self.engines.get(engine).map(Vec::as_slice)
    }

    pub fn engine_names(&self) -> impl Iterator<Item = &str> {
        self.engines.keys().map(String::as_str)
    }

    pub fn total_boxes(&self) -> usize {
        self.engines.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.engines.values().all(Vec::is_empty)
    }

    /// Flattened boxes in engine order, optionally restricted to `only`.
    /// An empty filter keeps every engine.
    pub fn flatten(&self, only: &[String]) -> Vec<NormalizedBox> {
        self.engines
            .iter()
            .filter(|(name, _)| only.is_empty() || only.iter().any(|o| o == *name))
            .flat_map(|(_, boxes)| boxes.iter().cloned())
            .collect()
    }
}

/// Canonical representative of one or more near-duplicate boxes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UnionRegion {
    #[serde(flatten)]
    pub bbox: BBox,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl From<&NormalizedBox> for UnionRegion {
    fn from(value: &NormalizedBox) -> Self {
        Self {
            bbox: value.bbox,
            text: value.text.clone(),
        }
    }
}

/// A word supplied by the text-extraction collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WordToken {
    pub text: String,
    #[serde(flatten)]
    pub bbox: BBox,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word: Option<u32>,
}

impl WordToken {
    pub fn new(text: impl Into<String>, bbox: BBox) -> Self {
        Self {
            text: text.into(),
            bbox,
            line: None,
            word: None,
        }
    }

    pub fn at(mut self, line: u32, word: u32) -> Self {
        self.line = Some(line);
        self.word = Some(word);
        self
    }
}

/// Boxes joined into one region under an adjacency rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MergeGroup {
    pub id: usize,
    pub bbox: BBox,
    pub members: Vec<usize>,
}
