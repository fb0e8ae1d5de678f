use std::collections::HashSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use strsim::normalized_levenshtein;

use crate::core::model::EngineBlockSet;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextSimilarity {
    pub engine_a: String,
    pub engine_b: String,
    pub ratio: f32,
}

/// Blend of character-level edit similarity and word-set overlap, with a
/// penalty when the two texts carry different digits.
pub fn text_similarity(a: &str, b: &str) -> f32 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let base = normalized_levenshtein(a, b) as f32;
    let token_overlap = token_overlap(a, b);
    let mut score = (base + token_overlap) / 2.0;

    if numeric_mismatch(a, b) {
        score -= 0.1;
    }

    score.clamp(0.0, 1.0)
}

/// Whole-document text for each engine: box texts in page then box order.
pub fn document_texts(pages: &[EngineBlockSet]) -> IndexMap<String, String> {
    let mut texts: IndexMap<String, Vec<&str>> = IndexMap::new();
    for page in pages {
        for (engine, boxes) in &page.engines {
            let parts = texts.entry(engine.clone()).or_default();
            parts.extend(boxes.iter().filter_map(|b| b.text.as_deref()));
        }
    }
    texts
        .into_iter()
        .map(|(engine, parts)| (engine, parts.join(" ")))
        .collect()
}

/// Similarity for every unordered engine pair, in engine order.
pub fn pairwise_similarity(texts: &IndexMap<String, String>) -> Vec<TextSimilarity> {
    let entries: Vec<(&String, &String)> = texts.iter().collect();
    let mut out = Vec::new();
    for (i, (engine_a, text_a)) in entries.iter().enumerate() {
        for (engine_b, text_b) in entries.iter().skip(i + 1) {
            out.push(TextSimilarity {
                engine_a: engine_a.to_string(),
                engine_b: engine_b.to_string(),
                ratio: text_similarity(text_a, text_b),
            });
        }
    }
    out
}

fn words(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn token_overlap(a: &str, b: &str) -> f32 {
    let a_tokens = words(a);
    let b_tokens = words(b);
    if a_tokens.is_empty() || b_tokens.is_empty() {
        return 0.0;
    }
    let intersection = a_tokens.intersection(&b_tokens).count() as f32;
    let union = a_tokens.union(&b_tokens).count() as f32;
    intersection / union
}

fn numeric_mismatch(a: &str, b: &str) -> bool {
    let digits_a: String = a.chars().filter(|c| c.is_ascii_digit()).collect();
    let digits_b: String = b.chars().filter(|c| c.is_ascii_digit()).collect();
    !digits_a.is_empty() && !digits_b.is_empty() && digits_a != digits_b
}
