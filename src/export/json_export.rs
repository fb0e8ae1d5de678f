use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::core::model::UnionRegion;
use crate::export::Exporter;
use crate::pipeline::DocumentAnalysis;

/// Writes `visual_metrics.json` (coverage, overlaps, similarity, failures)
/// and `union_boxes.json` (the union per page).
#[derive(Debug, Clone)]
pub struct JsonExporter {
    out_dir: PathBuf,
}

impl JsonExporter {
    pub fn new(out_dir: PathBuf) -> Self {
        Self { out_dir }
    }
}

#[derive(Serialize)]
struct PageUnion<'a> {
    page: usize,
    boxes: &'a [UnionRegion],
}

impl Exporter for JsonExporter {
    fn export(&self, analysis: &DocumentAnalysis) -> Result<()> {
        fs::create_dir_all(&self.out_dir)
            .with_context(|| format!("failed to create {}", self.out_dir.display()))?;
        write_json(&self.out_dir.join("visual_metrics.json"), analysis)?;

        let unions: Vec<PageUnion<'_>> = analysis
            .pages
            .iter()
            .map(|p| PageUnion {
                page: p.page,
                boxes: &p.union,
            })
            .collect();
        write_json(&self.out_dir.join("union_boxes.json"), &unions)?;
        Ok(())
    }
}

/// Pretty-print `value` to `path`, creating parent directories.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let data = serde_json::to_string_pretty(value)?;
    fs::write(path, data).with_context(|| format!("failed to write {}", path.display()))?;
    tracing::debug!(path = %path.display(), "wrote json");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::FusionConfig;
    use crate::core::normalize::{PageExtent, RawBox};
    use crate::engine::{EngineRegistry, StaticEngine};
    use crate::pipeline::analyze_document;
    use pretty_assertions::assert_eq;

    #[test]
    fn writes_metrics_and_union_payloads() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let registry = EngineRegistry::new()
            .with(StaticEngine::new("pymupdf", PageExtent::unit()).page(0, vec![RawBox::new(0.1, 0.1, 0.5, 0.2).with_text("Title")]));
        let analysis = analyze_document(&registry, 1, &FusionConfig::default());
        JsonExporter::new(dir.path().to_path_buf()).export(&analysis)?;

        let metrics: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join("visual_metrics.json"))?)?;
        assert_eq!(metrics["coverage"]["per_document"]["pymupdf"], 1.0);
        assert_eq!(metrics["coverage"]["per_page"][0]["union"], 1);

        let unions: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join("union_boxes.json"))?)?;
        assert_eq!(unions[0]["boxes"][0]["text"], "Title");
        assert_eq!(unions[0]["boxes"][0]["x1"].as_f64().map(|v| (v * 10.0).round()), Some(5.0));
        Ok(())
    }
}
