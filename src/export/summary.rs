use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::export::Exporter;
use crate::pipeline::DocumentAnalysis;

/// Tabular summaries: `box_counts.csv`, `overlap_stats.csv`,
/// `text_similarity.csv` and `coverage.csv`.
#[derive(Debug, Clone)]
pub struct CsvSummaryExporter {
    out_dir: PathBuf,
}

impl CsvSummaryExporter {
    pub fn new(out_dir: PathBuf) -> Self {
        Self { out_dir }
    }
}

#[derive(Serialize)]
struct BoxCountRow<'a> {
    page: usize,
    engine: &'a str,
    boxes: usize,
}

#[derive(Serialize)]
struct CoverageRow<'a> {
    page: String,
    engine: &'a str,
    union: usize,
    coverage: f32,
}

fn write_rows<T: Serialize>(path: &Path, rows: impl IntoIterator<Item = T>) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

impl Exporter for CsvSummaryExporter {
    fn export(&self, analysis: &DocumentAnalysis) -> Result<()> {
        fs::create_dir_all(&self.out_dir)
            .with_context(|| format!("failed to create {}", self.out_dir.display()))?;

        let counts = analysis.pages.iter().flat_map(|page| {
            page.box_counts.iter().map(move |(engine, boxes)| BoxCountRow {
                page: page.page,
                engine,
                boxes: *boxes,
            })
        });
        write_rows(&self.out_dir.join("box_counts.csv"), counts)?;

        let overlaps = analysis.pages.iter().flat_map(|page| page.overlaps.iter());
        write_rows(&self.out_dir.join("overlap_stats.csv"), overlaps)?;

        write_rows(&self.out_dir.join("text_similarity.csv"), &analysis.similarity)?;

        let union_total: usize = analysis.coverage.per_page.iter().map(|p| p.union).sum();
        let per_page = analysis.coverage.per_page.iter().flat_map(|page| {
            page.engines.iter().map(move |(engine, ratio)| CoverageRow {
                page: page.page.to_string(),
                engine,
                union: page.union,
                coverage: *ratio,
            })
        });
        let per_document = analysis
            .coverage
            .per_document
            .iter()
            .map(|(engine, ratio)| CoverageRow {
                page: "document".to_string(),
                engine,
                union: union_total,
                coverage: *ratio,
            });
        write_rows(&self.out_dir.join("coverage.csv"), per_page.chain(per_document))?;

        tracing::debug!(dir = %self.out_dir.display(), "wrote csv summaries");
        Ok(())
    }
}
