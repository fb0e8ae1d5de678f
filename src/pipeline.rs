use std::path::Path;

use anyhow::Result;
use rayon::prelude::*;
use serde::Serialize;

use crate::core::config::FusionConfig;
use crate::core::model::EngineBlockSet;
use crate::engine::renderer::RenderedPage;
use crate::engine::{EngineFailure, EngineRegistry};
use crate::export::{
    CsvSummaryExporter, Exporter, HtmlOverlayExporter, JsonExporter, RasterOverlayExporter,
};
use crate::fusion::compare::{self, TextSimilarity};
use crate::fusion::coverage::{self, CoverageReport};
use crate::fusion::{FusionEngine, PageConsensus, SimpleFusionEngine};

/// Consensus, coverage and cross-engine statistics for a whole document.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentAnalysis {
    pub engines: Vec<String>,
    pub pages: Vec<PageConsensus>,
    pub coverage: CoverageReport,
    pub similarity: Vec<TextSimilarity>,
    pub failures: Vec<EngineFailure>,
    #[serde(skip)]
    pub blocks: Vec<EngineBlockSet>,
}

/// Run every engine on pages `0..page_count` and score them against each
/// other. Pages are processed in parallel; results stay in page order. An
/// engine failing on a page is recorded and the page is scored without it.
pub fn analyze_document(
    registry: &EngineRegistry,
    page_count: usize,
    config: &FusionConfig,
) -> DocumentAnalysis {
    let fusion = SimpleFusionEngine::new(config.clone());
    let engines = registry.names();

    let per_page: Vec<(EngineBlockSet, PageConsensus, Vec<EngineFailure>)> = (0..page_count)
        .into_par_iter()
        .map(|page| {
            let (set, failures) = registry.collect_page(page);
            let consensus = fusion.fuse(&set);
            (set, consensus, failures)
        })
        .collect();

    let mut blocks = Vec::with_capacity(page_count);
    let mut pages = Vec::with_capacity(page_count);
    let mut failures = Vec::new();
    for (set, consensus, page_failures) in per_page {
        blocks.push(set);
        pages.push(consensus);
        failures.extend(page_failures);
    }

    let per_page_coverage = pages.iter().map(|p| p.coverage.clone()).collect();
    let coverage = coverage::build_report(per_page_coverage, &engines);
    let similarity = compare::pairwise_similarity(&compare::document_texts(&blocks));

    tracing::info!(
        pages = page_count,
        engines = engines.len(),
        failures = failures.len(),
        "analyzed document"
    );

    DocumentAnalysis {
        engines,
        pages,
        coverage,
        similarity,
        failures,
        blocks,
    }
}

/// Write every artifact for `analysis` under `output`: JSON metrics, CSV
/// summaries, vector overlays and, for pages in `rendered`, raster overlays.
pub fn export_document(
    analysis: &DocumentAnalysis,
    config: &FusionConfig,
    output: &Path,
    rendered: &[RenderedPage],
) -> Result<()> {
    let exporters: Vec<Box<dyn Exporter>> = vec![
        Box::new(JsonExporter::new(output.to_path_buf())),
        Box::new(CsvSummaryExporter::new(output.join("summary"))),
        Box::new(HtmlOverlayExporter::new(
            output.join("overlays"),
            config.clone(),
            rendered.to_vec(),
        )),
        Box::new(RasterOverlayExporter::new(
            output.join("overlays"),
            config.clone(),
            rendered.to_vec(),
        )),
    ];
    for exporter in &exporters {
        exporter.export(analysis)?;
    }
    Ok(())
}
