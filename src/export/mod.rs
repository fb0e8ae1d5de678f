pub mod html_debug_export;
pub mod json_export;
pub mod raster;
pub mod summary;

use anyhow::Result;

use crate::pipeline::DocumentAnalysis;

pub use html_debug_export::HtmlOverlayExporter;
pub use json_export::JsonExporter;
pub use raster::RasterOverlayExporter;
pub use summary::CsvSummaryExporter;

pub trait Exporter {
    fn export(&self, analysis: &DocumentAnalysis) -> Result<()>;
}

/// File stem shared by every per-page artifact; pages are numbered from 1.
pub(crate) fn page_stem(page: usize) -> String {
    format!("page_{:03}", page + 1)
}
