use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedPage {
    pub page: usize,
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

impl RenderedPage {
    /// Describe an image that is already on disk, reading its real size.
    pub fn from_image(page: usize, path: PathBuf) -> Result<Self> {
        let (width, height) = image::image_dimensions(&path)
            .with_context(|| format!("failed to read image size of {}", path.display()))?;
        Ok(Self {
            page,
            path,
            width,
            height,
        })
    }
}

/// Rasterizes PDF pages with poppler's `pdftoppm`.
#[derive(Debug, Clone)]
pub struct PageRenderer {
    out_dir: PathBuf,
    dpi: u32,
}

impl PageRenderer {
    pub fn new(out_dir: PathBuf, dpi: u32) -> Self {
        Self { out_dir, dpi }
    }

    pub fn render_page(&self, pdf_path: &Path, page: usize) -> Result<RenderedPage> {
        fs::create_dir_all(&self.out_dir)
            .with_context(|| format!("failed to create {}", self.out_dir.display()))?;

        // pdftoppm counts pages from 1
        let page_number = page + 1;
        let prefix = self.out_dir.join(format!("page_{page_number:03}"));

        let status = Command::new("pdftoppm")
            .arg("-png")
            .arg("-singlefile")
            .arg("-r")
            .arg(self.dpi.to_string())
            .arg("-f")
            .arg(page_number.to_string())
            .arg("-l")
            .arg(page_number.to_string())
            .arg(pdf_path)
            .arg(&prefix)
            .status()
            .context("failed to invoke pdftoppm; is poppler-utils installed?")?;

        if !status.success() {
            anyhow::bail!("pdftoppm failed with status: {status}");
        }

        RenderedPage::from_image(page, prefix.with_extension("png"))
    }

    /// Render pages `0..page_count`. Pages the renderer cannot produce are
    /// skipped with a warning, so an unavailable renderer yields nothing.
    pub fn render_all(&self, pdf_path: &Path, page_count: usize) -> Vec<RenderedPage> {
        (0..page_count)
            .filter_map(|page| match self.render_page(pdf_path, page) {
                Ok(rendered) => Some(rendered),
                Err(err) => {
                    tracing::warn!(page, error = %format!("{err:#}"), "page render failed");
                    None
                }
            })
            .collect()
    }
}
