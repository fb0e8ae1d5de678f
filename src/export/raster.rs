use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use crate::core::config::FusionConfig;
use crate::core::model::NormalizedBox;
use crate::core::normalize::to_pixels;
use crate::engine::renderer::RenderedPage;
use crate::export::{page_stem, Exporter};
use crate::pipeline::DocumentAnalysis;

const OUTLINE_THICKNESS: u32 = 2;

/// Outlines drawn onto rendered page images: `page_NNN_<engine>.png` per
/// engine and `page_NNN_composite.png` with every engine. Pages without a
/// rendered image, or whose image cannot be decoded, are skipped.
#[derive(Debug, Clone)]
pub struct RasterOverlayExporter {
    out_dir: PathBuf,
    config: FusionConfig,
    rendered: Vec<RenderedPage>,
}

impl RasterOverlayExporter {
    pub fn new(out_dir: PathBuf, config: FusionConfig, rendered: Vec<RenderedPage>) -> Self {
        Self {
            out_dir,
            config,
            rendered,
        }
    }
}

/// Draw `boxes` as hollow rectangles, `OUTLINE_THICKNESS` pixels wide, growing
/// inward so outlines never leave the image.
pub fn draw_boxes(canvas: &mut RgbaImage, boxes: &[NormalizedBox], color: [u8; 3]) {
    let (width, height) = canvas.dimensions();
    let color = Rgba([color[0], color[1], color[2], 255]);
    for item in boxes {
        let Some((x0, y0, x1, y1)) = to_pixels(&item.bbox, width, height) else {
            continue;
        };
        for t in 0..OUTLINE_THICKNESS {
            let (w, h) = ((x1 - x0).saturating_sub(2 * t), (y1 - y0).saturating_sub(2 * t));
            if w == 0 || h == 0 {
                break;
            }
            let rect = Rect::at((x0 + t) as i32, (y0 + t) as i32).of_size(w, h);
            draw_hollow_rect_mut(canvas, rect, color);
        }
    }
}

impl Exporter for RasterOverlayExporter {
    fn export(&self, analysis: &DocumentAnalysis) -> Result<()> {
        if self.rendered.is_empty() {
            tracing::debug!("no rendered pages, skipping raster overlays");
            return Ok(());
        }
        fs::create_dir_all(&self.out_dir)
            .with_context(|| format!("failed to create {}", self.out_dir.display()))?;

        for set in &analysis.blocks {
            let Some(rendered) = self.rendered.iter().find(|r| r.page == set.page) else {
                continue;
            };
            let base = match image::open(&rendered.path) {
                Ok(image) => image.to_rgba8(),
                Err(err) => {
                    tracing::warn!(
                        page = set.page,
                        path = %rendered.path.display(),
                        error = %err,
                        "unreadable page image, skipping overlays"
                    );
                    continue;
                }
            };
            let stem = page_stem(set.page);
            let mut composite = base.clone();

            for (engine, boxes) in &set.engines {
                let color = self.config.color_for(engine);
                let mut layer = base.clone();
                draw_boxes(&mut layer, boxes, color);
                draw_boxes(&mut composite, boxes, color);
                let path = self.out_dir.join(format!("{stem}_{}.png", file_safe(engine)));
                layer
                    .save(&path)
                    .with_context(|| format!("failed to save {}", path.display()))?;
            }

            let path = self.out_dir.join(format!("{stem}_composite.png"));
            composite
                .save(&path)
                .with_context(|| format!("failed to save {}", path.display()))?;
            tracing::debug!(page = set.page, engines = set.engines.len(), "wrote raster overlays");
        }
        Ok(())
    }
}

fn file_safe(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::BBox;
    use crate::core::normalize::{PageExtent, RawBox};
    use crate::engine::{EngineRegistry, StaticEngine};
    use crate::pipeline::analyze_document;

    #[test]
    fn outlines_use_engine_colour() {
        let mut canvas = RgbaImage::from_pixel(100, 100, Rgba([255, 255, 255, 255]));
        let item = NormalizedBox::new(0, BBox::new(0.1, 0.2, 0.5, 0.6), "pypdf2").unwrap();
        draw_boxes(&mut canvas, &[item], [0, 0, 255]);

        assert_eq!(canvas.get_pixel(10, 30), &Rgba([0, 0, 255, 255]));
        assert_eq!(canvas.get_pixel(11, 30), &Rgba([0, 0, 255, 255]));
        assert_eq!(canvas.get_pixel(30, 40), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn unreadable_page_image_does_not_stop_other_pages() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let broken = dir.path().join("page_001.png");
        fs::write(&broken, b"not a png")?;
        let valid = dir.path().join("page_002.png");
        RgbaImage::from_pixel(40, 40, Rgba([255, 255, 255, 255])).save(&valid)?;

        let line = RawBox::new(0.1, 0.1, 0.5, 0.2);
        let registry = EngineRegistry::new().with(
            StaticEngine::new("pymupdf", PageExtent::unit())
                .page(0, vec![line.clone()])
                .page(1, vec![line]),
        );
        let config = FusionConfig::default();
        let analysis = analyze_document(&registry, 2, &config);
        let rendered = vec![
            RenderedPage {
                page: 0,
                path: broken,
                width: 40,
                height: 40,
            },
            RenderedPage::from_image(1, valid)?,
        ];

        let out = dir.path().join("overlays");
        RasterOverlayExporter::new(out.clone(), config, rendered).export(&analysis)?;
        assert!(!out.join("page_001_composite.png").exists());
        assert!(out.join("page_002_composite.png").exists());
        assert!(out.join("page_002_pymupdf.png").exists());
        Ok(())
    }

    #[test]
    fn file_names_are_sanitized() {
        assert_eq!(file_safe("my engine/v2"), "my_engine_v2");
    }
}
