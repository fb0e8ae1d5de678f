use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::core::config::FusionConfig;
use crate::core::model::{EngineBlockSet, UnionRegion};
use crate::engine::renderer::RenderedPage;
use crate::export::{page_stem, Exporter};
use crate::pipeline::DocumentAnalysis;

// Canvas used when a page has no rendered image (A4 at 120 dpi).
const FALLBACK_WIDTH: u32 = 992;
const FALLBACK_HEIGHT: u32 = 1403;

/// One HTML page per document page with an SVG overlay: an outline per
/// engine box in the engine's colour, a numbered marker at each box's
/// top-left corner, and the union drawn dashed on top.
#[derive(Debug, Clone)]
pub struct HtmlOverlayExporter {
    out_dir: PathBuf,
    config: FusionConfig,
    rendered: Vec<RenderedPage>,
}

impl HtmlOverlayExporter {
    pub fn new(out_dir: PathBuf, config: FusionConfig, rendered: Vec<RenderedPage>) -> Self {
        Self {
            out_dir,
            config,
            rendered,
        }
    }

    fn engine_layer(&self, engine: &str, set: &EngineBlockSet, width: f32, height: f32) -> String {
        let [r, g, b] = self.config.color_for(engine);
        let mut svg = format!(
            "<g class='engine' data-engine='{}' stroke='rgb({r},{g},{b})' fill='none'>\n",
            html_escape::encode_single_quoted_attribute(engine)
        );
        for (idx, item) in set.get(engine).unwrap_or_default().iter().enumerate() {
            let bbox = item.bbox;
            let x = bbox.x0 * width;
            let y = bbox.y0 * height;
            let _ = writeln!(
                svg,
                "<rect x='{x:.1}' y='{y:.1}' width='{w:.1}' height='{h:.1}' stroke-width='2'><title>{title}</title></rect>",
                w = bbox.width() * width,
                h = bbox.height() * height,
                title = html_escape::encode_text(item.text_content()),
            );
            let _ = writeln!(
                svg,
                "<circle cx='{x:.1}' cy='{y:.1}' r='9' fill='rgb({r},{g},{b})' stroke='none'/><text x='{x:.1}' y='{ty:.1}' text-anchor='middle' font-size='10' fill='#000' stroke='none'>{n}</text>",
                ty = y + 3.5,
                n = idx + 1,
            );
        }
        svg.push_str("</g>\n");
        svg
    }

    fn union_layer(union: &[UnionRegion], width: f32, height: f32) -> String {
        let mut svg = String::from(
            "<g class='union' stroke='#000' stroke-dasharray='4 3' fill='none'>\n",
        );
        for region in union {
            let _ = writeln!(
                svg,
                "<rect x='{:.1}' y='{:.1}' width='{:.1}' height='{:.1}' stroke-width='1'/>",
                region.bbox.x0 * width,
                region.bbox.y0 * height,
                region.bbox.width() * width,
                region.bbox.height() * height,
            );
        }
        svg.push_str("</g>\n");
        svg
    }

    fn legend(&self, engines: &[String]) -> String {
        let mut html = String::new();
        for engine in engines {
            let [r, g, b] = self.config.color_for(engine);
            let _ = writeln!(
                html,
                "<div class='legend-item'><span class='legend-box' style='border-color: rgb({r},{g},{b});'></span>{}</div>",
                html_escape::encode_text(engine)
            );
        }
        html
    }
}

impl Exporter for HtmlOverlayExporter {
    fn export(&self, analysis: &DocumentAnalysis) -> Result<()> {
        fs::create_dir_all(&self.out_dir)
            .with_context(|| format!("failed to create {}", self.out_dir.display()))?;
        for (set, consensus) in analysis.blocks.iter().zip(&analysis.pages) {
            let rendered = self.rendered.iter().find(|r| r.page == set.page);
            let (width, height) = rendered
                .map(|r| (r.width, r.height))
                .unwrap_or((FALLBACK_WIDTH, FALLBACK_HEIGHT));
            let (w, h) = (width as f32, height as f32);

            let background = rendered
                .map(|r| {
                    format!(
                        "<image href='{}' x='0' y='0' width='{width}' height='{height}'/>\n",
                        html_escape::encode_single_quoted_attribute(&r.path.to_string_lossy())
                    )
                })
                .unwrap_or_default();
            let mut layers = String::new();
            for engine in set.engine_names() {
                layers.push_str(&self.engine_layer(engine, set, w, h));
            }
            layers.push_str(&Self::union_layer(&consensus.union, w, h));

            let html = format!(
                r#"<!DOCTYPE html>
<html>
<head>
<meta charset='utf-8'>
<title>Overlay page {page}</title>
<style>
body {{ margin: 0; font-family: Arial, sans-serif; }}
svg {{ display: block; background: #fff; }}
#legend {{ position: fixed; right: 10px; top: 10px; background: #fff; padding: 10px; border: 1px solid #ddd; font-size: 12px; }}
.legend-item {{ margin: 5px 0; }}
.legend-box {{ display: inline-block; width: 20px; height: 15px; border: 2px solid; vertical-align: middle; margin-right: 5px; }}
</style>
</head>
<body>
<div id='legend'>
{legend}<div class='legend-item'><span class='legend-box' style='border: 2px dashed #000;'></span>union ({union})</div>
</div>
<svg xmlns='http://www.w3.org/2000/svg' width='{width}' height='{height}' viewBox='0 0 {width} {height}'>
{background}{layers}</svg>
</body>
</html>"#,
                page = set.page + 1,
                legend = self.legend(&analysis.engines),
                union = consensus.union.len(),
            );
            let path = self.out_dir.join(format!("{}.html", page_stem(set.page)));
            fs::write(&path, html).with_context(|| format!("failed to write {}", path.display()))?;
        }
        Ok(())
    }
}
