use std::fs;

use anyhow::Result;
use pretty_assertions::assert_eq;

use boxfusion::consolidate::{ConsolidationService, GroupingStrategy, LayoutKind};
use boxfusion::core::config::{FusionConfig, MatchMode};
use boxfusion::core::geometry::BBox;
use boxfusion::core::normalize::{PageExtent, RawBox};
use boxfusion::engine::words::JsonWords;
use boxfusion::engine::{Engine, EngineRegistry, JsonDumpEngine, StaticEngine};
use boxfusion::fusion::{FusionEngine, SimpleFusionEngine};
use boxfusion::merge::{merge_page, MergeMode};
use boxfusion::pipeline::{analyze_document, export_document};
use boxfusion::store::AnnotationStore;

const PYMUPDF_DUMP: &str = r#"{"blocks_per_page": {
    "0": [
        {"x0": 0.1, "y0": 0.10, "x1": 0.5, "y1": 0.15, "text": "Quarterly report"},
        {"x0": 0.1, "y0": 0.16, "x1": 0.5, "y1": 0.20, "text": "Revenue grew 12%"}
    ],
    "1": [
        {"x0": 0.1, "y0": 0.1, "x1": 0.9, "y1": 0.3, "text": "Appendix"}
    ]
}}"#;

const TESSERACT_DUMP: &str = r#"{
    "0": [
        {"x0": 0.1, "y0": 0.10, "x1": 0.5, "y1": 0.15, "text": "Quarterly report"}
    ]
}"#;

/// Two engine dumps on disk, analyzed and exported end to end.
#[test]
fn test_document_analysis_from_dumps() -> Result<()> {
    let dir = tempfile::tempdir()?;
    fs::write(dir.path().join("pymupdf.json"), PYMUPDF_DUMP)?;
    fs::write(dir.path().join("tesseract.json"), TESSERACT_DUMP)?;

    let pymupdf = JsonDumpEngine::load("pymupdf", &dir.path().join("pymupdf.json"), PageExtent::unit())?;
    let tesseract =
        JsonDumpEngine::load("tesseract", &dir.path().join("tesseract.json"), PageExtent::unit())?;
    let page_count = pymupdf.page_count().max(tesseract.page_count());
    let registry = EngineRegistry::new().with(pymupdf).with(tesseract);

    let config = FusionConfig::default();
    let analysis = analyze_document(&registry, page_count, &config);

    assert_eq!(analysis.engines, vec!["pymupdf", "tesseract"]);
    assert_eq!(analysis.pages.len(), 2);
    assert_eq!(analysis.pages[0].union.len(), 2);
    assert_eq!(analysis.pages[1].union.len(), 1);
    assert!(analysis.failures.is_empty());

    // pymupdf found every region; tesseract found 1 of 3 across the document
    let doc = &analysis.coverage.per_document;
    assert_eq!(doc["pymupdf"], 1.0);
    assert!((doc["tesseract"] - 1.0 / 3.0).abs() < 1e-6);

    let out = dir.path().join("visual");
    export_document(&analysis, &config, &out, &[])?;
    let metrics: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join("visual_metrics.json"))?)?;
    assert_eq!(metrics["coverage"]["per_page"][1]["union"], 1);
    assert!(out.join("overlays/page_002.html").exists());
    assert!(out.join("summary/text_similarity.csv").exists());
    // no rendered pages, no raster overlays
    assert!(!out.join("overlays/page_001_composite.png").exists());
    Ok(())
}

/// An engine identical to another adds nothing to the union and scores 1.0.
#[test]
fn test_duplicate_engine_collapses_into_union() {
    let boxes = vec![
        RawBox::new(0.1, 0.1, 0.4, 0.2),
        RawBox::new(0.5, 0.1, 0.9, 0.2),
        RawBox::new(0.1, 0.5, 0.9, 0.7),
    ];
    let a = StaticEngine::new("a", PageExtent::unit()).page(0, boxes.clone());
    let b = StaticEngine::new("b", PageExtent::unit()).page(0, boxes);
    let (set, failures) = EngineRegistry::new().with(a).with(b).collect_page(0);
    assert!(failures.is_empty());

    let fused = SimpleFusionEngine::default().fuse(&set);
    assert_eq!(fused.union.len(), 3);
    assert_eq!(fused.coverage.engines["a"], 1.0);
    assert_eq!(fused.coverage.engines["b"], 1.0);
    assert_eq!(fused.box_counts["b"], 3);
}

/// Optimal assignment never scores below greedy.
#[test]
fn test_optimal_matching_dominates_greedy() {
    // The candidate's first box ties on both reference regions; greedy takes
    // the first one and leaves the second box without a partner.
    let reference = StaticEngine::new("reference", PageExtent::unit()).page(
        0,
        vec![RawBox::new(0.0, 0.0, 0.75, 0.125), RawBox::new(0.25, 0.0, 1.0, 0.125)],
    );
    let candidate = StaticEngine::new("candidate", PageExtent::unit()).page(
        0,
        vec![RawBox::new(0.125, 0.0, 0.875, 0.125), RawBox::new(0.0, 0.0, 0.625, 0.125)],
    );
    let registry = EngineRegistry::new().with(reference).with(candidate);
    let greedy_config = FusionConfig {
        dedup_iou: 0.7,
        ..FusionConfig::default()
    };
    let optimal_config = FusionConfig {
        match_mode: MatchMode::Optimal,
        ..greedy_config.clone()
    };

    let greedy = analyze_document(&registry, 1, &greedy_config);
    let optimal = analyze_document(&registry, 1, &optimal_config);
    assert_eq!(greedy.pages[0].union.len(), 2);

    let g = greedy.coverage.per_document["candidate"];
    let o = optimal.coverage.per_document["candidate"];
    assert_eq!(g, 0.5);
    assert_eq!(o, 1.0);
}

/// Two stacked lines merge vertically; a separate column stays alone.
#[test]
fn test_vertical_merge_of_engine_output() -> Result<()> {
    let engine = JsonDumpEngine::from_json(
        "pdfplumber",
        r#"{"0": [
            {"x0": 0.1, "y0": 0.10, "x1": 0.5, "y1": 0.15},
            {"x0": 0.1, "y0": 0.16, "x1": 0.5, "y1": 0.20},
            {"x0": 0.6, "y0": 0.10, "x1": 0.9, "y1": 0.20}
        ]}"#,
        PageExtent::unit(),
    )?;
    let (set, _) = EngineRegistry::new().with(engine).collect_page(0);
    let result = merge_page(&set, &[], MergeMode::Vertical, &FusionConfig::default());

    assert_eq!(result.groups.len(), 2);
    assert_eq!(result.groups[0].bbox, BBox::new(0.1, 0.10, 0.5, 0.20));
    assert_eq!(result.groups[0].members, vec![0, 1]);
    Ok(())
}

/// Consolidating the same page twice stores the same record.
#[test]
fn test_consolidation_is_persisted_idempotently() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let engine = StaticEngine::new("pdfplumber", PageExtent::new(1000.0, 1000.0)).page(
        0,
        vec![
            RawBox::new(50.0, 50.0, 600.0, 300.0),
            RawBox::new(80.0, 80.0, 400.0, 150.0),
            RawBox::new(81.0, 160.0, 400.0, 200.0),
        ],
    );
    let boxes = engine.produce(0)?;
    let words = JsonWords::from_json(
        r#"{"0": [
            {"x0": 100, "y0": 100, "x1": 180, "y1": 120, "text": "Net"},
            {"x0": 200, "y0": 100, "x1": 280, "y1": 120, "text": "income"},
            {"x0": 100, "y0": 170, "x1": 180, "y1": 190, "text": "rose"}
        ]}"#,
        PageExtent::new(1000.0, 1000.0),
    )?;

    let service = ConsolidationService::new(
        AnnotationStore::new(dir.path().join("store")),
        FusionConfig::default(),
    );
    let first = service.consolidate_from("q3.pdf", "pdfplumber", 0, GroupingStrategy::Overlap, &boxes, &words)?;
    let second = service.consolidate_from("q3.pdf", "pdfplumber", 0, GroupingStrategy::Overlap, &boxes, &words)?;
    assert_eq!(first, second);

    let outer = &first.result.boxes[0];
    assert_eq!(outer.text, "Net income rose");
    assert!(outer.unique_extra && !outer.redundant);
    assert_eq!(first.result.merged_groups.len(), 1);
    assert_eq!(first.result.layout_groups[0].layout, LayoutKind::Paragraph);

    // a fresh store over the same directory sees the stored record
    let reopened = AnnotationStore::new(dir.path().join("store"));
    assert_eq!(reopened.get(&first.key()), Some(first));
    Ok(())
}
