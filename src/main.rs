use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use boxfusion::consolidate::{ConsolidationService, GroupingStrategy};
use boxfusion::core::config::{FusionConfig, MatchMode};
use boxfusion::core::normalize::PageExtent;
use boxfusion::engine::renderer::PageRenderer;
use boxfusion::engine::words::{JsonWords, StaticWords, WordSource};
use boxfusion::engine::{Engine, EngineRegistry, JsonDumpEngine};
use boxfusion::export::json_export::write_json;
use boxfusion::jobs::{JobStatus, JobTracker};
use boxfusion::merge::{merge_page, MergeMode};
use boxfusion::pipeline::{analyze_document, export_document};
use boxfusion::store::AnnotationStore;

#[derive(Parser, Debug)]
#[command(name = "boxfusion")]
#[command(version, about = "Cross-engine block consensus, coverage scoring and box merging", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct ThresholdArgs {
    /// Configuration file (.toml or .json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// IoU at or above which two boxes are the same region in the union
    #[arg(long)]
    dedup_iou: Option<f32>,

    /// IoU at or above which an engine box covers a union region
    #[arg(long)]
    match_iou: Option<f32>,

    /// Matching between engine boxes and the union: greedy or optimal
    #[arg(long)]
    match_mode: Option<MatchMode>,
}

impl ThresholdArgs {
    fn resolve(&self) -> Result<FusionConfig> {
        let mut config = match &self.config {
            Some(path) => FusionConfig::load(path)
                .with_context(|| format!("Failed to load config: {}", path.display()))?,
            None => FusionConfig::default(),
        };
        if let Some(value) = self.dedup_iou {
            config.dedup_iou = value;
        }
        if let Some(value) = self.match_iou {
            config.match_iou = value;
        }
        if let Some(mode) = self.match_mode {
            config.match_mode = mode;
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build the union, score coverage and write overlays for a document
    Analyze {
        /// Engine box dumps as NAME=PATH, in engine order
        #[arg(short, long = "engine", value_parser = parse_named_path, required = true)]
        engines: Vec<(String, PathBuf)>,

        /// Output directory
        #[arg(short, long, default_value = "visual")]
        output: PathBuf,

        /// Number of pages (default: highest page found in any dump)
        #[arg(long)]
        pages: Option<usize>,

        /// PDF to render with pdftoppm for raster overlays
        #[arg(long)]
        pdf: Option<PathBuf>,

        #[command(flatten)]
        thresholds: ThresholdArgs,
    },

    /// Merge one page's boxes into groups
    Merge {
        /// Engine box dumps as NAME=PATH
        #[arg(short, long = "engine", value_parser = parse_named_path, required = true)]
        engines: Vec<(String, PathBuf)>,

        /// Page index (0-based)
        #[arg(long, default_value_t = 0)]
        page: usize,

        /// vertical, horizontal or paragraph (auto)
        #[arg(short, long, default_value = "vertical")]
        mode: MergeMode,

        /// Only merge these engines' boxes
        #[arg(long = "only")]
        only: Vec<String>,

        /// Output JSON file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        thresholds: ThresholdArgs,
    },

    /// Classify one tool's boxes on a page and persist the result
    Consolidate {
        /// Document identifier
        #[arg(long)]
        document: String,

        /// Tool name and its box dump as NAME=PATH
        #[arg(long, value_parser = parse_named_path)]
        tool: (String, PathBuf),

        /// Page index (0-based)
        #[arg(long, default_value_t = 0)]
        page: usize,

        /// overlap, vertical_centers or paragraph
        #[arg(short, long, default_value = "overlap")]
        strategy: GroupingStrategy,

        /// Word tokens as {page: [{x0,y0,x1,y1,text}]} JSON
        #[arg(long)]
        words: Option<PathBuf>,

        /// Annotation store directory
        #[arg(long, default_value = "annotations")]
        store: PathBuf,

        #[command(flatten)]
        thresholds: ThresholdArgs,
    },
}

fn parse_named_path(value: &str) -> Result<(String, PathBuf), String> {
    match value.split_once('=') {
        Some((name, path)) if !name.is_empty() && !path.is_empty() => {
            Ok((name.to_string(), PathBuf::from(path)))
        }
        _ => Err(format!("expected NAME=PATH, got {value:?}")),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            engines,
            output,
            pages,
            pdf,
            thresholds,
        } => run_analyze(engines, output, pages, pdf, thresholds.resolve()?),
        Commands::Merge {
            engines,
            page,
            mode,
            only,
            output,
            thresholds,
        } => run_merge(&engines, page, mode, &only, output.as_deref(), &thresholds.resolve()?),
        Commands::Consolidate {
            document,
            tool,
            page,
            strategy,
            words,
            store,
            thresholds,
        } => run_consolidate(
            &document,
            &tool,
            page,
            strategy,
            words.as_deref(),
            store,
            thresholds.resolve()?,
        ),
    }
}

fn load_dumps(engines: &[(String, PathBuf)]) -> Result<Vec<JsonDumpEngine>> {
    engines
        .iter()
        .map(|(name, path)| {
            JsonDumpEngine::load(name.clone(), path, PageExtent::unit())
                .with_context(|| format!("Failed to load engine {name}"))
        })
        .collect()
}

fn run_analyze(
    engines: Vec<(String, PathBuf)>,
    output: PathBuf,
    pages: Option<usize>,
    pdf: Option<PathBuf>,
    config: FusionConfig,
) -> Result<()> {
    let dumps = load_dumps(&engines)?;
    let page_count = pages.unwrap_or_else(|| dumps.iter().map(JsonDumpEngine::page_count).max().unwrap_or(0));
    let mut registry = EngineRegistry::new();
    for dump in dumps {
        registry.register(Box::new(dump));
    }

    let tracker = JobTracker::new();
    let out_dir = output.clone();
    let (id, handle) = tracker.spawn("analyze", move || {
        let rendered = match &pdf {
            Some(pdf) => PageRenderer::new(out_dir.join("pages"), config.dpi).render_all(pdf, page_count),
            None => Vec::new(),
        };
        let analysis = analyze_document(&registry, page_count, &config);
        for failure in &analysis.failures {
            eprintln!("  [!] {} failed on page {}: {}", failure.engine, failure.page + 1, failure.message);
        }
        for (engine, ratio) in &analysis.coverage.per_document {
            println!("  {engine:<16} {:.3}", ratio);
        }
        export_document(&analysis, &config, &out_dir, &rendered)
            .with_context(|| format!("Failed to export to: {}", out_dir.display()))
    });
    println!("[*] Analyzing {page_count} page(s) from {} engine(s)", engines.len());
    handle
        .join()
        .map_err(|_| anyhow::anyhow!("analysis thread panicked"))?;

    match tracker.status(id) {
        Some(JobStatus::Done) => {
            println!("[✓] Done! Results saved to: {}", output.display());
            Ok(())
        }
        Some(JobStatus::Failed(message)) => anyhow::bail!("Analysis failed: {message}"),
        other => anyhow::bail!("Analysis ended in unexpected state: {other:?}"),
    }
}

fn run_merge(
    engines: &[(String, PathBuf)],
    page: usize,
    mode: MergeMode,
    only: &[String],
    output: Option<&Path>,
    config: &FusionConfig,
) -> Result<()> {
    let mut registry = EngineRegistry::new();
    for dump in load_dumps(engines)? {
        registry.register(Box::new(dump));
    }
    let (set, failures) = registry.collect_page(page);
    if let Some(failure) = failures.first() {
        anyhow::bail!("{} failed on page {}: {}", failure.engine, page, failure.message);
    }
    let result = merge_page(&set, only, mode, config);
    match output {
        Some(path) => write_json(path, &result)?,
        None => println!("{}", serde_json::to_string_pretty(&result)?),
    }
    Ok(())
}

fn run_consolidate(
    document: &str,
    tool: &(String, PathBuf),
    page: usize,
    strategy: GroupingStrategy,
    words: Option<&Path>,
    store: PathBuf,
    config: FusionConfig,
) -> Result<()> {
    let (name, path) = tool;
    let engine = JsonDumpEngine::load(name.clone(), path, PageExtent::unit())
        .with_context(|| format!("Failed to load tool {name}"))?;
    let boxes = engine.produce(page)?;

    let source: Box<dyn WordSource> = match words {
        Some(path) => match JsonWords::load(path, PageExtent::unit()) {
            Ok(words) => Box::new(words),
            Err(err) => {
                eprintln!("  [!] Words unavailable ({err:#}), consolidating without text");
                Box::new(StaticWords::default())
            }
        },
        None => Box::new(StaticWords::default()),
    };

    let service = ConsolidationService::new(AnnotationStore::new(store), config);
    let annotation = service.consolidate_from(document, name, page, strategy, &boxes, source.as_ref())?;
    println!("{}", serde_json::to_string_pretty(&annotation)?);
    Ok(())
}
