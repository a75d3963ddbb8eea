use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Args;
use dom_adapter::InMemoryDocument;
use element_scanner::{
    metrics, DocumentAdapterPort, ElementScanner, HopKind, PriorityMode, ScanOptions,
    ScannedElement,
};
use serde::Serialize;
use tokio::fs;
use tracing::info;

use crate::cli::context::CliContext;
use crate::cli::output::OutputFormat;

#[derive(Args, Clone, Debug)]
pub struct ScanArgs {
    /// Document snapshot (JSON) to scan
    #[arg(value_name = "SNAPSHOT")]
    pub snapshot: PathBuf,

    /// Maximum number of elements to return
    #[arg(long)]
    pub max_elements: Option<usize>,

    /// Collection depth: speed, balanced or completeness
    #[arg(long)]
    pub mode: Option<PriorityMode>,

    /// Keep elements that fail the visibility check
    #[arg(long)]
    pub include_invisible: bool,

    /// Descend into open shadow roots
    #[arg(long)]
    pub shadow_dom: bool,

    /// Descend into same-origin frame documents
    #[arg(long)]
    pub iframes: bool,

    /// Keep candidates nested inside other candidates
    #[arg(long)]
    pub keep_nested: bool,

    /// Wait up to this many milliseconds for interactive content
    #[arg(long, value_name = "MS")]
    pub wait_ms: Option<u64>,

    /// Viewport to judge visibility against, e.g. 1280x800 (defaults to the snapshot's)
    #[arg(long, value_name = "WIDTHxHEIGHT")]
    pub viewport: Option<ViewportSize>,

    /// Run the scan this many times against the same scanner
    #[arg(long, default_value_t = 1)]
    pub repeat: usize,

    /// Print the scan counters after the results
    #[arg(long)]
    pub metrics: bool,
}

impl ScanArgs {
    fn options(&self, defaults: &ScanOptions) -> ScanOptions {
        let mut options = defaults.clone();
        if let Some(max) = self.max_elements {
            options.max_elements = max;
        }
        if let Some(mode) = self.mode {
            options.priority_mode = mode;
        }
        options.include_invisible |= self.include_invisible;
        options.include_shadow_dom |= self.shadow_dom;
        options.include_iframes |= self.iframes;
        if self.keep_nested {
            options.collapse_nested = false;
        }
        if self.wait_ms.is_some() {
            options.wait_for_content_ms = self.wait_ms;
        }
        options
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewportSize {
    pub width: f64,
    pub height: f64,
}

impl FromStr for ViewportSize {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (width, height) = value
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("expected WIDTHxHEIGHT, got `{value}`"))?;
        let parse = |part: &str| -> Result<f64, String> {
            match part.trim().parse::<f64>() {
                Ok(size) if size.is_finite() && size > 0.0 => Ok(size),
                _ => Err(format!("invalid viewport dimension `{part}`")),
            }
        };
        Ok(Self {
            width: parse(width)?,
            height: parse(height)?,
        })
    }
}

#[derive(Serialize)]
struct ScanReport<'a> {
    elements: &'a [ScannedElement],
    #[serde(skip_serializing_if = "Option::is_none")]
    metrics: Option<metrics::MetricSnapshot>,
}

pub async fn cmd_scan(args: ScanArgs, ctx: &CliContext) -> Result<()> {
    let raw = fs::read_to_string(&args.snapshot)
        .await
        .with_context(|| format!("Failed to read snapshot {}", args.snapshot.display()))?;
    let document = InMemoryDocument::from_json(&raw)
        .with_context(|| format!("Failed to parse snapshot {}", args.snapshot.display()))?;
    if let Some(size) = args.viewport {
        let mut viewport = document.viewport();
        viewport.width = size.width;
        viewport.height = size.height;
        document.set_viewport(viewport);
    }

    let port = Arc::new(DocumentAdapterPort::new(Arc::new(document)));
    let scanner = ElementScanner::with_policy(port, ctx.config().scanner.clone())
        .context("Failed to build scanner")?;
    let options = args.options(&ctx.config().scan);

    let mut elements = Vec::new();
    for round in 0..args.repeat.max(1) {
        let started = Instant::now();
        elements = scanner.scan(&options).await;
        info!(
            round,
            elements = elements.len(),
            cache = ?scanner.cache_state(),
            elapsed = %humantime::format_duration(started.elapsed()),
            "scan finished"
        );
    }
    scanner.shutdown().await;

    let metrics = args.metrics.then(metrics::snapshot);
    match ctx.output() {
        OutputFormat::Json => {
            if let Some(metrics) = metrics {
                let report = ScanReport {
                    elements: &elements,
                    metrics: Some(metrics),
                };
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", serde_json::to_string_pretty(&elements)?);
            }
        }
        OutputFormat::Human => {
            print_elements(&elements);
            if let Some(metrics) = metrics {
                println!();
                println!(
                    "scans: {} (avg {:.2} ms), cache hits: {}, misses: {}",
                    metrics.scan.total,
                    metrics.scan.avg_ms,
                    metrics.scan_cache.hits,
                    metrics.scan_cache.misses
                );
                println!(
                    "returned: {}, skipped: {}, invalidations: {}",
                    metrics.elements_returned, metrics.elements_skipped, metrics.invalidations
                );
            }
        }
    }
    Ok(())
}

fn print_elements(elements: &[ScannedElement]) {
    if elements.is_empty() {
        println!("No interactive elements found");
        return;
    }
    println!("{} interactive element(s)", elements.len());
    for element in elements {
        let visibility = if element.visible { "visible" } else { "hidden" };
        println!(
            "{:>4}  {:<10} {:<8} {:<12} {}",
            element.priority,
            element.role,
            visibility,
            element.selector_source.as_str(),
            qualified_selector(element)
        );
        if !element.text.is_empty() {
            println!("      {:?}", element.text);
        }
    }
}

/// Selector prefixed with the hosts it lives behind, e.g. `#app >>> button`.
fn qualified_selector(element: &ScannedElement) -> String {
    let mut out = String::new();
    for hop in &element.scope {
        let marker = match hop.kind {
            HopKind::Shadow => ">>>",
            HopKind::Frame => "|>",
        };
        out.push_str(&format!("{} {} ", hop.host, marker));
    }
    out.push_str(&element.selector);
    out
}
