use std::sync::Arc;

use clap::Parser;

use palmx_core::traits::Embedder;
use palmx_core::{Filters, SourceKind};
use palmx_embed::get_default_embedder;
use palmx_hybrid::RetrievalEngine;

/// Query the catalog the way the chat orchestrator does.
#[derive(Debug, Parser)]
#[command(name = "palmx-search", version, about)]
struct Args {
    query: String,

    /// Number of results (defaults to retrieval.default_k)
    #[arg(short, long)]
    k: Option<usize>,

    #[arg(long)]
    region: Option<String>,

    #[arg(long = "type")]
    project_type: Option<String>,

    #[arg(long)]
    status: Option<String>,

    /// Extra `key=value` filters; unknown keys are ignored
    #[arg(short = 'f', long = "filter", value_name = "KEY=VALUE")]
    filters: Vec<String>,

    /// Print the matching entries as JSON
    #[arg(long)]
    json: bool,
}

impl Args {
    fn filters(&self) -> Filters {
        let mut filters = Filters::from_pairs(self.filters.iter().filter_map(|kv| kv.split_once('=')));
        if let Some(v) = &self.region { filters = filters.region(v.as_str()); }
        if let Some(v) = &self.project_type { filters = filters.project_type(v.as_str()); }
        if let Some(v) = &self.status { filters = filters.status(v.as_str()); }
        filters
    }
}

fn source_label(source: SourceKind) -> &'static str {
    match source {
        SourceKind::Vector => "vector",
        SourceKind::Lexical => "lexical",
        SourceKind::Fallback => "fallback",
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    palmx_cli::init_tracing();
    let args = Args::parse();
    let (app, base) = palmx_cli::load_config()?;

    let embedder: Arc<dyn Embedder> = Arc::from(get_default_embedder(&app.embedding)?);
    let engine = RetrievalEngine::open(&app, &base, embedder)?;
    let k = args.k.unwrap_or(engine.config().default_k);
    let hits = engine.search_hits(&args.query, k, &args.filters()).await?;

    if args.json {
        let entries: Vec<_> = hits.iter().map(|h| h.entry.as_ref()).collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    println!("Query: {}  (k={}, index {})", args.query, k, if engine.is_index_ready() { "ready" } else { "not ready" });
    if hits.is_empty() {
        println!("No matching projects.");
    }
    for (i, hit) in hits.iter().enumerate() {
        let e = &hit.entry;
        println!("\n  {}. {} [{}]  {} score={:.3}", i + 1, e.name, e.id, source_label(hit.source), hit.score);
        let location: Vec<&str> = [&e.region, &e.area].into_iter().flatten().map(String::as_str).collect();
        if !location.is_empty() { println!("     location: {}", location.join(", ")); }
        if let Some(t) = &e.project_type { println!("     type:     {}", t); }
        if let Some(s) = &e.status { println!("     status:   {}", s); }
    }
    Ok(())
}
