use std::path::PathBuf;

use clap::Parser;
use tracing::error;

use palmx_core::card::ProjectCardRenderer;
use palmx_core::config::resolve_with_base;
use palmx_core::traits::Embedder;
use palmx_core::CatalogStore;
use palmx_embed::get_default_embedder;
use palmx_vector::IndexBuilder;

/// Embed every catalog entry and publish a fresh index.
#[derive(Debug, Parser)]
#[command(name = "palmx-indexer", version, about)]
struct Args {
    /// Catalog file or directory (defaults to data.catalog_path)
    #[arg(long, value_name = "PATH")]
    catalog: Option<PathBuf>,

    /// Index root (defaults to data.index_dir)
    #[arg(long, value_name = "DIR")]
    index_dir: Option<PathBuf>,

    /// Concurrent embedding calls (defaults to embedding.build_concurrency)
    #[arg(short = 'j', long)]
    concurrency: Option<usize>,

    /// Embed and validate only; nothing is written
    #[arg(long)]
    dry_run: bool,

    #[arg(long)]
    no_progress: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    palmx_cli::init_tracing();
    let args = Args::parse();
    let (app, base) = palmx_cli::load_config()?;

    let catalog_path = args.catalog.unwrap_or_else(|| resolve_with_base(&base, &app.data.catalog_path));
    let index_dir = args.index_dir.unwrap_or_else(|| resolve_with_base(&base, &app.data.index_dir));
    let concurrency = args.concurrency.unwrap_or(app.embedding.build_concurrency);

    println!("palmx indexer\n=============");
    println!("Catalog:   {}", catalog_path.display());
    println!("Index dir: {}", index_dir.display());

    let catalog = CatalogStore::load(&catalog_path)?;
    let embedder = get_default_embedder(&app.embedding)?;
    println!("Embedder:  {} (dim {})", embedder.embedder_id(), embedder.dim());

    let renderer = ProjectCardRenderer;
    let builder = IndexBuilder::new(embedder.as_ref(), &renderer).concurrency(concurrency).show_progress(!args.no_progress);

    if args.dry_run {
        let built = builder.build(&catalog).await.inspect_err(|e| error!("build failed: {}", e))?;
        println!("\nDry run: embedded {} entries (dim {}); nothing written", built.vectors.len(), built.dimension);
        return Ok(());
    }

    let manifest = builder.build_and_publish(&catalog, &index_dir).await.inspect_err(|e| error!("build failed: {}", e))?;
    println!("\nPublished build {}", manifest.build_id);
    println!("  entries:  {}", manifest.count);
    println!("  dim:      {}", manifest.dimension);
    println!("  checksum: {}", manifest.vectors_blake3);
    Ok(())
}
