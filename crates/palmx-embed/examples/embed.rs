use palmx_core::config::Config;
use palmx_embed::get_default_embedder;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?.app()?;
    let embedder = get_default_embedder(&config.embedding)?;
    for text in ["villa with sea view in the north coast", "office space west cairo"] {
        let v = embedder.embed(text).await?;
        println!("{} dim={} first={:?}", embedder.embedder_id(), v.len(), &v[..4.min(v.len())]);
    }
    Ok(())
}
