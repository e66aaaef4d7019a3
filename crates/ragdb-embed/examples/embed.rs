use ragdb_core::config::EmbedderConfig;
use ragdb_embed::build_embedder;

fn main() -> anyhow::Result<()> {
    let embedder = build_embedder(&EmbedderConfig::default())?;
    let texts = vec!["hello world".to_string(), "rust embeddings".to_string()];
    let embs = embedder.embed_batch(&texts)?;
    println!("{} B={} dim={:?}", embedder.embedder_id(), embs.len(), embedder.dim());
    Ok(())
}
