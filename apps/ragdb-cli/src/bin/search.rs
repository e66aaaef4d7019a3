use std::env;
use std::sync::Arc;

use ragdb_cli::{flag_value, init_tracing, load_config, print_hits};
use ragdb_core::config::expand_path;
use ragdb_core::traits::VectorIndex;
use ragdb_embed::build_embedder;
use ragdb_retrieve::Retriever;
use ragdb_vector::{load_snapshot, BuildParams};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let config = load_config()?;
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <query> [--limit N] [snapshot_path]", args[0]);
        eprintln!("Example: {} 'who works at Acme' --limit 5 indexes/ragdb.json", args[0]);
        std::process::exit(1);
    }
    let query_text = &args[1];
    let mut limit = config.retrieval.k;
    let mut snapshot = config.index.snapshot_path.clone().unwrap_or_else(|| "indexes/ragdb.json".to_string());
    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--limit" => limit = flag_value(&args, &mut i, "--limit"),
            arg if !arg.starts_with('-') => snapshot = arg.to_string(),
            _ => {}
        }
        i += 1;
    }

    println!("🔍 ragdb-search\n==============");
    println!("Query: {}", query_text);
    println!("Snapshot: {}", snapshot);

    let embedder = build_embedder(&config.embedder)?;
    let params = BuildParams::from_config(&config);
    let index = load_snapshot(&expand_path(&snapshot), embedder.embedder_id(), embedder.dim(), &params)?;
    println!("Index: {:?}, {} chunks, {} dims", index.kind(), index.len(), index.dim());
    let retriever = Retriever::new(Arc::new(index), embedder)?.with_timeout(config.retrieval.query_timeout());
    let hits = retriever.retrieve_scored(query_text, limit).await?;
    print_hits(query_text, &hits);
    Ok(())
}
