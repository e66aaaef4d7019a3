use std::env;

use ragdb_cli::{apply_data_dir, init_tracing, load_config};
use ragdb_retrieve::KnowledgeBase;

const DEFAULT_SNAPSHOT: &str = "indexes/ragdb.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let mut config = load_config()?;
    let args: Vec<String> = env::args().skip(1).collect();
    let mut data_dir = None;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--progress" | "-p" => config.build.show_progress = true,
            "--snapshot" => match args.get(i + 1) {
                Some(path) => {
                    config.index.snapshot_path = Some(path.clone());
                    i += 1;
                }
                None => {
                    eprintln!("Error: --snapshot requires a path");
                    std::process::exit(1);
                }
            },
            "--cache" => match args.get(i + 1) {
                Some(path) => {
                    config.build.cache_path = Some(path.clone());
                    i += 1;
                }
                None => {
                    eprintln!("Error: --cache requires a path");
                    std::process::exit(1);
                }
            },
            arg if !arg.starts_with('-') => data_dir = Some(arg.to_string()),
            other => eprintln!("⚠️  Ignoring unknown flag {}", other),
        }
        i += 1;
    }
    apply_data_dir(&mut config, data_dir.as_deref());
    let snapshot = config.index.snapshot_path.get_or_insert_with(|| DEFAULT_SNAPSHOT.to_string()).clone();

    println!("ragdb indexer\n=============");
    println!("Source: {:?}", config.source.kind);
    println!("Index: {:?} ({})", config.index.kind, config.index.metric);
    println!("Snapshot: {}", snapshot);

    let kb = KnowledgeBase::from_config(config)?;
    let report = kb.rebuild().await?;
    println!();
    for line in report.lines() {
        println!("{}", line);
    }
    println!("\n✅ Indexing completed successfully!");
    println!("📊 {} records, {} documents, {} chunks ({} cached, {} embedded)",
        report.records, report.documents, report.chunks, report.cache_hits, report.embedded);
    println!("\n💡 To search the snapshot, use: cargo run --bin ragdb-search '<query>' {}", snapshot);
    Ok(())
}
