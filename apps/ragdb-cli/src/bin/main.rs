use std::env;

use ragdb_cli::{apply_data_dir, flag_value, init_tracing, load_config, print_hits};
use ragdb_retrieve::KnowledgeBase;
use ragdb_source::{filter_keys, source_from_config};

fn parse_args() -> (String, Vec<String>) {
    let mut args: Vec<String> = env::args().collect();
    let prog = args.remove(0);
    if args.is_empty() {
        eprintln!("Usage: {} <ingest|query|keys> [args...]", prog);
        eprintln!("  ingest [data_dir]           build the index and print the loaded reference");
        eprintln!("  query \"<query>\" [--k N]     retrieve the top-k chunks");
        eprintln!("  keys                        list record collections");
        std::process::exit(1);
    }
    let cmd = args.remove(0);
    (cmd, args)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let mut config = load_config()?;
    let (cmd, args) = parse_args();
    match cmd.as_str() {
        "ingest" => {
            apply_data_dir(&mut config, args.first().map(String::as_str));
            let kb = KnowledgeBase::from_config(config)?;
            let report = kb.rebuild().await?;
            for line in report.lines() {
                println!("{}", line);
            }
            println!("✅ Ingest complete ({} chunks)", report.chunks);
        }
        "query" => {
            let Some(query_text) = args.first().cloned() else {
                eprintln!("Usage: ragdb query \"<query>\" [--k N]");
                std::process::exit(1);
            };
            let mut k = None;
            let mut i = 1;
            while i < args.len() {
                if args[i] == "--k" {
                    k = Some(flag_value::<usize>(&args, &mut i, "--k"));
                }
                i += 1;
            }
            let kb = KnowledgeBase::from_config(config)?;
            kb.initialize().await?;
            match kb.retrieve_scored(&query_text, k).await {
                Ok(hits) => print_hits(&query_text, &hits),
                Err(e) if e.is_recoverable() => {
                    eprintln!("⚠️  Retrieval failed, no context available: {}", e);
                    std::process::exit(2);
                }
                Err(e) => return Err(e.into()),
            }
        }
        "keys" => {
            let source = source_from_config(&config.source)?;
            let all = source.list_keys().await?;
            let kept = filter_keys(all.clone(), &config.source.excluded());
            for key in &all {
                let tag = if kept.contains(key) { "" } else { "  (reserved)" };
                println!("{}{}", key, tag);
            }
            println!("📊 {} collections, {} excluded", kept.len(), all.len() - kept.len());
        }
        _ => {
            eprintln!("Unknown command: {}", cmd);
            std::process::exit(1);
        }
    }
    Ok(())
}
