//! Shared setup for the `ragdb` binaries.

use tracing_subscriber::EnvFilter;

use ragdb_core::config::{Config, RagConfig, SourceKind};
use ragdb_core::types::ScoredChunk;

/// `RUST_LOG` wins; otherwise `info`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_target(false).try_init();
}

pub fn load_config() -> anyhow::Result<RagConfig> {
    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {}", e);
        e
    })?;
    config.rag()
}

/// A positional data directory switches the source to that directory.
pub fn apply_data_dir(config: &mut RagConfig, data_dir: Option<&str>) {
    if let Some(dir) = data_dir {
        config.source.kind = SourceKind::Dir;
        config.source.data_dir = dir.to_string();
    }
}

/// Value following `flag`, parsed; exits with a usage error when missing or invalid.
pub fn flag_value<T: std::str::FromStr>(args: &[String], i: &mut usize, flag: &str) -> T {
    match args.get(*i + 1).and_then(|v| v.parse::<T>().ok()) {
        Some(v) => {
            *i += 1;
            v
        }
        None => {
            eprintln!("Error: {} requires a value", flag);
            std::process::exit(1);
        }
    }
}

pub fn print_hits(query: &str, hits: &[ScoredChunk]) {
    println!("\n🔍 Found {} results for: \"{}\"", hits.len(), query);
    for (i, hit) in hits.iter().enumerate() {
        let meta = &hit.chunk.metadata;
        println!(
            "\n  {}. distance={:.4}  id={}  source={}  chars={}..{}",
            i + 1,
            hit.distance,
            meta.id,
            meta.source_key,
            hit.chunk.start,
            hit.chunk.end
        );
        println!("     📝 Content: {}", preview(&hit.chunk.content, 240));
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    let flat: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let cut: String = flat.chars().take(max_chars).collect();
    format!("{cut}…")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_dir_argument_selects_the_dir_source() {
        let mut config = RagConfig::default();
        config.source.kind = SourceKind::Upstash;
        apply_data_dir(&mut config, None);
        assert_eq!(config.source.kind, SourceKind::Upstash);
        apply_data_dir(&mut config, Some("/srv/records"));
        assert_eq!(config.source.kind, SourceKind::Dir);
        assert_eq!(config.source.data_dir, "/srv/records");
    }

    #[test]
    fn flag_values_advance_the_cursor() {
        let args: Vec<String> = ["--k", "5"].iter().map(|s| s.to_string()).collect();
        let mut i = 0;
        let k: usize = flag_value(&args, &mut i, "--k");
        assert_eq!((k, i), (5, 1));
    }

    #[test]
    fn preview_collapses_whitespace_and_truncates() {
        assert_eq!(preview("{\n  \"a\": 1\n}", 100), "{ \"a\": 1 }");
        assert_eq!(preview("abcdef", 3), "abc…");
    }
}
