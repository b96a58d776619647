//! `studyplan index`: Build the note index and try a query against it.

use std::path::PathBuf;

use studyplan_config::AppConfig;

use super::{Services, read_notes};

pub async fn run(
    notes: Vec<PathBuf>,
    query: Option<String>,
    top_k: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let services = Services::from_config(&config)?;

    let snippets = read_notes(&notes)?;
    let stats = services.store.build(&snippets).await?;

    println!("📎 Note index ({})", services.store.name());
    if stats.chunk_count == 0 {
        println!("  Cleared index: no note text found");
        return Ok(());
    }
    println!("  Chunks:     {}", stats.chunk_count);
    println!("  Dimension:  {}", stats.dimension);

    if let Some(query) = query {
        let k = top_k.unwrap_or(config.context.top_k).max(1);
        let hits = services.store.search(&query, k).await?;
        println!("\n🔎 {query}");
        if hits.is_empty() {
            println!("  No matching chunks");
        }
        for hit in hits {
            let preview: String = hit.text.chars().take(120).collect();
            println!("  [{}] {:.3}  {preview}", hit.id, hit.score);
        }
    }

    Ok(())
}
