//! `nexus cache`: inspect and invalidate the game data cache.

use nexus_config::AppConfig;
use nexus_memory::TtlCache;

async fn open() -> Result<TtlCache, Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let cache = nexus_gateway::open_cache(&config).await?;
    if cache.backend() != "sqlite" {
        println!("  (cache backend is '{}'; entries only live inside a running server)", cache.backend());
    }
    Ok(cache)
}

pub async fn list() -> Result<(), Box<dyn std::error::Error>> {
    let cache = open().await?;
    let entries = cache.list().await?;

    println!("🗄️  Cached entries ({})", entries.len());
    println!("====================");
    if entries.is_empty() {
        println!("   Nothing cached yet.");
    }
    for entry in entries {
        let marker = if entry.fresh { " " } else { "!" };
        println!(
            "  {marker} {:<40} {:<16} {:>7.1}h",
            entry.key, entry.source, entry.age_hours
        );
    }

    Ok(())
}

pub async fn info(key: &str) -> Result<(), Box<dyn std::error::Error>> {
    let cache = open().await?;
    match cache.info(key).await? {
        Some(info) => println!("{}", serde_json::to_string_pretty(&info)?),
        None => return Err(format!("No cache entry '{key}'").into()),
    }
    Ok(())
}

pub async fn invalidate(key: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let cache = open().await?;
    cache.invalidate(key).await?;

    match key {
        Some(key) => println!("✅ Removed '{key}'"),
        None => println!("✅ Cache cleared"),
    }
    Ok(())
}
