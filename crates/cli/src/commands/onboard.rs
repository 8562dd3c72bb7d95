//! `nexus onboard`: first-time setup.

use nexus_config::AppConfig;

const SAMPLE_GAMES: &str = r#"{
  "valorant": {
    "genre": "Tactical FPS",
    "developer": "Riot Games",
    "tips": ["Crosshair placement at head height", "Buy as a team"]
  }
}
"#;

const SAMPLE_RECOMMENDATIONS: &str = r#"{
  "if_you_like": {
    "valorant": ["Counter-Strike 2", "Rainbow Six Siege", "Overwatch 2"]
  }
}
"#;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");
    let knowledge_dir = config_dir.join("knowledge");

    println!("🎮 Nexus: First-Time Setup");
    println!("==========================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("✅ Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    if !knowledge_dir.exists() {
        std::fs::create_dir_all(&knowledge_dir)?;
        println!("✅ Created knowledge directory: {}", knowledge_dir.display());
    }

    for (name, content) in [
        ("games.json", SAMPLE_GAMES),
        ("recommendations.json", SAMPLE_RECOMMENDATIONS),
    ] {
        let path = knowledge_dir.join(name);
        if !path.exists() {
            std::fs::write(&path, content)?;
            println!("✅ Created {name}");
        }
    }

    if config_path.exists() {
        println!("\n⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or delete and re-run onboard.\n");
    } else {
        std::fs::write(&config_path, AppConfig::default_toml())?;
        println!("✅ Created config.toml at: {}", config_path.display());
        println!("\n📝 Next steps:");
        println!("   1. Add your API key to {} (or set GEMINI_API_KEY)", config_path.display());
        println!("   2. Optionally set RIOT_API_KEY for live League data");
        println!("   3. Run: nexus chat\n");
    }

    println!("🎉 Setup complete! Run `nexus chat` to talk to your coach.\n");

    Ok(())
}
