//! `quill init`: write a starter config file.

use quill_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("Created config directory: {}", config_dir.display());
    }

    if config_path.exists() {
        println!("Config already exists at: {}", config_path.display());
        println!("Edit it manually or delete it and re-run `quill init`.");
        return Ok(());
    }

    std::fs::write(&config_path, AppConfig::default_toml())?;
    println!("Created config at: {}", config_path.display());
    println!();
    println!("Next steps:");
    println!("  1. Set GEMINI_API_KEY (or add model.api_key to the config)");
    println!("  2. Optionally add an AGENTS.md with project rules");
    println!("  3. Run: quill");
    Ok(())
}
