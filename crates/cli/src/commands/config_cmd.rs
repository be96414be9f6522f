//! `quill config`: inspect the effective configuration.

use std::path::Path;

use quill_config::AppConfig;

pub async fn validate(explicit: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("Validating configuration...");

    let config = match AppConfig::load(explicit) {
        Ok(config) => config,
        Err(e) => {
            println!("  Config error: {e}");
            return Err(e.into());
        }
    };
    println!("  Config parsed successfully");

    let mut warnings = Vec::new();
    if config.model.provider != "mock" && config.model.api_key.is_none() {
        warnings.push("No API key set (set GEMINI_API_KEY or QUILL_API_KEY)");
    }
    if config.model.provider == "openai-compatible" && config.model.base_url.is_none() {
        warnings.push("Provider 'openai-compatible' needs model.base_url");
    }

    if warnings.is_empty() {
        println!("  All checks passed");
    } else {
        println!();
        for w in &warnings {
            println!("  Warning: {w}");
        }
    }

    println!();
    println!("  Provider:  {}", config.model.provider);
    println!("  Model:     {}", config.model.name);
    match config.agent.max_steps {
        Some(max) => println!("  Max steps: {max}"),
        None => println!("  Max steps: unbounded"),
    }
    println!("  History:   {}", config.ui.history_path().display());
    Ok(())
}

pub async fn show(explicit: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load(explicit).map_err(|e| format!("Failed to load config: {e}"))?;
    println!("{}", render_redacted(&config)?);
    Ok(())
}

pub async fn path() -> Result<(), Box<dyn std::error::Error>> {
    for candidate in AppConfig::candidate_paths() {
        let marker = if candidate.exists() { "found" } else { "missing" };
        println!("{} ({marker})", candidate.display());
    }
    Ok(())
}

/// TOML rendering with the API key masked.
fn render_redacted(config: &AppConfig) -> Result<String, toml::ser::Error> {
    let mut config = config.clone();
    if config.model.api_key.is_some() {
        config.model.api_key = Some("[REDACTED]".into());
    }
    toml::to_string_pretty(&config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rendered_config_hides_api_key() {
        let mut config = AppConfig::default();
        config.model.api_key = Some("sk-secret".into());
        let rendered = render_redacted(&config).unwrap();
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("[REDACTED]"));
        assert!(rendered.contains("gemini-2.5-flash"));
    }
}
