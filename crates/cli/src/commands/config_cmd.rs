//! `stepwise config`: show or initialize configuration.

use std::path::Path;
use stepwise_config::AppConfig;

use super::load_config;

pub fn run(
    config_path: Option<&Path>,
    init: bool,
    force: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let default_path = AppConfig::config_path();
    let path = config_path.unwrap_or(default_path.as_path());

    if init {
        write_default(path, force)?;
        println!("Wrote default config to {}", path.display());
        return Ok(());
    }

    let config = load_config(config_path).map_err(|e| format!("Failed to load config: {e}"))?;
    println!("# {}", path.display());
    println!("{}", config.to_redacted_toml());
    if !config.has_api_key() {
        eprintln!("warning: no API key set for provider '{}'", config.provider.kind);
    }
    Ok(())
}

/// Write the default config to `path`, refusing to clobber unless `force`.
fn write_default(path: &Path, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() && !force {
        return Err(format!("{} already exists (use --force to overwrite)", path.display()).into());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, AppConfig::default_toml())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_path_is_valid() {
        let path = AppConfig::config_path();
        assert!(path.to_str().unwrap().contains("config.toml"));
    }

    #[test]
    fn init_writes_loadable_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        write_default(&path, false).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.agent, AppConfig::default().agent);
    }

    #[test]
    fn init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[agent]\nmax_steps = 4\n").unwrap();

        assert!(write_default(&path, false).is_err());
        assert_eq!(AppConfig::load_from(&path).unwrap().agent.max_steps, 4);

        write_default(&path, true).unwrap();
        assert_eq!(AppConfig::load_from(&path).unwrap().agent.max_steps, 10);
    }
}
