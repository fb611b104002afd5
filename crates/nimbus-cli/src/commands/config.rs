//! Config command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use nimbus_service::Config;

use crate::cli::ConfigAction;
use crate::util::{config_path, load_config, write_output};

pub fn cmd_config(
    action: ConfigAction,
    explicit: Option<&PathBuf>,
    output: Option<&PathBuf>,
) -> Result<()> {
    let path = config_path(explicit);
    match action {
        ConfigAction::Path => write_output(output, &format!("{}\n", path.display())),
        ConfigAction::Show => {
            let config = redacted(load_config(explicit)?);
            let content = toml::to_string_pretty(&config).context("Failed to serialize config")?;
            write_output(output, &content)
        }
        ConfigAction::Init { force } => {
            if path.exists() && !force {
                bail!(
                    "Config file already exists at {} (use --force to overwrite)",
                    path.display()
                );
            }
            Config::default().save(&path)?;
            println!("Wrote default config to {}", path.display());
            Ok(())
        }
    }
}

/// Hide secrets before printing.
fn redacted(mut config: Config) -> Config {
    if config.weather.api_key.is_some() {
        config.weather.api_key = Some("********".to_string());
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_init_then_show() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nimbus").join("server.toml");
        let out = dir.path().join("show.toml");

        cmd_config(ConfigAction::Init { force: false }, Some(&path), None).unwrap();
        assert!(path.exists());

        cmd_config(ConfigAction::Show, Some(&path), Some(&out)).unwrap();
        let shown: Config = toml::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(shown.history.max_entries, 30);
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("server.toml");
        std::fs::write(&path, "").unwrap();

        assert!(cmd_config(ConfigAction::Init { force: false }, Some(&path), None).is_err());
        cmd_config(ConfigAction::Init { force: true }, Some(&path), None).unwrap();
        assert!(!std::fs::read_to_string(&path).unwrap().is_empty());
    }

    #[test]
    fn test_show_redacts_api_key() {
        let mut config = Config::default();
        config.weather.api_key = Some("secret".into());
        assert_eq!(redacted(config).weather.api_key.as_deref(), Some("********"));
    }
}
