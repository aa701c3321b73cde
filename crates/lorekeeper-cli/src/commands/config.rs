use anyhow::{Context, Result};
use lorekeeper_etl::config::{self, KEYS};
use lorekeeper_etl::Config;
use std::path::Path;
use toml_edit::DocumentMut;

/// Show the current effective configuration.
pub fn show_config() -> Result<()> {
    let config = Config::load()?;
    let config_path = config::config_file_path();

    println!("Current Configuration");
    println!("=====================\n");

    println!("Config file: {}", config_path.display());
    let exists = config_path.exists();
    println!(
        "File exists: {}\n",
        if exists { "yes" } else { "no (using defaults)" }
    );

    println!("Settings:");
    print!(
        "{}",
        toml::to_string_pretty(&config).context("Failed to render configuration")?
    );

    println!(
        "\nPriority: CLI args > ENV vars ({}_*) > Config file > Defaults",
        config::ENV_PREFIX
    );

    Ok(())
}

/// Get a specific config value.
pub fn get_config(key: Option<String>) -> Result<()> {
    if let Some(key) = key {
        let config = Config::load()?;
        println!("{}", config.value_of(&key)?);
    } else {
        // No key provided, show entire config file contents
        let config_path = config::config_file_path();

        if config_path.exists() {
            let contents =
                std::fs::read_to_string(&config_path).context("Failed to read config file")?;
            print!("{contents}");
        } else {
            println!("Config file does not exist: {}", config_path.display());
            println!("\nRun 'lorekeeper config init' to create it.");
        }
    }

    Ok(())
}

/// Set a config value, keeping the rest of the file (comments included).
pub fn set_config(key: &str, value: &str) -> Result<()> {
    let config_path = config::config_file_path();
    config::ensure_config_file()?;
    set_in_file(&config_path, key, value)?;

    println!("✓ Updated {key} = {value}");
    println!("  in {}", config_path.display());

    Ok(())
}

fn set_in_file(config_path: &Path, key: &str, value: &str) -> Result<()> {
    config::validate_value(key, value)?;

    let contents = std::fs::read_to_string(config_path).context("Failed to read config file")?;
    let mut doc: DocumentMut = contents.parse().context("Failed to parse config file")?;
    doc[key] = toml_edit::value(value);

    std::fs::write(config_path, doc.to_string()).context("Failed to write config file")?;
    Ok(())
}

/// Show the config file path.
pub fn show_path() -> Result<()> {
    println!("{}", config::config_file_path().display());
    Ok(())
}

/// Show example configuration.
pub fn show_example() -> Result<()> {
    print!("{}", config::example_config());
    Ok(())
}

/// Initialize config file with defaults.
pub fn init_config() -> Result<()> {
    let created = config::ensure_config_file()?;
    let config_path = config::config_file_path();

    if created {
        println!("✓ Created config file: {}", config_path.display());
        println!("\nEdit this file to configure lorekeeper.");
        println!("Valid keys: {}", KEYS.join(", "));
    } else {
        println!("Config file already exists: {}", config_path.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lorekeeper_etl::SignatureMode;
    use tempfile::TempDir;

    #[test]
    fn test_set_in_file_preserves_comments() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        config::ensure_config_file_at(&path).unwrap();

        set_in_file(&path, "signature", "content").unwrap();
        set_in_file(&path, "log_path", "/var/log/lorekeeper.log").unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("# Lorekeeper Configuration File"));

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.signature, SignatureMode::Content);
        assert_eq!(
            config.log_path.as_deref(),
            Some(Path::new("/var/log/lorekeeper.log"))
        );
    }

    #[test]
    fn test_set_in_file_rejects_bad_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        config::ensure_config_file_at(&path).unwrap();

        assert!(set_in_file(&path, "signature", "md5").is_err());
        assert!(set_in_file(&path, "api_key", "x").is_err());
    }
}
