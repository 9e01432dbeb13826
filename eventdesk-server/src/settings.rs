use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File as ConfigFile, FileFormat};
use eyre::{eyre, Context, Result};
use std::fs::{create_dir_all, File};
use std::io::Write;

const EXAMPLE_CONFIG: &str = include_str!("../server.toml");

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub db_path: String,
}

impl Settings {
    pub fn build_default() -> Result<ConfigBuilder<DefaultState>> {
        let db_path = eventdesk_common::utils::config_dir().join("server.db");

        Ok(Config::builder()
            .set_default("host", "127.0.0.1")?
            .set_default("port", 8090)?
            .set_default("db_path", db_path.to_str())?
            .add_source(
                Environment::with_prefix("eventdesk")
                    .prefix_separator("_")
                    .separator("__"),
            ))
    }

    pub fn new() -> Result<Self> {
        let config_dir = eventdesk_common::utils::config_dir();
        let config_file = config_dir.join("server.toml");

        let mut config_builder = Self::build_default()?;
        if config_file.exists() {
            config_builder =
                config_builder.add_source(ConfigFile::from(config_file).format(FileFormat::Toml));
        } else {
            create_dir_all(&config_dir)
                .wrap_err_with(|| format!("Failed to create dir {config_dir:?}"))?;
            let mut file = File::create(config_file).wrap_err("Failed to create config file")?;
            file.write_all(EXAMPLE_CONFIG.as_bytes())?;
        };

        let settings = config_builder
            .build()?
            .try_deserialize()
            .map_err(|e| eyre!("Failed to deserialize config {}", e))?;

        Ok(settings)
    }
}
