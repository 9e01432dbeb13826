use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File as ConfigFile, FileFormat};
use eventdesk_common::api::CurrentUser;
use eyre::{eyre, Context, Result};
use std::fs::{create_dir_all, File};
use std::io::Write;
use std::path::PathBuf;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::warn;

const EXAMPLE_CONFIG: &str = include_str!("../config.toml");
const LAST_SYNC_FILENAME: &str = "last_sync_time";

#[derive(Debug, serde::Deserialize, serde::Serialize)]
pub struct Settings {
    pub db_path: String,
    pub session_path: String,
    pub server_address: String,
}

impl Settings {
    fn read_from_data_dir(filename: &str) -> Option<String> {
        let data_dir = eventdesk_common::utils::data_dir();
        let path = data_dir.join(filename);

        if !path.exists() {
            return None;
        }

        let value = fs_err::read_to_string(path);
        value.ok()
    }

    fn save_to_data_dir(filename: &str, value: &str) -> Result<()> {
        let data_dir = eventdesk_common::utils::data_dir();
        let path = data_dir.join(filename);
        fs_err::write(path, value)?;
        Ok(())
    }

    /// Remembers that the server answered during this session.
    pub fn save_last_sync() -> Result<()> {
        Settings::save_to_data_dir(
            LAST_SYNC_FILENAME,
            OffsetDateTime::now_utc().format(&Rfc3339)?.as_str(),
        )?;
        Ok(())
    }

    pub fn last_sync() -> Result<OffsetDateTime> {
        let value = Settings::read_from_data_dir(LAST_SYNC_FILENAME);
        match value {
            Some(v) => Ok(OffsetDateTime::parse(v.trim(), &Rfc3339)?),
            None => Ok(OffsetDateTime::UNIX_EPOCH),
        }
    }

    /// The logged in user, if any. A corrupt session file counts as logged out.
    pub fn session(&self) -> Option<CurrentUser> {
        let path = PathBuf::from(&self.session_path);

        if !path.exists() {
            return None;
        }

        let value = fs_err::read_to_string(path).ok()?;
        match serde_json::from_str(&value) {
            Ok(user) => Some(user),
            Err(err) => {
                warn!("ignoring malformed session file: {err}");
                None
            }
        }
    }

    pub fn save_session(&self, user: &CurrentUser) -> Result<()> {
        let path = PathBuf::from(&self.session_path);
        if let Some(dir) = path.parent() {
            fs_err::create_dir_all(dir)?;
        }
        let value = serde_json::to_string(user)?;
        fs_err::write(path, value).wrap_err("Failed to create a session file")?;
        Ok(())
    }

    /// Removes the session file. Returns false when there was no session.
    pub fn clear_session(&self) -> Result<bool> {
        let path = PathBuf::from(&self.session_path);
        if !path.exists() {
            return Ok(false);
        }
        fs_err::remove_file(path)?;
        Ok(true)
    }

    pub fn builder() -> Result<ConfigBuilder<DefaultState>> {
        let data_dir = eventdesk_common::utils::data_dir();
        let db_path = data_dir.join("mirror.db");
        let session_path = data_dir.join("session");

        Ok(Config::builder()
            .set_default("db_path", db_path.to_str())?
            .set_default("session_path", session_path.to_str())?
            .set_default("server_address", "http://127.0.0.1:8090")?
            .add_source(
                Environment::with_prefix("eventdesk")
                    .prefix_separator("_")
                    .separator("__"),
            ))
    }

    pub fn new() -> Result<Self> {
        let config_dir = eventdesk_common::utils::config_dir();
        let data_dir = eventdesk_common::utils::data_dir();

        create_dir_all(&config_dir)
            .wrap_err_with(|| format!("Failed to create dir {config_dir:?}"))?;
        create_dir_all(&data_dir).wrap_err_with(|| format!("Failed to create dir {data_dir:?}"))?;

        let config_file = config_dir.join("config.toml");

        let mut config_builder = Self::builder()?;
        config_builder = if config_file.exists() {
            config_builder.add_source(ConfigFile::from(config_file).format(FileFormat::Toml))
        } else {
            let mut file = File::create(config_file).wrap_err("Failed to create config file")?;
            file.write_all(EXAMPLE_CONFIG.as_bytes())
                .wrap_err("Failed to write default config file")?;
            config_builder
        };

        let mut settings: Settings = config_builder
            .build()?
            .try_deserialize()
            .map_err(|e| eyre!("Failed to deserialize {}", e))?;

        settings.db_path = expand_shell(&settings.db_path)?;
        settings.session_path = expand_shell(&settings.session_path)?;

        Ok(settings)
    }
}

fn expand_shell(value: &str) -> Result<String> {
    Ok(shellexpand::full(value)?.to_string())
}
