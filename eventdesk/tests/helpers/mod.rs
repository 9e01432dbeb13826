use axum::serve;
use eventdesk_client::database::Database as ClientDatabase;
use eventdesk_client::settings::Settings as ClientSettings;
use eventdesk_client::sync::Synchronizer;
use eventdesk_server::database::Database as ServerDatabase;
use eventdesk_server::make_router;
use eventdesk_server::settings::Settings as ServerSettings;
use eyre::{eyre, Result};
use tempfile::TempDir;
use tokio::net::TcpListener;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Nothing listens here, so every request fails to connect.
pub const DEAD_ADDRESS: &str = "http://127.0.0.1:1";

pub struct TestClient {
    pub settings: ClientSettings,
    _dir: TempDir,
}

impl TestClient {
    pub async fn build(server_address: &str) -> Result<Self> {
        let dir = TempDir::new()?;
        let db_path = dir.path().join("mirror.db");
        let session_path = dir.path().join("session");

        let settings: ClientSettings = ClientSettings::builder()?
            .set_override("db_path", db_path.to_str())?
            .set_override("session_path", session_path.to_str())?
            .set_override("server_address", server_address)?
            .build()?
            .try_deserialize()
            .map_err(|e| eyre!("Failed to deserialize {e}"))?;

        Ok(Self {
            settings,
            _dir: dir,
        })
    }

    pub fn set_server_address(&mut self, address: &str) {
        self.settings.server_address = address.into();
    }

    pub async fn database(&self) -> Result<ClientDatabase> {
        ClientDatabase::new(&self.settings.db_path).await
    }

    /// A fresh synchronizer over this client's mirror, as a new session would get it.
    pub async fn sync(&self) -> Result<Synchronizer> {
        let mut sync = Synchronizer::from_settings(&self.settings).await?;
        sync.initialize().await?;
        Ok(sync)
    }
}

pub struct TestServer {
    pub settings: ServerSettings,
    pub database: ServerDatabase,
    _dir: TempDir,
}

impl TestServer {
    pub async fn build(host: &str, port: u16) -> Result<Self> {
        let dir = TempDir::new()?;
        let db_path = dir.path().join("server.db");

        let settings: ServerSettings = ServerSettings::build_default()?
            .set_override("db_path", db_path.to_str())?
            .set_override("port", port)?
            .set_override("host", host)?
            .build()?
            .try_deserialize()
            .map_err(|e| eyre!("Failed to deserialize {e}"))?;

        let database = ServerDatabase::new(&settings.db_path).await?;

        Ok(TestServer {
            settings,
            database,
            _dir: dir,
        })
    }

    pub fn address(&self) -> String {
        format!("http://{}:{}", self.settings.host, self.settings.port)
    }
}

pub async fn spawn_sync_app() -> Result<TestServer> {
    let host = "127.0.0.1";
    let listener = TcpListener::bind(format!("{}:{}", host, 0)).await?;
    let port = listener.local_addr()?.port();

    let server = TestServer::build(host, port).await?;

    let r = make_router(&server.settings, server.database.clone()).await;
    tokio::spawn(async move { serve(listener, r.into_make_service()).await });
    Ok(server)
}
