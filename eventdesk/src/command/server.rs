use clap::Parser;
use eventdesk_server::settings::Settings;
use eyre::Result;
use std::net::SocketAddr;

#[derive(Parser, Debug)]
#[clap(infer_subcommands = true)]
pub enum Cmd {
    /// Start the collection server
    Start {
        /// Host address
        #[clap(long)]
        host: Option<String>,
        /// Port to bind
        #[clap(long, short)]
        port: Option<u16>,
    },
}

impl Cmd {
    #[tokio::main]
    pub async fn run(self) -> Result<()> {
        tracing::trace!(command = ?self, "server command");

        match self {
            Self::Start { host, port } => {
                let settings = Settings::new()?;
                let host = host.as_ref().unwrap_or(&settings.host);
                let port = port.unwrap_or(settings.port);
                let address = SocketAddr::new(host.parse()?, port);
                eventdesk_server::launch(&settings, address).await
            }
        }
    }
}
