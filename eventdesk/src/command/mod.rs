use clap::Subcommand;
use eyre::Result;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod client;
mod server;

#[derive(Subcommand)]
pub enum EventdeskCmd {
    #[command(flatten)]
    Client(client::Cmd),

    #[command(subcommand)]
    Server(server::Cmd),
}

impl EventdeskCmd {
    pub fn run(self) -> Result<()> {
        init_tracing();
        match self {
            Self::Server(cmd) => cmd.run(),
            Self::Client(cmd) => cmd.run(),
        }
    }
}

// Logs go to stderr so command output stays clean. Quiet unless RUST_LOG says otherwise.
fn init_tracing() {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();
}
