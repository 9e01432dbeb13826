use clap::Parser;
use eventdesk_client::settings::Settings;
use eyre::Result;

mod login;
mod logout;
mod register;
mod status;

#[derive(Parser, Debug)]
#[clap(infer_subcommands = true)]
pub enum Cmd {
    /// Log in with an existing account
    Login(login::Cmd),
    /// Create an account and log in with it
    Register(register::Cmd),
    /// Forget the local session
    Logout,
    /// Show the session and whether the server answers
    Status,
}

impl Cmd {
    pub(crate) async fn run(self, settings: &Settings) -> Result<()> {
        match self {
            Self::Login(cmd) => cmd.run(settings).await,
            Self::Register(cmd) => cmd.run(settings).await,
            Self::Logout => logout::run(settings),
            Self::Status => status::run(settings).await,
        }
    }
}
