use clap::Parser;
use eventdesk_client::error::SyncError;
use eventdesk_client::settings::Settings;
use eventdesk_client::sync::Synchronizer;
use eventdesk_common::api::CurrentUser;
use eyre::{bail, eyre, Result};
use tracing::warn;

mod account;
mod events;
mod info;
mod registrations;
mod requests;
mod users;

#[derive(Parser, Debug)]
#[clap(infer_subcommands = true)]
pub enum Cmd {
    /// Show paths, session and sync state
    Info,
    #[command(subcommand)]
    Events(events::Cmd),
    #[command(subcommand)]
    Registrations(registrations::Cmd),
    /// Register the logged in user for an event
    Enroll {
        event: String,
    },
    /// Ask an administrator to cancel one of your registrations
    Unenroll {
        registration: String,
        #[arg(long, short)]
        reason: Option<String>,
    },
    #[command(subcommand)]
    Requests(requests::Cmd),
    #[command(subcommand)]
    Users(users::Cmd),
    #[command(subcommand)]
    Account(account::Cmd),
}

impl Cmd {
    #[tokio::main]
    pub async fn run(self) -> Result<()> {
        let settings = Settings::new()?;

        match self {
            Self::Info => {
                info::run(&settings).await;
                Ok(())
            }
            Self::Account(cmd) => cmd.run(&settings).await,
            Self::Events(cmd) => cmd.run(&settings, &mut open(&settings).await?).await,
            Self::Registrations(cmd) => cmd.run(&settings, &mut open(&settings).await?).await,
            Self::Enroll { event } => {
                registrations::enroll(&settings, &mut open(&settings).await?, event).await
            }
            Self::Unenroll {
                registration,
                reason,
            } => {
                let mut sync = open(&settings).await?;
                registrations::unenroll(&settings, &mut sync, registration, reason).await
            }
            Self::Requests(cmd) => cmd.run(&settings, &mut open(&settings).await?).await,
            Self::Users(cmd) => cmd.run(&settings, &mut open(&settings).await?).await,
        }
    }
}

/// Synchronizer over the configured server and mirror, already initialized.
pub(crate) async fn open(settings: &Settings) -> Result<Synchronizer> {
    let mut sync = Synchronizer::from_settings(settings).await?;
    let report = sync.initialize().await.map_err(|err| shared_error(&sync, err))?;

    if report.reached_server() {
        if let Err(err) = Settings::save_last_sync() {
            warn!("failed to record sync time: {err}");
        }
    } else {
        eprintln!("Server unreachable, working from the local copy.");
    }

    Ok(sync)
}

/// The message the synchronizer published for a failed operation.
pub(crate) fn shared_error(sync: &Synchronizer, err: SyncError) -> eyre::Report {
    match sync.error() {
        Some(message) => eyre!("{message}"),
        None => eyre!(err),
    }
}

pub(crate) fn current_user(settings: &Settings) -> Result<CurrentUser> {
    match settings.session() {
        Some(user) => Ok(user),
        None => bail!("You are not logged in. Run `eventdesk account login` first."),
    }
}

pub(crate) fn admin(settings: &Settings) -> Result<CurrentUser> {
    let user = current_user(settings)?;
    if !user.is_admin {
        bail!("Only administrators can do that.");
    }
    Ok(user)
}
