use super::{admin, current_user, shared_error};
use clap::Parser;
use eventdesk_client::settings::Settings;
use eventdesk_client::sync::Synchronizer;
use eventdesk_common::domain::{RecordId, Registration};
use eyre::Result;

#[derive(Parser, Debug)]
#[clap(infer_subcommands = true)]
pub enum Cmd {
    /// Your registrations, or every registration with --all (admin)
    List {
        #[arg(long, short)]
        all: bool,
    },
    /// Delete a registration outright (admin)
    Delete { id: String },
}

fn print_registration(sync: &Synchronizer, registration: &Registration) {
    let event = sync
        .event(&registration.event_id)
        .map(|x| x.name.as_str())
        .unwrap_or("<unknown event>");
    println!(
        "{}\t{}\t{}\t{}",
        registration.id, registration.registered_on, registration.status, event
    );
}

impl Cmd {
    pub(crate) async fn run(self, settings: &Settings, sync: &mut Synchronizer) -> Result<()> {
        match self {
            Self::List { all: true } => {
                admin(settings)?;
                for registration in sync.registrations() {
                    print_registration(sync, registration);
                }
            }
            Self::List { all: false } => {
                let user = current_user(settings)?;
                for registration in sync.registrations_for_user(&user.id) {
                    print_registration(sync, registration);
                }
            }
            Self::Delete { id } => {
                admin(settings)?;
                if let Err(err) = sync.delete_registration(&RecordId::from(id.as_str())).await {
                    return Err(shared_error(sync, err));
                }
                println!("Deleted registration {id}");
            }
        }

        Ok(())
    }
}

pub(crate) async fn enroll(settings: &Settings, sync: &mut Synchronizer, event: String) -> Result<()> {
    let user = current_user(settings)?;
    let registration = match sync.enroll(&RecordId::from(event), &user.id).await {
        Ok(registration) => registration,
        Err(err) => return Err(shared_error(sync, err)),
    };

    print_registration(sync, &registration);
    Ok(())
}

pub(crate) async fn unenroll(
    settings: &Settings,
    sync: &mut Synchronizer,
    registration: String,
    reason: Option<String>,
) -> Result<()> {
    let user = current_user(settings)?;
    let request = match sync
        .request_unenrollment(&RecordId::from(registration), &user.id, reason)
        .await
    {
        Ok(request) => request,
        Err(err) => return Err(shared_error(sync, err)),
    };

    println!(
        "Unregistration request {} sent, an administrator will review it.",
        request.id
    );
    Ok(())
}
