use super::{admin, shared_error};
use clap::Parser;
use eventdesk_client::settings::Settings;
use eventdesk_client::sync::Synchronizer;
use eventdesk_common::domain::{RecordId, Resolution, UnregistrationRequest};
use eyre::Result;

#[derive(Parser, Debug)]
#[clap(infer_subcommands = true)]
pub enum Cmd {
    /// Unregistration requests, pending ones only unless --all
    List {
        #[arg(long, short)]
        all: bool,
    },
    /// Approve a request and remove its registration
    Approve { id: String },
    /// Reject a request and keep its registration
    Reject { id: String },
}

fn print_request(sync: &Synchronizer, request: &UnregistrationRequest) {
    let event = sync
        .event(&request.event_id)
        .map(|x| x.name.as_str())
        .unwrap_or("<unknown event>");
    println!(
        "{}\t{}\t{}\tuser {}\t{}\t{}",
        request.id,
        request.requested_on,
        request.status,
        request.user_id,
        event,
        request.reason.as_deref().unwrap_or("-")
    );
}

impl Cmd {
    pub(crate) async fn run(self, settings: &Settings, sync: &mut Synchronizer) -> Result<()> {
        admin(settings)?;

        let (id, resolution) = match self {
            Self::List { all } => {
                let requests: Vec<_> = if all {
                    sync.unregistration_requests().iter().collect()
                } else {
                    sync.pending_requests()
                };
                for request in requests {
                    print_request(sync, request);
                }
                return Ok(());
            }
            Self::Approve { id } => (id, Resolution::Approved),
            Self::Reject { id } => (id, Resolution::Rejected),
        };

        let resolved = match sync
            .resolve_unenrollment(&RecordId::from(id), resolution)
            .await
        {
            Ok(resolved) => resolved,
            Err(err) => return Err(shared_error(sync, err)),
        };
        print_request(sync, &resolved);
        Ok(())
    }
}
