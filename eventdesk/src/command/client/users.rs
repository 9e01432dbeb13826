use super::{admin, shared_error};
use clap::Parser;
use eventdesk_client::settings::Settings;
use eventdesk_client::sync::Synchronizer;
use eventdesk_client::utils::read_input_hidden;
use eventdesk_common::domain::{today, NewUser, RecordId, User};
use eyre::{bail, Result};

#[derive(Parser, Debug)]
#[clap(infer_subcommands = true)]
pub enum Cmd {
    /// List accounts (admin)
    List,
    /// Create an account. Anyone may create the first one, later ones need an admin.
    Create {
        #[arg(long, short)]
        name: String,
        #[arg(long, short)]
        email: String,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        admin: bool,
    },
    /// Delete an account (admin)
    Delete { id: String },
}

fn print_user(user: &User) {
    let role = if user.is_admin { "admin" } else { "member" };
    println!(
        "{}\t{}\t{}\t{}\t{role}",
        user.id,
        user.name,
        user.email,
        user.phone.as_deref().unwrap_or("-")
    );
}

impl Cmd {
    pub(crate) async fn run(self, settings: &Settings, sync: &mut Synchronizer) -> Result<()> {
        // Users are never mirrored, so there is nothing to show without the server.
        if sync.users().is_empty() {
            if let Err(err) = sync.load_users().await {
                return Err(shared_error(sync, err));
            }
        }

        match self {
            Self::List => {
                admin(settings)?;
                sync.users().iter().for_each(print_user);
            }
            Self::Create {
                name,
                email,
                phone,
                admin: is_admin,
            } => {
                if !sync.users().is_empty() {
                    admin(settings)?;
                }
                if sync
                    .users()
                    .iter()
                    .any(|x| x.email.eq_ignore_ascii_case(&email))
                {
                    bail!("A user with this email already exists");
                }

                let user = NewUser {
                    name,
                    email,
                    phone,
                    password: read_input_hidden("password")?,
                    is_admin,
                    registered_on: Some(today()),
                };
                let created = match sync.create_user(user).await {
                    Ok(created) => created,
                    Err(err) => return Err(shared_error(sync, err)),
                };
                print_user(&created);
            }
            Self::Delete { id } => {
                admin(settings)?;
                if let Err(err) = sync.delete_user(&RecordId::from(id.as_str())).await {
                    return Err(shared_error(sync, err));
                }
                println!("Deleted user {id}");
            }
        }

        Ok(())
    }
}
