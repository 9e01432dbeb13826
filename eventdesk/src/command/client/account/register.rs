use clap::Parser;
use eventdesk_client::auth;
use eventdesk_client::settings::Settings;
use eventdesk_client::sync::Synchronizer;
use eventdesk_client::utils::{read_input, read_input_hidden};
use eventdesk_common::domain::NewUser;
use eyre::{Context, Result};

#[derive(Parser, Debug)]
#[clap(infer_subcommands = true)]
pub struct Cmd {
    #[arg(short, long)]
    name: Option<String>,
    #[arg(short, long)]
    email: Option<String>,
    #[arg(long)]
    phone: Option<String>,
    #[arg(short, long)]
    password: Option<String>,
}

impl Cmd {
    pub async fn run(self, settings: &Settings) -> Result<()> {
        let name = match self.name {
            Some(name) => name,
            None => read_input("name")?,
        };
        let email = match self.email {
            Some(email) => email,
            None => read_input("email")?,
        };
        let password = match self.password {
            Some(password) => password,
            None => read_input_hidden("password")?,
        };

        let mut sync = Synchronizer::from_settings(settings).await?;
        let user = NewUser {
            name,
            email,
            phone: self.phone,
            password,
            is_admin: false,
            registered_on: None,
        };
        let current = auth::register(&mut sync, settings, user)
            .await
            .wrap_err("Failed to register user")?;

        println!("Welcome {}! You are logged in.", current.name);
        Ok(())
    }
}
