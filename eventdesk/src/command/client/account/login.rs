use clap::Parser;
use eventdesk_client::api_client::HttpRemote;
use eventdesk_client::auth;
use eventdesk_client::settings::Settings;
use eventdesk_client::utils::{read_input, read_input_hidden};
use eyre::Result;

#[derive(Parser, Debug)]
#[clap(infer_subcommands = true)]
pub struct Cmd {
    #[arg(long, short)]
    pub email: Option<String>,
    #[arg(long, short)]
    pub password: Option<String>,
}

impl Cmd {
    pub async fn run(self, settings: &Settings) -> Result<()> {
        if let Some(user) = settings.session() {
            println!("You are already logged in as {}.", user.email);
            return Ok(());
        }

        let email = match self.email {
            Some(email) => email,
            None => read_input("email")?,
        };
        let password = match self.password {
            Some(password) => password,
            None => read_input_hidden("password")?,
        };

        let remote = HttpRemote::new(&settings.server_address);
        let user = auth::login(&remote, settings, &email, &password).await?;

        println!("Logged in as {}!", user.name);
        Ok(())
    }
}
