use eventdesk_client::api_client;
use eventdesk_client::settings::Settings;
use eyre::Result;

pub async fn run(settings: &Settings) -> Result<()> {
    match settings.session() {
        Some(user) => println!("Logged in as {} <{}>", user.name, user.email),
        None => println!("Not logged in"),
    }

    match api_client::health_check(&settings.server_address).await {
        Ok(res) => println!("Server {} is up, version {}", settings.server_address, res.version),
        Err(err) => println!("Server {} is unreachable: {err}", settings.server_address),
    }
    Ok(())
}
