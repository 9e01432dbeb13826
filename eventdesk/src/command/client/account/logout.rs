use eventdesk_client::settings::Settings;
use eyre::Result;

pub fn run(settings: &Settings) -> Result<()> {
    if settings.clear_session()? {
        println!("You are logged out!");
    } else {
        println!("You are not logged in.");
    }
    Ok(())
}
