use clap::Parser;
use eventdesk::command::EventdeskCmd;
use eventdesk::VERSION;
use eyre::Result;

#[derive(Parser)]
#[command(
    author = "Sam Uherek",
    version = VERSION,
    about = "Events, registrations and unregistration requests, online or off",
    )]
struct Eventdesk {
    #[command(subcommand)]
    eventdesk: EventdeskCmd,
}

impl Eventdesk {
    fn run(self) -> Result<()> {
        self.eventdesk.run()
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;
    Eventdesk::parse().run()
}
