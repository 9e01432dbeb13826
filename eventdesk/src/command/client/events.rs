use super::{admin, shared_error};
use clap::{Args, Parser};
use eventdesk_client::settings::Settings;
use eventdesk_client::sync::Synchronizer;
use eventdesk_common::domain::{Event, EventPatch, NewEvent, RecordId};
use eyre::{bail, Result};
use time::macros::format_description;
use time::Date;

pub(crate) fn parse_date(value: &str) -> Result<Date, String> {
    Date::parse(value, format_description!("[year]-[month]-[day]"))
        .map_err(|err| format!("expected YYYY-MM-DD: {err}"))
}

#[derive(Args, Debug)]
pub struct Details {
    #[arg(long)]
    image: Option<String>,
    #[arg(long)]
    instructor: Option<String>,
    #[arg(long)]
    duration: Option<String>,
    #[arg(long)]
    price: Option<f64>,
    #[arg(long)]
    category: Option<String>,
}

#[derive(Parser, Debug)]
#[clap(infer_subcommands = true)]
pub enum Cmd {
    /// List events with their free slots
    List,
    /// Create an event (admin)
    Create {
        #[arg(long, short)]
        name: String,
        #[arg(long, short, value_parser = parse_date)]
        date: Date,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, short, value_parser = clap::value_parser!(u32).range(1..))]
        capacity: u32,
        #[command(flatten)]
        details: Details,
    },
    /// Change fields of an event (admin)
    Update {
        id: String,
        #[arg(long, short)]
        name: Option<String>,
        #[arg(long, short, value_parser = parse_date)]
        date: Option<Date>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, short, value_parser = clap::value_parser!(u32).range(1..))]
        capacity: Option<u32>,
        #[command(flatten)]
        details: Details,
    },
    /// Delete an event (admin). Its registrations are kept.
    Delete { id: String },
}

fn print_event(sync: &Synchronizer, event: &Event) {
    let free = sync.available_slots(&event.id).unwrap_or(0);
    println!(
        "{}\t{}\t{}\t{free}/{} free",
        event.id, event.date, event.name, event.capacity
    );
}

impl Cmd {
    pub(crate) async fn run(self, settings: &Settings, sync: &mut Synchronizer) -> Result<()> {
        match self {
            Self::List => {
                for event in sync.events() {
                    print_event(sync, event);
                }
            }
            Self::Create {
                name,
                date,
                description,
                capacity,
                details,
            } => {
                admin(settings)?;
                let mut event = NewEvent::new(name, date, description, capacity);
                event.image = details.image;
                event.instructor = details.instructor;
                event.duration = details.duration;
                event.price = details.price;
                event.category = details.category;

                let created = match sync.create_event(event).await {
                    Ok(created) => created,
                    Err(err) => return Err(shared_error(sync, err)),
                };
                print_event(sync, &created);
            }
            Self::Update {
                id,
                name,
                date,
                description,
                capacity,
                details,
            } => {
                admin(settings)?;
                let patch = EventPatch {
                    name,
                    date,
                    description,
                    capacity,
                    image: details.image,
                    instructor: details.instructor,
                    duration: details.duration,
                    price: details.price,
                    category: details.category,
                    ..Default::default()
                };

                let updated = match sync.update_event(&RecordId::from(id.as_str()), patch).await {
                    Ok(Some(updated)) => updated,
                    Ok(None) => bail!("Event {id} not found"),
                    Err(err) => return Err(shared_error(sync, err)),
                };
                print_event(sync, &updated);
            }
            Self::Delete { id } => {
                admin(settings)?;
                if let Err(err) = sync.delete_event(&id.as_str().into()).await {
                    return Err(shared_error(sync, err));
                }
                println!("Deleted event {id}");
            }
        }

        Ok(())
    }
}
