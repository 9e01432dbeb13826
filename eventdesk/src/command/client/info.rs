use eventdesk_client::database::Database;
use eventdesk_client::settings::Settings;
use time::{Duration, OffsetDateTime};

use crate::VERSION;

fn naive_time_ago(timestamp: OffsetDateTime) -> String {
    let now = OffsetDateTime::now_utc();
    let duration = now - timestamp;

    if timestamp == OffsetDateTime::UNIX_EPOCH {
        "Never".to_string()
    } else if duration < Duration::hours(1) {
        format!("{} minutes ago", duration.whole_minutes())
    } else if duration < Duration::days(1) {
        format!("{} hours ago", duration.whole_hours())
    } else {
        format!("{} days ago", duration.whole_days())
    }
}

pub async fn run(settings: &Settings) {
    let env_config_dir = std::env::var("EVENTDESK_CONFIG_DIR");
    let config_file = eventdesk_common::utils::config_dir().join("config.toml");

    let vars = format!(
        "VARS:\nEVENTDESK_CONFIG_DIR = {:?}",
        env_config_dir.unwrap_or("None".into())
    );
    println!("{vars}\n");

    let mut paths = String::from("PATHS:\n");
    paths.push_str(&format!("config_path: {config_file:?}\n"));
    paths.push_str(&format!("db_path: {:?}\n", settings.db_path));
    paths.push_str(&format!("session_path: {:?}", settings.session_path));
    println!("{paths}\n");

    println!("SERVER: {}", settings.server_address);
    println!(
        "Last sync: {}",
        Settings::last_sync()
            .map(naive_time_ago)
            .unwrap_or("Unavailable".to_string())
    );
    println!();

    println!("MIRROR:");
    match Database::new(&settings.db_path).await {
        Ok(db) => match db.slots().await {
            Ok(slots) if slots.is_empty() => println!("(empty)"),
            Ok(slots) => {
                for slot in slots {
                    println!("{}: {} bytes", slot.name, slot.size);
                }
            }
            Err(err) => println!("Unreadable: {err}"),
        },
        Err(err) => println!("Unavailable: {err}"),
    }
    println!();

    println!("ACCOUNT:");
    match settings.session() {
        Some(user) => {
            let role = if user.is_admin { "admin" } else { "member" };
            println!("Auth: {} <{}> ({role})", user.name, user.email);
        }
        None => println!("Auth: Unauthenticated"),
    }

    println!();
    println!("Version: {VERSION}");
}
