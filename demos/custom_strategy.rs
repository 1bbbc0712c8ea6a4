use log::kv::Key;
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::collections::HashMap;
use std::time::Duration;
use unleash_client::*;

// Enables a feature for the users whose email is listed in the `emails` parameter.
struct ActiveForUserWithEmail {}

impl Strategy for ActiveForUserWithEmail {
    fn name(&self) -> &str {
        "ActiveForUserWithEmail"
    }

    fn is_enabled(&self, _: &str, parameters: &HashMap<String, String>, context: &Context) -> bool {
        match (parameters.get("emails"), context.get_property("email")) {
            (Some(emails), Some(email)) => emails.split(',').any(|e| e.trim() == email),
            _ => false,
        }
    }
}

#[tokio::main]
async fn main() {
    // Info level logging prints every evaluation step.
    // Use the Warn level in your application to avoid too detailed logging.
    log::set_max_level(LevelFilter::Info);
    log::set_logger(&PrintLog {}).unwrap();

    let client = Client::builder()
        .url("http://localhost:4242/api/")
        .app_name("custom-strategy-demo")
        .custom_header("Authorization", "default:development.unleash-insecure-api-token")
        .polling_mode(PollingMode::AutoPoll(Duration::from_secs(5)))
        .strategy(Box::new(ActiveForUserWithEmail {}))
        .build()
        .unwrap();

    let mut errors = client.errors();
    tokio::spawn(async move {
        while let Ok(err) = errors.recv().await {
            println!("refresh failed: {err}");
        }
    });

    if let Err(err) = client.wait_for_ready(Duration::from_secs(10)).await {
        println!("{err}, evaluating with fallback values");
    }

    let context = Context::new()
        .user_id("#SOME-USER-ID#")
        .property("email", "someone@example.com");

    let is_enabled = client.is_enabled("new-checkout", Some(&context), false);
    println!("new-checkout: {is_enabled}");

    let details = client.is_enabled_details("beta-banner", Some(&context), false);
    println!(
        "beta-banner: {} (strategy: {:?}, fallback: {})",
        details.enabled, details.matched_strategy, details.is_fallback
    );

    client.close().unwrap();
}

// Example log implementation.
pub struct PrintLog {}

impl Log for PrintLog {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level() && metadata.target().contains("unleash_client")
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let level = match record.level() {
            Level::Error => "ERROR",
            Level::Warn => "WARN",
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
        };
        match record.key_values().get(Key::from("event_id")) {
            Some(event_id) => println!("{level} [{event_id}] {}", record.args()),
            None => println!("{level} {}", record.args()),
        }
    }

    fn flush(&self) {}
}
