use log::kv::Key;
use log::{set_max_level, Level, Log, Metadata, Record};
use rand::distr::{Alphanumeric, SampleString};
use std::cell::RefCell;
use unleash_client::{Client, ClientBuilder, NoBackup, PollingMode};

pub const FEATURES_PATH: &str = "/client/features";

pub fn rand_app_name() -> String {
    format!("app-{}", Alphanumeric.sample_string(&mut rand::rng(), 12))
}

pub fn feature_json(name: &str, enabled: bool, strategies: &str) -> String {
    format!(r#"{{"name":"{name}","enabled":{enabled},"strategies":[{strategies}]}}"#)
}

pub fn features_payload(features: &[String]) -> String {
    format!(r#"{{"version":1,"features":[{}]}}"#, features.join(","))
}

/// A manual polling client without backup, pointed at `url`.
pub fn manual_builder(url: &str) -> ClientBuilder {
    Client::builder()
        .url(url)
        .app_name(rand_app_name().as_str())
        .polling_mode(PollingMode::Manual)
        .backup(Box::new(NoBackup::new()))
}

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
            Level::Error => "[ERROR]",
            Level::Warn => "[WARN]",
            Level::Info => "[INFO]",
            Level::Debug => "[DEBUG]",
            Level::Trace => "[TRACE]",
        };
        println!("{level} {}", record.args());
    }

    fn flush(&self) {}
}

pub struct RecordingLogger {}

impl RecordingLogger {
    thread_local!(pub static LOGS: RefCell<String> = RefCell::new(String::default()));
}

impl Log for RecordingLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level() && metadata.target().contains("unleash_client")
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let level = match record.level() {
            Level::Error => "ERROR",
            Level::Warn => "WARNING",
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
        };
        let event_id = record
            .key_values()
            .get(Key::from("event_id"))
            .and_then(|id| id.to_i64())
            .unwrap_or_default();
        Self::LOGS.with_borrow_mut(|l| l.push_str(format!("{level} [{event_id}] {}\n", record.args()).as_str()));
    }

    fn flush(&self) {}
}

pub fn log_record_init() {
    set_max_level(log::LevelFilter::Info);
    _ = log::set_logger(&RecordingLogger {});
}
