use std::time::Duration;

/// Version of the client library, sent in the `User-Agent` header.
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const FEATURES_PATH: &str = "client/features";
pub const DEPRECATED_URL_SUFFIX: &str = "/features";
pub const BACKUP_FILE_PREFIX: &str = "unleash-repo-schema-v1-";

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(15);
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);
pub const MAX_BACKOFF_MULTIPLIER: u32 = 10;
pub const EVENT_CHANNEL_CAPACITY: usize = 32;
