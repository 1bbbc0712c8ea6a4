use std::time::Duration;

/// Controls when the client fetches the feature toggles from the server.
pub enum PollingMode {
    /// Fetches right after the client is built, then repeatedly with the given interval.
    /// The interval must not be zero.
    AutoPoll(Duration),
    /// Fetches only when [`crate::Client::refresh`] is called.
    Manual,
}
