use rand::Rng;
use std::env;

/// Returns the name of the local host. The `HOSTNAME` environment variable takes precedence.
pub fn local_hostname() -> Option<String> {
    if let Ok(name) = env::var("HOSTNAME") {
        if !name.is_empty() {
            return Some(name);
        }
    }
    hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .filter(|name| !name.is_empty())
}

fn current_user() -> Option<String> {
    ["USER", "USERNAME", "LOGNAME"]
        .iter()
        .filter_map(|key| env::var(key).ok())
        .find(|name| !name.is_empty())
}

/// Generates an instance id in the `{user}-{hostname}` form.
///
/// When the user can't be determined, the prefix is `generated-{random}-{pid}`.
pub fn generate_instance_id() -> String {
    let prefix = current_user().unwrap_or_else(|| {
        format!(
            "generated-{}-{}",
            rand::rng().random_range(0..1_000_000),
            std::process::id()
        )
    });
    match local_hostname() {
        Some(hostname) => format!("{prefix}-{hostname}"),
        None => prefix,
    }
}
