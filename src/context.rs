use serde::Serialize;
use std::collections::HashMap;
use std::fmt::{Display, Formatter};

/// Describes the request a feature is evaluated for. Strategies read their inputs from it.
///
/// # Examples:
///
/// ```rust
/// use unleash_client::Context;
///
/// let context = Context::new()
///     .user_id("user-id")
///     .session_id("session-id")
///     .remote_address("10.0.0.1")
///     .property("email", "john@example.com");
/// ```
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Context {
    #[serde(skip_serializing_if = "Option::is_none")]
    user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    remote_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    environment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    app_name: Option<String>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    properties: HashMap<String, String>,
}

impl Context {
    /// Initializes an empty [`Context`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Identifier of the user the feature is evaluated for.
    ///
    /// # Examples:
    ///
    /// ```rust
    /// use unleash_client::Context;
    ///
    /// let context = Context::new().user_id("user-id");
    /// ```
    pub fn user_id(mut self, user_id: &str) -> Self {
        self.user_id = Some(user_id.to_owned());
        self
    }

    /// Identifier of the session the feature is evaluated for.
    pub fn session_id(mut self, session_id: &str) -> Self {
        self.session_id = Some(session_id.to_owned());
        self
    }

    /// IP address of the remote peer.
    pub fn remote_address(mut self, remote_address: &str) -> Self {
        self.remote_address = Some(remote_address.to_owned());
        self
    }

    /// Name of the environment the application runs in.
    pub fn environment(mut self, environment: &str) -> Self {
        self.environment = Some(environment.to_owned());
        self
    }

    /// Name of the application.
    pub fn app_name(mut self, app_name: &str) -> Self {
        self.app_name = Some(app_name.to_owned());
        self
    }

    /// Custom property used by custom strategies.
    ///
    /// # Examples:
    ///
    /// ```rust
    /// use unleash_client::Context;
    ///
    /// let context = Context::new()
    ///     .property("email", "john@example.com")
    ///     .property("tier", "premium");
    /// ```
    pub fn property(mut self, key: &str, value: &str) -> Self {
        self.properties.insert(key.to_owned(), value.to_owned());
        self
    }

    /// Returns the user identifier, if set.
    pub fn get_user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Returns the session identifier, if set.
    pub fn get_session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Returns the remote address, if set.
    pub fn get_remote_address(&self) -> Option<&str> {
        self.remote_address.as_deref()
    }

    /// Returns the environment name, if set.
    pub fn get_environment(&self) -> Option<&str> {
        self.environment.as_deref()
    }

    /// Returns the application name, if set.
    pub fn get_app_name(&self) -> Option<&str> {
        self.app_name.as_deref()
    }

    /// Returns the custom property stored under `key`.
    pub fn get_property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }
}

impl Display for Context {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match serde_json::to_string(self) {
            Ok(str) => write!(f, "{str}"),
            Err(_) => f.write_str("<invalid context>"),
        }
    }
}
