use crate::backup::{BackupStore, FileBackup};
use crate::constants::{DEFAULT_HTTP_TIMEOUT, DEFAULT_REFRESH_INTERVAL, DEPRECATED_URL_SUFFIX};
use crate::errors::{ClientError, ErrorKind};
use crate::modes::PollingMode;
use crate::strategy::{Strategy, StrategyRegistry};
use crate::utils::generate_instance_id;
use crate::Client;
use log::warn;
use std::borrow::Borrow;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

pub struct Options {
    url: Url,
    app_name: String,
    instance_id: String,
    polling_mode: PollingMode,
    http_timeout: Duration,
    backup: Box<dyn BackupStore>,
    custom_headers: Vec<(String, String)>,
}

impl Options {
    pub(crate) fn url(&self) -> &Url {
        &self.url
    }

    pub(crate) fn app_name(&self) -> &str {
        &self.app_name
    }

    pub(crate) fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub(crate) fn polling_mode(&self) -> &PollingMode {
        &self.polling_mode
    }

    pub(crate) fn http_timeout(&self) -> &Duration {
        &self.http_timeout
    }

    pub(crate) fn backup(&self) -> &dyn BackupStore {
        self.backup.borrow()
    }

    pub(crate) fn custom_headers(&self) -> &[(String, String)] {
        &self.custom_headers
    }
}

/// Builder to create a feature toggle [`Client`].
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use unleash_client::{Client, PollingMode};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let client = Client::builder()
///     .url("https://unleash.example.com/api/")
///     .app_name("my-app")
///     .polling_mode(PollingMode::AutoPoll(Duration::from_secs(30)))
///     .build()
///     .unwrap();
/// # }
/// ```
pub struct ClientBuilder {
    url: Option<String>,
    app_name: Option<String>,
    instance_id: Option<String>,
    polling_mode: Option<PollingMode>,
    http_timeout: Option<Duration>,
    backup_path: Option<PathBuf>,
    backup: Option<Box<dyn BackupStore>>,
    registry: Option<StrategyRegistry>,
    strategies: Vec<Box<dyn Strategy>>,
    custom_headers: Vec<(String, String)>,
}

impl ClientBuilder {
    pub(crate) fn new() -> Self {
        Self {
            url: None,
            app_name: None,
            instance_id: None,
            polling_mode: None,
            http_timeout: None,
            backup_path: None,
            backup: None,
            registry: None,
            strategies: Vec::new(),
            custom_headers: Vec::new(),
        }
    }

    /// Sets the base URL of the toggle server's API. Required.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use unleash_client::Client;
    ///
    /// let builder = Client::builder()
    ///     .url("https://unleash.example.com/api/");
    /// ```
    pub fn url(mut self, url: &str) -> Self {
        self.url = Some(url.to_owned());
        self
    }

    /// Sets the name of the application using the client. Required.
    pub fn app_name(mut self, app_name: &str) -> Self {
        self.app_name = Some(app_name.to_owned());
        self
    }

    /// Sets the identifier of this client instance, sent along with every request.
    /// Defaults to `{user}-{hostname}`.
    pub fn instance_id(mut self, instance_id: &str) -> Self {
        self.instance_id = Some(instance_id.to_owned());
        self
    }

    /// Sets the [`PollingMode`] of the client.
    /// Default value is [`PollingMode::AutoPoll`] with `15` seconds poll interval.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use unleash_client::{Client, PollingMode};
    ///
    /// let builder = Client::builder()
    ///     .polling_mode(PollingMode::Manual);
    /// ```
    pub fn polling_mode(mut self, polling_mode: PollingMode) -> Self {
        self.polling_mode = Some(polling_mode);
        self
    }

    /// Sets the HTTP request timeout.
    /// Default value is `30` seconds.
    pub fn http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = Some(timeout);
        self
    }

    /// Sets the directory the default [`FileBackup`] writes into.
    /// Defaults to the system's temporary directory. Ignored when [`ClientBuilder::backup`] is set.
    pub fn backup_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.backup_path = Some(path.into());
        self
    }

    /// Sets a [`BackupStore`] implementation used to persist the last fetched toggles.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use unleash_client::{Client, NoBackup};
    ///
    /// let builder = Client::builder()
    ///     .backup(Box::new(NoBackup::new()));
    /// ```
    pub fn backup(mut self, backup: Box<dyn BackupStore>) -> Self {
        self.backup = Some(backup);
        self
    }

    /// Sets the [`StrategyRegistry`] features are evaluated with.
    /// Defaults to [`StrategyRegistry::with_builtins`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// use unleash_client::{Client, DefaultStrategy, StrategyRegistry};
    ///
    /// let mut registry = StrategyRegistry::empty();
    /// registry.register(Box::new(DefaultStrategy {}));
    ///
    /// let builder = Client::builder()
    ///     .strategies(registry);
    /// ```
    pub fn strategies(mut self, registry: StrategyRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Registers a custom [`Strategy`]. A strategy named like a built-in one replaces it.
    pub fn strategy(mut self, strategy: Box<dyn Strategy>) -> Self {
        self.strategies.push(strategy);
        self
    }

    /// Adds an HTTP header sent with every request, e.g. `Authorization`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use unleash_client::Client;
    ///
    /// let builder = Client::builder()
    ///     .custom_header("Authorization", "client-token");
    /// ```
    pub fn custom_header(mut self, name: &str, value: &str) -> Self {
        self.custom_headers.push((name.to_owned(), value.to_owned()));
        self
    }

    /// Creates a [`Client`] from the configuration made on the builder.
    ///
    /// The backup is loaded before this returns. With [`PollingMode::AutoPoll`] the polling
    /// task is spawned right away, which requires a running tokio runtime.
    ///
    /// # Errors
    ///
    /// This method fails if the URL or the application name is missing or invalid,
    /// if the poll interval is zero, or if the HTTP client can't be initialized.
    pub fn build(self) -> Result<Client, ClientError> {
        let (options, registry) = self.build_options()?;
        Client::with_options(options, registry)
    }

    pub(crate) fn build_options(self) -> Result<(Options, StrategyRegistry), ClientError> {
        let url = parse_url(self.url.as_deref())?;
        let app_name = match self.app_name {
            Some(name) if !name.trim().is_empty() => name,
            _ => {
                return Err(ClientError::new(
                    ErrorKind::MissingAppName,
                    "The application name cannot be empty.".to_owned(),
                ))
            }
        };
        let polling_mode = self
            .polling_mode
            .unwrap_or(PollingMode::AutoPoll(DEFAULT_REFRESH_INTERVAL));
        if let PollingMode::AutoPoll(interval) = polling_mode {
            if interval.is_zero() {
                return Err(ClientError::new(
                    ErrorKind::InvalidRefreshInterval,
                    "The poll interval must be greater than zero.".to_owned(),
                ));
            }
        }

        let mut registry = self.registry.unwrap_or_default();
        for strategy in self.strategies {
            registry.register(strategy);
        }

        let backup = match (self.backup, self.backup_path) {
            (Some(backup), _) => backup,
            (None, Some(path)) => Box::new(FileBackup::new(path)),
            (None, None) => Box::new(FileBackup::new(std::env::temp_dir())),
        };

        let options = Options {
            url,
            app_name,
            instance_id: self.instance_id.unwrap_or_else(generate_instance_id),
            polling_mode,
            http_timeout: self.http_timeout.unwrap_or(DEFAULT_HTTP_TIMEOUT),
            backup,
            custom_headers: self.custom_headers,
        };
        Ok((options, registry))
    }
}

fn parse_url(url: Option<&str>) -> Result<Url, ClientError> {
    let mut url = match url.map(str::trim) {
        Some(url) if !url.is_empty() => url.to_owned(),
        _ => {
            return Err(ClientError::new(
                ErrorKind::MissingUrl,
                "The toggle server URL cannot be empty.".to_owned(),
            ))
        }
    };
    if let Some(stripped) = url.strip_suffix(DEPRECATED_URL_SUFFIX) {
        warn!(event_id = ErrorKind::InvalidUrl.as_u16(); "The URL '{url}' ends with '{DEPRECATED_URL_SUFFIX}', which is deprecated. Pass the API base URL instead.");
        url = stripped.to_owned();
    }
    if !url.ends_with('/') {
        url.push('/');
    }
    let parsed = Url::parse(url.as_str()).map_err(|err| {
        ClientError::new(
            ErrorKind::InvalidUrl,
            format!("The toggle server URL '{url}' is invalid. {err}"),
        )
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(ClientError::new(
            ErrorKind::InvalidUrl,
            format!("The toggle server URL '{url}' has an unsupported scheme '{scheme}'."),
        )),
    }
}
