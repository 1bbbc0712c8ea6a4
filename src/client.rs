use crate::builder::{ClientBuilder, Options};
use crate::errors::{ClientError, ErrorKind};
use crate::eval::details::EvaluationDetails;
use crate::eval::evaluator::{eval_feature, EvalResult};
use crate::events::EventForwarder;
use crate::fetch::refresher::Refresher;
use crate::model::feature::Feature;
use crate::strategy::StrategyRegistry;
use crate::Context;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::timeout;

/// The main component for evaluating feature toggles.
///
/// Evaluation is synchronous and works on the last feature set fetched from the toggle server
/// (or restored from the backup), which is kept up to date in the background.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use unleash_client::{Client, Context, PollingMode};
///
/// #[tokio::main]
/// async fn main() {
///     let client = Client::builder()
///         .url("https://unleash.example.com/api/")
///         .app_name("my-app")
///         .polling_mode(PollingMode::AutoPoll(Duration::from_secs(30)))
///         .build()
///         .unwrap();
///
///     let context = Context::new().user_id("user-id");
///     let is_enabled = client.is_enabled("new-checkout", Some(&context), false);
/// }
/// ```
pub struct Client {
    options: Arc<Options>,
    registry: StrategyRegistry,
    refresher: Refresher,
    events: Arc<EventForwarder>,
    unknown_strategies: Mutex<HashSet<String>>,
}

impl Client {
    pub(crate) fn with_options(
        options: Options,
        registry: StrategyRegistry,
    ) -> Result<Self, ClientError> {
        let opts = Arc::new(options);
        let events = Arc::new(EventForwarder::new());
        let refresher = Refresher::new(&opts, &events)?;
        debug!(
            "Client created for '{}' polling {}",
            opts.app_name(),
            opts.url()
        );
        Ok(Self {
            options: opts,
            registry,
            refresher,
            events,
            unknown_strategies: Mutex::new(HashSet::new()),
        })
    }

    /// Creates a new [`ClientBuilder`] used to build a [`Client`].
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use unleash_client::{Client, PollingMode};
    ///
    /// let client = Client::builder()
    ///     .url("https://unleash.example.com/api/")
    ///     .app_name("my-app")
    ///     .polling_mode(PollingMode::Manual)
    ///     .build()
    ///     .unwrap();
    /// ```
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Creates a new [`Client`] with default options.
    ///
    /// # Errors
    ///
    /// This method fails if the URL or the application name is empty or invalid.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use unleash_client::Client;
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     let client = Client::new("https://unleash.example.com/api/", "my-app").unwrap();
    /// }
    /// ```
    pub fn new(url: &str, app_name: &str) -> Result<Self, ClientError> {
        ClientBuilder::new().url(url).app_name(app_name).build()
    }

    /// Evaluates the feature toggle identified by `name`.
    ///
    /// Returns `fallback` if the feature doesn't exist, `false` if it's disabled or none of its
    /// strategies match `context`. Never fails and never waits on I/O.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use unleash_client::{Client, Context};
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     let client = Client::new("https://unleash.example.com/api/", "my-app").unwrap();
    ///
    ///     let context = Context::new().user_id("user-id");
    ///     let enabled = client.is_enabled("new-checkout", Some(&context), false);
    /// }
    /// ```
    pub fn is_enabled(&self, name: &str, context: Option<&Context>, fallback: bool) -> bool {
        match self.refresher.get(name) {
            Some(feature) => self.eval(&feature, context).is_enabled(),
            None => fallback,
        }
    }

    /// The same as [`Client::is_enabled`] but returns an [`EvaluationDetails`] that
    /// contains additional information about the result of the evaluation.
    pub fn is_enabled_details(
        &self,
        name: &str,
        context: Option<&Context>,
        fallback: bool,
    ) -> EvaluationDetails {
        let snapshot = self.refresher.snapshot();
        let Some(feature) = snapshot.features.get(name) else {
            let err = ClientError::new(
                ErrorKind::FeatureNotFound,
                format!("Feature '{name}' was not found. Returning the fallback value: '{fallback}'."),
            );
            debug!(event_id = err.kind.as_u16(); "{}", err);
            return EvaluationDetails::from_err(fallback, name, err);
        };

        let result = self.eval(feature, context);
        let fetch_time = Some(snapshot.fetch_time).filter(|time| *time != DateTime::<Utc>::MIN_UTC);
        EvaluationDetails::from_result(name, result, fetch_time)
    }

    /// Returns the names of all known feature toggles, sorted.
    ///
    /// If there's no feature set to work on, this method returns an empty [`Vec`].
    pub fn feature_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.refresher.snapshot().features.keys().cloned().collect();
        names.sort();
        names
    }

    /// Completes once the first feature set was applied, either fetched from the toggle server
    /// or restored from the backup. Completes immediately if that already happened.
    pub async fn ready(&self) {
        self.refresher.wait_for_ready().await
    }

    /// Returns `true` once the first feature set was applied.
    pub fn is_ready(&self) -> bool {
        self.refresher.is_ready()
    }

    /// Asynchronously waits for the initialization of the [`Client`] for a maximum duration specified in `wait_timeout`.
    ///
    /// This method fails if the initialization takes more time than the specified `wait_timeout`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::time::Duration;
    /// use unleash_client::Client;
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     let client = Client::new("https://unleash.example.com/api/", "my-app").unwrap();
    ///     client.wait_for_ready(Duration::from_secs(5)).await.unwrap();
    /// }
    /// ```
    pub async fn wait_for_ready(&self, wait_timeout: Duration) -> Result<(), ClientError> {
        match timeout(wait_timeout, self.refresher.wait_for_ready()).await {
            Ok(()) => Ok(()),
            Err(_) => {
                let err = ClientError::new(
                    ErrorKind::ClientInitTimedOut,
                    format!(
                        "Client initialization timed out after {}ms.",
                        wait_timeout.as_millis()
                    ),
                );
                warn!(event_id = err.kind.as_u16(); "{}", err);
                Err(err)
            }
        }
    }

    /// Subscribes to the warnings produced in the background, like backup or unknown strategy issues.
    ///
    /// Only events produced after subscribing are received. A receiver falling behind
    /// loses the oldest events and observes [`broadcast::error::RecvError::Lagged`].
    pub fn warnings(&self) -> broadcast::Receiver<ClientError> {
        self.events.subscribe_warnings()
    }

    /// Subscribes to the errors of the background refreshes, like failed HTTP requests.
    ///
    /// Only events produced after subscribing are received. A receiver falling behind
    /// loses the oldest events and observes [`broadcast::error::RecvError::Lagged`].
    pub fn errors(&self) -> broadcast::Receiver<ClientError> {
        self.events.subscribe_errors()
    }

    /// Fetches the feature toggles from the toggle server right away.
    ///
    /// # Errors
    ///
    /// This method fails if the client is closed, or the HTTP request fails. Failures are
    /// also delivered to the [`Client::errors`] subscribers.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use unleash_client::{Client, PollingMode};
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     let client = Client::builder()
    ///         .url("https://unleash.example.com/api/")
    ///         .app_name("my-app")
    ///         .polling_mode(PollingMode::Manual)
    ///         .build()
    ///         .unwrap();
    ///
    ///     client.refresh().await.unwrap();
    /// }
    /// ```
    pub async fn refresh(&self) -> Result<(), ClientError> {
        self.refresher.refresh().await
    }

    /// Time of the last successful check with the toggle server, if any.
    pub fn last_successful_check(&self) -> Option<DateTime<Utc>> {
        self.refresher.last_check()
    }

    /// Stops the background refreshes.
    ///
    /// Once this returns, no fetched feature set is applied anymore. Evaluation keeps working
    /// on the last applied one. Calling it more than once has no effect, dropping the
    /// [`Client`] closes it as well.
    pub fn close(&self) -> Result<(), ClientError> {
        self.refresher.close();
        debug!("Client for '{}' closed", self.options.app_name());
        Ok(())
    }

    fn eval(&self, feature: &Feature, context: Option<&Context>) -> EvalResult {
        let empty;
        let context = match context {
            Some(context) => context,
            None => {
                empty = Context::new();
                &empty
            }
        };
        eval_feature(feature, context, &self.registry, &|strategy| {
            self.unknown_strategy(strategy)
        })
    }

    fn unknown_strategy(&self, name: &str) {
        let first = self
            .unknown_strategies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_owned());
        if first {
            self.events.warn(ClientError::new(
                ErrorKind::UnknownStrategy,
                format!("Strategy '{name}' is not registered, features using it won't be enabled by it."),
            ));
        }
    }
}
