use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Once, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, info};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::builder::Options;
use crate::constants::MAX_BACKOFF_MULTIPLIER;
use crate::errors::{ClientError, ErrorKind};
use crate::events::EventForwarder;
use crate::fetch::fetcher::{FetchResponse, Fetcher};
use crate::fetch::store::{PublishOutcome, SnapshotStore};
use crate::model::feature::{snapshot_from_backup, Feature, Snapshot};
use crate::modes::PollingMode;

struct RefresherState {
    fetcher: Fetcher,
    store: SnapshotStore,
    events: Arc<EventForwarder>,
    // Guards publishing against `close()`: once it is set, no fetch result is applied.
    closed: Mutex<bool>,
    // Serializes the polling loop and manual refreshes, the store has a single writer.
    refresh_lock: tokio::sync::Mutex<()>,
    // Set while the current snapshot is not yet in the backup.
    backup_dirty: AtomicBool,
    ready: watch::Sender<bool>,
    init: Once,
}

impl RefresherState {
    fn initialized(&self) {
        self.init.call_once(|| {
            info!(event_id = 0; "Feature toggle client is ready");
            self.ready.send_replace(true);
        });
    }

    fn is_closed(&self) -> bool {
        *self.closed.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Keeps the [`SnapshotStore`] up to date with the toggle server and the backup.
pub struct Refresher {
    state: Arc<RefresherState>,
    options: Arc<Options>,
    cancellation_token: CancellationToken,
    close: Once,
}

impl Refresher {
    /// Restores the backup (if any) and starts polling when the polling mode asks for it.
    ///
    /// Polling spawns a task, so with [`PollingMode::AutoPoll`] this has to be called
    /// from within a tokio runtime.
    pub fn new(opts: &Arc<Options>, events: &Arc<EventForwarder>) -> Result<Self, ClientError> {
        let fetcher = Fetcher::new(
            opts.url(),
            opts.app_name(),
            opts.instance_id(),
            opts.custom_headers(),
            *opts.http_timeout(),
        )?;
        let (ready, _) = watch::channel(false);
        let refresher = Self {
            state: Arc::new(RefresherState {
                fetcher,
                store: SnapshotStore::new(),
                events: Arc::clone(events),
                closed: Mutex::new(false),
                refresh_lock: tokio::sync::Mutex::new(()),
                backup_dirty: AtomicBool::new(false),
                ready,
                init: Once::new(),
            }),
            options: Arc::clone(opts),
            cancellation_token: CancellationToken::new(),
            close: Once::new(),
        };

        restore_backup(&refresher.state, &refresher.options);

        if let PollingMode::AutoPoll(interval) = opts.polling_mode() {
            refresher.start_poll(*interval);
        }

        Ok(refresher)
    }

    pub fn get(&self, name: &str) -> Option<Arc<Feature>> {
        self.state.store.get(name)
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.state.store.current()
    }

    pub fn last_check(&self) -> Option<DateTime<Utc>> {
        self.state.store.last_check()
    }

    /// Fetches the features right away, outside of the polling schedule.
    pub async fn refresh(&self) -> Result<(), ClientError> {
        refresh_features(&self.state, &self.options).await
    }

    pub fn is_ready(&self) -> bool {
        *self.state.ready.borrow()
    }

    /// Completes once the first feature set was applied, from the server or from the backup.
    pub async fn wait_for_ready(&self) {
        let mut receiver = self.state.ready.subscribe();
        // The sender lives as long as `self`, so waiting can't fail.
        _ = receiver.wait_for(|ready| *ready).await;
    }

    /// Stops polling. The last applied feature set stays readable.
    pub fn close(&self) {
        self.close.call_once(|| {
            *self
                .state
                .closed
                .lock()
                .unwrap_or_else(PoisonError::into_inner) = true;
            self.cancellation_token.cancel();
            debug!("Refresher closed");
        });
    }

    fn start_poll(&self, interval: Duration) {
        let state = Arc::clone(&self.state);
        let opts = Arc::clone(&self.options);
        let token = self.cancellation_token.clone();

        tokio::spawn(async move {
            let mut failures = 0u32;
            loop {
                let result = tokio::select! {
                    result = refresh_features(&state, &opts) => result,
                    _ = token.cancelled() => break
                };
                failures = match result {
                    Ok(()) => 0,
                    Err(_) => failures.saturating_add(1),
                };
                tokio::select! {
                    _ = tokio::time::sleep(next_wait(interval, failures)) => {},
                    _ = token.cancelled() => break
                }
            }
            debug!("Polling stopped");
        });
    }
}

impl Drop for Refresher {
    fn drop(&mut self) {
        self.close();
    }
}

/// The wait before the next poll, stretched linearly after consecutive failures.
fn next_wait(interval: Duration, failures: u32) -> Duration {
    interval * failures.saturating_add(1).min(MAX_BACKOFF_MULTIPLIER)
}

fn closed_error() -> ClientError {
    ClientError::new(
        ErrorKind::ClientClosed,
        "The client is closed, the fetched features are discarded.".to_owned(),
    )
}

async fn refresh_features(
    state: &Arc<RefresherState>,
    options: &Arc<Options>,
) -> Result<(), ClientError> {
    let _guard = state.refresh_lock.lock().await;
    if state.is_closed() {
        return Err(closed_error());
    }

    let etag = state.store.current().version.clone();
    debug!("Fetching features from {}", state.fetcher.features_url());
    match state.fetcher.fetch(&etag).await {
        FetchResponse::Fetched(snapshot) => {
            let outcome = apply(state, snapshot)?;
            if outcome == PublishOutcome::Published || state.backup_dirty.load(Ordering::SeqCst) {
                save_backup(state, options);
            }
            state.initialized();
            Ok(())
        }
        FetchResponse::NotModified => {
            touch(state)?;
            if state.backup_dirty.load(Ordering::SeqCst) {
                save_backup(state, options);
            }
            state.initialized();
            Ok(())
        }
        FetchResponse::Failed(err, transient) => {
            if !transient {
                debug!("The toggle server refused the request, retrying won't help until the configuration changes");
            }
            state.events.error(err.clone());
            Err(err)
        }
    }
}

fn apply(state: &RefresherState, snapshot: Snapshot) -> Result<PublishOutcome, ClientError> {
    let closed = state.closed.lock().unwrap_or_else(PoisonError::into_inner);
    if *closed {
        debug!("Discarding fetched features, the client was closed during the fetch");
        return Err(closed_error());
    }
    let outcome = state.store.publish(snapshot);
    debug!("Fetched features applied: {outcome:?}");
    Ok(outcome)
}

fn touch(state: &RefresherState) -> Result<(), ClientError> {
    let closed = state.closed.lock().unwrap_or_else(PoisonError::into_inner);
    if *closed {
        return Err(closed_error());
    }
    state.store.touch();
    Ok(())
}

fn save_backup(state: &RefresherState, options: &Options) {
    let result = state
        .store
        .current()
        .serialize()
        .map_err(|err| {
            ClientError::new(
                ErrorKind::BackupWriteFailure,
                format!("Failed to serialize the features for the backup. {err}"),
            )
        })
        .and_then(|content| options.backup().save(options.app_name(), content.as_str()));
    state.backup_dirty.store(result.is_err(), Ordering::SeqCst);
    if let Err(err) = result {
        state.events.warn(err);
    }
}

fn restore_backup(state: &RefresherState, options: &Options) {
    match options.backup().load(options.app_name()) {
        Ok(Some(content)) => match snapshot_from_backup(content.as_str()) {
            Ok(snapshot) => {
                debug!("Restored {} features from the backup", snapshot.features.len());
                state.store.restore(snapshot);
                state.initialized();
            }
            Err(err) => state.events.warn(ClientError::new(
                ErrorKind::BackupReadFailure,
                format!("The backup is invalid, starting without it. {err}"),
            )),
        },
        Ok(None) => debug!("No backup found"),
        Err(err) => state.events.warn(err),
    }
}
