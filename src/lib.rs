//! Feature toggle client for Rust.
//!
//! The [`Client`] keeps a local copy of the feature toggles defined on an Unleash-compatible
//! toggle server, refreshes it in the background, and evaluates the toggles synchronously
//! against a [`Context`] with the registered activation [`Strategy`] implementations.

#![warn(missing_docs)]

mod backup;
mod builder;
mod client;
mod constants;
mod context;
mod errors;
mod eval;
mod events;
mod fetch;
mod model;
mod modes;
mod strategy;
mod utils;

pub use backup::{BackupStore, FileBackup, NoBackup};
pub use client::Client;
pub use constants::PKG_VERSION;
pub use context::Context;
pub use errors::{ClientError, ErrorKind};
pub use eval::details::EvaluationDetails;

pub use model::feature::{ActivationConstraint, Feature};

pub use strategy::builtin::{
    ApplicationHostnameStrategy, DefaultStrategy, RemoteAddressStrategy, UserWithIdStrategy,
};
pub use strategy::rollout::{
    normalized_value, GradualRolloutRandom, GradualRolloutSessionId, GradualRolloutUserId,
};
pub use strategy::{Strategy, StrategyRegistry};

pub use builder::ClientBuilder;
pub use modes::PollingMode;
