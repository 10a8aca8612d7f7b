//! Core types and configuration for gitship.
//!
//! This crate defines the `gitship.toml` schema ([`GitshipConfig`]),
//! the push-trigger payload ([`PushEvent`]), the function manifest
//! ([`Stack`]), the commit-status document ([`Status`]), and shared
//! error types.

pub mod config;
pub mod error;
pub mod event;
pub mod stack;
pub mod status;

pub use config::{
    BuildConfig, DispatchPolicy, GatewayConfig, GitshipConfig, StatusConfig, WorkspaceConfig,
};
pub use error::{Error, Result};
pub use event::{DeployedFunction, GarbageRequest, PushEvent};
pub use stack::{FunctionDefinition, ManifestParser, Stack, YamlManifestParser};
pub use status::{CommitState, CommitStatus, Status, StatusEvent};
