//! ---
//! tie_section: "01-core-functionality"
//! tie_subsection: "module"
//! tie_type: "source"
//! tie_scope: "code"
//! tie_description: "Shared primitives and utilities for the feed runtime."
//! tie_version: "v0.1.0"
//! tie_owner: "tbd"
//! ---
//! Core shared primitives for the TIE workspace.
//! This crate exposes configuration loading and tracing initialisation
//! consumed by the feed driver and the `tie` binary.

pub mod config;
pub mod logging;

pub use config::{
    AppConfig, FeedConfig, IdentityConfig, LoadedAppConfig, LoggingConfig, TransportConfig,
    TransportMode,
};
pub use logging::{init_tracing, LogFormat};
