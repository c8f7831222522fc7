//! ---
//! tie_section: "05-feed-orchestration"
//! tie_subsection: "module"
//! tie_type: "source"
//! tie_scope: "code"
//! tie_description: "Paced feed driver tying records, messages and channels together."
//! tie_version: "v0.1.0"
//! tie_owner: "tbd"
//! ---
//! The feed loop: load once, then build, deliver, report and pause per record until
//! the records run out or the shutdown signal fires.
#![warn(missing_docs)]

/// Feed loop and outcome reporting.
pub mod driver;

pub use driver::{report, Feed, FeedSummary};

/// Shared result type for feed runs.
pub type Result<T> = std::result::Result<T, FeedError>;

/// Fatal feed errors. Delivery failures are not among them.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// The patient input could not be loaded.
    #[error(transparent)]
    Records(#[from] tie_records::RecordError),
    /// A message failed to render.
    #[error(transparent)]
    Build(#[from] tie_msg::BuildError),
    /// The configured channel could not be built.
    #[error(transparent)]
    Transport(#[from] tie_transport::TransportError),
}
