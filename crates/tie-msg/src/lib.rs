//! ---
//! tie_section: "03-message-construction"
//! tie_subsection: "module"
//! tie_type: "source"
//! tie_scope: "code"
//! tie_description: "HL7 v2 message construction and segment helpers."
//! tie_version: "v0.1.0"
//! tie_owner: "tbd"
//! ---
//! Turns [`tie_records::PatientRecord`]s into HL7 v2 ADT messages.
//!
//! Messages leave this crate with `\r` as the only segment terminator.
#![warn(missing_docs)]

pub mod builder;

pub use builder::{MessageBuilder, MessageContext, MessageHeader, WARDS};

/// HL7 v2 segment terminator.
pub const SEGMENT_TERMINATOR: char = '\r';

/// Shared result type for message construction.
pub type Result<T> = std::result::Result<T, BuildError>;

/// Failures raised while rendering a message.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// The message template failed to render.
    #[error("template rendering failed: {0}")]
    Template(#[from] askama::Error),
}

/// Replace authored line breaks with the segment terminator.
///
/// `\r\n` pairs collapse to a single `\r` so no line feed survives. Trailing line
/// breaks are dropped; the final segment is not terminated.
pub fn to_segment_terminators(raw: &str) -> String {
    raw.trim_end_matches(['\r', '\n'])
        .replace("\r\n", "\r")
        .replace('\n', "\r")
}

/// Human-readable rendering of a wire message, one segment per line.
pub fn to_display(message: &str) -> String {
    message.replace(SEGMENT_TERMINATOR, "\r\n")
}

/// Iterate over the segments of a wire message.
pub fn segments(message: &str) -> impl Iterator<Item = &str> {
    message
        .split(SEGMENT_TERMINATOR)
        .filter(|segment| !segment.is_empty())
}
