//! ---
//! tie_section: "03-message-construction"
//! tie_subsection: "module"
//! tie_type: "source"
//! tie_scope: "code"
//! tie_description: "HL7 v2 message construction and segment helpers."
//! tie_version: "v0.1.0"
//! tie_owner: "tbd"
//! ---
use askama::Template;
use chrono::{Local, NaiveDateTime};
use rand::prelude::*;
use tie_common::config::IdentityConfig;
use tie_records::PatientRecord;
use tracing::trace;

use crate::{to_segment_terminators, Result};

/// Simulated PV1 locations. Unrelated to the source patient data.
pub const WARDS: [&str; 7] = [
    "Heywood Ward",
    "Seacole Ward",
    "Mason Ward",
    "Fry Ward",
    "Bevan Ward",
    "Nightingale Ward",
    "Willink Ward",
];

const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// MSH header fields shared by every message in a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHeader<'a> {
    /// MSH-3.
    pub sending_app: &'a str,
    /// MSH-4.
    pub sending_facility: &'a str,
    /// MSH-5.
    pub receiving_app: &'a str,
    /// MSH-6.
    pub receiving_facility: &'a str,
    /// MSH-7, `YYYYMMDDHHMMSS`.
    pub timestamp: String,
}

/// Everything the `vanilla.hl7` template sees for one message.
#[derive(Debug, Template)]
#[template(path = "vanilla.hl7", escape = "none")]
pub struct MessageContext<'a> {
    /// Patient the message is about.
    pub patient: &'a PatientRecord,
    /// Sender, receiver and timestamp.
    pub header: MessageHeader<'a>,
    /// MSH-10 message control id.
    pub control_id: String,
    /// PV1-3 assigned location.
    pub ward: &'static str,
}

/// Renders one message per patient record.
///
/// The random source drives both control identifiers and ward selection; seed it
/// with [`MessageBuilder::seeded`] for reproducible output.
pub struct MessageBuilder {
    identity: IdentityConfig,
    rng: StdRng,
    clock: fn() -> NaiveDateTime,
}

impl MessageBuilder {
    /// Builder drawing randomness from the operating system.
    pub fn new(identity: IdentityConfig) -> Self {
        Self::with_rng(identity, StdRng::from_entropy())
    }

    /// Builder with a deterministic random source.
    pub fn seeded(identity: IdentityConfig, seed: u64) -> Self {
        Self::with_rng(identity, StdRng::seed_from_u64(seed))
    }

    fn with_rng(identity: IdentityConfig, rng: StdRng) -> Self {
        Self {
            identity,
            rng,
            clock: || Local::now().naive_local(),
        }
    }

    /// Replace the wall clock used for MSH-7 and EVN-2.
    pub fn with_clock(mut self, clock: fn() -> NaiveDateTime) -> Self {
        self.clock = clock;
        self
    }

    /// Fresh 128-bit random control identifier.
    pub fn next_control_id(&mut self) -> String {
        let bytes: [u8; 16] = self.rng.gen();
        uuid::Builder::from_random_bytes(bytes)
            .into_uuid()
            .hyphenated()
            .to_string()
    }

    /// Uniformly chosen ward from [`WARDS`].
    pub fn next_ward(&mut self) -> &'static str {
        WARDS[self.rng.gen_range(0..WARDS.len())]
    }

    /// Assemble the template context: header, then control id, then ward.
    pub fn context<'a>(&'a mut self, patient: &'a PatientRecord) -> MessageContext<'a> {
        let timestamp = (self.clock)().format(TIMESTAMP_FORMAT).to_string();
        let control_id = self.next_control_id();
        let ward = self.next_ward();
        let identity = &self.identity;
        MessageContext {
            patient,
            header: MessageHeader {
                sending_app: &identity.sending_app,
                sending_facility: &identity.sending_facility,
                receiving_app: &identity.receiving_app,
                receiving_facility: &identity.receiving_facility,
                timestamp,
            },
            control_id,
            ward,
        }
    }

    /// Render `patient` into a wire-ready message with `\r` segment terminators.
    pub fn render(&mut self, patient: &PatientRecord) -> Result<String> {
        let context = self.context(patient);
        trace!(control_id = %context.control_id, ward = context.ward, "rendering message");
        let raw = context.render()?;
        Ok(to_segment_terminators(&raw))
    }
}
