//! ---
//! tie_section: "04-networking-delivery"
//! tie_subsection: "module"
//! tie_type: "source"
//! tie_scope: "code"
//! tie_description: "Delivery channels and outcome reporting."
//! tie_version: "v0.1.0"
//! tie_owner: "tbd"
//! ---
//! MLLP framing and the streaming channel.
//!
//! ```text
//! +------+-------------------+------+------+
//! | 0x0B | HL7 message bytes | 0x1C | 0x0D |
//! +------+-------------------+------+------+
//! ```
use std::io;
use std::time::Duration;

use bytes::{Buf, BufMut, BytesMut};
use futures::{SinkExt, StreamExt};
use tie_msg::segments;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::codec::{Decoder, Encoder, Framed};
use tracing::{debug, warn};

use crate::{DeliveryFailure, DeliveryOutcome};

/// Start block.
pub const START_BLOCK: u8 = 0x0B;
/// First end block byte.
pub const END_BLOCK: u8 = 0x1C;
/// Trailing carriage return after the end block.
pub const CARRIAGE_RETURN: u8 = 0x0D;

const DEFAULT_MAX_FRAME_LEN: usize = 1024 * 1024;

/// `tokio_util` codec wrapping and unwrapping MLLP frames.
#[derive(Debug, Clone)]
pub struct MllpCodec {
    max_frame_len: usize,
}

impl MllpCodec {
    /// Codec rejecting inbound frames longer than `max_frame_len` bytes.
    pub fn with_max_frame_len(max_frame_len: usize) -> Self {
        Self { max_frame_len }
    }
}

impl Default for MllpCodec {
    fn default() -> Self {
        Self::with_max_frame_len(DEFAULT_MAX_FRAME_LEN)
    }
}

impl<'a> Encoder<&'a str> for MllpCodec {
    type Error = io::Error;

    fn encode(&mut self, message: &'a str, dst: &mut BytesMut) -> io::Result<()> {
        dst.reserve(message.len() + 3);
        dst.put_u8(START_BLOCK);
        dst.put_slice(message.as_bytes());
        dst.put_u8(END_BLOCK);
        dst.put_u8(CARRIAGE_RETURN);
        Ok(())
    }
}

impl Decoder for MllpCodec {
    type Item = BytesMut;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> io::Result<Option<BytesMut>> {
        // Bytes ahead of a start block belong to no frame.
        let Some(start) = src.iter().position(|byte| *byte == START_BLOCK) else {
            src.clear();
            return Ok(None);
        };
        src.advance(start);

        let Some(end) = src
            .windows(2)
            .position(|pair| pair == [END_BLOCK, CARRIAGE_RETURN])
        else {
            if src.len() > self.max_frame_len {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("mllp frame exceeds {} bytes", self.max_frame_len),
                ));
            }
            return Ok(None);
        };

        let mut frame = src.split_to(end + 2);
        frame.advance(1);
        frame.truncate(frame.len() - 2);
        Ok(Some(frame))
    }
}

/// Extract the MSA-1 acknowledgement code from an ACK message.
pub fn ack_code(ack: &str) -> Option<&str> {
    segments(ack)
        .find(|segment| segment.starts_with("MSA|"))
        .and_then(|msa| msa.split('|').nth(1))
        .filter(|code| !code.is_empty())
}

/// Opens one TCP connection per message and sends it MLLP-framed.
#[derive(Debug, Clone)]
pub struct MllpChannel {
    host: String,
    port: u16,
    connect_timeout: Duration,
    ack_timeout: Duration,
}

impl MllpChannel {
    /// Channel streaming to `host:port` with default timeouts.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            connect_timeout: Duration::from_secs(5),
            ack_timeout: Duration::from_secs(5),
        }
    }

    /// Give up on connecting after `connect_timeout`.
    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    /// Wait at most `ack_timeout` for the peer's acknowledgement.
    pub fn with_ack_timeout(mut self, ack_timeout: Duration) -> Self {
        self.ack_timeout = ack_timeout;
        self
    }

    /// `host:port` of the peer.
    pub fn target(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Send `message` and classify the result.
    pub async fn deliver(&self, message: &str) -> DeliveryOutcome {
        match self.exchange(message).await {
            Ok(ack) => DeliveryOutcome::Sent { ack },
            Err(err) if err.kind() == io::ErrorKind::ConnectionRefused => {
                warn!(peer = %self.target(), error = %err, "mllp connection refused");
                DeliveryOutcome::Failed(DeliveryFailure::ConnectionRefused {
                    target: self.target(),
                    cause: err.to_string(),
                })
            }
            Err(err) => {
                warn!(peer = %self.target(), error = %err, "mllp delivery failed");
                DeliveryOutcome::Failed(DeliveryFailure::ConnectionError {
                    url: format!("mllp://{}", self.target()),
                    cause: err.to_string(),
                })
            }
        }
    }

    // The connection lives only inside this call and is dropped on every return path.
    async fn exchange(&self, message: &str) -> io::Result<Option<String>> {
        let stream = timeout(
            self.connect_timeout,
            TcpStream::connect((self.host.as_str(), self.port)),
        )
        .await
        .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "mllp connect timed out"))??;

        let mut framed = Framed::new(stream, MllpCodec::default());
        framed.send(message).await?;

        let ack = match timeout(self.ack_timeout, framed.next()).await {
            Ok(Some(Ok(frame))) => {
                let ack = String::from_utf8_lossy(&frame).into_owned();
                debug!(peer = %self.target(), ack = %ack.replace('\r', "\\r"), "mllp ack received");
                ack_code(&ack).map(str::to_owned)
            }
            Ok(Some(Err(err))) => {
                warn!(peer = %self.target(), error = %err, "unreadable mllp ack");
                None
            }
            Ok(None) => {
                warn!(peer = %self.target(), "peer closed without acknowledging");
                None
            }
            Err(_) => {
                warn!(peer = %self.target(), timeout = ?self.ack_timeout, "no mllp ack before timeout");
                None
            }
        };
        Ok(ack)
    }
}
