//! ---
//! tie_section: "04-networking-delivery"
//! tie_subsection: "module"
//! tie_type: "source"
//! tie_scope: "code"
//! tie_description: "Delivery channels and outcome reporting."
//! tie_version: "v0.1.0"
//! tie_owner: "tbd"
//! ---
//! Delivery channels for rendered messages.
//!
//! Each channel turns one message into one [`DeliveryOutcome`]. Connection problems
//! are values, not errors: the feed reports them and moves on.
#![warn(missing_docs)]

pub mod console;
pub mod http;
pub mod mllp;

use std::fmt;

use tie_common::config::{TransportConfig, TransportMode};

pub use console::{CapturedOutput, ConsoleChannel, ConsoleSink};
pub use http::HttpChannel;
pub use mllp::{MllpChannel, MllpCodec};

/// Shared result type for channel construction.
pub type Result<T> = std::result::Result<T, TransportError>;

/// Failures raised while building a channel.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The transport settings are incomplete for the selected mode.
    #[error("invalid transport configuration: {0}")]
    Config(String),
    /// The HTTP client could not be constructed.
    #[error("http client error: {0}")]
    Client(#[from] reqwest::Error),
}

/// Why a single delivery attempt did not reach its peer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryFailure {
    /// The MLLP peer refused the TCP connection.
    #[error("Failed to connect: {cause}")]
    ConnectionRefused {
        /// `host:port` that refused.
        target: String,
        /// Underlying cause as reported by the OS.
        cause: String,
    },
    /// Any other failure to reach or talk to the peer.
    #[error("Failed to connect to {url}")]
    ConnectionError {
        /// Destination that was attempted.
        url: String,
        /// Underlying cause, for diagnostics.
        cause: String,
    },
}

/// Result of handing one message to a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Written to the console.
    Printed,
    /// Accepted by a network peer.
    Sent {
        /// MSA-1 acknowledgement code, when the peer returned one.
        ack: Option<String>,
    },
    /// The attempt failed; nothing was retried.
    Failed(DeliveryFailure),
}

impl DeliveryOutcome {
    /// True for printed and sent messages.
    pub fn is_delivered(&self) -> bool {
        !matches!(self, DeliveryOutcome::Failed(_))
    }
}

/// The configured delivery channel.
pub enum Channel {
    /// Print to the console.
    Console(ConsoleChannel),
    /// POST to an HTTP endpoint.
    Http(HttpChannel),
    /// Stream over MLLP.
    Mllp(MllpChannel),
}

impl Channel {
    /// Build the channel selected by `config.mode`.
    ///
    /// `console` receives printed messages in stdout mode.
    pub fn from_config(config: &TransportConfig, console: ConsoleSink) -> Result<Self> {
        match config.mode {
            TransportMode::Stdout => Ok(Channel::Console(ConsoleChannel::new(console))),
            TransportMode::Http => {
                let url = config.http_target().ok_or_else(|| {
                    TransportError::Config("http mode requires a destination host".into())
                })?;
                Ok(Channel::Http(HttpChannel::new(url, config.connect_timeout)?))
            }
            TransportMode::Mllp => {
                let host = config.host.clone().ok_or_else(|| {
                    TransportError::Config("mllp mode requires a destination host".into())
                })?;
                let port = config.port.ok_or_else(|| {
                    TransportError::Config("mllp mode requires a destination port".into())
                })?;
                Ok(Channel::Mllp(
                    MllpChannel::new(host, port)
                        .with_connect_timeout(config.connect_timeout)
                        .with_ack_timeout(config.ack_timeout),
                ))
            }
        }
    }

    /// Deliver one message.
    pub async fn deliver(&self, message: &str) -> DeliveryOutcome {
        match self {
            Channel::Console(channel) => channel.deliver(message),
            Channel::Http(channel) => channel.deliver(message).await,
            Channel::Mllp(channel) => channel.deliver(message).await,
        }
    }

    /// Mode this channel implements.
    pub fn mode(&self) -> TransportMode {
        match self {
            Channel::Console(_) => TransportMode::Stdout,
            Channel::Http(_) => TransportMode::Http,
            Channel::Mllp(_) => TransportMode::Mllp,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Console(_) => f.write_str("stdout"),
            Channel::Http(channel) => f.write_str(channel.url()),
            Channel::Mllp(channel) => write!(f, "mllp://{}", channel.target()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failures_render_console_text() {
        let refused = DeliveryFailure::ConnectionRefused {
            target: "127.0.0.1:2575".into(),
            cause: "Connection refused (os error 111)".into(),
        };
        assert_eq!(
            refused.to_string(),
            "Failed to connect: Connection refused (os error 111)"
        );
        let error = DeliveryFailure::ConnectionError {
            url: "http://localhost:9/".into(),
            cause: "tcp connect error".into(),
        };
        assert_eq!(error.to_string(), "Failed to connect to http://localhost:9/");
    }

    #[test]
    fn stdout_mode_builds_console_channel() {
        let (sink, _captured) = ConsoleSink::capture();
        let channel = Channel::from_config(&TransportConfig::default(), sink).expect("channel");
        assert_eq!(channel.mode(), TransportMode::Stdout);
        assert_eq!(channel.to_string(), "stdout");
    }

    #[test]
    fn http_mode_composes_target_url() {
        let config = TransportConfig {
            mode: TransportMode::Http,
            host: Some("http://127.0.0.1".into()),
            port: Some(8080),
            path: Some("/lab/adt".into()),
            ..TransportConfig::default()
        };
        let (sink, _captured) = ConsoleSink::capture();
        let channel = Channel::from_config(&config, sink).expect("channel");
        assert_eq!(channel.to_string(), "http://127.0.0.1:8080/lab/adt");
    }

    #[test]
    fn mllp_mode_requires_port() {
        let config = TransportConfig {
            mode: TransportMode::Mllp,
            host: Some("127.0.0.1".into()),
            ..TransportConfig::default()
        };
        let (sink, _captured) = ConsoleSink::capture();
        assert!(matches!(
            Channel::from_config(&config, sink),
            Err(TransportError::Config(_))
        ));
    }

    #[test]
    fn only_failures_are_undelivered() {
        assert!(DeliveryOutcome::Printed.is_delivered());
        assert!(DeliveryOutcome::Sent { ack: None }.is_delivered());
        assert!(!DeliveryOutcome::Failed(DeliveryFailure::ConnectionError {
            url: "u".into(),
            cause: "c".into(),
        })
        .is_delivered());
    }
}
