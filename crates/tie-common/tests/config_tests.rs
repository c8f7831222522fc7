//! ---
//! tie_section: "01-core-functionality"
//! tie_subsection: "tests"
//! tie_type: "source"
//! tie_scope: "code"
//! tie_description: "Configuration loading behaviour."
//! tie_version: "v0.1.0"
//! tie_owner: "tbd"
//! ---
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use tempfile::NamedTempFile;
use tie_common::config::{AppConfig, TransportMode};
use tie_common::LogFormat;

#[test]
fn defaults_match_the_reference_feed() {
    let config = AppConfig::default();
    assert_eq!(config.feed.input, PathBuf::from("data/working.csv"));
    assert_eq!(config.feed.interval, Duration::from_millis(500));
    assert!(!config.feed.skip_final_record);
    assert_eq!(config.identity.sending_app, "SUNNY_TIE");
    assert_eq!(config.identity.sending_facility, "SUNNYSIDE");
    assert_eq!(config.identity.receiving_app, "HANS");
    assert_eq!(config.identity.receiving_facility, "NHSENGLAND");
    assert_eq!(config.transport.mode, TransportMode::Stdout);
    assert_eq!(config.logging.format, LogFormat::Pretty);
}

#[test]
fn parses_partial_toml_with_fractional_interval() {
    let config: AppConfig = r#"
        [feed]
        input = "fixtures/patients.csv"
        interval = 0.25
        seed = 7

        [transport]
        mode = "mllp"
        host = "127.0.0.1"
        port = 2575
        ack_timeout = 1.5
    "#
    .parse()
    .expect("valid config");

    assert_eq!(config.feed.input, PathBuf::from("fixtures/patients.csv"));
    assert_eq!(config.feed.interval, Duration::from_millis(250));
    assert_eq!(config.feed.seed, Some(7));
    assert_eq!(config.transport.mode, TransportMode::Mllp);
    assert_eq!(config.transport.ack_timeout, Duration::from_millis(1500));
    assert_eq!(config.identity.receiving_app, "HANS");
}

#[test]
fn mllp_without_port_is_rejected() {
    let result = r#"
        [transport]
        mode = "mllp"
        host = "127.0.0.1"
    "#
    .parse::<AppConfig>()
    .expect("parses")
    .validate();
    let err = result.expect_err("port is mandatory for mllp");
    assert!(err.to_string().contains("port"));
}

#[test]
fn http_without_host_is_rejected() {
    let result = r#"
        [transport]
        mode = "http"
    "#
    .parse::<AppConfig>()
    .expect("parses")
    .validate();
    assert!(result.is_err());
}

#[test]
fn http_target_must_be_a_url() {
    let result = r#"
        [transport]
        mode = "http"
        host = "no scheme here"
    "#
    .parse::<AppConfig>()
    .expect("parses")
    .validate();
    assert!(result.is_err());
}

#[test]
fn first_existing_candidate_wins() {
    let mut file = NamedTempFile::new().expect("temp file");
    writeln!(file, "[feed]\nskip_final_record = true").expect("write config");
    file.flush().expect("flush");

    let missing = PathBuf::from("does/not/exist.toml");
    let candidates = vec![missing, file.path().to_path_buf()];
    let loaded = AppConfig::load_with_source(&candidates).expect("config loads");
    assert_eq!(loaded.source.as_deref(), Some(file.path()));
    assert!(loaded.config.feed.skip_final_record);
}

#[test]
fn incomplete_transport_file_loads_and_validates_once_completed() {
    let mut file = NamedTempFile::new().expect("temp file");
    writeln!(file, "[transport]\nmode = \"mllp\"\nhost = \"127.0.0.1\"")
        .expect("write config");
    file.flush().expect("flush");

    let mut config = AppConfig::load_with_source(&[file.path()])
        .expect("incomplete file still loads")
        .config;
    assert!(config.validate().is_err());
    config.transport.port = Some(2575);
    assert!(config.validate().is_ok());
}

#[test]
fn no_candidates_falls_back_to_defaults() {
    let candidates = [PathBuf::from("does/not/exist.toml")];
    let loaded = AppConfig::load_with_source(&candidates).expect("defaults");
    assert!(loaded.source.is_none());
    assert_eq!(loaded.config.transport.mode, TransportMode::Stdout);
}

#[test]
fn shipped_profile_parses_to_defaults() {
    let shipped: AppConfig = include_str!("../../../configs/tie.toml")
        .parse()
        .expect("shipped profile parses");
    let defaults = AppConfig::default();
    assert_eq!(shipped.feed.input, defaults.feed.input);
    assert_eq!(shipped.feed.interval, defaults.feed.interval);
    assert_eq!(shipped.identity, defaults.identity);
    assert_eq!(shipped.transport.mode, defaults.transport.mode);
    assert_eq!(shipped.transport.ack_timeout, defaults.transport.ack_timeout);
}
