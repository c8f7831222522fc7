//! ---
//! tie_section: "07-testing-qa"
//! tie_subsection: "integration-tests"
//! tie_type: "source"
//! tie_scope: "code"
//! tie_description: "Shared fixtures for the feed integration suites."
//! tie_version: "v0.1.0"
//! tie_owner: "tbd"
//! ---
#![allow(dead_code)]

use std::path::PathBuf;
use std::time::Duration;

use tempfile::TempDir;
use tie_common::config::AppConfig;

pub const HEADER: &str = "nhs_number,dob,family_name,given_names";

pub const PATIENTS: [&str; 3] = [
    "9434765919,1962-07-14,SMITH,Jane Alice",
    "9434765870,1985-11-02,OKAFOR,Chidi",
    "9434765828,2001-01-30,NOWAK,Ewa Maria Anna",
];

/// Write a patient CSV with a header row into a fresh temporary directory.
pub fn patient_csv(rows: &[&str]) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("working.csv");
    let mut contents = String::from(HEADER);
    contents.push('\n');
    for row in rows {
        contents.push_str(row);
        contents.push('\n');
    }
    std::fs::write(&path, contents).expect("write patient csv");
    (dir, path)
}

/// Seeded, unpaced configuration reading `input`.
pub fn feed_config(input: PathBuf) -> AppConfig {
    let mut config = AppConfig::default();
    config.feed.input = input;
    config.feed.interval = Duration::ZERO;
    config.feed.seed = Some(42);
    config
}

/// A localhost port with nothing listening on it.
pub async fn closed_port() -> u16 {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind probe listener");
    let port = listener.local_addr().expect("probe address").port();
    drop(listener);
    port
}
