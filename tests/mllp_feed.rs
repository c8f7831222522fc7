//! ---
//! tie_section: "07-testing-qa"
//! tie_subsection: "integration-tests"
//! tie_type: "source"
//! tie_scope: "code"
//! tie_description: "End-to-end feed runs streaming to an MLLP receiver."
//! tie_version: "v0.1.0"
//! tie_owner: "tbd"
//! ---
mod support;

use anyhow::Result;
use support::{closed_port, feed_config, patient_csv, PATIENTS};
use tie_common::config::TransportMode;
use tie_feed::Feed;
use tie_transport::mllp::{CARRIAGE_RETURN, END_BLOCK, START_BLOCK};
use tie_transport::{ConsoleSink, DeliveryOutcome, MllpChannel};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Accept `connections` connections, acknowledge one frame on each and return the raw frames.
async fn spawn_receiver(
    connections: usize,
    ack_code: &'static str,
) -> (u16, JoinHandle<Vec<Vec<u8>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind receiver");
    let port = listener.local_addr().expect("receiver address").port();
    let handle = tokio::spawn(async move {
        let mut frames = Vec::new();
        for _ in 0..connections {
            let (mut socket, _) = listener.accept().await.expect("accept");
            let mut frame = Vec::new();
            let mut chunk = [0u8; 512];
            while !frame.ends_with(&[END_BLOCK, CARRIAGE_RETURN]) {
                let read = socket.read(&mut chunk).await.expect("read frame");
                assert!(read > 0, "sender closed mid-frame");
                frame.extend_from_slice(&chunk[..read]);
            }
            let ack = format!(
                "\x0bMSH|^~\\&|HANS|NHSENGLAND|SUNNY_TIE|SUNNYSIDE|20240101120000||ACK^A01|1|P|2.4\rMSA|{}|1\x1c\x0d",
                ack_code
            );
            socket.write_all(ack.as_bytes()).await.expect("write ack");
            frames.push(frame);
        }
        frames
    });
    (port, handle)
}

#[tokio::test]
async fn each_message_travels_in_its_own_frame() -> Result<()> {
    let (port, receiver) = spawn_receiver(3, "AA").await;
    let (_dir, input) = patient_csv(&PATIENTS);
    let mut config = feed_config(input);
    config.transport.mode = TransportMode::Mllp;
    config.transport.host = Some("127.0.0.1".into());
    config.transport.port = Some(port);

    let (sink, captured) = ConsoleSink::capture();
    let summary = Feed::load(&config, sink)?
        .run(std::future::pending::<()>())
        .await?;
    let frames = receiver.await?;

    assert_eq!(summary.delivered, 3);
    assert_eq!(frames.len(), 3);
    for frame in &frames {
        assert_eq!(frame.first(), Some(&START_BLOCK));
        assert!(frame.ends_with(&[END_BLOCK, CARRIAGE_RETURN]));
        let payload = String::from_utf8_lossy(&frame[1..frame.len() - 2]);
        assert!(payload.starts_with("MSH|"));
        assert!(!payload.contains('\n'));
    }
    assert!(String::from_utf8_lossy(&frames[2]).contains("NOWAK^Ewa^Maria Anna"));
    assert_eq!(
        captured
            .lines_starting_with("[INFO] Sent message: MSH|")
            .len(),
        3
    );
    Ok(())
}

#[tokio::test]
async fn rejection_code_is_surfaced() -> Result<()> {
    let (port, receiver) = spawn_receiver(1, "AR").await;
    let outcome = MllpChannel::new("127.0.0.1", port)
        .deliver("MSH|^~\\&|SUNNY_TIE\rPID|1")
        .await;
    receiver.await?;
    assert_eq!(
        outcome,
        DeliveryOutcome::Sent {
            ack: Some("AR".into())
        }
    );
    Ok(())
}

#[tokio::test]
async fn refused_connections_are_reported_and_skipped() -> Result<()> {
    let port = closed_port().await;
    let (_dir, input) = patient_csv(&PATIENTS[..2]);
    let mut config = feed_config(input);
    config.transport.mode = TransportMode::Mllp;
    config.transport.host = Some("127.0.0.1".into());
    config.transport.port = Some(port);

    let (sink, captured) = ConsoleSink::capture();
    let summary = Feed::load(&config, sink)?
        .run(std::future::pending::<()>())
        .await?;

    assert_eq!(summary.attempted, 2);
    assert_eq!(summary.failed, 2);
    let errors = captured.lines_starting_with("[ERROR] Failed to connect: ");
    assert_eq!(errors.len(), 2);
    Ok(())
}
