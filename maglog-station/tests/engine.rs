use std::fs;
use std::time::Duration;

use tempfile::tempdir;

use maglog_core::{DeviceId, SensorRecord, encode_hex};
use maglog_link::{FrameLink, MockLink};
use maglog_station::{Engine, EventLogger};

const DEV: DeviceId = DeviceId('A');

fn engine_under_test() -> (Engine<MockLink>, MockLink, tempfile::TempDir) {
    let dir = tempdir().unwrap();
    let logger = EventLogger::new(dir.path().join("data"), None).unwrap();
    let (link, peer) = MockLink::pair(16);
    (Engine::new(link, logger), peer, dir)
}

fn record_line(code: &str, device: char, record: &SensorRecord) -> String {
    format!("{code}{device}{}", encode_hex(&record.encode()))
}

#[tokio::test(start_paused = true)]
async fn init_announces_the_station() {
    let (mut engine, mut peer, _dir) = engine_under_test();

    engine.init().await.unwrap();

    let frame = peer.recv(Duration::from_millis(100)).await.unwrap();
    assert_eq!(frame, Some(b"STA".to_vec()));
}

#[tokio::test(start_paused = true)]
async fn send_time_reports_acknowledgement() {
    let (mut engine, mut peer, _dir) = engine_under_test();

    peer.send(b"OKE").await.unwrap();
    let acknowledged = engine.send_time(Duration::from_secs(5)).await.unwrap();
    assert!(acknowledged);

    let frame = peer.recv(Duration::from_millis(100)).await.unwrap().unwrap();
    let line = String::from_utf8(frame).unwrap();
    let mut parts = line.split_whitespace();
    assert_eq!(parts.next(), Some("TIM"));
    assert!(parts.next().unwrap().parse::<i64>().is_ok());
}

#[tokio::test(start_paused = true)]
async fn send_time_times_out_without_acknowledgement() {
    let (mut engine, mut peer, _dir) = engine_under_test();

    peer.send(b"LOGAnot-an-ack").await.unwrap();
    let acknowledged = engine.send_time(Duration::from_secs(3)).await.unwrap();
    assert!(!acknowledged);
}

#[tokio::test]
async fn summary_frame_reaches_the_logger() {
    let (mut engine, _peer, _dir) = engine_under_test();

    let record = SensorRecord::new(1000, 2, 23.5, 60.0);
    engine.handle_line(&record_line("LOG", 'A', &record)).unwrap();

    let summaries = &engine.logger().device(DEV).unwrap().summaries;
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].ticks, 1000);
    assert!((summaries[0].temperature - 23.5).abs() < 1e-6);

    let content =
        fs::read_to_string(engine.logger().day_dir().join("summary.log")).unwrap();
    assert_eq!(content.lines().count(), 1);
}

#[tokio::test]
async fn event_frame_backfills_the_event_log() {
    let (mut engine, _peer, _dir) = engine_under_test();

    let record = SensorRecord::new(1000, 3, 20.0, 0.0);
    engine.handle_line(&record_line("EVN", 'A', &record)).unwrap();

    assert_eq!(engine.logger().device(DEV).unwrap().events.len(), 3);
    let content = fs::read_to_string(engine.logger().day_dir().join("events.log")).unwrap();
    assert_eq!(content.lines().count(), 1);
}

#[tokio::test]
async fn checksum_mismatch_is_logged_but_ingested() {
    let (mut engine, _peer, _dir) = engine_under_test();

    let record = SensorRecord::new(4242, 1, 19.5, 5.0);
    let mut bytes = record.encode();
    bytes[18] ^= 0xFF;
    engine
        .handle_line(&format!("LOGA{}", encode_hex(&bytes)))
        .unwrap();

    let summaries = &engine.logger().device(DEV).unwrap().summaries;
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].ticks, 4242);
}

#[tokio::test]
async fn bad_hex_payload_is_dropped() {
    let (mut engine, _peer, _dir) = engine_under_test();

    engine.handle_line("LOGAzz").unwrap();
    engine.handle_line("LOGAabc").unwrap();

    assert!(engine.logger().device(DEV).is_none());
}

#[tokio::test]
async fn wrong_record_size_is_dropped() {
    let (mut engine, _peer, _dir) = engine_under_test();

    engine.handle_line("LOGA00ff00ff").unwrap();
    assert!(engine.logger().device(DEV).is_none());
}

#[tokio::test]
async fn malformed_and_unknown_frames_are_survived() {
    let (mut engine, _peer, _dir) = engine_under_test();

    engine.handle_line("XYZ").unwrap();
    engine.handle_line("QQQApayload").unwrap();
    engine.handle_line("").unwrap();

    assert!(engine.logger().device(DEV).is_none());
}

#[tokio::test]
async fn file_frames_drive_a_transfer() {
    let (mut engine, _peer, _dir) = engine_under_test();

    engine.handle_line("FILAA-1000-evlog.txt").unwrap();
    engine.handle_line("LINA1000 1 21.5 0.0").unwrap();
    engine.handle_line("LINA2000 2 21.0 0.0").unwrap();
    engine.handle_line("EOFA").unwrap();

    let content = fs::read(engine.logger().day_dir().join("A-1000-evlog.txt")).unwrap();
    assert_eq!(content, b"1000 1 21.5 0.0\r\n2000 2 21.0 0.0\r\n");
}
