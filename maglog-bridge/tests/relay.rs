use std::time::Duration;

use tokio_util::sync::CancellationToken;

use maglog_bridge::{Indicator, Relay};
use maglog_core::{SensorRecord, encode_hex};
use maglog_link::{FrameLink, MockLink};

/// Indicator that counts reported faults.
#[derive(Default)]
struct CountingIndicator {
    failures: usize,
}

impl Indicator for CountingIndicator {
    fn radio_activity(&mut self) {}
    fn serial_activity(&mut self) {}
    fn failure(&mut self, _what: &str) {
        self.failures += 1;
    }
}

fn radio_packet(code: &str, device: char, payload: &[u8]) -> Vec<u8> {
    let mut packet = vec![0x01, 0x00, 0x01];
    packet.extend_from_slice(code.as_bytes());
    packet.push(device as u8);
    packet.extend_from_slice(payload);
    packet
}

fn relay_under_test() -> (
    Relay<MockLink, MockLink, CountingIndicator>,
    MockLink,
    MockLink,
) {
    let (radio, radio_peer) = MockLink::pair(16);
    let (serial, serial_peer) = MockLink::pair(16);
    let relay = Relay::new(radio, serial, CountingIndicator::default());
    (relay, radio_peer, serial_peer)
}

async fn next_serial_line(peer: &mut MockLink) -> String {
    let frame = peer
        .recv(Duration::from_millis(100))
        .await
        .unwrap()
        .expect("expected a serial frame");
    String::from_utf8(frame).unwrap()
}

#[tokio::test]
async fn time_reference_is_acknowledged() {
    let (mut relay, _radio_peer, mut serial_peer) = relay_under_test();

    relay.handle_serial_line(b"TIM 1700000000").await.unwrap();

    assert_eq!(next_serial_line(&mut serial_peer).await, "OKE");
    assert_eq!(relay.current_epoch(), Some(1_700_000_000));
}

#[tokio::test]
async fn malformed_time_reference_is_dropped() {
    let (mut relay, _radio_peer, mut serial_peer) = relay_under_test();

    relay.handle_serial_line(b"TIM soon").await.unwrap();

    assert!(relay.current_epoch().is_none());
    let got = serial_peer.recv(Duration::from_millis(50)).await.unwrap();
    assert_eq!(got, None);
}

#[tokio::test]
async fn log_packet_is_hex_encoded_onto_serial() {
    let (mut relay, _radio_peer, mut serial_peer) = relay_under_test();

    let record = SensorRecord::new(1000, 3, 22.5, 80.0);
    let packet = radio_packet("LOG", 'A', &record.encode());
    relay.handle_radio_packet(&packet).await.unwrap();

    let line = next_serial_line(&mut serial_peer).await;
    assert_eq!(line, format!("LOGA{}", encode_hex(&record.encode())));
}

#[tokio::test]
async fn event_packet_translates_one_to_one() {
    let (mut relay, _radio_peer, mut serial_peer) = relay_under_test();

    let record = SensorRecord::new(2000, 4, 21.0, 0.0);
    let packet = radio_packet("EVN", 'B', &record.encode());
    relay.handle_radio_packet(&packet).await.unwrap();

    let line = next_serial_line(&mut serial_peer).await;
    assert!(line.starts_with("EVNB"));
}

#[tokio::test]
async fn bad_preamble_is_dropped() {
    let (mut relay, _radio_peer, mut serial_peer) = relay_under_test();

    let mut packet = radio_packet("LOG", 'A', &[0u8; 20]);
    packet[0] = 0x7F;
    relay.handle_radio_packet(&packet).await.unwrap();

    let got = serial_peer.recv(Duration::from_millis(50)).await.unwrap();
    assert_eq!(got, None);
    assert_eq!(relay.indicator().failures, 1);
}

#[tokio::test]
async fn unknown_radio_code_is_dropped() {
    let (mut relay, _radio_peer, mut serial_peer) = relay_under_test();

    let packet = radio_packet("QQQ", 'A', b"payload");
    relay.handle_radio_packet(&packet).await.unwrap();

    let got = serial_peer.recv(Duration::from_millis(50)).await.unwrap();
    assert_eq!(got, None);
    assert_eq!(relay.indicator().failures, 1);
}

#[tokio::test]
async fn file_start_names_the_transfer_after_the_device() {
    let (mut relay, _radio_peer, mut serial_peer) = relay_under_test();

    let packet = radio_packet("FIL", 'A', b"evlog");
    relay.handle_radio_packet(&packet).await.unwrap();

    let line = next_serial_line(&mut serial_peer).await;
    assert!(line.starts_with("FILA"));
    assert!(line["FILA".len()..].starts_with("A-"));
    assert!(line.ends_with("-evlog.txt"));
}

#[tokio::test]
async fn second_file_start_forces_an_implicit_eof() {
    let (mut relay, _radio_peer, mut serial_peer) = relay_under_test();

    relay
        .handle_radio_packet(&radio_packet("FIL", 'A', b"one"))
        .await
        .unwrap();
    let first = next_serial_line(&mut serial_peer).await;
    assert!(first.starts_with("FILA"));

    relay
        .handle_radio_packet(&radio_packet("FIL", 'A', b"two"))
        .await
        .unwrap();
    assert_eq!(next_serial_line(&mut serial_peer).await, "EOFA");
    let second = next_serial_line(&mut serial_peer).await;
    assert!(second.ends_with("-two.txt"));
}

#[tokio::test]
async fn eof_clears_the_transfer_flag() {
    let (mut relay, _radio_peer, mut serial_peer) = relay_under_test();

    relay
        .handle_radio_packet(&radio_packet("FIL", 'A', b"one"))
        .await
        .unwrap();
    let _ = next_serial_line(&mut serial_peer).await;

    relay
        .handle_radio_packet(&radio_packet("EOF", 'A', b""))
        .await
        .unwrap();
    assert_eq!(next_serial_line(&mut serial_peer).await, "EOFA");

    // a fresh FIL after a proper EOF must not emit another implicit EOF
    relay
        .handle_radio_packet(&radio_packet("FIL", 'A', b"two"))
        .await
        .unwrap();
    let line = next_serial_line(&mut serial_peer).await;
    assert!(line.starts_with("FILA"));
}

#[tokio::test]
async fn line_payload_passes_through() {
    let (mut relay, _radio_peer, mut serial_peer) = relay_under_test();

    let packet = radio_packet("LIN", 'A', b"1000 4 21.5 0.0");
    relay.handle_radio_packet(&packet).await.unwrap();

    assert_eq!(
        next_serial_line(&mut serial_peer).await,
        "LINA1000 4 21.5 0.0"
    );
}

#[tokio::test]
async fn relay_waits_for_station_start() {
    let (mut relay, _radio_peer, mut serial_peer) = relay_under_test();

    serial_peer.send(b"garbage").await.unwrap();
    serial_peer.send(b"STA").await.unwrap();

    let cancel = CancellationToken::new();
    let started = relay.wait_for_start(&cancel).await.unwrap();
    assert!(started);
}

#[tokio::test]
async fn wait_for_start_honours_cancellation() {
    let (mut relay, _radio_peer, _serial_peer) = relay_under_test();

    let cancel = CancellationToken::new();
    cancel.cancel();
    let started = relay.wait_for_start(&cancel).await.unwrap();
    assert!(!started);
}
