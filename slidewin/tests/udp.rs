//! End-to-end runs over loopback UDP, one thread per rank.

use slidewin::launch::{self, RankReport};
use slidewin::{dataset, SlidewinConfig, SlidewinError, UdpTransport};
use slidewin_test_support::{
    is_release, session_traces, EventLog, RecordingTransport, SequenceChecker,
};
use std::net::{SocketAddr, UdpSocket};
use std::thread;
use std::time::Duration;

fn udp_world(size: usize) -> Vec<UdpTransport> {
    let sockets: Vec<UdpSocket> = (0..size)
        .map(|_| UdpSocket::bind("127.0.0.1:0").unwrap())
        .collect();
    let peers: Vec<SocketAddr> = sockets.iter().map(|s| s.local_addr().unwrap()).collect();
    sockets
        .into_iter()
        .enumerate()
        .map(|(rank, socket)| UdpTransport::with_socket(rank, socket, peers.clone()).unwrap())
        .collect()
}

fn run_udp(config: &SlidewinConfig, size: usize, sender_log: &EventLog) -> Vec<RankReport> {
    thread::scope(|s| {
        let handles: Vec<_> = udp_world(size)
            .into_iter()
            .map(|transport| {
                let log = sender_log.clone();
                s.spawn(move || {
                    if transport_is_sender(&transport, config) {
                        let mut recorded = RecordingTransport::new(transport, log);
                        launch::run_rank(config, &mut recorded)
                    } else {
                        let mut transport = transport;
                        launch::run_rank(config, &mut transport)
                    }
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap().unwrap())
            .collect()
    })
}

fn transport_is_sender(transport: &UdpTransport, config: &SlidewinConfig) -> bool {
    use slidewin::Transport;
    transport.rank() == config.sender_rank
}

#[test]
fn reference_scenario_over_udp() {
    let config = SlidewinConfig::default();
    let log = EventLog::default();
    let reports = run_udp(&config, 2, &log);

    let summary = reports[0].outcome.summary().unwrap();
    assert_eq!(summary.frames_sent, 64);
    assert_eq!(reports[1].outcome.buffer().unwrap(), dataset(512).as_slice());
    assert!(reports[0].throughput.is_some());
    assert!(reports[1].throughput.is_none());

    let sessions = session_traces(&log.events()).unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].frames.len(), 64);
}

#[test]
fn three_party_over_udp() {
    let config = SlidewinConfig {
        items: 96,
        frame_len: 12,
        ..Default::default()
    };
    let log = EventLog::default();
    let reports = run_udp(&config, 3, &log);

    assert_eq!(reports[0].outcome.summary().unwrap().sessions, 2);
    for rank in 1..3 {
        assert_eq!(reports[rank].outcome.buffer().unwrap(), dataset(96).as_slice());
    }
}

#[test]
fn truncation_over_udp() {
    let config = SlidewinConfig {
        items: 10,
        frame_len: 4,
        ..Default::default()
    };
    let reports = run_udp(&config, 2, &EventLog::default());
    assert_eq!(
        reports[1].outcome.buffer().unwrap(),
        &[0, 1, 2, 3, 4, 5, 6, 7, 0, 0]
    );
}

#[test]
fn frame_beyond_datagram_limit_fails_on_every_rank() {
    let config = SlidewinConfig {
        items: 40000,
        frame_len: 20000,
        ..Default::default()
    };
    let config = &config;
    let results: Vec<_> = thread::scope(|s| {
        let handles: Vec<_> = udp_world(2)
            .into_iter()
            .map(|mut transport| s.spawn(move || launch::run_rank(config, &mut transport)))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    for result in results {
        assert!(matches!(result, Err(SlidewinError::Config(_))));
    }
}

#[test]
fn sequence_numbers_stay_contiguous_over_a_run() {
    let root_socket = UdpSocket::bind("127.0.0.1:0").unwrap();
    let client_socket = UdpSocket::bind("127.0.0.1:0").unwrap();
    let relay = UdpSocket::bind("127.0.0.1:0").unwrap();
    relay.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
    let root_addr = root_socket.local_addr().unwrap();
    let client_addr = client_socket.local_addr().unwrap();
    let relay_addr = relay.local_addr().unwrap();

    // Rank 0 reaches rank 1 only through the relay, which captures every datagram.
    let mut root =
        UdpTransport::with_socket(0, root_socket, vec![root_addr, relay_addr]).unwrap();
    let mut client =
        UdpTransport::with_socket(1, client_socket, vec![root_addr, client_addr]).unwrap();
    let checker = SequenceChecker::new();
    let config = SlidewinConfig {
        items: 64,
        frame_len: 8,
        ..Default::default()
    };

    let (root_report, client_report) = thread::scope(|s| {
        s.spawn(|| {
            let mut buf = vec![0u8; 65536];
            while let Ok((len, _)) = relay.recv_from(&mut buf) {
                let packet = &buf[..len];
                checker.observe_packet(1, packet);
                relay.send_to(packet, client_addr).unwrap();
                if is_release(packet) {
                    break;
                }
            }
        });
        let client_run = s.spawn(|| launch::run_rank(&config, &mut client));
        let root_report = launch::run_rank(&config, &mut root);
        (root_report, client_run.join().unwrap())
    });

    assert_eq!(root_report.unwrap().outcome.summary().unwrap().frames_sent, 8);
    assert_eq!(client_report.unwrap().outcome.buffer().unwrap(), dataset(64).as_slice());

    let stats = checker.stats();
    assert!(!checker.has_errors(), "{:?}", stats);
    assert_eq!(stats.streams, 1);
    // Eight frames, then the barrier release
    assert_eq!(stats.accepted, 9);
    assert_eq!(checker.expected(0, 1), 9);
    assert!(stats.unsequenced >= 1);
}
