//! Control Loop Integration Tests
//!
//! Drives a full [`ControlLoop`] over the simulated platform in `common`,
//! covering boot, the presence and light pipelines, remote enable/disable
//! and recovery from network and session loss.

mod common;

use common::{advance, sim_board, SimPlatform, START_MS};
use edgewatch_core::config::{HELLO_PAYLOAD, TOPIC_EVENTS, TOPIC_LIGHT_LEVEL, TOPIC_LIGHT_STATE};
use edgewatch_core::{
    ConfigError, ConnectFailure, ConnectivityState, ControlLoop, Edge, EventKind, FetchError,
    LightState, LoopState, NodeConfig,
};

const HARDWARE_ID: u64 = 0x0123_4567_DEAD_BEEF;
const DEVICE_ID: &str = "edgewatch-deadbeef";
const TICK_MS: u64 = 50;

fn node() -> (ControlLoop<SimPlatform>, common::SimTime, common::Journal) {
    let (board, time, journal) = sim_board();
    let node = ControlLoop::new(board, NodeConfig::default(), HARDWARE_ID).expect("valid config");
    (node, time, journal)
}

fn position(journal: &common::Journal, entry: &str) -> usize {
    journal
        .borrow()
        .iter()
        .position(|e| e == entry)
        .unwrap_or_else(|| panic!("missing journal entry {entry:?}"))
}

#[test]
fn test_boot_waits_for_network_then_bus() {
    let (mut board, time, _journal) = sim_board();
    board.network.up_from = START_MS + 1200;
    board.bus.refusals.push_back(ConnectFailure::BrokerUnavailable);
    board.collector.flag = Ok(false);

    let mut node = ControlLoop::new(board, NodeConfig::default(), HARDWARE_ID).unwrap();
    assert_eq!(node.state(), LoopState::Booting);
    node.boot();

    assert_eq!(node.state(), LoopState::Steady);
    assert_eq!(node.connectivity().state(), ConnectivityState::BusConnected);

    // Associating from 10_000, up at 11_500, one refusal, retry at 13_500
    assert_eq!(time.get(), START_MS + 3500);
    let stats = node.connectivity().stats();
    assert_eq!(stats.network_attempts, 1);
    assert_eq!(stats.progress_marks, 2);
    assert_eq!(stats.bus_attempts, 2);
    assert_eq!(stats.reconnections, 0);
    assert_eq!(stats.last_failure, Some(ConnectFailure::BrokerUnavailable));

    let board = node.board();
    assert_eq!(board.network.begins, 1);
    assert_eq!(board.bus.client_ids, vec![DEVICE_ID.to_string(); 2]);
    let hello = board.bus.on_topic(TOPIC_EVENTS);
    assert_eq!(hello.len(), 1);
    assert_eq!(hello[0].payload, HELLO_PAYLOAD);
    assert!(!hello[0].retain);

    assert_eq!(board.collector.fetches, 1);
    assert!(!node.poller().sensing_enabled());
    assert_eq!(board.alert.silences, 1);
    assert!(!board.indicator.lit);
}

#[test]
fn test_backoff_counts_from_failed_handshake() {
    let (mut board, _time, _journal) = sim_board();
    board.bus.handshake_ms = 3000;
    board.bus.refusals.push_back(ConnectFailure::Transport);
    board.bus.refusals.push_back(ConnectFailure::Transport);

    let mut node = ControlLoop::new(board, NodeConfig::default(), HARDWARE_ID).unwrap();
    node.boot();
    assert!(node.connectivity().is_connected());

    let attempts = &node.board().bus.attempts;
    assert_eq!(
        attempts,
        &vec![
            (START_MS, START_MS + 3000),
            (START_MS + 5000, START_MS + 8000),
            (START_MS + 10_000, START_MS + 13_000),
        ]
    );
    for pair in attempts.windows(2) {
        let gap = pair[1].0 - pair[0].1;
        assert!(gap >= 2000, "retried {gap} ms after a failed handshake");
    }
}

#[test]
fn test_boot_falls_back_to_default_when_fetch_fails() {
    let (mut board, _time, _journal) = sim_board();
    board.collector.flag = Err(FetchError::Status { status: 503 });

    let config = NodeConfig { default_sensing_enabled: false, ..NodeConfig::default() };
    let mut node = ControlLoop::new(board, config, HARDWARE_ID).unwrap();
    node.boot();

    assert!(!node.poller().sensing_enabled());
    assert_eq!(node.poller().stats().last_error, Some(FetchError::Status { status: 503 }));
}

#[test]
fn test_first_tick_boots() {
    let (mut node, _time, _journal) = node();
    node.tick();
    assert_eq!(node.state(), LoopState::Steady);
    assert_eq!(node.ticks(), 1);
    assert!(node.connectivity().is_connected());
}

#[test]
fn test_rejects_inverted_thresholds() {
    let (board, _time, _journal) = sim_board();
    let config = NodeConfig::default().with_light_thresholds(40.0, 60.0);
    let result = ControlLoop::new(board, config, HARDWARE_ID);
    assert!(matches!(result, Err(ConfigError::InvalidHysteresis { .. })));
}

#[test]
fn test_motion_edges_follow_presence_signal() {
    let (mut node, time, journal) = node();
    node.boot();

    let mut edges = Vec::new();
    for level in [false, false, true, true, false, true] {
        node.board_mut().presence.level = level;
        edges.push(node.tick().edge);
        advance(&time, TICK_MS);
    }

    assert_eq!(
        edges,
        vec![None, None, Some(Edge::Rising), None, Some(Edge::Falling), Some(Edge::Rising)]
    );

    let board = node.board();
    assert_eq!(board.alert.pulses, vec![(1500, 120), (1500, 120)]);
    // boot + falling edge
    assert_eq!(board.alert.silences, 2);

    let motion: Vec<_> = board
        .bus
        .on_topic(TOPIC_EVENTS)
        .into_iter()
        .filter(|p| p.payload != HELLO_PAYLOAD)
        .collect();
    assert_eq!(motion.len(), 2);
    assert!(motion.iter().all(|p| p.payload == "MOTION detected" && !p.retain));

    assert_eq!(board.collector.posts.len(), 2);
    for post in &board.collector.posts {
        assert_eq!(post.device_id, DEVICE_ID);
        assert_eq!(post.kind, EventKind::Motion);
        assert_eq!(post.detail.as_deref(), Some("motion detected"));
    }

    // Actuate, then report
    let alert = position(&journal, "alert");
    let bus = position(&journal, "bus edgewatch/node/events MOTION detected");
    let http = position(&journal, "http motion");
    assert!(alert < bus && bus < http);
}

#[test]
fn test_motion_reported_on_both_channels() {
    let (mut node, _time, _journal) = node();
    node.boot();
    node.board_mut().presence.level = true;

    let report = node.tick();
    let delivery = report.motion_delivery.expect("rising edge reported");
    assert!(delivery.bus && delivery.http);
    assert_eq!(node.reporter().stats().bus_ok, 1);
    assert_eq!(node.reporter().stats().http_ok, 1);
}

#[test]
fn test_partial_delivery_when_collector_rejects() {
    let (mut node, _time, _journal) = node();
    node.boot();
    node.board_mut().collector.post_status = Some(500);
    node.board_mut().presence.level = true;

    let report = node.tick();
    let delivery = report.motion_delivery.unwrap();
    assert!(delivery.bus);
    assert!(!delivery.http);
    assert!(delivery.reported());
    assert_eq!(node.reporter().stats().http_failed, 1);

    // Local state advanced regardless
    assert_eq!(node.board().alert.pulses.len(), 1);
}

#[test]
fn test_presence_read_error_skips_sample() {
    let (mut node, time, _journal) = node();
    node.boot();
    node.board_mut().presence.level = true;
    node.board_mut().presence.fail = true;

    assert_eq!(node.tick().edge, None);
    assert!(node.board().alert.pulses.is_empty());

    advance(&time, TICK_MS);
    node.board_mut().presence.fail = false;
    assert_eq!(node.tick().edge, Some(Edge::Rising));
}

#[test]
fn test_light_hysteresis_scenario() {
    let (mut node, time, journal) = node();
    node.board_mut().light.queue(&[10.0, 70.0, 65.0, 35.0, 80.0]);
    node.boot();

    let mut transitions = Vec::new();
    for _ in 0..5 {
        let report = node.tick();
        assert!(report.lux.is_some());
        transitions.push(report.light.map(|t| t.to));

        // Between samples the light pipeline stays quiet
        advance(&time, 1000);
        assert_eq!(node.tick().lux, None);
        advance(&time, 1000);
    }

    assert_eq!(
        transitions,
        vec![None, Some(LightState::On), None, Some(LightState::Off), Some(LightState::On)]
    );
    assert_eq!(node.light().state(), LightState::On);

    let board = node.board();
    assert!(board.indicator.lit);
    assert_eq!(board.bus.payloads(TOPIC_LIGHT_STATE), vec!["ON", "OFF", "ON"]);
    assert!(board.bus.on_topic(TOPIC_LIGHT_STATE).iter().all(|p| p.retain));
    assert_eq!(
        board.bus.payloads(TOPIC_LIGHT_LEVEL),
        vec!["10.0", "70.0", "65.0", "35.0", "80.0"]
    );
    assert!(board.bus.on_topic(TOPIC_LIGHT_LEVEL).iter().all(|p| p.retain));

    let details: Vec<_> = board
        .collector
        .posts
        .iter()
        .filter(|p| p.kind == EventKind::Light)
        .map(|p| p.detail.clone().unwrap_or_default())
        .collect();
    assert_eq!(details, vec!["ON", "OFF", "ON"]);

    // Indicator follows before the report goes out
    let lit = position(&journal, "indicator on");
    let published = position(&journal, "bus edgewatch/node/light/state ON");
    assert!(lit < published);
}

#[test]
fn test_invalid_light_readings_are_skipped() {
    let (mut node, time, _journal) = node();
    node.board_mut().light.queue(&[f32::NAN, -3.0]);
    node.boot();

    assert_eq!(node.tick().lux, None);
    advance(&time, 2000);
    assert_eq!(node.tick().lux, None);

    assert!(node.board().bus.on_topic(TOPIC_LIGHT_LEVEL).is_empty());
    assert_eq!(node.light().state(), LightState::Off);
    assert_eq!(node.light().last_lux(), None);
}

#[test]
fn test_light_monitoring_ignores_sensing_flag() {
    let (mut board, _time, _journal) = sim_board();
    board.collector.flag = Ok(false);
    board.presence.level = true;
    board.light.queue(&[75.0]);

    let mut node = ControlLoop::new(board, NodeConfig::default(), HARDWARE_ID).unwrap();
    node.boot();
    let report = node.tick();

    assert_eq!(report.light.map(|t| t.to), Some(LightState::On));
    assert_eq!(report.edge, None);
    assert!(node.board().alert.pulses.is_empty());
}

#[test]
fn test_disable_and_reenable_carries_presence_state() {
    let (mut node, time, _journal) = node();
    node.boot();

    node.board_mut().presence.level = true;
    assert_eq!(node.tick().edge, Some(Edge::Rising));

    // Disabled at the next poll
    node.board_mut().collector.flag = Ok(false);
    advance(&time, 3000);
    let report = node.tick();
    assert_eq!(report.sensing_change, Some(false));
    assert_eq!(report.edge, None);

    // Unobserved toggles while disabled
    for level in [false, true] {
        node.board_mut().presence.level = level;
        advance(&time, TICK_MS);
        assert_eq!(node.tick().edge, None);
    }
    assert_eq!(node.board().alert.pulses.len(), 1);

    // Re-enabled with the signal still high: no fresh edge
    node.board_mut().collector.flag = Ok(true);
    advance(&time, 3000);
    let report = node.tick();
    assert_eq!(report.sensing_change, Some(true));
    assert_eq!(report.edge, None);

    node.board_mut().presence.level = false;
    advance(&time, TICK_MS);
    assert_eq!(node.tick().edge, Some(Edge::Falling));

    assert_eq!(node.board().alert.pulses.len(), 1);
    assert_eq!(node.board().collector.posts.len(), 1);
    assert_eq!(node.poller().stats().changes, 2);
}

#[test]
fn test_failed_poll_keeps_flag() {
    let (mut node, time, _journal) = node();
    node.boot();
    node.board_mut().collector.flag = Err(FetchError::Status { status: 503 });

    advance(&time, 3000);
    let report = node.tick();

    assert_eq!(report.sensing_change, None);
    assert!(node.poller().sensing_enabled());
    assert_eq!(node.poller().stats().failures, 1);
    assert_eq!(node.poller().stats().last_error, Some(FetchError::Status { status: 503 }));
}

#[test]
fn test_poll_runs_on_its_own_cadence() {
    let (mut node, time, _journal) = node();
    node.boot();
    let seeded = node.board().collector.fetches;

    for _ in 0..59 {
        advance(&time, TICK_MS);
        node.tick();
    }
    // 2950 ms after boot
    assert_eq!(node.board().collector.fetches, seeded);

    advance(&time, TICK_MS);
    node.tick();
    assert_eq!(node.board().collector.fetches, seeded + 1);
}

#[test]
fn test_link_loss_reassociates_and_says_hello_again() {
    let (mut node, time, _journal) = node();
    node.boot();
    node.tick();

    node.board_mut().network.outage(1000);
    advance(&time, TICK_MS);
    node.tick();

    assert_eq!(node.connectivity().state(), ConnectivityState::BusConnected);
    let stats = node.connectivity().stats();
    assert_eq!(stats.network_attempts, 1);
    assert_eq!(stats.reconnections, 1);

    let board = node.board();
    assert_eq!(board.network.begins, 1);
    assert!(board.bus.connected);
    assert_eq!(board.bus.payloads(TOPIC_EVENTS), vec![HELLO_PAYLOAD, HELLO_PAYLOAD]);

    node.board_mut().presence.level = true;
    advance(&time, TICK_MS);
    let delivery = node.tick().motion_delivery.unwrap();
    assert!(delivery.bus);
}

#[test]
fn test_session_drop_retries_bus_with_backoff() {
    let (mut node, time, _journal) = node();
    node.boot();

    node.board_mut().bus.connected = false;
    node.board_mut().bus.refusals.push_back(ConnectFailure::NotAuthorized);
    let before = time.get();
    node.tick();

    assert!(node.connectivity().is_connected());
    assert_eq!(time.get() - before, 2000);

    let stats = node.connectivity().stats();
    assert_eq!(stats.bus_attempts, 3);
    assert_eq!(stats.reconnections, 1);
    assert_eq!(stats.last_failure, Some(ConnectFailure::NotAuthorized));
    assert_eq!(node.board().network.begins, 0);
}

#[test]
fn test_bus_serviced_every_tick() {
    let (mut node, time, _journal) = node();
    node.boot();
    for _ in 0..10 {
        node.tick();
        advance(&time, TICK_MS);
    }
    assert_eq!(node.board().bus.services, 10);
    assert_eq!(node.ticks(), 10);
}
