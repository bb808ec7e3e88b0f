//! EdgeWatch node
//!
//! Runs the presence and light control loop on a host:
//!
//! - bus: MQTT broker (`EDGEWATCH_MQTT_HOST` / `EDGEWATCH_MQTT_PORT`)
//! - collector: HTTP (`EDGEWATCH_COLLECTOR_URL`)
//! - presence: file holding `0`/`1` (`EDGEWATCH_PRESENCE_PATH`)
//! - light: file holding a lux value (`EDGEWATCH_LUX_PATH`)
//!
//! All of the above are fixed at build time through `option_env!`; the
//! defaults come from `edgewatch_core::config`. Log verbosity follows
//! `RUST_LOG` (default `info`).

mod identity;
mod outputs;
mod sensors;

use anyhow::{anyhow, Context};
use edgewatch_connectors::{CollectorClient, HostNetwork, HttpConfig, MqttConfig, MqttSession};
use edgewatch_core::config::{COLLECTOR_BASE_URL, MQTT_BROKER_HOST, MQTT_BROKER_PORT};
use edgewatch_core::time::SystemClock;
use edgewatch_core::{Board, ControlLoop, NodeConfig, Platform};
use log::info;

use outputs::{Buzzer, LogPin, StdDelay};
use sensors::{FileLight, FilePresence};

const BROKER_HOST: &str = match option_env!("EDGEWATCH_MQTT_HOST") {
    Some(host) => host,
    None => MQTT_BROKER_HOST,
};

const BROKER_PORT: Option<&str> = option_env!("EDGEWATCH_MQTT_PORT");

const COLLECTOR_URL: &str = match option_env!("EDGEWATCH_COLLECTOR_URL") {
    Some(url) => url,
    None => COLLECTOR_BASE_URL,
};

const PRESENCE_PATH: &str = match option_env!("EDGEWATCH_PRESENCE_PATH") {
    Some(path) => path,
    None => "/tmp/edgewatch/presence",
};

const LUX_PATH: &str = match option_env!("EDGEWATCH_LUX_PATH") {
    Some(path) => path,
    None => "/tmp/edgewatch/lux",
};

/// Collector request timeout
const HTTP_TIMEOUT_SECS: u64 = 5;

/// Host devices and transports
struct HostPlatform;

impl Platform for HostPlatform {
    type Presence = FilePresence;
    type Light = FileLight;
    type Alert = Buzzer;
    type Indicator = LogPin;
    type Network = HostNetwork;
    type Bus = MqttSession;
    type Collector = CollectorClient;
    type Clock = SystemClock;
    type Delay = StdDelay;
}

fn broker_port() -> anyhow::Result<u16> {
    match BROKER_PORT {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("EDGEWATCH_MQTT_PORT is not a port: {raw:?}")),
        None => Ok(MQTT_BROKER_PORT),
    }
}

fn host_board() -> anyhow::Result<Board<HostPlatform>> {
    let port = broker_port()?;

    let bus = MqttSession::new(MqttConfig::new(BROKER_HOST, port))
        .context("invalid MQTT configuration")?;
    let collector = CollectorClient::new(HttpConfig::new(COLLECTOR_URL).timeout_secs(HTTP_TIMEOUT_SECS))
        .context("invalid collector configuration")?;

    Ok(Board {
        presence: FilePresence::new(PRESENCE_PATH),
        light: FileLight::new(LUX_PATH),
        alert: Buzzer::default(),
        indicator: LogPin::new("light-indicator", false),
        network: HostNetwork::new(BROKER_HOST, port),
        bus,
        collector,
        clock: SystemClock::new(),
        delay: StdDelay,
    })
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("EdgeWatch node v{}", edgewatch_core::VERSION);
    info!("  broker:    {}:{}", BROKER_HOST, broker_port()?);
    info!("  collector: {}", COLLECTOR_URL);
    info!("  presence:  {}", PRESENCE_PATH);
    info!("  lux:       {}", LUX_PATH);

    let board = host_board()?;
    let node = ControlLoop::new(board, NodeConfig::default(), identity::hardware_id())
        .map_err(|err| anyhow!("invalid node configuration: {err}"))?;

    node.run()
}
