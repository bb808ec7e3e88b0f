//! Host network link
//!
//! On a host the OS owns association, so "bringing the network up" means
//! resolving the broker and checking that the kernel has a route to it.
//! The route check binds a UDP socket and `connect`s it, which consults the
//! routing table without sending a packet.
//!
//! A confirmed route is trusted for [`DEFAULT_RECHECK_INTERVAL`] before the
//! next check; any failed check drops the cached route immediately.

use std::net::{IpAddr, SocketAddr, ToSocketAddrs, UdpSocket};
use std::time::{Duration, Instant};

use edgewatch_core::NetworkLink;
use log::{debug, info};

/// How long a confirmed route is trusted without re-checking
pub const DEFAULT_RECHECK_INTERVAL: Duration = Duration::from_secs(1);

/// Network link tracking reachability of one endpoint
#[derive(Debug, Clone)]
pub struct HostNetwork {
    endpoint: String,
    target: Option<SocketAddr>,
    local: Option<IpAddr>,
    recheck: Duration,
    checked_at: Option<Instant>,
    route_checks: u64,
}

impl HostNetwork {
    /// Link considered up while `host:port` resolves and is routable
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            endpoint: format!("{}:{}", host, port),
            target: None,
            local: None,
            recheck: DEFAULT_RECHECK_INTERVAL,
            checked_at: None,
            route_checks: 0,
        }
    }

    /// Trust a confirmed route for `interval` before checking again
    pub fn recheck_interval(mut self, interval: Duration) -> Self {
        self.recheck = interval;
        self
    }

    /// Endpoint whose reachability is checked
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Route checks performed so far
    pub fn route_checks(&self) -> u64 {
        self.route_checks
    }

    fn route_is_fresh(&self) -> bool {
        self.local.is_some() && self.checked_at.is_some_and(|at| at.elapsed() < self.recheck)
    }

    fn forget_route(&mut self) {
        self.local = None;
        self.checked_at = None;
    }

    fn resolve(&mut self) -> Option<SocketAddr> {
        if self.target.is_none() {
            self.target = match self.endpoint.to_socket_addrs() {
                Ok(mut addrs) => addrs.next(),
                Err(err) => {
                    debug!("network: cannot resolve {}: {}", self.endpoint, err);
                    None
                }
            };
        }
        self.target
    }

    fn route_to(target: SocketAddr) -> std::io::Result<IpAddr> {
        let bind: SocketAddr = if target.is_ipv4() {
            ([0u8; 4], 0).into()
        } else {
            ([0u16; 8], 0).into()
        };
        let socket = UdpSocket::bind(bind)?;
        socket.connect(target)?;
        Ok(socket.local_addr()?.ip())
    }
}

impl NetworkLink for HostNetwork {
    fn begin(&mut self) {
        // Re-resolve on every association cycle
        self.target = None;
        self.forget_route();
        if let Some(target) = self.resolve() {
            info!("network: {} resolved to {}", self.endpoint, target);
        }
    }

    fn is_up(&mut self) -> bool {
        if self.route_is_fresh() {
            return true;
        }

        let Some(target) = self.resolve() else {
            self.forget_route();
            return false;
        };

        self.route_checks += 1;
        match Self::route_to(target) {
            Ok(local) => {
                self.local = Some(local);
                self.checked_at = Some(Instant::now());
                true
            }
            Err(err) => {
                debug!("network: no route to {}: {}", target, err);
                self.target = None;
                self.forget_route();
                false
            }
        }
    }

    fn local_address(&self) -> Option<IpAddr> {
        self.local
    }
}
