//! Stable hardware identifier for hosts
//!
//! MCUs use a fused MAC. On a host the closest equivalent is the systemd
//! machine id, hashed down to 64 bits with FNV-1a. Only the low 32 bits end
//! up in the client identity.

use std::fs;

use log::warn;

const MACHINE_ID_PATHS: [&str; 2] = ["/etc/machine-id", "/var/lib/dbus/machine-id"];

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// 64-bit FNV-1a
pub fn fnv1a(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .fold(FNV_OFFSET_BASIS, |hash, b| (hash ^ u64::from(*b)).wrapping_mul(FNV_PRIME))
}

/// Identifier derived from the machine id, or the host name as a fallback
pub fn hardware_id() -> u64 {
    let machine_id = MACHINE_ID_PATHS
        .iter()
        .filter_map(|path| fs::read_to_string(path).ok())
        .map(|raw| raw.trim().to_string())
        .find(|id| !id.is_empty());

    if let Some(id) = machine_id {
        return fnv1a(id.as_bytes());
    }

    let host = std::env::var("HOSTNAME").unwrap_or_default();
    warn!("identity: no machine id, deriving from host name {:?}", host);
    fnv1a(host.as_bytes())
}
