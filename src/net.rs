//! Local address discovery: enumerate network interfaces and pick the
//! first non-loopback IPv4 one. Startup fails if none exists.

use crate::error::NodeError;

/// Returns the first non-loopback IPv4 address found on the host.
///
/// `if_addrs::Interface` in the version this crate depends on doesn't
/// expose link (up/down) state, so this only filters on loopback-ness and
/// address family; a non-loopback interface that is administratively down
/// can still be picked.
pub fn discover_local_ipv4() -> Result<std::net::Ipv4Addr, NodeError> {
    let interfaces = if_addrs::get_if_addrs()
        .map_err(|e| NodeError::Startup(format!("failed to enumerate network interfaces: {e}")))?;

    interfaces
        .into_iter()
        .filter(|iface| !iface.is_loopback())
        .find_map(|iface| match iface.ip() {
            std::net::IpAddr::V4(addr) => Some(addr),
            std::net::IpAddr::V6(_) => None,
        })
        .ok_or_else(|| {
            NodeError::Startup("no non-loopback IPv4 interface found".to_string())
        })
}

/// Resolves the gRPC listen address: an explicit one if given, otherwise
/// the discovered local interface bound to an ephemeral port requested by
/// the caller by passing `port = 0` and letting the OS choose.
pub fn resolve_grpc_address(explicit: Option<&str>, fallback_port: u16) -> Result<String, NodeError> {
    if let Some(address) = explicit {
        return Ok(address.to_string());
    }
    let ip = discover_local_ipv4()?;
    Ok(format!("{ip}:{fallback_port}"))
}
