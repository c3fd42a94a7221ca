use std::net::IpAddr;

/// Non-loopback IPv4 addresses of this host, for telling users where a
/// publicly bound server can be reached.
pub fn lan_addresses() -> Vec<IpAddr> {
    match if_addrs::get_if_addrs() {
        Ok(interfaces) => interfaces
            .into_iter()
            .filter(|iface| !iface.is_loopback())
            .map(|iface| iface.ip())
            .filter(IpAddr::is_ipv4)
            .collect(),
        Err(e) => {
            log::debug!("cannot enumerate interfaces: {e}");
            Vec::new()
        }
    }
}

/// Logs `{scheme}{ip}:{port}` for every LAN address.
pub fn log_reachable(what: &str, scheme: &str, port: u16) {
    for ip in lan_addresses() {
        log::info!("{what} reachable at {scheme}{ip}:{port}");
    }
}
