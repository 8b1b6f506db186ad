//! Host discovery for the startup banner.

use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};

/// The machine's hostname, or `"unknown"`.
pub fn hostname() -> String {
    match whoami::fallible::hostname() {
        Ok(name) if !name.is_empty() => name,
        Ok(_) => "unknown".to_string(),
        Err(error) => {
            tracing::debug!(%error, "failed to read hostname");
            "unknown".to_string()
        }
    }
}

/// The address of the interface used for outbound traffic.
///
/// Connecting a UDP socket only selects a route; no packet is sent.
pub fn local_ip() -> Option<IpAddr> {
    let probe = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8)), 80);
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).ok()?;
    socket.connect(probe).ok()?;
    let ip = socket.local_addr().ok()?.ip();
    (!ip.is_unspecified()).then_some(ip)
}

/// Log where the server can be reached.
pub fn log_startup_banner(bound: SocketAddr, image_dir: &std::path::Path) {
    let hostname = hostname();
    let local_ip = local_ip();
    let port = bound.port();

    tracing::info!(
        %hostname,
        local_ip = %local_ip.map_or_else(|| "unknown".to_string(), |ip| ip.to_string()),
        port,
        image_dir = %image_dir.display(),
        "DogHub image server started"
    );
    tracing::info!("local access: http://localhost:{port}");
    if let Some(ip) = local_ip {
        tracing::info!("network access: http://{}", SocketAddr::new(ip, port));
    }
}
