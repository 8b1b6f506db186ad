//! Public base URL derivation for gallery links.

use axum::http::HeaderMap;
use axum::http::header::HOST;

const FORWARDED_HOST: &str = "x-forwarded-host";
const FORWARDED_PROTO: &str = "x-forwarded-proto";

/// `{scheme}://{host}` as the client sees this server, without a port.
///
/// A reverse proxy's `X-Forwarded-Host` / `X-Forwarded-Proto` win over the
/// request's own `Host` header. Only the first value of a comma-separated
/// forwarded list is used.
pub(super) fn public_base_url(headers: &HeaderMap) -> String {
    let scheme = match first_header_value(headers, FORWARDED_PROTO) {
        Some(proto) if proto.eq_ignore_ascii_case("https") => "https",
        _ => "http",
    };

    let host = first_header_value(headers, FORWARDED_HOST)
        .or_else(|| first_header_value(headers, HOST.as_str()))
        .map(strip_port)
        .filter(|host| !host.is_empty())
        .unwrap_or("localhost");

    format!("{scheme}://{host}")
}

fn first_header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    let value = headers.get(name)?.to_str().ok()?;
    let first = value.split(',').next()?.trim();
    (!first.is_empty()).then_some(first)
}

/// Drop a `:port` suffix, keeping bracketed IPv6 literals intact.
fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        return match host.find(']') {
            Some(end) => &host[..=end],
            None => host,
        };
    }
    host.split_once(':').map_or(host, |(name, _)| name)
}
