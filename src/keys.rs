//! Key codec for registry entries.
//!
//! Registration keys are hierarchical store paths of the form
//! `/<namespace>/service/<serviceName>/<hostAddr>:<port>`. Building and
//! parsing is pure string work; no I/O happens here.

/// Identity parsed back out of a registration key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ParsedKey {
    pub(crate) service_name: String,
    pub(crate) host_addr: String,
    pub(crate) port: u16,
}

/// Key under which one service instance is registered.
pub(crate) fn service_key(
    namespace: &str,
    service_name: &str,
    host_addr: &str,
    port: u16,
) -> String {
    format!("/{namespace}/service/{service_name}/{host_addr}:{port}")
}

/// Directory prefix holding every instance of one service.
pub(crate) fn service_prefix(
    namespace: &str,
    service_name: &str,
) -> String {
    format!("/{namespace}/service/{service_name}/")
}

/// Parse a raw store key back into a service identity.
///
/// Returns `None` for keys outside the namespace, keys of the wrong
/// depth, and malformed `host:port` leaves. Port must fit a u16; the
/// host part is taken up to the last ':' so bracketed IPv6 literals with
/// an explicit port still parse.
pub(crate) fn parse_service_key(
    namespace: &str,
    key: &str,
) -> Option<ParsedKey> {
    let root = format!("/{namespace}/service/");
    let rest = key.strip_prefix(root.as_str())?;

    let (service_name, leaf) = rest.split_once('/')?;
    if service_name.is_empty() || leaf.is_empty() || leaf.contains('/') {
        return None;
    }

    let (host_addr, port) = leaf.rsplit_once(':')?;
    if host_addr.is_empty() {
        return None;
    }
    let port: u16 = port.parse().ok()?;

    Some(ParsedKey {
        service_name: service_name.to_string(),
        host_addr: host_addr.to_string(),
        port,
    })
}
