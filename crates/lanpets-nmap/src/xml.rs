//! Parses `nmap -oX -` output. Only the fields the bridge needs: per-host
//! IPv4 address, MAC, first non-empty hostname, and open TCP ports.

use std::collections::HashMap;

use quick_xml::Reader;
use quick_xml::events::Event;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanHost {
    pub mac: Option<String>,
    pub hostname: Option<String>,
    /// `(port, service name)`, open ports only, in document order.
    pub open_ports: Vec<(u16, String)>,
}

pub fn parse_scan_xml(xml: &str) -> Result<HashMap<String, ScanHost>, String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut hosts = HashMap::new();
    let mut current_ip: Option<String> = None;
    let mut current_host = ScanHost::default();
    let mut hostnames_seen: Vec<String> = Vec::new();
    let mut pending_port: Option<u16> = None;
    let mut pending_port_open = false;

    loop {
        match reader.read_event().map_err(|error| format!("nmap xml parse error: {error}"))? {
            Event::Eof => break,
            Event::Start(tag) | Event::Empty(tag) => {
                let name = tag.name();
                let local = String::from_utf8_lossy(name.as_ref()).into_owned();
                match local.as_str() {
                    "host" => {
                        current_ip = None;
                        current_host = ScanHost::default();
                        hostnames_seen.clear();
                    }
                    "address" => {
                        let mut addr = None;
                        let mut addrtype = None;
                        for attr in tag.attributes().flatten() {
                            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
                            let value = attr.unescape_value().unwrap_or_default().into_owned();
                            match key.as_str() {
                                "addr" => addr = Some(value),
                                "addrtype" => addrtype = Some(value),
                                _ => {}
                            }
                        }
                        match addrtype.as_deref() {
                            Some("ipv4") => current_ip = addr,
                            Some("mac") => {
                                current_host.mac = addr.map(|a| a.replace(':', "-"));
                            }
                            _ => {}
                        }
                    }
                    "hostname" => {
                        let mut hostname_name = None;
                        for attr in tag.attributes().flatten() {
                            if attr.key.as_ref() == b"name" {
                                hostname_name = Some(attr.unescape_value().unwrap_or_default().into_owned());
                            }
                        }
                        if let Some(name) = hostname_name {
                            if !name.is_empty() {
                                hostnames_seen.push(name);
                            }
                        }
                    }
                    "port" => {
                        pending_port = None;
                        pending_port_open = false;
                        for attr in tag.attributes().flatten() {
                            if attr.key.as_ref() == b"portid" {
                                pending_port =
                                    attr.unescape_value().unwrap_or_default().parse::<u16>().ok();
                            }
                        }
                    }
                    "state" => {
                        if pending_port.is_some() {
                            for attr in tag.attributes().flatten() {
                                if attr.key.as_ref() == b"state" {
                                    let value = attr.unescape_value().unwrap_or_default();
                                    pending_port_open = value == "open";
                                }
                            }
                        }
                    }
                    "service" => {
                        if let Some(port) = pending_port {
                            if pending_port_open {
                                let mut service_name = String::new();
                                for attr in tag.attributes().flatten() {
                                    if attr.key.as_ref() == b"name" {
                                        service_name = attr.unescape_value().unwrap_or_default().into_owned();
                                    }
                                }
                                current_host.open_ports.push((port, service_name));
                            }
                            pending_port = None;
                        }
                    }
                    _ => {}
                }
            }
            Event::End(tag) => {
                if tag.name().as_ref() == b"host" {
                    if let Some(ip) = current_ip.take() {
                        if hostnames_seen.len() > 1 {
                            tracing::warn!(%ip, names = ?hostnames_seen, "multiple hostnames found for host");
                        }
                        current_host.hostname = hostnames_seen.first().cloned();
                        hosts.insert(ip, std::mem::take(&mut current_host));
                    }
                }
            }
            _ => {}
        }
    }
    Ok(hosts)
}

/// `port(name)` entries joined by commas, e.g. `22(ssh),80(http)`.
pub fn render_services(host: &ScanHost) -> Option<String> {
    if host.open_ports.is_empty() {
        return None;
    }
    Some(
        host.open_ports
            .iter()
            .map(|(port, name)| if name.is_empty() { port.to_string() } else { format!("{port}({name})") })
            .collect::<Vec<_>>()
            .join(","),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0"?>
<nmaprun>
<host><status state="up"/>
  <address addr="192.168.1.100" addrtype="ipv4"/>
  <address addr="A4:77:33:75:BC:C0" addrtype="mac" vendor="Google"/>
  <hostnames><hostname name="" type=""/></hostnames>
</host>
<host><status state="up"/>
  <address addr="192.168.1.110" addrtype="ipv4"/>
  <address addr="7C:83:34:BE:62:5C" addrtype="mac"/>
  <hostnames><hostname name="bee.internal" type="PTR"/></hostnames>
  <ports>
    <port protocol="tcp" portid="22"><state state="open"/><service name="ssh"/></port>
    <port protocol="tcp" portid="80"><state state="closed"/><service name="http"/></port>
  </ports>
</host>
</nmaprun>"#;

    #[test]
    fn parses_hosts_with_mac_dash_normalization_and_empty_hostname_skipped() {
        let hosts = parse_scan_xml(SAMPLE).unwrap();
        assert_eq!(hosts.len(), 2);
        let h1 = &hosts["192.168.1.100"];
        assert_eq!(h1.mac.as_deref(), Some("A4-77-33-75-BC-C0"));
        assert_eq!(h1.hostname, None);
    }

    #[test]
    fn only_open_ports_are_rendered_as_services() {
        let hosts = parse_scan_xml(SAMPLE).unwrap();
        let h2 = &hosts["192.168.1.110"];
        assert_eq!(h2.hostname.as_deref(), Some("bee.internal"));
        assert_eq!(render_services(h2), Some("22(ssh)".to_string()));
    }

    #[test]
    fn host_with_no_open_ports_has_no_services_string() {
        let host = ScanHost::default();
        assert_eq!(render_services(&host), None);
    }
}
