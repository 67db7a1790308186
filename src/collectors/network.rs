// Interface enumeration and address classification

use std::net::IpAddr;
use std::sync::Arc;

use sysinfo::Networks;
use tracing::instrument;

use crate::models::NetworkInterface;
use crate::platform::NetExt;

/// All-zero hardware address some stacks report for virtual interfaces.
const MAC_SENTINEL: &str = "00:00:00:00:00:00";

/// One raw address as the OS reported it, before classification.
pub(crate) enum RawAddress {
    Link(String),
    V4(String),
    V6(String),
}

pub struct NetworkCollector {
    networks: Arc<std::sync::Mutex<Networks>>,
    ext: Arc<dyn NetExt>,
}

impl NetworkCollector {
    pub fn new(ext: Box<dyn NetExt>) -> Self {
        Self {
            networks: Arc::new(std::sync::Mutex::new(Networks::new_with_refreshed_list())),
            ext: Arc::from(ext),
        }
    }

    #[instrument(skip(self), fields(collector = "network"))]
    pub async fn collect(&self) -> anyhow::Result<Vec<NetworkInterface>> {
        let networks = self.networks.clone();
        let ext = self.ext.clone();
        tokio::task::spawn_blocking(move || {
            let mut networks = networks
                .lock()
                .map_err(|e| anyhow::anyhow!("sysinfo networks lock poisoned: {}", e))?;
            networks.refresh(true);

            let mut interfaces: Vec<NetworkInterface> = networks
                .iter()
                .map(|(name, data)| {
                    let mut addresses = vec![RawAddress::Link(data.mac_address().to_string())];
                    for net in data.ip_networks() {
                        addresses.push(match net.addr {
                            IpAddr::V4(a) => RawAddress::V4(a.to_string()),
                            IpAddr::V6(a) => RawAddress::V6(a.to_string()),
                        });
                    }
                    let mut row = classify_interface(name, addresses);
                    let stats = ext.link_stats(name);
                    row.is_up = stats.is_up;
                    row.speed_mbps = stats.speed_mbps;
                    row.duplex = stats.duplex;
                    let mtu = data.mtu();
                    row.mtu = if mtu > 0 { Some(mtu) } else { None };
                    row
                })
                .collect();

            ext.enrich(&mut interfaces);
            interfaces.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(interfaces)
        })
        .await
        .map_err(|e| anyhow::anyhow!("network collector task join: {}", e))?
    }
}

/// Classify raw addresses by family: link-layer becomes `mac` (the all-zero
/// sentinel is ignored), IPv6 loses any `%zone` suffix.
pub(crate) fn classify_interface(name: &str, addresses: Vec<RawAddress>) -> NetworkInterface {
    let mut row = NetworkInterface {
        name: name.to_string(),
        ..NetworkInterface::default()
    };
    for address in addresses {
        match address {
            RawAddress::Link(mac) => {
                if !mac.is_empty() && mac != MAC_SENTINEL {
                    row.mac = Some(mac);
                }
            }
            RawAddress::V4(addr) => {
                if !addr.is_empty() {
                    row.ipv4.push(addr);
                }
            }
            RawAddress::V6(addr) => {
                if !addr.is_empty() {
                    let stripped = match addr.split_once('%') {
                        Some((bare, _zone)) => bare.to_string(),
                        None => addr,
                    };
                    row.ipv6.push(stripped);
                }
            }
        }
    }
    row
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_address_per_family_classifies_cleanly() {
        let row = classify_interface(
            "eth0",
            vec![
                RawAddress::Link("aa:bb:cc:dd:ee:ff".into()),
                RawAddress::V4("192.168.1.10".into()),
                RawAddress::V6("fe80::1%eth0".into()),
            ],
        );
        assert_eq!(row.name, "eth0");
        assert_eq!(row.mac.as_deref(), Some("aa:bb:cc:dd:ee:ff"));
        assert_eq!(row.ipv4, vec!["192.168.1.10"]);
        assert_eq!(row.ipv6, vec!["fe80::1"]);
    }

    #[test]
    fn all_zero_mac_is_ignored() {
        let row = classify_interface(
            "tun0",
            vec![
                RawAddress::Link(MAC_SENTINEL.into()),
                RawAddress::V4("10.8.0.2".into()),
            ],
        );
        assert_eq!(row.mac, None);
        assert_eq!(row.ipv4, vec!["10.8.0.2"]);
    }

    #[test]
    fn interface_without_addresses_stays_bare() {
        let row = classify_interface("dummy0", Vec::new());
        assert_eq!(row.mac, None);
        assert!(row.ipv4.is_empty());
        assert!(row.ipv6.is_empty());
        assert_eq!(row.is_up, None);
        assert_eq!(row.speed_mbps, None);
    }

    #[tokio::test]
    async fn collect_yields_sorted_interfaces() {
        let collector = NetworkCollector::new(crate::platform::net_ext());
        let interfaces = collector.collect().await.unwrap();
        for pair in interfaces.windows(2) {
            assert!(pair[0].name <= pair[1].name);
        }
    }
}
