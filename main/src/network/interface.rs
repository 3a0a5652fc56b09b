use mockall::automock;
use std::net::IpAddr;
use std::net::Ipv4Addr;

/// Lists the local addresses discovery probes bind to.
#[automock]
pub trait InterfaceEnumerator {
    /// Every unicast IPv4 address of every interface that is operationally up.
    fn list_discovery_addresses(&self) -> std::io::Result<Vec<Ipv4Addr>>;
}

/// Reads the interface inventory of the running system.
pub struct SystemInterfaceEnumerator;

impl SystemInterfaceEnumerator {
    fn scan() -> std::io::Result<Vec<NetworkInterface>> {
        let interfaces: Vec<_> = if_addrs::get_if_addrs()?
            .into_iter()
            .map(|i| NetworkInterface {
                up: i.is_oper_up(),
                address: i.ip(),
                name: i.name,
            })
            .collect();
        interfaces
            .iter()
            .for_each(|i| log::debug!("Scanned network interface: {:?}", i));
        Ok(interfaces)
    }
}

impl InterfaceEnumerator for SystemInterfaceEnumerator {
    fn list_discovery_addresses(&self) -> std::io::Result<Vec<Ipv4Addr>> {
        let addresses = discovery_addresses(Self::scan()?);
        log::info!("Discovery addresses: {:?}", addresses);
        Ok(addresses)
    }
}

#[derive(Debug)]
#[allow(dead_code)]
struct NetworkInterface {
    name: String,
    address: IpAddr,
    up: bool,
}

fn discovery_addresses(interfaces: impl IntoIterator<Item = NetworkInterface>) -> Vec<Ipv4Addr> {
    interfaces
        .into_iter()
        .filter(|i| i.up)
        .filter_map(|i| match i.address {
            IpAddr::V4(ip) => Some(ip),
            IpAddr::V6(_) => None,
        })
        .filter(|ip| !ip.is_unspecified() && !ip.is_multicast() && !ip.is_broadcast())
        .collect()
}
