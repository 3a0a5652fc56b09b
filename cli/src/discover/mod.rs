use anyhow::Context;
use clap::Args;
use futures_util::StreamExt;
use roku_ecp::CancellationToken;
use roku_ecp::DeviceDiscovered;
use roku_ecp::DiscoveryConfig;
use roku_ecp::DiscoveryCoordinator;
use roku_ecp::InterfaceEnumerator;
use roku_ecp::SystemInterfaceEnumerator;
use std::net::SocketAddrV4;
use std::time::Duration;

#[derive(Args)]
pub struct DiscoverOptions {
    /// Seconds to wait for responses
    #[arg(long, default_value_t = 5)]
    timeout: u64,

    /// Stop after the first device
    #[arg(long)]
    first: bool,

    /// Print one JSON object per device
    #[arg(long)]
    json: bool,

    /// Destination of the discovery request
    #[arg(long, default_value_t = DiscoveryConfig::default().multicast_address)]
    multicast_address: SocketAddrV4,

    /// Service type to search for
    #[arg(long, default_value_t = DiscoveryConfig::default().search_target)]
    search_target: String,
}

pub async fn discover(options: DiscoverOptions) -> anyhow::Result<()> {
    let config = DiscoveryConfig {
        multicast_address: options.multicast_address,
        search_target: options.search_target,
    };
    let coordinator = DiscoveryCoordinator::with_config(SystemInterfaceEnumerator, config);
    let mut devices = roku_ecp::scan(&coordinator, CancellationToken::new())
        .context("Failed to start discovery")?;
    log::info!("Probing {} local addresses", devices.session().len());

    let deadline = tokio::time::sleep(Duration::from_secs(options.timeout));
    tokio::pin!(deadline);
    loop {
        tokio::select! {
            _ = &mut deadline => {
                log::info!("Discovery timed out");
                break;
            }
            _ = tokio::signal::ctrl_c() => break,
            event = devices.next() => {
                let Some(event) = event else {
                    break;
                };
                println!("{}", format_device(&event, options.json)?);
                if options.first {
                    break;
                }
            }
        }
    }

    devices.cancel();
    let reports = devices.into_session().join().await;
    if !reports.is_empty() && reports.iter().all(|r| r.result.is_err()) {
        anyhow::bail!("Discovery failed on every network interface");
    }
    Ok(())
}

pub fn print_interfaces() -> anyhow::Result<()> {
    let addresses = SystemInterfaceEnumerator
        .list_discovery_addresses()
        .context("Failed to list network interfaces")?;
    addresses.iter().for_each(|a| println!("{}", a));
    Ok(())
}

fn format_device(event: &DeviceDiscovered, json: bool) -> anyhow::Result<String> {
    if json {
        return serde_json::to_string(event).map_err(Into::into);
    }
    Ok(format!(
        "{}\t{}\t{}",
        event.serial_number, event.location, event.local_address
    ))
}
