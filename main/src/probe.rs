use crate::listener::Listeners;
use crate::DeviceDiscovered;
use crate::DiscoveryConfig;
use futures_util::StreamExt;
use roku_ecp_protocol::DecodeError;
use roku_ecp_protocol::DiscoveryRequest;
use roku_ecp_protocol::DiscoveryResponse;
use roku_ecp_protocol::ResponseDecoder;
use std::net::Ipv4Addr;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tokio_util::udp::UdpFramed;
use url::Url;

/// Discovers devices reachable through one local address.
pub struct Probe {
    local_address: Ipv4Addr,
    config: Arc<DiscoveryConfig>,
    listeners: Listeners,
}

impl Probe {
    pub(crate) fn new(
        local_address: Ipv4Addr,
        config: Arc<DiscoveryConfig>,
        listeners: Listeners,
    ) -> Self {
        Self {
            local_address,
            config,
            listeners,
        }
    }

    /// Sends the discovery request, then notifies listeners of every qualifying
    /// response until cancelled or stopped by a listener.
    pub async fn run(self, cancellation: CancellationToken) -> Result<ProbeStop, ProbeError> {
        if cancellation.is_cancelled() {
            return Ok(ProbeStop::Cancelled);
        }

        let socket = crate::network::multicast::new_probe_socket(self.local_address)
            .map_err(ProbeError::Bind)?;
        log::debug!("Probe socket bound at {:?}", socket.local_addr());

        let destination = self.config.multicast_address;
        let request = DiscoveryRequest::new(destination, &self.config.search_target);
        socket
            .send_to(request.as_bytes(), destination)
            .await
            .map_err(ProbeError::Send)?;
        log::debug!(
            "Sent discovery request to {} from {}",
            destination,
            self.local_address
        );

        let mut responses = UdpFramed::new(socket, ResponseDecoder);
        loop {
            let received = tokio::select! {
                biased;
                _ = cancellation.cancelled() => {
                    log::debug!("Probe on {} cancelled", self.local_address);
                    return Ok(ProbeStop::Cancelled);
                }
                received = responses.next() => received,
            };

            let (response, remote_address) = match received {
                Some(Ok(inner)) => inner,
                Some(Err(DecodeError::Parse(e))) => {
                    log::debug!(
                        "Discarding a malformed response on {}: {}",
                        self.local_address,
                        e
                    );
                    continue;
                }
                Some(Err(DecodeError::Io(e))) => return Err(ProbeError::Receive(e)),
                None => return Err(ProbeError::SocketClosed),
            };

            let Some((location, serial_number)) = qualify(&response, &self.config.search_target)
            else {
                log::trace!("Ignoring a response from {}: {:?}", remote_address, response);
                continue;
            };

            log::info!(
                "Discovered {} at {} via {}",
                serial_number,
                location,
                self.local_address
            );
            let event = DeviceDiscovered::new(location, serial_number, self.local_address);
            if crate::listener::notify(&self.listeners, event).await {
                log::debug!("Probe on {} stopped by a listener", self.local_address);
                return Ok(ProbeStop::Vetoed);
            }
        }
    }
}

/// Returns the device location and serial of a response announcing the
/// requested service.
fn qualify(response: &DiscoveryResponse, search_target: &str) -> Option<(Url, String)> {
    if response.status_code() != 200 {
        return None;
    }

    let headers = response.headers();
    if headers.get("ST")? != search_target {
        return None;
    }
    let location = Url::parse(headers.get("LOCATION")?).ok()?;
    let serial_number = headers.get("USN")?;
    Some((location, serial_number.into()))
}

/// How a probe ended without error.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ProbeStop {
    /// The cancellation token fired.
    Cancelled,

    /// A listener asked the probe to stop.
    Vetoed,
}

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Failed to bind a socket")]
    Bind(#[source] std::io::Error),

    #[error("Failed to send the discovery request")]
    Send(#[source] std::io::Error),

    #[error("Failed to receive a discovery response")]
    Receive(#[source] std::io::Error),

    #[error("Socket closed unexpectedly")]
    SocketClosed,
}
