use serde::Serialize;
use std::net::Ipv4Addr;
use url::Url;

/// A device found on the network, addressed by its ECP base location.
#[derive(Debug, PartialEq, Eq, Clone, Serialize)]
pub struct RokuDevice {
    location: Url,
    id: String,
}

impl RokuDevice {
    pub fn new(location: Url, id: impl Into<String>) -> Self {
        Self {
            location,
            id: id.into(),
        }
    }

    /// Base address of the device's command endpoints.
    pub fn location(&self) -> &Url {
        &self.location
    }

    /// Unique serial token (the `USN` header) of the device.
    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Event passed to every listener when a probe finds a device.
#[derive(Debug, PartialEq, Eq, Clone, Serialize)]
pub struct DeviceDiscovered {
    pub device: RokuDevice,
    pub location: Url,
    pub serial_number: String,

    /// Address of the local interface whose probe received the response.
    pub local_address: Ipv4Addr,

    /// Whether an earlier listener already asked the probe to stop.
    pub stop_requested: bool,
}

impl DeviceDiscovered {
    pub(crate) fn new(location: Url, serial_number: String, local_address: Ipv4Addr) -> Self {
        Self {
            device: RokuDevice::new(location.clone(), serial_number.clone()),
            location,
            serial_number,
            local_address,
            stop_requested: false,
        }
    }
}
