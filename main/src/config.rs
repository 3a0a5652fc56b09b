use roku_ecp_protocol::ECP_SEARCH_TARGET;
use roku_ecp_protocol::MULTICAST_ADDRESS;
use std::net::SocketAddrV4;

/// Settings shared by every probe of a discovery session.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct DiscoveryConfig {
    /// Destination of the discovery request.
    pub multicast_address: SocketAddrV4,

    /// `ST` value requested and required in responses.
    pub search_target: String,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            multicast_address: MULTICAST_ADDRESS,
            search_target: ECP_SEARCH_TARGET.into(),
        }
    }
}
