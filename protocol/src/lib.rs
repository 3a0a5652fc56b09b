//! SSDP-style discovery protocol spoken by ECP devices.

mod request;
mod response;

pub use request::DiscoveryRequest;
pub use response::DiscoveryResponse;
pub use response::Headers;
pub use response::ParseError;

use bytes::BytesMut;
use std::net::Ipv4Addr;
use std::net::SocketAddrV4;
use thiserror::Error;
use tokio_util::codec::Decoder;

/// Multicast group devices listen on.
pub const MULTICAST_ADDRESS: SocketAddrV4 =
    SocketAddrV4::new(Ipv4Addr::new(239, 255, 255, 250), 1900);

/// Search target identifying ECP devices.
pub const ECP_SEARCH_TARGET: &str = "roku:ecp";

/// Decodes each received datagram as one [DiscoveryResponse].
#[derive(Default)]
pub struct ResponseDecoder;

impl Decoder for ResponseDecoder {
    type Item = DiscoveryResponse;
    type Error = DecodeError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }

        // The whole datagram is consumed even if it fails to parse.
        let datagram = src.split();
        DiscoveryResponse::parse(&datagram)
            .map(Some)
            .map_err(Into::into)
    }
}

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Error from network I/O")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse a discovery response")]
    Parse(#[from] ParseError),
}
