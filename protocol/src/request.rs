use std::fmt::Display;

/// The `M-SEARCH` request multicast by a probe.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct DiscoveryRequest {
    text: String,
}

impl DiscoveryRequest {
    pub fn new(host: impl Display, search_target: &str) -> Self {
        let text = format!(
            "M-SEARCH * HTTP/1.1\nHost: {}\nMan: \"ssdp:discover\"\nST: {}\n",
            host, search_target
        );
        Self { text }
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.text.as_bytes()
    }
}

impl Default for DiscoveryRequest {
    fn default() -> Self {
        Self::new(crate::MULTICAST_ADDRESS, crate::ECP_SEARCH_TARGET)
    }
}
