use std::collections::HashMap;
use thiserror::Error;

/// A parsed discovery response: an HTTP-like status line followed by headers.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct DiscoveryResponse {
    version: String,
    status_code: u16,
    status_message: String,
    headers: Headers,
}

impl DiscoveryResponse {
    pub fn parse(datagram: &[u8]) -> Result<Self, ParseError> {
        let text = String::from_utf8_lossy(datagram);
        let mut lines = text.lines();
        let status_line = lines.next().ok_or(ParseError::Empty)?;
        let (version, status_code, status_message) = parse_status_line(status_line)?;

        let mut headers = Headers::default();
        for line in lines {
            if let Some((name, value)) = line.split_once(':') {
                headers.insert(name.trim(), value.trim());
            }
        }

        Ok(Self {
            version: version.into(),
            status_code,
            status_message: status_message.into(),
            headers,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn status_message(&self) -> &str {
        &self.status_message
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }
}

fn parse_status_line(line: &str) -> Result<(&str, u16, &str), ParseError> {
    let line = line.trim();
    let malformed = || ParseError::MalformedStatusLine(line.into());

    let (version, rest) = line.split_once(char::is_whitespace).ok_or_else(malformed)?;
    let (status_code, status_message) = rest
        .trim_start()
        .split_once(char::is_whitespace)
        .ok_or_else(malformed)?;
    let status_code = status_code
        .parse()
        .map_err(|_| ParseError::InvalidStatusCode(status_code.into()))?;
    let status_message = status_message.trim();
    if status_message.is_empty() {
        return Err(malformed());
    }

    Ok((version, status_code, status_message))
}

/// Response headers with case-insensitive names.
///
/// A header appearing more than once keeps its last value.
#[derive(Debug, Default, PartialEq, Eq, Clone)]
pub struct Headers {
    entries: HashMap<String, String>,
}

impl Headers {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(&mut self, name: &str, value: &str) {
        self.entries.insert(name.to_ascii_lowercase(), value.into());
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseError {
    #[error("Empty datagram")]
    Empty,

    #[error("Malformed status line `{0}`")]
    MalformedStatusLine(String),

    #[error("Invalid status code `{0}`")]
    InvalidStatusCode(String),
}
