//! Outbound response shapes and probe header parsing.

use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};

/// What the profiler can do with an outbound response.
#[derive(Debug)]
pub enum ResponseShape<'a> {
    /// Response with a status and a header map the probe header can go into
    Headers {
        status: StatusCode,
        headers: &'a mut HeaderMap,
    },
    /// Anything else; left untouched
    Unsupported,
}

impl<'a> ResponseShape<'a> {
    /// Status code, when the response exposes one
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ResponseShape::Headers { status, .. } => Some(*status),
            ResponseShape::Unsupported => None,
        }
    }
}

impl<'a, B> From<&'a mut http::Response<B>> for ResponseShape<'a> {
    fn from(response: &'a mut http::Response<B>) -> Self {
        let status = response.status();
        ResponseShape::Headers {
            status,
            headers: response.headers_mut(),
        }
    }
}

/// Header the probe asked to relay back to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResponseHeader {
    pub name: String,
    pub value: String,
}

impl ProbeResponseHeader {
    /// Parse a probe response line of the form `Name: value`.
    ///
    /// The name gets an `x-` prefix and is lower-cased, so the agent's
    /// `X-Blackfire-Response` line becomes `x-x-blackfire-response`. Clients
    /// continuing a profile rely on that exact name.
    pub fn parse(line: &str) -> Option<Self> {
        let (name, value) = line.split_once(':')?;
        Some(Self {
            name: format!("x-{}", name).to_lowercase(),
            value: value.trim().to_string(),
        })
    }

    /// Convert into typed header parts; `None` if either is not valid HTTP.
    pub fn to_header(&self) -> Option<(HeaderName, HeaderValue)> {
        let name = HeaderName::from_bytes(self.name.as_bytes()).ok()?;
        let value = HeaderValue::from_str(&self.value).ok()?;
        Some((name, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keeps_double_prefix() {
        let header = ProbeResponseHeader::parse("X-Blackfire-Response: continue=true&foo=bar").unwrap();
        assert_eq!(header.name, "x-x-blackfire-response");
        assert_eq!(header.value, "continue=true&foo=bar");
    }

    #[test]
    fn test_parse_splits_on_first_colon_and_trims_value() {
        let header = ProbeResponseHeader::parse("Blackfire-Error:   101 http://x:8307  ").unwrap();
        assert_eq!(header.name, "x-blackfire-error");
        assert_eq!(header.value, "101 http://x:8307");
    }

    #[test]
    fn test_parse_without_colon() {
        assert_eq!(ProbeResponseHeader::parse("garbage"), None);
        assert_eq!(ProbeResponseHeader::parse(""), None);
    }

    #[test]
    fn test_to_header_rejects_invalid_name() {
        let header = ProbeResponseHeader::parse("Bad Name: value").unwrap();
        assert!(header.to_header().is_none());

        let header = ProbeResponseHeader::parse("Good: value").unwrap();
        let (name, value) = header.to_header().unwrap();
        assert_eq!(name.as_str(), "x-good");
        assert_eq!(value, "value");
    }

    #[test]
    fn test_shape_from_response() {
        let mut response = http::Response::builder()
            .status(StatusCode::CREATED)
            .body(())
            .unwrap();

        let shape = ResponseShape::from(&mut response);
        assert_eq!(shape.status(), Some(StatusCode::CREATED));
        assert_eq!(ResponseShape::Unsupported.status(), None);
    }
}
