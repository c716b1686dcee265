//! Read-only view of an inbound request.

use http::header::HOST;
use http::{HeaderMap, Uri};

/// What the profiler needs to know about a request.
pub trait ProfiledRequest {
    /// Gets a header value by name (case-insensitive).
    ///
    /// Values that are not visible ASCII are treated as absent.
    fn header(&self, name: &str) -> Option<&str>;

    /// Request URL without the query string.
    fn url(&self) -> String;
}

impl<B> ProfiledRequest for http::Request<B> {
    fn header(&self, name: &str) -> Option<&str> {
        header_str(self.headers(), name)
    }

    fn url(&self) -> String {
        request_url(self.uri(), self.headers())
    }
}

impl ProfiledRequest for http::request::Parts {
    fn header(&self, name: &str) -> Option<&str> {
        header_str(&self.headers, name)
    }

    fn url(&self) -> String {
        request_url(&self.uri, &self.headers)
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn request_url(uri: &Uri, headers: &HeaderMap) -> String {
    let path = uri.path();
    match (uri.scheme_str(), uri.authority()) {
        (Some(scheme), Some(authority)) => format!("{}://{}{}", scheme, authority, path),
        _ => match header_str(headers, HOST.as_str()) {
            Some(host) => format!("http://{}{}", host, path),
            None => path.to_string(),
        },
    }
}
