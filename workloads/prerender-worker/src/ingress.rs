//! Conversion between Spin's HTTP types and the gateway's.

use anyhow::{Context, Result};
use http::header::{HeaderName, HeaderValue, CONTENT_LENGTH, HOST};
use http::{HeaderMap, Method};
use prerender_core::{GatewayResponse, IncomingRequest};
use prerender_origin::is_hop_by_hop;

/// Header Spin sets to the full URL the client requested.
pub const SPIN_FULL_URL: &str = "spin-full-url";

/// Build the gateway request from the raw parts Spin hands us.
///
/// Headers injected by the Spin host (`spin-*`) are dropped. The URL is taken
/// from `spin-full-url`, or rebuilt from `host` and the path, then escaped
/// with [`escape_url`].
pub fn to_gateway_request(
    method: Method,
    path_with_query: Option<String>,
    entries: Vec<(String, Vec<u8>)>,
    body: Vec<u8>,
) -> Result<IncomingRequest> {
    let mut full_url = None;
    let mut host = None;
    let mut headers = HeaderMap::new();

    for (name, value) in entries {
        let name = name.to_ascii_lowercase();
        if name == SPIN_FULL_URL {
            full_url = Some(String::from_utf8_lossy(&value).into_owned());
            continue;
        }
        if name.starts_with("spin-") {
            continue;
        }
        if name == HOST.as_str() {
            host = Some(String::from_utf8_lossy(&value).into_owned());
        }

        let name = HeaderName::from_bytes(name.as_bytes())
            .with_context(|| format!("invalid request header name: {}", name))?;
        let value = HeaderValue::from_bytes(&value)
            .with_context(|| format!("invalid value for request header {}", name))?;
        headers.append(name, value);
    }

    let url = match full_url {
        Some(url) => url,
        None => {
            let host = host.context("request has neither spin-full-url nor host")?;
            format!(
                "http://{}{}",
                host,
                path_with_query.as_deref().unwrap_or("/")
            )
        }
    };

    Ok(IncomingRequest::new(method, escape_url(url)?)?
        .with_headers(headers)
        .with_body(body))
}

/// Percent-encode characters `http::Uri` refuses, such as `"` and space.
///
/// URLs `http::Uri` already accepts are returned byte-for-byte.
pub fn escape_url(raw: String) -> Result<String> {
    if raw.parse::<http::Uri>().is_ok() {
        return Ok(raw);
    }
    let url = url::Url::parse(&raw).with_context(|| format!("invalid request URL: {}", raw))?;
    Ok(url.into())
}

/// Convert Spin's method type.
pub fn from_spin_method(method: &spin_sdk::http::Method) -> Result<Method> {
    use spin_sdk::http::Method as SpinMethod;

    Ok(match method {
        SpinMethod::Get => Method::GET,
        SpinMethod::Head => Method::HEAD,
        SpinMethod::Post => Method::POST,
        SpinMethod::Put => Method::PUT,
        SpinMethod::Delete => Method::DELETE,
        SpinMethod::Patch => Method::PATCH,
        SpinMethod::Options => Method::OPTIONS,
        SpinMethod::Connect => Method::CONNECT,
        SpinMethod::Trace => Method::TRACE,
        SpinMethod::Other(other) => Method::from_bytes(other.as_bytes())
            .with_context(|| format!("invalid request method: {}", other))?,
    })
}

/// Split a response into status, header list and body for Spin.
///
/// Hop-by-hop headers and `content-length` are left for the host to frame.
pub fn to_spin_parts(response: GatewayResponse) -> (u16, Vec<(String, Vec<u8>)>, Vec<u8>) {
    let (status, headers, body) = response.into_parts();
    let headers = headers
        .iter()
        .filter(|(name, _)| !is_hop_by_hop(name.as_str()) && **name != CONTENT_LENGTH)
        .map(|(name, value)| (name.as_str().to_string(), value.as_bytes().to_vec()))
        .collect();
    (status.as_u16(), headers, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    fn entry(name: &str, value: &str) -> (String, Vec<u8>) {
        (name.to_string(), value.as_bytes().to_vec())
    }

    #[test]
    fn test_full_url_and_spin_headers_dropped() {
        let request = to_gateway_request(
            Method::GET,
            Some("/pricing?plan=pro".to_string()),
            vec![
                entry("spin-full-url", "https://www.example.com/pricing?plan=pro"),
                entry("spin-path-info", "/pricing"),
                entry("host", "www.example.com"),
                entry("User-Agent", "Googlebot/2.1"),
            ],
            Vec::new(),
        )
        .unwrap();

        assert_eq!(request.url(), "https://www.example.com/pricing?plan=pro");
        assert_eq!(request.user_agent(), "Googlebot/2.1");
        assert!(request.header("spin-path-info").is_none());
        assert!(request.header("spin-full-url").is_none());
        assert_eq!(request.header("host"), Some("www.example.com"));
    }

    #[test]
    fn test_url_from_host() {
        let request = to_gateway_request(
            Method::POST,
            Some("/cart".to_string()),
            vec![entry("host", "shop.test")],
            b"sku=1".to_vec(),
        )
        .unwrap();

        assert_eq!(request.url(), "http://shop.test/cart");
        assert_eq!(request.body(), b"sku=1");
    }

    #[test]
    fn test_quote_in_query_is_escaped() {
        let request = to_gateway_request(
            Method::GET,
            None,
            vec![entry("spin-full-url", "https://site.test/search?q=\"x\"")],
            Vec::new(),
        )
        .unwrap();

        assert_eq!(request.url(), "https://site.test/search?q=%22x%22");
        assert_eq!(request.query(), Some("q=%22x%22"));
    }

    #[test]
    fn test_space_in_path_is_escaped() {
        let request = to_gateway_request(
            Method::POST,
            Some("/my cart".to_string()),
            vec![entry("host", "shop.test")],
            Vec::new(),
        )
        .unwrap();

        assert_eq!(request.url(), "http://shop.test/my%20cart");
        assert_eq!(request.path(), "/my%20cart");
    }

    #[test]
    fn test_valid_urls_kept_verbatim() {
        let raw = "https://Site.test/a/../b?x=%7e&y";
        assert_eq!(escape_url(raw.to_string()).unwrap(), raw);
        assert!(escape_url("not a url".to_string()).is_err());
    }

    #[test]
    fn test_other_methods_pass_through() {
        use spin_sdk::http::Method as SpinMethod;

        assert_eq!(from_spin_method(&SpinMethod::Head).unwrap(), Method::HEAD);
        assert_eq!(
            from_spin_method(&SpinMethod::Other("PURGE".to_string())).unwrap().as_str(),
            "PURGE"
        );
    }

    #[test]
    fn test_no_url_source() {
        assert!(to_gateway_request(Method::GET, Some("/".to_string()), Vec::new(), Vec::new()).is_err());
    }

    #[test]
    fn test_response_parts_skip_framing_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("text/html"));
        headers.insert("content-length", HeaderValue::from_static("42"));
        headers.insert("connection", HeaderValue::from_static("keep-alive"));
        let response = GatewayResponse::new(StatusCode::OK, headers, "<html></html>");

        let (status, headers, body) = to_spin_parts(response);
        assert_eq!(status, 200);
        assert_eq!(headers, vec![entry("content-type", "text/html")]);
        assert_eq!(body, b"<html></html>");
    }
}
