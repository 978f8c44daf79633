use http::header::{HOST, ORIGIN};
use http::request::Parts;
use http::{HeaderMap, Method};
use url::Url;

const CF_CONNECTING_IP: &str = "cf-connecting-ip";
const X_REAL_IP: &str = "x-real-ip";
const X_FORWARDED_FOR: &str = "x-forwarded-for";
const X_FORWARDED_PROTO: &str = "x-forwarded-proto";

/// What the gateway needs to know about an incoming request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: Method,
    /// Request path, still percent-encoded.
    pub path: String,
    /// Host without port, lowercased. Used for configuration lookup.
    pub host: String,
    /// Host as sent, including any port. Used to build served URLs.
    pub authority: String,
    pub scheme: String,
    pub origin: Option<String>,
    pub client_ip: String,
    pub headers: HeaderMap,
}

impl RequestContext {
    pub fn from_parts(parts: &Parts) -> Self {
        let headers = &parts.headers;

        let authority = header_str(headers, HOST.as_str())
            .map(str::to_string)
            .or_else(|| parts.uri.authority().map(|a| a.to_string()))
            .unwrap_or_default();

        let scheme = header_str(headers, X_FORWARDED_PROTO)
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_ascii_lowercase())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "http".to_string());

        Self {
            method: parts.method.clone(),
            path: parts.uri.path().to_string(),
            host: strip_port(&authority).to_ascii_lowercase(),
            authority,
            scheme,
            origin: header_str(headers, ORIGIN.as_str()).map(str::to_string),
            client_ip: client_ip(headers),
            headers: headers.clone(),
        }
    }

    /// First path segment, e.g. `img` for `/img/photo.png`.
    pub fn first_segment(&self) -> &str {
        self.path
            .trim_start_matches('/')
            .split('/')
            .next()
            .unwrap_or_default()
    }

    /// Value of header `name`, or the empty string.
    pub fn header_or_empty(&self, name: &str) -> &str {
        header_str(&self.headers, name).unwrap_or_default()
    }

    /// Absolute URL of `path` on the host the request came in on.
    pub fn absolute_url(&self, path: &str) -> String {
        let base = format!("{}://{}/", self.scheme, self.authority);
        match Url::parse(&base).and_then(|base| base.join(path)) {
            Ok(url) => url.to_string(),
            Err(_) => format!("{}://{}{}", self.scheme, self.authority, path),
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn client_ip(headers: &HeaderMap) -> String {
    header_str(headers, CF_CONNECTING_IP)
        .or_else(|| header_str(headers, X_REAL_IP))
        .or_else(|| header_str(headers, X_FORWARDED_FOR).and_then(|v| v.split(',').next()))
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .unwrap_or("unknown")
        .to_string()
}

fn strip_port(authority: &str) -> &str {
    if authority.starts_with('[') {
        return match authority.find(']') {
            Some(end) => &authority[..=end],
            None => authority,
        };
    }
    match authority.rsplit_once(':') {
        Some((host, port)) if port.chars().all(|c| c.is_ascii_digit()) => host,
        _ => authority,
    }
}
