// HTTP middleware

use axum::{
    extract::{ConnectInfo, FromRequestParts, MatchedPath, Request, State},
    http::{header::HOST, request::Parts, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use bvproxy_providers::bilibili::extract_bvid;
use once_cell::sync::Lazy;
use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

use super::{AppError, AppState};

static X_FORWARDED_FOR: Lazy<axum::http::HeaderName> =
    Lazy::new(|| axum::http::HeaderName::from_static("x-forwarded-for"));
static X_REAL_IP: Lazy<axum::http::HeaderName> =
    Lazy::new(|| axum::http::HeaderName::from_static("x-real-ip"));

/// Client address of the current request.
///
/// Peer socket address, or the first `X-Forwarded-For` / `X-Real-IP` entry when
/// proxy headers are trusted. `None` when neither is available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientIp(pub Option<IpAddr>);

impl ClientIp {
    #[must_use]
    pub fn resolve(
        headers: &HeaderMap,
        peer: Option<SocketAddr>,
        trust_proxy_headers: bool,
    ) -> Self {
        if trust_proxy_headers {
            let forwarded = headers
                .get(&*X_FORWARDED_FOR)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .and_then(|v| v.trim().parse::<IpAddr>().ok());
            let real_ip = || {
                headers
                    .get(&*X_REAL_IP)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.trim().parse::<IpAddr>().ok())
            };
            if let Some(ip) = forwarded.or_else(real_ip) {
                return Self(Some(ip));
            }
        }
        Self(peer.map(|addr| addr.ip()))
    }

    /// Key fragment for rate limiting and logs.
    #[must_use]
    pub fn label(&self) -> String {
        self.0
            .map_or_else(|| "unknown".to_string(), |ip| ip.to_string())
    }
}

impl FromRequestParts<AppState> for ClientIp {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Ok(Self::resolve(
            &parts.headers,
            peer,
            state.config.server.trust_proxy_headers,
        ))
    }
}

/// Paths this service answers at all.
#[must_use]
pub fn is_valid_path(path: &str) -> bool {
    path == "/"
        || path.starts_with("/submit")
        || path.starts_with("/live/")
        || path.starts_with("/ip")
        || extract_bvid(path).is_some()
}

/// Reject every path outside the allow-list with 403.
pub async fn filter_invalid_requests(req: Request, next: Next) -> Response {
    let path = req.uri().path();
    if !is_valid_path(path) {
        tracing::debug!("Rejected request to {}", path);
        return AppError::forbidden("Invalid request").into_response();
    }
    next.run(req).await
}

/// Match a `Host` header against the allow-list.
///
/// Entries are exact host names, `*` (anything) or `*.suffix` (subdomains).
#[must_use]
pub fn host_allowed(host: &str, allowed: &[String]) -> bool {
    if allowed.iter().any(|a| a == "*") {
        return true;
    }

    let host = strip_port(host).to_ascii_lowercase();
    allowed.iter().any(|pattern| {
        let pattern = pattern.to_ascii_lowercase();
        match pattern.strip_prefix("*.") {
            Some(suffix) => host
                .strip_suffix(suffix)
                .is_some_and(|rest| rest.ends_with('.')),
            None => host == pattern,
        }
    })
}

fn strip_port(host: &str) -> &str {
    if let Some(rest) = host.strip_prefix('[') {
        // [v6]:port
        return rest.split(']').next().unwrap_or(rest);
    }
    match host.rsplit_once(':') {
        Some((name, port)) if port.bytes().all(|b| b.is_ascii_digit()) => name,
        _ => host,
    }
}

/// Reject requests whose `Host` header is not trusted.
pub async fn trusted_host(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let allowed = &state.config.server.allowed_hosts;
    let host = req
        .headers()
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .or_else(|| req.uri().authority().map(|a| a.as_str()))
        .unwrap_or_default();

    if !host_allowed(host, allowed) {
        tracing::warn!("Rejected untrusted host header: {:?}", host);
        return AppError::bad_request("Invalid host header").into_response();
    }
    next.run(req).await
}

/// Per client, per route rate limit. Must be installed with `route_layer` so the
/// matched route template is known.
pub async fn rate_limit(
    State(state): State<AppState>,
    client_ip: ClientIp,
    req: Request,
    next: Next,
) -> Response {
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| req.uri().path().to_string(), |m| m.as_str().to_string());
    let key = format!("{route}:{}", client_ip.label());

    if let Err(e) = state.rate_limiter.check(&key) {
        tracing::warn!("Rate limit exceeded for {}", key);
        return AppError::from(e).into_response();
    }
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_is_valid_path() {
        assert!(is_valid_path("/"));
        assert!(is_valid_path("/submit"));
        assert!(is_valid_path("/submitted"));
        assert!(is_valid_path("/live/123"));
        assert!(is_valid_path("/ip"));
        assert!(is_valid_path("/BV1xx411c7mD"));
        assert!(is_valid_path("/video/BV1xx411c7mD/extra"));

        assert!(!is_valid_path("/live"));
        assert!(!is_valid_path("/favicon.ico"));
        assert!(!is_valid_path("/wp-admin"));
        assert!(!is_valid_path("/BV1xx411c7"));
        assert!(!is_valid_path(""));
    }

    #[test]
    fn test_host_allowed() {
        let any = vec!["*".to_string()];
        assert!(host_allowed("evil.example", &any));
        assert!(host_allowed("", &any));

        let list = vec!["b.example.com".to_string(), "*.cdn.example.com".to_string()];
        assert!(host_allowed("b.example.com", &list));
        assert!(host_allowed("B.Example.com:5000", &list));
        assert!(host_allowed("x.cdn.example.com", &list));
        assert!(!host_allowed("cdn.example.com", &list));
        assert!(!host_allowed("xcdn.example.com", &list));
        assert!(!host_allowed("other.example.com", &list));
        assert!(!host_allowed("", &list));

        let v6 = vec!["::1".to_string()];
        assert!(host_allowed("[::1]:5000", &v6));
    }

    #[test]
    fn test_client_ip_resolution() {
        let peer: SocketAddr = "10.0.0.1:4000".parse().unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            X_FORWARDED_FOR.clone(),
            HeaderValue::from_static("203.0.113.7, 10.0.0.2"),
        );

        let trusted = ClientIp::resolve(&headers, Some(peer), true);
        assert_eq!(trusted.label(), "203.0.113.7");

        let untrusted = ClientIp::resolve(&headers, Some(peer), false);
        assert_eq!(untrusted.label(), "10.0.0.1");

        let mut headers = HeaderMap::new();
        headers.insert(X_REAL_IP.clone(), HeaderValue::from_static("198.51.100.3"));
        assert_eq!(
            ClientIp::resolve(&headers, Some(peer), true).label(),
            "198.51.100.3"
        );

        assert_eq!(ClientIp::resolve(&HeaderMap::new(), None, true).label(), "unknown");
    }
}
