//! Bilibili HTTP Client

use reqwest::header::{ACCEPT, COOKIE};
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, error};

use super::error::BilibiliError;
use super::types::{SessionCredential, SESSDATA};

pub(crate) const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/87.0.4280.88 Safari/537.36";
const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";
const ACCEPT_JSON: &str = "application/json";

pub(crate) const NAV_PATH: &str = "/x/web-interface/nav";
pub(crate) const SEARCH_PATH: &str = "/x/web-interface/wbi/search/all/v2";

/// Base URLs of the upstream services
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BilibiliEndpoints {
    /// Landing page, source of the anonymous session cookies
    pub www_base: String,
    pub api_base: String,
    pub live_base: String,
}

impl Default for BilibiliEndpoints {
    fn default() -> Self {
        Self {
            www_base: "https://www.bilibili.com".to_string(),
            api_base: "https://api.bilibili.com".to_string(),
            live_base: "https://api.live.bilibili.com".to_string(),
        }
    }
}

impl BilibiliEndpoints {
    #[must_use]
    pub fn api(&self, path: &str) -> String {
        join(&self.api_base, path)
    }

    #[must_use]
    pub fn live(&self, path: &str) -> String {
        join(&self.live_base, path)
    }

    #[must_use]
    pub fn www(&self) -> String {
        join(&self.www_base, "/")
    }
}

fn join(base: &str, path: &str) -> String {
    format!("{}{path}", base.trim_end_matches('/'))
}

/// Bilibili HTTP Client
///
/// Holds no cookie store: every resolution acquires its own
/// [`SessionCredential`] and passes it explicitly to each call.
#[derive(Debug, Clone)]
pub struct BilibiliClient {
    client: Client,
    endpoints: BilibiliEndpoints,
}

impl BilibiliClient {
    /// Create a new Bilibili client
    pub fn new() -> Result<Self, BilibiliError> {
        Self::with_endpoints(BilibiliEndpoints::default())
    }

    /// Create a new Bilibili client against custom base URLs
    pub fn with_endpoints(endpoints: BilibiliEndpoints) -> Result<Self, BilibiliError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| BilibiliError::Network(e.to_string()))?;

        Ok(Self { client, endpoints })
    }

    #[must_use]
    pub fn endpoints(&self) -> &BilibiliEndpoints {
        &self.endpoints
    }

    /// Fetch the landing page to collect the platform's session cookies.
    ///
    /// A non-empty `token` is stored under `SESSDATA`, replacing whatever the
    /// landing page set. Returns `None` on transport failure or non-2xx status.
    pub async fn acquire_session(&self, token: Option<&str>) -> Option<SessionCredential> {
        let url = self.endpoints.www();
        match self.fetch_session(&url, token).await {
            Ok(credential) => {
                debug!(cookies = credential.len(), "Acquired bilibili session");
                Some(credential)
            }
            Err(e) => {
                error!("Failed to acquire session from {}: {}", url, e);
                None
            }
        }
    }

    async fn fetch_session(
        &self,
        url: &str,
        token: Option<&str>,
    ) -> Result<SessionCredential, BilibiliError> {
        let resp = self
            .client
            .get(url)
            .header(ACCEPT, ACCEPT_HTML)
            .send()
            .await?
            .error_for_status()?;

        let mut credential = SessionCredential::new();
        for cookie in resp.cookies() {
            credential.insert(cookie.name(), cookie.value());
        }

        if let Some(token) = token.filter(|t| !t.is_empty()) {
            credential.insert(SESSDATA, token);
        }

        Ok(credential)
    }

    /// Issue one GET and parse the body as JSON.
    ///
    /// This is the single point where transport, status and decode failures are
    /// absorbed: they are logged and surface as `None`.
    pub async fn request(
        &self,
        url: &str,
        params: &[(&str, &str)],
        credential: Option<&SessionCredential>,
    ) -> Option<Value> {
        match self.get_json(url, params, credential).await {
            Ok(body) => Some(body),
            Err(e) => {
                error!("Request to {} failed: {}", url, e);
                None
            }
        }
    }

    async fn get_json(
        &self,
        url: &str,
        params: &[(&str, &str)],
        credential: Option<&SessionCredential>,
    ) -> Result<Value, BilibiliError> {
        let mut req = self.client.get(url).header(ACCEPT, ACCEPT_JSON).query(params);
        if let Some(credential) = credential.filter(|c| !c.is_empty()) {
            req = req.header(COOKIE, credential.header_value());
        }

        let resp = req.send().await?.error_for_status()?;
        Ok(resp.json::<Value>().await?)
    }

    /// Query the nav endpoint (login status of the session). Raw body.
    pub async fn check_login_status(&self, credential: Option<&SessionCredential>) -> Option<Value> {
        self.request(&self.endpoints.api(NAV_PATH), &[], credential)
            .await
    }

    /// Keyword search with a fresh session. Raw body.
    pub async fn search(&self, keyword: &str, page: u32, token: Option<&str>) -> Option<Value> {
        let credential = self.acquire_session(token).await;
        let page = page.to_string();
        self.request(
            &self.endpoints.api(SEARCH_PATH),
            &[("keyword", keyword), ("page", &page)],
            credential.as_ref(),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_join() {
        let endpoints = BilibiliEndpoints {
            www_base: "http://127.0.0.1:1234/".to_string(),
            api_base: "http://127.0.0.1:1234".to_string(),
            live_base: "http://live.local/".to_string(),
        };
        assert_eq!(endpoints.www(), "http://127.0.0.1:1234/");
        assert_eq!(
            endpoints.api("/x/player/pagelist"),
            "http://127.0.0.1:1234/x/player/pagelist"
        );
        assert_eq!(endpoints.live("/a"), "http://live.local/a");
    }

    #[test]
    fn test_default_endpoints() {
        let endpoints = BilibiliEndpoints::default();
        assert_eq!(endpoints.www(), "https://www.bilibili.com/");
        assert!(endpoints.api(NAV_PATH).starts_with("https://api.bilibili.com/"));
    }
}
