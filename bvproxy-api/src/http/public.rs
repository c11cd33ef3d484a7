//! Front page, form submission and client address echo.

use axum::{
    extract::Query,
    response::{Html, IntoResponse, Redirect},
    Json,
};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Deserialize;
use serde_json::json;

use super::middleware::ClientIp;
use super::{AppError, AppResult};

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>BV Analysis</title>
</head>
<body>
    <h1>BV Analysis</h1>
    <form action="/submit" method="get">
        <label for="bvid">BVID:</label>
        <input type="text" id="bvid" name="bvid" required>
        <label for="p">Page Number:</label>
        <input type="number" id="p" name="p">
        <button type="submit">Submit</button>
    </form>
</body>
</html>
"#;

/// Characters left as-is when building the redirect path.
const PATH_SAFE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

#[derive(Debug, Deserialize)]
pub struct SubmitQuery {
    pub bvid: Option<String>,
    pub p: Option<String>,
}

/// Parse a page query value; missing or non-numeric means page 1.
#[must_use]
pub fn parse_page(raw: Option<&str>) -> i64 {
    raw.and_then(|p| p.trim().parse::<i64>().ok()).unwrap_or(1)
}

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Turn the form submission into `/{bvid}?p={page}`.
pub async fn submit(Query(query): Query<SubmitQuery>) -> AppResult<Redirect> {
    tracing::info!("Received bvid: {:?}, p: {:?}", query.bvid, query.p);

    let bvid = query
        .bvid
        .as_deref()
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .ok_or_else(|| AppError::bad_request("Missing bvid"))?;
    let page = parse_page(query.p.as_deref());

    let target = format!("/{}?p={page}", utf8_percent_encode(bvid, PATH_SAFE));
    Ok(Redirect::temporary(&target))
}

pub async fn client_ip(ip: ClientIp) -> impl IntoResponse {
    Json(json!({ "client_ip": ip.label() }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_page() {
        assert_eq!(parse_page(None), 1);
        assert_eq!(parse_page(Some("")), 1);
        assert_eq!(parse_page(Some("abc")), 1);
        assert_eq!(parse_page(Some("1.5")), 1);
        assert_eq!(parse_page(Some("3")), 3);
        assert_eq!(parse_page(Some(" 4 ")), 4);
        assert_eq!(parse_page(Some("-2")), -2);
        assert_eq!(parse_page(Some("0")), 0);
    }
}
