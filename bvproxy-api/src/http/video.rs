//! `/{param}`: redirect a BV id (anywhere in the path segment) to its media URL.

use axum::{
    extract::{Path, Query, State},
    response::Redirect,
};
use bvproxy_providers::bilibili::{extract_bvid, rewrite_host, VideoIdentifier};
use serde::Deserialize;

use super::public::parse_page;
use super::{AppError, AppResult, AppState};

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub p: Option<String>,
}

pub async fn video_redirect(
    State(state): State<AppState>,
    Path(param): Path<String>,
    Query(query): Query<PageQuery>,
) -> AppResult<Redirect> {
    tracing::info!("Received param: {}", param);

    let raw = extract_bvid(&param).ok_or_else(|| AppError::bad_request("No BV number found"))?;
    let bvid = VideoIdentifier::parse(raw)?;
    let page = parse_page(query.p.as_deref());

    // Re-read on every request so the token can be rotated on disk.
    let token = state.session_store.load_token().await;
    let playback = state
        .bilibili
        .resolve_video(&bvid, page, token.as_deref())
        .await?;

    let url = if state.config.cdn.rewrite {
        rewrite_host(&playback.url, state.mirror_selector.as_ref())
    } else {
        playback.url
    };

    Ok(Redirect::temporary(&url))
}
