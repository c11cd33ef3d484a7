//! `/live/{room_id}`: redirect a live room to its current stream URL.

use axum::{
    extract::{Path, State},
    response::Redirect,
};

use super::{AppError, AppResult, AppState};

pub async fn live_redirect(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> AppResult<Redirect> {
    let room_id = room_id
        .parse::<u64>()
        .map_err(|_| AppError::bad_request("Invalid room id"))?;

    // Live rooms are resolved anonymously; the local token is for videos only.
    match state.bilibili.resolve_room(room_id, None).await {
        Some(url) => Ok(Redirect::temporary(&url)),
        None => Err(AppError::not_found("Failed to get live stream url")),
    }
}
