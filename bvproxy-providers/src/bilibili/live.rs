//! Live path: room id → stream URL.
//!
//! Extraction is tolerant. A room that is offline answers with empty
//! `stream`/`format`/`codec` lists, so every level of the response is optional
//! and any missing one collapses to `None` instead of an error.

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use super::client::BilibiliClient;

const ROOM_PLAY_INFO_PATH: &str = "/xlive/web-room/v2/index/getRoomPlayInfo";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RoomPlayInfoResp {
    data: Option<RoomPlayInfoData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RoomPlayInfoData {
    playurl_info: Option<PlayurlInfo>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PlayurlInfo {
    playurl: Option<Playurl>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Playurl {
    stream: Option<Vec<Stream>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Stream {
    format: Option<Vec<Format>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Format {
    codec: Option<Vec<Codec>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Codec {
    base_url: Option<String>,
    url_info: Option<Vec<UrlInfo>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct UrlInfo {
    host: Option<String>,
    extra: Option<String>,
}

impl RoomPlayInfoResp {
    /// First codec of the first format of the first stream.
    fn first_codec(self) -> Option<Codec> {
        self.data?
            .playurl_info?
            .playurl?
            .stream?
            .into_iter()
            .next()?
            .format?
            .into_iter()
            .next()?
            .codec?
            .into_iter()
            .next()
    }
}

/// Assemble `host + base_url + extra` from the first codec entry, if any.
#[must_use]
pub fn stream_url_from_play_info(body: &Value) -> Option<String> {
    let resp = match RoomPlayInfoResp::deserialize(body) {
        Ok(resp) => resp,
        Err(e) => {
            debug!("Unexpected room play info shape: {}", e);
            return None;
        }
    };

    let codec = resp.first_codec()?;
    let url_info = codec.url_info?.into_iter().next()?;

    Some(format!("{}{}{}", url_info.host?, codec.base_url?, url_info.extra?))
}

impl BilibiliClient {
    /// Fetch the raw play info for a live room.
    pub async fn room_play_info(&self, room_id: u64, token: Option<&str>) -> Option<Value> {
        let credential = self.acquire_session(token).await;
        let room_id = room_id.to_string();
        self.request(
            &self.endpoints().live(ROOM_PLAY_INFO_PATH),
            &[
                ("room_id", &room_id),
                ("protocol", "0,1"),
                ("format", "1"),
                ("codec", "0,1"),
                ("platform", "h5"),
            ],
            credential.as_ref(),
        )
        .await
    }

    /// Resolve the first available stream URL of a live room.
    ///
    /// `None` means "no stream": the room is offline, the response was empty, or
    /// the upstream call failed.
    pub async fn resolve_room(&self, room_id: u64, token: Option<&str>) -> Option<String> {
        let Some(body) = self.room_play_info(room_id, token).await else {
            debug!(room_id, "No play info for room");
            return None;
        };

        let url = stream_url_from_play_info(&body);
        match &url {
            Some(_) => info!(room_id, "Resolved live stream url"),
            None => debug!(room_id, "Room has no active stream"),
        }
        url
    }
}
