//! Video path: BV id + page → direct media URL.
//!
//! Extraction is strict. The page list and play URL responses are expected to be
//! well formed; a missing field means the upstream contract was broken (removed
//! video, paid content, rejected session) and is reported as an error.

use tracing::{debug, info};

use super::client::BilibiliClient;
use super::error::BilibiliError;
use super::extract::{scalar_text, FieldPath, Step};
use super::types::{PlaybackResult, VideoIdentifier};

const PAGELIST_PATH: &str = "/x/player/pagelist";
const PLAYURL_PATH: &str = "/x/player/playurl";

const PAGES: FieldPath = FieldPath::new("pagelist", &[Step::Key("data")]);
const CID: FieldPath = FieldPath::new("pagelist", &[Step::Key("cid")]);
const DURL_URL: FieldPath = FieldPath::new(
    "playurl",
    &[Step::Key("data"), Step::Key("durl"), Step::Index(0), Step::Key("url")],
);

/// Highest quality the web player may request (4K).
const QN_4K: u32 = 120;
/// fnval bits: FLV/MP4 (1) | 4K (128).
const FNVAL: u32 = 1 | 128;

/// Map a 1-based page number onto a page list of `len` entries.
///
/// Anything outside `1..=len` falls back to the first page.
#[must_use]
pub fn normalize_page(page: i64, len: usize) -> usize {
    match usize::try_from(page.saturating_sub(1)) {
        Ok(idx) if idx < len => idx,
        _ => 0,
    }
}

impl BilibiliClient {
    /// Resolve `bvid` page `page` (1-based) to a direct media URL.
    ///
    /// `token` is the optional `SESSDATA` supplied by the caller for this request.
    pub async fn resolve_video(
        &self,
        bvid: &VideoIdentifier,
        page: i64,
        token: Option<&str>,
    ) -> Result<PlaybackResult, BilibiliError> {
        let credential = self.acquire_session(token).await;

        let pagelist = self
            .request(
                &self.endpoints().api(PAGELIST_PATH),
                &[("bvid", bvid.as_str())],
                credential.as_ref(),
            )
            .await
            .ok_or(BilibiliError::EmptyResponse("pagelist"))?;

        let pages = PAGES
            .strict(&pagelist)?
            .as_array()
            .ok_or_else(|| BilibiliError::MissingField {
                api: PAGES.api(),
                path: PAGES.to_string(),
            })?;

        let idx = normalize_page(page, pages.len());
        let entry = pages.get(idx).ok_or_else(|| BilibiliError::MissingField {
            api: PAGES.api(),
            path: format!("{PAGES}[{idx}]"),
        })?;
        let cid = scalar_text(CID.strict(entry)?).ok_or_else(|| BilibiliError::MissingField {
            api: CID.api(),
            path: format!("{PAGES}[{idx}].{CID}"),
        })?;
        debug!(%bvid, page = idx + 1, %cid, "Selected page");

        let qn = QN_4K.to_string();
        let fnval = FNVAL.to_string();
        let playurl = self
            .request(
                &self.endpoints().api(PLAYURL_PATH),
                &[
                    ("bvid", bvid.as_str()),
                    ("cid", &cid),
                    ("qn", &qn),
                    ("otype", "json"),
                    ("platform", "html5"),
                    ("high_quality", "1"),
                    ("fnval", &fnval),
                    ("fourk", "1"),
                ],
                credential.as_ref(),
            )
            .await
            .ok_or(BilibiliError::EmptyResponse("playurl"))?;

        let url = DURL_URL
            .strict(&playurl)?
            .as_str()
            .ok_or_else(|| BilibiliError::MissingField {
                api: DURL_URL.api(),
                path: DURL_URL.to_string(),
            })?
            .to_string();

        info!(%bvid, page = idx + 1, "Resolved video url");

        Ok(PlaybackResult {
            bvid: bvid.clone(),
            page: idx + 1,
            url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_page_in_range() {
        assert_eq!(normalize_page(1, 3), 0);
        assert_eq!(normalize_page(2, 3), 1);
        assert_eq!(normalize_page(3, 3), 2);
    }

    #[test]
    fn test_normalize_page_out_of_range() {
        for page in [0, -5, 4, 100, i64::MIN, i64::MAX] {
            assert_eq!(normalize_page(page, 3), 0, "page {page}");
        }
        assert_eq!(normalize_page(1, 0), 0);
    }

    #[test]
    fn test_fnval() {
        assert_eq!(FNVAL, 129);
    }
}
