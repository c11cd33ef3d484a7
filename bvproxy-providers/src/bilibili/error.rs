//! Bilibili Vendor Client Error Types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BilibiliError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Empty response from {0}")]
    EmptyResponse(&'static str),

    #[error("Missing field `{path}` in {api} response")]
    MissingField { api: &'static str, path: String },

    #[error("Invalid BVID: {0}")]
    InvalidId(String),
}

impl From<reqwest::Error> for BilibiliError {
    fn from(err: reqwest::Error) -> Self {
        BilibiliError::Network(err.to_string())
    }
}
