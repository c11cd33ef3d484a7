//! Bilibili Vendor Client
//!
//! Pure HTTP client for the Bilibili web API.
//!
//! # Features
//! - Session cookie acquisition (optionally seeded with `SESSDATA`)
//! - BV id extraction and validation
//! - Video page list / play URL resolution
//! - Live room stream resolution
//! - CDN mirror rewriting

pub mod cdn;
pub mod client;
pub mod error;
pub mod extract;
pub mod live;
pub mod types;
pub mod video;

pub use cdn::{rewrite_host, MirrorSelector, RandomMirror, BILI_CDN_MIRRORS};
pub use client::{BilibiliClient, BilibiliEndpoints};
pub use error::BilibiliError;
pub use types::*;
