// bvproxy provider clients
//
// Pure HTTP client for the Bilibili web APIs used by the redirector:
// session acquisition, the generic JSON request, and the resolvers that turn
// a BV id or a live room id into a playable media URL.
//
// Architecture:
// - bvproxy-providers: upstream client + resolvers (no HTTP server dependency)
// - bvproxy-core: configuration, logging, token store, rate limiting
// - bvproxy-api: axum routes calling into this crate

pub mod bilibili;

// Re-export client types for convenience
pub use bilibili::{BilibiliClient, BilibiliEndpoints, BilibiliError};
