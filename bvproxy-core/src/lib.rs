pub mod config;
pub mod logging;
pub mod rate_limit;
pub mod session_store;

pub use config::Config;
pub use rate_limit::{RateLimitError, RateLimiter};
pub use session_store::SessionStore;
