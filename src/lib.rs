pub mod allocator;
pub mod cache;
pub mod config;
pub mod db;
pub mod encoder;
pub mod error;
pub mod handlers;
pub mod memory;
pub mod models;
pub mod service;
pub mod store;
pub mod validate;

pub use error::{BackendError, ShortenError};
pub use models::ShortUrl;
pub use service::{AllocationStrategy, Shortener};

// ── Shared application state ───────────────────────────────────────────────

pub struct AppState {
    pub shortener: Shortener,
}
