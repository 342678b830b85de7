// src/config/mod.rs
// Server configuration, loaded once at startup

mod env;

pub use env::{
    ServerConfig, DEFAULT_ALLOWED_ORIGINS, DEFAULT_API_KEY, DEFAULT_HOST, DEFAULT_PORT,
    DEFAULT_RATE_LIMIT_MAX, DEFAULT_RATE_LIMIT_WINDOW_SECS, DEFAULT_SERVER_NAME,
};
