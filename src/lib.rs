// src/lib.rs
// netprobe - network diagnostics streamed as normalized events

pub mod api;
pub mod config;
pub mod diagnostic;
pub mod error;
pub mod logging;

pub use error::{ProbeError, Result};
