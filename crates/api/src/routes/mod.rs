//! HTTP and WebSocket routes

pub mod metrics;
pub mod reports;
pub mod sessions;
pub mod ws;
