//! RouterOS administrative API client
//!
//! - `protocol`: word/sentence encoding and reply decoding
//! - `session`: authenticated request/reply session and the `AdminSession` seam
//! - `tls`: api-ssl transport

pub mod protocol;
pub mod session;
pub mod tls;

pub use protocol::{Record, Request};
pub use session::{connect, AdminSession};

#[cfg(test)]
pub mod fake;
