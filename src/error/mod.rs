//! Error handling module
//!
//! - `ApiError`: failures of the RouterOS administrative API session
//! - `OpError`: failures of a subscriber operation, rendered verbatim as the chat reply

use thiserror::Error;

/// Errors raised by the administrative API session.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    #[error("invalid server name: {0}")]
    ServerName(String),

    #[error("connection timed out")]
    ConnectTimeout,

    #[error("login rejected: {0}")]
    LoginRejected(String),

    #[error("router error: {message}")]
    Trap { message: String },

    #[error("session terminated by router: {0}")]
    Fatal(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    /// An earlier call failed mid-reply; the stream can no longer be trusted.
    #[error("session is out of sync after an earlier failure, restart required")]
    SessionBroken,
}

/// Errors raised by subscriber operations.
///
/// Every variant renders as a complete, operator-facing sentence; the
/// dispatcher sends `to_string()` back to the chat unchanged.
#[derive(Error, Debug)]
pub enum OpError {
    /// The router's session could not be opened at startup. Permanent until restart.
    #[error("Connection to {router} is down")]
    RouterUnreachable { router: String },

    #[error("IP address {0} is not recognized or invalid")]
    AddressNotRecognized(String),

    #[error("IP {ip} not found on {router}.")]
    BindingNotFound { ip: String, router: String },

    #[error("IP {ip} is not in the binding list of {router}")]
    NotInBinding { ip: String, router: String },

    #[error("IP {ip} is not limited yet on {router}")]
    NotLimited { ip: String, router: String },

    #[error("IP {ip} not found on {primary} or {secondary}.")]
    SubscriberNotFound {
        ip: String,
        primary: String,
        secondary: String,
    },

    #[error("Failed to {action} on {router}: {source}")]
    RemoteCall {
        action: &'static str,
        router: String,
        #[source]
        source: ApiError,
    },

    /// The binding step succeeded but the queue step did not.
    #[error("Binding saved on {router}, but the queue failed: {source}")]
    PartialProvision {
        router: String,
        #[source]
        source: ApiError,
    },

    /// The binding was removed but the queue step did not complete.
    #[error("Binding of {ip} removed from {router}, but the queue failed: {source}")]
    PartialDeprovision {
        ip: String,
        router: String,
        #[source]
        source: ApiError,
    },
}

impl OpError {
    pub fn remote(action: &'static str, router: &str, source: ApiError) -> Self {
        OpError::RemoteCall {
            action,
            router: router.to_string(),
            source,
        }
    }
}
