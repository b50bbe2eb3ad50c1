//! Crate-level error type.
//!
//! The status channel itself has no fatal error category: connection failures
//! are folded into its reconnect path. Everything else (bad input, HTTP
//! failures, config problems) surfaces as a [`RemoteError`].

use thiserror::Error;

/// All errors returned by the library.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The session key was empty or contained only whitespace.
    #[error("session key must not be empty")]
    EmptyKey,

    /// The configured host cannot be used to build endpoint URLs.
    #[error("invalid host '{host}': {reason}")]
    InvalidHost { host: String, reason: String },

    /// A WebSocket or TCP connection could not be established.
    #[error("connection failed to {url}: {detail}")]
    Connect { url: String, detail: String },

    /// The server replied with a status the caller did not expect.
    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },

    /// The server does not know the session key (HTTP 400).
    #[error("server does not recognise this session key")]
    UnknownSession,

    /// A response body could not be decoded.
    #[error("could not decode response from {url}: {detail}")]
    Decode { url: String, detail: String },

    /// The config file could not be read.
    #[error("cannot read config file {path}: {source}")]
    ConfigIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML or has the wrong shape.
    #[error("invalid config file {path}: {source}")]
    ConfigParse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    /// A required callback was not provided to a builder.
    #[error("{0} is required")]
    MissingField(&'static str),
}
