//! Error types.
//!
//! Only [`ConfigError`] aborts a run. [`FetchError`] and [`ParseError`] are
//! recovered per dependency and end up as data in the report.

use std::path::PathBuf;

use reqwest::StatusCode;
use serde::Serialize;
use thiserror::Error;

use crate::models::Ecosystem;

/// Fatal problems detected before any network traffic starts.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("target directory {path} does not exist")]
    MissingTarget { path: PathBuf },

    #[error("target path {path} is not a directory")]
    NotADirectory { path: PathBuf },

    #[error("target directory {path} is not readable: {source}")]
    UnreadableTarget {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read config file {path}: {source}")]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    ParseConfig {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid setting: {0}")]
    Invalid(String),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// A manifest entry that could not be turned into a declaration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{ecosystem} entry {entry:?} skipped: {reason}")]
pub struct ParseError {
    pub ecosystem: Ecosystem,
    pub entry: String,
    pub reason: String,
}

impl ParseError {
    pub fn new(ecosystem: Ecosystem, entry: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            ecosystem,
            entry: entry.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FetchErrorKind {
    #[error("rate limited")]
    RateLimited,
    #[error("server error")]
    ServerError,
    #[error("network error")]
    NetworkError,
    #[error("not found")]
    NotFound,
    #[error("timed out")]
    Timeout,
    /// A 4xx other than 404/410/429.
    #[error("request rejected")]
    ClientError,
    /// A 2xx whose body was not JSON.
    #[error("invalid response")]
    InvalidResponse,
    /// The task performing the lookup panicked.
    #[error("lookup failed")]
    TaskFailed,
}

impl FetchErrorKind {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FetchErrorKind::RateLimited
                | FetchErrorKind::ServerError
                | FetchErrorKind::NetworkError
                | FetchErrorKind::Timeout
        )
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[error("{kind}{}", http_suffix(.last_status))]
pub struct FetchError {
    pub kind: FetchErrorKind,
    /// HTTP status of the last response, if one was received.
    pub last_status: Option<u16>,
}

impl FetchError {
    pub fn new(kind: FetchErrorKind) -> Self {
        Self {
            kind,
            last_status: None,
        }
    }

    /// Classify a non-success HTTP status.
    pub fn from_status(status: StatusCode) -> Self {
        let kind = match status.as_u16() {
            429 => FetchErrorKind::RateLimited,
            404 | 410 => FetchErrorKind::NotFound,
            s if s >= 500 => FetchErrorKind::ServerError,
            _ => FetchErrorKind::ClientError,
        };
        Self {
            kind,
            last_status: Some(status.as_u16()),
        }
    }

    /// Classify a transport-level failure.
    pub fn from_transport(err: &reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            FetchErrorKind::Timeout
        } else if err.is_decode() {
            FetchErrorKind::InvalidResponse
        } else {
            FetchErrorKind::NetworkError
        };
        Self {
            kind,
            last_status: err.status().map(|s| s.as_u16()),
        }
    }
}

fn http_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default()
}
