// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error type shared by the registry, router and runtime layers.
//!
//! Wire-level failures (busy, canceled, undelivered...) never surface here:
//! they travel as [`crate::event::ResultType`] inside response events and reach
//! clients through the listener notification path.

use crate::stream::StreamError;

/// Result alias used across hsvc.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by hsvc operations.
#[derive(Debug)]
pub enum Error {
    // ========================================================================
    // Addressing
    // ========================================================================
    /// Service path or address string could not be parsed.
    InvalidAddress(String),
    /// Version string is not `major.minor.patch`.
    InvalidVersion(String),

    // ========================================================================
    // Registry / Model
    // ========================================================================
    /// Model description is incomplete or inconsistent.
    InvalidModel(String),
    /// A role name is already registered somewhere in the loaded models.
    DuplicateRole(String),
    /// Operation not allowed in the current model state.
    ModelState(String),
    /// No model with this name is loaded.
    ModelNotFound(String),

    // ========================================================================
    // Routing
    // ========================================================================
    /// Target dispatcher thread is unknown to the router.
    ThreadNotFound(String),
    /// A dispatcher thread with this name is already registered.
    DuplicateThread(String),
    /// No stub is registered for the role.
    StubNotFound(String),
    /// Target thread inbox is closed (thread stopped).
    QueueClosed(String),
    /// Listener handle unknown to its dispatcher thread.
    ListenerNotFound(u64),
    /// Remote delivery requested but no transport is attached.
    NoTransport,
    /// Transport refused or failed to send a frame.
    TransportFailed(String),

    // ========================================================================
    // Runtime
    // ========================================================================
    /// OS thread could not be spawned.
    SpawnFailed(String),
    /// Component factory or startup failed.
    ComponentFailed(String),
    /// Configuration could not be loaded.
    Config(String),

    // ========================================================================
    // Wrapped
    // ========================================================================
    /// Codec failure.
    Stream(StreamError),
    /// I/O error with underlying cause.
    Io(std::io::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidAddress(path) => write!(f, "Invalid service address: {}", path),
            Error::InvalidVersion(text) => write!(f, "Invalid version: {}", text),
            Error::InvalidModel(msg) => write!(f, "Invalid model: {}", msg),
            Error::DuplicateRole(role) => write!(f, "Role already registered: {}", role),
            Error::ModelState(msg) => write!(f, "Invalid model state: {}", msg),
            Error::ModelNotFound(name) => write!(f, "Model not found: {}", name),
            Error::ThreadNotFound(name) => write!(f, "Dispatcher thread not found: {}", name),
            Error::DuplicateThread(name) => {
                write!(f, "Dispatcher thread already registered: {}", name)
            }
            Error::StubNotFound(role) => write!(f, "No stub registered for role: {}", role),
            Error::QueueClosed(name) => write!(f, "Event queue closed: {}", name),
            Error::ListenerNotFound(id) => write!(f, "Listener not registered: {}", id),
            Error::NoTransport => write!(f, "No transport attached for remote delivery"),
            Error::TransportFailed(msg) => write!(f, "Transport failed: {}", msg),
            Error::SpawnFailed(msg) => write!(f, "Thread spawn failed: {}", msg),
            Error::ComponentFailed(msg) => write!(f, "Component failed: {}", msg),
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
            Error::Stream(e) => write!(f, "Stream error: {}", e),
            Error::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Stream(e) => Some(e),
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StreamError> for Error {
    fn from(e: StreamError) -> Self {
        Error::Stream(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_context() {
        let err = Error::DuplicateRole("Svc".to_string());
        assert!(err.to_string().contains("Svc"));

        let err = Error::ThreadNotFound("T".to_string());
        assert_eq!(err.to_string(), "Dispatcher thread not found: T");
    }

    #[test]
    fn test_stream_error_is_source() {
        use std::error::Error as _;

        let err: Error = StreamError::InvalidData {
            reason: "bad".into(),
        }
        .into();
        assert!(matches!(err, Error::Stream(_)));
        assert!(err.source().is_some());
    }
}
