//! Centralised host-side error hierarchy for the **Shnap** engine.
//!
//! These are failures of the *host*: malformed source that aborts a parse,
//! I/O while reading scripts, and evaluation that escaped to the top level.
//! Errors raised *inside* the language (`throw`, absent fields, access
//! violations) are first-class values instead; see [`crate::value::ErrorValue`].
//!
//! The module **does not** print diagnostics itself.

use std::io;
use thiserror::Error;

use log::info;

use crate::source::Location;

/// Canonical error type used throughout the engine.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ShnapError {
    /// Lexical (pre-pass or scanner) error.
    #[error("[{location}] Error: {message}")]
    Lex {
        /// Human-readable description.
        message: String,

        /// Where the offending input starts.
        location: Location,
    },

    /// Syntactic (parser) error. Fatal to the whole parse.
    #[error("[{location}] Error: {message}")]
    Parse { message: String, location: Location },

    /// A thrown value escaped the top level of a script.
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// Wrapper around `std::io::Error` (transparent).  Enables `?` on I/O ops.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// UTF-8 decoding failure when ingesting external text.
    #[error(transparent)]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl ShnapError {
    /// Helper constructor for the **scanner** and comment pre-pass.
    pub fn lex<S: Into<String>>(location: Location, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Lex error: at={}, msg={}", location, message);

        ShnapError::Lex { message, location }
    }

    /// Helper constructor for the **parser**.
    pub fn parse<S: Into<String>>(location: Location, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Parse error: at={}, msg={}", location, message);

        ShnapError::Parse { message, location }
    }

    /// Location of a lex/parse failure, if the error carries one.
    pub fn location(&self) -> Option<&Location> {
        match self {
            ShnapError::Lex { location, .. } | ShnapError::Parse { location, .. } => {
                Some(location)
            }
            _ => None,
        }
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, ShnapError>;
