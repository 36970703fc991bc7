//! Centralized error types for grouppost.

use thiserror::Error;

/// All errors produced by the grouppost library.
///
/// The message pipeline itself is permissive: malformed charsets, missing
/// headers, and undecodable payloads degrade to documented defaults instead
/// of erroring. The variants here cover the few places where bad input is a
/// caller error rather than something to paper over.
#[derive(Error, Debug)]
pub enum PostError {
    /// The HTML-to-text converter was handed empty input.
    #[error("html argument not set")]
    EmptyHtml,
}

/// Convenience alias for `Result<T, PostError>`.
pub type Result<T> = std::result::Result<T, PostError>;
