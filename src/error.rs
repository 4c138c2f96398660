//! Error type shared by every fallible constructor and adaptor in the crate.

/// Errors for corpus construction and the text helpers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Block/bit counts that cannot form a valid index.
    #[error("invalid configuration: {0}")]
    Configuration(String),
    /// An argument to a helper is out of range (e.g. a zero shingle window).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;
