//! Any errors that can be encountered when using a ringlet hash ring

use std::fmt;

/// Any errors that can be encountered when using a ringlet hash ring
#[derive(Debug)]
pub enum RingError {
    /// No nodes are on the ring so no key can be routed
    EmptyCircle,
    /// Probing for a free slot wrapped the whole key space
    FullCircle,
    /// A load operation referenced a node that is not registered
    ItemNotFound(String),
    /// A node was added with an empty name
    InvalidName,
    /// An config parsing error
    Config(config::ConfigError),
    /// A global tracing subscriber could not be installed
    Trace(tracing_subscriber::util::TryInitError),
}

impl fmt::Display for RingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RingError::EmptyCircle => write!(f, "empty hash circle"),
            RingError::FullCircle => write!(f, "circle has no place"),
            RingError::ItemNotFound(name) => write!(f, "item not found: {name}"),
            RingError::InvalidName => write!(f, "node names must not be empty"),
            RingError::Config(error) => write!(f, "config error: {error}"),
            RingError::Trace(error) => write!(f, "tracing setup error: {error}"),
        }
    }
}

impl std::error::Error for RingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RingError::Config(error) => Some(error),
            RingError::Trace(error) => Some(error),
            _ => None,
        }
    }
}

impl From<config::ConfigError> for RingError {
    /// Convert this error to our error type
    ///
    /// # Arguments
    ///
    /// * `error` - The error to convert
    fn from(error: config::ConfigError) -> Self {
        RingError::Config(error)
    }
}

impl From<tracing_subscriber::util::TryInitError> for RingError {
    /// Convert this error to our error type
    ///
    /// # Arguments
    ///
    /// * `error` - The error to convert
    fn from(error: tracing_subscriber::util::TryInitError) -> Self {
        RingError::Trace(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_error_kind() {
        assert_eq!(RingError::EmptyCircle.to_string(), "empty hash circle");
        assert_eq!(RingError::FullCircle.to_string(), "circle has no place");
        assert_eq!(
            RingError::ItemNotFound("node-3".to_owned()).to_string(),
            "item not found: node-3"
        );
    }
}
