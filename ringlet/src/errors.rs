//! The errors that can be returned from the ringlet bench tool

use std::fmt;

use ringlet_core::RingError;

/// The errors that can be returned from the ringlet bench tool
#[derive(Debug)]
pub enum Errors {
    /// A hash ring error
    Ring(RingError),
    /// An IO error occured
    IO(std::io::Error),
    /// An rkyv error while saving or loading bench results
    Rkyv(rkyv::rancor::Error),
}

impl fmt::Display for Errors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Errors::Ring(error) => write!(f, "{error}"),
            Errors::IO(error) => write!(f, "io error: {error}"),
            Errors::Rkyv(error) => write!(f, "bench result error: {error}"),
        }
    }
}

impl std::error::Error for Errors {}

impl From<RingError> for Errors {
    /// Convert this error to our error type
    ///
    /// # Arguments
    ///
    /// * `error` - The error to convert
    fn from(error: RingError) -> Self {
        Errors::Ring(error)
    }
}

impl From<std::io::Error> for Errors {
    /// Convert this error to our error type
    ///
    /// # Arguments
    ///
    /// * `error` - The error to convert
    fn from(error: std::io::Error) -> Self {
        Errors::IO(error)
    }
}

impl From<rkyv::rancor::Error> for Errors {
    /// Convert this error to our error type
    ///
    /// # Arguments
    ///
    /// * `error` - The error to convert
    fn from(error: rkyv::rancor::Error) -> Self {
        Errors::Rkyv(error)
    }
}
