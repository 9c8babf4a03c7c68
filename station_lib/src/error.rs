use std::io;
use thiserror::Error;

pub type Result<T> = ::std::result::Result<T, StationError>;

#[derive(Error, Debug)]
pub enum StationError {
    #[error("Input output error: {0}")]
    IoError(#[from] io::Error),
    #[error("Invalid BIOS image: expected {expected} bytes, got {got}")]
    BadBios { expected: usize, got: usize },
    #[error("Deserialization error: {0}")]
    DeserializationError(String),
}
