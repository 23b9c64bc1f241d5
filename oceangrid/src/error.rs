use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GridError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("invalid grid file, {0}")]
    Format(&'static str),

    #[error("invalid grid file len {0} for {1}")]
    Len(u64, PathBuf),

    #[error("{field} has {actual} values, expected {expected}")]
    Shape {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("{0} axis is not strictly increasing")]
    NotMonotonic(&'static str),

    #[error("grid load cancelled")]
    Cancelled,
}
