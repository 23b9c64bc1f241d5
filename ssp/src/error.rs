use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SspError {
    #[error("missing required parameter '{0}'")]
    Builder(&'static str),

    #[error("{field} has {actual} samples, expected {expected}")]
    Length {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("depth sample {index} is {depth} m, expected a finite depth below the surface")]
    InvalidDepth { index: usize, depth: f64 },

    #[error("depth sample {0} is not deeper than its predecessor")]
    NotMonotonic(usize),

    #[error("no profile at index {0}")]
    Index(usize),

    #[error("degenerate layer at {depth} m")]
    DegenerateLayer { depth: f64 },

    #[error("insufficient profile, {layers} usable layer(s)")]
    InsufficientProfile { layers: usize },

    #[error("invalid sound speed {0} m/s")]
    InvalidSpeed(f64),

    #[error("{0}")]
    Geometry(&'static str),
}
