// THEORY:
// A single error type for the whole crate. The geometric core never fails on
// well-formed input, so most variants belong to the glue around it: reading
// and writing box files, decoding masks, and talking to the worker pool.
// `InvalidArgument` is the one class of misuse the core itself reports.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A caller broke a precondition: inverted corners, a negative threshold,
    /// a malformed box line, an out-of-range scale factor.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    /// The worker pool's queue or reply channel was closed.
    #[error("worker pool: {0}")]
    WorkerPool(&'static str),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
