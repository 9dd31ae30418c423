use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Ctrl-C was read while raw mode had signal generation turned off.
    #[error("interrupted by user")]
    Interrupted,
    #[error("{backend} raw mode unavailable: {source}")]
    DeviceUnavailable {
        backend: &'static str,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    pub fn device(backend: &'static str, source: impl Into<io::Error>) -> Self {
        Error::DeviceUnavailable {
            backend,
            source: source.into(),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
