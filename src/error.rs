use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("could not read or write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("could not fetch page: {0}")]
    Fetch(#[from] reqwest::Error),
    #[error("could not parse {source_name}: {error}")]
    Parse {
        source_name: String,
        #[source]
        error: html::ParseError,
    },
    #[error("{0}")]
    Usage(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
