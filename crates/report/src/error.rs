use std::{io, path::PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to create report directory {0}")]
    CreateDir(PathBuf, #[source] io::Error),

    #[error("serde_json error")]
    SerdeJson(#[from] serde_json::Error),

    #[error("failed to write {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
