use std::path::PathBuf;

use thiserror::Error;

use crate::util::bold;

#[derive(Debug, Error)]
pub enum ArgsError {
    #[error("failed to read config file {path}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file")]
    ConfigParse(#[from] toml::de::Error),

    #[error(
        "only one of {}, {} or {} may be set",
        bold("--signature"),
        bold("--abi"),
        bold("--input-data")
    )]
    CallSourceConflict,

    #[error("invalid delay '{0}': must be a non-negative number of seconds")]
    InvalidDelay(f64),

    #[error("the ABI has no callable functions")]
    NoFunctions,

    #[error("{} requires {}", bold(flag), bold(required))]
    MissingValue {
        flag: &'static str,
        required: &'static str,
    },

    #[error("aborted by user")]
    Aborted,

    #[error("failed to parse url")]
    UrlParse(#[from] url::ParseError),
}
