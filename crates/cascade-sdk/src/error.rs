use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no output path for {}: set `output` or use a `.spec.md` name", spec.display())]
    NoOutputPath { spec: PathBuf },

    #[error("store lock poisoned")]
    LockPoisoned,

    #[error("parse error: {0}")]
    Parse(#[from] cascade_parser::ParseError),

    #[error("resolution error: {0}")]
    Chain(#[from] cascade_resolver::ChainError),

    #[error("config error: {0}")]
    Config(#[from] cascade_resolver::ConfigError),

    #[error("store error: {0}")]
    Store(#[from] cascade_store::StoreError),
}

impl SdkError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}

pub type SdkResult<T> = Result<T, SdkError>;
