use thiserror::Error;

pub type DataResult<T> = std::result::Result<T, DataError>;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("parse error at line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("degenerate normalization statistics: {0}")]
    DegenerateStatistics(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
