use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse float error: {0}")]
    ParseFloat(#[from] std::num::ParseFloatError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    #[error("Exchange error ({status}): {body}")]
    Exchange { status: u16, body: String },

    #[error("Signing error: {0}")]
    Signing(String),

    #[error("{0} is not a valid direction")]
    InvalidDirection(String),

    #[error("No market snapshot loaded; call refresh() first")]
    NoSnapshot,

    #[error("Other: {0}")]
    Other(String),
}
