use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrailError {
    #[error("actor factory gave up after {created} of {requested} trail actors")]
    FactoryExhausted { requested: usize, created: usize },
    #[error("invalid `{field}`: {reason}")]
    InvalidConfig { field: &'static str, reason: String },
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse TOML config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("failed to parse JSON config: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TrailError>;
