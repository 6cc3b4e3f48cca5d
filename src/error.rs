use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("half-dimension must be finite and positive, got {half_dimension}")]
    InvalidBoundary { half_dimension: f64 },

    #[error("failed to read spawner config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse spawner config: {0}")]
    Config(#[from] toml::de::Error),

    #[error("invalid spawner config: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, Error>;
