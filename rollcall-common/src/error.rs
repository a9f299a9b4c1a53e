//! Errors raised while loading configuration and opening the database

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Creating the root folder or reading a config file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Unreadable or unparsable TOML config
    #[error("Configuration error: {0}")]
    Config(String),
}
