use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProxymanError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Missing domain: {0}")]
    MissingDomain(String),

    #[error("Configuration test failed: {0}")]
    ConfigTestFailed(String),

    #[error("Reload failed: {0}")]
    Reload(String),

    #[error("Timed out after {0}s waiting for an in-flight reload")]
    ReloadTimeout(u64),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ProxymanError {
    /// Wrap an IO error with the operation that failed.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        ProxymanError::Io {
            context: context.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ProxymanError>;
