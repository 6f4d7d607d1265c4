use thiserror::Error;

/// Main error type for the packaging pipeline
#[derive(Error, Debug)]
pub enum AgentPackError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // Network errors
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Hub rejected request: status {status} - {message}")]
    Hub { status: u16, message: String },

    // Authentication errors
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Invalid repo id: {0}")]
    InvalidRepoId(String),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    // Artifact errors
    #[error("Model artifact error: {0}")]
    Artifact(String),

    #[error("Evaluation error: {0}")]
    Evaluation(String),

    #[error("Replay recording error: {0}")]
    Replay(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias for AgentPackError
pub type Result<T> = std::result::Result<T, AgentPackError>;
