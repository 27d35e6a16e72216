//! Error types for the financial bodyguard

use thiserror::Error;

/// Result type alias for bodyguard operations
pub type Result<T> = std::result::Result<T, BodyguardError>;

#[derive(Error, Debug)]
pub enum BodyguardError {

    // =============================
    // Agent Boundary Errors
    // =============================

    #[error("Tool execution error: {0}")]
    ToolExecution(String),

    #[error("Agent not found: {0}")]
    AgentNotFound(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Delegation depth exceeded: {0}")]
    DelegationDepth(String),

    #[error("Trajectory data error: {0}")]
    TrajectoryData(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
