use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("binding not found: agent {agent_id}, tool {tool_name}")]
    BindingNotFound { agent_id: String, tool_name: String },

    #[error("tool {tool_name} is already connected to agent {agent_id}")]
    AlreadyConnected { agent_id: String, tool_name: String },
}

pub type Result<T> = std::result::Result<T, Error>;
