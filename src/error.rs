use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchedError {
    #[error("Invalid process format: {record} - {reason}")]
    MalformedRecord { record: String, reason: String },

    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    #[error("Failed to initialize {resource}: {source}")]
    ResourceInit {
        resource: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SchedError {
    pub fn malformed(record: impl Into<String>, reason: impl Into<String>) -> Self {
        SchedError::MalformedRecord {
            record: record.into(),
            reason: reason.into(),
        }
    }

    pub fn resource_init(resource: impl Into<String>, source: std::io::Error) -> Self {
        SchedError::ResourceInit {
            resource: resource.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, SchedError>;
