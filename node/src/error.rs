use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("blockchain error: {0}")]
    Blockchain(#[from] mvs_blockchain::BlockchainError),

    #[error("store error: {0}")]
    Store(#[from] mvs_store::StoreError),

    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("organizer task failed: {0}")]
    Task(String),

    #[error("service is stopped")]
    Stopped,
}
