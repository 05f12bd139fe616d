use thiserror::Error;

/// Errors produced by node executors.
///
/// Any `Err` returned from an executor is a hard failure and aborts the
/// run; operations that ran but did not succeed signal a soft failure
/// through the result status instead.
#[derive(Error, Debug)]
pub enum NodeError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid input: {0}")]
    Input(#[from] serde_json::Error),

    #[error("unknown node type: {0}")]
    UnknownType(String),

    #[error("cancelled")]
    Cancelled,

    #[error("{0}")]
    Internal(String),
}

/// Errors produced by the persistence layer, mapped from the underlying
/// store into semantic categories.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("resource already exists")]
    AlreadyExists,

    #[error("invalid reference: {0}")]
    InvalidReference(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("database error: {0}")]
    Database(String),
}

/// Errors surfaced by the run engine.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("node {node_id} failed: {source}")]
    Node {
        node_id: uuid::Uuid,
        #[source]
        source: NodeError,
    },

    #[error("no start nodes found")]
    NoStartNodes,

    #[error("edge {edge_id} references unknown node {node_id}")]
    UnknownNode {
        edge_id: uuid::Uuid,
        node_id: uuid::Uuid,
    },

    #[error("run cancelled")]
    Cancelled,

    #[error("invalid workflow: {0}")]
    InvalidWorkflow(String),
}
