use thiserror::Error;

/// Errors from repository operations (used by trait definitions in morphic-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),

    /// The row exists but belongs to another user.
    #[error("row-level security violation: {0}")]
    RlsViolation(String),
}

/// Errors related to chat operations.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("chat not found")]
    NotFound,

    #[error("message not found")]
    MessageNotFound,

    #[error("you are not allowed to access this chat")]
    Forbidden,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("chat history is disabled")]
    HistoryDisabled,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Errors from web search providers.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("missing configuration: {0}")]
    MissingConfig(String),

    #[error("search provider returned {status}: {message}")]
    Http { status: u16, message: String },

    #[error("search request failed: {0}")]
    Request(String),

    #[error("invalid search response: {0}")]
    Deserialization(String),
}

/// Errors from page fetchers.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("fetch failed with status {0}")]
    Status(u16),

    #[error("unsupported content type: {0}")]
    UnsupportedContentType(String),

    #[error("request timed out")]
    Timeout,

    #[error("fetch failed: {0}")]
    Request(String),
}

/// Errors raised while executing an agent tool.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("invalid tool input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Search(#[from] SearchError),

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// Errors from rate-limit counter backends.
#[derive(Debug, Error)]
pub enum RateLimitError {
    #[error("counter backend error: {0}")]
    Backend(String),

    #[error("counter backend timed out")]
    Timeout,
}
