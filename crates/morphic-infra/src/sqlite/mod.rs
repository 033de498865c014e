//! SQLite storage layer.
//!
//! Repository implementations backed by SQLite with WAL mode and split
//! read/write connection pools.

pub mod chat;
pub mod feedback;
pub mod pool;

pub use chat::SqliteChatRepository;
pub use feedback::SqliteFeedbackRepository;
pub use pool::DatabasePool;
