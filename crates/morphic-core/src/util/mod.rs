//! Small pure helpers for presenting saved chats: citation links and
//! source names. The `morphic show` transcript uses them, as do clients
//! rendering the UI message stream.

pub mod citation;
pub mod domain;
