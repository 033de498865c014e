//! HTTP request handlers.

pub mod chat;
pub mod chats;
pub mod config;
pub mod feedback;
