//! Chats: persistence ports, the cached chat service, and the turn pipeline
//! (message preparation, model input conversion, streaming, persistence).

pub mod accumulator;
pub mod context_window;
pub mod convert;
pub mod feedback;
pub mod persist;
pub mod prepare;
pub mod reasoning;
pub mod repository;
pub mod service;
pub mod stream;
