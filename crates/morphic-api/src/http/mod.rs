//! HTTP API layer for Morphic.
//!
//! Axum routes under `/api/` matching the web client's contract, with
//! identity taken from the auth gateway header and errors rendered in a
//! uniform envelope.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod response;
pub mod router;
