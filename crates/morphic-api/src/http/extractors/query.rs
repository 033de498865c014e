//! Query parameter extractors for list endpoints.

use serde::Deserialize;

use morphic_core::chat::service::DEFAULT_PAGE_SIZE;

const MAX_PAGE_SIZE: u32 = 100;

/// `?offset=&limit=` for the chat history list.
#[derive(Debug, Deserialize, Default)]
pub struct ChatListQuery {
    pub offset: Option<u32>,
    pub limit: Option<u32>,
}

impl ChatListQuery {
    pub fn offset(&self) -> u32 {
        self.offset.unwrap_or(0)
    }

    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }
}
